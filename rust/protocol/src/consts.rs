//
// Copyright 2020-2022 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

#![warn(missing_docs)]

//! Magic numbers.

/// Various positive integers bounding the maximum size of other data structures.
pub mod limits {
    /// The maximum number of messages a receiving chain may be advanced in one
    /// decryption. Larger jumps are rejected rather than derived, bounding the
    /// work (and the skipped-key state) a single hostile counter can cause.
    pub const MAX_FORWARD_JUMPS: usize = 25_000;
    /// The maximum number of derived-but-unused per-message keys retained per
    /// chain for out-of-order delivery. Past this the oldest keys are evicted
    /// and the messages they covered become undecryptable.
    pub const MAX_MESSAGE_KEYS: usize = 2000;
    /// The maximum number of old receiving chains kept in a session state
    /// after DH ratchet steps.
    pub const MAX_RECEIVER_CHAINS: usize = 5;
    /// The maximum number of archived session states retained per address in
    /// [crate::SessionRecord]. Older states are discarded and can no longer
    /// decrypt.
    pub const MAX_ARCHIVED_SESSION_STATES: usize = 3;
}

/// Parameters of the prekey maintenance policy.
pub mod rotation {
    use std::time::Duration;

    /// Replenish one-time prekeys once fewer than this many remain unconsumed.
    pub const PRE_KEY_MINIMUM_COUNT: usize = 20;
    /// Number of one-time prekeys generated per replenishment batch.
    pub const PRE_KEY_BATCH_SIZE: usize = 100;
    /// One-time prekey identifiers live in `[1, PRE_KEY_MEDIUM_MAX_VALUE]` and
    /// wrap; the bound keeps ids varint-small on the wire.
    pub const PRE_KEY_MEDIUM_MAX_VALUE: u32 = 0x00FF_FFFF;
    /// Unused one-time prekeys older than this are garbage collected.
    pub const PRE_KEY_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
    /// A fresh signed prekey is generated once the current one is older than
    /// this.
    pub const SIGNED_PRE_KEY_ROTATION_INTERVAL: Duration = Duration::from_secs(2 * 24 * 60 * 60);
    /// Superseded signed prekeys are kept for this grace window so in-flight
    /// prekey messages referencing them still decrypt.
    pub const SIGNED_PRE_KEY_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
}
