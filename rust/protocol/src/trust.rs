//
// Copyright 2021 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Per-peer identity trust, tracked independently of any session.
//!
//! Identities are pinned on first use. An identity change observed while the
//! peer is [TrustState::UserVerified] moves the record to
//! [TrustState::ChangedFromVerified], which blocks session establishment and
//! sending until the user resolves it with [IdentityTrustRecord::approve_change]
//! or a fresh verification.

use prost::Message;

use crate::proto::storage::identity_trust_structure::State as StateProto;
use crate::proto::storage::IdentityTrustStructure;
use crate::{IdentityKey, Result, SignalProtocolError, Timestamp};

/// How far the user has gone in verifying a peer's identity key.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TrustState {
    /// The identity was accepted automatically the first time it was seen.
    FirstUseUnverified,
    /// The user explicitly verified this identity, e.g. by comparing
    /// safety numbers.
    UserVerified,
    /// A previously verified peer presented a different identity key.
    /// Blocks new sessions and outgoing messages until resolved.
    ChangedFromVerified,
}

impl From<TrustState> for StateProto {
    fn from(value: TrustState) -> Self {
        match value {
            TrustState::FirstUseUnverified => StateProto::FirstUseUnverified,
            TrustState::UserVerified => StateProto::UserVerified,
            TrustState::ChangedFromVerified => StateProto::ChangedFromVerified,
        }
    }
}

impl From<StateProto> for TrustState {
    fn from(value: StateProto) -> Self {
        match value {
            StateProto::FirstUseUnverified => TrustState::FirstUseUnverified,
            StateProto::UserVerified => TrustState::UserVerified,
            StateProto::ChangedFromVerified => TrustState::ChangedFromVerified,
        }
    }
}

/// The trust record kept for one peer: the currently pinned identity key,
/// the trust state, and when either last changed.
#[derive(Clone, Debug)]
pub struct IdentityTrustRecord {
    identity: IdentityKey,
    state: TrustState,
    last_change: Timestamp,
}

impl IdentityTrustRecord {
    /// Pin `identity` on first contact.
    pub fn first_use(identity: IdentityKey, now: Timestamp) -> Self {
        Self {
            identity,
            state: TrustState::FirstUseUnverified,
            last_change: now,
        }
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.identity
    }

    pub fn state(&self) -> TrustState {
        self.state
    }

    pub fn last_change(&self) -> Timestamp {
        self.last_change
    }

    /// Whether `identity` may be used for a new session or an outgoing
    /// message right now.
    ///
    /// A peer in [TrustState::ChangedFromVerified] is never trusted until the
    /// change is resolved, even for the pinned key. An unverified peer may
    /// present a new key; it will be re-pinned by [Self::observe].
    pub fn is_trusted(&self, identity: &IdentityKey) -> bool {
        match self.state {
            TrustState::FirstUseUnverified => true,
            TrustState::UserVerified => identity == &self.identity,
            TrustState::ChangedFromVerified => false,
        }
    }

    /// Record that `identity` was presented for this peer. Returns `true` if
    /// the pinned key changed.
    pub fn observe(&mut self, identity: &IdentityKey, now: Timestamp) -> bool {
        if identity == &self.identity {
            return false;
        }
        if self.state == TrustState::UserVerified {
            log::warn!("verified identity changed at {}", now.epoch_millis());
            self.state = TrustState::ChangedFromVerified;
        }
        self.identity = *identity;
        self.last_change = now;
        true
    }

    /// The user compared safety numbers (or unchecked the verification).
    pub fn set_verified(&mut self, verified: bool, now: Timestamp) {
        self.state = if verified {
            TrustState::UserVerified
        } else {
            TrustState::FirstUseUnverified
        };
        self.last_change = now;
    }

    /// The user acknowledged an identity change. Trust resets to first-use;
    /// re-verification is a separate step.
    pub fn approve_change(&mut self, now: Timestamp) {
        if self.state == TrustState::ChangedFromVerified {
            self.state = TrustState::FirstUseUnverified;
            self.last_change = now;
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let structure = IdentityTrustStructure {
            identity_key: self.identity.serialize().into_vec(),
            state: StateProto::from(self.state).into(),
            last_change: self.last_change.epoch_millis(),
        };
        structure.encode_to_vec()
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let structure = IdentityTrustStructure::decode(data)?;
        let state = StateProto::try_from(structure.state)
            .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?;
        Ok(Self {
            identity: IdentityKey::decode(&structure.identity_key)?,
            state: state.into(),
            last_change: Timestamp::from_epoch_millis(structure.last_change),
        })
    }
}
