//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::fmt;

/// Identifies one device belonging to one peer.
///
/// The `name` is whatever stable identifier the application uses for the peer
/// (a phone number, a UUID, ...); sessions and trust records are keyed by the
/// full address, so each device of a peer ratchets independently.
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ProtocolAddress {
    name: String,
    device_id: u32,
}

impl ProtocolAddress {
    pub fn new(name: String, device_id: u32) -> Self {
        ProtocolAddress { name, device_id }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }
}

impl fmt::Display for ProtocolAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.device_id)
    }
}
