//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::fmt;

use prost::Message;

use crate::proto::storage::SignedPreKeyRecordStructure;
use crate::{KeyPair, PrivateKey, PublicKey, Result, Timestamp};

/// A unique identifier selecting among this client's signed prekeys.
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct SignedPreKeyId(u32);

impl From<u32> for SignedPreKeyId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<SignedPreKeyId> for u32 {
    fn from(value: SignedPreKeyId) -> Self {
        value.0
    }
}

impl fmt::Display for SignedPreKeyId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct SignedPreKeyRecord {
    signed_pre_key: SignedPreKeyRecordStructure,
}

impl SignedPreKeyRecord {
    pub fn new(id: SignedPreKeyId, timestamp: Timestamp, key: &KeyPair, signature: &[u8]) -> Self {
        let public_key = key.public_key.serialize().to_vec();
        let private_key = key.private_key.serialize();
        let signature = signature.to_vec();
        Self {
            signed_pre_key: SignedPreKeyRecordStructure {
                id: id.into(),
                timestamp: timestamp.epoch_millis(),
                public_key,
                private_key,
                signature,
                accepted_by_service: false,
            },
        }
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        Ok(Self {
            signed_pre_key: SignedPreKeyRecordStructure::decode(data)?,
        })
    }

    pub fn id(&self) -> SignedPreKeyId {
        self.signed_pre_key.id.into()
    }

    pub fn timestamp(&self) -> Timestamp {
        Timestamp::from_epoch_millis(self.signed_pre_key.timestamp)
    }

    pub fn signature(&self) -> Vec<u8> {
        self.signed_pre_key.signature.clone()
    }

    /// Whether the serving infrastructure has acknowledged this key.
    /// Predecessors may only be cleaned up once the replacement is accepted.
    pub fn accepted_by_service(&self) -> bool {
        self.signed_pre_key.accepted_by_service
    }

    pub fn set_accepted_by_service(&mut self) {
        self.signed_pre_key.accepted_by_service = true;
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::deserialize(&self.signed_pre_key.public_key)
    }

    pub fn private_key(&self) -> Result<PrivateKey> {
        PrivateKey::deserialize(&self.signed_pre_key.private_key)
    }

    pub fn key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_public_and_private(
            &self.signed_pre_key.public_key,
            &self.signed_pre_key.private_key,
        )
    }

    pub fn serialize(&self) -> Vec<u8> {
        self.signed_pre_key.encode_to_vec()
    }
}
