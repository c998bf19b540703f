//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use crate::state::{PreKeyId, SignedPreKeyId};
use crate::{IdentityKey, PublicKey};

#[derive(Clone)]
struct SignedPreKey {
    id: SignedPreKeyId,
    public_key: PublicKey,
    signature: Vec<u8>,
}

/// A server-published collection of public key material for one remote
/// device: its identity key, signed prekey, and optionally one consumable
/// one-time prekey.
#[derive(Clone)]
pub struct PreKeyBundle {
    registration_id: u32,
    device_id: u32,
    pre_key_id: Option<PreKeyId>,
    pre_key_public: Option<PublicKey>,
    signed_pre_key: SignedPreKey,
    identity_key: IdentityKey,
}

impl PreKeyBundle {
    pub fn new(
        registration_id: u32,
        device_id: u32,
        pre_key: Option<(PreKeyId, PublicKey)>,
        signed_pre_key_id: SignedPreKeyId,
        signed_pre_key_public: PublicKey,
        signed_pre_key_signature: Vec<u8>,
        identity_key: IdentityKey,
    ) -> Self {
        let (pre_key_id, pre_key_public) = match pre_key {
            None => (None, None),
            Some((id, key)) => (Some(id), Some(key)),
        };

        let signed_pre_key = SignedPreKey {
            id: signed_pre_key_id,
            public_key: signed_pre_key_public,
            signature: signed_pre_key_signature,
        };

        Self {
            registration_id,
            device_id,
            pre_key_id,
            pre_key_public,
            signed_pre_key,
            identity_key,
        }
    }

    pub fn registration_id(&self) -> u32 {
        self.registration_id
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    pub fn pre_key_public(&self) -> Option<PublicKey> {
        self.pre_key_public
    }

    pub fn signed_pre_key_id(&self) -> SignedPreKeyId {
        self.signed_pre_key.id
    }

    pub fn signed_pre_key_public(&self) -> PublicKey {
        self.signed_pre_key.public_key
    }

    pub fn signed_pre_key_signature(&self) -> &[u8] {
        self.signed_pre_key.signature.as_ref()
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }
}
