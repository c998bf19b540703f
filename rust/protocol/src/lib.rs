//
// Copyright 2020-2021 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

#![warn(clippy::unwrap_used)]
#![deny(unsafe_code)]

mod address;
pub mod consts;
mod crypto;
mod curve;
pub mod error;
mod fingerprint;
mod identity_key;
mod prekeys;
mod proto;
mod protocol;
mod ratchet;
mod session;
mod session_cipher;
mod state;
mod storage;
mod timestamp;
mod trust;
mod utils;

use error::Result;

pub use {
    address::ProtocolAddress,
    curve::{KeyPair, PrivateKey, PublicKey},
    error::SignalProtocolError,
    fingerprint::{DisplayableFingerprint, Fingerprint},
    identity_key::{IdentityKey, IdentityKeyPair},
    prekeys::{
        cleanup_signed_pre_keys, cleanup_stale_pre_keys, generate_pre_keys,
        mark_signed_pre_key_accepted, replenish_pre_keys, rotate_signed_pre_key,
    },
    protocol::{CiphertextMessage, CiphertextMessageType, PreKeySignalMessage, SignalMessage},
    ratchet::{
        initialize_alice_session_record, initialize_bob_session_record,
        AliceSignalProtocolParameters, BobSignalProtocolParameters,
    },
    session::{process_prekey, process_prekey_bundle},
    session_cipher::{
        message_decrypt, message_decrypt_prekey, message_decrypt_signal, message_encrypt,
    },
    state::{
        PreKeyBundle, PreKeyId, PreKeyRecord, SessionRecord, SignedPreKeyId, SignedPreKeyRecord,
    },
    storage::{
        Direction, IdentityKeyStore, InMemIdentityKeyStore, InMemPreKeyStore, InMemSessionStore,
        InMemSignalProtocolStore, InMemSignedPreKeyStore, PreKeyStore, ProtocolStore, SessionStore,
        SignedPreKeyStore,
    },
    timestamp::Timestamp,
    trust::{IdentityTrustRecord, TrustState},
};
