//
// Copyright 2020-2022 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Traits defining the mutable stores the protocol depends on.

use async_trait::async_trait;

use crate::address::ProtocolAddress;
use crate::error::Result;
use crate::state::{PreKeyId, PreKeyRecord, SessionRecord, SignedPreKeyId, SignedPreKeyRecord};
use crate::trust::IdentityTrustRecord;
use crate::{IdentityKey, IdentityKeyPair};

/// Each message has exactly two participants, a sender and receiver.
///
/// [IdentityKeyStore::is_trusted_identity] uses this to ensure the identity provided is configured
/// for the appropriate role.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Direction {
    /// We are in the context of sending a message.
    Sending,
    /// We are in the context of receiving a message.
    Receiving,
}

/// Interface defining the identity store, which may be in-memory, on-disk, etc.
///
/// Peer identities are tracked in a [TOFU] manner: the first identity seen for
/// an address is pinned, and later changes move through the
/// [crate::TrustState] machine.
///
/// [TOFU]: https://en.wikipedia.org/wiki/Trust_on_first_use
#[async_trait(?Send)]
pub trait IdentityKeyStore {
    /// Return the single specific identity the store is assumed to represent, with private key.
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair>;

    /// Return a [u32] specific to this store instance.
    ///
    /// This local registration id is separate from the per-device identifier used in
    /// [ProtocolAddress] and should not change run over run.
    ///
    /// If the same *device* is unregistered, then registers again, the [ProtocolAddress::device_id]
    /// may be the same, but the store registration id returned by this method should
    /// be regenerated.
    async fn get_local_registration_id(&self) -> Result<u32>;

    /// Record an identity into the store.
    ///
    /// The return value represents whether an existing identity was replaced (`Ok(true)`). If it is
    /// new or hasn't changed, the return value should be `Ok(false)`.
    async fn save_identity(
        &mut self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
    ) -> Result<bool>;

    /// Return whether an identity is trusted for the role specified by `direction`.
    async fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
        direction: Direction,
    ) -> Result<bool>;

    /// Return the public identity for the given `address`, if known.
    async fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>>;

    /// Return the full trust record for the given `address`, if known.
    async fn get_trust_record(
        &self,
        address: &ProtocolAddress,
    ) -> Result<Option<IdentityTrustRecord>>;

    /// Record the outcome of a user verification step, e.g. a safety number
    /// comparison, for a known peer.
    async fn set_identity_verified(
        &mut self,
        address: &ProtocolAddress,
        verified: bool,
    ) -> Result<()>;

    /// Record that the user acknowledged an identity key change for a
    /// previously verified peer, unblocking new sessions.
    async fn approve_identity_change(&mut self, address: &ProtocolAddress) -> Result<()>;
}

/// Interface for storing one-time pre-keys which have been published to a server.
#[async_trait(?Send)]
pub trait PreKeyStore {
    /// Look up the pre-key corresponding to `prekey_id`.
    async fn get_pre_key(&self, prekey_id: PreKeyId) -> Result<PreKeyRecord>;

    /// Set the entry for `prekey_id` to the value of `record`.
    async fn save_pre_key(&mut self, prekey_id: PreKeyId, record: &PreKeyRecord) -> Result<()>;

    /// Remove the entry for `prekey_id`.
    async fn remove_pre_key(&mut self, prekey_id: PreKeyId) -> Result<()>;

    /// Return the ids of all stored pre-keys, used by the replenishment and
    /// garbage-collection policies.
    async fn all_pre_key_ids(&self) -> Result<Vec<PreKeyId>>;
}

/// Interface for storing signed pre-keys which have been published to a server.
#[async_trait(?Send)]
pub trait SignedPreKeyStore {
    /// Look up the signed pre-key corresponding to `signed_prekey_id`.
    async fn get_signed_pre_key(
        &self,
        signed_prekey_id: SignedPreKeyId,
    ) -> Result<SignedPreKeyRecord>;

    /// Set the entry for `signed_prekey_id` to the value of `record`.
    async fn save_signed_pre_key(
        &mut self,
        signed_prekey_id: SignedPreKeyId,
        record: &SignedPreKeyRecord,
    ) -> Result<()>;

    /// Remove the entry for `signed_prekey_id`.
    async fn remove_signed_pre_key(&mut self, signed_prekey_id: SignedPreKeyId) -> Result<()>;

    /// Return all stored signed pre-key records, used for grace-window
    /// lookups during rotation.
    async fn all_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>>;
}

/// Interface for a client instance to store a session associated with another particular
/// separate client instance.
///
/// This [SessionRecord] object between a pair of clients is used to drive the state for the
/// forward-secret message chain in the [Double Ratchet] protocol.
///
/// [Double Ratchet]: https://signal.org/docs/specifications/doubleratchet/
#[async_trait(?Send)]
pub trait SessionStore {
    /// Look up the session corresponding to `address`.
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>>;

    /// Set the entry for `address` to the value of `record`.
    async fn store_session(
        &mut self,
        address: &ProtocolAddress,
        record: &SessionRecord,
    ) -> Result<()>;

    /// Return whether a session exists for `address`, checked before sending.
    async fn contains_session(&self, address: &ProtocolAddress) -> Result<bool>;

    /// Remove the session for `address`, if any.
    async fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()>;
}

/// Mixes in all the store interfaces defined in this module.
pub trait ProtocolStore: SessionStore + PreKeyStore + SignedPreKeyStore + IdentityKeyStore {}
