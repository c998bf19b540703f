//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::storage::traits;
use crate::trust::IdentityTrustRecord;
use crate::{
    IdentityKey, IdentityKeyPair, PreKeyId, PreKeyRecord, ProtocolAddress, Result,
    SessionRecord, SignalProtocolError, SignedPreKeyId, SignedPreKeyRecord, Timestamp,
};

#[derive(Clone)]
pub struct InMemIdentityKeyStore {
    key_pair: IdentityKeyPair,
    id: u32,
    trust_records: HashMap<ProtocolAddress, IdentityTrustRecord>,
}

impl InMemIdentityKeyStore {
    pub fn new(key_pair: IdentityKeyPair, id: u32) -> Self {
        Self {
            key_pair,
            id,
            trust_records: HashMap::new(),
        }
    }

    pub fn reset(&mut self) {
        self.trust_records.clear();
    }

    fn now() -> Timestamp {
        SystemTime::now().into()
    }
}

#[async_trait(?Send)]
impl traits::IdentityKeyStore for InMemIdentityKeyStore {
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair> {
        Ok(self.key_pair)
    }

    async fn get_local_registration_id(&self) -> Result<u32> {
        Ok(self.id)
    }

    async fn save_identity(
        &mut self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
    ) -> Result<bool> {
        match self.trust_records.get_mut(address) {
            None => {
                self.trust_records.insert(
                    address.clone(),
                    IdentityTrustRecord::first_use(*identity, Self::now()),
                );
                Ok(false) // first use
            }
            Some(record) => Ok(record.observe(identity, Self::now())),
        }
    }

    async fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
        _direction: traits::Direction,
    ) -> Result<bool> {
        match self.trust_records.get(address) {
            None => Ok(true), // first use
            Some(record) => Ok(record.is_trusted(identity)),
        }
    }

    async fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>> {
        Ok(self
            .trust_records
            .get(address)
            .map(|record| *record.identity()))
    }

    async fn get_trust_record(
        &self,
        address: &ProtocolAddress,
    ) -> Result<Option<IdentityTrustRecord>> {
        Ok(self.trust_records.get(address).cloned())
    }

    async fn set_identity_verified(
        &mut self,
        address: &ProtocolAddress,
        verified: bool,
    ) -> Result<()> {
        let record = self
            .trust_records
            .get_mut(address)
            .ok_or_else(|| SignalProtocolError::InvalidState(
                "set_identity_verified",
                format!("no identity recorded for {address}"),
            ))?;
        record.set_verified(verified, Self::now());
        Ok(())
    }

    async fn approve_identity_change(&mut self, address: &ProtocolAddress) -> Result<()> {
        let record = self
            .trust_records
            .get_mut(address)
            .ok_or_else(|| SignalProtocolError::InvalidState(
                "approve_identity_change",
                format!("no identity recorded for {address}"),
            ))?;
        record.approve_change(Self::now());
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemPreKeyStore {
    pre_keys: HashMap<PreKeyId, PreKeyRecord>,
}

impl InMemPreKeyStore {
    pub fn new() -> Self {
        Self {
            pre_keys: HashMap::new(),
        }
    }
}

impl Default for InMemPreKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl traits::PreKeyStore for InMemPreKeyStore {
    async fn get_pre_key(&self, id: PreKeyId) -> Result<PreKeyRecord> {
        Ok(self
            .pre_keys
            .get(&id)
            .ok_or(SignalProtocolError::UnknownPrekeyId)?
            .clone())
    }

    async fn save_pre_key(&mut self, id: PreKeyId, record: &PreKeyRecord) -> Result<()> {
        // This overwrites old values, which matches Java behavior, but is it correct?
        self.pre_keys.insert(id, record.to_owned());
        Ok(())
    }

    async fn remove_pre_key(&mut self, id: PreKeyId) -> Result<()> {
        // If id does not exist this silently does nothing
        self.pre_keys.remove(&id);
        Ok(())
    }

    async fn all_pre_key_ids(&self) -> Result<Vec<PreKeyId>> {
        Ok(self.pre_keys.keys().copied().collect())
    }
}

#[derive(Clone)]
pub struct InMemSignedPreKeyStore {
    signed_pre_keys: HashMap<SignedPreKeyId, SignedPreKeyRecord>,
}

impl InMemSignedPreKeyStore {
    pub fn new() -> Self {
        Self {
            signed_pre_keys: HashMap::new(),
        }
    }
}

impl Default for InMemSignedPreKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl traits::SignedPreKeyStore for InMemSignedPreKeyStore {
    async fn get_signed_pre_key(&self, id: SignedPreKeyId) -> Result<SignedPreKeyRecord> {
        Ok(self
            .signed_pre_keys
            .get(&id)
            .ok_or(SignalProtocolError::UnknownSignedPrekeyId)?
            .clone())
    }

    async fn save_signed_pre_key(
        &mut self,
        id: SignedPreKeyId,
        record: &SignedPreKeyRecord,
    ) -> Result<()> {
        // This overwrites old values, which matches Java behavior, but is it correct?
        self.signed_pre_keys.insert(id, record.to_owned());
        Ok(())
    }

    async fn remove_signed_pre_key(&mut self, id: SignedPreKeyId) -> Result<()> {
        self.signed_pre_keys.remove(&id);
        Ok(())
    }

    async fn all_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>> {
        let mut records: Vec<SignedPreKeyRecord> =
            self.signed_pre_keys.values().cloned().collect();
        records.sort_by_key(|record| record.id());
        Ok(records)
    }
}

#[derive(Clone)]
pub struct InMemSessionStore {
    sessions: HashMap<ProtocolAddress, SessionRecord>,
}

impl InMemSessionStore {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }
}

impl Default for InMemSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl traits::SessionStore for InMemSessionStore {
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.get(address).cloned())
    }

    async fn store_session(
        &mut self,
        address: &ProtocolAddress,
        record: &SessionRecord,
    ) -> Result<()> {
        self.sessions.insert(address.clone(), record.clone());
        Ok(())
    }

    async fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        Ok(self.sessions.contains_key(address))
    }

    async fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.sessions.remove(address);
        Ok(())
    }
}

#[derive(Clone)]
pub struct InMemSignalProtocolStore {
    pub session_store: InMemSessionStore,
    pub pre_key_store: InMemPreKeyStore,
    pub signed_pre_key_store: InMemSignedPreKeyStore,
    pub identity_store: InMemIdentityKeyStore,
}

impl InMemSignalProtocolStore {
    pub fn new(key_pair: IdentityKeyPair, registration_id: u32) -> Result<Self> {
        Ok(Self {
            session_store: InMemSessionStore::new(),
            pre_key_store: InMemPreKeyStore::new(),
            signed_pre_key_store: InMemSignedPreKeyStore::new(),
            identity_store: InMemIdentityKeyStore::new(key_pair, registration_id),
        })
    }
}

#[async_trait(?Send)]
impl traits::IdentityKeyStore for InMemSignalProtocolStore {
    async fn get_identity_key_pair(&self) -> Result<IdentityKeyPair> {
        self.identity_store.get_identity_key_pair().await
    }

    async fn get_local_registration_id(&self) -> Result<u32> {
        self.identity_store.get_local_registration_id().await
    }

    async fn save_identity(
        &mut self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
    ) -> Result<bool> {
        self.identity_store.save_identity(address, identity).await
    }

    async fn is_trusted_identity(
        &self,
        address: &ProtocolAddress,
        identity: &IdentityKey,
        direction: traits::Direction,
    ) -> Result<bool> {
        self.identity_store
            .is_trusted_identity(address, identity, direction)
            .await
    }

    async fn get_identity(&self, address: &ProtocolAddress) -> Result<Option<IdentityKey>> {
        self.identity_store.get_identity(address).await
    }

    async fn get_trust_record(
        &self,
        address: &ProtocolAddress,
    ) -> Result<Option<IdentityTrustRecord>> {
        self.identity_store.get_trust_record(address).await
    }

    async fn set_identity_verified(
        &mut self,
        address: &ProtocolAddress,
        verified: bool,
    ) -> Result<()> {
        self.identity_store
            .set_identity_verified(address, verified)
            .await
    }

    async fn approve_identity_change(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.identity_store.approve_identity_change(address).await
    }
}

#[async_trait(?Send)]
impl traits::PreKeyStore for InMemSignalProtocolStore {
    async fn get_pre_key(&self, id: PreKeyId) -> Result<PreKeyRecord> {
        self.pre_key_store.get_pre_key(id).await
    }

    async fn save_pre_key(&mut self, id: PreKeyId, record: &PreKeyRecord) -> Result<()> {
        self.pre_key_store.save_pre_key(id, record).await
    }

    async fn remove_pre_key(&mut self, id: PreKeyId) -> Result<()> {
        self.pre_key_store.remove_pre_key(id).await
    }

    async fn all_pre_key_ids(&self) -> Result<Vec<PreKeyId>> {
        self.pre_key_store.all_pre_key_ids().await
    }
}

#[async_trait(?Send)]
impl traits::SignedPreKeyStore for InMemSignalProtocolStore {
    async fn get_signed_pre_key(&self, id: SignedPreKeyId) -> Result<SignedPreKeyRecord> {
        self.signed_pre_key_store.get_signed_pre_key(id).await
    }

    async fn save_signed_pre_key(
        &mut self,
        id: SignedPreKeyId,
        record: &SignedPreKeyRecord,
    ) -> Result<()> {
        self.signed_pre_key_store
            .save_signed_pre_key(id, record)
            .await
    }

    async fn remove_signed_pre_key(&mut self, id: SignedPreKeyId) -> Result<()> {
        self.signed_pre_key_store.remove_signed_pre_key(id).await
    }

    async fn all_signed_pre_keys(&self) -> Result<Vec<SignedPreKeyRecord>> {
        self.signed_pre_key_store.all_signed_pre_keys().await
    }
}

#[async_trait(?Send)]
impl traits::SessionStore for InMemSignalProtocolStore {
    async fn load_session(&self, address: &ProtocolAddress) -> Result<Option<SessionRecord>> {
        self.session_store.load_session(address).await
    }

    async fn store_session(
        &mut self,
        address: &ProtocolAddress,
        record: &SessionRecord,
    ) -> Result<()> {
        self.session_store.store_session(address, record).await
    }

    async fn contains_session(&self, address: &ProtocolAddress) -> Result<bool> {
        self.session_store.contains_session(address).await
    }

    async fn delete_session(&mut self, address: &ProtocolAddress) -> Result<()> {
        self.session_store.delete_session(address).await
    }
}

impl traits::ProtocolStore for InMemSignalProtocolStore {}
