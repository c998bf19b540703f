//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use std::collections::VecDeque;

use prost::Message;

use crate::consts::limits;
use crate::proto::storage::session_structure;
use crate::proto::storage::{RecordStructure, SessionStructure};
use crate::ratchet::{ChainKey, MessageKeys, RootKey};
use crate::state::{PreKeyId, SignedPreKeyId};
use crate::{IdentityKey, KeyPair, PrivateKey, PublicKey, Result, SignalProtocolError};

/// Pieces a `PreKeySignalMessage` must repeat until the remote side
/// acknowledges the session by replying.
#[derive(Debug, Clone)]
pub(crate) struct UnacknowledgedPreKeyMessageItems {
    pre_key_id: Option<PreKeyId>,
    signed_pre_key_id: SignedPreKeyId,
    base_key: PublicKey,
}

impl UnacknowledgedPreKeyMessageItems {
    fn new(
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: PublicKey,
    ) -> Self {
        Self {
            pre_key_id,
            signed_pre_key_id,
            base_key,
        }
    }

    pub(crate) fn pre_key_id(&self) -> Option<PreKeyId> {
        self.pre_key_id
    }

    pub(crate) fn signed_pre_key_id(&self) -> SignedPreKeyId {
        self.signed_pre_key_id
    }

    pub(crate) fn base_key(&self) -> &PublicKey {
        &self.base_key
    }
}

#[derive(Clone, Debug)]
pub(crate) struct SessionState {
    session: SessionStructure,
}

impl SessionState {
    pub(crate) fn new(
        version: u8,
        our_identity: &IdentityKey,
        their_identity: &IdentityKey,
        root_key: &RootKey,
        alice_base_key: &PublicKey,
    ) -> Self {
        Self {
            session: SessionStructure {
                session_version: version as u32,
                local_identity_public: our_identity.serialize().to_vec(),
                remote_identity_public: their_identity.serialize().to_vec(),
                root_key: root_key.key().to_vec(),
                previous_counter: 0,
                sender_chain: None,
                receiver_chains: vec![],
                pending_pre_key: None,
                remote_registration_id: 0,
                local_registration_id: 0,
                alice_base_key: alice_base_key.serialize().to_vec(),
            },
        }
    }

    pub(crate) fn alice_base_key(&self) -> &[u8] {
        &self.session.alice_base_key
    }

    pub(crate) fn session_version(&self) -> u32 {
        match self.session.session_version {
            0 => 2,
            v => v,
        }
    }

    pub(crate) fn remote_identity_key(&self) -> Result<Option<IdentityKey>> {
        match self.session.remote_identity_public.len() {
            0 => Ok(None),
            _ => Ok(Some(IdentityKey::decode(
                &self.session.remote_identity_public,
            )?)),
        }
    }

    pub(crate) fn remote_identity_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.remote_identity_key()?.map(|k| k.serialize().to_vec()))
    }

    pub(crate) fn local_identity_key(&self) -> Result<IdentityKey> {
        IdentityKey::decode(&self.session.local_identity_public)
    }

    pub(crate) fn local_identity_key_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.local_identity_key()?.serialize().to_vec())
    }

    pub(crate) fn previous_counter(&self) -> u32 {
        self.session.previous_counter
    }

    pub(crate) fn set_previous_counter(&mut self, ctr: u32) {
        self.session.previous_counter = ctr;
    }

    pub(crate) fn root_key(&self) -> Result<RootKey> {
        let key: [u8; 32] = self
            .session
            .root_key
            .as_slice()
            .try_into()
            .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?;
        Ok(RootKey::new(key))
    }

    pub(crate) fn set_root_key(&mut self, root_key: &RootKey) {
        self.session.root_key = root_key.key().to_vec();
    }

    pub(crate) fn sender_ratchet_key(&self) -> Result<PublicKey> {
        match self.session.sender_chain {
            None => Err(SignalProtocolError::InvalidProtobufEncoding),
            Some(ref c) => PublicKey::deserialize(&c.sender_ratchet_key),
        }
    }

    pub(crate) fn sender_ratchet_key_for_logging(&self) -> Result<String> {
        Ok(hex::encode(
            self.sender_ratchet_key()?.public_key_bytes(),
        ))
    }

    pub(crate) fn sender_ratchet_private_key(&self) -> Result<PrivateKey> {
        match self.session.sender_chain {
            None => Err(SignalProtocolError::InvalidProtobufEncoding),
            Some(ref c) => PrivateKey::deserialize(&c.sender_ratchet_key_private),
        }
    }

    pub(crate) fn has_sender_chain(&self) -> bool {
        self.session.sender_chain.is_some()
    }

    pub(crate) fn get_receiver_chain(
        &self,
        sender: &PublicKey,
    ) -> Result<Option<(session_structure::Chain, usize)>> {
        let sender_bytes = sender.serialize();

        for (idx, chain) in self.session.receiver_chains.iter().enumerate() {
            // The deserialize + serialize pair canonicalizes the stored point
            // before comparison.
            let this_point = PublicKey::deserialize(&chain.sender_ratchet_key)?.serialize();

            if this_point == sender_bytes {
                return Ok(Some((chain.clone(), idx)));
            }
        }

        Ok(None)
    }

    pub(crate) fn get_receiver_chain_key(&self, sender: &PublicKey) -> Result<Option<ChainKey>> {
        match self.get_receiver_chain(sender)? {
            None => Ok(None),
            Some((chain, _)) => match chain.chain_key {
                None => Err(SignalProtocolError::InvalidProtobufEncoding),
                Some(c) => {
                    let key: [u8; 32] = c
                        .key
                        .as_slice()
                        .try_into()
                        .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?;
                    Ok(Some(ChainKey::new(key, c.index)))
                }
            },
        }
    }

    pub(crate) fn add_receiver_chain(&mut self, sender: &PublicKey, chain_key: &ChainKey) {
        let chain_key = session_structure::chain::ChainKey {
            index: chain_key.index(),
            key: chain_key.key().to_vec(),
        };

        let chain = session_structure::Chain {
            sender_ratchet_key: sender.serialize().to_vec(),
            sender_ratchet_key_private: vec![],
            chain_key: Some(chain_key),
            message_keys: vec![],
        };

        self.session.receiver_chains.push(chain);

        if self.session.receiver_chains.len() > limits::MAX_RECEIVER_CHAINS {
            log::info!(
                "Trimming excessive receiver_chain for session with base key {}, chain count: {}",
                self.sender_ratchet_key_for_logging()
                    .unwrap_or_else(|e| format!("<error: {}>", e)),
                self.session.receiver_chains.len()
            );
            self.session.receiver_chains.remove(0);
        }
    }

    pub(crate) fn with_receiver_chain(mut self, sender: &PublicKey, chain_key: &ChainKey) -> Self {
        self.add_receiver_chain(sender, chain_key);
        self
    }

    pub(crate) fn set_sender_chain(&mut self, sender: &KeyPair, next_chain_key: &ChainKey) {
        let chain_key = session_structure::chain::ChainKey {
            index: next_chain_key.index(),
            key: next_chain_key.key().to_vec(),
        };

        let new_chain = session_structure::Chain {
            sender_ratchet_key: sender.public_key.serialize().to_vec(),
            sender_ratchet_key_private: sender.private_key.serialize(),
            chain_key: Some(chain_key),
            message_keys: vec![],
        };

        self.session.sender_chain = Some(new_chain);
    }

    pub(crate) fn with_sender_chain(mut self, sender: &KeyPair, next_chain_key: &ChainKey) -> Self {
        self.set_sender_chain(sender, next_chain_key);
        self
    }

    pub(crate) fn get_sender_chain_key(&self) -> Result<ChainKey> {
        let sender_chain = self.session.sender_chain.as_ref().ok_or_else(|| {
            SignalProtocolError::InvalidState("get_sender_chain_key", "No chain".to_owned())
        })?;

        let chain_key = sender_chain.chain_key.as_ref().ok_or_else(|| {
            SignalProtocolError::InvalidState("get_sender_chain_key", "No chain key".to_owned())
        })?;

        let key: [u8; 32] = chain_key
            .key
            .as_slice()
            .try_into()
            .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?;
        Ok(ChainKey::new(key, chain_key.index))
    }

    pub(crate) fn set_sender_chain_key(&mut self, next_chain_key: &ChainKey) -> Result<()> {
        let chain_key = session_structure::chain::ChainKey {
            index: next_chain_key.index(),
            key: next_chain_key.key().to_vec(),
        };

        let sender_chain = self.session.sender_chain.as_mut().ok_or_else(|| {
            SignalProtocolError::InvalidState("set_sender_chain_key", "No chain".to_owned())
        })?;
        sender_chain.chain_key = Some(chain_key);
        Ok(())
    }

    pub(crate) fn get_message_keys(
        &mut self,
        sender: &PublicKey,
        counter: u32,
    ) -> Result<Option<MessageKeys>> {
        if let Some((mut chain, index)) = self.get_receiver_chain(sender)? {
            let message_key_idx = chain.message_keys.iter().position(|m| m.index == counter);
            if let Some(position) = message_key_idx {
                let message_key = chain.message_keys.remove(position);

                let keys = MessageKeys::new(
                    message_key
                        .cipher_key
                        .as_slice()
                        .try_into()
                        .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?,
                    message_key
                        .mac_key
                        .as_slice()
                        .try_into()
                        .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?,
                    message_key
                        .iv
                        .as_slice()
                        .try_into()
                        .map_err(|_| SignalProtocolError::InvalidProtobufEncoding)?,
                    counter,
                );

                // Consumed keys never decrypt twice.
                self.session.receiver_chains[index] = chain;
                return Ok(Some(keys));
            }
        }

        Ok(None)
    }

    pub(crate) fn set_message_keys(
        &mut self,
        sender: &PublicKey,
        message_keys: &MessageKeys,
    ) -> Result<()> {
        let new_keys = session_structure::chain::MessageKey {
            cipher_key: message_keys.cipher_key().to_vec(),
            mac_key: message_keys.mac_key().to_vec(),
            iv: message_keys.iv().to_vec(),
            index: message_keys.counter(),
        };

        if let Some((mut chain, index)) = self.get_receiver_chain(sender)? {
            chain.message_keys.insert(0, new_keys);

            if chain.message_keys.len() > limits::MAX_MESSAGE_KEYS {
                chain.message_keys.pop();
            }

            self.session.receiver_chains[index] = chain;
            Ok(())
        } else {
            Err(SignalProtocolError::InvalidState(
                "set_message_keys",
                "No receiver".to_string(),
            ))
        }
    }

    pub(crate) fn set_receiver_chain_key(
        &mut self,
        sender: &PublicKey,
        chain_key: &ChainKey,
    ) -> Result<()> {
        if let Some((mut chain, index)) = self.get_receiver_chain(sender)? {
            chain.chain_key = Some(session_structure::chain::ChainKey {
                index: chain_key.index(),
                key: chain_key.key().to_vec(),
            });

            self.session.receiver_chains[index] = chain;
            return Ok(());
        }

        Err(SignalProtocolError::InvalidState(
            "set_receiver_chain_key",
            "No receiver".to_string(),
        ))
    }

    pub(crate) fn set_unacknowledged_pre_key_message(
        &mut self,
        pre_key_id: Option<PreKeyId>,
        signed_pre_key_id: SignedPreKeyId,
        base_key: &PublicKey,
    ) {
        let pending = session_structure::PendingPreKey {
            pre_key_id: pre_key_id.map_or(0, u32::from),
            signed_pre_key_id: u32::from(signed_pre_key_id) as i32,
            base_key: base_key.serialize().to_vec(),
        };
        self.session.pending_pre_key = Some(pending);
    }

    pub(crate) fn unacknowledged_pre_key_message_items(
        &self,
    ) -> Result<Option<UnacknowledgedPreKeyMessageItems>> {
        if let Some(ref pending_pre_key) = self.session.pending_pre_key {
            Ok(Some(UnacknowledgedPreKeyMessageItems::new(
                match pending_pre_key.pre_key_id {
                    0 => None,
                    v => Some(v.into()),
                },
                (pending_pre_key.signed_pre_key_id as u32).into(),
                PublicKey::deserialize(&pending_pre_key.base_key)?,
            )))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn clear_unacknowledged_pre_key_message(&mut self) {
        self.session.pending_pre_key = None;
    }

    pub(crate) fn set_remote_registration_id(&mut self, registration_id: u32) {
        self.session.remote_registration_id = registration_id;
    }

    pub(crate) fn remote_registration_id(&self) -> u32 {
        self.session.remote_registration_id
    }

    pub(crate) fn set_local_registration_id(&mut self, registration_id: u32) {
        self.session.local_registration_id = registration_id;
    }

    pub(crate) fn local_registration_id(&self) -> u32 {
        self.session.local_registration_id
    }
}

impl From<SessionStructure> for SessionState {
    fn from(value: SessionStructure) -> SessionState {
        SessionState { session: value }
    }
}

impl From<SessionState> for SessionStructure {
    fn from(value: SessionState) -> SessionStructure {
        value.session
    }
}

impl From<&SessionState> for SessionStructure {
    fn from(value: &SessionState) -> SessionStructure {
        value.session.clone()
    }
}

/// The full per-address session history: the live state plus a bounded
/// archive of superseded states that can still decrypt in-flight messages.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    current_session: Option<SessionState>,
    previous_sessions: VecDeque<SessionState>,
}

impl SessionRecord {
    pub fn new_fresh() -> Self {
        Self {
            current_session: None,
            previous_sessions: VecDeque::new(),
        }
    }

    pub(crate) fn new(state: SessionState) -> Self {
        Self {
            current_session: Some(state),
            previous_sessions: VecDeque::new(),
        }
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let record = RecordStructure::decode(bytes)?;

        Ok(Self {
            current_session: record.current_session.map(|s| s.into()),
            previous_sessions: record
                .previous_sessions
                .into_iter()
                .map(|s| s.into())
                .collect(),
        })
    }

    pub(crate) fn has_session_state(&self, version: u32, alice_base_key: &[u8]) -> bool {
        if let Some(current_session) = &self.current_session {
            if current_session.session_version() == version
                && alice_base_key == current_session.alice_base_key()
            {
                return true;
            }
        }

        self.previous_sessions.iter().any(|previous| {
            previous.session_version() == version && alice_base_key == previous.alice_base_key()
        })
    }

    pub fn has_current_session_state(&self) -> bool {
        self.current_session.is_some()
    }

    pub(crate) fn session_state(&self) -> Result<&SessionState> {
        if let Some(ref session) = self.current_session {
            Ok(session)
        } else {
            Err(SignalProtocolError::InvalidState(
                "session_state",
                "No session".into(),
            ))
        }
    }

    pub(crate) fn session_state_mut(&mut self) -> Result<&mut SessionState> {
        if let Some(ref mut session) = self.current_session {
            Ok(session)
        } else {
            Err(SignalProtocolError::InvalidState(
                "session_state",
                "No session".into(),
            ))
        }
    }

    pub(crate) fn previous_session_states(&self) -> impl Iterator<Item = &SessionState> {
        self.previous_sessions.iter()
    }

    pub(crate) fn promote_old_session(
        &mut self,
        old_session: usize,
        updated_session: SessionState,
    ) -> Result<()> {
        self.previous_sessions.remove(old_session).ok_or_else(|| {
            SignalProtocolError::InvalidState("promote_old_session", "out of range".into())
        })?;
        self.promote_state(updated_session);
        Ok(())
    }

    pub(crate) fn promote_state(&mut self, new_state: SessionState) {
        self.archive_current_state();
        self.current_session = Some(new_state);
    }

    pub fn archive_current_state(&mut self) {
        if let Some(current) = self.current_session.take() {
            self.previous_sessions.push_front(current);
            if self.previous_sessions.len() > limits::MAX_ARCHIVED_SESSION_STATES {
                self.previous_sessions.pop_back();
            }
        } else {
            log::info!("Skipping archive, current session state is fresh");
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let record = RecordStructure {
            current_session: self.current_session.as_ref().map(|s| s.into()),
            previous_sessions: self.previous_sessions.iter().map(|s| s.into()).collect(),
        };
        record.encode_to_vec()
    }

    pub fn remote_registration_id(&self) -> Result<u32> {
        Ok(self.session_state()?.remote_registration_id())
    }

    pub fn local_registration_id(&self) -> Result<u32> {
        Ok(self.session_state()?.local_registration_id())
    }

    pub fn session_version(&self) -> Result<u32> {
        Ok(self.session_state()?.session_version())
    }

    pub fn local_identity_key_bytes(&self) -> Result<Vec<u8>> {
        self.session_state()?.local_identity_key_bytes()
    }

    pub fn remote_identity_key_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.session_state()?.remote_identity_key_bytes()
    }

    pub fn has_sender_chain(&self) -> bool {
        match &self.current_session {
            Some(session) => session.has_sender_chain(),
            None => false,
        }
    }

    pub fn alice_base_key(&self) -> Result<&[u8]> {
        Ok(self.session_state()?.alice_base_key())
    }

    pub fn get_sender_chain_key_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.session_state()?.get_sender_chain_key()?.key().to_vec())
    }

    pub fn get_receiver_chain_key_bytes(&self, sender: &PublicKey) -> Result<Option<Vec<u8>>> {
        Ok(self
            .session_state()?
            .get_receiver_chain_key(sender)?
            .map(|chain_key| chain_key.key().to_vec()))
    }
}
