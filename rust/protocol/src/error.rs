//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

use crate::curve::KeyType;

pub type Result<T> = std::result::Result<T, SignalProtocolError>;

#[derive(thiserror::Error, Debug)]
pub enum SignalProtocolError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state for call to {0} to succeed: {1}")]
    InvalidState(&'static str, String),

    #[error("failed to decode protobuf: {0}")]
    ProtobufDecodingError(#[from] prost::DecodeError),
    #[error("failed to encode protobuf: {0}")]
    ProtobufEncodingError(#[from] prost::EncodeError),
    #[error("protobuf encoding was invalid")]
    InvalidProtobufEncoding,

    #[error("ciphertext serialized bytes were too short <{0}>")]
    CiphertextMessageTooShort(usize),
    #[error("ciphertext version was too old <{0}>")]
    LegacyCiphertextVersion(u8),
    #[error("ciphertext version was unrecognized <{0}>")]
    UnrecognizedCiphertextVersion(u8),
    #[error("unrecognized message version <{0}>")]
    UnrecognizedMessageVersion(u32),

    #[error("fingerprint identifiers do not match")]
    FingerprintIdentifierMismatch,
    #[error("fingerprint version number mismatch them {0} us {1}")]
    FingerprintVersionMismatch(u32, u32),

    #[error("no key type identifier")]
    NoKeyTypeIdentifier,
    #[error("bad key type <{0:#04x}>")]
    BadKeyType(u8),
    #[error("bad key length <{1}> for key with type <{0}>")]
    BadKeyLength(KeyType, usize),
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(&'static str),

    #[error("invalid signature detected")]
    InvalidSignature,

    #[error("identity for address {0} changed after verification")]
    UntrustedIdentityChange(crate::ProtocolAddress),

    #[error("unknown one-time prekey identifier")]
    UnknownPrekeyId,
    #[error("unknown signed prekey identifier")]
    UnknownSignedPrekeyId,

    #[error("no established session with {0}")]
    NoSession(crate::ProtocolAddress),
    #[error("invalid session structure: {0}")]
    InvalidSessionStructure(&'static str),

    #[error("message counter {1} jumps too far ahead of chain index {0}")]
    TooManySkippedMessages(u32, u32),
    #[error("message with counter {1} already decrypted or evicted (chain index {0})")]
    DuplicateOrExpiredMessage(u32, u32),
    #[error("message authentication failed")]
    AuthenticationFailure,
    #[error("invalid message: {0}")]
    InvalidMessage(&'static str),
}
