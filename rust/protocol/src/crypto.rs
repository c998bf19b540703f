//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Symmetric primitives used by the ratchet: AES-256-CBC with PKCS#7 padding
//! and HMAC-SHA256.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{Result, SignalProtocolError};

pub fn aes_256_cbc_encrypt(ptext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    Ok(cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
        .map_err(|_| SignalProtocolError::InvalidKeyMaterial("bad AES-256-CBC key or IV length"))?
        .encrypt_padded_vec_mut::<Pkcs7>(ptext))
}

pub fn aes_256_cbc_decrypt(ctext: &[u8], key: &[u8], iv: &[u8]) -> Result<Vec<u8>> {
    if ctext.is_empty() || ctext.len() % 16 != 0 {
        return Err(SignalProtocolError::InvalidMessage(
            "ciphertext length must be a nonzero multiple of 16",
        ));
    }

    cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
        .map_err(|_| SignalProtocolError::InvalidKeyMaterial("bad AES-256-CBC key or IV length"))?
        .decrypt_padded_vec_mut::<Pkcs7>(ctext)
        .map_err(|_| SignalProtocolError::InvalidMessage("invalid PKCS#7 padding"))
}

pub fn hmac_sha256(key: &[u8], input: &[u8]) -> [u8; 32] {
    let mut hmac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts any size key");
    hmac.update(input);
    hmac.finalize().into_bytes().into()
}
