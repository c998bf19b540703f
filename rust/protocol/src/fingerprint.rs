//
// Copyright 2020 Axolotl Protocol Contributors
// SPDX-License-Identifier: AGPL-3.0-only
//

//! Safety numbers: a displayable digest of both parties' identity keys which
//! users compare out of band before marking a peer
//! [crate::TrustState::UserVerified].

use std::fmt;
use std::fmt::Write;

use sha2::digest::Digest;
use sha2::Sha512;
use subtle::ConstantTimeEq;

use crate::{IdentityKey, Result, SignalProtocolError};

#[derive(Debug, Clone)]
pub struct DisplayableFingerprint {
    local: String,
    remote: String,
}

impl fmt::Display for DisplayableFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.local < self.remote {
            write!(f, "{}{}", self.local, self.remote)
        } else {
            write!(f, "{}{}", self.remote, self.local)
        }
    }
}

fn get_encoded_string(fprint: &[u8]) -> Result<String> {
    if fprint.len() < 30 {
        return Err(SignalProtocolError::InvalidArgument(
            "DisplayableFingerprint created with short encoding".to_string(),
        ));
    }

    fn read5_mod_100k(fprint: &[u8]) -> u64 {
        assert_eq!(fprint.len(), 5);
        let x = fprint.iter().fold(0u64, |acc, &x| (acc << 8) | (x as u64));
        x % 100_000
    }

    let s = fprint.chunks_exact(5).take(6).map(read5_mod_100k).fold(
        String::with_capacity(5 * 6),
        |mut s, n| {
            write!(s, "{:05}", n).expect("can always write to a String");
            s
        },
    );

    Ok(s)
}

impl DisplayableFingerprint {
    pub fn new(local: &[u8], remote: &[u8]) -> Result<Self> {
        Ok(Self {
            local: get_encoded_string(local)?,
            remote: get_encoded_string(remote)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Fingerprint {
    version: u32,
    pub display: DisplayableFingerprint,
    local_fingerprint: Vec<u8>,
    remote_fingerprint: Vec<u8>,
}

impl Fingerprint {
    fn get_fingerprint(
        iterations: u32,
        local_id: &[u8],
        local_key: &IdentityKey,
    ) -> Result<Vec<u8>> {
        if iterations <= 1 || iterations > 1000000 {
            return Err(SignalProtocolError::InvalidArgument(format!(
                "Invalid fingerprint iterations {}",
                iterations
            )));
        }

        let fingerprint_version = [0u8, 0u8]; // 0x0000
        let key_bytes = local_key.serialize();

        let mut sha512 = Sha512::new();

        // iteration=0
        // Explicitly pass a slice to avoid generating multiple versions of update().
        sha512.update(&fingerprint_version[..]);
        sha512.update(&key_bytes);
        sha512.update(local_id);
        sha512.update(&key_bytes);
        let mut buf = sha512.finalize();

        for _i in 1..iterations {
            let mut sha512 = Sha512::new();
            // Explicitly pass a slice to avoid generating multiple versions of update().
            sha512.update(&buf[..]);
            sha512.update(&key_bytes);
            buf = sha512.finalize();
        }

        Ok(buf.to_vec())
    }

    pub fn new(
        version: u32,
        iterations: u32,
        local_id: &[u8],
        local_key: &IdentityKey,
        remote_id: &[u8],
        remote_key: &IdentityKey,
    ) -> Result<Fingerprint> {
        let local_fingerprint = Fingerprint::get_fingerprint(iterations, local_id, local_key)?;
        let remote_fingerprint = Fingerprint::get_fingerprint(iterations, remote_id, remote_key)?;

        Ok(Fingerprint {
            version,
            display: DisplayableFingerprint::new(&local_fingerprint, &remote_fingerprint)?,
            local_fingerprint: local_fingerprint[..32].to_vec(),
            remote_fingerprint: remote_fingerprint[..32].to_vec(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn display_string(&self) -> Result<String> {
        Ok(format!("{}", self.display))
    }

    /// Whether `theirs` describes the same two (identifier, identity key)
    /// pairs as this fingerprint, seen from the other side.
    ///
    /// Fingerprints computed for different versions never match; that is an
    /// error rather than `false` so callers can prompt for an upgrade.
    pub fn matches(&self, theirs: &Fingerprint) -> Result<bool> {
        if theirs.version != self.version {
            return Err(SignalProtocolError::FingerprintVersionMismatch(
                theirs.version,
                self.version,
            ));
        }

        let same1 = theirs.local_fingerprint.ct_eq(&self.remote_fingerprint);
        let same2 = theirs.remote_fingerprint.ct_eq(&self.local_fingerprint);

        Ok(same1.into() && same2.into())
    }

    /// [Self::matches] with a mismatch reported as an error, for callers that
    /// treat verification as pass/fail.
    pub fn verify(&self, theirs: &Fingerprint) -> Result<()> {
        if self.matches(theirs)? {
            Ok(())
        } else {
            Err(SignalProtocolError::FingerprintIdentifierMismatch)
        }
    }
}
