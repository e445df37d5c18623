//! Extended public keys and the fingerprints that label their origins.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::PolicyError;

/// Length of a compressed SEC1 public key.
const PUBKEY_LEN: usize = 33;

/// Short identifier derived one-way from a key's public-key bytes.
///
/// Four bytes, displayed as 8 lowercase hex characters. Used purely to
/// label key-origin blocks in descriptors; collisions are not guarded
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 4]);

impl Fingerprint {
    /// Derive a fingerprint from raw compressed public-key bytes.
    pub fn from_pubkey(pubkey: &[u8]) -> Result<Self, PolicyError> {
        if pubkey.len() != PUBKEY_LEN {
            return Err(PolicyError::InvalidKey("not 33 bytes"));
        }
        if !matches!(pubkey[0], 0x02 | 0x03) {
            return Err(PolicyError::InvalidKey("not a compressed point"));
        }
        let digest = Sha256::digest(pubkey);
        let mut id = [0u8; 4];
        id.copy_from_slice(&digest[..4]);
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// An extended public key as a signer exports it: the encoded form that
/// gets embedded in descriptors, plus the raw compressed public key it
/// carries.
///
/// Derivation is the signer's business; this type only holds what
/// descriptor construction needs. Invariant: the public key is well-formed
/// and the fingerprint precomputed — checked once, here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPub {
    encoded: String,
    pubkey: [u8; PUBKEY_LEN],
    fingerprint: Fingerprint,
}

impl XPub {
    pub fn new(encoded: impl Into<String>, pubkey: [u8; PUBKEY_LEN]) -> Result<Self, PolicyError> {
        let fingerprint = Fingerprint::from_pubkey(&pubkey)?;
        let encoded = encoded.into();
        if encoded.is_empty() {
            return Err(PolicyError::InvalidKey("empty encoded form"));
        }
        Ok(Self {
            encoded,
            pubkey,
            fingerprint,
        })
    }

    /// The exported form embedded in descriptors.
    #[must_use]
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    #[must_use]
    pub fn pubkey(&self) -> &[u8; PUBKEY_LEN] {
        &self.pubkey
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }
}
