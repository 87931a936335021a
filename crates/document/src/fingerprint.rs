//! Public key fingerprints
//!
//! A fingerprint is the SHA-256 digest of the certificate's DER-encoded
//! SubjectPublicKeyInfo, shown as 64 uppercase hex characters.

use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::certificate::Certificate;

/// Length of a fingerprint in bytes
pub const FINGERPRINT_LENGTH: usize = 32;

/// SHA-256 digest of a public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LENGTH]);

/// Error parsing a fingerprint from text
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FingerprintError {
    /// Not hex
    #[error("invalid fingerprint: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Hex of the wrong length
    #[error("invalid fingerprint length: expected {FINGERPRINT_LENGTH} bytes, got {0}")]
    InvalidLength(usize),
}

impl Fingerprint {
    /// Wrap a raw digest
    pub const fn new(digest: [u8; FINGERPRINT_LENGTH]) -> Self {
        Self(digest)
    }

    /// Fingerprint the public key of `cert`
    pub fn of(cert: &Certificate) -> Self {
        Self::of_public_key(cert.public_key_der())
    }

    /// Fingerprint a DER-encoded SubjectPublicKeyInfo
    pub fn of_public_key(spki_der: &[u8]) -> Self {
        Self(Sha256::digest(spki_der).into())
    }

    /// Raw digest bytes
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LENGTH] {
        &self.0
    }

    /// 64 uppercase hex characters
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    /// Accepts either case, with optional `:` separators and whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(normalize(s))?;
        let digest: [u8; FINGERPRINT_LENGTH] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| FingerprintError::InvalidLength(bytes.len()))?;
        Ok(Self(digest))
    }
}

/// Canonical form of a user supplied key: no whitespace, no `:`, uppercase
pub fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Fingerprint `cert` as 64 uppercase hex characters
pub fn fingerprint(cert: &Certificate) -> String {
    Fingerprint::of(cert).to_hex()
}
