//! Document certificate and trusted root parsing
//!
//! Parsing is delegated to `x509-parser`; the fields the engine needs are
//! copied out so that a [`Certificate`] owns its data and outlives the buffer
//! it was read from.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::fingerprint::Fingerprint;
use crate::verify;

/// Error raised when a certificate cannot be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No bytes to parse
    #[error("certificate is empty")]
    Empty,

    /// Truncated input, invalid tag/length or unsupported structure
    #[error("malformed certificate: {0}")]
    Malformed(String),
}

/// Error raised when the trusted root cannot be loaded
#[derive(Debug, thiserror::Error)]
pub enum TrustedRootError {
    /// The root file could not be read
    #[error("failed to read trusted root {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The root is not a certificate
    #[error("invalid trusted root: {0}")]
    Parse(#[from] ParseError),
}

/// Decoded X.509 certificate
///
/// Immutable once built. Validity dates are kept for display only and are
/// never enforced.
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    serial: String,
    not_before: String,
    not_after: String,
    spki_der: Vec<u8>,
    tbs_der: Vec<u8>,
    signature_oid: String,
    signature: Vec<u8>,
}

impl Certificate {
    /// Parse a DER-encoded certificate
    ///
    /// Never panics: any structural problem is reported as [`ParseError`].
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        if der.is_empty() {
            return Err(ParseError::Empty);
        }

        let (rest, cert) = X509Certificate::from_der(der)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;

        // READ BINARY with Le 00 may return padding after the certificate
        if !rest.is_empty() {
            trace!(trailing = rest.len(), "Ignoring bytes after certificate");
        }
        let consumed = &der[..der.len() - rest.len()];

        let parsed = Self::from_parsed(consumed, &cert);
        debug!(subject = %parsed.subject, issuer = %parsed.issuer, "Parsed certificate");
        Ok(parsed)
    }

    /// Parse a PEM-encoded certificate
    pub fn from_pem(pem: &[u8]) -> Result<Self, ParseError> {
        let (_, pem) = parse_x509_pem(pem).map_err(|e| ParseError::Malformed(e.to_string()))?;
        if pem.label != "CERTIFICATE" {
            return Err(ParseError::Malformed(format!(
                "unexpected PEM label {}",
                pem.label
            )));
        }
        Self::from_der(&pem.contents)
    }

    /// Parse either encoding, PEM being recognised by its armour
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
            Self::from_pem(bytes)
        } else {
            Self::from_der(bytes)
        }
    }

    fn from_parsed(der: &[u8], cert: &X509Certificate<'_>) -> Self {
        let tbs = &cert.tbs_certificate;
        Self {
            der: der.to_vec(),
            subject: tbs.subject.to_string(),
            issuer: tbs.issuer.to_string(),
            serial: tbs.raw_serial_as_string(),
            not_before: tbs.validity.not_before.to_string(),
            not_after: tbs.validity.not_after.to_string(),
            spki_der: tbs.subject_pki.raw.to_vec(),
            tbs_der: tbs.as_ref().to_vec(),
            signature_oid: cert.signature_algorithm.algorithm.to_id_string(),
            signature: cert.signature_value.data.to_vec(),
        }
    }

    /// The full DER encoding
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Serial number as colon separated hex
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Start of the validity window, as encoded
    pub fn not_before(&self) -> &str {
        &self.not_before
    }

    /// End of the validity window, as encoded
    pub fn not_after(&self) -> &str {
        &self.not_after
    }

    /// DER encoding of the SubjectPublicKeyInfo
    pub fn public_key_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// DER encoding of the signed TBSCertificate
    pub fn tbs_der(&self) -> &[u8] {
        &self.tbs_der
    }

    /// Dotted OID of the signature algorithm
    pub fn signature_oid(&self) -> &str {
        &self.signature_oid
    }

    /// Raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// SHA-256 fingerprint of the public key
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial)
            .field("signature_oid", &self.signature_oid)
            .finish_non_exhaustive()
    }
}

/// The issuing authority's root certificate
///
/// Loaded once at start-up and shared read-only by every scan.
#[derive(Debug, Clone)]
pub struct TrustedRoot {
    certificate: Arc<Certificate>,
}

impl TrustedRoot {
    /// Use an already parsed certificate as the trusted root
    pub fn new(certificate: Certificate) -> Self {
        Self {
            certificate: Arc::new(certificate),
        }
    }

    /// Parse a DER-encoded root
    pub fn from_der(der: &[u8]) -> Result<Self, ParseError> {
        Certificate::from_der(der).map(Self::new)
    }

    /// Parse a PEM-encoded root
    pub fn from_pem(pem: &[u8]) -> Result<Self, ParseError> {
        Certificate::from_pem(pem).map(Self::new)
    }

    /// Parse either encoding
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        Certificate::from_bytes(bytes).map(Self::new)
    }

    /// Load the root from a DER or PEM file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrustedRootError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| TrustedRootError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let root = Self::from_bytes(&bytes)?;
        debug!(path = %path.display(), subject = %root.certificate.subject(), "Loaded trusted root");
        Ok(root)
    }

    /// The root certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Check that `cert` was signed by this root
    pub fn verify(&self, cert: &Certificate) -> bool {
        verify::verify(cert, self)
    }
}
