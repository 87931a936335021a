//! Single-hop signature check of a document certificate against the trusted root
//!
//! Only the signature is checked. Validity dates, revocation and intermediate
//! authorities are out of scope.

use p256::ecdsa as p256_ecdsa;
use p384::ecdsa as p384_ecdsa;
use rsa::RsaPublicKey;
use rsa::pkcs1v15;
use rsa::pkcs8::DecodePublicKey as _;
use sha2::{Digest, Sha256, Sha384, Sha512};
use signature::Verifier as _;
use signature::hazmat::PrehashVerifier as _;
use tracing::{debug, warn};

use crate::certificate::{Certificate, TrustedRoot};

/// sha256WithRSAEncryption
pub const RSA_SHA256: &str = "1.2.840.113549.1.1.11";
/// sha384WithRSAEncryption
pub const RSA_SHA384: &str = "1.2.840.113549.1.1.12";
/// sha512WithRSAEncryption
pub const RSA_SHA512: &str = "1.2.840.113549.1.1.13";
/// ecdsa-with-SHA256
pub const ECDSA_SHA256: &str = "1.2.840.10045.4.3.2";
/// ecdsa-with-SHA384
pub const ECDSA_SHA384: &str = "1.2.840.10045.4.3.3";
/// ecdsa-with-SHA512
pub const ECDSA_SHA512: &str = "1.2.840.10045.4.3.4";

/// Reason a signature check did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum VerifyError {
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    #[error("issuer key unusable: {0}")]
    BadIssuerKey(String),

    #[error("signature malformed: {0}")]
    BadSignature(String),

    #[error("signature does not match")]
    Mismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hash {
    Sha256,
    Sha384,
    Sha512,
}

impl Hash {
    fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Check that `cert` was signed by the private key of `root`
///
/// Returns `false` for a wrong signer, altered certificate bytes, a
/// malformed signature or an algorithm that is not supported. Never panics.
pub fn verify(cert: &Certificate, root: &TrustedRoot) -> bool {
    let issuer = root.certificate();
    if cert.issuer() != issuer.subject() {
        debug!(
            issuer = %cert.issuer(),
            root = %issuer.subject(),
            "Certificate issuer does not name the trusted root"
        );
    }

    match verify_signature(
        issuer.public_key_der(),
        cert.tbs_der(),
        cert.signature_oid(),
        cert.signature(),
    ) {
        Ok(()) => {
            debug!(subject = %cert.subject(), "Certificate signature verified");
            true
        }
        Err(VerifyError::Mismatch) => {
            warn!(subject = %cert.subject(), "Certificate signature does not match trusted root");
            false
        }
        Err(e) => {
            debug!(error = %e, "Certificate signature not verifiable");
            false
        }
    }
}

pub(crate) fn verify_signature(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    signature_oid: &str,
    signature: &[u8],
) -> Result<(), VerifyError> {
    match signature_oid {
        RSA_SHA256 => verify_rsa::<Sha256>(issuer_spki_der, tbs_der, signature),
        RSA_SHA384 => verify_rsa::<Sha384>(issuer_spki_der, tbs_der, signature),
        RSA_SHA512 => verify_rsa::<Sha512>(issuer_spki_der, tbs_der, signature),
        ECDSA_SHA256 => verify_ecdsa(issuer_spki_der, tbs_der, Hash::Sha256, signature),
        ECDSA_SHA384 => verify_ecdsa(issuer_spki_der, tbs_der, Hash::Sha384, signature),
        ECDSA_SHA512 => verify_ecdsa(issuer_spki_der, tbs_der, Hash::Sha512, signature),
        other => Err(VerifyError::UnsupportedAlgorithm(other.to_string())),
    }
}

fn verify_rsa<D>(issuer_spki_der: &[u8], tbs_der: &[u8], signature: &[u8]) -> Result<(), VerifyError>
where
    D: Digest + rsa::pkcs8::AssociatedOid,
{
    let key = RsaPublicKey::from_public_key_der(issuer_spki_der)
        .map_err(|e| VerifyError::BadIssuerKey(e.to_string()))?;
    let sig = pkcs1v15::Signature::try_from(signature)
        .map_err(|e| VerifyError::BadSignature(e.to_string()))?;
    pkcs1v15::VerifyingKey::<D>::new(key)
        .verify(tbs_der, &sig)
        .map_err(|_| VerifyError::Mismatch)
}

fn verify_ecdsa(
    issuer_spki_der: &[u8],
    tbs_der: &[u8],
    hash: Hash,
    signature: &[u8],
) -> Result<(), VerifyError> {
    // The signature OID names the hash; the curve comes from the issuer key
    if let Ok(key) = p256_ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
        let sig = p256_ecdsa::Signature::from_der(signature)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))?;
        let result = match hash {
            Hash::Sha256 => key.verify(tbs_der, &sig),
            other => key.verify_prehash(&other.digest(tbs_der), &sig),
        };
        return result.map_err(|_| VerifyError::Mismatch);
    }

    if let Ok(key) = p384_ecdsa::VerifyingKey::from_public_key_der(issuer_spki_der) {
        let sig = p384_ecdsa::Signature::from_der(signature)
            .map_err(|e| VerifyError::BadSignature(e.to_string()))?;
        let result = match hash {
            Hash::Sha384 => key.verify(tbs_der, &sig),
            other => key.verify_prehash(&other.digest(tbs_der), &sig),
        };
        return result.map_err(|_| VerifyError::Mismatch);
    }

    Err(VerifyError::BadIssuerKey(
        "not an RSA, P-256 or P-384 public key".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_algorithm() {
        // md5WithRSAEncryption
        let result = verify_signature(&[], &[], "1.2.840.113549.1.1.4", &[]);
        assert_eq!(
            result,
            Err(VerifyError::UnsupportedAlgorithm("1.2.840.113549.1.1.4".into()))
        );
    }

    #[test]
    fn test_bad_issuer_key() {
        let result = verify_signature(&[0x30, 0x00], b"tbs", RSA_SHA256, &[0u8; 256]);
        assert!(matches!(result, Err(VerifyError::BadIssuerKey(_))));

        let result = verify_signature(&[0x30, 0x00], b"tbs", ECDSA_SHA256, &[0x30, 0x00]);
        assert!(matches!(result, Err(VerifyError::BadIssuerKey(_))));
    }

    #[test]
    fn test_hash_lengths() {
        assert_eq!(Hash::Sha256.digest(b"abc").len(), 32);
        assert_eq!(Hash::Sha384.digest(b"abc").len(), 48);
        assert_eq!(Hash::Sha512.digest(b"abc").len(), 64);
    }
}
