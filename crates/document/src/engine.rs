//! Scan transaction: read, parse, verify, fingerprint, read personal data
//!
//! [`Authenticator::scan`] drives one document over an open channel and
//! returns a [`ScanReport`]. Steps are strictly sequential and the first
//! failure ends the scan; a fingerprint computed before a later failure is
//! kept in the report.

use std::fmt;
use std::sync::Arc;

use idcheck_apdu_core::CardTransport;
use tracing::{debug, info, instrument, warn};

use crate::certificate::{Certificate, TrustedRoot};
use crate::files::Record;
use crate::fingerprint::Fingerprint;
use crate::reader::{DocumentReader, RawRecord};
use crate::state::{FailureReason, ScanState};

/// Personal data record as read from the chip
#[derive(Clone, PartialEq, Eq)]
pub struct PersonalData(RawRecord);

impl PersonalData {
    /// Wrap a record read from the chip
    pub const fn new(record: RawRecord) -> Self {
        Self(record)
    }

    /// Raw record bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The record as text, if it is printable UTF-8
    pub fn as_text(&self) -> Option<&str> {
        let text = std::str::from_utf8(&self.0).ok()?;
        let text = text.trim_end_matches('\0');
        text.chars()
            .all(|c| !c.is_control() || c == '\n' || c == '\r' || c == '\t')
            .then_some(text)
    }
}

impl From<RawRecord> for PersonalData {
    fn from(record: RawRecord) -> Self {
        Self::new(record)
    }
}

impl fmt::Display for PersonalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(text.trim()),
            None => f.write_str(&hex::encode_upper(self.as_bytes())),
        }
    }
}

impl fmt::Debug for PersonalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PersonalData({} bytes)", self.0.len())
    }
}

/// Outcome of one scan transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    /// Final state: `Summarized` or `Errored`
    pub state: ScanState,
    /// Fingerprint, present once the certificate has been verified
    pub fingerprint: Option<Fingerprint>,
    /// Subject of the document certificate, once parsed
    pub subject: Option<String>,
    /// Personal data, present only on a completed scan
    pub personal_data: Option<PersonalData>,
}

impl ScanReport {
    fn new() -> Self {
        Self {
            state: ScanState::Connected,
            fingerprint: None,
            subject: None,
            personal_data: None,
        }
    }

    /// A scan that ended before the chip was read
    pub const fn failed(reason: FailureReason) -> Self {
        Self {
            state: ScanState::Errored(reason),
            fingerprint: None,
            subject: None,
            personal_data: None,
        }
    }

    fn advance(&mut self, state: ScanState) {
        debug!(from = %self.state, to = %state, "Scan transition");
        self.state = state;
    }

    fn fail(mut self, reason: FailureReason) -> Self {
        warn!(state = %self.state, %reason, "Scan failed");
        self.state = ScanState::Errored(reason);
        self
    }

    /// Whether the scan completed
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, ScanState::Summarized)
    }

    /// Consolidated human readable status for this scan
    pub fn status_message(&self) -> String {
        match &self.state {
            ScanState::Summarized => {
                let mut message = String::from("Document verified");
                if let Some(fingerprint) = &self.fingerprint {
                    message.push_str(&format!("\nFingerprint: {fingerprint}"));
                }
                if let Some(data) = &self.personal_data {
                    message.push_str(&format!("\nPersonal data: {data}"));
                }
                message
            }
            ScanState::Errored(reason) => self.failure_message(reason),
            state => in_progress_message(state).to_string(),
        }
    }

    fn failure_message(&self, reason: &FailureReason) -> String {
        match reason {
            // The certificate was verified, even if the channel dropped afterwards
            FailureReason::ReadFailed {
                record: Record::PersonalData,
                error,
            } => {
                let mut message =
                    format!("Document verified, but personal data could not be read: {error}");
                if let Some(fingerprint) = &self.fingerprint {
                    message.push_str(&format!("\nFingerprint: {fingerprint}"));
                }
                message
            }
            FailureReason::ReadFailed { .. } if reason.is_transport() => {
                format!("Communication error: {reason}")
            }
            FailureReason::ReadFailed { .. } => format!("Read error: {reason}"),
            FailureReason::ParseFailed(error) => format!("Certificate parsing failed: {error}"),
            FailureReason::VerificationFailed => {
                "Document NOT verified: certificate was not issued by the trusted authority"
                    .to_string()
            }
            FailureReason::Timeout => "Scan timed out: no answer from the document".to_string(),
            FailureReason::NoDocument => "No document presented".to_string(),
        }
    }
}

/// Status text for a state that is not terminal
pub(crate) const fn in_progress_message(state: &ScanState) -> &'static str {
    match state {
        ScanState::Idle => "Ready to scan",
        ScanState::AwaitingTag => "Waiting for a document...",
        _ => "Reading document...",
    }
}

/// Runs scan transactions against a trusted root
#[derive(Debug, Clone)]
pub struct Authenticator {
    root: Arc<TrustedRoot>,
}

impl Authenticator {
    /// Create an authenticator pinned to `root`
    pub fn new(root: TrustedRoot) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// Create an authenticator sharing an already loaded root
    pub const fn with_shared_root(root: Arc<TrustedRoot>) -> Self {
        Self { root }
    }

    /// The pinned root
    pub fn trusted_root(&self) -> &TrustedRoot {
        &self.root
    }

    /// Run one scan over `transport`
    #[instrument(skip_all)]
    pub fn scan<T: CardTransport>(&self, transport: &mut T) -> ScanReport {
        let mut report = ScanReport::new();
        let mut reader = DocumentReader::new(transport);

        let raw = match reader.read_certificate() {
            Ok(raw) => raw,
            Err(error) => {
                return report.fail(FailureReason::ReadFailed {
                    record: Record::Certificate,
                    error,
                });
            }
        };
        report.advance(ScanState::CertificateRead);

        let cert = match Certificate::from_der(&raw) {
            Ok(cert) => cert,
            Err(error) => return report.fail(FailureReason::ParseFailed(error)),
        };
        report.subject = Some(cert.subject().to_string());

        if !self.root.verify(&cert) {
            return report.fail(FailureReason::VerificationFailed);
        }
        report.advance(ScanState::CertificateVerified);

        let fingerprint = cert.fingerprint();
        report.fingerprint = Some(fingerprint);
        report.advance(ScanState::FingerprintComputed);

        let data = match reader.read_personal_data() {
            Ok(raw) => PersonalData::from(raw),
            Err(error) => {
                return report.fail(FailureReason::ReadFailed {
                    record: Record::PersonalData,
                    error,
                });
            }
        };
        report.personal_data = Some(data);
        report.advance(ScanState::DataRead);

        report.advance(ScanState::Summarized);
        info!(%fingerprint, subject = %cert.subject(), "Document verified");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use idcheck_apdu_core::TransportError;
    use idcheck_apdu_core::prelude::status;

    use crate::reader::ReadError;

    #[test]
    fn test_personal_data_rendering() {
        let text = PersonalData::new(RawRecord::new(Bytes::from_static(b"DOE<<JOHN\0\0")));
        assert_eq!(text.as_text(), Some("DOE<<JOHN"));
        assert_eq!(text.to_string(), "DOE<<JOHN");

        let binary = PersonalData::new(RawRecord::new(Bytes::from_static(&[0x5F, 0x1F, 0x01])));
        assert_eq!(binary.as_text(), None);
        assert_eq!(binary.to_string(), "5F1F01");
    }

    #[test]
    fn test_status_messages() {
        let fingerprint = Fingerprint::of_public_key(b"key");

        let report = ScanReport::failed(FailureReason::ReadFailed {
            record: Record::Certificate,
            error: ReadError::SelectFailed(status::FILE_NOT_FOUND),
        });
        assert!(report.status_message().contains("6A 82"));

        let report = ScanReport::failed(FailureReason::ReadFailed {
            record: Record::Certificate,
            error: ReadError::Transport(TransportError::Removed),
        });
        assert!(report.status_message().starts_with("Communication error"));

        let mut report = ScanReport::failed(FailureReason::ReadFailed {
            record: Record::PersonalData,
            error: ReadError::ReadFailed(status::SECURITY_CONDITION_NOT_SATISFIED),
        });
        report.fingerprint = Some(fingerprint);
        let message = report.status_message();
        assert!(message.starts_with("Document verified, but personal data"));
        assert!(message.contains("69 82"));
        assert!(message.contains(&fingerprint.to_string()));

        let report = ScanReport::failed(FailureReason::VerificationFailed);
        assert!(report.status_message().contains("NOT verified"));

        let report = ScanReport::failed(FailureReason::NoDocument);
        assert_eq!(report.status_message(), "No document presented");
    }

    #[test]
    fn test_removal_after_verification_keeps_partial_success() {
        let fingerprint = Fingerprint::of_public_key(b"key");
        let mut report = ScanReport::failed(FailureReason::ReadFailed {
            record: Record::PersonalData,
            error: ReadError::Transport(TransportError::Removed),
        });
        report.fingerprint = Some(fingerprint);

        let message = report.status_message();
        assert!(message.starts_with("Document verified, but personal data"));
        assert!(message.contains(&fingerprint.to_string()));
    }
}
