//! Scan states and failure reasons

use std::fmt;

use idcheck_apdu_core::StatusWord;

use crate::certificate::ParseError;
use crate::files::Record;
use crate::reader::ReadError;

/// Step of a scan transaction
///
/// `Summarized` and `Errored` are terminal; every other state means a scan is
/// pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState {
    /// No scan requested yet
    Idle,
    /// Waiting for a document to be presented
    AwaitingTag,
    /// A document is in range and the channel is open
    Connected,
    /// Certificate bytes were read and parsed
    CertificateRead,
    /// Certificate signature checked against the trusted root
    CertificateVerified,
    /// Public key fingerprint available
    FingerprintComputed,
    /// Personal data record read
    DataRead,
    /// Scan completed
    Summarized,
    /// Scan aborted
    Errored(FailureReason),
}

impl ScanState {
    /// Whether the scan has ended, successfully or not
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Summarized | Self::Errored(_))
    }

    /// Whether a scan is in flight
    pub const fn is_pending(&self) -> bool {
        !self.is_terminal() && !matches!(self, Self::Idle)
    }

    /// Failure reason, if the scan was aborted
    pub const fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Errored(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::AwaitingTag => f.write_str("awaiting tag"),
            Self::Connected => f.write_str("connected"),
            Self::CertificateRead => f.write_str("certificate read"),
            Self::CertificateVerified => f.write_str("certificate verified"),
            Self::FingerprintComputed => f.write_str("fingerprint computed"),
            Self::DataRead => f.write_str("data read"),
            Self::Summarized => f.write_str("summarized"),
            Self::Errored(reason) => write!(f, "errored: {reason}"),
        }
    }
}

/// Why a scan was aborted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    /// A record could not be read from the chip
    #[error("failed to read {record}: {error}")]
    ReadFailed {
        /// Record being read
        record: Record,
        /// What went wrong
        error: ReadError,
    },

    /// The certificate bytes are not a certificate
    #[error("failed to parse certificate: {0}")]
    ParseFailed(ParseError),

    /// The certificate was not signed by the trusted root
    #[error("certificate not signed by the trusted root")]
    VerificationFailed,

    /// The document stopped answering before the scan finished
    #[error("scan timed out")]
    Timeout,

    /// No document was presented in time
    #[error("no document presented")]
    NoDocument,
}

impl FailureReason {
    /// Status word reported by the chip, if any
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::ReadFailed { error, .. } => error.status_word(),
            _ => None,
        }
    }

    /// Whether the failure came from the channel rather than the chip's answer
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ReadFailed {
                error: ReadError::Transport(_),
                ..
            }
        )
    }
}
