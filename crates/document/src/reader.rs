//! Document reader: SELECT then READ BINARY for each record
//!
//! No retries are attempted. A failure at either step aborts the record and is
//! reported to the caller, leaving the chip in whatever state it ended up in.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use idcheck_apdu_core::{CardTransport, CommandError, ResponseClass, StatusWord, TransportError};
use tracing::{debug, warn};

use crate::commands::{read_binary, select_file};
use crate::files::{self, FileId};

/// Error raised while reading a record from the chip
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// SELECT returned a non-success status word
    #[error("SELECT failed with status {0} ({desc})", desc = .0.description())]
    SelectFailed(StatusWord),

    /// READ BINARY returned a non-success status word
    #[error("READ BINARY failed with status {0} ({desc})", desc = .0.description())]
    ReadFailed(StatusWord),

    /// The channel failed before the chip answered
    #[error("communication error: {0}")]
    Transport(#[from] TransportError),

    /// The command could not be built
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),
}

impl ReadError {
    /// Status word reported by the chip, if the failure came from one
    pub const fn status_word(&self) -> Option<StatusWord> {
        match self {
            Self::SelectFailed(sw) | Self::ReadFailed(sw) => Some(*sw),
            Self::Transport(_) | Self::InvalidCommand(_) => None,
        }
    }
}

/// Payload of a successful read, status word already removed
#[derive(Clone, PartialEq, Eq)]
pub struct RawRecord(Bytes);

impl RawRecord {
    /// Wrap bytes read from the chip
    pub const fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Take the underlying bytes
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Deref for RawRecord {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Debug for RawRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawRecord({} bytes)", self.0.len())
    }
}

/// Reads the certificate and personal data records over a borrowed channel
#[derive(Debug)]
pub struct DocumentReader<'a, T: CardTransport> {
    transport: &'a mut T,
}

impl<'a, T: CardTransport> DocumentReader<'a, T> {
    /// Create a reader on top of an open channel
    pub const fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }

    /// Read the document certificate
    pub fn read_certificate(&mut self) -> Result<RawRecord, ReadError> {
        self.read_file(files::CERTIFICATE)
    }

    /// Read the personal data record
    pub fn read_personal_data(&mut self) -> Result<RawRecord, ReadError> {
        self.read_file(files::PERSONAL_DATA)
    }

    /// SELECT `file`, then READ BINARY from offset 0 with length 0
    pub fn read_file(&mut self, file: FileId) -> Result<RawRecord, ReadError> {
        debug!(%file, "Selecting file");
        let response = self.transport.exchange(&select_file(file))?;
        if let ResponseClass::Failure(status) = response.classify() {
            warn!(%file, %status, "SELECT failed");
            return Err(ReadError::SelectFailed(status));
        }

        let response = self.transport.exchange(&read_binary(0, 0)?)?;
        match response.classify() {
            ResponseClass::Success(payload) => {
                debug!(%file, len = payload.len(), "Read file");
                Ok(RawRecord::new(payload))
            }
            ResponseClass::Failure(status) => {
                warn!(%file, %status, "READ BINARY failed");
                Err(ReadError::ReadFailed(status))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idcheck_apdu_core::prelude::status;

    #[test]
    fn test_status_failures_name_the_status_word() {
        let error = ReadError::SelectFailed(status::FILE_NOT_FOUND);
        assert_eq!(
            error.to_string(),
            "SELECT failed with status 6A 82 (File not found)"
        );
        assert_eq!(error.status_word(), Some(status::FILE_NOT_FOUND));

        let error = ReadError::ReadFailed(status::SECURITY_CONDITION_NOT_SATISFIED);
        assert_eq!(
            error.to_string(),
            "READ BINARY failed with status 69 82 (Security status not satisfied)"
        );
    }

    #[test]
    fn test_transport_failure_converts() {
        let error = ReadError::from(TransportError::Removed);
        assert!(matches!(error, ReadError::Transport(TransportError::Removed)));
        assert_eq!(error.status_word(), None);
    }
}
