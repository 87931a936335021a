//! Error types for PC/SC transport

use idcheck_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in reader
    #[error("No card present in reader: {0}")]
    NoCard(String),

    /// Card was removed
    #[error("Card was removed")]
    CardRemoved,

    /// Timed out waiting for a card
    #[error("Timed out waiting for a card")]
    Timeout,
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::RemovedCard | pcsc::Error::ResetCard)
            | PcscError::CardRemoved => Self::Removed,
            PcscError::Pcsc(pcsc::Error::Timeout) | PcscError::Timeout => Self::Timeout,
            PcscError::Pcsc(pcsc::Error::Cancelled) => Self::Cancelled,
            PcscError::Pcsc(pcsc::Error::NoSmartcard) | PcscError::NoCard(_) => Self::Connection,
            PcscError::Pcsc(e) => Self::driver(e as i32),
            other => Self::other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_card_maps_to_removed() {
        assert_eq!(
            TransportError::from(PcscError::Pcsc(pcsc::Error::RemovedCard)),
            TransportError::Removed
        );
        assert_eq!(
            TransportError::from(PcscError::CardRemoved),
            TransportError::Removed
        );
    }

    #[test]
    fn test_timeout_and_missing_card() {
        assert_eq!(TransportError::from(PcscError::Timeout), TransportError::Timeout);
        assert_eq!(
            TransportError::from(PcscError::NoCard("reader".into())),
            TransportError::Connection
        );
        assert_eq!(
            TransportError::from(PcscError::NoReadersAvailable),
            TransportError::Other("No readers available".into())
        );
    }
}
