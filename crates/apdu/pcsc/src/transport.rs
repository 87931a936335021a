//! PC/SC transport implementation

use std::{ffi::CString, fmt};

use idcheck_apdu_core::prelude::*;
use pcsc::{Card, Context, Disposition};
use tracing::debug;

use crate::{config::PcscConfig, error::PcscError};

/// Largest response the reader may hand back: an extended-length payload plus the status word
///
/// READ BINARY with Le `00` asks for the whole file, some chips answer with more
/// than the 256 bytes a short response allows.
const MAX_RESPONSE_LENGTH: usize = 65_538;

/// Transport implementation using PC/SC
pub struct PcscTransport {
    /// PC/SC context
    context: Context,
    /// Card connection, if established
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Configuration
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    /// Create a new PC/SC transport for the specified reader
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        };

        // A card may be placed later, connect_card runs again before each transmit
        if let Err(e) = transport.connect_card() {
            debug!(reader = %transport.reader_name, error = %e, "No card connected yet");
        }

        Ok(transport)
    }

    /// Try to connect to the card
    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard | pcsc::Error::RemovedCard) => {
                Err(PcscError::NoCard(self.reader_name.clone()))
            }
            Err(pcsc::Error::UnknownReader) => {
                Err(PcscError::ReaderNotFound(self.reader_name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the ATR of the current card
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        self.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Transmit a command to the card
    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = vec![0u8; MAX_RESPONSE_LENGTH];

        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                let error = transmit_error(e);
                if matches!(error, PcscError::CardRemoved) {
                    debug!(reader = %self.reader_name, error = %e, "Card left the field");
                    self.card = None;
                }
                Err(error)
            }
        }
    }
}

/// Classify a failed transmit
///
/// A reset chip has lost its selected file, so it is reported like a removal
/// and the command is never resent.
fn transmit_error(error: pcsc::Error) -> PcscError {
    match error {
        pcsc::Error::ResetCard | pcsc::Error::RemovedCard => PcscError::CardRemoved,
        e => e.into(),
    }
}

impl CardTransport for PcscTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::ResetCard) {
                debug!(error = %e, "Failed to reset card on disconnect");
            }
        }

        self.connect_card().map_err(Into::into)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        // Release the channel once the scan is over
        if let Some(card) = self.card.take() {
            if let Err((_, e)) = card.disconnect(Disposition::LeaveCard) {
                debug!(error = %e, "Failed to release card");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_during_exchange_is_removal() {
        assert!(matches!(
            transmit_error(pcsc::Error::ResetCard),
            PcscError::CardRemoved
        ));
        assert_eq!(
            TransportError::from(transmit_error(pcsc::Error::ResetCard)),
            TransportError::Removed
        );
        assert_eq!(
            TransportError::from(transmit_error(pcsc::Error::RemovedCard)),
            TransportError::Removed
        );
    }

    #[test]
    fn test_other_transmit_errors_pass_through() {
        assert!(matches!(
            transmit_error(pcsc::Error::Timeout),
            PcscError::Pcsc(pcsc::Error::Timeout)
        ));
    }
}
