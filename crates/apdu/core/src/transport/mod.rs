//! Transport traits for APDU communication with a document chip
//!
//! A [`CardTransport`] is the duplex byte channel to a chip that is currently in
//! range, a [`TagSource`] is whatever hands such channels out when a chip is
//! presented.

pub mod error;

use std::fmt;

use bytes::Bytes;
pub use error::TransportError;
use tracing::{debug, trace};

use crate::{Command, Response};

/// Trait for basic card transports
///
/// A transport is responsible for sending and receiving raw APDU bytes.
/// It has no knowledge of command structure or protocol details. Every call
/// blocks until the chip answers or the channel fails.
pub trait CardTransport: Send + fmt::Debug {
    /// Send raw APDU bytes to the chip and return response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = %hex::encode_upper(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = %hex::encode_upper(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    ///
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Send a command and read the corresponding response
    ///
    /// Never returns a partial response: either the chip produced at least the
    /// two status bytes, or the exchange fails with a [`TransportError`].
    fn exchange(&mut self, command: &Command) -> Result<Response, TransportError> {
        let raw = self.transmit_raw(&command.to_bytes())?;
        Response::from_bytes(&raw).map_err(|_| TransportError::MalformedResponse(raw.len()))
    }

    /// Check if the transport is connected to a physical chip
    fn is_connected(&self) -> bool;

    /// Reset the transport connection
    fn reset(&mut self) -> Result<(), TransportError>;
}

/// Platform facility that detects a chip and hands out a channel to it
pub trait TagSource: Send {
    /// The channel type handed out per detected tag
    type Transport: CardTransport;

    /// Block until a tag is presented and return a connected channel
    ///
    /// The caller owns the returned transport for the duration of one scan and
    /// releases it by dropping it.
    fn wait_for_tag(&mut self) -> Result<Self::Transport, TransportError>;
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct MockTransport {
    /// Mock responses to return, in order
    pub(crate) responses: Vec<Bytes>,
    /// Commands that were sent
    pub(crate) commands: Vec<Bytes>,
    /// Whether the transport is connected
    pub(crate) connected: bool,
}

#[cfg(test)]
impl MockTransport {
    pub(crate) const fn new(responses: Vec<Bytes>) -> Self {
        Self {
            responses,
            commands: Vec::new(),
            connected: true,
        }
    }
}

#[cfg(test)]
impl CardTransport for MockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::Connection);
        }

        self.commands.push(Bytes::copy_from_slice(command));

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }
        Ok(self.responses.remove(0))
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        self.commands.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusWord;
    use hex_literal::hex;

    #[test]
    fn test_exchange_parses_response() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("0102039000"))]);
        let command = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0x00);

        let response = transport.exchange(&command).unwrap();
        assert_eq!(response.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert!(response.is_success());
        assert_eq!(transport.commands, vec![Bytes::from_static(&hex!("00B0000000"))]);
    }

    #[test]
    fn test_exchange_keeps_error_status() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&hex!("6A82"))]);
        let response = transport.exchange(&Command::new(0x00, 0xA4, 0x00, 0x0C)).unwrap();
        assert_eq!(response.status(), StatusWord::new(0x6A, 0x82));
    }

    #[test]
    fn test_exchange_rejects_short_response() {
        let mut transport = MockTransport::new(vec![Bytes::from_static(&[0x90])]);
        let err = transport.exchange(&Command::new(0x00, 0xA4, 0x00, 0x0C)).unwrap_err();
        assert_eq!(err, TransportError::MalformedResponse(1));
    }

    #[test]
    fn test_exchange_on_closed_channel() {
        let mut transport = MockTransport::new(vec![]);
        transport.connected = false;
        let err = transport.exchange(&Command::new(0x00, 0xA4, 0x00, 0x0C)).unwrap_err();
        assert_eq!(err, TransportError::Connection);
        assert!(transport.commands.is_empty());
    }
}
