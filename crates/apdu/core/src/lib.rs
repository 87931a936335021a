//! Core types for APDU (Application Protocol Data Unit) exchanges
//!
//! This crate provides the foundational types used to talk to a contactless
//! identity document according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! - [`Command`]: a short APDU command, serialised as `CLA INS P1 P2 [Lc data] [Le]`
//! - [`Response`]: the payload plus the trailing status word returned by the chip
//! - [`StatusWord`]: SW1-SW2 interpretation, `90 00` being the only success
//! - [`CardTransport`]: the duplex byte channel to a chip that is in range
//! - [`TagSource`]: the platform facility that blocks until a chip is presented
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod response;
pub mod transport;

pub use command::{Command, CommandError, ExpectedLength};
pub use response::status::StatusWord;
pub use response::{Response, ResponseClass, ResponseError, StatusError};
pub use transport::{CardTransport, TagSource, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, CardTransport, Command, CommandError, Response, ResponseClass,
        ResponseError, StatusError, StatusWord, TagSource, TransportError,
        response::status::common as status,
    };
}
