//! PC/SC transport implementation for APDU operations
//!
//! This crate provides the platform side of a document scan on desktop
//! systems: it lists contactless readers, watches them for a presented card
//! and exposes the card as an `idcheck_apdu_core::CardTransport`.
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use idcheck_apdu_core::prelude::*;
//! use idcheck_apdu_transport_pcsc::{PcscConfig, PcscTagSource};
//!
//! // Block until a document is placed on any reader
//! let mut source = PcscTagSource::new(PcscConfig::default())?;
//! let mut transport = source.wait_for_tag()?;
//!
//! // Select the certificate file
//! let select = Command::new_with_data(0x00, 0xA4, 0x00, 0x0C, vec![0x01, 0x02])?;
//! let response = transport.exchange(&select)?;
//! println!("Status: {}", response.status());
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod monitor;
mod reader;
mod tag_source;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscDeviceManager;
pub use monitor::{CardEvent, PcscMonitor};
pub use reader::PcscReader;
pub use tag_source::PcscTagSource;
pub use transport::PcscTransport;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};
