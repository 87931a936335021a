//! Passive authentication of contactless identity documents
//!
//! A scan reads the document certificate and the personal data record from
//! the chip, checks the certificate signature against a pinned issuing root
//! and derives a SHA-256 fingerprint of the document's public key, which the
//! holder can compare with the key printed on the document.
//!
//! ```no_run
//! use idcheck_apdu_core::TagSource;
//! use idcheck_document::{Authenticator, EngineConfig, Scanner, TrustedRoot};
//!
//! fn scan_once<S: TagSource + 'static>(source: S) -> idcheck_document::Result<()> {
//!     let root = TrustedRoot::load("csca.pem")?;
//!     let scanner = Scanner::new(Authenticator::new(root), EngineConfig::default());
//!
//!     let state = scanner.request_scan(source)?.wait();
//!     let session = scanner.session();
//!     let session = session.lock();
//!     println!("{state}: {}", session.status());
//!     println!("{}", session.compare("AB12..."));
//!     Ok(())
//! }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]

pub mod commands;
pub mod files;

mod certificate;
mod config;
mod engine;
mod error;
mod fingerprint;
mod reader;
mod session;
mod state;
mod verify;
mod worker;

pub use certificate::{Certificate, ParseError, TrustedRoot, TrustedRootError};
pub use config::{DEFAULT_SCAN_TIMEOUT, EngineConfig};
pub use engine::{Authenticator, PersonalData, ScanReport};
pub use error::{Error, Result};
pub use files::{FileId, Record};
pub use fingerprint::{
    FINGERPRINT_LENGTH, Fingerprint, FingerprintError, fingerprint, normalize as normalize_key,
};
pub use reader::{DocumentReader, RawRecord, ReadError};
pub use session::{AuthenticationSession, KeyComparison, SessionError};
pub use state::{FailureReason, ScanState};
pub use verify::{
    ECDSA_SHA256, ECDSA_SHA384, ECDSA_SHA512, RSA_SHA256, RSA_SHA384, RSA_SHA512, verify,
};
pub use worker::{ScanEvent, ScanEventReceiver, ScanEventSender, ScanHandle, Scanner, SharedSession};
