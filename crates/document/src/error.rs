//! Crate level error type

use idcheck_apdu_core::TransportError;

use crate::certificate::{ParseError, TrustedRootError};
use crate::fingerprint::FingerprintError;
use crate::reader::ReadError;
use crate::session::SessionError;

/// Any error raised by the document engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Record read error
    #[error(transparent)]
    Read(#[from] ReadError),

    /// Certificate parse error
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Trusted root loading error
    #[error(transparent)]
    TrustedRoot(#[from] TrustedRootError),

    /// Fingerprint parse error
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Session state error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The scan worker could not be started
    #[error("failed to start scan worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for the document engine
pub type Result<T> = std::result::Result<T, Error>;
