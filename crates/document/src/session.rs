//! Authentication session shared with the presentation layer
//!
//! The session holds what the presentation layer shows: the status text, the
//! scanning indicator, the last fingerprint and the printed key entered by the
//! user. It is written by the scan worker only at hand-off points (tag
//! detected, scan finished) and read by the presentation layer in between.

use std::fmt;

use tracing::{debug, warn};

use crate::engine::{ScanReport, in_progress_message};
use crate::fingerprint::{Fingerprint, normalize};
use crate::state::{FailureReason, ScanState};

/// Error raised by a session operation that is not allowed in its current state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// A scan is already in flight
    #[error("a scan is already in progress ({0})")]
    ScanInProgress(ScanState),

    /// The worker of an abandoned scan still holds the channel
    #[error("the previous scan has not released the reader yet")]
    ReaderBusy,
}

/// Result of comparing a printed key with the last fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyComparison {
    /// The printed key equals the fingerprint
    Match,
    /// The printed key differs from the fingerprint
    Mismatch,
    /// No scan has produced a fingerprint yet
    NoFingerprintYet,
}

impl KeyComparison {
    /// Compare `entered` with `fingerprint`, ignoring case, whitespace and `:`
    pub fn of(entered: &str, fingerprint: Option<&Fingerprint>) -> Self {
        match fingerprint {
            None => Self::NoFingerprintYet,
            Some(fingerprint) if normalize(entered) == fingerprint.to_hex() => Self::Match,
            Some(_) => Self::Mismatch,
        }
    }

    /// Whether the key matched
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for KeyComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("Keys match"),
            Self::Mismatch => f.write_str("Keys do NOT match"),
            Self::NoFingerprintYet => f.write_str("No fingerprint yet: scan a document first"),
        }
    }
}

/// Per-scan state observed by the presentation layer
#[derive(Debug, Clone)]
pub struct AuthenticationSession {
    state: ScanState,
    status: String,
    scanning: bool,
    fingerprint: Option<Fingerprint>,
    entered_key: Option<String>,
    last_report: Option<ScanReport>,
    generation: u64,
    worker_active: bool,
}

impl Default for AuthenticationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationSession {
    /// Create an idle session
    pub fn new() -> Self {
        Self {
            state: ScanState::Idle,
            status: in_progress_message(&ScanState::Idle).to_string(),
            scanning: false,
            fingerprint: None,
            entered_key: None,
            last_report: None,
            generation: 0,
            worker_active: false,
        }
    }

    /// Current state
    pub const fn state(&self) -> &ScanState {
        &self.state
    }

    /// Consolidated status text
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Whether the scanning indicator should be shown
    pub const fn scanning(&self) -> bool {
        self.scanning
    }

    /// Fingerprint of the last verified certificate
    pub const fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Report of the last finished scan
    pub const fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }

    /// Identifier of the current scan, bumped by every accepted request
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a scan is in flight
    pub const fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Whether a scan worker is still running, even for an abandoned scan
    pub const fn worker_active(&self) -> bool {
        self.worker_active
    }

    /// Start a new scan, discarding the previous result
    ///
    /// Rejected while another scan is pending, or while the worker of a timed
    /// out scan has not exited. Returns the generation that identifies the
    /// new scan.
    pub fn request_scan(&mut self) -> Result<u64, SessionError> {
        if self.state.is_pending() {
            warn!(state = %self.state, "Scan requested while another is in progress");
            return Err(SessionError::ScanInProgress(self.state.clone()));
        }
        if self.worker_active {
            warn!(
                generation = self.generation,
                "Scan requested while the last worker is running"
            );
            return Err(SessionError::ReaderBusy);
        }

        self.generation += 1;
        self.fingerprint = None;
        self.last_report = None;
        self.scanning = true;
        self.set_state(ScanState::AwaitingTag);
        self.status = in_progress_message(&self.state).to_string();
        Ok(self.generation)
    }

    /// A worker now drives the channel for the current scan
    pub(crate) fn worker_started(&mut self) {
        self.worker_active = true;
    }

    /// The worker of scan `generation` has released the channel
    pub(crate) fn worker_exited(&mut self, generation: u64) {
        if self.is_current(generation) {
            debug!(generation, "Scan worker exited");
            self.worker_active = false;
        }
    }

    /// A document was presented for scan `generation`
    ///
    /// Clears the scanning indicator. Ignored for a stale generation.
    pub fn tag_detected(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) || self.state != ScanState::AwaitingTag {
            return false;
        }
        self.scanning = false;
        self.set_state(ScanState::Connected);
        self.status = in_progress_message(&self.state).to_string();
        true
    }

    /// Publish the outcome of scan `generation`
    ///
    /// A report for a scan that is no longer current, or that already ended,
    /// is discarded.
    pub fn complete(&mut self, generation: u64, report: ScanReport) -> bool {
        if !self.is_current(generation) || !self.state.is_pending() {
            warn!(generation, current = self.generation, "Discarding stale scan result");
            return false;
        }

        self.scanning = false;
        self.fingerprint = report.fingerprint;
        self.status = report.status_message();
        self.set_state(report.state.clone());
        self.last_report = Some(report);
        true
    }

    /// Abort scan `generation` because it did not finish in time
    ///
    /// Still waiting for a tag means no document was presented; otherwise the
    /// document stopped answering.
    pub fn time_out(&mut self, generation: u64) -> bool {
        let reason = if self.state == ScanState::AwaitingTag {
            FailureReason::NoDocument
        } else {
            FailureReason::Timeout
        };
        self.complete(generation, ScanReport::failed(reason))
    }

    /// Record the key printed on the document
    pub fn enter_printed_key(&mut self, text: impl Into<String>) {
        self.entered_key = Some(text.into());
    }

    /// The key last entered by the user
    pub fn entered_key(&self) -> Option<&str> {
        self.entered_key.as_deref()
    }

    /// Compare the entered printed key with the last fingerprint
    ///
    /// An absent key compares as empty text.
    pub fn compare_key(&self) -> KeyComparison {
        self.compare(self.entered_key.as_deref().unwrap_or_default())
    }

    /// Compare `entered` with the last fingerprint
    pub fn compare(&self, entered: &str) -> KeyComparison {
        let result = KeyComparison::of(entered, self.fingerprint.as_ref());
        debug!(?result, "Compared printed key");
        result
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    fn set_state(&mut self, state: ScanState) {
        debug!(from = %self.state, to = %state, "Session transition");
        self.state = state;
    }
}
