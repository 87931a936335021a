//! Scan worker
//!
//! Each scan runs on its own thread, which owns the tag source and the
//! channel for the scan's duration and blocks on every exchange. The
//! presentation side only sees [`ScanEvent`]s and the shared session, which
//! the worker writes when the tag is detected and when the scan ends.
//!
//! A timed out scan is abandoned, not stopped: its worker keeps the channel
//! until its current exchange returns, and the session refuses new scans
//! until then.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use idcheck_apdu_core::{TagSource, TransportError};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::{Authenticator, ScanReport};
use crate::error::{Error, Result};
use crate::files::Record;
use crate::reader::ReadError;
use crate::session::AuthenticationSession;
use crate::state::{FailureReason, ScanState};

/// Session shared between the worker and the presentation layer
pub type SharedSession = Arc<Mutex<AuthenticationSession>>;

/// Sender for scan events
pub type ScanEventSender = Sender<ScanEvent>;
/// Receiver for scan events
pub type ScanEventReceiver = Receiver<ScanEvent>;

/// Progress reported by a scan worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A document was presented; the scanning indicator can be cleared
    TagDetected,
    /// The scan ended in this state
    Finished(ScanState),
}

/// Starts scans against a shared session
#[derive(Debug, Clone)]
pub struct Scanner {
    authenticator: Authenticator,
    session: SharedSession,
    config: EngineConfig,
}

impl Scanner {
    /// Create a scanner with a fresh session
    pub fn new(authenticator: Authenticator, config: EngineConfig) -> Self {
        Self::with_session(
            authenticator,
            Arc::new(Mutex::new(AuthenticationSession::new())),
            config,
        )
    }

    /// Create a scanner on top of an existing session
    pub const fn with_session(
        authenticator: Authenticator,
        session: SharedSession,
        config: EngineConfig,
    ) -> Self {
        Self {
            authenticator,
            session,
            config,
        }
    }

    /// Handle on the shared session
    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    /// Engine configuration
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a scan on a dedicated thread
    ///
    /// Fails with [`SessionError::ScanInProgress`](crate::SessionError::ScanInProgress)
    /// while another scan is pending.
    pub fn request_scan<S>(&self, source: S) -> Result<ScanHandle>
    where
        S: TagSource + 'static,
    {
        let generation = {
            let mut session = self.session.lock();
            let generation = session.request_scan()?;
            session.worker_started();
            generation
        };
        let (sender, receiver) = unbounded();

        let authenticator = self.authenticator.clone();
        let session = Arc::clone(&self.session);
        let spawned = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || run_scan(generation, source, &authenticator, &session, &sender));

        let worker = match spawned {
            Ok(worker) => worker,
            Err(e) => {
                let error = ReadError::Transport(TransportError::other(e.to_string()));
                let mut session = self.session.lock();
                session.complete(
                    generation,
                    ScanReport::failed(FailureReason::ReadFailed {
                        record: Record::Certificate,
                        error,
                    }),
                );
                session.worker_exited(generation);
                return Err(Error::Spawn(e));
            }
        };

        debug!(generation, "Scan requested");
        Ok(ScanHandle {
            generation,
            events: receiver,
            session: Arc::clone(&self.session),
            scan_timeout: self.config.scan_timeout,
            detection_timeout: self.config.detection_timeout,
            started: Instant::now(),
            worker: Some(worker),
        })
    }
}

fn run_scan<S: TagSource>(
    generation: u64,
    mut source: S,
    authenticator: &Authenticator,
    session: &Mutex<AuthenticationSession>,
    events: &ScanEventSender,
) {
    let _exit = WorkerExit {
        generation,
        session,
    };

    let report = match source.wait_for_tag() {
        Ok(mut transport) => {
            if session.lock().tag_detected(generation) {
                // The receiver may be gone; the session still holds the outcome
                let _ = events.send(ScanEvent::TagDetected);
            }
            authenticator.scan(&mut transport)
        }
        Err(TransportError::Timeout) => {
            warn!("No document presented");
            ScanReport::failed(FailureReason::NoDocument)
        }
        Err(error) => {
            warn!(%error, "Waiting for a document failed");
            ScanReport::failed(FailureReason::ReadFailed {
                record: Record::Certificate,
                error: ReadError::Transport(error),
            })
        }
    };

    let state = report.state.clone();
    if session.lock().complete(generation, report) {
        info!(generation, %state, "Scan finished");
        let _ = events.send(ScanEvent::Finished(state));
    }
}

/// Releases the session's worker slot when the worker ends, panics included
struct WorkerExit<'a> {
    generation: u64,
    session: &'a Mutex<AuthenticationSession>,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        self.session.lock().worker_exited(self.generation);
    }
}

/// Handle on a running scan
#[derive(Debug)]
pub struct ScanHandle {
    generation: u64,
    events: ScanEventReceiver,
    session: SharedSession,
    scan_timeout: Option<Duration>,
    detection_timeout: Option<Duration>,
    started: Instant,
    worker: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Identifier of this scan in the session
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Events emitted by the worker
    pub const fn events(&self) -> &ScanEventReceiver {
        &self.events
    }

    /// Block until the scan ends or the timeout expires
    pub fn wait(self) -> ScanState {
        self.wait_with(|_| {})
    }

    /// Like [`wait`](Self::wait), calling `on_event` for every worker event
    ///
    /// The detection timeout runs from the request until the document is
    /// presented, the scan timeout from then until the result. On expiry the
    /// session moves to `Errored(NoDocument)` or `Errored(Timeout)` and
    /// whatever the worker reports later is discarded.
    pub fn wait_with(mut self, mut on_event: impl FnMut(&ScanEvent)) -> ScanState {
        let mut deadline = self.detection_timeout.map(|timeout| self.started + timeout);

        loop {
            let received = match deadline {
                Some(deadline) => self.events.recv_deadline(deadline),
                None => self.events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(event) => {
                    on_event(&event);
                    match event {
                        ScanEvent::TagDetected => {
                            deadline = self.scan_timeout.map(|timeout| Instant::now() + timeout);
                        }
                        ScanEvent::Finished(state) => {
                            self.join();
                            return state;
                        }
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    let (timed_out, state) = {
                        let mut session = self.session.lock();
                        (session.time_out(self.generation), session.state().clone())
                    };
                    if timed_out {
                        warn!(generation = self.generation, %state, "Scan abandoned");
                        on_event(&ScanEvent::Finished(state.clone()));
                    }
                    return state;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // Worker ended without publishing: stale result or panic
                    self.join();
                    let mut session = self.session.lock();
                    if session.is_pending() && session.generation() == self.generation {
                        let error =
                            ReadError::Transport(TransportError::other("scan worker stopped"));
                        session.complete(
                            self.generation,
                            ScanReport::failed(FailureReason::ReadFailed {
                                record: Record::Certificate,
                                error,
                            }),
                        );
                    }
                    return session.state().clone();
                }
            }
        }
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(generation = self.generation, "Scan worker panicked");
            }
        }
    }
}
