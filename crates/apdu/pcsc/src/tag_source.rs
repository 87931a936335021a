//! Tag detection on top of the PC/SC monitor

use std::time::Instant;

use idcheck_apdu_core::{TagSource, TransportError};
use tracing::{debug, info};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::manager::PcscDeviceManager;
use crate::monitor::{CardEvent, PcscMonitor};
use crate::transport::PcscTransport;

/// Hands out a [`PcscTransport`] each time a document is presented to a reader
#[allow(missing_debug_implementations)]
pub struct PcscTagSource {
    manager: PcscDeviceManager,
    monitor: PcscMonitor,
    config: PcscConfig,
}

impl PcscTagSource {
    /// Create a tag source with its own PC/SC context
    pub fn new(config: PcscConfig) -> Result<Self, PcscError> {
        let manager = PcscDeviceManager::new()?;
        Ok(Self::with_manager(manager, config))
    }

    /// Create a tag source on top of an existing device manager
    pub fn with_manager(manager: PcscDeviceManager, config: PcscConfig) -> Self {
        let monitor = manager.monitor();
        Self {
            manager,
            monitor,
            config,
        }
    }

    fn accepts(&self, reader: &str) -> bool {
        self.config.reader.as_deref().is_none_or(|wanted| wanted == reader)
    }

    /// Block until a card is present on an accepted reader and connect to it
    pub fn wait_for_card(&mut self) -> Result<PcscTransport, PcscError> {
        let started = Instant::now();
        info!(reader = ?self.config.reader, "Waiting for a document");

        loop {
            let events = self.monitor.wait_for_card_events(self.config.poll_interval)?;

            for event in events {
                if let CardEvent::Inserted { reader, atr } = event {
                    if !self.accepts(&reader) {
                        debug!(%reader, "Ignoring card on unselected reader");
                        continue;
                    }

                    debug!(%reader, atr = %hex::encode_upper(&atr), "Document detected");
                    return self
                        .manager
                        .open_reader_with_config(&reader, self.config.clone());
                }
            }

            if let Some(timeout) = self.config.detection_timeout {
                if started.elapsed() >= timeout {
                    return Err(PcscError::Timeout);
                }
            }
        }
    }
}

impl TagSource for PcscTagSource {
    type Transport = PcscTransport;

    fn wait_for_tag(&mut self) -> Result<Self::Transport, TransportError> {
        self.wait_for_card().map_err(Into::into)
    }
}

