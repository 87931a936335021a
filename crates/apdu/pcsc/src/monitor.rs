//! Monitor implementation for card presence events

use std::collections::HashMap;
use std::time::Duration;

use pcsc::{Context, ReaderState, State};
use tracing::{debug, trace};

use crate::error::PcscError;
use crate::reader::card_present;

/// Events related to card insertion/removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardEvent {
    /// Card was placed on a reader
    Inserted {
        /// Reader name
        reader: String,
        /// ATR of the inserted card
        atr: Vec<u8>,
    },
    /// Card was removed from a reader
    Removed {
        /// Reader name
        reader: String,
    },
}

/// Monitor for PC/SC card presence events
#[allow(missing_debug_implementations)]
pub struct PcscMonitor {
    /// PC/SC context
    context: Context,
    /// Previously seen presence and ATR per reader (to avoid duplicates)
    previous_states: HashMap<String, (bool, Vec<u8>)>,
}

impl PcscMonitor {
    /// Create a new monitor
    pub(crate) fn new(context: Context) -> Self {
        Self {
            context,
            previous_states: HashMap::new(),
        }
    }

    /// Wait for card events, blocking at most `timeout`
    ///
    /// The first call reports every card already present as `Inserted`.
    pub fn wait_for_card_events(&mut self, timeout: Duration) -> Result<Vec<CardEvent>, PcscError> {
        let readers = match self.context.list_readers_owned() {
            Ok(readers) => readers,
            // Readers may be plugged in later, treat as "nothing happened yet"
            Err(pcsc::Error::NoReadersAvailable) => {
                std::thread::sleep(timeout);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut reader_states: Vec<ReaderState> = readers
            .into_iter()
            .map(|reader| {
                let name = reader.to_string_lossy().into_owned();
                let known = match self.previous_states.get(&name) {
                    Some((true, _)) => State::PRESENT,
                    Some((false, _)) => State::EMPTY,
                    None => State::UNAWARE,
                };
                ReaderState::new(reader, known)
            })
            .collect();

        match self.context.get_status_change(Some(timeout), &mut reader_states) {
            Ok(()) => {}
            Err(pcsc::Error::Timeout) => {
                trace!("No reader state change before timeout");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        }

        let mut events = Vec::new();
        for rs in &reader_states {
            let name = rs.name().to_string_lossy().into_owned();
            let present = card_present(rs.event_state());
            let atr = if present { rs.atr().to_vec() } else { Vec::new() };

            let changed = match self.previous_states.get(&name) {
                Some((was_present, prev_atr)) => *was_present != present || *prev_atr != atr,
                None => present,
            };

            if changed {
                let event = if present {
                    CardEvent::Inserted {
                        reader: name.clone(),
                        atr: atr.clone(),
                    }
                } else {
                    CardEvent::Removed {
                        reader: name.clone(),
                    }
                };
                debug!(?event, "Card event");
                events.push(event);
            }
            self.previous_states.insert(name, (present, atr));
        }

        Ok(events)
    }
}
