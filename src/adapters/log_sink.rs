//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production). A future network
//! adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={state:?}");
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {from:?} -> {to:?}");
            }
            AppEvent::MotorFault(fault) => {
                warn!("MOTOR | fault: {fault}");
            }
            AppEvent::TagAccepted { uid } => {
                info!("TAG   | accepted {:02x?}", uid.as_slice());
            }
            AppEvent::TagLearned { uid } => {
                info!("TAG   | learned {:02x?}", uid.as_slice());
            }
            AppEvent::TagRejected { uid, reason } => {
                warn!("TAG   | rejected {:02x?}: {reason}", uid.as_slice());
            }
        }
    }
}
