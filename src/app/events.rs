//! Structured events emitted by the control tasks.

use crate::allowlist::TagId;
use crate::error::{AllowListError, MotorError};
use crate::fsm::StateId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Control loop came up in the given state.
    Started(StateId),
    /// The state machine moved to a new state.
    StateChanged { from: StateId, to: StateId },
    /// The motor supervisor forced a stop before the stop condition was met.
    MotorFault(MotorError),
    /// A known tag was presented outside programming mode.
    TagAccepted { uid: TagId },
    /// An unknown tag was stored while programming mode was active.
    TagLearned { uid: TagId },
    /// A tag could not be stored.
    TagRejected { uid: TagId, reason: AllowListError },
}
