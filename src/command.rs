//! Open-request queue feeding the state machine.
//!
//! Producers run in interrupt context (buttons) and in other threads
//! (console, access scanner), so the queue uses a critical-section channel.
//! The queue is deliberately shallow: while an opening cycle is in progress
//! any excess requests are dropped, and the cycle handlers flush leftovers
//! before waiting for the door to close again.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

pub const QUEUE_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    OpenParcel,
    OpenMail,
}

pub type CommandChannel = Channel<CriticalSectionRawMutex, Command, QUEUE_DEPTH>;

/// Global queue instance. Interrupt handlers push here; the control task
/// drains it once per tick.
pub static COMMANDS: CommandChannel = Channel::new();

/// Non-blocking enqueue. A full queue drops the request silently; callers
/// must not assume delivery.
pub fn push(queue: &CommandChannel, cmd: Command) {
    let _ = queue.try_send(cmd);
}

/// Pop the oldest pending request, if any.
pub fn pop(queue: &CommandChannel) -> Option<Command> {
    queue.try_receive().ok()
}

/// Discard every pending request.
pub fn flush(queue: &CommandChannel) {
    while queue.try_receive().is_ok() {}
}
