//! Access scanner task and the shared tag-access state.
//!
//! The scanner thread owns the reader front end; the control task flips it
//! between normal and programming mode. Both sides go through [`TagAccess`],
//! a mutex around the allow-list plus the mode flag, so a tag is always
//! judged against a consistent snapshot.

use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use crate::allowlist::{AllowList, TagId};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, StoragePort, TagReaderPort};
use crate::command::{self, Command, CommandChannel};
use crate::error::AllowListError;
use crate::power;

/// What one presented tag led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Known tag in normal mode: an open request was queued.
    Accepted,
    /// Unknown tag in programming mode: stored in the allow-list.
    Learned,
    /// Unknown tag in programming mode that could not be stored.
    Rejected(AllowListError),
    /// Tag gave no action in the current mode.
    Ignored,
}

struct AccessInner {
    list: AllowList,
    programming: bool,
}

pub struct TagAccess {
    inner: Mutex<AccessInner>,
}

impl TagAccess {
    pub fn new(list: AllowList) -> Self {
        Self {
            inner: Mutex::new(AccessInner {
                list,
                programming: false,
            }),
        }
    }

    /// Enter programming mode. Idempotent; the first entry wipes the
    /// in-memory list so the session re-teaches from scratch.
    pub fn set_programming_mode(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.programming {
            inner.programming = true;
            inner.list.clear();
            info!("access: programming mode, allow-list cleared");
        }
    }

    /// Leave programming mode. Idempotent; the first exit persists the
    /// freshly taught list.
    pub fn set_normal_mode(&self, storage: &mut dyn StoragePort) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.programming {
            inner.programming = false;
            inner.list.save(storage);
            info!("access: normal mode, {} tags enrolled", inner.list.len());
        }
    }

    pub fn is_programming(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .programming
    }

    /// Judge one presented tag under the current mode and queue the open
    /// request if it is accepted.
    pub fn handle_tag(&self, uid: &TagId, queue: &CommandChannel) -> ScanOutcome {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.list.contains(uid) {
            if inner.programming {
                ScanOutcome::Ignored
            } else {
                command::push(queue, Command::OpenMail);
                ScanOutcome::Accepted
            }
        } else if inner.programming {
            match inner.list.add(uid) {
                Ok(()) => ScanOutcome::Learned,
                Err(e) => ScanOutcome::Rejected(e),
            }
        } else {
            ScanOutcome::Ignored
        }
    }
}

/// One detect/select round. Returns `true` when a tag was selected and the
/// caller should let the field settle before the next round.
pub fn scan_cycle(
    reader: &mut impl TagReaderPort,
    access: &TagAccess,
    queue: &CommandChannel,
    sink: &mut impl EventSink,
) -> bool {
    if let Err(e) = reader.wait_for_tag() {
        // The front end sometimes refuses its detection mode right after a
        // tag left the field mid-transaction; recover without waking the
        // rest of the system.
        warn!("scanner: detection mode unavailable: {e}");
        reader.reset();
        return false;
    }

    power::wakeup();

    match reader.select() {
        Ok(uid) => {
            match access.handle_tag(&uid, queue) {
                ScanOutcome::Accepted => sink.emit(&AppEvent::TagAccepted { uid }),
                ScanOutcome::Learned => sink.emit(&AppEvent::TagLearned { uid }),
                ScanOutcome::Rejected(reason) => {
                    sink.emit(&AppEvent::TagRejected { uid, reason });
                }
                ScanOutcome::Ignored => {}
            }
            true
        }
        Err(_) => false,
    }
}

/// Scanner task body. Pinned to its own core by the bootstrap.
pub fn run(
    mut reader: impl TagReaderPort,
    access: &TagAccess,
    queue: &CommandChannel,
    mut sink: impl EventSink,
    settle: Duration,
) -> ! {
    loop {
        if scan_cycle(&mut reader, access, queue, &mut sink) {
            thread::sleep(settle);
        }
    }
}
