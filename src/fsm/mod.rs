//! Table-driven state machine for the door controller.
//!
//! Each state is a row in a fixed dispatch table: an id, a display name
//! and an update function. The engine runs one update per control tick
//! and applies the returned transition, logging every state change.

mod context;
mod states;

pub use context::{FsmContext, GreenAction, IndicatorCommands, PowerAction, WaitState};

use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StateId {
    Closed = 0,
    ParcelOpening = 1,
    MailOpening = 2,
    ParcelLocked = 3,
    /// Half-open position for oversized mail. No trigger is wired up in
    /// this hardware revision, so the state is currently unreachable.
    SecureOpen = 4,
    Waiting = 5,
    ProgrammingMode = 6,
}

impl StateId {
    pub const COUNT: usize = 7;

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        STATE_TABLE[self.index()].name
    }
}

type UpdateFn = for<'a> fn(&mut FsmContext<'a>) -> Option<StateId>;

struct StateDescriptor {
    id: StateId,
    name: &'static str,
    update: UpdateFn,
}

static STATE_TABLE: [StateDescriptor; StateId::COUNT] = [
    StateDescriptor {
        id: StateId::Closed,
        name: "closed",
        update: states::closed_update,
    },
    StateDescriptor {
        id: StateId::ParcelOpening,
        name: "parcel-opening",
        update: states::parcel_opening_update,
    },
    StateDescriptor {
        id: StateId::MailOpening,
        name: "mail-opening",
        update: states::mail_opening_update,
    },
    StateDescriptor {
        id: StateId::ParcelLocked,
        name: "parcel-locked",
        update: states::parcel_locked_update,
    },
    StateDescriptor {
        id: StateId::SecureOpen,
        name: "secure-open",
        update: states::secure_open_update,
    },
    StateDescriptor {
        id: StateId::Waiting,
        name: "waiting",
        update: states::waiting_update,
    },
    StateDescriptor {
        id: StateId::ProgrammingMode,
        name: "programming",
        update: states::programming_update,
    },
];

pub struct Fsm {
    current: StateId,
    tick_count: u64,
}

impl Fsm {
    pub fn new(initial: StateId) -> Self {
        Self {
            current: initial,
            tick_count: 0,
        }
    }

    pub fn current_state(&self) -> StateId {
        self.current
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run one control tick: reset the per-tick latches, poll the one-shot
    /// timer, dispatch the current state's update and apply any
    /// transition.
    pub fn tick(&mut self, ctx: &mut FsmContext<'_>) {
        self.tick_count += 1;
        ctx.begin_tick();
        ctx.poll_timer();

        let row = &STATE_TABLE[self.current.index()];
        debug_assert_eq!(row.id, self.current);
        if let Some(next) = (row.update)(ctx) {
            self.transition(next);
        }
    }

    fn transition(&mut self, next: StateId) {
        if next == self.current {
            debug!("state: {} re-entered", self.current.name());
        } else {
            info!("state: {} -> {}", self.current.name(), next.name());
        }
        self.current = next;
    }
}
