//! State update handlers.
//!
//! Every opening sequence runs through [`StateId::Waiting`]: the active
//! state queues a motor request, parks the machine on a door-position or
//! timer condition, and the wait resolves into the follow-up state.

use log::{info, warn};

use crate::command::{self, Command};
use crate::fsm::{FsmContext, GreenAction, PowerAction, StateId};
use crate::inputs::Condition;
use crate::motor::{self, Direction};

/// Rest state: door shut, motor off. Watches the mode jumper and the
/// request queue.
pub(super) fn closed_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    if ctx.flags.mode_select() {
        return Some(StateId::ProgrammingMode);
    }

    match command::pop(ctx.commands) {
        Some(Command::OpenParcel) => {
            ctx.begin_wait(Condition::ParcelOpen, StateId::ParcelOpening, false);
            motor::send_request(
                ctx.motor,
                Direction::Reverse,
                ctx.config.motor_timeout_secs,
                Condition::ParcelOpen,
            );
            Some(StateId::Waiting)
        }
        Some(Command::OpenMail) => start_mail_opening(ctx),
        None => {
            ctx.power = PowerAction::CheckIdle;
            None
        }
    }
}

/// Parcel door reached the open position: drive it shut again and lock
/// further parcel deliveries behind the lockout.
pub(super) fn parcel_opening_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    ctx.power = PowerAction::Trigger;
    motor::send_request(
        ctx.motor,
        Direction::Forward,
        ctx.config.motor_timeout_secs,
        Condition::DoorClosed,
    );
    // Requests queued while the door was moving are stale.
    command::flush(ctx.commands);
    ctx.begin_wait(Condition::DoorClosed, StateId::ParcelLocked, false);
    Some(StateId::Waiting)
}

/// Mail flap reached the open position: drive it shut and return to rest.
pub(super) fn mail_opening_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    ctx.power = PowerAction::Trigger;
    motor::send_request(
        ctx.motor,
        Direction::Forward,
        ctx.config.motor_timeout_secs,
        Condition::DoorClosed,
    );
    command::flush(ctx.commands);
    ctx.begin_wait(Condition::DoorClosed, StateId::Closed, false);
    Some(StateId::Waiting)
}

/// A parcel is inside: parcel requests only earn a red-light lockout
/// delay, mail access stays available.
pub(super) fn parcel_locked_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    match command::pop(ctx.commands) {
        Some(Command::OpenParcel) => {
            ctx.start_timer(ctx.config.lockout_wait_ms);
            ctx.begin_wait(Condition::TimerExpired, StateId::ParcelLocked, true);
            Some(StateId::Waiting)
        }
        Some(Command::OpenMail) => start_mail_opening(ctx),
        None => {
            ctx.power = PowerAction::CheckIdle;
            None
        }
    }
}

/// Unreachable with the current hardware; kept so the half-open position
/// can be wired up without touching the table.
pub(super) fn secure_open_update(_ctx: &mut FsmContext<'_>) -> Option<StateId> {
    warn!("state: secure-open has no trigger wired up");
    None
}

/// Generic wait: poll the pending condition every tick, holding the
/// system awake, and resolve into the follow-up state.
pub(super) fn waiting_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    ctx.power = PowerAction::Trigger;
    if ctx.wait.condition.is_met(ctx.flags) {
        ctx.indicators.red = Some(false);
        return Some(ctx.wait.next);
    }
    None
}

/// Tag-teaching session, entered and held by the mode jumper. Blinks the
/// green indicator and polls for the jumper being pulled.
pub(super) fn programming_update(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    ctx.access.set_programming_mode();
    ctx.power = PowerAction::Trigger;
    ctx.indicators.green = Some(GreenAction::Toggle);
    ctx.start_timer(ctx.config.programming_poll_ms);
    ctx.begin_wait(Condition::TimerExpired, StateId::ProgrammingMode, false);

    if !ctx.flags.mode_select() {
        ctx.access.set_normal_mode(ctx.storage);
        ctx.indicators.green = Some(GreenAction::On);
        info!("programming session finished");
        return Some(StateId::Closed);
    }
    Some(StateId::Waiting)
}

fn start_mail_opening(ctx: &mut FsmContext<'_>) -> Option<StateId> {
    ctx.begin_wait(Condition::MailOpen, StateId::MailOpening, false);
    motor::send_request(
        ctx.motor,
        Direction::Reverse,
        ctx.config.motor_timeout_secs,
        Condition::MailOpen,
    );
    Some(StateId::Waiting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allowlist::AllowList;
    use crate::app::ports::StoragePort;
    use crate::command::CommandChannel;
    use crate::config::SystemConfig;
    use crate::error::StorageError;
    use crate::fsm::Fsm;
    use crate::inputs::SensorFlags;
    use crate::motor::RequestChannel;
    use crate::scanner::TagAccess;
    use embassy_sync::channel::Channel;

    struct MemStorage {
        page: [u8; 64],
    }

    impl MemStorage {
        fn new() -> Self {
            Self { page: [0; 64] }
        }
    }

    impl StoragePort for MemStorage {
        fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
            let off = offset as usize;
            buf.copy_from_slice(&self.page[off..off + buf.len()]);
            Ok(())
        }

        fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
            let off = offset as usize;
            self.page[off..off + data.len()].copy_from_slice(data);
            Ok(())
        }
    }

    struct Harness {
        flags: SensorFlags,
        commands: &'static CommandChannel,
        motor: &'static RequestChannel,
        access: TagAccess,
        storage: MemStorage,
        config: SystemConfig,
    }

    impl Harness {
        fn new(commands: &'static CommandChannel, motor: &'static RequestChannel) -> Self {
            Self {
                flags: SensorFlags::new(),
                commands,
                motor,
                access: TagAccess::new(AllowList::new()),
                storage: MemStorage::new(),
                config: SystemConfig::default(),
            }
        }

        fn ctx(&mut self) -> FsmContext<'_> {
            FsmContext::new(
                &self.flags,
                self.commands,
                self.motor,
                &self.access,
                &mut self.storage,
                self.config.clone(),
            )
        }
    }

    #[test]
    fn parcel_request_starts_reverse_drive_and_waits() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::Closed);

        command::push(ctx.commands, Command::OpenParcel);
        fsm.tick(&mut ctx);

        assert_eq!(fsm.current_state(), StateId::Waiting);
        assert_eq!(ctx.wait.condition, Condition::ParcelOpen);
        assert_eq!(ctx.wait.next, StateId::ParcelOpening);
        let req = MOT.try_receive().unwrap();
        assert_eq!(req.direction, Direction::Reverse);
        assert_eq!(req.timeout_cycles, 300);
        assert_eq!(req.stop_on, Condition::ParcelOpen);
    }

    #[test]
    fn full_parcel_cycle_ends_locked() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::Closed);

        command::push(ctx.commands, Command::OpenParcel);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);
        let _ = MOT.try_receive().unwrap();

        // Door still moving: the wait holds and keeps the system awake.
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);
        assert_eq!(ctx.power, PowerAction::Trigger);

        ctx.flags.set_parcel_open();
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ParcelOpening);

        // A button mashed mid-cycle must be flushed, not replayed.
        command::push(ctx.commands, Command::OpenParcel);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);
        let req = MOT.try_receive().unwrap();
        assert_eq!(req.direction, Direction::Forward);
        assert_eq!(req.stop_on, Condition::DoorClosed);
        assert_eq!(command::pop(ctx.commands), None);

        ctx.flags.set_door_closed();
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ParcelLocked);
    }

    #[test]
    fn locked_box_rejects_parcel_requests_with_lockout() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::ParcelLocked);

        command::push(ctx.commands, Command::OpenParcel);
        ctx.now_ms = 10_000;
        fsm.tick(&mut ctx);

        assert_eq!(fsm.current_state(), StateId::Waiting);
        assert_eq!(ctx.wait.condition, Condition::TimerExpired);
        assert_eq!(ctx.wait.next, StateId::ParcelLocked);
        assert_eq!(ctx.indicators.red, Some(true));
        // No motor motion during the lockout.
        assert!(MOT.try_receive().is_err());

        ctx.now_ms = 10_500;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);

        ctx.now_ms = 11_000;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ParcelLocked);
        assert_eq!(ctx.indicators.red, Some(false));
    }

    #[test]
    fn locked_box_still_allows_mail_opening() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::ParcelLocked);

        command::push(ctx.commands, Command::OpenMail);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);
        assert_eq!(ctx.wait.next, StateId::MailOpening);
        let req = MOT.try_receive().unwrap();
        assert_eq!(req.direction, Direction::Reverse);
        assert_eq!(req.stop_on, Condition::MailOpen);
    }

    #[test]
    fn mail_cycle_returns_to_closed() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::Closed);

        command::push(ctx.commands, Command::OpenMail);
        fsm.tick(&mut ctx);
        let _ = MOT.try_receive().unwrap();

        ctx.flags.set_mail_open();
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::MailOpening);

        fsm.tick(&mut ctx);
        let req = MOT.try_receive().unwrap();
        assert_eq!(req.direction, Direction::Forward);

        ctx.flags.set_door_closed();
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Closed);
    }

    #[test]
    fn idle_states_allow_sleep() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();

        let mut fsm = Fsm::new(StateId::Closed);
        fsm.tick(&mut ctx);
        assert_eq!(ctx.power, PowerAction::CheckIdle);

        let mut fsm = Fsm::new(StateId::ParcelLocked);
        fsm.tick(&mut ctx);
        assert_eq!(ctx.power, PowerAction::CheckIdle);
    }

    #[test]
    fn jumper_enters_and_leaves_programming_mode() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::Closed);

        ctx.flags.set_mode_select(true);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ProgrammingMode);

        ctx.now_ms = 100;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Waiting);
        assert!(ctx.access.is_programming());
        assert_eq!(ctx.indicators.green, Some(GreenAction::Toggle));
        assert_eq!(ctx.power, PowerAction::Trigger);

        // Poll timer brings the machine back every 100 ms.
        ctx.now_ms = 200;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::ProgrammingMode);

        ctx.flags.set_mode_select(false);
        ctx.now_ms = 300;
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::Closed);
        assert!(!ctx.access.is_programming());
        assert_eq!(ctx.indicators.green, Some(GreenAction::On));
    }

    #[test]
    fn secure_open_holds_without_side_effects() {
        static CMD: CommandChannel = Channel::new();
        static MOT: RequestChannel = Channel::new();
        let mut h = Harness::new(&CMD, &MOT);
        let mut ctx = h.ctx();
        let mut fsm = Fsm::new(StateId::SecureOpen);
        fsm.tick(&mut ctx);
        assert_eq!(fsm.current_state(), StateId::SecureOpen);
        assert!(MOT.try_receive().is_err());
    }
}
