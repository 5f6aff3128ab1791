//! Integration tests: scanner → command queue → state machine → motor
//! supervisor, on host with mock peripherals.

use embassy_sync::channel::Channel;

use postbox::allowlist::{AllowList, TagId};
use postbox::app::events::AppEvent;
use postbox::app::ports::{DriveChannels, EventSink, StoragePort, TagReaderPort};
use postbox::command::{self, CommandChannel};
use postbox::config::SystemConfig;
use postbox::error::{ReaderError, StorageError};
use postbox::fsm::{Fsm, FsmContext, StateId};
use postbox::inputs::SensorFlags;
use postbox::motor::{self, Direction, MotorSupervisor, RequestChannel, DRIVE_DUTY_PERCENT};
use postbox::scanner::{self, TagAccess};

// ── Mock peripherals ──────────────────────────────────────────

struct MemStorage {
    sector: [u8; 64],
}

impl MemStorage {
    fn new() -> Self {
        Self { sector: [0xFF; 64] }
    }
}

impl StoragePort for MemStorage {
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError> {
        let off = offset as usize;
        buf.copy_from_slice(&self.sector[off..off + buf.len()]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError> {
        let off = offset as usize;
        self.sector[off..off + data.len()].copy_from_slice(data);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDrive {
    forward: u8,
    reverse: u8,
}

impl DriveChannels for RecordingDrive {
    fn set_forward(&mut self, duty_percent: u8) {
        self.forward = duty_percent;
    }

    fn set_reverse(&mut self, duty_percent: u8) {
        self.reverse = duty_percent;
    }
}

struct SingleTagReader {
    uid: TagId,
}

impl TagReaderPort for SingleTagReader {
    fn wait_for_tag(&mut self) -> Result<(), ReaderError> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn select(&mut self) -> Result<TagId, ReaderError> {
        Ok(self.uid.clone())
    }
}

#[derive(Default)]
struct CapturingSink {
    events: Vec<AppEvent>,
}

impl EventSink for CapturingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

fn tag(bytes: &[u8]) -> TagId {
    TagId::from_slice(bytes).unwrap()
}

// ── End-to-end flows ──────────────────────────────────────────

#[test]
fn accepted_tag_drives_the_mail_flap_open_and_shut() {
    static CMD: CommandChannel = Channel::new();
    static MOT: RequestChannel = Channel::new();

    let flags = SensorFlags::new();
    let mut storage = MemStorage::new();
    let mut list = AllowList::new();
    list.add(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
    let access = TagAccess::new(list);

    // Scanner sees the enrolled tag and queues the open request.
    let mut reader = SingleTagReader {
        uid: tag(&[0xAA, 0xBB, 0xCC, 0xDD]),
    };
    let mut sink = CapturingSink::default();
    assert!(scanner::scan_cycle(&mut reader, &access, &CMD, &mut sink));
    assert!(matches!(sink.events[0], AppEvent::TagAccepted { .. }));

    // Control tick consumes it and orders the unlocking stroke.
    let mut fsm = Fsm::new(StateId::Closed);
    let mut ctx = FsmContext::new(
        &flags,
        &CMD,
        &MOT,
        &access,
        &mut storage,
        SystemConfig::default(),
    );
    fsm.tick(&mut ctx);
    assert_eq!(fsm.current_state(), StateId::Waiting);

    // The supervisor runs the stroke until the mail endstop trips.
    let mut supervisor = MotorSupervisor::new(&flags, &MOT, RecordingDrive::default());
    supervisor.cycle(0);
    assert_eq!(supervisor.drive().reverse, DRIVE_DUTY_PERCENT);
    assert_eq!(supervisor.drive().forward, 0);

    flags.set_mail_open();
    supervisor.cycle(0);
    assert_eq!(supervisor.drive().reverse, 0);

    // Endstop resolves the wait; the closing stroke is ordered next.
    fsm.tick(&mut ctx);
    assert_eq!(fsm.current_state(), StateId::MailOpening);
    fsm.tick(&mut ctx);
    assert_eq!(fsm.current_state(), StateId::Waiting);

    supervisor.cycle(0);
    assert_eq!(supervisor.drive().forward, DRIVE_DUTY_PERCENT);

    flags.set_door_closed();
    supervisor.cycle(0);
    assert_eq!(supervisor.drive().forward, 0);

    fsm.tick(&mut ctx);
    assert_eq!(fsm.current_state(), StateId::Closed);
}

#[test]
fn taught_tags_survive_a_power_cycle() {
    static CMD: CommandChannel = Channel::new();

    let mut storage = MemStorage::new();
    AllowList::new().save(&mut storage);

    // Programming session: teach two tags, pull the jumper.
    let access = TagAccess::new(AllowList::load(&storage).unwrap());
    access.set_programming_mode();
    assert_eq!(
        access.handle_tag(&tag(&[1, 2, 3, 4]), &CMD),
        scanner::ScanOutcome::Learned
    );
    assert_eq!(
        access.handle_tag(&tag(&[5, 6, 7, 8, 9, 10, 11]), &CMD),
        scanner::ScanOutcome::Learned
    );
    access.set_normal_mode(&mut storage);

    // "Reboot": reload from the same storage.
    let reloaded = AllowList::load(&storage).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains(&[1, 2, 3, 4]));
    assert!(reloaded.contains(&[5, 6, 7, 8, 9, 10, 11]));
    assert!(!reloaded.contains(&[1, 2, 3, 5]));
}

#[test]
fn parcel_lockout_round_trip_with_live_clock() {
    static CMD: CommandChannel = Channel::new();
    static MOT: RequestChannel = Channel::new();

    let flags = SensorFlags::new();
    let mut storage = MemStorage::new();
    let access = TagAccess::new(AllowList::new());
    let mut fsm = Fsm::new(StateId::ParcelLocked);
    let mut ctx = FsmContext::new(
        &flags,
        &CMD,
        &MOT,
        &access,
        &mut storage,
        SystemConfig::default(),
    );

    command::push(&CMD, postbox::command::Command::OpenParcel);
    ctx.now_ms = 1_000;
    fsm.tick(&mut ctx);
    assert_eq!(fsm.current_state(), StateId::Waiting);
    assert_eq!(ctx.indicators.red, Some(true));
    assert!(MOT.try_receive().is_err());

    // Ten 100 ms ticks cover the 1 s lockout.
    for i in 1..=10 {
        ctx.now_ms = 1_000 + i * 100;
        fsm.tick(&mut ctx);
    }
    assert_eq!(fsm.current_state(), StateId::ParcelLocked);
    assert_eq!(ctx.indicators.red, Some(false));
}

#[test]
fn motor_fault_is_reported_once_per_request() {
    static CMD: CommandChannel = Channel::new();
    static MOT: RequestChannel = Channel::new();

    let flags = SensorFlags::new();
    let mut storage = MemStorage::new();
    let access = TagAccess::new(AllowList::new());
    let mut fsm = Fsm::new(StateId::Closed);
    let mut ctx = FsmContext::new(
        &flags,
        &CMD,
        &MOT,
        &access,
        &mut storage,
        SystemConfig::default(),
    );

    // A parcel request whose endstop never trips.
    command::push(&CMD, postbox::command::Command::OpenParcel);
    fsm.tick(&mut ctx);

    let request = MOT.try_receive().unwrap();
    assert_eq!(request.direction, Direction::Reverse);
    assert_eq!(request.timeout_cycles, 300);
    MOT.try_send(request).unwrap();

    let mut supervisor = MotorSupervisor::new(&flags, &MOT, RecordingDrive::default());
    let mut faults = 0;
    for _ in 0..400 {
        if supervisor.cycle(0).is_some() {
            faults += 1;
        }
    }
    assert_eq!(faults, 1);
    assert_eq!(supervisor.direction(), Direction::Stop);
    assert_eq!(supervisor.drive().forward, 0);
    assert_eq!(supervisor.drive().reverse, 0);
}
