//! Sensor flags, wait conditions and the software one-shot timer.
//!
//! The hall sensors, buttons and the mode jumper report through interrupt
//! handlers; the control, motor and scanner tasks only ever read the
//! resulting atomic flags. Each flag has a single writer (its interrupt),
//! so plain acquire/release atomics are enough.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::command::{self, Command};
use crate::power;

/// Debounced view of the digital inputs.
///
/// The three door-position flags are mutually exclusive: the hall sensors
/// sit at distinct points of the door travel, so asserting one position
/// clears the other two.
pub struct SensorFlags {
    door_closed: AtomicBool,
    parcel_open: AtomicBool,
    mail_open: AtomicBool,
    mode_select: AtomicBool,
    timer_expired: AtomicBool,
}

impl SensorFlags {
    /// The door is assumed closed until a sensor says otherwise.
    pub const fn new() -> Self {
        Self {
            door_closed: AtomicBool::new(true),
            parcel_open: AtomicBool::new(false),
            mail_open: AtomicBool::new(false),
            mode_select: AtomicBool::new(false),
            timer_expired: AtomicBool::new(false),
        }
    }

    pub fn set_door_closed(&self) {
        self.parcel_open.store(false, Ordering::Release);
        self.mail_open.store(false, Ordering::Release);
        self.door_closed.store(true, Ordering::Release);
    }

    pub fn set_parcel_open(&self) {
        self.door_closed.store(false, Ordering::Release);
        self.mail_open.store(false, Ordering::Release);
        self.parcel_open.store(true, Ordering::Release);
    }

    pub fn set_mail_open(&self) {
        self.door_closed.store(false, Ordering::Release);
        self.parcel_open.store(false, Ordering::Release);
        self.mail_open.store(true, Ordering::Release);
    }

    pub fn set_mode_select(&self, asserted: bool) {
        self.mode_select.store(asserted, Ordering::Release);
    }

    pub(crate) fn set_timer_expired(&self, expired: bool) {
        self.timer_expired.store(expired, Ordering::Release);
    }

    pub fn door_closed(&self) -> bool {
        self.door_closed.load(Ordering::Acquire)
    }

    pub fn parcel_open(&self) -> bool {
        self.parcel_open.load(Ordering::Acquire)
    }

    pub fn mail_open(&self) -> bool {
        self.mail_open.load(Ordering::Acquire)
    }

    pub fn mode_select(&self) -> bool {
        self.mode_select.load(Ordering::Acquire)
    }

    pub fn timer_expired(&self) -> bool {
        self.timer_expired.load(Ordering::Acquire)
    }
}

impl Default for SensorFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Global flag instance written by the interrupt handlers.
pub static FLAGS: SensorFlags = SensorFlags::new();

/// A condition the state machine or the motor supervisor can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    DoorClosed,
    ParcelOpen,
    MailOpen,
    TimerExpired,
}

impl Condition {
    pub fn is_met(self, flags: &SensorFlags) -> bool {
        match self {
            Condition::DoorClosed => flags.door_closed(),
            Condition::ParcelOpen => flags.parcel_open(),
            Condition::MailOpen => flags.mail_open(),
            Condition::TimerExpired => flags.timer_expired(),
        }
    }
}

/// Software one-shot timer backed by the control-loop clock.
///
/// Arming clears the `timer_expired` flag; once the deadline passes a poll
/// sets it again. Re-arming while running simply moves the deadline.
pub struct OneShotTimer {
    deadline_ms: u32,
    armed: bool,
}

impl OneShotTimer {
    pub const fn new() -> Self {
        Self {
            deadline_ms: 0,
            armed: false,
        }
    }

    pub fn arm(&mut self, flags: &SensorFlags, now_ms: u32, duration_ms: u32) {
        flags.set_timer_expired(false);
        self.deadline_ms = now_ms.wrapping_add(duration_ms);
        self.armed = true;
    }

    pub fn poll(&mut self, flags: &SensorFlags, now_ms: u32) {
        if self.armed && (now_ms.wrapping_sub(self.deadline_ms) as i32) >= 0 {
            self.armed = false;
            flags.set_timer_expired(true);
        }
    }
}

impl Default for OneShotTimer {
    fn default() -> Self {
        Self::new()
    }
}

// Interrupt-side entry points. The hardware layer translates raw GPIO
// interrupts into these calls; everything they touch is interrupt-safe
// (atomics and the critical-section command queue).

pub fn on_hall_closed() {
    FLAGS.set_door_closed();
}

pub fn on_hall_parcel_open() {
    FLAGS.set_parcel_open();
}

pub fn on_hall_mail_open() {
    FLAGS.set_mail_open();
}

pub fn on_mode_jumper(asserted: bool) {
    FLAGS.set_mode_select(asserted);
}

pub fn on_button_parcel() {
    power::wakeup_from_isr();
    command::push(&command::COMMANDS, Command::OpenParcel);
}

pub fn on_button_mail() {
    power::wakeup_from_isr();
    command::push(&command::COMMANDS, Command::OpenMail);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_flags_are_mutually_exclusive() {
        let flags = SensorFlags::new();
        assert!(flags.door_closed());

        flags.set_parcel_open();
        assert!(flags.parcel_open());
        assert!(!flags.door_closed());
        assert!(!flags.mail_open());

        flags.set_mail_open();
        assert!(flags.mail_open());
        assert!(!flags.parcel_open());

        flags.set_door_closed();
        assert!(flags.door_closed());
        assert!(!flags.mail_open());
    }

    #[test]
    fn conditions_track_their_flags() {
        let flags = SensorFlags::new();
        assert!(Condition::DoorClosed.is_met(&flags));
        assert!(!Condition::ParcelOpen.is_met(&flags));

        flags.set_parcel_open();
        assert!(Condition::ParcelOpen.is_met(&flags));
        assert!(!Condition::DoorClosed.is_met(&flags));
    }

    #[test]
    fn one_shot_timer_fires_once() {
        let flags = SensorFlags::new();
        let mut timer = OneShotTimer::new();

        timer.arm(&flags, 1_000, 500);
        assert!(!flags.timer_expired());

        timer.poll(&flags, 1_400);
        assert!(!flags.timer_expired());

        timer.poll(&flags, 1_500);
        assert!(flags.timer_expired());

        // Expired flag stays until the next arm.
        timer.poll(&flags, 2_000);
        assert!(flags.timer_expired());

        timer.arm(&flags, 2_000, 100);
        assert!(!flags.timer_expired());
    }

    #[test]
    fn timer_survives_clock_wraparound() {
        let flags = SensorFlags::new();
        let mut timer = OneShotTimer::new();

        timer.arm(&flags, u32::MAX - 50, 200);
        timer.poll(&flags, u32::MAX - 10);
        assert!(!flags.timer_expired());
        timer.poll(&flags, 160);
        assert!(flags.timer_expired());
    }
}
