//! Inactivity-driven power manager.
//!
//! Activity re-arms a deadline; when the control task reaches an idle
//! point past the deadline it cuts the sensor supply rail and blocks.
//! Wake-ups arrive from the scanner thread (direct unpark), from
//! interrupt handlers (atomic request flag, picked up by the parked
//! task's periodic poll) and from the console poll closure.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;
use std::thread::{self, Thread};
use std::time::Duration;

use log::info;

use crate::drivers::hw_init;
use crate::pins;

/// How often a parked control task re-checks its wake sources.
const WAKE_POLL_MS: u64 = 250;

const RUNNING: u8 = 0;
const SLEEPING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Running,
    Sleeping,
}

static STATE: AtomicU8 = AtomicU8::new(RUNNING);
static DEADLINE_MS: AtomicU32 = AtomicU32::new(0);
static WAKE_REQUEST: AtomicBool = AtomicBool::new(false);
static SLEEPER: Mutex<Option<Thread>> = Mutex::new(None);

pub fn state() -> PowerState {
    if STATE.load(Ordering::Acquire) == SLEEPING {
        PowerState::Sleeping
    } else {
        PowerState::Running
    }
}

/// Record activity: push the sleep deadline out by `timeout_ms`.
pub fn trigger(now_ms: u32, timeout_ms: u32) {
    DEADLINE_MS.store(now_ms.wrapping_add(timeout_ms), Ordering::Release);
    STATE.store(RUNNING, Ordering::Release);
}

/// Idle checkpoint for the control task. If the inactivity deadline has
/// passed this cuts the sensor rail and blocks until a wake-up arrives;
/// `wake_pending` is polled while parked so buffered console input can
/// end the sleep too.
pub fn check(now_ms: u32, wake_pending: impl Fn() -> bool) {
    let elapsed =
        (now_ms.wrapping_sub(DEADLINE_MS.load(Ordering::Acquire)) as i32) >= 0;
    if !elapsed || STATE.load(Ordering::Acquire) != RUNNING {
        return;
    }

    STATE.store(SLEEPING, Ordering::Release);
    info!("power: entering sleep, sensor rail off");
    hw_init::gpio_write(pins::VDD_EN_GPIO, false);
    if let Ok(mut sleeper) = SLEEPER.lock() {
        *sleeper = Some(thread::current());
    }

    while STATE.load(Ordering::Acquire) == SLEEPING {
        thread::park_timeout(Duration::from_millis(WAKE_POLL_MS));
        if WAKE_REQUEST.swap(false, Ordering::AcqRel) || wake_pending() {
            STATE.store(RUNNING, Ordering::Release);
        }
    }

    if let Ok(mut sleeper) = SLEEPER.lock() {
        *sleeper = None;
    }
    hw_init::gpio_write(pins::VDD_EN_GPIO, true);
    info!("power: awake, sensor rail on");
}

/// Wake the system from thread context.
pub fn wakeup() {
    STATE.store(RUNNING, Ordering::Release);
    if let Ok(mut sleeper) = SLEEPER.lock() {
        if let Some(parked) = sleeper.take() {
            parked.unpark();
        }
    }
}

/// Wake the system from interrupt context. Only touches atomics; the
/// parked task notices on its next poll.
pub fn wakeup_from_isr() {
    WAKE_REQUEST.store(true, Ordering::Release);
    STATE.store(RUNNING, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_ends_in_running_state() {
        trigger(0, 5_000);
        // Pending input keeps this from blocking even if a parallel test
        // moved the shared deadline.
        check(100, || true);
        assert_eq!(state(), PowerState::Running);
    }

    #[test]
    fn wakeup_without_sleeper_is_harmless() {
        trigger(0, 5_000);
        wakeup();
        wakeup();
        assert_eq!(state(), PowerState::Running);
    }

    #[test]
    fn parked_task_resumes_on_wakeup() {
        trigger(0, 100);
        let blocked = thread::spawn(|| {
            check(5_000, || false);
        });
        thread::sleep(Duration::from_millis(50));
        wakeup();
        blocked.join().unwrap();
        assert_eq!(state(), PowerState::Running);
    }

    #[test]
    fn parked_task_resumes_on_isr_request() {
        trigger(0, 100);
        let blocked = thread::spawn(|| {
            check(5_000, || false);
        });
        thread::sleep(Duration::from_millis(50));
        wakeup_from_isr();
        blocked.join().unwrap();
        assert_eq!(state(), PowerState::Running);
    }

    #[test]
    fn parked_task_resumes_on_pending_input() {
        trigger(0, 100);
        let blocked = thread::spawn(|| {
            check(5_000, || true);
        });
        blocked.join().unwrap();
        assert_eq!(state(), PowerState::Running);
    }
}
