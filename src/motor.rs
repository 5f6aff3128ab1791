//! Motor supervisor.
//!
//! The supervisor runs on its own core and is paced by the current-sense
//! ADC: one batch of samples per 10 ms cycle. Each cycle it applies the
//! newest drive request, stops when the requested condition is met, and
//! enforces the request's cycle budget as a hard timeout.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::{CurrentSense, DriveChannels, EventSink};
use crate::error::MotorError;
use crate::inputs::{Condition, SensorFlags};

/// Samples per supervisor cycle; 500 µs apart, so one batch paces a 10 ms
/// cycle.
pub const ADC_BATCH_SIZE: usize = 20;
/// Supervisor cycles per second of requested run time.
pub const CYCLES_PER_SEC: u16 = 100;
/// Fixed drive strength while a winding is energized.
pub const DRIVE_DUTY_PERCENT: u8 = 50;

pub const REQUEST_DEPTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Stop,
    Forward,
    Reverse,
}

/// One drive order: run `direction` until `stop_on` is met, for at most
/// `timeout_cycles` supervisor cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorRequest {
    pub direction: Direction,
    pub timeout_cycles: u16,
    pub stop_on: Condition,
}

pub type RequestChannel = Channel<CriticalSectionRawMutex, MotorRequest, REQUEST_DEPTH>;

/// Global request channel from the control task to the supervisor.
pub static REQUESTS: RequestChannel = Channel::new();

/// Enqueue a drive request, blocking if the channel is momentarily full.
/// The timeout is given in whole seconds and converted to cycles here.
pub fn send_request(
    channel: &RequestChannel,
    direction: Direction,
    timeout_secs: u8,
    stop_on: Condition,
) {
    let request = MotorRequest {
        direction,
        timeout_cycles: u16::from(timeout_secs) * CYCLES_PER_SEC,
        stop_on,
    };
    futures_lite::future::block_on(channel.send(request));
}

pub struct MotorSupervisor<'a, D: DriveChannels> {
    flags: &'a SensorFlags,
    requests: &'a RequestChannel,
    drive: D,
    active: MotorRequest,
    last_current_ma: u32,
}

impl<'a, D: DriveChannels> MotorSupervisor<'a, D> {
    pub fn new(flags: &'a SensorFlags, requests: &'a RequestChannel, drive: D) -> Self {
        Self {
            flags,
            requests,
            drive,
            active: MotorRequest {
                direction: Direction::Stop,
                timeout_cycles: 0,
                stop_on: Condition::DoorClosed,
            },
            last_current_ma: 0,
        }
    }

    /// One 10 ms supervisor cycle. Returns the fault, if any, that forced
    /// a stop this cycle.
    pub fn cycle(&mut self, current_ma: u32) -> Option<MotorError> {
        // Measured every cycle but not yet acted on: stall detection over
        // the sense current is not implemented in this hardware revision.
        self.last_current_ma = current_ma;

        if let Ok(request) = self.requests.try_receive() {
            self.active = request;
        }

        if self.active.stop_on.is_met(self.flags) {
            self.active.direction = Direction::Stop;
        }

        let mut fault = None;
        if self.active.direction != Direction::Stop {
            if self.active.timeout_cycles > 0 {
                self.active.timeout_cycles -= 1;
            } else {
                warn!("motor: cycle budget exhausted before stop condition");
                self.active.direction = Direction::Stop;
                fault = Some(MotorError::Timeout);
            }
        }

        match self.active.direction {
            Direction::Forward => {
                self.drive.set_reverse(0);
                self.drive.set_forward(DRIVE_DUTY_PERCENT);
            }
            Direction::Reverse => {
                self.drive.set_forward(0);
                self.drive.set_reverse(DRIVE_DUTY_PERCENT);
            }
            Direction::Stop => {
                self.drive.set_forward(0);
                self.drive.set_reverse(0);
            }
        }

        fault
    }

    pub fn direction(&self) -> Direction {
        self.active.direction
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    pub fn last_current_ma(&self) -> u32 {
        self.last_current_ma
    }
}

/// Average a raw sample batch and convert to milliamps. The sense
/// resistor is 0.5 Ω, so milliamps are twice the shunt millivolts.
pub fn batch_current_ma(samples: &[u16], raw_to_mv: impl Fn(u16) -> u32) -> u32 {
    if samples.is_empty() {
        return 0;
    }
    let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
    let avg = (sum / samples.len() as u32) as u16;
    raw_to_mv(avg) * 2
}

/// Supervisor task body. Blocks on the ADC for pacing, runs one cycle per
/// batch and reports faults through the sink.
pub fn run(
    flags: &SensorFlags,
    requests: &RequestChannel,
    drive: impl DriveChannels,
    mut sense: impl CurrentSense,
    mut sink: impl EventSink,
) -> ! {
    let mut supervisor = MotorSupervisor::new(flags, requests, drive);
    let mut batch = [0u16; ADC_BATCH_SIZE];
    loop {
        sense.wait_batch(&mut batch);
        let current_ma = batch_current_ma(&batch, |raw| sense.raw_to_millivolts(raw));
        if let Err(e) = sense.resubmit() {
            warn!("motor: sample resubmit failed: {e}");
        }
        if let Some(fault) = supervisor.cycle(current_ma) {
            sink.emit(&AppEvent::MotorFault(fault));
        }
    }
}
