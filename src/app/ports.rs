//! Port traits — the seams between the control logic and the hardware.
//!
//! Production adapters live under `adapters/` and `drivers/`; tests supply
//! in-memory mocks. Every trait here is object-safe so the state-machine
//! context can hold them as trait objects.

use crate::allowlist::TagId;
use crate::app::events::AppEvent;
use crate::error::{MotorError, ReaderError, StorageError};
use crate::motor::ADC_BATCH_SIZE;

/// Byte-addressed persistent storage with page-write semantics.
///
/// Offsets are absolute within the backing region. A write of up to one
/// page (64 bytes) at a fixed offset must be atomic from the caller's
/// point of view.
pub trait StoragePort {
    fn read(&self, offset: u32, buf: &mut [u8]) -> Result<(), StorageError>;
    fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), StorageError>;
}

/// Contactless tag reader front end.
pub trait TagReaderPort {
    /// Put the reader into its low-power detection mode and block until a
    /// tag enters the field. `Err(SleepUnavailable)` means the reader
    /// refused to enter detection mode and needs a [`reset`](Self::reset).
    fn wait_for_tag(&mut self) -> Result<(), ReaderError>;

    /// Hard-reset the reader front end.
    fn reset(&mut self);

    /// Configure the ISO14443A protocol, send a REQA and run the
    /// anticollision sequence. Returns the selected tag's UID.
    fn select(&mut self) -> Result<TagId, ReaderError>;
}

/// The two PWM channels of the H-bridge, one per winding direction.
///
/// Contract: callers never leave both channels at a non-zero duty at the
/// same time.
pub trait DriveChannels {
    fn set_forward(&mut self, duty_percent: u8);
    fn set_reverse(&mut self, duty_percent: u8);
}

/// Motor current sampling. One batch of [`ADC_BATCH_SIZE`] raw samples is
/// delivered per supervisor cycle; the batch also paces the cycle.
pub trait CurrentSense {
    /// Block until the in-flight sample batch completes.
    fn wait_batch(&mut self, buf: &mut [u16; ADC_BATCH_SIZE]);

    /// Start the next sample batch.
    fn resubmit(&mut self) -> Result<(), MotorError>;

    /// Convert one raw sample to millivolts using the device calibration.
    fn raw_to_millivolts(&self, raw: u16) -> u32;
}

/// Outbound notification sink.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}
