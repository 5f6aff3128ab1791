//! Unified error types for the PostBox firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform. All variants are `Copy`
//! so they can be passed through the state machine without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The motor supervisor or its drive/sense peripherals failed.
    Motor(MotorError),
    /// The tag reader failed.
    Reader(ReaderError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The allow-list rejected an operation.
    AllowList(AllowListError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Motor(e) => write!(f, "motor: {e}"),
            Self::Reader(e) => write!(f, "reader: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::AllowList(e) => write!(f, "allow-list: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Motor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// A PWM drive channel is not ready or rejected a duty write.
    PwmNotReady,
    /// The current-sense ADC is not ready or failed channel setup.
    AdcNotReady,
    /// Resubmitting the asynchronous sample batch failed.
    SampleSubmitFailed,
    /// The drive timed out before the stop condition was met.
    Timeout,
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmNotReady => write!(f, "PWM channel not ready"),
            Self::AdcNotReady => write!(f, "current-sense ADC not ready"),
            Self::SampleSubmitFailed => write!(f, "sample batch submit failed"),
            Self::Timeout => write!(f, "timeout before endstop"),
        }
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Self::Motor(e)
    }
}

// ---------------------------------------------------------------------------
// Reader errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderError {
    /// The transceiver is absent or failed its startup handshake.
    NotReady,
    /// Entering tag-detection sleep failed (CR95HF quirk after a tag is
    /// removed mid-transaction); recovered by a device reset.
    SleepUnavailable,
    /// REQA got no answer — no tag in field.
    NoTag,
    /// Anti-collision select failed or returned a malformed UID.
    SelectFailed,
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "transceiver not ready"),
            Self::SleepUnavailable => write!(f, "sleep mode unavailable"),
            Self::NoTag => write!(f, "no tag in field"),
            Self::SelectFailed => write!(f, "anti-collision select failed"),
        }
    }
}

impl From<ReaderError> for Error {
    fn from(e: ReaderError) -> Self {
        Self::Reader(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The storage device/partition is missing or not ready.
    NotReady,
    /// A read returned an error or short data.
    ReadFailed,
    /// A write or erase returned an error.
    WriteFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady => write!(f, "device not ready"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Allow-list errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowListError {
    /// The tag identifier exceeds the 10-byte maximum.
    TagTooLong,
    /// The list already holds its 6-entry capacity.
    ListFull,
}

impl fmt::Display for AllowListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TagTooLong => write!(f, "tag id longer than 10 bytes"),
            Self::ListFull => write!(f, "list at capacity"),
        }
    }
}

impl From<AllowListError> for Error {
    fn from(e: AllowListError) -> Self {
        Self::AllowList(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
