//! System configuration parameters
//!
//! All tunable parameters for the PostBox controller. Values are fixed at
//! build time for this board revision; the struct stays serde-capable so a
//! maintenance console can dump or inject a config during bring-up.

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- State machine ---
    /// Control tick period (milliseconds) — one state-machine poll per tick.
    pub control_tick_ms: u32,
    /// Parcel lockout blink period (milliseconds) — the one-shot armed when
    /// a parcel request arrives while the compartment is already locked.
    pub lockout_wait_ms: u32,
    /// Programming-mode LED blink / re-poll period (milliseconds).
    pub programming_poll_ms: u32,

    // --- Motor ---
    /// Actuator drive timeout for an open or close stroke (seconds).
    pub motor_timeout_secs: u8,
    /// Motor control cycle period (milliseconds), set by the ADC batch rate.
    pub motor_cycle_ms: u32,

    // --- Access scanner ---
    /// Settle period after a successful tag read (seconds) — debounce
    /// against re-reading a tag still held against the antenna.
    pub tag_settle_secs: u8,

    // --- Power ---
    /// Inactivity period before the peripheral rail is cut (seconds).
    pub inactivity_timeout_secs: u8,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // State machine
            control_tick_ms: 100, // 10 Hz
            lockout_wait_ms: 1000,
            programming_poll_ms: 100,

            // Motor
            motor_timeout_secs: 3,
            motor_cycle_ms: 10, // 20 samples at 500 µs

            // Scanner
            tag_settle_secs: 2,

            // Power
            inactivity_timeout_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.control_tick_ms > 0);
        assert!(c.motor_cycle_ms > 0);
        assert!(c.motor_timeout_secs > 0);
        assert!(c.inactivity_timeout_secs > 0);
        assert!(c.lockout_wait_ms >= c.control_tick_ms);
    }

    #[test]
    fn timing_ratios_make_sense() {
        let c = SystemConfig::default();
        assert!(
            c.motor_cycle_ms < c.control_tick_ms,
            "motor cycles must be faster than control ticks so the blocking \
             request channel cannot stall the control task for long"
        );
        assert!(
            u32::from(c.inactivity_timeout_secs) * 1000 > c.lockout_wait_ms,
            "the lockout wait must resolve before the inactivity deadline"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.control_tick_ms, c2.control_tick_ms);
        assert_eq!(c.motor_timeout_secs, c2.motor_timeout_secs);
        assert_eq!(c.inactivity_timeout_secs, c2.inactivity_timeout_secs);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.lockout_wait_ms, c2.lockout_wait_ms);
        assert_eq!(c.tag_settle_secs, c2.tag_settle_secs);
    }
}
