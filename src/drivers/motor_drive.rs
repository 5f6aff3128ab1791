//! Flap motor driver (DRV8871 H-bridge).
//!
//! One LEDC PWM channel per winding direction; braking is both channels
//! at zero. This is a dumb actuator: direction choice, timeouts and the
//! never-both-channels rule live in the motor supervisor.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM via hw_init.
//! On host/test: tracks state in-memory only.

use crate::app::ports::DriveChannels;
use crate::drivers::hw_init;

pub struct MotorDrive {
    forward: u8,
    reverse: u8,
}

impl MotorDrive {
    pub fn new() -> Self {
        Self {
            forward: 0,
            reverse: 0,
        }
    }

    pub fn forward_duty(&self) -> u8 {
        self.forward
    }

    pub fn reverse_duty(&self) -> u8 {
        self.reverse
    }

    fn duty_8bit(duty_percent: u8) -> u8 {
        ((duty_percent.min(100) as u16) * 255 / 100) as u8
    }
}

impl Default for MotorDrive {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveChannels for MotorDrive {
    fn set_forward(&mut self, duty_percent: u8) {
        let duty = duty_percent.min(100);
        hw_init::ledc_set(hw_init::LEDC_CH_MOTOR_FWD, Self::duty_8bit(duty));
        self.forward = duty;
    }

    fn set_reverse(&mut self, duty_percent: u8) {
        let duty = duty_percent.min(100);
        hw_init::ledc_set(hw_init::LEDC_CH_MOTOR_REV, Self::duty_8bit(duty));
        self.reverse = duty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_scales_to_8bit_range() {
        assert_eq!(MotorDrive::duty_8bit(0), 0);
        assert_eq!(MotorDrive::duty_8bit(50), 127);
        assert_eq!(MotorDrive::duty_8bit(100), 255);
        assert_eq!(MotorDrive::duty_8bit(150), 255);
    }

    #[test]
    fn driver_tracks_channel_state() {
        let mut drive = MotorDrive::new();
        drive.set_reverse(50);
        assert_eq!(drive.reverse_duty(), 50);
        assert_eq!(drive.forward_duty(), 0);
        drive.set_reverse(0);
        assert_eq!(drive.reverse_duty(), 0);
    }
}
