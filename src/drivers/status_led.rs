//! Indicator LED driver (discrete green and red LEDs on plain GPIOs).
//!
//! Green: steady in normal operation, blinking during a programming
//! session. Red: lit while a guarded wait (parcel lockout) is active.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIOs via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::fsm::{GreenAction, IndicatorCommands};
use crate::pins;

pub struct StatusLeds {
    green: bool,
    red: bool,
}

impl StatusLeds {
    /// Power-on state: green lit, red dark.
    pub fn new() -> Self {
        let mut leds = Self {
            green: false,
            red: false,
        };
        leds.set_green(true);
        leds.set_red(false);
        leds
    }

    pub fn set_green(&mut self, on: bool) {
        hw_init::gpio_write(pins::LED_GREEN_GPIO, on);
        self.green = on;
    }

    pub fn toggle_green(&mut self) {
        self.set_green(!self.green);
    }

    pub fn set_red(&mut self, on: bool) {
        hw_init::gpio_write(pins::LED_RED_GPIO, on);
        self.red = on;
    }

    /// Apply the indicator changes a control tick requested.
    pub fn apply(&mut self, commands: &IndicatorCommands) {
        match commands.green {
            Some(GreenAction::On) => self.set_green(true),
            Some(GreenAction::Off) => self.set_green(false),
            Some(GreenAction::Toggle) => self.toggle_green(),
            None => {}
        }
        if let Some(red) = commands.red {
            self.set_red(red);
        }
    }

    pub fn green(&self) -> bool {
        self.green
    }

    pub fn red(&self) -> bool {
        self.red
    }
}

impl Default for StatusLeds {
    fn default() -> Self {
        Self::new()
    }
}
