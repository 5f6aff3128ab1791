//! Hardware drivers — dual-target (ESP-IDF / host simulation).

pub mod current_sense;
pub mod hw_init;
pub mod motor_drive;
pub mod status_led;
pub mod task_pin;
