//! PostBox firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod allowlist;
pub mod app;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod fsm;
pub mod inputs;
pub mod motor;
pub mod pins;
pub mod power;
pub mod scanner;

// Platform-specific implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
