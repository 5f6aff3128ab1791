//! Application core glue — port traits and structured events.
//!
//! The control logic (state machine, motor supervisor, access scanner,
//! power manager) never touches hardware directly: every peripheral sits
//! behind a **port trait** defined in [`ports`], and everything the system
//! wants to tell the outside world flows through an [`events::AppEvent`].

pub mod events;
pub mod ports;
