//! Platform adapters implementing the application port traits.

pub mod log_sink;
pub mod reader;
pub mod storage;
pub mod time;
