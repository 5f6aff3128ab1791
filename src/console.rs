//! Maintenance console: single-letter commands over the UART.
//!
//! `o` opens the mail compartment, `p` the parcel compartment. Any byte
//! counts as activity and wakes the system.

use log::debug;

use crate::command::{self, Command, CommandChannel};
use crate::drivers::hw_init;
use crate::power;

/// Feed one received byte into the command queue.
pub fn ingest(queue: &CommandChannel, byte: u8) {
    power::wakeup();
    match byte {
        b'o' => command::push(queue, Command::OpenMail),
        b'p' => command::push(queue, Command::OpenParcel),
        other => debug!("console: ignoring byte {other:#04x}"),
    }
}

/// Drain all buffered UART bytes. Called once per control tick.
pub fn poll(queue: &CommandChannel) {
    while let Some(byte) = hw_init::uart_read_byte() {
        ingest(queue, byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::channel::Channel;

    #[test]
    fn letters_map_to_commands() {
        static Q: CommandChannel = Channel::new();
        ingest(&Q, b'o');
        ingest(&Q, b'p');
        assert_eq!(command::pop(&Q), Some(Command::OpenMail));
        assert_eq!(command::pop(&Q), Some(Command::OpenParcel));
    }

    #[test]
    fn unknown_bytes_are_dropped() {
        static Q: CommandChannel = Channel::new();
        ingest(&Q, b'x');
        ingest(&Q, b'\n');
        assert_eq!(command::pop(&Q), None);
    }
}
