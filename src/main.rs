//! PostBox firmware — main entry point.
//!
//! Three core-pinned tasks around shared channels and atomic flags:
//!
//! ```text
//! buttons/halls ──ISR──► flags + command queue
//! console ───────poll──► command queue
//! scanner thread ──────► command queue (known tag)
//!                          │
//!                          ▼
//! control loop (100 ms): state machine ──► motor request channel
//!                          │                    │
//!                          ▼                    ▼
//!                   LEDs + power mgmt     motor supervisor (ADC-paced)
//! ```

#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::{anyhow, Result};
use log::info;

use postbox::adapters::log_sink::LogEventSink;
use postbox::adapters::reader::Cr95hfReader;
use postbox::adapters::storage::PartitionStorage;
use postbox::adapters::time::Uptime;
use postbox::allowlist::AllowList;
use postbox::app::events::AppEvent;
use postbox::app::ports::EventSink;
use postbox::command::COMMANDS;
use postbox::config::SystemConfig;
use postbox::console;
use postbox::drivers::current_sense::CurrentSenseAdc;
use postbox::drivers::hw_init;
use postbox::drivers::motor_drive::MotorDrive;
use postbox::drivers::status_led::StatusLeds;
use postbox::drivers::task_pin::{self, Core};
use postbox::error::Error;
use postbox::fsm::{Fsm, FsmContext, PowerAction, StateId};
use postbox::inputs;
use postbox::motor;
use postbox::power;
use postbox::scanner::{self, TagAccess};

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("PostBox v{}", env!("CARGO_PKG_VERSION"));

    let config = SystemConfig::default();
    let inactivity_ms = u32::from(config.inactivity_timeout_secs) * 1_000;
    let settle = Duration::from_secs(u64::from(config.tag_settle_secs));
    let tick = Duration::from_millis(u64::from(config.control_tick_ms));

    // Peripheral bring-up. Any failure here is fatal: running blind or
    // with an unknown access list is worse than not running.
    hw_init::init_peripherals().map_err(|e| anyhow!("peripheral init failed: {e}"))?;

    let mut storage = PartitionStorage::new().map_err(Error::from)?;
    let list = AllowList::load(&storage).map_err(Error::from)?;
    info!("allow-list: {} tags enrolled", list.len());
    let access: &'static TagAccess = Box::leak(Box::new(TagAccess::new(list)));

    let sense = CurrentSenseAdc::new().map_err(Error::from)?;
    let _motor_task = task_pin::spawn_on_core(Core::App, 5, 8, "motor\0", move || {
        motor::run(
            &inputs::FLAGS,
            &motor::REQUESTS,
            MotorDrive::new(),
            sense,
            LogEventSink::new(),
        );
    });

    let reader = Cr95hfReader::new().map_err(Error::from)?;
    let _scanner_task = task_pin::spawn_on_core(Core::Pro, 4, 8, "scanner\0", move || {
        scanner::run(reader, access, &COMMANDS, LogEventSink::new(), settle);
    });

    hw_init::init_isr_service().map_err(|e| anyhow!("ISR service init failed: {e}"))?;

    let clock = Uptime::new();
    let mut leds = StatusLeds::new();
    let mut sink = LogEventSink::new();
    let mut fsm = Fsm::new(StateId::Closed);
    let mut ctx = FsmContext::new(
        &inputs::FLAGS,
        &COMMANDS,
        &motor::REQUESTS,
        access,
        &mut storage,
        config,
    );

    power::trigger(clock.now_ms(), inactivity_ms);
    sink.emit(&AppEvent::Started(fsm.current_state()));

    loop {
        ctx.now_ms = clock.now_ms();
        console::poll(&COMMANDS);

        let before = fsm.current_state();
        fsm.tick(&mut ctx);
        let after = fsm.current_state();
        if before != after {
            sink.emit(&AppEvent::StateChanged {
                from: before,
                to: after,
            });
        }

        leds.apply(&ctx.indicators);
        match ctx.power {
            PowerAction::Trigger => power::trigger(ctx.now_ms, inactivity_ms),
            // May block for the whole sleep; buffered console bytes end it.
            PowerAction::CheckIdle => power::check(ctx.now_ms, hw_init::uart_rx_pending),
            PowerAction::None => {}
        }

        std::thread::sleep(tick);
    }
}
