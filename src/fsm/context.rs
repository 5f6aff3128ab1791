//! Shared context handed to every state update.

use crate::command::CommandChannel;
use crate::config::SystemConfig;
use crate::fsm::StateId;
use crate::inputs::{Condition, OneShotTimer, SensorFlags};
use crate::motor::RequestChannel;
use crate::app::ports::StoragePort;
use crate::scanner::TagAccess;

/// Parameters of a pending wait: the condition to watch, where to go when
/// it holds, and whether the red indicator marks the wait.
#[derive(Debug, Clone, Copy)]
pub struct WaitState {
    pub condition: Condition,
    pub next: StateId,
    pub indicator: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreenAction {
    On,
    Off,
    Toggle,
}

/// Indicator changes requested during the current tick. The control loop
/// applies them after the update returns; `None` means leave as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorCommands {
    pub green: Option<GreenAction>,
    pub red: Option<bool>,
}

/// Power-management action requested during the current tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PowerAction {
    #[default]
    None,
    /// Activity happened: push the inactivity deadline out.
    Trigger,
    /// The system is idle: allowed to sleep if the deadline has passed.
    CheckIdle,
}

pub struct FsmContext<'a> {
    pub flags: &'a SensorFlags,
    pub commands: &'a CommandChannel,
    pub motor: &'a RequestChannel,
    pub access: &'a TagAccess,
    pub storage: &'a mut dyn StoragePort,
    pub config: SystemConfig,
    /// Control-loop clock, advanced by the caller before each tick.
    pub now_ms: u32,
    pub wait: WaitState,
    pub indicators: IndicatorCommands,
    pub power: PowerAction,
    timer: OneShotTimer,
}

impl<'a> FsmContext<'a> {
    pub fn new(
        flags: &'a SensorFlags,
        commands: &'a CommandChannel,
        motor: &'a RequestChannel,
        access: &'a TagAccess,
        storage: &'a mut dyn StoragePort,
        config: SystemConfig,
    ) -> Self {
        Self {
            flags,
            commands,
            motor,
            access,
            storage,
            config,
            now_ms: 0,
            wait: WaitState {
                condition: Condition::DoorClosed,
                next: StateId::Closed,
                indicator: false,
            },
            indicators: IndicatorCommands::default(),
            power: PowerAction::None,
            timer: OneShotTimer::new(),
        }
    }

    pub(crate) fn begin_tick(&mut self) {
        self.indicators = IndicatorCommands::default();
        self.power = PowerAction::None;
    }

    pub(crate) fn poll_timer(&mut self) {
        self.timer.poll(self.flags, self.now_ms);
    }

    /// Start the one-shot timer; [`Condition::TimerExpired`] becomes true
    /// once `duration_ms` has passed.
    pub fn start_timer(&mut self, duration_ms: u32) {
        self.timer.arm(self.flags, self.now_ms, duration_ms);
    }

    /// Park the machine in [`StateId::Waiting`] until `condition` holds,
    /// then continue in `next`. A guarded wait lights the red indicator
    /// for its duration.
    pub fn begin_wait(&mut self, condition: Condition, next: StateId, indicator: bool) {
        self.wait = WaitState {
            condition,
            next,
            indicator,
        };
        if indicator {
            self.indicators.red = Some(true);
        }
    }
}
