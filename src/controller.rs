//! Charge controller state machine
//!
//! Reacts to plug, operating-state and input changes reported by the station
//! and to the periodic control tick. The controller performs no I/O: every
//! decision is returned as a list of [`ControllerAction`]s for the dispatcher.

use serde::Serialize;

use crate::controls::{ChargeLimits, ChargingControls, ControllerStatus};
use crate::device::{DeviceEvent, DeviceOperatingState, DeviceState, PlugState};
use crate::dispatcher::clamp_current;
use crate::logging::get_logger;
use crate::protocol::{Command, DecodeError, DeviceMessage};
use crate::timer::ElapsedTimer;

/// Metering channel a value is reported on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MeterChannel {
    ControllerCurrent,
    Input,
}

/// Side effect requested by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerAction {
    /// Send a command to the station as is
    Send(Command),
    /// Clamp into `limits`, report to metering, then send `curr`
    DispatchCurrent { requested: i64, limits: ChargeLimits },
    /// Report a value to the metering sink
    Meter { channel: MeterChannel, value: String },
}

pub struct ChargeController {
    controls: ChargingControls,
    device: DeviceState,
    status: ControllerStatus,
    current_ma: i64,
    limits: ChargeLimits,
    power_delta_w: i64,
    charging_timer: ElapsedTimer,
    logger: crate::logging::StructuredLogger,
}

impl ChargeController {
    pub fn new(controls: ChargingControls) -> Self {
        let limits = controls.base_limits();
        Self {
            controls,
            device: DeviceState::new(),
            status: ControllerStatus::NotConnected,
            current_ma: 0,
            limits,
            power_delta_w: 0,
            charging_timer: ElapsedTimer::new(),
            logger: get_logger("controller"),
        }
    }

    /// Decode and handle one datagram; a decode failure leaves all state untouched
    pub fn handle_datagram(&mut self, text: &str) -> Result<Vec<ControllerAction>, DecodeError> {
        let message = crate::protocol::decode(text)?;
        Ok(self.handle_message(&message))
    }

    /// Merge a decoded message into the mirror and react to the resulting changes
    pub fn handle_message(&mut self, message: &DeviceMessage) -> Vec<ControllerAction> {
        let mut actions = Vec::new();
        for event in self.device.apply(message) {
            match event {
                DeviceEvent::OperatingState { previous, current } => {
                    self.on_operating_state(previous, current);
                }
                DeviceEvent::Input(input) => self.on_input(input, &mut actions),
                DeviceEvent::Plug(plug) => self.on_plug(plug, &mut actions),
            }
        }
        actions
    }

    /// Periodic control step using the last power delta
    pub fn tick(&mut self) -> Vec<ControllerAction> {
        let mut actions = Vec::new();

        if self.device.plug_state() == PlugState::PluggedWithEVLocked {
            match self.status {
                ControllerStatus::NotConnected | ControllerStatus::WaitingForSurplus => {
                    self.set_status(ControllerStatus::OptimizedCharging);
                    actions.push(ControllerAction::Send(Command::Enable(true)));
                }
                ControllerStatus::OptimizedCharging | ControllerStatus::FixedCharging => {
                    self.current_ma = self.controls.adjust(self.current_ma, self.power_delta_w);
                    if let Some(floor) = self.controls.floor_for(self.status, self.device.input())
                    {
                        self.limits.min_ma = floor;
                    }
                    self.dispatch_current(self.current_ma, &mut actions);
                }
                ControllerStatus::SinglePhaseOptimized => {}
            }
        }

        if matches!(
            self.device.operating_state(),
            DeviceOperatingState::NotReady | DeviceOperatingState::ReadyWaiting
        ) {
            self.current_ma = i64::from(self.limits.min_ma)
                + i64::from(self.controls.config().ready_seed_offset_ma);
        }

        actions
    }

    /// External PV surplus estimate in W, consumed by every following tick
    pub fn set_power_delta(&mut self, power_delta_w: i64) {
        self.power_delta_w = power_delta_w;
    }

    pub fn set_controller_status(&mut self, status: ControllerStatus) {
        self.set_status(status);
    }

    pub fn device(&self) -> &DeviceState {
        &self.device
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    /// Accumulated controller current in mA; may be outside the limits
    /// between ticks
    pub fn controller_current_ma(&self) -> i64 {
        self.current_ma
    }

    pub fn limits(&self) -> ChargeLimits {
        self.limits
    }

    pub fn power_delta_w(&self) -> i64 {
        self.power_delta_w
    }

    pub fn charging_timer(&self) -> &ElapsedTimer {
        &self.charging_timer
    }

    fn dispatch_current(&mut self, requested: i64, actions: &mut Vec<ControllerAction>) {
        let dispatched = i64::from(clamp_current(requested, self.limits));
        if dispatched != requested {
            self.current_ma = dispatched;
        }
        actions.push(ControllerAction::DispatchCurrent {
            requested,
            limits: self.limits,
        });
    }

    fn set_status(&mut self, status: ControllerStatus) {
        if status != self.status {
            self.logger.info(&format!(
                "Controller status: {} -> {}",
                self.status.description(),
                status.description()
            ));
        }
        self.status = status;
    }

    fn on_plug(&mut self, plug: PlugState, actions: &mut Vec<ControllerAction>) {
        self.logger
            .info(&format!("Plug state: {} ({})", plug.description(), plug.code()));
        match plug {
            PlugState::Unplugged
            | PlugState::PluggedStationOnly
            | PlugState::PluggedLocked
            | PlugState::PluggedWithEV => {
                self.set_status(ControllerStatus::NotConnected);
                actions.push(ControllerAction::Send(Command::Enable(true)));
            }
            PlugState::PluggedWithEVLocked => {
                let plug_in = self.controls.config().plug_in_current_ma;
                actions.push(ControllerAction::Send(Command::Enable(true)));
                // clamped against the floor of the previous mode
                self.dispatch_current(i64::from(plug_in), actions);
                self.set_status(ControllerStatus::OptimizedCharging);
                self.limits.min_ma = plug_in;
            }
            PlugState::Other(raw) => {
                self.logger
                    .debug(&format!("Ignoring unmapped plug state {}", raw));
            }
        }
    }

    fn on_operating_state(&mut self, previous: DeviceOperatingState, current: DeviceOperatingState) {
        self.logger.info(&format!(
            "Station state: {} ({})",
            current.description(),
            current.code()
        ));
        match current {
            DeviceOperatingState::Charging => {
                self.charging_timer.enable();
                self.charging_timer.reset();
            }
            DeviceOperatingState::Starting
            | DeviceOperatingState::NotReady
            | DeviceOperatingState::ReadyWaiting => self.charging_timer.disable(),
            DeviceOperatingState::Error | DeviceOperatingState::AuthRejected => {
                self.logger
                    .warn(&format!("Station reports: {}", current.description()));
                if previous == DeviceOperatingState::Charging {
                    self.charging_timer.disable();
                }
            }
            DeviceOperatingState::Unknown(_) => {
                if previous == DeviceOperatingState::Charging {
                    self.charging_timer.disable();
                }
            }
        }
    }

    fn on_input(&mut self, input: u32, actions: &mut Vec<ControllerAction>) {
        let indicator = match input {
            0 => "0",
            1 => "100",
            other => {
                self.logger
                    .debug(&format!("Ignoring input value {}", other));
                return;
            }
        };
        actions.push(ControllerAction::Send(Command::Enable(true)));
        actions.push(ControllerAction::Meter {
            channel: MeterChannel::Input,
            value: indicator.to_string(),
        });
    }
}
