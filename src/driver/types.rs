use serde::{Deserialize, Serialize};

use crate::controls::ControllerStatus;

/// Main driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is running normally
    Running,
    /// Driver is shutting down
    ShuttingDown,
}

impl DriverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverState::Initializing => "Initializing",
            DriverState::Running => "Running",
            DriverState::ShuttingDown => "ShuttingDown",
        }
    }
}

/// Commands accepted by the driver from external components
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    /// PV surplus estimate in W, rounded to whole watts
    SetPowerDelta(f64),
    SetControllerStatus(ControllerStatus),
    SetFailsafe {
        timeout_s: u32,
        current_ma: u32,
        persist: bool,
    },
    /// Relay output code
    SetOutput(u32),
    RequestReport(u8),
    /// Run one control step now
    Tick,
}

/// Point-in-time view of the controller, published after every event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverSnapshot {
    pub timestamp: String,
    /// Driver state (Initializing, Running, ShuttingDown)
    pub driver_state: String,
    pub controller_status: u8,
    pub controller_status_text: String,
    /// Accumulated controller current (mA)
    pub controller_current_ma: i64,
    /// Last value sent with `curr` (mA)
    pub last_dispatched_ma: Option<u32>,
    pub min_charge_current_ma: u32,
    pub max_charge_current_ma: u32,
    pub power_delta_w: i64,
    pub plug_state: u32,
    pub plug_state_text: String,
    pub device_state: u32,
    pub device_state_text: String,
    /// Phase voltages (V)
    pub voltages: [u32; 3],
    /// Phase currents (mA)
    pub currents: [u32; 3],
    pub active_power_w: u32,
    pub power_factor: u32,
    pub energy_wh: u64,
    pub max_current_pilot_ma: u32,
    pub max_current_hardware_ma: u32,
    pub max_current_user_ma: u32,
    pub failsafe_current_ma: u32,
    pub failsafe_timeout_s: u32,
    pub enable_sys: u32,
    pub enable_user: u32,
    pub input: u32,
    pub product: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
    /// RFC 3339 start of the current charging run
    pub charging_since: Option<String>,
    pub charging_seconds: Option<u64>,
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub rejected_commands: u64,
    pub ticks: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
    pub metering_failures: u64,
}
