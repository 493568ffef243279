//! Charging control law for Helios
//!
//! This module contains the PV-surplus current adjustment and the per-mode
//! current floors used by the charge controller.

use serde::{Deserialize, Serialize};

use crate::config::ControlsConfig;
use crate::logging::get_logger;

/// Nominal phase voltage used to convert watts to milliamps
pub const NOMINAL_VOLTAGE_V: i64 = 230;

/// Ramp-up divisor applied when surplus grows
pub const RAMP_UP_DIVISOR: i64 = 5;

/// Ramp-down divisor applied when surplus shrinks
pub const RAMP_DOWN_DIVISOR: i64 = 2;

/// Controller operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControllerStatus {
    /// No vehicle connected or plug not locked
    #[default]
    NotConnected = 0,

    /// Vehicle connected, waiting for enough surplus
    WaitingForSurplus = 1,

    /// Current follows the PV surplus
    OptimizedCharging = 2,

    /// Current follows the surplus above a fixed floor
    FixedCharging = 3,

    /// Reserved
    SinglePhaseOptimized = 4,
}

impl ControllerStatus {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::NotConnected),
            1 => Some(Self::WaitingForSurplus),
            2 => Some(Self::OptimizedCharging),
            3 => Some(Self::FixedCharging),
            4 => Some(Self::SinglePhaseOptimized),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::NotConnected => "not connected",
            Self::WaitingForSurplus => "connected, waiting for surplus",
            Self::OptimizedCharging => "optimized charging",
            Self::FixedCharging => "fixed charging",
            Self::SinglePhaseOptimized => "single phase optimized charging",
        }
    }
}

/// Current limits applied before every dispatch (mA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeLimits {
    pub min_ma: u32,
    pub max_ma: u32,
}

/// Current change in mA for a power delta, integer arithmetic truncating at
/// every division and saturating instead of overflowing
pub fn delta_current_ma(power_delta_w: i64, offset_w: i64) -> i64 {
    let net_mw = power_delta_w.saturating_sub(offset_w).saturating_mul(1000);
    if power_delta_w > 0 {
        (net_mw / NOMINAL_VOLTAGE_V) / RAMP_UP_DIVISOR
    } else {
        net_mw / NOMINAL_VOLTAGE_V / RAMP_DOWN_DIVISOR
    }
}

/// Charging control system
#[derive(Debug, Clone)]
pub struct ChargingControls {
    config: ControlsConfig,
    logger: crate::logging::StructuredLogger,
}

impl ChargingControls {
    /// Create new charging controls
    pub fn new(config: ControlsConfig) -> Self {
        let logger = get_logger("controls");
        Self { config, logger }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    /// Limits a controller starts with
    pub fn base_limits(&self) -> ChargeLimits {
        ChargeLimits {
            min_ma: self.config.min_charge_current_ma,
            max_ma: self.config.max_charge_current_ma,
        }
    }

    /// Apply the control law to the accumulator
    pub fn adjust(&self, current_ma: i64, power_delta_w: i64) -> i64 {
        let delta = delta_current_ma(power_delta_w, self.config.charge_offset_w);
        let adjusted = current_ma.saturating_add(delta);
        self.logger.debug(&format!(
            "Adjusting current: delta={}W offset={}W step={}mA {} -> {}",
            power_delta_w, self.config.charge_offset_w, delta, current_ma, adjusted
        ));
        adjusted
    }

    /// Floor of the current for a tick in the given mode, if the mode sets one
    pub fn floor_for(&self, status: ControllerStatus, input: u32) -> Option<u32> {
        match status {
            ControllerStatus::OptimizedCharging if input == 1 => {
                Some(self.config.boost_min_current_ma)
            }
            ControllerStatus::OptimizedCharging => Some(self.config.min_charge_current_ma),
            ControllerStatus::FixedCharging => Some(self.config.fixed_min_current_ma),
            _ => None,
        }
    }
}
