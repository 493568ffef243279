//! Device state mirror
//!
//! Holds the latest values reported by the charging station. Messages are
//! merged field by field; a field absent from a message keeps its previous
//! value. Applying a message yields the [`DeviceEvent`]s the charge controller
//! reacts to.

use serde::Serialize;

use crate::protocol::{Broadcast, DeviceMessage, Report1, Report2, Report3};

/// Energy values are scaled on ingestion; reads apply the same factor again
pub const ENERGY_INGEST_SCALE: u64 = 10;
pub const ENERGY_READ_SCALE: u64 = 10;

/// Connector insertion and lock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlugState {
    #[default]
    Unplugged,
    PluggedStationOnly,
    PluggedLocked,
    PluggedWithEV,
    PluggedWithEVLocked,
    /// Legal raw value without a mapping
    Other(u32),
}

impl PlugState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Unplugged,
            1 => Self::PluggedStationOnly,
            3 => Self::PluggedLocked,
            5 => Self::PluggedWithEV,
            7 => Self::PluggedWithEVLocked,
            other => Self::Other(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Unplugged => 0,
            Self::PluggedStationOnly => 1,
            Self::PluggedLocked => 3,
            Self::PluggedWithEV => 5,
            Self::PluggedWithEVLocked => 7,
            Self::Other(raw) => *raw,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Unplugged => "unplugged",
            Self::PluggedStationOnly => "plugged on charging station",
            Self::PluggedLocked => "plugged on charging station, plug locked",
            Self::PluggedWithEV => "plugged on charging station and EV",
            Self::PluggedWithEVLocked => "plugged on charging station and EV, plug locked",
            Self::Other(_) => "unknown plug state",
        }
    }
}

/// The station's own lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceOperatingState {
    #[default]
    Starting,
    NotReady,
    ReadyWaiting,
    Charging,
    Error,
    AuthRejected,
    Unknown(u32),
}

impl DeviceOperatingState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Starting,
            1 => Self::NotReady,
            2 => Self::ReadyWaiting,
            3 => Self::Charging,
            4 => Self::Error,
            5 => Self::AuthRejected,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::Starting => 0,
            Self::NotReady => 1,
            Self::ReadyWaiting => 2,
            Self::Charging => 3,
            Self::Error => 4,
            Self::AuthRejected => 5,
            Self::Unknown(raw) => *raw,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::NotReady => "not ready for charging",
            Self::ReadyWaiting => "ready for charging, waiting for EV",
            Self::Charging => "charging",
            Self::Error => "error",
            Self::AuthRejected => "authorization rejected",
            Self::Unknown(_) => "unknown state",
        }
    }
}

/// Change the controller must react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    OperatingState {
        previous: DeviceOperatingState,
        current: DeviceOperatingState,
    },
    Input(u32),
    Plug(PlugState),
}

/// Station identity from report 1
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub product: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
}

/// Latest known station values, in wire units unless noted
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    voltages: [u32; 3],
    currents: [u32; 3],
    power_mw: u32,
    power_factor: u32,
    /// Session energy; report 3 values are multiplied by [`ENERGY_INGEST_SCALE`]
    energy: u64,
    max_curr: u32,
    curr_hw: u32,
    curr_user: u32,
    curr_fs: u32,
    tmo_fs: u32,
    enable_sys: u32,
    enable_user: u32,
    input: u32,
    plug: PlugState,
    state: DeviceOperatingState,
    identity: DeviceIdentity,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a decoded message and report what the controller should handle
    pub fn apply(&mut self, message: &DeviceMessage) -> Vec<DeviceEvent> {
        match message {
            DeviceMessage::Acknowledgment => Vec::new(),
            DeviceMessage::Report1(r) => {
                self.apply_report1(r);
                Vec::new()
            }
            DeviceMessage::Report2(r) => self.apply_report2(r),
            DeviceMessage::Report3(r) => {
                self.apply_report3(r);
                Vec::new()
            }
            DeviceMessage::Broadcast(b) => self.apply_broadcast(*b),
        }
    }

    fn apply_report1(&mut self, r: &Report1) {
        if r.product.is_some() {
            self.identity.product = r.product.clone();
        }
        if r.serial.is_some() {
            self.identity.serial = r.serial.clone();
        }
        if r.firmware.is_some() {
            self.identity.firmware = r.firmware.clone();
        }
    }

    fn apply_report2(&mut self, r: &Report2) -> Vec<DeviceEvent> {
        let mut events = Vec::new();

        let state = r.operating_state();
        if state != self.state {
            events.push(DeviceEvent::OperatingState {
                previous: self.state,
                current: state,
            });
            self.state = state;
        }
        if r.input != self.input {
            self.input = r.input;
            events.push(DeviceEvent::Input(r.input));
        }
        let plug = r.plug_state();
        if plug != self.plug {
            self.plug = plug;
            events.push(DeviceEvent::Plug(plug));
        }

        self.enable_sys = r.enable_sys;
        self.enable_user = r.enable_user;
        self.tmo_fs = r.tmo_fs;
        self.max_curr = r.max_curr;
        self.curr_hw = r.curr_hw;
        self.curr_user = r.curr_user;
        self.curr_fs = r.curr_fs;
        events
    }

    fn apply_report3(&mut self, r: &Report3) {
        self.voltages = [r.u1, r.u2, r.u3];
        self.currents = [r.i1, r.i2, r.i3];
        self.power_mw = r.p;
        self.power_factor = r.pf;
        self.energy = u64::from(r.e_pres) * ENERGY_INGEST_SCALE;
    }

    fn apply_broadcast(&mut self, broadcast: Broadcast) -> Vec<DeviceEvent> {
        match broadcast {
            Broadcast::State(current) => {
                let previous = self.state;
                self.state = current;
                vec![DeviceEvent::OperatingState { previous, current }]
            }
            Broadcast::Plug(plug) => {
                self.plug = plug;
                vec![DeviceEvent::Plug(plug)]
            }
            Broadcast::Input(input) => {
                self.input = input;
                vec![DeviceEvent::Input(input)]
            }
            Broadcast::EnableSys(v) => {
                self.enable_sys = v;
                Vec::new()
            }
            Broadcast::MaxCurr(v) => {
                self.max_curr = v;
                Vec::new()
            }
            Broadcast::EPres(v) => {
                // only report 3 applies the ingestion scale
                self.energy = u64::from(v);
                Vec::new()
            }
        }
    }

    pub fn plug_state(&self) -> PlugState {
        self.plug
    }

    pub fn operating_state(&self) -> DeviceOperatingState {
        self.state
    }

    /// Phase voltage in V, `phase` in 1..=3
    pub fn voltage(&self, phase: usize) -> Option<u32> {
        phase
            .checked_sub(1)
            .and_then(|i| self.voltages.get(i))
            .copied()
    }

    /// Phase current in mA, `phase` in 1..=3
    pub fn current(&self, phase: usize) -> Option<u32> {
        phase
            .checked_sub(1)
            .and_then(|i| self.currents.get(i))
            .copied()
    }

    pub fn voltages(&self) -> [u32; 3] {
        self.voltages
    }

    pub fn currents(&self) -> [u32; 3] {
        self.currents
    }

    /// Active power in W
    pub fn active_power_w(&self) -> u32 {
        self.power_mw / 1000
    }

    pub fn power_factor(&self) -> u32 {
        self.power_factor / 10
    }

    /// Session energy in Wh
    pub fn energy_wh(&self) -> u64 {
        self.energy.saturating_mul(ENERGY_READ_SCALE)
    }

    pub fn max_current_pilot(&self) -> u32 {
        self.max_curr
    }

    pub fn max_current_hardware(&self) -> u32 {
        self.curr_hw
    }

    pub fn max_current_user(&self) -> u32 {
        self.curr_user
    }

    pub fn failsafe_current(&self) -> u32 {
        self.curr_fs
    }

    pub fn failsafe_timeout_s(&self) -> u32 {
        self.tmo_fs
    }

    pub fn enable_sys(&self) -> u32 {
        self.enable_sys
    }

    pub fn enable_user(&self) -> u32 {
        self.enable_user
    }

    pub fn input(&self) -> u32 {
        self.input
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}
