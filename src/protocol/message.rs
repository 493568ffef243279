use serde::Deserialize;

use crate::device::{DeviceOperatingState, PlugState};

/// One decoded inbound datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMessage {
    /// `TCH-OK :done`
    Acknowledgment,
    /// Response to `report 1`
    Report1(Report1),
    /// Response to `report 2`
    Report2(Report2),
    /// Response to `report 3`
    Report3(Report3),
    /// Unsolicited single-field update
    Broadcast(Broadcast),
}

/// Unsolicited broadcast, keyed by the single field it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broadcast {
    State(DeviceOperatingState),
    Plug(PlugState),
    Input(u32),
    EnableSys(u32),
    MaxCurr(u32),
    EPres(u32),
}

/// Station identity
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Report1 {
    #[serde(rename = "Product", default)]
    pub product: Option<String>,
    #[serde(rename = "Serial", default)]
    pub serial: Option<String>,
    #[serde(rename = "Firmware", default)]
    pub firmware: Option<String>,
}

/// Station state, flags and current limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Report2 {
    #[serde(rename = "State")]
    pub state: u32,
    #[serde(rename = "Input")]
    pub input: u32,
    #[serde(rename = "Plug")]
    pub plug: u32,
    #[serde(rename = "Enable sys")]
    pub enable_sys: u32,
    #[serde(rename = "Enable user")]
    pub enable_user: u32,
    /// Communication timeout before the failsafe triggers (s)
    #[serde(rename = "Tmo FS")]
    pub tmo_fs: u32,
    /// Current preset via the control pilot (mA)
    #[serde(rename = "Max curr")]
    pub max_curr: u32,
    /// Highest possible current of the charging connection (mA)
    #[serde(rename = "Curr HW")]
    pub curr_hw: u32,
    /// User preset via UDP (mA)
    #[serde(rename = "Curr user")]
    pub curr_user: u32,
    /// Failsafe current (mA)
    #[serde(rename = "Curr FS")]
    pub curr_fs: u32,
}

/// Electrical measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Report3 {
    #[serde(rename = "U1")]
    pub u1: u32,
    #[serde(rename = "U2")]
    pub u2: u32,
    #[serde(rename = "U3")]
    pub u3: u32,
    #[serde(rename = "I1")]
    pub i1: u32,
    #[serde(rename = "I2")]
    pub i2: u32,
    #[serde(rename = "I3")]
    pub i3: u32,
    /// Active power (mW)
    #[serde(rename = "P")]
    pub p: u32,
    /// Power factor (0.1 %)
    #[serde(rename = "PF")]
    pub pf: u32,
    /// Energy of the present session
    #[serde(rename = "E pres")]
    pub e_pres: u32,
}

impl Report2 {
    pub fn plug_state(&self) -> PlugState {
        PlugState::from_raw(self.plug)
    }

    pub fn operating_state(&self) -> DeviceOperatingState {
        DeviceOperatingState::from_raw(self.state)
    }
}
