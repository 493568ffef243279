use std::fmt;

/// Outbound ascii command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `ena {0|1}`: enable or disable the charging point
    Enable(bool),
    /// `curr {mA}`: set the charge current
    Current(u32),
    /// `failsafe {timeout} {mA} {persist}`
    Failsafe {
        timeout_s: u32,
        current_ma: u32,
        persist: bool,
    },
    /// `output {code}`: 0 open, 1 closed, >=10 pulses per kWh
    Output(u32),
    /// `report {n}`: request a report response
    Report(u8),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Enable(on) => write!(f, "ena {}", u8::from(*on)),
            Command::Current(ma) => write!(f, "curr {}", ma),
            Command::Failsafe {
                timeout_s,
                current_ma,
                persist,
            } => write!(
                f,
                "failsafe {} {} {}",
                timeout_s,
                current_ma,
                u8::from(*persist)
            ),
            Command::Output(code) => write!(f, "output {}", code),
            Command::Report(n) => write!(f, "report {}", n),
        }
    }
}
