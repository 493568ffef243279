use super::{DriverCommand, KebaDriver};
use crate::protocol::Command;

impl KebaDriver {
    pub(crate) fn handle_command(&mut self, cmd: DriverCommand) {
        match cmd {
            DriverCommand::SetPowerDelta(watts) => self.set_power_delta(watts),
            DriverCommand::SetControllerStatus(status) => {
                self.controller.set_controller_status(status);
            }
            DriverCommand::SetFailsafe {
                timeout_s,
                current_ma,
                persist,
            } => self.dispatcher.send(Command::Failsafe {
                timeout_s,
                current_ma,
                persist,
            }),
            DriverCommand::SetOutput(code) => self.dispatcher.send(Command::Output(code)),
            DriverCommand::RequestReport(n) => self.dispatcher.send(Command::Report(n)),
            DriverCommand::Tick => self.run_tick(),
        }
        self.publish_snapshot();
    }

    fn set_power_delta(&mut self, watts: f64) {
        if !watts.is_finite() {
            self.logger
                .warn(&format!("Ignoring non-finite power delta {}", watts));
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        let rounded = watts.round() as i64;
        self.logger
            .debug(&format!("Power delta set to {}W", rounded));
        self.controller.set_power_delta(rounded);
    }
}
