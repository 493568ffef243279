use std::sync::Arc;
use std::sync::atomic::Ordering;

use super::types::DriverSnapshot;

impl super::KebaDriver {
    pub fn subscribe_snapshot(
        &self,
    ) -> tokio::sync::watch::Receiver<Arc<DriverSnapshot>> {
        self.snapshot_tx.subscribe()
    }

    pub(super) fn build_snapshot(&self) -> DriverSnapshot {
        let c = &self.controller;
        let device = c.device();
        let identity = device.identity();
        let timer = c.charging_timer();
        let stats = self.dispatcher.stats();
        let limits = c.limits();

        DriverSnapshot {
            timestamp: chrono::Utc::now().to_rfc3339(),
            driver_state: self.state.borrow().as_str().to_string(),
            controller_status: c.status().code(),
            controller_status_text: c.status().description().to_string(),
            controller_current_ma: c.controller_current_ma(),
            last_dispatched_ma: self.dispatcher.last_dispatched_ma(),
            min_charge_current_ma: limits.min_ma,
            max_charge_current_ma: limits.max_ma,
            power_delta_w: c.power_delta_w(),
            plug_state: device.plug_state().code(),
            plug_state_text: device.plug_state().description().to_string(),
            device_state: device.operating_state().code(),
            device_state_text: device.operating_state().description().to_string(),
            voltages: device.voltages(),
            currents: device.currents(),
            active_power_w: device.active_power_w(),
            power_factor: device.power_factor(),
            energy_wh: device.energy_wh(),
            max_current_pilot_ma: device.max_current_pilot(),
            max_current_hardware_ma: device.max_current_hardware(),
            max_current_user_ma: device.max_current_user(),
            failsafe_current_ma: device.failsafe_current(),
            failsafe_timeout_s: device.failsafe_timeout_s(),
            enable_sys: device.enable_sys(),
            enable_user: device.enable_user(),
            input: device.input(),
            product: identity.product.clone(),
            serial: identity.serial.clone(),
            firmware: identity.firmware.clone(),
            charging_since: timer.started_at().map(|t| t.to_rfc3339()),
            charging_seconds: timer.elapsed().map(|d| d.as_secs()),
            datagrams_received: self.datagrams_received,
            decode_failures: self.decode_failures,
            rejected_commands: self.rejected_commands,
            ticks: self.ticks,
            commands_sent: stats.commands_sent.load(Ordering::Relaxed),
            send_failures: stats.send_failures.load(Ordering::Relaxed),
            metering_failures: stats.metering_failures.load(Ordering::Relaxed),
        }
    }

    pub(super) fn publish_snapshot(&self) {
        let snapshot = Arc::new(self.build_snapshot());
        self.snapshot_tx.send_replace(snapshot);
    }
}
