use super::*;

impl Default for KebaConfig {
    fn default() -> Self {
        Self {
            host: "192.168.178.59".to_string(),
            port: 7090,
            listen_port: 7090,
            poll_reports: true,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            min_charge_current_ma: 10000,
            max_charge_current_ma: 32000,
            plug_in_current_ma: 10000,
            boost_min_current_ma: 32000,
            fixed_min_current_ma: 16000,
            charge_offset_w: 0,
            ready_seed_offset_ma: 3000,
            send_pacing_ms: 100,
            tick_interval_ms: 60_000,
        }
    }
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_s: 300,
            current_ma: 13000,
            persist: false,
        }
    }
}

impl Default for MeteringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://192.168.178.49/middleware.php".to_string(),
            controller_current_channel: "f0c4d0d0-6c55-11ee-98da-934802c138a3".to_string(),
            input_channel: "a4d3f3f0-6c55-11ee-b0f1-5f5a7e9cf2dc".to_string(),
            timeout_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/helios.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}
