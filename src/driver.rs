//! Core driver logic for Helios
//!
//! `KebaDriver` is the single owner of the charge controller. Its main loop
//! serialises inbound datagrams, control ticks and external commands, hands
//! controller actions to the dispatcher and publishes a snapshot after every
//! event. Other components talk to it through a [`DriverHandle`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};

use crate::config::Config;
use crate::controller::ChargeController;
use crate::controls::{ChargingControls, ControllerStatus};
use crate::dispatcher::{CommandDispatcher, DispatchStats, MeteringChannels, SendWorker};
use crate::error::{HeliosError, Result};
use crate::logging::{LogContext, get_logger_with_context};
use crate::metering::{MeteringSink, build_sink};
use crate::protocol::{Command, DecodeError};
use crate::transport::{Transport, UdpTransport};

mod commands;
mod snapshot;
mod types;

pub use types::{DriverCommand, DriverSnapshot, DriverState};

/// Main driver for Helios
pub struct KebaDriver {
    /// Configuration
    config: Config,

    /// Current driver state
    state: watch::Sender<DriverState>,

    /// Control state machine and device mirror
    controller: ChargeController,

    /// Executes controller actions
    dispatcher: CommandDispatcher,

    /// Logger with context
    logger: crate::logging::StructuredLogger,

    /// Raw datagrams from the station
    inbound_rx: mpsc::UnboundedReceiver<String>,

    /// Command receiver for external control
    commands_rx: mpsc::UnboundedReceiver<DriverCommand>,

    /// Shutdown receiver
    shutdown_rx: mpsc::UnboundedReceiver<()>,

    /// Latest snapshot for consumers
    snapshot_tx: watch::Sender<Arc<DriverSnapshot>>,

    /// Background tasks owned by the driver
    tasks: Vec<JoinHandle<()>>,

    datagrams_received: u64,
    decode_failures: u64,
    rejected_commands: u64,
    ticks: u64,
}

/// Cloneable control surface of a running driver
#[derive(Clone)]
pub struct DriverHandle {
    commands_tx: mpsc::UnboundedSender<DriverCommand>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    snapshot_rx: watch::Receiver<Arc<DriverSnapshot>>,
    state_rx: watch::Receiver<DriverState>,
}

impl DriverHandle {
    fn command(&self, cmd: DriverCommand) -> Result<()> {
        self.commands_tx
            .send(cmd)
            .map_err(|_| HeliosError::generic("Driver is not running"))
    }

    pub fn set_power_delta(&self, watts: f64) -> Result<()> {
        self.command(DriverCommand::SetPowerDelta(watts))
    }

    pub fn set_controller_status(&self, status: ControllerStatus) -> Result<()> {
        self.command(DriverCommand::SetControllerStatus(status))
    }

    pub fn set_failsafe(&self, timeout_s: u32, current_ma: u32, persist: bool) -> Result<()> {
        self.command(DriverCommand::SetFailsafe {
            timeout_s,
            current_ma,
            persist,
        })
    }

    pub fn set_output(&self, code: u32) -> Result<()> {
        self.command(DriverCommand::SetOutput(code))
    }

    pub fn request_report(&self, report: u8) -> Result<()> {
        self.command(DriverCommand::RequestReport(report))
    }

    pub fn tick(&self) -> Result<()> {
        self.command(DriverCommand::Tick)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .map_err(|_| HeliosError::generic("Driver is not running"))
    }

    pub fn snapshot(&self) -> Arc<DriverSnapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<DriverSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn state(&self) -> DriverState {
        *self.state_rx.borrow()
    }
}

impl KebaDriver {
    /// Bind the UDP transport and build the configured metering sink
    pub async fn new(config: Config) -> Result<(Self, DriverHandle)> {
        let transport = UdpTransport::bind(config.keba.listen_port).await?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let receiver = transport.spawn_receiver(inbound_tx);
        let sink = build_sink(&config.metering)?;

        let (mut driver, handle) = Self::with_parts(config, Arc::new(transport), inbound_rx, sink);
        driver.tasks.push(receiver);
        Ok((driver, handle))
    }

    /// Build a driver around an existing transport, inbound stream and sink
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        inbound_rx: mpsc::UnboundedReceiver<String>,
        sink: Arc<dyn MeteringSink>,
    ) -> (Self, DriverHandle) {
        let context = LogContext::new("driver")
            .with_device(format!("{}:{}", config.keba.host, config.keba.port));
        let logger = get_logger_with_context(context);
        logger.info("Initializing KEBA driver");

        let stats = Arc::new(DispatchStats::default());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Command>();
        let worker = SendWorker::new(
            transport,
            config.keba.host.clone(),
            config.keba.port,
            Duration::from_millis(config.controls.send_pacing_ms),
            Arc::clone(&stats),
        );
        let sender = worker.spawn(outbound_rx);

        let channels = MeteringChannels {
            controller_current: config.metering.controller_current_channel.clone(),
            input: config.metering.input_channel.clone(),
        };
        let dispatcher = CommandDispatcher::new(outbound_tx, sink, channels, stats);
        let controller = ChargeController::new(ChargingControls::new(config.controls.clone()));

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DriverState::Initializing);
        let (snapshot_tx, _) = watch::channel(Arc::new(DriverSnapshot::default()));

        let mut driver = Self {
            config,
            state: state_tx,
            controller,
            dispatcher,
            logger,
            inbound_rx,
            commands_rx,
            shutdown_rx,
            snapshot_tx,
            tasks: vec![sender],
            datagrams_received: 0,
            decode_failures: 0,
            rejected_commands: 0,
            ticks: 0,
        };
        driver.snapshot_tx.send_replace(Arc::new(driver.build_snapshot()));

        let handle = DriverHandle {
            commands_tx,
            shutdown_tx,
            snapshot_rx: driver.snapshot_tx.subscribe(),
            state_rx,
        };
        (driver, handle)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &ChargeController {
        &self.controller
    }

    /// Run the driver main loop until shutdown is requested
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info("Starting KEBA driver main loop");
        self.state.send_replace(DriverState::Running);

        if self.config.failsafe.enabled {
            let failsafe = &self.config.failsafe;
            self.logger.info(&format!(
                "Configuring failsafe: {}s at {}mA",
                failsafe.timeout_s, failsafe.current_ma
            ));
            self.dispatcher.send(Command::Failsafe {
                timeout_s: failsafe.timeout_s,
                current_ma: failsafe.current_ma,
                persist: failsafe.persist,
            });
        }
        if self.config.keba.poll_reports {
            self.dispatcher.send(Command::Report(1));
        }
        self.publish_snapshot();

        let mut tick_interval = interval(Duration::from_millis(self.config.controls.tick_interval_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.run_tick();
                }
                Some(text) = self.inbound_rx.recv() => {
                    self.handle_datagram(&text);
                }
                Some(cmd) = self.commands_rx.recv() => {
                    self.handle_command(cmd);
                }
                Some(()) = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown signal received");
                    break;
                }
            }
        }

        self.state.send_replace(DriverState::ShuttingDown);
        self.publish_snapshot();
        self.shutdown();
        Ok(())
    }

    /// Decode and apply one datagram; failures are logged and dropped
    pub(crate) fn handle_datagram(&mut self, text: &str) {
        self.datagrams_received = self.datagrams_received.saturating_add(1);
        match self.controller.handle_datagram(text) {
            Ok(actions) => self.dispatcher.execute(actions),
            Err(DecodeError::Rejected(reply)) => {
                self.rejected_commands = self.rejected_commands.saturating_add(1);
                self.logger
                    .warn(&format!("Station rejected a command: {}", reply));
            }
            Err(e) => {
                self.decode_failures = self.decode_failures.saturating_add(1);
                self.logger
                    .debug(&format!("Discarding datagram ({}): {}", e, text.trim_end()));
            }
        }
        self.publish_snapshot();
    }

    /// One control step, preceded by report polling when enabled
    pub(crate) fn run_tick(&mut self) {
        if self.config.keba.poll_reports {
            self.dispatcher.send(Command::Report(2));
            self.dispatcher.send(Command::Report(3));
        }
        let actions = self.controller.tick();
        self.dispatcher.execute(actions);
        self.ticks = self.ticks.saturating_add(1);
        self.publish_snapshot();
    }

    fn shutdown(&mut self) {
        self.logger.info("Shutting down driver");
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.logger.info("Driver shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering::NullSink;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, _host: &str, _port: u16, payload: &[u8]) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(payload).into_owned());
            Ok(())
        }
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.keba.poll_reports = false;
        config.controls.send_pacing_ms = 1;
        config
    }

    #[tokio::test]
    async fn snapshot_reflects_datagrams() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(RecordingTransport::default());
        let (mut driver, handle) =
            KebaDriver::with_parts(quiet_config(), transport, rx, Arc::new(NullSink));

        driver.handle_datagram(r#"{"Plug": 7}"#);
        driver.handle_datagram("not a message");

        let snap = handle.snapshot();
        assert_eq!(snap.plug_state, 7);
        assert_eq!(snap.controller_status, 2);
        assert_eq!(snap.last_dispatched_ma, Some(10000));
        assert_eq!(snap.datagrams_received, 2);
        assert_eq!(snap.decode_failures, 1);
        assert_eq!(handle.state(), DriverState::Initializing);
    }

    #[tokio::test]
    async fn power_delta_is_rounded() {
        let (_tx, rx) = mpsc::unbounded_channel();
        let (mut driver, handle) = KebaDriver::with_parts(
            quiet_config(),
            Arc::new(RecordingTransport::default()),
            rx,
            Arc::new(NullSink),
        );
        driver.handle_command(DriverCommand::SetPowerDelta(1234.6));
        assert_eq!(driver.controller().power_delta_w(), 1235);
        driver.handle_command(DriverCommand::SetPowerDelta(f64::NAN));
        assert_eq!(handle.snapshot().power_delta_w, 1235);
    }
}
