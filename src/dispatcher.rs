//! Command dispatcher
//!
//! Executes controller actions: current requests are clamped into the active
//! limits, reported to metering and queued for the station. Queued commands
//! are sent by a separate worker that waits the pacing delay before each send,
//! so the state owner never sleeps.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::controller::{ControllerAction, MeterChannel};
use crate::controls::ChargeLimits;
use crate::logging::get_logger;
use crate::metering::MeteringSink;
use crate::protocol::{Command, encode};
use crate::transport::Transport;

/// Clamp a requested current into `limits`
pub fn clamp_current(requested: i64, limits: ChargeLimits) -> u32 {
    if requested < i64::from(limits.min_ma) {
        limits.min_ma
    } else if requested > i64::from(limits.max_ma) {
        limits.max_ma
    } else {
        u32::try_from(requested).unwrap_or(limits.min_ma)
    }
}

/// Metering channel ids
#[derive(Debug, Clone)]
pub struct MeteringChannels {
    pub controller_current: String,
    pub input: String,
}

impl MeteringChannels {
    fn id(&self, channel: MeterChannel) -> &str {
        match channel {
            MeterChannel::ControllerCurrent => &self.controller_current,
            MeterChannel::Input => &self.input,
        }
    }
}

/// Counters shared between the dispatcher and its send worker
#[derive(Debug, Default)]
pub struct DispatchStats {
    pub commands_sent: AtomicU64,
    pub send_failures: AtomicU64,
    pub metering_failures: AtomicU64,
}

/// Turns controller actions into queued commands and metering reports
pub struct CommandDispatcher {
    outbound: mpsc::UnboundedSender<Command>,
    metering: Arc<dyn MeteringSink>,
    channels: MeteringChannels,
    stats: Arc<DispatchStats>,
    last_dispatched_ma: Option<u32>,
    logger: crate::logging::StructuredLogger,
}

impl CommandDispatcher {
    pub fn new(
        outbound: mpsc::UnboundedSender<Command>,
        metering: Arc<dyn MeteringSink>,
        channels: MeteringChannels,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            outbound,
            metering,
            channels,
            stats,
            last_dispatched_ma: None,
            logger: get_logger("dispatcher"),
        }
    }

    pub fn execute(&mut self, actions: Vec<ControllerAction>) {
        for action in actions {
            match action {
                ControllerAction::Send(command) => self.send(command),
                ControllerAction::DispatchCurrent { requested, limits } => {
                    self.dispatch_current(requested, limits);
                }
                ControllerAction::Meter { channel, value } => self.meter(channel, value),
            }
        }
    }

    /// Clamp, meter, then queue `curr`; returns the dispatched value
    pub fn dispatch_current(&mut self, requested: i64, limits: ChargeLimits) -> u32 {
        let dispatched = clamp_current(requested, limits);
        if i64::from(dispatched) != requested {
            self.logger.debug(&format!(
                "Requested {}mA clamped to {}mA (limits {}..{})",
                requested, dispatched, limits.min_ma, limits.max_ma
            ));
        }
        self.meter(MeterChannel::ControllerCurrent, dispatched.to_string());
        self.send(Command::Current(dispatched));
        self.last_dispatched_ma = Some(dispatched);
        dispatched
    }

    /// Queue a command for the send worker
    pub fn send(&self, command: Command) {
        if self.outbound.send(command).is_err() {
            self.logger
                .warn(&format!("Send worker stopped, dropping '{}'", command));
        }
    }

    /// Report a value without waiting for the sink
    pub fn meter(&self, channel: MeterChannel, value: String) {
        let sink = Arc::clone(&self.metering);
        let channel_id = self.channels.id(channel).to_string();
        let stats = Arc::clone(&self.stats);
        let logger = self.logger.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.report(&channel_id, &value).await {
                stats.metering_failures.fetch_add(1, Ordering::Relaxed);
                logger.warn(&format!("Metering report failed: {}", e));
            }
        });
    }

    pub fn last_dispatched_ma(&self) -> Option<u32> {
        self.last_dispatched_ma
    }

    pub fn stats(&self) -> &Arc<DispatchStats> {
        &self.stats
    }
}

/// Paced sender draining the outbound queue
pub struct SendWorker {
    transport: Arc<dyn Transport>,
    host: String,
    port: u16,
    pacing: Duration,
    stats: Arc<DispatchStats>,
    logger: crate::logging::StructuredLogger,
}

impl SendWorker {
    pub fn new(
        transport: Arc<dyn Transport>,
        host: String,
        port: u16,
        pacing: Duration,
        stats: Arc<DispatchStats>,
    ) -> Self {
        Self {
            transport,
            host,
            port,
            pacing,
            stats,
            logger: get_logger("sender"),
        }
    }

    /// Run until every sender of `rx` is dropped
    pub fn spawn(self, mut rx: mpsc::UnboundedReceiver<Command>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                tokio::time::sleep(self.pacing).await;
                let text = encode(&command);
                match self
                    .transport
                    .send(&self.host, self.port, text.as_bytes())
                    .await
                {
                    Ok(()) => {
                        self.stats.commands_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                        self.logger
                            .warn(&format!("Dropping '{}': {}", text, e));
                    }
                }
            }
            self.logger.debug("Send worker finished");
        })
    }
}
