use std::sync::{Arc, Mutex};
use std::time::Duration;

use helios::config::Config;
use helios::controls::ControllerStatus;
use helios::driver::{DriverState, KebaDriver};
use helios::error::{HeliosError, Result};
use helios::metering::MeteringSink;
use helios::transport::Transport;
use tokio::sync::mpsc;

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, host: &str, _port: u16, payload: &[u8]) -> Result<()> {
        if self.fail {
            return Err(HeliosError::host_resolution(host.to_string(), "unreachable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<(String, String)>>,
}

#[async_trait::async_trait]
impl MeteringSink for RecordingSink {
    async fn report(&self, channel_id: &str, value: &str) -> Result<()> {
        self.reports
            .lock()
            .unwrap()
            .push((channel_id.to_string(), value.to_string()));
        Ok(())
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

#[tokio::test(start_paused = true)]
async fn driver_runs_plug_and_tick_end_to_end() {
    let mut config = Config::default();
    config.keba.poll_reports = false;
    config.failsafe.enabled = true;
    let current_channel = config.metering.controller_current_channel.clone();

    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(RecordingSink::default());
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (mut driver, handle) =
        KebaDriver::with_parts(config, transport.clone(), inbound_rx, sink.clone());

    let task = tokio::spawn(async move { driver.run().await });
    settle().await;
    assert_eq!(handle.state(), DriverState::Running);

    inbound_tx.send("{\"Plug\": 7}\n".to_string()).unwrap();
    settle().await;
    handle.set_power_delta(2300.0).unwrap();
    handle.tick().unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.controller_status, ControllerStatus::OptimizedCharging.code());
    assert_eq!(snap.power_delta_w, 2300);
    assert_eq!(snap.last_dispatched_ma, Some(10000));
    assert_eq!(snap.controller_current_ma, 10000);

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(handle.snapshot().driver_state, "ShuttingDown");

    assert_eq!(
        *transport.sent.lock().unwrap(),
        vec![
            "failsafe 300 13000 0".to_string(),
            "ena 1".to_string(),
            "curr 10000".to_string(),
            "curr 10000".to_string(),
        ]
    );
    assert_eq!(
        *sink.reports.lock().unwrap(),
        vec![
            (current_channel.clone(), "10000".to_string()),
            (current_channel, "10000".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn huge_power_delta_keeps_the_loop_running() {
    let mut config = Config::default();
    config.keba.poll_reports = false;
    let transport = Arc::new(RecordingTransport::default());
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (mut driver, handle) = KebaDriver::with_parts(
        config,
        transport.clone(),
        inbound_rx,
        Arc::new(RecordingSink::default()),
    );

    let task = tokio::spawn(async move { driver.run().await });
    inbound_tx.send(r#"{"Plug": 7}"#.to_string()).unwrap();
    settle().await;
    handle.set_power_delta(1e17).unwrap();
    handle.tick().unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.driver_state, "Running");
    assert_eq!(snap.last_dispatched_ma, Some(32000));
    assert_eq!(snap.controller_current_ma, 32000);

    handle.set_power_delta(-1e300).unwrap();
    handle.tick().unwrap();
    settle().await;
    assert_eq!(handle.snapshot().last_dispatched_ma, Some(10000));

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn ticks_poll_reports_first() {
    let config = Config::default();
    let transport = Arc::new(RecordingTransport::default());
    let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (mut driver, handle) = KebaDriver::with_parts(
        config,
        transport.clone(),
        inbound_rx,
        Arc::new(RecordingSink::default()),
    );

    let task = tokio::spawn(async move { driver.run().await });
    settle().await;
    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();

    assert_eq!(
        *transport.sent.lock().unwrap(),
        vec![
            "report 1".to_string(),
            "report 2".to_string(),
            "report 3".to_string(),
        ]
    );
    assert_eq!(handle.snapshot().ticks, 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_do_not_stop_the_loop() {
    let mut config = Config::default();
    config.keba.poll_reports = false;
    let transport = Arc::new(RecordingTransport {
        fail: true,
        ..RecordingTransport::default()
    });
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (mut driver, handle) = KebaDriver::with_parts(
        config,
        transport,
        inbound_rx,
        Arc::new(RecordingSink::default()),
    );

    let task = tokio::spawn(async move { driver.run().await });
    inbound_tx.send(r#"{"Plug": 7}"#.to_string()).unwrap();
    settle().await;
    inbound_tx.send("garbage".to_string()).unwrap();
    inbound_tx.send(r#"{"Plug": 0}"#.to_string()).unwrap();
    settle().await;

    let snap = handle.snapshot();
    assert_eq!(snap.datagrams_received, 3);
    assert_eq!(snap.decode_failures, 1);
    assert_eq!(snap.send_failures, 3);
    assert_eq!(snap.controller_status, ControllerStatus::NotConnected.code());

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn handle_commands_reach_the_station() {
    let mut config = Config::default();
    config.keba.poll_reports = false;
    let transport = Arc::new(RecordingTransport::default());
    let (_inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (mut driver, handle) = KebaDriver::with_parts(
        config,
        transport.clone(),
        inbound_rx,
        Arc::new(RecordingSink::default()),
    );

    let task = tokio::spawn(async move { driver.run().await });
    settle().await;
    handle.set_failsafe(120, 6000, true).unwrap();
    settle().await;
    handle.set_output(1).unwrap();
    settle().await;
    handle.request_report(1).unwrap();
    settle().await;
    handle.set_controller_status(ControllerStatus::FixedCharging).unwrap();
    settle().await;
    assert_eq!(handle.snapshot().controller_status, 3);

    handle.shutdown().unwrap();
    task.await.unwrap().unwrap();
    assert_eq!(
        *transport.sent.lock().unwrap(),
        vec![
            "failsafe 120 6000 1".to_string(),
            "output 1".to_string(),
            "report 1".to_string(),
        ]
    );
}
