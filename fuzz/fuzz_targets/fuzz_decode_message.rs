#![no_main]
use helios::config::ControlsConfig;
use helios::controller::ChargeController;
use helios::controls::ChargingControls;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Datagrams arrive as lossy utf-8 text
    let text = String::from_utf8_lossy(data);
    let _ = helios::protocol::decode(&text);

    // Whatever decodes must be accepted by the controller without panicking
    let mut controller = ChargeController::new(ChargingControls::new(ControlsConfig::default()));
    if controller.handle_datagram(&text).is_ok() {
        let _ = controller.tick();
    }
});
