use helios::device::{DeviceOperatingState, PlugState};
use helios::protocol::{Broadcast, Command, DecodeError, DeviceMessage, decode, encode};

#[test]
fn station_report_samples_decode() {
    let report2 = r#"{
"ID": "2",
"State": 2,
"Error1": 0,
"Error2": 0,
"Plug": 5,
"AuthON": 0,
"Authreq": 0,
"Enable sys": 0,
"Enable user": 1,
"Max curr": 0,
"Max curr %": 1000,
"Curr HW": 32000,
"Curr user": 32000,
"Curr FS": 0,
"Tmo FS": 0,
"Curr timer": 0,
"Tmo CT": 0,
"Setenergy": 0,
"Output": 0,
"Input": 0,
"Serial": "19190325",
"Sec": 4241
}"#;
    let Ok(DeviceMessage::Report2(r)) = decode(report2) else {
        panic!("expected report 2");
    };
    assert_eq!(r.plug_state(), PlugState::PluggedWithEV);
    assert_eq!(r.operating_state(), DeviceOperatingState::ReadyWaiting);
    assert_eq!(r.enable_sys, 0);
    assert_eq!(r.curr_hw, 32000);

    let report3 = r#"{"ID": "3", "U1": 232, "U2": 231, "U3": 233, "I1": 15980, "I2": 16020,
        "I3": 16010, "P": 11085000, "PF": 997, "E pres": 18772, "E total": 9962164,
        "Serial": "19190325", "Sec": 4242}"#;
    let Ok(DeviceMessage::Report3(r)) = decode(report3) else {
        panic!("expected report 3");
    };
    assert_eq!(r.p, 11_085_000);
    assert_eq!(r.e_pres, 18772);
}

#[test]
fn broadcasts_decode_by_key() {
    assert_eq!(
        decode("{\"State\": 5}\n"),
        Ok(DeviceMessage::Broadcast(Broadcast::State(
            DeviceOperatingState::AuthRejected
        )))
    );
    assert_eq!(
        decode(r#"{"Input": 1}"#),
        Ok(DeviceMessage::Broadcast(Broadcast::Input(1)))
    );
    assert_eq!(
        decode(r#"{"E pres": 1500}"#),
        Ok(DeviceMessage::Broadcast(Broadcast::EPres(1500)))
    );
}

#[test]
fn report_without_required_field_is_rejected() {
    let text = r#"{"ID": "2", "State": 2, "Plug": 5, "Input": 0, "Enable sys": 1,
        "Enable user": 1, "Tmo FS": 0, "Max curr": 0, "Curr HW": 32000, "Curr user": 32000}"#;
    match decode(text) {
        Err(DecodeError::InvalidReport { id, reason }) => {
            assert_eq!(id, 2);
            assert!(reason.contains("Curr FS"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn non_messages_are_errors() {
    assert!(matches!(decode(""), Err(DecodeError::Malformed(_))));
    assert_eq!(decode("42"), Err(DecodeError::NotAnObject));
    assert_eq!(decode(r#"{"Sec": 12}"#), Err(DecodeError::Unrecognized));
    assert!(matches!(
        decode("TCH-ERR :cmd\n"),
        Err(DecodeError::Rejected(_))
    ));
}

#[test]
fn commands_encode_to_ascii() {
    let cases = [
        (Command::Enable(true), "ena 1"),
        (Command::Current(6000), "curr 6000"),
        (
            Command::Failsafe {
                timeout_s: 60,
                current_ma: 6000,
                persist: false,
            },
            "failsafe 60 6000 0",
        ),
        (Command::Output(1), "output 1"),
        (Command::Report(2), "report 2"),
    ];
    for (command, text) in cases {
        assert_eq!(encode(&command), text);
        assert_eq!(command.to_string(), text);
    }
}
