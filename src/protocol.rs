//! KEBA UDP protocol codec
//!
//! Inbound datagrams are short ascii acknowledgements or JSON objects (report
//! responses and unsolicited broadcasts). Outbound commands are plain ascii
//! lines such as `curr 16000`.
//!
//! Decoding is schema-driven: the text is classified into a closed
//! [`DeviceMessage`] variant or rejected with a typed [`DecodeError`]. A decode
//! failure is never fatal for the caller.

use serde_json::{Map, Value};
use thiserror::Error;

mod command;
mod message;

pub use command::Command;
pub use message::{Broadcast, DeviceMessage, Report1, Report2, Report3};

use crate::device::{DeviceOperatingState, PlugState};

/// Acknowledgement sent by the station after every accepted command
pub const ACK_LITERAL: &str = "TCH-OK :done";

/// Prefix of the station's negative acknowledgement
pub const REJECT_PREFIX: &str = "TCH-ERR";

/// Broadcast keys in classification priority order
pub const BROADCAST_KEYS: [&str; 6] = ["State", "Plug", "Input", "Enable sys", "Max curr", "E pres"];

/// Reasons an inbound datagram could not be turned into a [`DeviceMessage`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Valid JSON object without any recognised field
    #[error("unrecognized message")]
    Unrecognized,

    /// Not parseable as JSON
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Valid JSON but not an object
    #[error("message is not a JSON object")]
    NotAnObject,

    /// Report response with an id this controller does not handle
    #[error("unknown report id: {0}")]
    UnknownReportId(String),

    /// Report response missing a required field or carrying a wrong type
    #[error("invalid report {id}: {reason}")]
    InvalidReport { id: u8, reason: String },

    /// Broadcast field present but not a usable value
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    /// The station answered with `TCH-ERR`
    #[error("command rejected by station: {0}")]
    Rejected(String),
}

/// Decode one inbound datagram
pub fn decode(text: &str) -> Result<DeviceMessage, DecodeError> {
    let trimmed = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    if trimmed == ACK_LITERAL {
        return Ok(DeviceMessage::Acknowledgment);
    }
    if trimmed.starts_with(REJECT_PREFIX) {
        return Err(DecodeError::Rejected(trimmed.to_string()));
    }

    let value: Value =
        serde_json::from_str(trimmed).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let Value::Object(object) = value else {
        return Err(DecodeError::NotAnObject);
    };

    if let Some(id) = object.get("ID") {
        let id = report_id(id)?;
        return decode_report(id, object);
    }

    decode_broadcast(&object)
}

/// Encode an outbound command into the station's ascii syntax
pub fn encode(command: &Command) -> String {
    command.to_string()
}

fn report_id(value: &Value) -> Result<u8, DecodeError> {
    let raw = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(DecodeError::UnknownReportId(other.to_string())),
    };
    match raw.as_str() {
        "1" => Ok(1),
        "2" => Ok(2),
        "3" => Ok(3),
        _ => Err(DecodeError::UnknownReportId(raw)),
    }
}

fn decode_report(id: u8, object: Map<String, Value>) -> Result<DeviceMessage, DecodeError> {
    let value = Value::Object(object);
    let invalid = |e: serde_json::Error| DecodeError::InvalidReport {
        id,
        reason: e.to_string(),
    };
    match id {
        1 => serde_json::from_value(value)
            .map(DeviceMessage::Report1)
            .map_err(invalid),
        2 => serde_json::from_value(value)
            .map(DeviceMessage::Report2)
            .map_err(invalid),
        3 => serde_json::from_value(value)
            .map(DeviceMessage::Report3)
            .map_err(invalid),
        other => Err(DecodeError::UnknownReportId(other.to_string())),
    }
}

fn decode_broadcast(object: &Map<String, Value>) -> Result<DeviceMessage, DecodeError> {
    let Some((key, value)) = BROADCAST_KEYS
        .iter()
        .find_map(|key| object.get(*key).map(|v| (*key, v)))
    else {
        return Err(DecodeError::Unrecognized);
    };

    let raw = field_u32(key, value)?;
    let broadcast = match key {
        "State" => Broadcast::State(DeviceOperatingState::from_raw(raw)),
        "Plug" => Broadcast::Plug(PlugState::from_raw(raw)),
        "Input" => Broadcast::Input(raw),
        "Enable sys" => Broadcast::EnableSys(raw),
        "Max curr" => Broadcast::MaxCurr(raw),
        _ => Broadcast::EPres(raw),
    };
    Ok(DeviceMessage::Broadcast(broadcast))
}

fn field_u32(field: &str, value: &Value) -> Result<u32, DecodeError> {
    let invalid = |reason: &str| DecodeError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    };
    let n = value
        .as_u64()
        .ok_or_else(|| invalid("expected a non-negative integer"))?;
    u32::try_from(n).map_err(|_| invalid("value out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_acknowledgement_with_newline() {
        assert_eq!(decode("TCH-OK :done\n"), Ok(DeviceMessage::Acknowledgment));
        assert_eq!(decode("TCH-OK :done"), Ok(DeviceMessage::Acknowledgment));
    }

    #[test]
    fn rejection_is_a_decode_error() {
        assert!(matches!(
            decode("TCH-ERR :unknown command\n"),
            Err(DecodeError::Rejected(_))
        ));
    }

    #[test]
    fn decodes_report2() {
        let text = r#"{"ID": "2", "State": 3, "Error1": 0, "Error2": 0, "Plug": 7,
            "Enable sys": 1, "Enable user": 1, "Max curr": 32000, "Max curr %": 1000,
            "Curr HW": 32000, "Curr user": 63000, "Curr FS": 13000, "Tmo FS": 300,
            "Output": 0, "Input": 1, "Serial": "16914163", "Sec": 117}"#;
        let Ok(DeviceMessage::Report2(r)) = decode(text) else {
            panic!("expected report 2");
        };
        assert_eq!(r.state, 3);
        assert_eq!(r.plug, 7);
        assert_eq!(r.input, 1);
        assert_eq!(r.curr_user, 63000);
        assert_eq!(r.tmo_fs, 300);
    }

    #[test]
    fn decodes_report3_with_numeric_id() {
        let text = r#"{"ID": 3, "U1": 230, "U2": 229, "U3": 231, "I1": 10000, "I2": 9900,
            "I3": 10100, "P": 6900000, "PF": 998, "E pres": 1234, "E total": 9999}"#;
        let Ok(DeviceMessage::Report3(r)) = decode(text) else {
            panic!("expected report 3");
        };
        assert_eq!((r.u1, r.u2, r.u3), (230, 229, 231));
        assert_eq!(r.p, 6_900_000);
        assert_eq!(r.e_pres, 1234);
    }

    #[test]
    fn report1_fields_are_optional() {
        let Ok(DeviceMessage::Report1(r)) = decode(r#"{"ID": "1"}"#) else {
            panic!("expected report 1");
        };
        assert_eq!(r.product, None);

        let Ok(DeviceMessage::Report1(r)) =
            decode(r#"{"ID": "1", "Product": "KC-P30-EC240422-E00", "Serial": "16914163", "Firmware": "P30 v 3.10.16"}"#)
        else {
            panic!("expected report 1");
        };
        assert_eq!(r.serial.as_deref(), Some("16914163"));
    }

    #[test]
    fn report_missing_required_field_fails() {
        let text = r#"{"ID": "3", "U1": 230, "U2": 229, "U3": 231, "I1": 0, "I2": 0, "I3": 0, "P": 0, "PF": 0}"#;
        let err = decode(text).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidReport { id: 3, .. }));
        assert!(err.to_string().contains("E pres"));
    }

    #[test]
    fn unknown_report_id_fails() {
        assert_eq!(
            decode(r#"{"ID": "100", "Session ID": 7}"#),
            Err(DecodeError::UnknownReportId("100".to_string()))
        );
    }

    #[test]
    fn broadcast_priority_order() {
        // State wins over Plug when both are present
        assert_eq!(
            decode(r#"{"Plug": 7, "State": 3}"#),
            Ok(DeviceMessage::Broadcast(Broadcast::State(
                DeviceOperatingState::Charging
            )))
        );
        assert_eq!(
            decode(r#"{"E pres": 10, "Max curr": 16000}"#),
            Ok(DeviceMessage::Broadcast(Broadcast::MaxCurr(16000)))
        );
        assert_eq!(
            decode(r#"{"Enable sys": 1}"#),
            Ok(DeviceMessage::Broadcast(Broadcast::EnableSys(1)))
        );
    }

    #[test]
    fn unmapped_plug_value_is_decoded() {
        assert_eq!(
            decode(r#"{"Plug": 2}"#),
            Ok(DeviceMessage::Broadcast(Broadcast::Plug(PlugState::Other(2))))
        );
    }

    #[test]
    fn unrecognized_and_malformed() {
        assert_eq!(decode(r#"{"Foo": 1}"#), Err(DecodeError::Unrecognized));
        assert_eq!(decode("[1, 2]"), Err(DecodeError::NotAnObject));
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(
            decode(r#"{"Plug": -1}"#),
            Err(DecodeError::InvalidField { .. })
        ));
        assert!(matches!(
            decode(r#"{"State": "three"}"#),
            Err(DecodeError::InvalidField { .. })
        ));
    }

    #[test]
    fn encodes_command_shapes() {
        assert_eq!(encode(&Command::Enable(true)), "ena 1");
        assert_eq!(encode(&Command::Enable(false)), "ena 0");
        assert_eq!(encode(&Command::Current(16000)), "curr 16000");
        assert_eq!(
            encode(&Command::Failsafe {
                timeout_s: 300,
                current_ma: 13000,
                persist: true
            }),
            "failsafe 300 13000 1"
        );
        assert_eq!(encode(&Command::Output(10)), "output 10");
        assert_eq!(encode(&Command::Report(3)), "report 3");
    }
}
