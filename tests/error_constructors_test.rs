use helios::error::HeliosError;
use helios::protocol::DecodeError;

#[test]
fn error_constructors_group_1() {
    assert!(matches!(HeliosError::config("x"), HeliosError::Config { .. }));
    assert!(matches!(
        HeliosError::protocol("x"),
        HeliosError::Protocol { .. }
    ));
    assert!(matches!(
        HeliosError::transport("x"),
        HeliosError::Transport { .. }
    ));
    assert!(matches!(
        HeliosError::host_resolution("h", "m"),
        HeliosError::HostResolution { .. }
    ));
}

#[test]
fn error_constructors_group_2() {
    let ser = HeliosError::Serialization {
        message: "s".into(),
    };
    assert!(matches!(ser, HeliosError::Serialization { .. }));
    assert!(matches!(HeliosError::io("x"), HeliosError::Io { .. }));
    assert!(matches!(
        HeliosError::metering("x"),
        HeliosError::Metering { .. }
    ));
    assert!(matches!(
        HeliosError::validation("f", "m"),
        HeliosError::Validation { .. }
    ));
    assert!(matches!(
        HeliosError::timeout("x"),
        HeliosError::Timeout { .. }
    ));
    assert!(matches!(
        HeliosError::generic("x"),
        HeliosError::Generic { .. }
    ));
}

#[test]
fn conversions() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    assert!(matches!(HeliosError::from(io), HeliosError::Io { .. }));

    let e: HeliosError = DecodeError::InvalidReport {
        id: 2,
        reason: "missing field `Plug`".to_string(),
    }
    .into();
    assert!(format!("{}", e).contains("invalid report 2"));
}

#[test]
fn display_messages() {
    let e = HeliosError::validation("field", "bad");
    let s = format!("{}", e);
    assert!(s.contains("Validation error"));
}
