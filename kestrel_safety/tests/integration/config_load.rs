//! Integration test: configuration loading from disk.

use std::io::Write;

use kestrel_safety::config::{load_config, ConfigError};

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_a_full_config_file() {
    let file = write_config(
        r#"
[machine]
axes = "xyz"
cycle_time_us = 500

[interlock]
timer_max = 6000
reset_time = 1000

[torque]
nominal_frequency = 482.0

[homing]
type = "hard_stop"
jog_speed = 3.0
"#,
    );
    let cfg = load_config(file.path()).unwrap();
    assert_eq!(cfg.machine.axis_count(), 3);
    assert_eq!(cfg.machine.cycle_time_us, 500);
    assert_eq!(cfg.torque.nominal_frequency, 482.0);
    assert_eq!(cfg.homing.jog_speed, 3.0);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_config(std::path::Path::new("/nonexistent/kestrel.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn angle_homing_rejected_from_file() {
    let file = write_config("[homing]\ntype = \"angle\"");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[machine\naxes = ");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
