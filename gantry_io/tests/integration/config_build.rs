//! Building a system from `io.toml`.

use gantry_common::config::{ConfigError, load_validated};
use gantry_common::io::config::IoConfig;
use gantry_common::io::mode::InputFunction;
use gantry_io::IoError;
use gantry_io::IoSystem;
use gantry_io::can::endpoint::BusEndpoint;
use gantry_io::can::transport::FrameLog;
use gantry_io::gpio::input::InputState;
use gantry_io::interlock::InterlockSource;
use gantry_io::scheduler::TickTarget;
use std::time::Duration;
use tempfile::TempDir;

const SAMPLE: &str = include_str!("../../config/io.toml");

fn build(toml: &str) -> Result<IoSystem<FrameLog<16>>, IoError> {
    let config = IoConfig::from_toml(toml).unwrap();
    IoSystem::from_config(&config, FrameLog::new())
}

#[test]
fn sample_config_builds() {
    let system = build(SAMPLE).unwrap();

    assert_eq!(system.bank().len(), 6);
    assert_eq!(system.bus().node_count(), 2);
    assert_eq!(system.bus().endpoint_count(), 3);
    assert_eq!(system.tick_period(), Duration::from_millis(1));

    // Two nodes and the polled door switch.
    assert_eq!(system.scheduler().targets().len(), 3);
    let door = system.bank().find(3).unwrap();
    assert!(system.scheduler().contains(TickTarget::PolledInput(door)));

    assert_eq!(system.input_state(1).unwrap(), InputState::Inactive);
    assert_eq!(system.input_state(6).unwrap(), InputState::Disabled);
    assert_eq!(system.probing_input(), Some(4));
    assert_eq!(
        system.input(0x40).unwrap().function(),
        InputFunction::ToolHeightSetter
    );
}

#[test]
fn sample_config_loads_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("io.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let config = load_validated::<IoConfig>(&path).unwrap();
    let system = IoSystem::from_config(&config, FrameLog::<16>::new()).unwrap();
    assert_eq!(system.bank().len(), config.inputs.len());
    assert_eq!(system.bus().endpoint_count(), config.can.inputs.len());
}

#[test]
fn sample_config_owners_and_votes() {
    let system = build(SAMPLE).unwrap();
    let pendant = system.bus().find_node(5).unwrap();
    let changer = system.bus().find_node(6).unwrap();

    let owner = |pin: u16| {
        let handle = system.bus().find_input(pin).unwrap();
        system.bus().endpoint(handle).unwrap().endpoint().node()
    };
    assert_eq!(owner(0x25), pendant);
    assert_eq!(owner(0x26), changer);
    assert_eq!(owner(0x40), changer);

    // Nodes vote safe, endpoints wait for their first frame.
    assert_eq!(system.interlocks().len(), 5);
    assert!(matches!(
        system.first_unsafe(),
        Some(InterlockSource::Endpoint(_))
    ));
}

#[test]
fn invalid_config_is_rejected_before_building() {
    let toml = r#"
[shared]
service_name = "gantry-io"

[[inputs]]
pin = 1
mode = "active_low"

[[inputs]]
pin = 1
mode = "active_high"
"#;
    let err = build(toml).unwrap_err();
    assert!(matches!(
        err,
        IoError::Config(ConfigError::ValidationError(_))
    ));
}

#[test]
fn missing_owner_is_rejected() {
    let toml = r#"
[shared]
service_name = "gantry-io"

[[can.nodes]]
id = 5

[[can.inputs]]
can_id = 0x36
mode = "active_high"
"#;
    assert!(matches!(
        build(toml).unwrap_err(),
        IoError::Config(ConfigError::ValidationError(_))
    ));
}
