//! The shipped replay script against the shipped configuration.

use gantry_common::io::config::IoConfig;
use gantry_io::IoSystem;
use gantry_io::can::transport::FrameLog;
use gantry_io::gpio::input::InputState;
use gantry_io::interlock::InterlockSource;
use gantry_io::machine::{FaultReason, MachineLatch, MachineRequest, Severity};
use gantry_io::replay::{Replay, Script};

const CONFIG: &str = include_str!("../../config/io.toml");
const SCRIPT: &str = include_str!("../../config/replay.toml");

#[test]
fn shipped_script_runs_to_estop() {
    let config = IoConfig::from_toml(CONFIG).unwrap();
    let mut system = IoSystem::from_config(&config, FrameLog::<64>::new()).unwrap();
    let mut machine = MachineLatch::new();
    let script = Script::from_toml(SCRIPT).unwrap();
    let end_ms = script.end_ms();
    let mut replay = Replay::new(script);

    let mut door_was_unsafe = false;
    for now_ms in 0..=end_ms {
        replay.step(&mut system, now_ms, &mut machine);
        system.bus_mut().transport_mut().clear();
        door_was_unsafe |= system.interlocks().value(InterlockSource::Input(3)) == Some(false);
    }
    assert!(replay.is_finished());
    assert!(door_was_unsafe);

    // Limit hit once; the bounce at 103 ms was absorbed.
    assert_eq!(machine.limit_pin(), Some(1));
    assert_eq!(system.input_state(1).unwrap(), InputState::Active);
    assert!(machine.requests().contains(MachineRequest::HOLD));

    // Pendant and tool changer inputs ran; the tool height setter never spoke.
    assert!(system.read_input(0x25));
    assert_eq!(system.input_state(0x40).unwrap(), InputState::Inactive);

    // Node 5 went silent after 80 ms and timed out.
    let pendant = system.bus().find_node(5).unwrap();
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Node(pendant)));
    assert!(!system.interlocks().contains(InterlockSource::Input(3)));
    let changer = system.bus().find_node(6).unwrap();
    assert_eq!(
        system.interlocks().value(InterlockSource::Node(changer)),
        Some(true)
    );

    assert_eq!(machine.severity(), Severity::Shutdown);
    assert_eq!(machine.last_fault(), Some(FaultReason::CanEstop));
}
