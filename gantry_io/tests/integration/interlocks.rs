//! The safety aggregate across local inputs, nodes and endpoints.

use embedded_can::{Frame, StandardId};
use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode};
use gantry_io::can::frame::CanFrame;
use gantry_io::interlock::InterlockSource;
use gantry_io::machine::MachineLatch;
use gantry_io::scheduler::NoPins;

use super::common::{settings, system, system_with_timeout};

fn interlock_input() -> InputSettings {
    settings(IoMode::ActiveHigh, InputAction::None, InputFunction::Interlock)
}

#[test]
fn empty_system_is_safe() {
    let system = system();
    assert!(system.is_safe());
    assert_eq!(system.first_unsafe(), None);
    assert!(system.interlocks().is_empty());
}

#[test]
fn door_interlock_engages_and_releases() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_input(3, interlock_input(), false).unwrap();
    assert!(system.interlocks().is_empty());

    system.on_pin_change(3, true, 0, &mut machine).unwrap();
    assert!(!system.is_safe());
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Input(3)));
    assert_eq!(system.interlocks().len(), 1);

    system.on_pin_change(3, false, 10, &mut machine).unwrap();
    assert!(system.is_safe());
    assert!(system.interlocks().is_empty());
}

#[test]
fn reset_keeps_an_engaged_interlock() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_input(3, interlock_input(), false).unwrap();
    system.on_pin_change(3, true, 0, &mut machine).unwrap();

    system.reset_inputs();
    assert!(!system.is_safe());
    assert!(system.read_input(3));
}

#[test]
fn remote_interlock_holds_through_frames_without_data() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();
    system.add_can_input(0x25, interlock_input(), None).unwrap();

    system.receive_frame(&CanFrame::standard(0x25, &[1]).unwrap(), 0, &mut machine);
    assert_eq!(
        system.interlocks().value(InterlockSource::Input(0x25)),
        Some(false)
    );

    let remote = <CanFrame as Frame>::new_remote(StandardId::new(0x25).unwrap(), 0).unwrap();
    system.receive_frame(&remote, 50, &mut machine);
    system.receive_frame(&CanFrame::standard(0x25, &[]).unwrap(), 60, &mut machine);

    assert!(!system.is_safe());
    assert!(system.read_input(0x25));
    assert_eq!(
        system.interlocks().value(InterlockSource::Input(0x25)),
        Some(false)
    );

    system.receive_frame(&CanFrame::standard(0x25, &[0]).unwrap(), 70, &mut machine);
    assert!(!system.interlocks().contains(InterlockSource::Input(0x25)));
}

#[test]
fn endpoint_votes_unsafe_until_first_frame() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();
    let endpoint = system
        .add_can_input(0x25, InputSettings::with_mode(IoMode::ActiveHigh), None)
        .unwrap();
    assert!(!system.is_safe());
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Endpoint(endpoint)));

    let frame = CanFrame::standard(0x25, &[0]).unwrap();
    system.receive_frame(&frame, 0, &mut machine);
    assert!(system.is_safe());

    // Reset sends the endpoint back to initializing.
    system.reset_inputs();
    assert!(!system.is_safe());
}

#[test]
fn every_source_must_vote_safe() {
    let mut system = system_with_timeout(10);
    let mut machine = MachineLatch::new();
    let node = system.add_node(5).unwrap();
    system.add_can_input(0x25, interlock_input(), None).unwrap();
    system.add_input(3, interlock_input(), false).unwrap();

    // Remote interlock closes: the endpoint runs, and its input engages.
    let closed = CanFrame::standard(0x25, &[1]).unwrap();
    system.receive_frame(&closed, 0, &mut machine);
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Input(0x25)));

    let open = CanFrame::standard(0x25, &[0]).unwrap();
    system.receive_frame(&open, 10, &mut machine);
    assert!(system.is_safe());

    // Node falls silent.
    for t in 0..11 {
        system.tick(10 + t, &mut NoPins, &mut machine);
    }
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Node(node)));

    // Local door opens while the node is still silent.
    system.on_pin_change(3, true, 30, &mut machine).unwrap();
    let unsafe_sources: Vec<InterlockSource> = system
        .interlocks()
        .iter()
        .filter(|(_, safe)| !safe)
        .map(|(source, _)| source)
        .collect();
    assert_eq!(
        unsafe_sources,
        [InterlockSource::Node(node), InterlockSource::Input(3)]
    );

    system.receive_frame(&CanFrame::heartbeat(5), 31, &mut machine);
    system.on_pin_change(3, false, 40, &mut machine).unwrap();
    assert!(system.is_safe());
}
