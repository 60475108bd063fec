//! Inbound frame routing.

use embedded_can::{ExtendedId, Frame};
use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode};
use gantry_io::can::bus::{BusSettings, CanBus, FrameDisposition};
use gantry_io::can::endpoint::{BusEndpoint, EndpointState};
use gantry_io::can::frame::CanFrame;
use gantry_io::can::transport::FrameLog;
use gantry_io::context::IoContext;
use gantry_io::gpio::input::{DebouncedInput, InputState};
use gantry_io::interlock::InterlockRegistry;
use gantry_io::machine::{FaultReason, MachineLatch, MachineRequest, Severity};
use gantry_io::scheduler::{NoPins, TickScheduler};

use super::common::{settings, system, system_with_timeout};

#[test]
fn estop_raises_shutdown_without_any_node() {
    let mut system = system();
    let mut machine = MachineLatch::new();

    let disposition = system.receive_frame(&CanFrame::estop(), 0, &mut machine);
    assert_eq!(disposition, FrameDisposition::EmergencyStop);
    assert_eq!(machine.severity(), Severity::Shutdown);
    assert_eq!(machine.last_fault(), Some(FaultReason::CanEstop));
}

#[test]
fn estop_raises_shutdown_with_timed_out_node() {
    let mut system = system_with_timeout(1);
    let mut machine = MachineLatch::new();
    let node = system.add_node(0).unwrap();
    system.tick(0, &mut NoPins, &mut machine);
    system.tick(1, &mut NoPins, &mut machine);
    assert!(!system.is_safe());

    // Identifier 0 also carries node field 0, but never reaches the node.
    let disposition = system.receive_frame(&CanFrame::estop(), 2, &mut machine);
    assert_eq!(disposition, FrameDisposition::EmergencyStop);
    assert!(machine.requests().contains(MachineRequest::SHUTDOWN));
    assert_eq!(system.bus().node(node).unwrap().heartbeat_counter(), 2);
    assert!(!system.is_safe());
}

#[test]
fn extended_identifier_zero_is_an_estop() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    let node = system.add_node(0).unwrap();

    let frame = <CanFrame as Frame>::new(ExtendedId::ZERO, &[]).unwrap();
    let disposition = system.receive_frame(&frame, 0, &mut machine);
    assert_eq!(disposition, FrameDisposition::EmergencyStop);
    assert_eq!(machine.severity(), Severity::Shutdown);
    assert_eq!(machine.last_fault(), Some(FaultReason::CanEstop));
    assert!(system.bus().node(node).is_some());
}

#[test]
fn remote_input_fires_like_a_local_one() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    let node = system.add_node(5).unwrap();
    let handle = system
        .add_can_input(
            0x25,
            settings(IoMode::ActiveHigh, InputAction::Halt, InputFunction::None),
            None,
        )
        .unwrap();

    let frame = CanFrame::standard(0x25, &[1]).unwrap();
    let disposition = system.receive_frame(&frame, 0, &mut machine);
    assert_eq!(
        disposition,
        FrameDisposition::Claimed {
            node,
            endpoint: Some(handle)
        }
    );
    assert!(system.read_input(0x25));
    assert!(machine.requests().contains(MachineRequest::HALT));
    assert_eq!(
        system.bus().endpoint(handle).unwrap().endpoint().state(),
        EndpointState::Running
    );
}

#[test]
fn frames_without_a_node_are_dropped() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();

    let frame = CanFrame::standard(0x27, &[1]).unwrap();
    assert_eq!(
        system.receive_frame(&frame, 0, &mut machine),
        FrameDisposition::Unclaimed
    );
    assert_eq!(machine.requests(), MachineRequest::empty());
}

#[test]
fn fallback_owner_does_not_change_frame_routing() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    let owner = system.add_node(6).unwrap();
    let handle = system
        .add_can_input(0x40, InputSettings::with_mode(IoMode::ActiveHigh), Some(6))
        .unwrap();
    assert_eq!(system.bus().endpoint(handle).unwrap().endpoint().node(), owner);

    // Node field of 0x40 is 0; no node 0 exists, so the frame is dropped.
    let frame = CanFrame::standard(0x40, &[1]).unwrap();
    assert_eq!(
        system.receive_frame(&frame, 0, &mut machine),
        FrameDisposition::Unclaimed
    );
    assert!(!system.read_input(0x40));
}

#[test]
fn first_registered_endpoint_wins_on_shared_identifier() {
    let mut bus: CanBus<FrameLog<8>> = CanBus::new(FrameLog::new(), BusSettings::default());
    let mut interlocks = InterlockRegistry::new();
    let mut scheduler = TickScheduler::new();
    let mut machine = MachineLatch::new();

    bus.add_node(5, &mut interlocks, &mut scheduler).unwrap();
    let settings = InputSettings::with_mode(IoMode::ActiveHigh);
    let first = bus
        .add_digital_input(0x25, settings, None, &mut interlocks)
        .unwrap();
    let second = bus
        .add_digital_input(0x25, settings, None, &mut interlocks)
        .unwrap();

    let frame = CanFrame::standard(0x25, &[1]).unwrap();
    let mut ctx = IoContext::new(&mut interlocks, &mut machine, 0);
    let disposition = bus.receive(&frame, &mut ctx);
    assert!(matches!(
        disposition,
        FrameDisposition::Claimed {
            endpoint: Some(h),
            ..
        } if h == first
    ));

    let first = bus.endpoint(first).unwrap();
    let second = bus.endpoint(second).unwrap();
    assert_eq!(first.input().state(), InputState::Active);
    assert_eq!(first.endpoint().state(), EndpointState::Running);
    assert_eq!(second.input().state(), InputState::Inactive);
    assert_eq!(second.endpoint().state(), EndpointState::Initializing);
}
