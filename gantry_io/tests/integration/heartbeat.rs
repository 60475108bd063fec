//! Node heartbeat supervision through the tick loop.

use gantry_common::consts::CAN_POLL_ID_START;
use gantry_io::can::bus::FrameDisposition;
use gantry_io::can::frame::CanFrame;
use gantry_io::interlock::InterlockSource;
use gantry_io::machine::MachineLatch;
use gantry_io::scheduler::NoPins;

use super::common::{TestSystem, sent_ids, system_with_timeout};

fn tick_n(system: &mut TestSystem, machine: &mut MachineLatch, n: u64) -> u16 {
    (0..n)
        .map(|i| system.tick(i, &mut NoPins, machine).timeouts)
        .sum()
}

#[test]
fn node_vote_withdrawn_only_after_timeout_is_exceeded() {
    let mut system = system_with_timeout(100);
    let mut machine = MachineLatch::new();
    let node = system.add_node(5).unwrap();

    assert_eq!(tick_n(&mut system, &mut machine, 99), 0);
    assert!(system.is_safe());

    tick_n(&mut system, &mut machine, 1);
    assert_eq!(system.bus().node(node).unwrap().heartbeat_counter(), 100);
    assert!(system.is_safe());

    assert_eq!(tick_n(&mut system, &mut machine, 1), 1);
    assert!(!system.is_safe());
    assert_eq!(system.first_unsafe(), Some(InterlockSource::Node(node)));

    // Silence continues until tick 150; the timeout is reported once.
    assert_eq!(tick_n(&mut system, &mut machine, 49), 0);
    assert_eq!(system.bus().node(node).unwrap().heartbeat_counter(), 150);

    let disposition = system.receive_frame(&CanFrame::heartbeat(5), 150, &mut machine);
    assert_eq!(
        disposition,
        FrameDisposition::Claimed {
            node,
            endpoint: None
        }
    );
    assert_eq!(system.bus().node(node).unwrap().heartbeat_counter(), 0);
    assert!(system.is_safe());
}

#[test]
fn timeout_polls_silent_node_once() {
    let mut system = system_with_timeout(3);
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();
    system.add_node(6).unwrap();

    tick_n(&mut system, &mut machine, 2);
    system.receive_frame(&CanFrame::heartbeat(6), 2, &mut machine);
    tick_n(&mut system, &mut machine, 10);

    let poll_5 = CAN_POLL_ID_START + 5;
    let poll_6 = CAN_POLL_ID_START + 6;
    let sent = sent_ids(&system);
    assert_eq!(sent.iter().filter(|&&id| id == poll_5).count(), 1);
    assert_eq!(sent.iter().filter(|&&id| id == poll_6).count(), 1);
    assert_eq!(sent.first(), Some(&poll_5));
}

#[test]
fn any_frame_for_the_node_counts_as_heartbeat() {
    let mut system = system_with_timeout(2);
    let mut machine = MachineLatch::new();
    let node = system.add_node(5).unwrap();

    tick_n(&mut system, &mut machine, 3);
    assert!(!system.is_safe());

    // Data frame for an identifier nobody claims, node field 5.
    let frame = CanFrame::standard(0x75, &[0]).unwrap();
    system.receive_frame(&frame, 3, &mut machine);
    assert!(system.is_safe());
    assert_eq!(system.bus().node(node).unwrap().heartbeat_counter(), 0);
}

#[test]
fn removed_node_no_longer_ticked_or_voting() {
    let mut system = system_with_timeout(1);
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();
    tick_n(&mut system, &mut machine, 2);
    assert!(!system.is_safe());

    system.remove_node(5).unwrap();
    assert!(system.is_safe());
    assert!(system.scheduler().targets().is_empty());
    assert_eq!(tick_n(&mut system, &mut machine, 5), 0);
}
