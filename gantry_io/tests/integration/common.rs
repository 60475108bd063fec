//! Shared fixtures.

use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode};
use gantry_io::IoSystem;
use gantry_io::can::bus::BusSettings;
use gantry_io::can::transport::FrameLog;

pub type TestSystem = IoSystem<FrameLog<64>>;

pub fn system() -> TestSystem {
    IoSystem::new(FrameLog::new(), BusSettings::default())
}

pub fn system_with_timeout(heartbeat_timeout: u32) -> TestSystem {
    IoSystem::new(
        FrameLog::new(),
        BusSettings {
            heartbeat_timeout,
            ..BusSettings::default()
        },
    )
}

pub fn settings(mode: IoMode, action: InputAction, function: InputFunction) -> InputSettings {
    InputSettings {
        mode,
        action,
        function,
        lockout_ms: 10,
    }
}

/// Identifiers of every frame the system has sent so far.
pub fn sent_ids(system: &TestSystem) -> Vec<u32> {
    system
        .bus()
        .transport()
        .sent()
        .iter()
        .map(|f| f.raw_id())
        .collect()
}
