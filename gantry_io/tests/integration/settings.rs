//! Settings writes by external pin number.

use gantry_common::consts::CAN_POLL_ID_START;
use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode};
use gantry_io::IoError;
use gantry_io::can::frame::CanFrame;
use gantry_io::gpio::input::InputState;
use gantry_io::gpio::settings::InputSetting;
use gantry_io::machine::MachineLatch;

use super::common::{sent_ids, system};

#[test]
fn every_setting_is_range_checked() {
    let mut system = system();
    let machine = MachineLatch::new();
    system.add_input(1, InputSettings::default(), false).unwrap();

    let cases = [
        (InputSetting::Mode, 3),
        (InputSetting::Action, 9),
        (InputSetting::Function, 6),
        (InputSetting::Lockout, 65_536),
        (InputSetting::Lockout, -1),
    ];
    for (setting, raw) in cases {
        let err = system
            .write_input_setting(1, setting, raw, &machine)
            .unwrap_err();
        let (min, max) = setting.range();
        assert_eq!(
            err,
            IoError::ValueRange {
                setting,
                value: raw,
                min,
                max
            }
        );
    }
    assert_eq!(system.input(1).unwrap().settings(), &InputSettings::default());
}

#[test]
fn settings_round_trip_by_name() {
    let mut system = system();
    let machine = MachineLatch::new();
    system.add_input(1, InputSettings::default(), false).unwrap();

    for (name, raw) in [("mode", 1), ("action", 5), ("function", 2), ("lockout", 65_535)] {
        let setting: InputSetting = name.parse().unwrap();
        system.write_input_setting(1, setting, raw, &machine).unwrap();
        assert_eq!(system.read_input_setting(1, setting).unwrap(), raw);
    }

    let input = system.input(1).unwrap();
    assert_eq!(input.mode(), IoMode::ActiveHigh);
    assert_eq!(input.action(), InputAction::Alarm);
    assert_eq!(input.function(), InputFunction::Interlock);
    assert_eq!(input.lockout_ms(), u16::MAX);
}

#[test]
fn enabling_a_disabled_input_takes_effect_on_next_sample() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_input(1, InputSettings::default(), false).unwrap();
    assert_eq!(system.input_state(1).unwrap(), InputState::Disabled);

    system
        .write_input_setting(1, InputSetting::Mode, 1, &machine)
        .unwrap();
    system.on_pin_change(1, true, 0, &mut machine).unwrap();
    assert_eq!(system.input_state(1).unwrap(), InputState::Active);
}

#[test]
fn write_on_remote_input_repolls_its_node() {
    let mut system = system();
    let mut machine = MachineLatch::new();
    system.add_node(5).unwrap();
    system
        .add_can_input(0x25, InputSettings::with_mode(IoMode::ActiveHigh), None)
        .unwrap();
    system.receive_frame(&CanFrame::standard(0x25, &[1]).unwrap(), 0, &mut machine);
    assert!(system.is_safe());

    system
        .write_input_setting(0x25, InputSetting::Action, 1, &machine)
        .unwrap();
    assert_eq!(sent_ids(&system), [CAN_POLL_ID_START + 5]);
    assert!(!system.is_safe());
}

#[test]
fn write_during_initialization_skips_reset() {
    let mut system = system();
    let machine = MachineLatch::initializing();
    system.add_node(5).unwrap();
    system
        .add_can_input(0x25, InputSettings::with_mode(IoMode::ActiveHigh), None)
        .unwrap();

    system
        .write_input_setting(0x25, InputSetting::Lockout, 20, &machine)
        .unwrap();
    assert!(sent_ids(&system).is_empty());
    assert_eq!(system.read_input_setting(0x25, InputSetting::Lockout).unwrap(), 20);
}

#[test]
fn unknown_pin_rejected() {
    let mut system = system();
    let machine = MachineLatch::new();
    assert_eq!(
        system
            .write_input_setting(12, InputSetting::Mode, 0, &machine)
            .unwrap_err(),
        IoError::UnknownPin { pin: 12 }
    );
    assert_eq!(
        system.read_input_setting(12, InputSetting::Mode).unwrap_err(),
        IoError::UnknownPin { pin: 12 }
    );
}
