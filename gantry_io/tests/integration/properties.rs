//! Property tests for mode correction and the lockout window.

use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputFunction, IoMode};
use gantry_io::context::IoContext;
use gantry_io::gpio::input::{DigitalInput, InputEdge, InputState};
use gantry_io::interlock::InterlockRegistry;
use gantry_io::machine::MachineLatch;
use proptest::prelude::*;

fn enabled_mode() -> impl Strategy<Value = IoMode> {
    prop_oneof![Just(IoMode::ActiveLow), Just(IoMode::ActiveHigh)]
}

fn any_mode() -> impl Strategy<Value = IoMode> {
    prop_oneof![
        Just(IoMode::ActiveLow),
        Just(IoMode::ActiveHigh),
        Just(IoMode::Disabled)
    ]
}

struct Bench {
    interlocks: InterlockRegistry,
    machine: MachineLatch,
}

impl Bench {
    fn new() -> Self {
        Self {
            interlocks: InterlockRegistry::new(),
            machine: MachineLatch::new(),
        }
    }

    fn feed(&mut self, input: &mut DigitalInput, raw: bool, now_ms: u64) -> InputEdge {
        let mut ctx = IoContext::new(&mut self.interlocks, &mut self.machine, now_ms);
        input.update(raw, &mut ctx)
    }
}

proptest! {
    #[test]
    fn committed_state_is_corrected_level(mode in enabled_mode(), raw in any::<bool>()) {
        let mut bench = Bench::new();
        let mut input = DigitalInput::new(1, InputSettings::with_mode(mode));
        bench.feed(&mut input, raw, 0);
        let active = raw ^ (mode != IoMode::ActiveHigh);
        prop_assert_eq!(input.state(), InputState::from_active(active));
    }

    #[test]
    fn disabled_always_disabled(samples in prop::collection::vec((any::<bool>(), 0u64..1000), 1..32)) {
        let mut bench = Bench::new();
        let mut input = DigitalInput::new(1, InputSettings::with_mode(IoMode::Disabled));
        for (raw, now_ms) in samples {
            prop_assert_eq!(bench.feed(&mut input, raw, now_ms), InputEdge::None);
            prop_assert_eq!(input.state(), InputState::Disabled);
        }
    }

    #[test]
    fn samples_inside_lockout_never_change_state(
        mode in enabled_mode(),
        lockout_ms in 1u16..500,
        delay in 0u64..1000,
    ) {
        let mut bench = Bench::new();
        let mut settings = InputSettings::with_mode(mode);
        settings.lockout_ms = lockout_ms;
        let mut input = DigitalInput::new(1, settings);

        // First sample always commits Active.
        let closed = mode == IoMode::ActiveHigh;
        prop_assert_eq!(bench.feed(&mut input, closed, 0), InputEdge::Leading);

        let edge = bench.feed(&mut input, !closed, delay);
        if delay < u64::from(lockout_ms) {
            prop_assert_eq!(edge, InputEdge::None);
            prop_assert_eq!(input.state(), InputState::Active);
        } else {
            prop_assert_eq!(edge, InputEdge::Trailing);
            prop_assert_eq!(input.state(), InputState::Inactive);
        }
    }

    #[test]
    fn repeated_samples_are_no_ops(mode in enabled_mode(), raw in any::<bool>(), repeats in 1usize..20) {
        let mut bench = Bench::new();
        let mut input = DigitalInput::new(1, InputSettings::with_mode(mode));
        bench.feed(&mut input, raw, 0);
        let state = input.state();
        for i in 0..repeats {
            let now_ms = 100 * (i as u64 + 1);
            prop_assert_eq!(bench.feed(&mut input, raw, now_ms), InputEdge::None);
            prop_assert_eq!(input.state(), state);
        }
    }

    #[test]
    fn interlock_present_iff_engaged(
        mode in any_mode(),
        samples in prop::collection::vec(any::<bool>(), 1..32),
    ) {
        let mut bench = Bench::new();
        let mut settings = InputSettings::with_mode(mode);
        settings.function = InputFunction::Interlock;
        let mut input = DigitalInput::new(1, settings);

        for (i, raw) in samples.into_iter().enumerate() {
            bench.feed(&mut input, raw, 20 * i as u64);
            prop_assert_eq!(
                bench.interlocks.contains(input.interlock_source()),
                input.state() == InputState::Active
            );
            prop_assert_eq!(bench.interlocks.is_safe(), input.state() != InputState::Active);
        }
    }
}
