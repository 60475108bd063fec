//! Digital input state machine.
//!
//! # Update algorithm
//!
//! Given a raw level sampled at `now`:
//!
//! 1. `Disabled` mode forces state `Disabled` and stops.
//! 2. While the lockout window is running the sample is ignored.
//! 3. The level is corrected for polarity: `raw ^ (mode != active_high)`.
//! 4. An unchanged corrected state is a no-op.
//! 5. Otherwise the transition is committed: lockout armed, state and
//!    edge recorded.
//! 6. The edge is dispatched (homing, then probing, then action and
//!    function) and a timed status report is requested.

use gantry_common::io::config::InputSettings;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode};
use tracing::{error, trace};

use crate::context::IoContext;
use crate::interlock::InterlockSource;
use crate::machine::{FaultReason, StatusReportRequest};
use crate::timer::Timeout;

/// Conditioned state of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputState {
    Disabled,
    Inactive,
    Active,
}

impl InputState {
    #[inline]
    pub const fn from_active(active: bool) -> Self {
        if active { Self::Active } else { Self::Inactive }
    }

    #[inline]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Direction of the transition committed by the most recent update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputEdge {
    #[default]
    None,
    /// Transition into `Active`.
    Leading,
    /// Transition out of `Active`.
    Trailing,
}

/// One digital input, identified by its 1-based external pin number.
#[derive(Debug, Clone)]
pub struct DigitalInput {
    pin: u16,
    settings: InputSettings,
    state: InputState,
    edge: InputEdge,
    homing_mode: bool,
    probing_mode: bool,
    lockout: Timeout,
}

impl DigitalInput {
    pub fn new(pin: u16, settings: InputSettings) -> Self {
        let state = if settings.mode == IoMode::Disabled {
            InputState::Disabled
        } else {
            InputState::Inactive
        };
        Self {
            pin,
            settings,
            state,
            edge: InputEdge::None,
            homing_mode: false,
            probing_mode: false,
            lockout: Timeout::new(),
        }
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub const fn pin(&self) -> u16 {
        self.pin
    }

    #[inline]
    pub const fn settings(&self) -> &InputSettings {
        &self.settings
    }

    #[inline]
    pub const fn mode(&self) -> IoMode {
        self.settings.mode
    }

    #[inline]
    pub const fn action(&self) -> InputAction {
        self.settings.action
    }

    #[inline]
    pub const fn function(&self) -> InputFunction {
        self.settings.function
    }

    #[inline]
    pub const fn lockout_ms(&self) -> u16 {
        self.settings.lockout_ms
    }

    #[inline]
    pub const fn state(&self) -> InputState {
        self.state
    }

    #[inline]
    pub const fn edge(&self) -> InputEdge {
        self.edge
    }

    #[inline]
    pub const fn is_homing(&self) -> bool {
        self.homing_mode
    }

    #[inline]
    pub const fn is_probing(&self) -> bool {
        self.probing_mode
    }

    /// Whether a lockout window is running at `now_ms`.
    #[inline]
    pub fn in_lockout(&self, now_ms: u64) -> bool {
        self.lockout.is_running(now_ms)
    }

    /// Interlock entry key used while function `Interlock` is engaged.
    #[inline]
    pub const fn interlock_source(&self) -> InterlockSource {
        InterlockSource::Input(self.pin)
    }

    // ─── Configuration ──────────────────────────────────────────────

    /// Mode changes take effect on the next sample.
    pub fn set_mode(&mut self, mode: IoMode) {
        self.settings.mode = mode;
    }

    pub fn set_action(&mut self, action: InputAction) {
        self.settings.action = action;
    }

    pub fn set_function(&mut self, function: InputFunction) {
        self.settings.function = function;
    }

    pub fn set_lockout_ms(&mut self, lockout_ms: u16) {
        self.settings.lockout_ms = lockout_ms;
    }

    pub fn set_homing_mode(&mut self, homing: bool) {
        self.homing_mode = homing;
    }

    pub fn set_probing_mode(&mut self, probing: bool) {
        self.probing_mode = probing;
    }

    // ─── State Machine ──────────────────────────────────────────────

    /// Disabled inputs are forced to `Disabled`; enabled inputs have their
    /// lockout disarmed so the next sample is evaluated.
    pub fn reset(&mut self) {
        if self.settings.mode == IoMode::Disabled {
            self.state = InputState::Disabled;
            return;
        }
        self.lockout.clear();
    }

    /// Feed one raw level sample. Returns the committed edge, if any.
    pub fn update(&mut self, raw: bool, ctx: &mut IoContext<'_>) -> InputEdge {
        self.edge = InputEdge::None;

        if self.settings.mode == IoMode::Disabled {
            self.state = InputState::Disabled;
            return InputEdge::None;
        }

        if self.lockout.is_running(ctx.now_ms) {
            trace!(pin = self.pin, raw, "sample ignored during lockout");
            return InputEdge::None;
        }

        let corrected = InputState::from_active(raw ^ self.settings.mode.polarity_mask());
        if corrected == self.state {
            return InputEdge::None;
        }

        self.lockout
            .set(ctx.now_ms, u64::from(self.settings.lockout_ms));
        self.state = corrected;
        self.edge = if corrected.is_active() {
            InputEdge::Leading
        } else {
            InputEdge::Trailing
        };
        trace!(pin = self.pin, edge = ?self.edge, "input transition");

        self.dispatch(ctx);
        ctx.machine.request_status_report(StatusReportRequest::Timed);
        self.edge
    }

    fn dispatch(&self, ctx: &mut IoContext<'_>) {
        if self.homing_mode {
            if self.edge == InputEdge::Leading {
                ctx.machine.take_encoder_snapshot();
                ctx.machine.request_hold();
            }
            return;
        }

        if self.probing_mode {
            ctx.machine.take_encoder_snapshot();
            ctx.machine.request_hold();
            return;
        }

        match self.edge {
            InputEdge::Leading => {
                self.dispatch_action(ctx);
                self.dispatch_function(ctx);
            }
            InputEdge::Trailing => {
                if self.settings.function == InputFunction::Interlock {
                    ctx.interlocks.release(self.interlock_source());
                }
            }
            InputEdge::None => {}
        }
    }

    fn dispatch_action(&self, ctx: &mut IoContext<'_>) {
        let reason = FaultReason::Input(self.pin);
        match self.settings.action {
            InputAction::None | InputAction::CycleStart => {}
            InputAction::Stop | InputAction::FastStop => ctx.machine.request_hold(),
            InputAction::Halt => ctx.machine.halt_all(),
            InputAction::Alarm => ctx.machine.raise_alarm(reason),
            InputAction::Shutdown => ctx.machine.raise_shutdown(reason),
            InputAction::Panic => ctx.machine.raise_panic(reason),
            InputAction::Reset => ctx.machine.hard_reset(),
        }
    }

    fn dispatch_function(&self, ctx: &mut IoContext<'_>) {
        match self.settings.function {
            InputFunction::Limit => ctx.machine.record_limit(self.pin),
            InputFunction::Shutdown => ctx.machine.record_shutdown_input(self.pin),
            InputFunction::Interlock => {
                if let Err(e) = ctx.interlocks.engage(self.interlock_source()) {
                    // Cannot block motion through the registry: stop it directly.
                    error!(pin = self.pin, "interlock not recorded: {e}");
                    ctx.machine.halt_all();
                }
            }
            InputFunction::None | InputFunction::Probe | InputFunction::ToolHeightSetter => {}
        }
    }
}

/// Capability of anything that owns a [`DigitalInput`].
pub trait DebouncedInput {
    fn input(&self) -> &DigitalInput;
    fn input_mut(&mut self) -> &mut DigitalInput;

    /// Feed one raw sample through the state machine.
    fn sample(&mut self, raw: bool, ctx: &mut IoContext<'_>) -> InputEdge {
        self.input_mut().update(raw, ctx)
    }
}

impl DebouncedInput for DigitalInput {
    #[inline]
    fn input(&self) -> &DigitalInput {
        self
    }

    #[inline]
    fn input_mut(&mut self) -> &mut DigitalInput {
        self
    }
}
