//! Remote digital input: a CAN endpoint feeding the input state machine.
//!
//! Byte 0 of every data frame on the input's identifier is the raw level.
//! Remote requests and empty frames only mark the endpoint running. The
//! identifier doubles as the input's external pin number, so remote and
//! local inputs share one pin namespace.

use gantry_common::io::config::InputSettings;

use super::endpoint::{BusEndpoint, CanEndpoint};
use super::frame::CanFrame;
use crate::arena::NodeHandle;
use crate::context::IoContext;
use crate::gpio::input::{DebouncedInput, DigitalInput};
use crate::interlock::InterlockRegistry;

#[derive(Debug, Clone)]
pub struct CanDigitalInput {
    endpoint: CanEndpoint,
    input: DigitalInput,
}

impl CanDigitalInput {
    /// Input on identifier `can_id`, owned by `node`.
    pub fn new(node: NodeHandle, can_id: u16, settings: InputSettings) -> Self {
        Self {
            endpoint: CanEndpoint::new(node, can_id),
            input: DigitalInput::new(can_id, settings),
        }
    }

    /// External pin number (the CAN identifier).
    #[inline]
    pub const fn pin(&self) -> u16 {
        self.input.pin()
    }
}

impl BusEndpoint for CanDigitalInput {
    fn endpoint(&self) -> &CanEndpoint {
        &self.endpoint
    }

    fn endpoint_mut(&mut self) -> &mut CanEndpoint {
        &mut self.endpoint
    }

    fn process_frame(&mut self, frame: &CanFrame, ctx: &mut IoContext<'_>) -> bool {
        if !self.endpoint.matches(frame) {
            return false;
        }
        let level = if frame.is_remote() { None } else { frame.bytes().first() };
        if let Some(&raw) = level {
            self.input.update(raw != 0, ctx);
        }
        self.endpoint.mark_running();
        true
    }

    /// Resets both the endpoint lifecycle and the input.
    fn reset(&mut self) {
        self.endpoint.reset();
        self.input.reset();
    }

    fn release_interlocks(&self, interlocks: &mut InterlockRegistry) {
        interlocks.release(self.input.interlock_source());
    }
}

impl DebouncedInput for CanDigitalInput {
    fn input(&self) -> &DigitalInput {
        &self.input
    }

    fn input_mut(&mut self) -> &mut DigitalInput {
        &mut self.input
    }
}
