//! CAN endpoint: a sub-device of a node claiming one identifier.

use crate::arena::NodeHandle;
use crate::context::IoContext;
use crate::interlock::InterlockRegistry;

use super::frame::CanFrame;

/// Endpoint lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EndpointState {
    /// Waiting for the first matching frame.
    #[default]
    Initializing,
    Running,
    /// Reserved; never entered.
    Error,
}

/// Addressing and lifecycle shared by every endpoint kind.
#[derive(Debug, Clone)]
pub struct CanEndpoint {
    node: NodeHandle,
    sub_id: u16,
    state: EndpointState,
}

impl CanEndpoint {
    pub const fn new(node: NodeHandle, sub_id: u16) -> Self {
        Self {
            node,
            sub_id,
            state: EndpointState::Initializing,
        }
    }

    #[inline]
    pub const fn node(&self) -> NodeHandle {
        self.node
    }

    /// Full identifier this endpoint claims.
    #[inline]
    pub const fn sub_id(&self) -> u16 {
        self.sub_id
    }

    #[inline]
    pub const fn state(&self) -> EndpointState {
        self.state
    }

    /// Interlock vote.
    #[inline]
    pub const fn is_running(&self) -> bool {
        matches!(self.state, EndpointState::Running)
    }

    /// Full-identifier comparison.
    #[inline]
    pub fn matches(&self, frame: &CanFrame) -> bool {
        frame.raw_id() == u32::from(self.sub_id)
    }

    pub fn mark_running(&mut self) {
        self.state = EndpointState::Running;
    }

    /// Back to `Initializing`.
    pub fn reset(&mut self) {
        self.state = EndpointState::Initializing;
    }
}

/// Capability of anything reachable through the frame dispatcher.
pub trait BusEndpoint {
    fn endpoint(&self) -> &CanEndpoint;
    fn endpoint_mut(&mut self) -> &mut CanEndpoint;

    /// Offer a frame. Returns `true` if claimed.
    fn process_frame(&mut self, frame: &CanFrame, ctx: &mut IoContext<'_>) -> bool;

    /// Return to `Initializing`.
    fn reset(&mut self) {
        self.endpoint_mut().reset();
    }

    /// Drop any interlock entries other than the endpoint's own.
    fn release_interlocks(&self, _interlocks: &mut InterlockRegistry) {}
}

/// Endpoint that only tracks liveness of its identifier.
impl BusEndpoint for CanEndpoint {
    fn endpoint(&self) -> &CanEndpoint {
        self
    }

    fn endpoint_mut(&mut self) -> &mut CanEndpoint {
        self
    }

    fn process_frame(&mut self, frame: &CanFrame, _ctx: &mut IoContext<'_>) -> bool {
        if !self.matches(frame) {
            return false;
        }
        self.mark_running();
        true
    }
}
