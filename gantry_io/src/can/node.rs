//! CAN node: heartbeat supervision and endpoint membership.

use gantry_common::consts::MAX_ENDPOINTS_PER_NODE;
use gantry_common::io::config::NodeIdMask;

use super::frame::CanFrame;
use crate::arena::EndpointHandle;
use crate::registry::{Registry, RegistryError};

/// Result of one heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatEvent {
    None,
    /// The counter just exceeded the timeout.
    TimedOut,
}

/// A remote device on the bus.
///
/// The heartbeat counter grows by one per tick and drops to zero on every
/// frame addressed to the node. The node votes safe while the counter is
/// at most the timeout.
#[derive(Debug, Clone)]
pub struct CanNode {
    node_id: u8,
    heartbeat: u32,
    timeout: u32,
    timed_out: bool,
    endpoints: Registry<EndpointHandle, MAX_ENDPOINTS_PER_NODE>,
}

impl CanNode {
    pub const fn new(node_id: u8, timeout: u32) -> Self {
        Self {
            node_id,
            heartbeat: 0,
            timeout,
            timed_out: false,
            endpoints: Registry::new(),
        }
    }

    #[inline]
    pub const fn node_id(&self) -> u8 {
        self.node_id
    }

    #[inline]
    pub const fn heartbeat_counter(&self) -> u32 {
        self.heartbeat
    }

    #[inline]
    pub const fn timeout(&self) -> u32 {
        self.timeout
    }

    /// Interlock vote: heartbeat not yet timed out.
    #[inline]
    pub const fn heartbeat_ok(&self) -> bool {
        self.heartbeat <= self.timeout
    }

    /// Whether `frame` carries this node's id in its node field.
    #[inline]
    pub const fn matches(&self, frame: &CanFrame, mask: NodeIdMask) -> bool {
        frame.masked_node(mask) == self.node_id as u32
    }

    /// Poll request for this node.
    #[inline]
    pub const fn poll_frame(&self) -> CanFrame {
        CanFrame::poll(self.node_id)
    }

    /// Advance the heartbeat counter by one tick.
    pub fn tick(&mut self) -> HeartbeatEvent {
        self.heartbeat = self.heartbeat.saturating_add(1);
        if !self.timed_out && !self.heartbeat_ok() {
            self.timed_out = true;
            return HeartbeatEvent::TimedOut;
        }
        HeartbeatEvent::None
    }

    /// A frame for this node arrived. Returns `true` if it ends a timeout.
    pub fn on_frame(&mut self) -> bool {
        self.heartbeat = 0;
        core::mem::replace(&mut self.timed_out, false)
    }

    // ─── Endpoints ──────────────────────────────────────────────────

    /// Endpoints in registration order.
    #[inline]
    pub fn endpoints(&self) -> &Registry<EndpointHandle, MAX_ENDPOINTS_PER_NODE> {
        &self.endpoints
    }

    pub fn attach(&mut self, endpoint: EndpointHandle) -> Result<(), RegistryError> {
        self.endpoints.add(endpoint)
    }

    pub fn detach(&mut self, endpoint: EndpointHandle) -> bool {
        self.endpoints.remove(endpoint).is_some()
    }
}
