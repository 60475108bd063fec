//! Frame dispatcher and node/endpoint lifecycle.
//!
//! Inbound frames are routed first-match: the first registered node whose
//! id equals the frame's node field takes the frame, resets its heartbeat
//! and offers it to its endpoints in registration order. Identifier 0 is
//! the bus-wide Estop and never reaches a node.
//!
//! Every node and endpoint keeps one permanent interlock entry. The bus
//! updates those entries whenever a node times out or recovers and
//! whenever an endpoint changes lifecycle state.

use gantry_common::consts::{CAN_PHYSICAL_NODE_MAX, MAX_CAN_ENDPOINTS, MAX_CAN_NODES};
use gantry_common::io::config::{InputSettings, NodeIdMask};
use tracing::{debug, info, trace, warn};

use super::digital_input::CanDigitalInput;
use super::endpoint::{BusEndpoint, CanEndpoint};
use super::frame::CanFrame;
use super::node::{CanNode, HeartbeatEvent};
use super::transport::CanTransport;
use crate::arena::{Arena, EndpointHandle, NodeHandle};
use crate::context::IoContext;
use crate::error::IoError;
use crate::gpio::input::DebouncedInput;
use crate::interlock::{InterlockRegistry, InterlockSource};
use crate::machine::FaultReason;
use crate::registry::Registry;
use crate::scheduler::{TickScheduler, TickTarget};

/// Bus-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusSettings {
    pub node_id_mask: NodeIdMask,
    /// Ticks without a frame before a node votes unsafe.
    pub heartbeat_timeout: u32,
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            node_id_mask: NodeIdMask::Field,
            heartbeat_timeout: gantry_common::consts::DEFAULT_HEARTBEAT_TIMEOUT_TICKS,
        }
    }
}

/// What happened to an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// Identifier 0: shutdown raised.
    EmergencyStop,
    /// A node took the frame; `endpoint` is the endpoint that claimed it, if any.
    Claimed {
        node: NodeHandle,
        endpoint: Option<EndpointHandle>,
    },
    /// No node matched; dropped.
    Unclaimed,
}

/// CAN bus with its nodes and endpoints.
#[derive(Debug)]
pub struct CanBus<T: CanTransport, E: BusEndpoint = CanDigitalInput> {
    transport: T,
    settings: BusSettings,
    nodes: Arena<CanNode, NodeHandle, MAX_CAN_NODES>,
    node_order: Registry<NodeHandle, MAX_CAN_NODES>,
    endpoints: Arena<E, EndpointHandle, MAX_CAN_ENDPOINTS>,
}

impl<T: CanTransport, E: BusEndpoint> CanBus<T, E> {
    pub fn new(transport: T, settings: BusSettings) -> Self {
        if settings.node_id_mask == NodeIdMask::Legacy {
            warn!(
                mask = settings.node_id_mask.bits(),
                "legacy node id mask selected; standard identifiers resolve to node 0"
            );
        }
        Self {
            transport,
            settings,
            nodes: Arena::new(),
            node_order: Registry::new(),
            endpoints: Arena::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &BusSettings {
        &self.settings
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ─── Nodes ──────────────────────────────────────────────────────

    /// Register node `node_id` into the node list, the interlock registry
    /// (voting safe) and the tick scheduler.
    pub fn add_node(
        &mut self,
        node_id: u8,
        interlocks: &mut InterlockRegistry,
        scheduler: &mut TickScheduler,
    ) -> Result<NodeHandle, IoError> {
        if u32::from(node_id) >= CAN_PHYSICAL_NODE_MAX {
            return Err(IoError::NodeIdRange {
                node_id,
                max: CAN_PHYSICAL_NODE_MAX,
            });
        }
        if self.find_node(node_id).is_some() {
            return Err(IoError::DuplicateNode { node_id });
        }

        let handle = self
            .nodes
            .insert(CanNode::new(node_id, self.settings.heartbeat_timeout))?;
        if let Err(e) = self.node_order.add(handle) {
            self.nodes.remove(handle);
            return Err(e.into());
        }
        if let Err(e) = interlocks.register(InterlockSource::Node(handle), true) {
            self.node_order.remove(handle);
            self.nodes.remove(handle);
            return Err(e.into());
        }
        if let Err(e) = scheduler.register(TickTarget::CanNode(handle)) {
            interlocks.release(InterlockSource::Node(handle));
            self.node_order.remove(handle);
            self.nodes.remove(handle);
            return Err(e.into());
        }

        info!(node_id, "CAN node registered");
        Ok(handle)
    }

    /// Deregister a node and every endpoint attached to it.
    pub fn remove_node(
        &mut self,
        handle: NodeHandle,
        interlocks: &mut InterlockRegistry,
        scheduler: &mut TickScheduler,
    ) -> Result<CanNode, IoError> {
        let node = self.nodes.remove(handle).ok_or(IoError::StaleHandle)?;
        self.node_order.remove(handle);
        interlocks.release(InterlockSource::Node(handle));
        scheduler.deregister(TickTarget::CanNode(handle));

        for endpoint in node.endpoints().keys() {
            if let Some(ep) = self.endpoints.remove(endpoint) {
                interlocks.release(InterlockSource::Endpoint(endpoint));
                ep.release_interlocks(interlocks);
                debug!(sub_id = ep.endpoint().sub_id(), "endpoint removed with its node");
            }
        }

        info!(node_id = node.node_id(), "CAN node removed");
        Ok(node)
    }

    /// First registered node with `node_id`.
    pub fn find_node(&self, node_id: u8) -> Option<NodeHandle> {
        self.node_order.find_first_match(|h, _| {
            self.nodes.get(*h).is_some_and(|n| n.node_id() == node_id)
        })
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&CanNode> {
        self.nodes.get(handle)
    }

    /// Nodes in registration order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeHandle, &CanNode)> {
        self.node_order
            .keys()
            .filter_map(|h| self.nodes.get(h).map(|n| (h, n)))
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.node_order.len()
    }

    /// Node that owns identifier `can_id` under the configured mask.
    pub fn resolve_owner(&self, can_id: u16) -> Option<NodeHandle> {
        let masked = u32::from(can_id) & self.settings.node_id_mask.bits();
        self.node_order.find_first_match(|h, _| {
            self.nodes
                .get(*h)
                .is_some_and(|n| u32::from(n.node_id()) == masked)
        })
    }

    // ─── Endpoints ──────────────────────────────────────────────────

    /// Construct and register an endpoint on identifier `can_id`.
    ///
    /// The owner is resolved before anything is allocated: the node whose
    /// id equals the masked identifier, else `fallback`. The endpoint is
    /// then stored, attached to its owner and given an interlock entry
    /// voting unsafe until it is `Running`.
    pub fn add_endpoint<F>(
        &mut self,
        can_id: u16,
        fallback: Option<NodeHandle>,
        interlocks: &mut InterlockRegistry,
        build: F,
    ) -> Result<EndpointHandle, IoError>
    where
        F: FnOnce(NodeHandle) -> E,
    {
        let owner = match self.resolve_owner(can_id) {
            Some(owner) => owner,
            None => {
                let fallback = fallback.ok_or(IoError::NoOwningNode { can_id })?;
                if !self.nodes.contains(fallback) {
                    return Err(IoError::StaleHandle);
                }
                warn!(can_id, "no node matches identifier; attaching to fallback node");
                fallback
            }
        };

        let handle = self.endpoints.insert(build(owner))?;
        let attached = match self.nodes.get_mut(owner) {
            Some(node) => node.attach(handle).map_err(IoError::from),
            None => Err(IoError::StaleHandle),
        };
        if let Err(e) = attached {
            self.endpoints.remove(handle);
            return Err(e);
        }
        if let Err(e) = interlocks.register(InterlockSource::Endpoint(handle), false) {
            if let Some(node) = self.nodes.get_mut(owner) {
                node.detach(handle);
            }
            self.endpoints.remove(handle);
            return Err(e.into());
        }

        debug!(can_id, "CAN endpoint registered");
        Ok(handle)
    }

    /// Deregister an endpoint.
    pub fn remove_endpoint(
        &mut self,
        handle: EndpointHandle,
        interlocks: &mut InterlockRegistry,
    ) -> Result<E, IoError> {
        let ep = self.endpoints.remove(handle).ok_or(IoError::StaleHandle)?;
        if let Some(node) = self.nodes.get_mut(ep.endpoint().node()) {
            node.detach(handle);
        }
        interlocks.release(InterlockSource::Endpoint(handle));
        ep.release_interlocks(interlocks);
        debug!(sub_id = ep.endpoint().sub_id(), "CAN endpoint removed");
        Ok(ep)
    }

    pub fn endpoint(&self, handle: EndpointHandle) -> Option<&E> {
        self.endpoints.get(handle)
    }

    pub fn endpoint_mut(&mut self, handle: EndpointHandle) -> Option<&mut E> {
        self.endpoints.get_mut(handle)
    }

    /// All endpoints (slot order).
    pub fn endpoints(&self) -> impl Iterator<Item = (EndpointHandle, &E)> {
        self.endpoints.iter()
    }

    /// All endpoints (slot order), mutably.
    pub fn endpoints_mut(&mut self) -> impl Iterator<Item = (EndpointHandle, &mut E)> {
        self.endpoints.iter_mut()
    }

    #[inline]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Reset one endpoint to `Initializing` and poll its node.
    pub fn reset_endpoint(
        &mut self,
        handle: EndpointHandle,
        interlocks: &mut InterlockRegistry,
    ) -> Result<(), IoError> {
        let ep = self.endpoints.get_mut(handle).ok_or(IoError::StaleHandle)?;
        ep.reset();
        let node = ep.endpoint().node();
        interlocks.set(InterlockSource::Endpoint(handle), false);
        self.poll(node)
    }

    /// Reset every endpoint. Poll failures are logged, not returned.
    pub fn reset_endpoints(&mut self, interlocks: &mut InterlockRegistry) {
        for (handle, ep) in self.endpoints.iter_mut() {
            ep.reset();
            interlocks.set(InterlockSource::Endpoint(handle), false);
            let node = ep.endpoint().node();
            if let Some(n) = self.nodes.get(node) {
                if let Err(e) = self.transport.send(&n.poll_frame()) {
                    warn!(node_id = n.node_id(), "poll after reset not sent: {e}");
                }
            }
        }
    }

    // ─── Frames ─────────────────────────────────────────────────────

    /// Route one inbound frame.
    pub fn receive(&mut self, frame: &CanFrame, ctx: &mut IoContext<'_>) -> FrameDisposition {
        if frame.is_estop() {
            warn!("CAN Estop received");
            ctx.machine.raise_shutdown(FaultReason::CanEstop);
            return FrameDisposition::EmergencyStop;
        }

        let mask = self.settings.node_id_mask;
        let nodes = &self.nodes;
        let Some(node_handle) = self
            .node_order
            .find_first_match(|h, _| nodes.get(*h).is_some_and(|n| n.matches(frame, mask)))
        else {
            trace!(id = frame.raw_id(), "frame dropped: no node");
            return FrameDisposition::Unclaimed;
        };

        let Some(node) = self.nodes.get_mut(node_handle) else {
            return FrameDisposition::Unclaimed;
        };
        if node.on_frame() {
            info!(node_id = node.node_id(), "CAN node heartbeat restored");
            ctx.interlocks.set(InterlockSource::Node(node_handle), true);
        }

        let endpoints = &mut self.endpoints;
        let claimed = node.endpoints().find_first_match(|h, _| {
            endpoints
                .get_mut(*h)
                .is_some_and(|ep| ep.process_frame(frame, ctx))
        });

        if let Some(handle) = claimed {
            if let Some(ep) = endpoints.get(handle) {
                ctx.interlocks
                    .set(InterlockSource::Endpoint(handle), ep.endpoint().is_running());
            }
        } else {
            trace!(id = frame.raw_id(), "frame taken by node, no endpoint claimed it");
        }

        FrameDisposition::Claimed {
            node: node_handle,
            endpoint: claimed,
        }
    }

    /// Hand a frame to the transport.
    pub fn send(&mut self, frame: &CanFrame) -> Result<(), IoError> {
        self.transport.send(frame).map_err(|e| {
            warn!(id = frame.raw_id(), "CAN send failed: {e}");
            IoError::from(e)
        })
    }

    /// Send a zero-length poll request to a node.
    pub fn poll(&mut self, handle: NodeHandle) -> Result<(), IoError> {
        let frame = self
            .nodes
            .get(handle)
            .map(CanNode::poll_frame)
            .ok_or(IoError::StaleHandle)?;
        self.send(&frame)
    }

    // ─── Heartbeat ──────────────────────────────────────────────────

    /// One heartbeat tick for a node. On timeout the node's interlock
    /// entry is driven unsafe and the node is polled once.
    pub fn tick_node(
        &mut self,
        handle: NodeHandle,
        interlocks: &mut InterlockRegistry,
    ) -> HeartbeatEvent {
        let Some(node) = self.nodes.get_mut(handle) else {
            return HeartbeatEvent::None;
        };
        let event = node.tick();
        if event == HeartbeatEvent::TimedOut {
            let node_id = node.node_id();
            let poll = node.poll_frame();
            warn!(node_id, timeout = node.timeout(), "CAN node heartbeat timed out");
            interlocks.set(InterlockSource::Node(handle), false);
            if let Err(e) = self.transport.send(&poll) {
                warn!(node_id, "poll after heartbeat timeout not sent: {e}");
            }
        }
        event
    }
}

impl<T: CanTransport> CanBus<T, CanDigitalInput> {
    /// Register a remote digital input on identifier `can_id`.
    pub fn add_digital_input(
        &mut self,
        can_id: u16,
        settings: InputSettings,
        fallback: Option<NodeHandle>,
        interlocks: &mut InterlockRegistry,
    ) -> Result<EndpointHandle, IoError> {
        let handle = self.add_endpoint(can_id, fallback, interlocks, |owner| {
            CanDigitalInput::new(owner, can_id, settings)
        })?;
        info!(can_id, mode = %settings.mode, "CAN digital input registered");
        Ok(handle)
    }

    /// Endpoint of the remote input on external pin `pin`.
    pub fn find_input(&self, pin: u16) -> Option<EndpointHandle> {
        self.endpoints
            .iter()
            .find(|(_, ep)| ep.input().pin() == pin)
            .map(|(h, _)| h)
    }
}

/// Endpoint construction that ignores the owner, for plain [`CanEndpoint`]s.
impl<T: CanTransport> CanBus<T, CanEndpoint> {
    pub fn add_plain_endpoint(
        &mut self,
        can_id: u16,
        fallback: Option<NodeHandle>,
        interlocks: &mut InterlockRegistry,
    ) -> Result<EndpointHandle, IoError> {
        self.add_endpoint(can_id, fallback, interlocks, |owner| {
            CanEndpoint::new(owner, can_id)
        })
    }
}
