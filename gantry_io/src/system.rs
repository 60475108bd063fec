//! [`IoSystem`]: owner of every registry, input and node.
//!
//! All shared state (interlock registry, tick scheduler, local input bank,
//! CAN bus) lives in one value. The caller drives it:
//!
//! ```text
//!  pin interrupt ──► on_pin_change ──┐
//!  fixed tick    ──► tick ───────────┼──► DigitalInput / CanNode ──► interlocks
//!  CAN receive   ──► receive_frame ──┘                          └──► MachineControl
//! ```
//!
//! Machine control is passed per call so the motion side keeps ownership.

use std::time::Duration;

use gantry_common::config::Validate;
use gantry_common::io::config::{InputSettings, IoConfig};
use gantry_common::io::mode::InputFunction;
use tracing::info;

use crate::arena::{EndpointHandle, InputHandle, NodeHandle};
use crate::can::bus::{BusSettings, CanBus, FrameDisposition};
use crate::can::digital_input::CanDigitalInput;
use crate::can::frame::CanFrame;
use crate::can::node::{CanNode, HeartbeatEvent};
use crate::can::transport::CanTransport;
use crate::context::IoContext;
use crate::error::IoError;
use crate::gpio::bank::InputBank;
use crate::gpio::input::{DebouncedInput, DigitalInput, InputEdge, InputState};
use crate::gpio::settings::InputSetting;
use crate::interlock::{InterlockRegistry, InterlockSource};
use crate::machine::MachineControl;
use crate::scheduler::{PinReader, TickScheduler, TickTarget};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickSummary {
    /// Tick number (1-based).
    pub tick: u64,
    /// Polled inputs that committed a transition.
    pub edges: u16,
    /// Nodes whose heartbeat timed out on this tick.
    pub timeouts: u16,
}

/// The real-time I/O layer.
#[derive(Debug)]
pub struct IoSystem<T: CanTransport> {
    interlocks: InterlockRegistry,
    scheduler: TickScheduler,
    bank: InputBank,
    bus: CanBus<T>,
    tick_period_us: u64,
}

impl<T: CanTransport> IoSystem<T> {
    /// Empty system.
    pub fn new(transport: T, settings: BusSettings) -> Self {
        Self {
            interlocks: InterlockRegistry::new(),
            scheduler: TickScheduler::new(),
            bank: InputBank::new(),
            bus: CanBus::new(transport, settings),
            tick_period_us: gantry_common::consts::DEFAULT_TICK_PERIOD_US,
        }
    }

    /// Validate `config` and build every input and node it lists.
    ///
    /// Local inputs are registered first, then nodes, then remote inputs,
    /// each in file order.
    pub fn from_config(config: &IoConfig, transport: T) -> Result<Self, IoError> {
        config.validate()?;

        let mut system = Self::new(
            transport,
            BusSettings {
                node_id_mask: config.can.node_id_mask,
                heartbeat_timeout: config.can.heartbeat_timeout_ticks,
            },
        );
        system.tick_period_us = config.timing.tick_period_us;

        for input in &config.inputs {
            system.add_input(input.pin, input.settings, input.polled)?;
        }
        for node in &config.can.nodes {
            system.add_node(node.id)?;
        }
        for input in &config.can.inputs {
            system.add_can_input(input.can_id, input.settings, input.fallback_node)?;
        }

        info!(
            local_inputs = system.bank.len(),
            nodes = system.bus.node_count(),
            can_inputs = system.bus.endpoint_count(),
            "I/O system built"
        );
        Ok(system)
    }

    // ─── Accessors ──────────────────────────────────────────────────

    #[inline]
    pub fn interlocks(&self) -> &InterlockRegistry {
        &self.interlocks
    }

    #[inline]
    pub fn scheduler(&self) -> &TickScheduler {
        &self.scheduler
    }

    #[inline]
    pub fn bank(&self) -> &InputBank {
        &self.bank
    }

    #[inline]
    pub fn bus(&self) -> &CanBus<T> {
        &self.bus
    }

    #[inline]
    pub fn bus_mut(&mut self) -> &mut CanBus<T> {
        &mut self.bus
    }

    #[inline]
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_period_us)
    }

    /// Aggregate safety: every interlock entry votes safe.
    #[inline]
    pub fn is_safe(&self) -> bool {
        self.interlocks.is_safe()
    }

    /// First interlock entry voting unsafe.
    #[inline]
    pub fn first_unsafe(&self) -> Option<InterlockSource> {
        self.interlocks.first_unsafe()
    }

    // ─── Construction / Teardown ────────────────────────────────────

    /// Register a local input; `polled` inputs are also sampled every tick.
    pub fn add_input(
        &mut self,
        pin: u16,
        settings: InputSettings,
        polled: bool,
    ) -> Result<InputHandle, IoError> {
        if self.bus.find_input(pin).is_some() {
            return Err(IoError::DuplicatePin { pin });
        }
        let handle = self.bank.add(pin, settings)?;
        if polled {
            if let Err(e) = self.scheduler.register(TickTarget::PolledInput(handle)) {
                self.bank.remove(handle).ok();
                return Err(e.into());
            }
        }
        Ok(handle)
    }

    /// Deregister the local input on `pin`, dropping any engaged interlock.
    pub fn remove_input(&mut self, pin: u16) -> Result<DigitalInput, IoError> {
        let handle = self.bank.find(pin).ok_or(IoError::UnknownPin { pin })?;
        self.scheduler.deregister(TickTarget::PolledInput(handle));
        self.interlocks.release(InterlockSource::Input(pin));
        self.bank.remove(handle)
    }

    pub fn add_node(&mut self, node_id: u8) -> Result<NodeHandle, IoError> {
        self.bus
            .add_node(node_id, &mut self.interlocks, &mut self.scheduler)
    }

    /// Deregister node `node_id` and every endpoint attached to it.
    pub fn remove_node(&mut self, node_id: u8) -> Result<CanNode, IoError> {
        let handle = self
            .bus
            .find_node(node_id)
            .ok_or(IoError::UnknownNode { node_id })?;
        self.bus
            .remove_node(handle, &mut self.interlocks, &mut self.scheduler)
    }

    /// Register a remote input on identifier `can_id`, which is also its pin.
    pub fn add_can_input(
        &mut self,
        can_id: u16,
        settings: InputSettings,
        fallback_node: Option<u8>,
    ) -> Result<EndpointHandle, IoError> {
        if self.bank.find(can_id).is_some() || self.bus.find_input(can_id).is_some() {
            return Err(IoError::DuplicatePin { pin: can_id });
        }
        let fallback = fallback_node
            .map(|node_id| {
                self.bus
                    .find_node(node_id)
                    .ok_or(IoError::UnknownNode { node_id })
            })
            .transpose()?;
        self.bus
            .add_digital_input(can_id, settings, fallback, &mut self.interlocks)
    }

    pub fn remove_can_input(&mut self, can_id: u16) -> Result<CanDigitalInput, IoError> {
        let handle = self
            .bus
            .find_input(can_id)
            .ok_or(IoError::UnknownPin { pin: can_id })?;
        self.bus.remove_endpoint(handle, &mut self.interlocks)
    }

    // ─── Event Entry Points ─────────────────────────────────────────

    /// One fixed-period tick: every node heartbeat advances and every
    /// polled input is sampled, in registration order.
    pub fn tick(
        &mut self,
        now_ms: u64,
        pins: &mut dyn PinReader,
        machine: &mut dyn MachineControl,
    ) -> TickSummary {
        let tick = self.scheduler.advance();
        let mut summary = TickSummary {
            tick,
            ..TickSummary::default()
        };

        let Self {
            interlocks,
            scheduler,
            bank,
            bus,
            ..
        } = self;

        scheduler.targets().for_each(|target, _| match *target {
            TickTarget::CanNode(node) => {
                if bus.tick_node(node, interlocks) == HeartbeatEvent::TimedOut {
                    summary.timeouts += 1;
                }
            }
            TickTarget::PolledInput(handle) => {
                let Some(input) = bank.get_mut(handle) else {
                    return;
                };
                let Some(raw) = pins.read_pin(input.pin()) else {
                    return;
                };
                let mut ctx = IoContext::new(&mut *interlocks, &mut *machine, now_ms);
                if input.update(raw, &mut ctx) != InputEdge::None {
                    summary.edges += 1;
                }
            }
        });

        summary
    }

    /// Edge notification for a local pin.
    pub fn on_pin_change(
        &mut self,
        pin: u16,
        raw: bool,
        now_ms: u64,
        machine: &mut dyn MachineControl,
    ) -> Result<InputEdge, IoError> {
        let input = self
            .bank
            .by_pin_mut(pin)
            .ok_or(IoError::UnknownPin { pin })?;
        let mut ctx = IoContext::new(&mut self.interlocks, machine, now_ms);
        Ok(input.update(raw, &mut ctx))
    }

    /// Route one received frame.
    pub fn receive_frame(
        &mut self,
        frame: &CanFrame,
        now_ms: u64,
        machine: &mut dyn MachineControl,
    ) -> FrameDisposition {
        let mut ctx = IoContext::new(&mut self.interlocks, machine, now_ms);
        self.bus.receive(frame, &mut ctx)
    }

    /// Send a frame through the bus transport.
    pub fn send_frame(&mut self, frame: &CanFrame) -> Result<(), IoError> {
        self.bus.send(frame)
    }

    // ─── Input Queries ──────────────────────────────────────────────

    /// Local or remote input on external pin `pin`.
    pub fn input(&self, pin: u16) -> Option<&DigitalInput> {
        if let Some(input) = self.bank.by_pin(pin) {
            return Some(input);
        }
        let handle = self.bus.find_input(pin)?;
        self.bus.endpoint(handle).map(|ep| ep.input())
    }

    fn input_mut(&mut self, pin: u16) -> Option<&mut DigitalInput> {
        if let Some(handle) = self.bank.find(pin) {
            return self.bank.get_mut(handle);
        }
        let handle = self.bus.find_input(pin)?;
        self.bus.endpoint_mut(handle).map(|ep| ep.input_mut())
    }

    /// Put the input in or out of homing mode. Pin 0 is ignored.
    pub fn set_homing_mode(&mut self, pin: u16, homing: bool) -> Result<(), IoError> {
        if pin == 0 {
            return Ok(());
        }
        self.input_mut(pin)
            .ok_or(IoError::UnknownPin { pin })?
            .set_homing_mode(homing);
        Ok(())
    }

    /// Put the input in or out of probing mode. Pin 0 is ignored.
    pub fn set_probing_mode(&mut self, pin: u16, probing: bool) -> Result<(), IoError> {
        if pin == 0 {
            return Ok(());
        }
        self.input_mut(pin)
            .ok_or(IoError::UnknownPin { pin })?
            .set_probing_mode(probing);
        Ok(())
    }

    /// Pin of the first input (local before remote) with function `Probe`.
    pub fn probing_input(&self) -> Option<u16> {
        let is_probe = |input: &DigitalInput| input.function() == InputFunction::Probe;
        self.bank
            .iter()
            .map(|(_, input)| input)
            .find(|input| is_probe(input))
            .or_else(|| {
                self.bus
                    .endpoints()
                    .map(|(_, ep)| ep.input())
                    .find(|input| is_probe(input))
            })
            .map(DigitalInput::pin)
    }

    /// Whether the input on `pin` is `Active`. Pin 0 and unknown pins read `false`.
    pub fn read_input(&self, pin: u16) -> bool {
        pin != 0 && self.input(pin).is_some_and(|i| i.state().is_active())
    }

    pub fn input_state(&self, pin: u16) -> Result<InputState, IoError> {
        self.input(pin)
            .map(DigitalInput::state)
            .ok_or(IoError::UnknownPin { pin })
    }

    // ─── Settings ───────────────────────────────────────────────────

    /// Range-checked write of one input setting.
    ///
    /// On success every input is reset unless machine control reports the
    /// initialization phase. On error nothing changes.
    pub fn write_input_setting(
        &mut self,
        pin: u16,
        setting: InputSetting,
        raw: i64,
        machine: &dyn MachineControl,
    ) -> Result<(), IoError> {
        let input = self.input_mut(pin).ok_or(IoError::UnknownPin { pin })?;
        setting.apply(input, raw)?;
        info!(pin, %setting, raw, "input setting written");
        if !machine.is_initializing() {
            self.reset_inputs();
        }
        Ok(())
    }

    pub fn read_input_setting(&self, pin: u16, setting: InputSetting) -> Result<i64, IoError> {
        self.input(pin)
            .map(|input| setting.read(input))
            .ok_or(IoError::UnknownPin { pin })
    }

    /// Reset every local and remote input. Remote inputs return to
    /// `Initializing` and their nodes are polled.
    pub fn reset_inputs(&mut self) {
        self.bank.reset_all();
        self.bus.reset_endpoints(&mut self.interlocks);
    }
}
