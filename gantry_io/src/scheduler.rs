//! Fixed-period tick targets.
//!
//! Objects that need periodic service register a [`TickTarget`] here at
//! construction and deregister at teardown. [`IoSystem::tick`] walks the
//! targets in registration order.
//!
//! [`IoSystem::tick`]: crate::system::IoSystem::tick

use gantry_common::consts::MAX_TICK_TARGETS;

use crate::arena::{InputHandle, NodeHandle};
use crate::registry::{Registry, RegistryError};

/// Something serviced once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickTarget {
    /// Heartbeat counter of a CAN node.
    CanNode(NodeHandle),
    /// Local input re-sampled through a [`PinReader`].
    PolledInput(InputHandle),
}

/// Registry of tick targets plus a tick counter.
#[derive(Debug, Default)]
pub struct TickScheduler {
    targets: Registry<TickTarget, MAX_TICK_TARGETS>,
    ticks: u64,
}

impl TickScheduler {
    pub const fn new() -> Self {
        Self {
            targets: Registry::new(),
            ticks: 0,
        }
    }

    pub fn register(&mut self, target: TickTarget) -> Result<(), RegistryError> {
        self.targets.add(target)
    }

    pub fn deregister(&mut self, target: TickTarget) -> bool {
        self.targets.remove(target).is_some()
    }

    #[inline]
    pub fn contains(&self, target: TickTarget) -> bool {
        self.targets.contains(target)
    }

    /// Targets in registration order.
    #[inline]
    pub fn targets(&self) -> &Registry<TickTarget, MAX_TICK_TARGETS> {
        &self.targets
    }

    /// Count one tick; returns the new total.
    pub fn advance(&mut self) -> u64 {
        self.ticks = self.ticks.wrapping_add(1);
        self.ticks
    }

    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Reads the raw level of a local pin.
pub trait PinReader {
    /// `None` if the pin cannot be read.
    fn read_pin(&mut self, pin: u16) -> Option<bool>;
}

impl<F> PinReader for F
where
    F: FnMut(u16) -> Option<bool>,
{
    fn read_pin(&mut self, pin: u16) -> Option<bool> {
        self(pin)
    }
}

/// Pin reader for systems without polled inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPins;

impl PinReader for NoPins {
    fn read_pin(&mut self, _pin: u16) -> Option<bool> {
        None
    }
}
