//! Safety interlock aggregate.
//!
//! One registry of boolean "may move" votes shared by every contributor:
//!
//! - a digital input with function `Interlock` holds a `false` entry while
//!   engaged (leading edge adds it, trailing edge removes it),
//! - a CAN node holds a permanent entry that is `true` while its heartbeat
//!   has not timed out,
//! - a CAN endpoint holds a permanent entry that is `true` once it is
//!   `Running`.
//!
//! The machine is safe iff every current entry is `true`. A source with no
//! entry does not restrict motion.

use gantry_common::consts::MAX_INTERLOCKS;
use tracing::debug;

use crate::arena::{EndpointHandle, NodeHandle};
use crate::registry::{Registry, RegistryError};

/// Who contributed an interlock entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterlockSource {
    /// Digital input (local or bridged) by external pin number.
    Input(u16),
    /// Heartbeat health of a CAN node.
    Node(NodeHandle),
    /// Lifecycle state of a CAN endpoint.
    Endpoint(EndpointHandle),
}

/// Process-wide interlock registry.
#[derive(Debug, Default)]
pub struct InterlockRegistry {
    entries: Registry<InterlockSource, MAX_INTERLOCKS, bool>,
}

impl InterlockRegistry {
    pub const fn new() -> Self {
        Self {
            entries: Registry::new(),
        }
    }

    /// Add a permanent entry with an initial value.
    pub fn register(&mut self, source: InterlockSource, safe: bool) -> Result<(), RegistryError> {
        self.entries.add_with(source, safe)?;
        debug!(?source, safe, "interlock registered");
        Ok(())
    }

    /// Engage an interlock: the source now blocks motion.
    ///
    /// Idempotent; engaging an already present source forces it to `false`.
    pub fn engage(&mut self, source: InterlockSource) -> Result<(), RegistryError> {
        if let Some(value) = self.entries.get_mut(source) {
            *value = false;
            return Ok(());
        }
        self.entries.add_with(source, false)?;
        debug!(?source, "interlock engaged");
        Ok(())
    }

    /// Remove the source's entry. Returns whether it was present.
    pub fn release(&mut self, source: InterlockSource) -> bool {
        let removed = self.entries.remove(source).is_some();
        if removed {
            debug!(?source, "interlock released");
        }
        removed
    }

    /// Update the value of an existing entry. Returns `false` if the source
    /// has no entry.
    pub fn set(&mut self, source: InterlockSource, safe: bool) -> bool {
        match self.entries.get_mut(source) {
            Some(value) => {
                if *value != safe {
                    debug!(?source, safe, "interlock changed");
                }
                *value = safe;
                true
            }
            None => false,
        }
    }

    /// Current value of a source's entry.
    pub fn value(&self, source: InterlockSource) -> Option<bool> {
        self.entries.get(source).copied()
    }

    #[inline]
    pub fn contains(&self, source: InterlockSource) -> bool {
        self.entries.contains(source)
    }

    /// Logical AND over every entry.
    pub fn is_safe(&self) -> bool {
        self.first_unsafe().is_none()
    }

    /// First entry (registration order) voting against motion.
    pub fn first_unsafe(&self) -> Option<InterlockSource> {
        self.entries.find_first_match(|_, safe| !*safe)
    }

    pub fn iter(&self) -> impl Iterator<Item = (InterlockSource, bool)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
