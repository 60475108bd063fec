//! Generation-checked object storage.
//!
//! Nodes, endpoints and inputs live in fixed-capacity arenas and are
//! referenced everywhere else by small `Copy` handles. A handle carries the
//! slot generation at insertion time; once the slot is vacated (and possibly
//! reused) the old handle no longer resolves.

use core::marker::PhantomData;
use heapless::Vec;

use crate::registry::RegistryError;

/// Slot index plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    index: u16,
    generation: u16,
}

impl RawHandle {
    #[inline]
    pub const fn index(self) -> u16 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u16 {
        self.generation
    }
}

/// Typed handle wrapping a [`RawHandle`].
pub trait ArenaHandle: Copy + Eq {
    fn from_raw(raw: RawHandle) -> Self;
    fn raw(self) -> RawHandle;
}

/// Declare a typed arena handle.
macro_rules! arena_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name($crate::arena::RawHandle);

        impl $crate::arena::ArenaHandle for $name {
            #[inline]
            fn from_raw(raw: $crate::arena::RawHandle) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> $crate::arena::RawHandle {
                self.0
            }
        }
    };
}

arena_handle!(
    /// Handle to a registered CAN node.
    NodeHandle
);
arena_handle!(
    /// Handle to a registered CAN endpoint.
    EndpointHandle
);
arena_handle!(
    /// Handle to a locally wired digital input.
    InputHandle
);

#[derive(Debug)]
struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// Up to `N` objects of type `T` addressed by handles of type `H`.
#[derive(Debug)]
pub struct Arena<T, H, const N: usize> {
    slots: Vec<Slot<T>, N>,
    live: usize,
    _handle: PhantomData<H>,
}

impl<T, H: ArenaHandle, const N: usize> Default for Arena<T, H, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, H: ArenaHandle, const N: usize> Arena<T, H, N> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            _handle: PhantomData,
        }
    }

    /// Store `value` in the first vacant slot.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Full`] when all `N` slots hold live objects.
    pub fn insert(&mut self, value: T) -> Result<H, RegistryError> {
        let vacant = self.slots.iter().position(|s| s.value.is_none());
        let index = match vacant {
            Some(index) => {
                self.slots[index].value = Some(value);
                index
            }
            None => {
                let index = self.slots.len();
                self.slots
                    .push(Slot {
                        generation: 0,
                        value: Some(value),
                    })
                    .map_err(|_| RegistryError::Full { capacity: N })?;
                index
            }
        };
        self.live += 1;
        Ok(H::from_raw(RawHandle {
            index: index as u16,
            generation: self.slots[index].generation,
        }))
    }

    /// Take the object out and invalidate every handle to it.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        let slot = self.slot_mut(handle)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        Some(value)
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        let raw = handle.raw();
        self.slots
            .get(usize::from(raw.index))
            .filter(|s| s.generation == raw.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.slot_mut(handle).and_then(|s| s.value.as_mut())
    }

    #[inline]
    pub fn contains(&self, handle: H) -> bool {
        self.get(handle).is_some()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                let handle = H::from_raw(RawHandle {
                    index: index as u16,
                    generation: slot.generation,
                });
                (handle, value)
            })
        })
    }

    /// Live objects in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (H, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value.as_mut().map(|value| {
                let handle = H::from_raw(RawHandle {
                    index: index as u16,
                    generation,
                });
                (handle, value)
            })
        })
    }

    fn slot_mut(&mut self, handle: H) -> Option<&mut Slot<T>> {
        let raw = handle.raw();
        self.slots
            .get_mut(usize::from(raw.index))
            .filter(|s| s.generation == raw.generation)
    }
}
