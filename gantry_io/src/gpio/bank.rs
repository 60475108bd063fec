//! Locally wired inputs.

use gantry_common::consts::MAX_LOCAL_INPUTS;
use gantry_common::io::config::InputSettings;
use tracing::info;

use super::input::DigitalInput;
use crate::arena::{Arena, InputHandle};
use crate::error::IoError;
use crate::registry::Registry;

/// Local inputs in registration order, looked up by external pin number.
#[derive(Debug, Default)]
pub struct InputBank {
    inputs: Arena<DigitalInput, InputHandle, MAX_LOCAL_INPUTS>,
    order: Registry<InputHandle, MAX_LOCAL_INPUTS>,
}

impl InputBank {
    pub const fn new() -> Self {
        Self {
            inputs: Arena::new(),
            order: Registry::new(),
        }
    }

    /// Register an input on `pin`.
    pub fn add(&mut self, pin: u16, settings: InputSettings) -> Result<InputHandle, IoError> {
        if self.find(pin).is_some() {
            return Err(IoError::DuplicatePin { pin });
        }
        let handle = self.inputs.insert(DigitalInput::new(pin, settings))?;
        if let Err(e) = self.order.add(handle) {
            self.inputs.remove(handle);
            return Err(e.into());
        }
        info!(pin, mode = %settings.mode, "local input registered");
        Ok(handle)
    }

    /// Deregister and return the input.
    pub fn remove(&mut self, handle: InputHandle) -> Result<DigitalInput, IoError> {
        let input = self.inputs.remove(handle).ok_or(IoError::StaleHandle)?;
        self.order.remove(handle);
        info!(pin = input.pin(), "local input removed");
        Ok(input)
    }

    /// Handle of the input on `pin`.
    pub fn find(&self, pin: u16) -> Option<InputHandle> {
        self.order.find_first_match(|h, _| {
            self.inputs.get(*h).is_some_and(|input| input.pin() == pin)
        })
    }

    pub fn get(&self, handle: InputHandle) -> Option<&DigitalInput> {
        self.inputs.get(handle)
    }

    pub fn get_mut(&mut self, handle: InputHandle) -> Option<&mut DigitalInput> {
        self.inputs.get_mut(handle)
    }

    pub fn by_pin(&self, pin: u16) -> Option<&DigitalInput> {
        self.find(pin).and_then(|h| self.inputs.get(h))
    }

    pub fn by_pin_mut(&mut self, pin: u16) -> Option<&mut DigitalInput> {
        let handle = self.find(pin)?;
        self.inputs.get_mut(handle)
    }

    /// Inputs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (InputHandle, &DigitalInput)> {
        self.order
            .keys()
            .filter_map(|h| self.inputs.get(h).map(|input| (h, input)))
    }

    /// Reset every input.
    pub fn reset_all(&mut self) {
        for (_, input) in self.inputs.iter_mut() {
            input.reset();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
