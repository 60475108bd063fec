//! Range-checked input settings writes.
//!
//! The settings layer addresses an input setting by name and writes a raw
//! integer. Each setting accepts a half-open range `[min, max)`; a value
//! outside it is rejected with [`IoError::ValueRange`] and nothing changes.

use core::fmt;
use core::str::FromStr;
use gantry_common::io::mode::{InputAction, InputFunction, IoMode, OutOfRange};

use super::input::DigitalInput;
use crate::error::IoError;

/// One writable per-input setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSetting {
    Mode,
    Action,
    Function,
    Lockout,
}

impl InputSetting {
    pub const ALL: [Self; 4] = [Self::Mode, Self::Action, Self::Function, Self::Lockout];

    /// Accepted raw range `[min, max)`.
    pub const fn range(self) -> (i64, i64) {
        match self {
            Self::Mode => (0, IoMode::RAW_MAX),
            Self::Action => (0, InputAction::RAW_MAX),
            Self::Function => (0, InputFunction::RAW_MAX),
            Self::Lockout => (0, u16::MAX as i64 + 1),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Action => "action",
            Self::Function => "function",
            Self::Lockout => "lockout",
        }
    }

    fn out_of_range(self, e: OutOfRange) -> IoError {
        IoError::ValueRange {
            setting: self,
            value: e.value,
            min: e.min,
            max: e.max,
        }
    }

    /// Write `raw` into `input`.
    pub fn apply(self, input: &mut DigitalInput, raw: i64) -> Result<(), IoError> {
        match self {
            Self::Mode => {
                let mode = IoMode::try_from(raw).map_err(|e| self.out_of_range(e))?;
                input.set_mode(mode);
            }
            Self::Action => {
                let action = InputAction::try_from(raw).map_err(|e| self.out_of_range(e))?;
                input.set_action(action);
            }
            Self::Function => {
                let function = InputFunction::try_from(raw).map_err(|e| self.out_of_range(e))?;
                input.set_function(function);
            }
            Self::Lockout => {
                let lockout = u16::try_from(raw).map_err(|_| {
                    let (min, max) = self.range();
                    IoError::ValueRange {
                        setting: self,
                        value: raw,
                        min,
                        max,
                    }
                })?;
                input.set_lockout_ms(lockout);
            }
        }
        Ok(())
    }

    /// Current raw value of this setting.
    pub fn read(self, input: &DigitalInput) -> i64 {
        match self {
            Self::Mode => input.mode() as i64,
            Self::Action => input.action() as i64,
            Self::Function => input.function() as i64,
            Self::Lockout => i64::from(input.lockout_ms()),
        }
    }
}

impl fmt::Display for InputSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InputSetting {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| format!("unknown input setting: {s:?}"))
    }
}
