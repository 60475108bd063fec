//! Input mode, action and function types.
//!
//! Each enum has a stable numeric encoding (the settings layer writes raw
//! integers) and a snake_case string form used in `io.toml`.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw setting value outside the accepted half-open range `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value {value} outside range [{min}, {max})")]
pub struct OutOfRange {
    /// Rejected value.
    pub value: i64,
    /// Inclusive lower bound.
    pub min: i64,
    /// Exclusive upper bound.
    pub max: i64,
}

#[inline]
fn check_range(value: i64, max: i64) -> Result<u8, OutOfRange> {
    if (0..max).contains(&value) {
        Ok(value as u8)
    } else {
        Err(OutOfRange { value, min: 0, max })
    }
}

// ─── IoMode ─────────────────────────────────────────────────────────

/// Electrical polarity of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum IoMode {
    /// Active when the raw level is low (normally open).
    ActiveLow = 0,
    /// Active when the raw level is high (normally closed).
    ActiveHigh = 1,
    /// Input ignored; state is always `Disabled`.
    #[default]
    Disabled = 2,
}

impl IoMode {
    /// Exclusive upper bound of the raw encoding.
    pub const RAW_MAX: i64 = 3;

    /// XOR mask applied to a raw level: active-low inverts, active-high passes.
    #[inline]
    pub const fn polarity_mask(self) -> bool {
        !matches!(self, Self::ActiveHigh)
    }
}

impl TryFrom<i64> for IoMode {
    type Error = OutOfRange;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match check_range(value, Self::RAW_MAX)? {
            0 => Self::ActiveLow,
            1 => Self::ActiveHigh,
            _ => Self::Disabled,
        })
    }
}

impl FromStr for IoMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active_low" | "NO" => Ok(Self::ActiveLow),
            "active_high" | "NC" => Ok(Self::ActiveHigh),
            "disabled" => Ok(Self::Disabled),
            _ => Err(format!("unknown IoMode: {s:?}")),
        }
    }
}

impl fmt::Display for IoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveLow => write!(f, "active_low"),
            Self::ActiveHigh => write!(f, "active_high"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

// ─── InputAction ────────────────────────────────────────────────────

/// Machine action fired on a leading edge.
///
/// Ordered by escalation: a later variant is never weaker than an
/// earlier one, except `CycleStart` which is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InputAction {
    #[default]
    None = 0,
    /// Feed hold at normal jerk.
    Stop = 1,
    /// Feed hold at high jerk (currently the same request as `Stop`).
    FastStop = 2,
    /// Immediate stop including spindle and coolant.
    Halt = 3,
    /// Reserved; takes no action.
    CycleStart = 4,
    Alarm = 5,
    Shutdown = 6,
    Panic = 7,
    /// Hardware reset.
    Reset = 8,
}

impl InputAction {
    /// Exclusive upper bound of the raw encoding.
    pub const RAW_MAX: i64 = 9;
}

impl TryFrom<i64> for InputAction {
    type Error = OutOfRange;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match check_range(value, Self::RAW_MAX)? {
            0 => Self::None,
            1 => Self::Stop,
            2 => Self::FastStop,
            3 => Self::Halt,
            4 => Self::CycleStart,
            5 => Self::Alarm,
            6 => Self::Shutdown,
            7 => Self::Panic,
            _ => Self::Reset,
        })
    }
}

impl FromStr for InputAction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "stop" => Ok(Self::Stop),
            "fast_stop" => Ok(Self::FastStop),
            "halt" => Ok(Self::Halt),
            "cycle_start" => Ok(Self::CycleStart),
            "alarm" => Ok(Self::Alarm),
            "shutdown" => Ok(Self::Shutdown),
            "panic" => Ok(Self::Panic),
            "reset" => Ok(Self::Reset),
            _ => Err(format!("unknown InputAction: {s:?}")),
        }
    }
}

// ─── InputFunction ──────────────────────────────────────────────────

/// Machine function bound to an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InputFunction {
    #[default]
    None = 0,
    /// Limit switch: records the pin as active limit source.
    Limit = 1,
    /// Safety interlock: blocks motion while engaged.
    Interlock = 2,
    /// External emergency stop: records the pin as shutdown source.
    Shutdown = 3,
    /// Probe input, located by probing cycles.
    Probe = 4,
    ToolHeightSetter = 5,
}

impl InputFunction {
    /// Exclusive upper bound of the raw encoding.
    pub const RAW_MAX: i64 = 6;
}

impl TryFrom<i64> for InputFunction {
    type Error = OutOfRange;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Ok(match check_range(value, Self::RAW_MAX)? {
            0 => Self::None,
            1 => Self::Limit,
            2 => Self::Interlock,
            3 => Self::Shutdown,
            4 => Self::Probe,
            _ => Self::ToolHeightSetter,
        })
    }
}

impl FromStr for InputFunction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "limit" => Ok(Self::Limit),
            "interlock" => Ok(Self::Interlock),
            "shutdown" => Ok(Self::Shutdown),
            "probe" => Ok(Self::Probe),
            "tool_height_setter" => Ok(Self::ToolHeightSetter),
            _ => Err(format!("unknown InputFunction: {s:?}")),
        }
    }
}
