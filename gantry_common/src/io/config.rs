//! `io.toml` schema.
//!
//! Lists the locally wired digital inputs, the CAN nodes expected on the
//! bus and the remote inputs each node carries. Parsed once at startup;
//! the I/O layer builds its fixed-capacity runtime objects from it.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

use super::mode::{InputAction, InputFunction, IoMode};
use crate::config::{ConfigError, SharedConfig, Validate};
use crate::consts::{
    CAN_HEARTBEAT_ID_START, CAN_NODE_FIELD_MASK, CAN_NODE_LEGACY_MASK, CAN_PHYSICAL_NODE_MAX,
    DEFAULT_HEARTBEAT_TIMEOUT_TICKS, DEFAULT_LOCKOUT_MS, DEFAULT_TICK_PERIOD_US,
    MAX_CAN_ENDPOINTS, MAX_CAN_NODES, MAX_LOCAL_INPUTS,
};

fn default_lockout_ms() -> u16 {
    DEFAULT_LOCKOUT_MS
}

fn default_heartbeat_timeout() -> u32 {
    DEFAULT_HEARTBEAT_TIMEOUT_TICKS
}

fn default_tick_period_us() -> u64 {
    DEFAULT_TICK_PERIOD_US
}

// ─── InputSettings ──────────────────────────────────────────────────

/// Behavioural settings of one digital input, local or remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSettings {
    /// Polarity or `disabled`. Default: disabled.
    #[serde(default)]
    pub mode: IoMode,

    /// Action fired on the leading edge. Default: none.
    #[serde(default)]
    pub action: InputAction,

    /// Function bound to the input. Default: none.
    #[serde(default)]
    pub function: InputFunction,

    /// Debounce lockout after a committed transition [ms]. Default: 10.
    #[serde(default = "default_lockout_ms")]
    pub lockout_ms: u16,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            mode: IoMode::Disabled,
            action: InputAction::None,
            function: InputFunction::None,
            lockout_ms: DEFAULT_LOCKOUT_MS,
        }
    }
}

impl InputSettings {
    /// Enabled input with the given polarity and no action or function.
    pub const fn with_mode(mode: IoMode) -> Self {
        Self {
            mode,
            action: InputAction::None,
            function: InputFunction::None,
            lockout_ms: DEFAULT_LOCKOUT_MS,
        }
    }
}

// ─── Local Inputs ───────────────────────────────────────────────────

/// A locally wired digital input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// External (1-based) pin number.
    pub pin: u16,

    /// Human-readable display name.
    #[serde(default)]
    pub name: Option<String>,

    /// Re-sample the pin on every scheduler tick in addition to edge interrupts.
    #[serde(default)]
    pub polled: bool,

    #[serde(flatten)]
    pub settings: InputSettings,
}

// ─── CAN ────────────────────────────────────────────────────────────

/// Which mask extracts the node id from a frame identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeIdMask {
    /// Low `log2(CAN_PHYSICAL_NODE_MAX)` bits (`0x0F`).
    #[default]
    Field,
    /// Mask computed by the legacy firmware (`0x8000`).
    Legacy,
}

impl NodeIdMask {
    /// Bit mask applied to a frame identifier.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Field => CAN_NODE_FIELD_MASK,
            Self::Legacy => CAN_NODE_LEGACY_MASK,
        }
    }
}

/// A remote device on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanNodeConfig {
    /// Physical node id (`0..16`).
    pub id: u8,

    #[serde(default)]
    pub name: Option<String>,
}

/// A digital input carried by a remote node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanInputConfig {
    /// Frame identifier claimed by this input; also its external pin number.
    pub can_id: u16,

    /// Node to attach to when no node id matches `can_id`.
    #[serde(default)]
    pub fallback_node: Option<u8>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub settings: InputSettings,
}

/// Bus-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanConfig {
    /// Ticks without a frame before a node withdraws its safe vote.
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ticks: u32,

    #[serde(default)]
    pub node_id_mask: NodeIdMask,

    #[serde(default)]
    pub nodes: Vec<CanNodeConfig>,

    #[serde(default)]
    pub inputs: Vec<CanInputConfig>,
}

impl Default for CanConfig {
    fn default() -> Self {
        Self {
            heartbeat_timeout_ticks: DEFAULT_HEARTBEAT_TIMEOUT_TICKS,
            node_id_mask: NodeIdMask::Field,
            nodes: Vec::new(),
            inputs: Vec::new(),
        }
    }
}

impl CanConfig {
    /// Node id an input attaches to: the id matching `can_id` under the
    /// configured mask, otherwise the fallback node.
    pub fn owner_of(&self, input: &CanInputConfig) -> Option<u8> {
        let masked = u32::from(input.can_id) & self.node_id_mask.bits();
        self.nodes
            .iter()
            .find(|n| u32::from(n.id) == masked)
            .map(|n| n.id)
            .or(input.fallback_node)
    }
}

// ─── Timing ─────────────────────────────────────────────────────────

/// Scheduler timing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Tick period [µs]. Default: 1000.
    #[serde(default = "default_tick_period_us")]
    pub tick_period_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_period_us: DEFAULT_TICK_PERIOD_US,
        }
    }
}

// ─── IoConfig ───────────────────────────────────────────────────────

/// Top-level I/O configuration parsed from `io.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    pub shared: SharedConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub inputs: Vec<InputConfig>,

    #[serde(default)]
    pub can: CanConfig,
}

impl IoConfig {
    /// Parse from TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

impl Validate for IoConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.timing.tick_period_us == 0 {
            return Err(invalid("timing.tick_period_us must be non-zero".into()));
        }
        if self.can.heartbeat_timeout_ticks == 0 {
            return Err(invalid("can.heartbeat_timeout_ticks must be non-zero".into()));
        }
        if self.inputs.len() > MAX_LOCAL_INPUTS {
            return Err(invalid(format!(
                "{} local inputs configured, capacity is {MAX_LOCAL_INPUTS}",
                self.inputs.len()
            )));
        }
        if self.can.nodes.len() > MAX_CAN_NODES {
            return Err(invalid(format!(
                "{} CAN nodes configured, capacity is {MAX_CAN_NODES}",
                self.can.nodes.len()
            )));
        }
        if self.can.inputs.len() > MAX_CAN_ENDPOINTS {
            return Err(invalid(format!(
                "{} CAN inputs configured, capacity is {MAX_CAN_ENDPOINTS}",
                self.can.inputs.len()
            )));
        }

        // Local and remote inputs share one external pin namespace.
        let mut pins: HashSet<u16> = HashSet::new();
        for input in &self.inputs {
            if input.pin == 0 {
                return Err(invalid("input pin numbers are 1-based, got 0".into()));
            }
            if !pins.insert(input.pin) {
                return Err(invalid(format!("duplicate input pin {}", input.pin)));
            }
        }

        let mut node_ids: HashSet<u8> = HashSet::new();
        for node in &self.can.nodes {
            if u32::from(node.id) >= CAN_PHYSICAL_NODE_MAX {
                return Err(invalid(format!(
                    "CAN node id {} outside 0..{CAN_PHYSICAL_NODE_MAX}",
                    node.id
                )));
            }
            if !node_ids.insert(node.id) {
                return Err(invalid(format!("duplicate CAN node id {}", node.id)));
            }
        }

        if self.can.node_id_mask == NodeIdMask::Legacy {
            warn!(
                "can.node_id_mask = \"legacy\" ({:#x}) maps every standard identifier to node 0",
                NodeIdMask::Legacy.bits()
            );
        }

        for input in &self.can.inputs {
            let id = u32::from(input.can_id);
            if id == 0 || id >= CAN_HEARTBEAT_ID_START {
                return Err(invalid(format!(
                    "CAN input id {id:#x} must be in 1..{CAN_HEARTBEAT_ID_START:#x}"
                )));
            }
            if !pins.insert(input.can_id) {
                return Err(invalid(format!(
                    "CAN input id {id:#x} collides with another input pin"
                )));
            }
            if let Some(fallback) = input.fallback_node {
                if !node_ids.contains(&fallback) {
                    return Err(invalid(format!(
                        "CAN input {id:#x} falls back to unknown node {fallback}"
                    )));
                }
            }
            if self.can.owner_of(input).is_none() {
                return Err(invalid(format!(
                    "CAN input {id:#x} has no owning node and no fallback_node"
                )));
            }
        }

        Ok(())
    }
}
