//! Prelude module for common re-exports.
//!
//! ```rust
//! use gantry_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate, load_validated,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    CAN_PHYSICAL_NODE_MAX, DEFAULT_CONFIG_PATH, DEFAULT_LOCKOUT_MS, DEFAULT_TICK_PERIOD_US,
};

// ─── I/O ────────────────────────────────────────────────────────────
pub use crate::io::config::{InputSettings, IoConfig, NodeIdMask};
pub use crate::io::mode::{InputAction, InputFunction, IoMode};
