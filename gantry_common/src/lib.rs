//! Gantry Common Library
//!
//! Shared constants and configuration loading utilities for the
//! gantry workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - CAN identifier layout, capacities and timing defaults
//! - [`config`] - Configuration loading traits and types
//! - [`io`] - Digital input modes, actions, functions and `io.toml` schema
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use gantry_common::consts::CAN_POLL_ID_START;
//! use gantry_common::config::{ConfigLoader, SharedConfig};
//! ```

pub mod config;
pub mod consts;
pub mod io;
pub mod prelude;
