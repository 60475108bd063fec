//! Digital input configuration shared by the I/O layer and its tools.
//!
//! [`mode`] holds the typed settings of a single input, [`config`]
//! the `io.toml` schema that lists local inputs and CAN devices.

pub mod config;
pub mod mode;
