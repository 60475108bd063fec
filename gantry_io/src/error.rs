//! Error type for the I/O layer.

use gantry_common::config::ConfigError;
use thiserror::Error;

use crate::can::transport::TransportError;
use crate::gpio::settings::InputSetting;
use crate::registry::RegistryError;

/// Errors returned by construction, lookup and settings operations.
///
/// Nothing on the sample or frame path returns an error; faults there are
/// reported to machine control or absorbed as state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("input pin {pin} is already registered")]
    DuplicatePin { pin: u16 },

    #[error("no input on pin {pin}")]
    UnknownPin { pin: u16 },

    /// A settings write outside `[min, max)`. The input is unchanged.
    #[error("{setting} value {value} outside range [{min}, {max})")]
    ValueRange {
        setting: InputSetting,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("CAN node {node_id} is already registered")]
    DuplicateNode { node_id: u8 },

    #[error("CAN node id {node_id} outside 0..{max}")]
    NodeIdRange { node_id: u8, max: u32 },

    #[error("no CAN node {node_id}")]
    UnknownNode { node_id: u8 },

    /// Owner resolution found no node and no fallback was supplied.
    #[error("no CAN node owns identifier {can_id:#x}")]
    NoOwningNode { can_id: u16 },

    /// A handle whose object has been removed.
    #[error("stale handle")]
    StaleHandle,

    #[error("CAN transport: {0}")]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
