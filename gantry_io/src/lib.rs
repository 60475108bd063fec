//! # Gantry I/O
//!
//! Real-time input layer of the gantry motion controller. Local switches
//! and remote CAN devices feed one debounce/edge state machine, one
//! safety-interlock aggregate and one action path into the machine
//! control layer.
//!
//! # Module Structure
//!
//! - [`registry`] - Fixed-capacity membership lists with first-match visitation
//! - [`arena`] - Generation-checked object storage
//! - [`interlock`] - Process-wide safety aggregate
//! - [`timer`] - Millisecond deadlines (debounce lockout)
//! - [`machine`] - Machine-control interface and the request latch
//! - [`context`] - Borrowed state handed to input updates
//! - [`gpio`] - Digital input state machine, input bank, settings writes
//! - [`can`] - Frames, nodes, endpoints, bridged inputs and the bus dispatcher
//! - [`scheduler`] - Tick targets and pin sampling
//! - [`system`] - [`IoSystem`](system::IoSystem) façade owning all of the above
//! - [`replay`] - Scripted pin and frame stimulus for running without hardware
//! - [`error`] - [`IoError`](error::IoError)
//!
//! # Timing Model
//!
//! Nothing in this crate blocks or allocates after construction. The
//! caller drives it from two sources: pin-change notifications
//! ([`IoSystem::on_pin_change`](system::IoSystem::on_pin_change)) and a
//! fixed-period tick ([`IoSystem::tick`](system::IoSystem::tick)).

pub mod arena;
pub mod can;
pub mod context;
pub mod error;
pub mod gpio;
pub mod interlock;
pub mod machine;
pub mod registry;
pub mod replay;
pub mod scheduler;
pub mod system;
pub mod timer;

pub use error::IoError;
pub use system::IoSystem;
