//! CAN field bus.
//!
//! Remote I/O devices (nodes) sit on a shared bus. Each node carries
//! endpoints, each claiming one frame identifier. A node proves it is alive
//! by sending any frame; silence longer than the heartbeat timeout
//! withdraws its safe vote. [`CanDigitalInput`] bridges an endpoint into the
//! same input state machine local pins use.

pub mod bus;
pub mod digital_input;
pub mod endpoint;
pub mod frame;
pub mod node;
pub mod transport;

pub use bus::{BusSettings, CanBus, FrameDisposition};
pub use digital_input::CanDigitalInput;
pub use endpoint::{BusEndpoint, CanEndpoint, EndpointState};
pub use frame::{CanFrame, Payload};
pub use node::{CanNode, HeartbeatEvent};
pub use transport::{CanTransport, FrameLog, TransportError};
