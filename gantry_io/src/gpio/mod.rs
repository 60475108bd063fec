//! Digital inputs.
//!
//! [`input::DigitalInput`] is the per-pin debounce, edge and dispatch state
//! machine. It is shared by local pins (held in [`bank::InputBank`]) and by
//! CAN-bridged inputs. [`settings`] implements range-checked writes of the
//! four per-input settings.

pub mod bank;
pub mod input;
pub mod settings;

pub use bank::InputBank;
pub use input::{DebouncedInput, DigitalInput, InputEdge, InputState};
pub use settings::InputSetting;
