//! Borrowed state handed to every input update.

use crate::interlock::InterlockRegistry;
use crate::machine::MachineControl;

/// Shared collaborators of one update call.
///
/// Built by [`IoSystem`](crate::system::IoSystem) for the duration of a
/// pin change, a tick or a received frame.
pub struct IoContext<'a> {
    pub interlocks: &'a mut InterlockRegistry,
    pub machine: &'a mut dyn MachineControl,
    /// Monotonic time of the event [ms].
    pub now_ms: u64,
}

impl<'a> IoContext<'a> {
    pub fn new(
        interlocks: &'a mut InterlockRegistry,
        machine: &'a mut dyn MachineControl,
        now_ms: u64,
    ) -> Self {
        Self {
            interlocks,
            machine,
            now_ms,
        }
    }
}
