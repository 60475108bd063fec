//! Scripted stimulus for running an [`IoSystem`] without hardware.
//!
//! A script is a TOML list of timestamped events:
//!
//! ```toml
//! [[events]]
//! kind = "pin"
//! at_ms = 5
//! pin = 1
//! level = true
//!
//! [[events]]
//! kind = "frame"
//! at_ms = 12
//! id = 0x25
//! data = [1]
//!
//! [[events]]
//! kind = "heartbeat"
//! at_ms = 20
//! node = 5
//!
//! [[events]]
//! kind = "estop"
//! at_ms = 40
//! ```
//!
//! [`Replay::step`] applies every event due at `now_ms`, then runs one tick.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::can::frame::CanFrame;
use crate::can::transport::CanTransport;
use crate::machine::MachineControl;
use crate::scheduler::PinReader;
use crate::system::{IoSystem, TickSummary};

/// One timestamped stimulus.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScriptEvent {
    /// Raw level change on a local pin.
    Pin { at_ms: u64, pin: u16, level: bool },
    /// Standard data frame.
    Frame {
        at_ms: u64,
        id: u16,
        #[serde(default)]
        data: Vec<u8>,
    },
    /// Heartbeat frame from `node`.
    Heartbeat { at_ms: u64, node: u8 },
    /// Bus-wide emergency stop.
    Estop { at_ms: u64 },
}

impl ScriptEvent {
    pub const fn at_ms(&self) -> u64 {
        match self {
            Self::Pin { at_ms, .. }
            | Self::Frame { at_ms, .. }
            | Self::Heartbeat { at_ms, .. }
            | Self::Estop { at_ms } => *at_ms,
        }
    }
}

/// Events ordered by time. Events with equal times keep file order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Script {
    #[serde(default)]
    events: Vec<ScriptEvent>,
}

impl Script {
    pub fn new(mut events: Vec<ScriptEvent>) -> Self {
        events.sort_by_key(ScriptEvent::at_ms);
        Self { events }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let raw: Self = toml::from_str(content)?;
        Ok(Self::new(raw.events))
    }

    #[inline]
    pub fn events(&self) -> &[ScriptEvent] {
        &self.events
    }

    /// Time of the last event, 0 for an empty script.
    pub fn end_ms(&self) -> u64 {
        self.events.last().map_or(0, ScriptEvent::at_ms)
    }
}

/// Last level written to each local pin.
#[derive(Debug, Clone, Default)]
pub struct PinLevels(HashMap<u16, bool>);

impl PinLevels {
    pub fn set(&mut self, pin: u16, level: bool) {
        self.0.insert(pin, level);
    }

    pub fn get(&self, pin: u16) -> Option<bool> {
        self.0.get(&pin).copied()
    }
}

impl PinReader for PinLevels {
    fn read_pin(&mut self, pin: u16) -> Option<bool> {
        self.get(pin)
    }
}

/// Cursor over a [`Script`].
#[derive(Debug, Clone)]
pub struct Replay {
    script: Script,
    cursor: usize,
    levels: PinLevels,
}

impl Replay {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            cursor: 0,
            levels: PinLevels::default(),
        }
    }

    /// All events applied.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.script.events.len()
    }

    #[inline]
    pub fn levels(&self) -> &PinLevels {
        &self.levels
    }

    /// Apply every event due at or before `now_ms`, then tick once.
    pub fn step<T: CanTransport>(
        &mut self,
        system: &mut IoSystem<T>,
        now_ms: u64,
        machine: &mut dyn MachineControl,
    ) -> TickSummary {
        while let Some(event) = self.script.events.get(self.cursor) {
            if event.at_ms() > now_ms {
                break;
            }
            self.cursor += 1;
            apply(event, &mut self.levels, system, now_ms, machine);
        }
        system.tick(now_ms, &mut self.levels, machine)
    }
}

fn apply<T: CanTransport>(
    event: &ScriptEvent,
    levels: &mut PinLevels,
    system: &mut IoSystem<T>,
    now_ms: u64,
    machine: &mut dyn MachineControl,
) {
    let frame = match *event {
        ScriptEvent::Pin { pin, level, .. } => {
            levels.set(pin, level);
            match system.on_pin_change(pin, level, now_ms, machine) {
                Ok(edge) => debug!(pin, level, ?edge, "pin event"),
                Err(e) => warn!(pin, "pin event ignored: {e}"),
            }
            return;
        }
        ScriptEvent::Frame { id, ref data, .. } => match CanFrame::standard(id, data) {
            Some(frame) => frame,
            None => {
                warn!(id, len = data.len(), "frame event ignored: invalid identifier or payload");
                return;
            }
        },
        ScriptEvent::Heartbeat { node, .. } => CanFrame::heartbeat(node),
        ScriptEvent::Estop { .. } => CanFrame::estop(),
    };
    let disposition = system.receive_frame(&frame, now_ms, machine);
    debug!(id = frame.raw_id(), ?disposition, "frame event");
}
