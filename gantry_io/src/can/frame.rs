//! CAN frame.
//!
//! Standard 11-bit identifiers split into a message-type field (high 7
//! bits) and a physical-node field (low 4 bits). Reserved identifiers:
//!
//! | identifier                  | meaning               |
//! |-----------------------------|-----------------------|
//! | `0`                         | bus-wide Estop        |
//! | `62 * 16 + node`            | heartbeat from `node` |
//! | `63 * 16 + node`            | poll request, no data |
//!
//! The payload is eight bytes, readable as bytes, two 32-bit words or four
//! 16-bit words (little-endian).

use embedded_can::{ExtendedId, Id, StandardId};
use gantry_common::consts::{
    CAN_ESTOP_ID, CAN_HEARTBEAT_ID_START, CAN_ID_MAX, CAN_MAX_PAYLOAD, CAN_NODE_FIELD_MASK,
    CAN_POLL_ID_START,
};
use gantry_common::io::config::NodeIdMask;
use static_assertions::const_assert_eq;

/// Largest 29-bit identifier.
const EXTENDED_ID_MAX: u32 = 0x1FFF_FFFF;

// Word views cover the payload exactly.
const_assert_eq!(CAN_MAX_PAYLOAD, 2 * size_of::<u32>());
const_assert_eq!(CAN_MAX_PAYLOAD, 4 * size_of::<u16>());

// ─── Payload ────────────────────────────────────────────────────────

/// Eight-byte frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Payload([u8; CAN_MAX_PAYLOAD]);

impl Payload {
    pub const fn new(bytes: [u8; CAN_MAX_PAYLOAD]) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; CAN_MAX_PAYLOAD] {
        &self.0
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8; CAN_MAX_PAYLOAD] {
        &mut self.0
    }

    #[inline]
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// 32-bit word `index` (0 or 1).
    pub fn word32(&self, index: usize) -> Option<u32> {
        let start = index.checked_mul(4)?;
        let bytes = self.0.get(start..start + 4)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Write 32-bit word `index`. Returns `false` if out of range.
    pub fn set_word32(&mut self, index: usize, value: u32) -> bool {
        match index
            .checked_mul(4)
            .and_then(|start| self.0.get_mut(start..start + 4))
        {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }

    /// 16-bit word `index` (0 to 3).
    pub fn word16(&self, index: usize) -> Option<u16> {
        let start = index.checked_mul(2)?;
        let bytes = self.0.get(start..start + 2)?;
        Some(u16::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Write 16-bit word `index`. Returns `false` if out of range.
    pub fn set_word16(&mut self, index: usize, value: u16) -> bool {
        match index
            .checked_mul(2)
            .and_then(|start| self.0.get_mut(start..start + 2))
        {
            Some(slot) => {
                slot.copy_from_slice(&value.to_le_bytes());
                true
            }
            None => false,
        }
    }
}

// ─── CanFrame ───────────────────────────────────────────────────────

/// One CAN frame as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanFrame {
    id: u32,
    family_id: u8,
    rtr: bool,
    priority: u8,
    extended: bool,
    timestamp: u16,
    len: u8,
    payload: Payload,
}

impl CanFrame {
    const fn empty(id: u32) -> Self {
        Self {
            id,
            family_id: 0,
            rtr: false,
            priority: 0,
            extended: false,
            timestamp: 0,
            len: 0,
            payload: Payload([0; CAN_MAX_PAYLOAD]),
        }
    }

    /// Standard data frame. `None` if `id > 0x7FF` or `data` exceeds 8 bytes.
    pub fn standard(id: u16, data: &[u8]) -> Option<Self> {
        if u32::from(id) > CAN_ID_MAX || data.len() > CAN_MAX_PAYLOAD {
            return None;
        }
        let mut frame = Self::empty(u32::from(id));
        frame.payload.0[..data.len()].copy_from_slice(data);
        frame.len = data.len() as u8;
        Some(frame)
    }

    /// Zero-length poll request addressed to `node_id`.
    pub const fn poll(node_id: u8) -> Self {
        Self::empty(CAN_POLL_ID_START + (node_id as u32 & CAN_NODE_FIELD_MASK))
    }

    /// Heartbeat frame from `node_id`.
    pub const fn heartbeat(node_id: u8) -> Self {
        Self::empty(CAN_HEARTBEAT_ID_START + (node_id as u32 & CAN_NODE_FIELD_MASK))
    }

    /// Bus-wide emergency stop.
    pub const fn estop() -> Self {
        Self::empty(CAN_ESTOP_ID)
    }

    pub const fn with_timestamp(mut self, timestamp: u16) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub const fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub const fn with_family_id(mut self, family_id: u8) -> Self {
        self.family_id = family_id;
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Raw identifier (11 or 29 bits).
    #[inline]
    pub const fn raw_id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub const fn family_id(&self) -> u8 {
        self.family_id
    }

    #[inline]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    /// Receive timestamp (driver ticks).
    #[inline]
    pub const fn timestamp(&self) -> u16 {
        self.timestamp
    }

    /// Payload length in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    #[inline]
    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    /// The `len` valid payload bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.payload.0[..self.len()]
    }

    /// Remote-request frame. Carries no data.
    #[inline]
    pub const fn is_remote(&self) -> bool {
        self.rtr
    }

    /// Identifier 0, standard or extended.
    #[inline]
    pub const fn is_estop(&self) -> bool {
        self.id == CAN_ESTOP_ID
    }

    /// Identifier masked to the node field.
    #[inline]
    pub const fn masked_node(&self, mask: NodeIdMask) -> u32 {
        self.id & mask.bits()
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_MAX_PAYLOAD {
            return None;
        }
        let (raw, extended) = split_id(id.into());
        let mut frame = Self::empty(raw);
        frame.extended = extended;
        frame.payload.0[..data.len()].copy_from_slice(data);
        frame.len = data.len() as u8;
        Some(frame)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_MAX_PAYLOAD {
            return None;
        }
        let (raw, extended) = split_id(id.into());
        let mut frame = Self::empty(raw);
        frame.extended = extended;
        frame.rtr = true;
        frame.len = dlc as u8;
        Some(frame)
    }

    fn is_extended(&self) -> bool {
        self.extended
    }

    fn is_remote_frame(&self) -> bool {
        self.is_remote()
    }

    fn id(&self) -> Id {
        if self.extended {
            Id::Extended(ExtendedId::new(self.id & EXTENDED_ID_MAX).unwrap_or(ExtendedId::ZERO))
        } else {
            Id::Standard(StandardId::new((self.id & CAN_ID_MAX) as u16).unwrap_or(StandardId::ZERO))
        }
    }

    fn dlc(&self) -> usize {
        self.len()
    }

    fn data(&self) -> &[u8] {
        if self.rtr { &[] } else { self.bytes() }
    }
}

fn split_id(id: Id) -> (u32, bool) {
    match id {
        Id::Standard(id) => (u32::from(id.as_raw()), false),
        Id::Extended(id) => (id.as_raw(), true),
    }
}
