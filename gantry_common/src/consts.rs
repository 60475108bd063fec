//! System-wide constants for the gantry workspace.
//!
//! Single source of truth for the CAN identifier layout, fixed
//! collection capacities and timing defaults.

use static_assertions::const_assert;

// ─── CAN Identifier Layout ──────────────────────────────────────────

/// Width of a standard CAN identifier in bits.
pub const CAN_ID_LENGTH: u32 = 11;

/// Number of high identifier bits that select the message type.
pub const CAN_ID_TYPE_BITS: u32 = 7;

/// Number of addressable physical nodes (low identifier bits).
pub const CAN_PHYSICAL_NODE_MAX: u32 = 1 << (CAN_ID_LENGTH - CAN_ID_TYPE_BITS);

/// Largest valid standard identifier.
pub const CAN_ID_MAX: u32 = (1 << CAN_ID_LENGTH) - 1;

/// Node-field mask: the low `log2(CAN_PHYSICAL_NODE_MAX)` bits.
pub const CAN_NODE_FIELD_MASK: u32 = CAN_PHYSICAL_NODE_MAX - 1;

/// Node mask as computed by the legacy firmware: `1 << (CAN_PHYSICAL_NODE_MAX - 1)`.
///
/// Kept selectable until the intended mask is confirmed. With 11-bit
/// identifiers this mask yields node 0 for every frame.
pub const CAN_NODE_LEGACY_MASK: u32 = 1 << (CAN_PHYSICAL_NODE_MAX - 1);

/// Bus-wide emergency stop identifier.
pub const CAN_ESTOP_ID: u32 = 0;

/// Message-type base for heartbeat frames.
pub const CAN_HEARTBEAT_BASE: u32 = 62;

/// First heartbeat identifier (`heartbeat base * node count`).
pub const CAN_HEARTBEAT_ID_START: u32 = CAN_HEARTBEAT_BASE * CAN_PHYSICAL_NODE_MAX;

/// Message-type base for poll requests.
pub const CAN_POLL_BASE: u32 = 63;

/// First poll identifier (`poll base * node count`).
pub const CAN_POLL_ID_START: u32 = CAN_POLL_BASE * CAN_PHYSICAL_NODE_MAX;

/// Maximum CAN payload length in bytes.
pub const CAN_MAX_PAYLOAD: usize = 8;

const_assert!(CAN_PHYSICAL_NODE_MAX.is_power_of_two());
const_assert!(CAN_POLL_ID_START + CAN_PHYSICAL_NODE_MAX - 1 <= CAN_ID_MAX);
const_assert!(CAN_HEARTBEAT_ID_START + CAN_PHYSICAL_NODE_MAX <= CAN_POLL_ID_START);

// ─── Timing ─────────────────────────────────────────────────────────

/// Default debounce lockout after a committed input transition [ms].
pub const DEFAULT_LOCKOUT_MS: u16 = 10;

/// Default heartbeat timeout [ticks]. The node is unsafe once its
/// counter exceeds this value.
pub const DEFAULT_HEARTBEAT_TIMEOUT_TICKS: u32 = 100;

/// Default scheduler tick period in microseconds (1 kHz).
pub const DEFAULT_TICK_PERIOD_US: u64 = 1000;

// ─── Capacities ─────────────────────────────────────────────────────

/// Maximum number of locally wired digital inputs.
pub const MAX_LOCAL_INPUTS: usize = 32;

/// Maximum number of registered CAN nodes.
pub const MAX_CAN_NODES: usize = CAN_PHYSICAL_NODE_MAX as usize;

/// Maximum number of CAN endpoints across all nodes.
pub const MAX_CAN_ENDPOINTS: usize = 64;

/// Maximum number of endpoints attached to one node.
pub const MAX_ENDPOINTS_PER_NODE: usize = 16;

/// Interlock registry capacity: every input, node and endpoint may
/// contribute at most one entry (CAN inputs contribute two).
pub const MAX_INTERLOCKS: usize = MAX_LOCAL_INPUTS + MAX_CAN_NODES + 2 * MAX_CAN_ENDPOINTS;

/// Tick scheduler capacity: polled local inputs plus node heartbeats.
pub const MAX_TICK_TARGETS: usize = MAX_LOCAL_INPUTS + MAX_CAN_NODES;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gantry/io.toml";
