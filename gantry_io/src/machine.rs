//! Machine-control interface.
//!
//! [`MachineControl`] is everything the input layer asks of the motion
//! side: holds, halts, escalating faults, encoder snapshots and status
//! reports. [`MachineLatch`] is the in-process implementation: it records
//! each request as a [`MachineRequest`] flag and tracks the highest
//! [`Severity`] reached, which only an explicit [`MachineLatch::clear`]
//! lowers again.

use bitflags::bitflags;
use core::fmt;
use tracing::{debug, error, info, warn};

/// Why a fault was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultReason {
    /// A digital input with an `alarm`/`shutdown`/`panic` action fired.
    Input(u16),
    /// Bus-wide emergency stop frame (identifier 0).
    CanEstop,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input(pin) => write!(f, "input {pin}"),
            Self::CanEstop => write!(f, "CAN Estop"),
        }
    }
}

/// Status report scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReportRequest {
    /// Coalesced with other requests; sent at the next report interval.
    Timed,
    /// Sent as soon as possible.
    Immediate,
}

/// Services the input layer requires from machine control.
pub trait MachineControl {
    /// Feed hold.
    fn request_hold(&mut self);
    /// Stop all motion, spindle and coolant.
    fn halt_all(&mut self);
    fn raise_alarm(&mut self, reason: FaultReason);
    fn raise_shutdown(&mut self, reason: FaultReason);
    fn raise_panic(&mut self, reason: FaultReason);
    fn hard_reset(&mut self);
    /// Capture axis positions at the current instant (homing/probing).
    fn take_encoder_snapshot(&mut self);
    fn request_status_report(&mut self, request: StatusReportRequest);
    /// Record `pin` as the active limit switch.
    fn record_limit(&mut self, pin: u16);
    /// Record `pin` as the active shutdown input.
    fn record_shutdown_input(&mut self, pin: u16);
    /// Whether the machine is still initializing (settings writes skip the input reset).
    fn is_initializing(&self) -> bool {
        false
    }
}

// ─── MachineLatch ───────────────────────────────────────────────────

bitflags! {
    /// Requests issued since the last clear.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MachineRequest: u16 {
        const HOLD             = 0x0001;
        const HALT             = 0x0002;
        const ALARM            = 0x0004;
        const SHUTDOWN         = 0x0008;
        const PANIC            = 0x0010;
        const HARD_RESET       = 0x0020;
        const ENCODER_SNAPSHOT = 0x0040;
        const STATUS_REPORT    = 0x0080;
        const LIMIT            = 0x0100;
        const SHUTDOWN_INPUT   = 0x0200;
    }
}

impl MachineRequest {
    /// Requests that stop motion.
    pub const STOPPING: Self = Self::HOLD
        .union(Self::HALT)
        .union(Self::ALARM)
        .union(Self::SHUTDOWN)
        .union(Self::PANIC)
        .union(Self::HARD_RESET);

    /// Highest severity among the set flags.
    pub fn severity(self) -> Severity {
        if self.contains(Self::HARD_RESET) {
            Severity::HardReset
        } else if self.contains(Self::PANIC) {
            Severity::Panic
        } else if self.contains(Self::SHUTDOWN) {
            Severity::Shutdown
        } else if self.contains(Self::ALARM) {
            Severity::Alarm
        } else if self.contains(Self::HALT) {
            Severity::Halt
        } else if self.contains(Self::HOLD) {
            Severity::Hold
        } else {
            Severity::Normal
        }
    }
}

/// Escalation ladder. Ordered: a later variant is strictly more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Normal,
    Hold,
    Halt,
    Alarm,
    Shutdown,
    Panic,
    HardReset,
}

/// Latching [`MachineControl`] implementation.
#[derive(Debug, Clone, Default)]
pub struct MachineLatch {
    requests: MachineRequest,
    unseen: MachineRequest,
    severity: Severity,
    last_fault: Option<FaultReason>,
    limit_pin: Option<u16>,
    shutdown_pin: Option<u16>,
    snapshots: u32,
    status_reports: u32,
    initializing: bool,
}

impl MachineLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch that reports the initialization phase.
    pub fn initializing() -> Self {
        Self {
            initializing: true,
            ..Self::default()
        }
    }

    pub fn set_initializing(&mut self, initializing: bool) {
        self.initializing = initializing;
    }

    #[inline]
    pub fn requests(&self) -> MachineRequest {
        self.requests
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[inline]
    pub fn last_fault(&self) -> Option<FaultReason> {
        self.last_fault
    }

    #[inline]
    pub fn limit_pin(&self) -> Option<u16> {
        self.limit_pin
    }

    #[inline]
    pub fn shutdown_pin(&self) -> Option<u16> {
        self.shutdown_pin
    }

    #[inline]
    pub fn snapshot_count(&self) -> u32 {
        self.snapshots
    }

    #[inline]
    pub fn status_report_count(&self) -> u32 {
        self.status_reports
    }

    /// Requests raised since the previous call.
    pub fn take_new(&mut self) -> MachineRequest {
        core::mem::replace(&mut self.unseen, MachineRequest::empty())
    }

    /// External reset: drop every latched request and return to `Normal`.
    pub fn clear(&mut self) {
        info!(severity = ?self.severity, "machine latch cleared");
        let initializing = self.initializing;
        *self = Self {
            initializing,
            ..Self::default()
        };
    }

    fn latch(&mut self, request: MachineRequest) {
        self.requests |= request;
        self.unseen |= request;
        let severity = request.severity();
        if severity > self.severity {
            self.severity = severity;
        }
    }

    fn fault(&mut self, request: MachineRequest, reason: FaultReason) {
        self.last_fault = Some(reason);
        self.latch(request);
    }
}

impl MachineControl for MachineLatch {
    fn request_hold(&mut self) {
        debug!("feed hold requested");
        self.latch(MachineRequest::HOLD);
    }

    fn halt_all(&mut self) {
        warn!("halt requested");
        self.latch(MachineRequest::HALT);
    }

    fn raise_alarm(&mut self, reason: FaultReason) {
        warn!(%reason, "alarm");
        self.fault(MachineRequest::ALARM, reason);
    }

    fn raise_shutdown(&mut self, reason: FaultReason) {
        error!(%reason, "shutdown");
        self.fault(MachineRequest::SHUTDOWN, reason);
    }

    fn raise_panic(&mut self, reason: FaultReason) {
        error!(%reason, "panic");
        self.fault(MachineRequest::PANIC, reason);
    }

    fn hard_reset(&mut self) {
        warn!("hard reset requested");
        self.latch(MachineRequest::HARD_RESET);
    }

    fn take_encoder_snapshot(&mut self) {
        self.snapshots = self.snapshots.saturating_add(1);
        self.latch(MachineRequest::ENCODER_SNAPSHOT);
    }

    fn request_status_report(&mut self, _request: StatusReportRequest) {
        self.status_reports = self.status_reports.saturating_add(1);
        self.latch(MachineRequest::STATUS_REPORT);
    }

    fn record_limit(&mut self, pin: u16) {
        debug!(pin, "limit switch hit");
        self.limit_pin = Some(pin);
        self.latch(MachineRequest::LIMIT);
    }

    fn record_shutdown_input(&mut self, pin: u16) {
        debug!(pin, "shutdown input active");
        self.shutdown_pin = Some(pin);
        self.latch(MachineRequest::SHUTDOWN_INPUT);
    }

    fn is_initializing(&self) -> bool {
        self.initializing
    }
}
