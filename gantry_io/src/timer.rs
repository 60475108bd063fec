//! Millisecond deadlines.
//!
//! Time is passed in explicitly as a monotonic millisecond count so that
//! the state machines stay deterministic under test.

/// A one-shot deadline that is either armed or clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timeout {
    deadline_ms: Option<u64>,
}

impl Timeout {
    pub const fn new() -> Self {
        Self { deadline_ms: None }
    }

    /// Arm the deadline `duration_ms` after `now_ms`.
    #[inline]
    pub fn set(&mut self, now_ms: u64, duration_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(duration_ms));
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deadline_ms = None;
    }

    #[inline]
    pub const fn is_set(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Whether an armed deadline has been reached. Inclusive: `now == deadline` is past.
    #[inline]
    pub fn is_past(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|d| now_ms >= d)
    }

    /// Armed and not yet reached.
    #[inline]
    pub fn is_running(&self, now_ms: u64) -> bool {
        self.is_set() && !self.is_past(now_ms)
    }

    /// Milliseconds until the deadline, zero once past or when clear.
    pub fn remaining(&self, now_ms: u64) -> u64 {
        self.deadline_ms.map_or(0, |d| d.saturating_sub(now_ms))
    }
}
