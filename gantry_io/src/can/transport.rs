//! Outbound frame transport.

use heapless::Vec;
use thiserror::Error;

use super::frame::CanFrame;

/// Transmit failure reported by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transmit queue full")]
    QueueFull,

    #[error("controller is bus-off")]
    BusOff,
}

/// Hands frames to the CAN controller.
pub trait CanTransport {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError>;
}

impl<T: CanTransport + ?Sized> CanTransport for &mut T {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        (**self).send(frame)
    }
}

/// Transport that records up to `N` frames in memory.
///
/// Used by the simulator and in tests. Reports [`TransportError::QueueFull`]
/// once `N` frames are pending; [`FrameLog::drain`] empties it.
#[derive(Debug, Clone, Default)]
pub struct FrameLog<const N: usize> {
    sent: Vec<CanFrame, N>,
}

impl<const N: usize> FrameLog<N> {
    pub const fn new() -> Self {
        Self { sent: Vec::new() }
    }

    /// Pending frames, oldest first.
    pub fn sent(&self) -> &[CanFrame] {
        &self.sent
    }

    /// Take every pending frame.
    pub fn drain(&mut self) -> Vec<CanFrame, N> {
        core::mem::take(&mut self.sent)
    }

    pub fn clear(&mut self) {
        self.sent.clear();
    }
}

impl<const N: usize> CanTransport for FrameLog<N> {
    fn send(&mut self, frame: &CanFrame) -> Result<(), TransportError> {
        self.sent.push(*frame).map_err(|_| TransportError::QueueFull)
    }
}
