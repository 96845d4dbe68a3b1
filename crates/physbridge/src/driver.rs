//! # Simulation Loop Driver
//!
//! ```text
//!            first body registered
//!   Idle ─────────── send init ──────────► Ready
//!                                          │  ▲
//!                         send step        │  │  frame arrives
//!                         (back pair away) ▼  │
//!                                     AwaitingFrame
//!
//!   any state ── terminate / worker lost ──► Halted
//! ```
//!
//! At most one `step` is in flight. A `step` is only built from the back
//! pair, and while that pair is with the worker its slot holds the
//! zero-length sentinel, so storage cannot be sent twice.

use physbridge_core::{ControllerMessage, FrameBuffers, TransformBufferPair};

/// Driver states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// No body registered yet; nothing sent.
    Idle,
    /// `init` sent and no step outstanding.
    Ready,
    /// A step is with the worker.
    AwaitingFrame,
    /// The session is over.
    Halted,
}

/// Controller-side pacing of the step/frame cycle.
#[derive(Debug)]
pub struct LoopDriver {
    state: DriverState,
    buffers: FrameBuffers,
    steps_sent: u64,
    unexpected_frames: u64,
}

impl LoopDriver {
    /// Creates an idle driver whose buffers start with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: DriverState::Idle,
            buffers: FrameBuffers::new(capacity.max(1)),
            steps_sent: 0,
            unexpected_frames: 0,
        }
    }

    /// Leaves `Idle`. Returns `true` exactly once, when `init` must be sent.
    pub fn activate(&mut self) -> bool {
        if self.state == DriverState::Idle {
            self.state = DriverState::Ready;
            true
        } else {
            false
        }
    }

    /// Builds the next `step`, if the cycle allows one now.
    pub fn next_step(&mut self) -> Option<ControllerMessage> {
        if self.state != DriverState::Ready {
            return None;
        }
        let buffers = self.buffers.take_back()?;
        self.state = DriverState::AwaitingFrame;
        self.steps_sent += 1;
        Some(ControllerMessage::Step { buffers })
    }

    /// Takes back a pair returned by the worker.
    pub fn on_frame(&mut self, buffers: TransformBufferPair) {
        match self.state {
            DriverState::AwaitingFrame => {
                self.buffers.receive(buffers);
                self.state = DriverState::Ready;
            }
            DriverState::Halted => {
                tracing::trace!("frame after halt discarded");
            }
            DriverState::Idle | DriverState::Ready => {
                tracing::warn!(state = ?self.state, "frame without an outstanding step");
                self.unexpected_frames += 1;
                self.buffers.receive(buffers);
            }
        }
    }

    /// Stops the cycle for good.
    pub fn halt(&mut self) {
        if self.state != DriverState::Halted {
            tracing::debug!(steps = self.steps_sent, "loop driver halted");
        }
        self.state = DriverState::Halted;
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Steps sent whose frame has not come back (0 or 1).
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        usize::from(self.state == DriverState::AwaitingFrame)
    }

    /// Latest frame for the sampler.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &TransformBufferPair {
        self.buffers.front()
    }

    /// Both pairs (ownership diagnostics).
    #[must_use]
    pub fn buffers(&self) -> &FrameBuffers {
        &self.buffers
    }

    /// Steps sent so far.
    #[must_use]
    pub fn steps_sent(&self) -> u64 {
        self.steps_sent
    }

    /// Frames that arrived with no step outstanding.
    #[must_use]
    pub fn unexpected_frames(&self) -> u64 {
        self.unexpected_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take_buffers(message: ControllerMessage) -> TransformBufferPair {
        match message {
            ControllerMessage::Step { buffers } => buffers,
            other => panic!("expected step, got {}", other.op()),
        }
    }

    #[test]
    fn test_idle_until_activated() {
        let mut driver = LoopDriver::new(4);
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(driver.next_step().is_none());

        assert!(driver.activate());
        assert!(!driver.activate());
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn test_one_step_in_flight() {
        let mut driver = LoopDriver::new(4);
        driver.activate();

        let away = take_buffers(driver.next_step().unwrap());
        assert_eq!(driver.in_flight(), 1);
        assert!(driver.next_step().is_none());
        assert!(driver.next_step().is_none());
        assert_eq!(driver.steps_sent(), 1);

        driver.on_frame(away);
        assert_eq!(driver.in_flight(), 0);
        assert!(driver.next_step().is_some());
    }

    #[test]
    fn test_ownership_alternates() {
        let mut driver = LoopDriver::new(4);
        driver.activate();

        for _ in 0..20 {
            let away = take_buffers(driver.next_step().unwrap());
            assert_eq!(driver.buffers().back().byte_len(), 0);
            assert!(away.byte_len() > 0);
            driver.on_frame(away);
            assert!(driver.buffers().back().byte_len() > 0);
            assert!(driver.in_flight() <= 1);
        }
    }

    #[test]
    fn test_halt_is_terminal() {
        let mut driver = LoopDriver::new(4);
        driver.activate();
        let away = take_buffers(driver.next_step().unwrap());

        driver.halt();
        driver.on_frame(away);
        assert_eq!(driver.state(), DriverState::Halted);
        assert!(driver.next_step().is_none());
        assert!(!driver.activate());
    }

    #[test]
    fn test_zero_capacity_still_has_storage() {
        let mut driver = LoopDriver::new(0);
        driver.activate();
        assert!(driver.next_step().is_some());
    }
}
