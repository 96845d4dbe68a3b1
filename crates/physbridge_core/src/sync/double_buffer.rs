//! # Controller-Side Double Buffering
//!
//! ## Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │        FrameBuffers         │
//!                    │                             │
//!                    │  ┌─────────┐  ┌─────────┐   │
//!                    │  │  front  │  │  back   │   │
//!                    │  │ (frame) │  │ (spare) │   │
//!                    │  └────┬────┘  └────┬────┘   │
//!                    └───────┼────────────┼────────┘
//!                            │            │ take_back()
//!                            ▼            ▼
//!                      ┌──────────┐  ┌──────────┐
//!                      │ Sampler  │  │  step →  │
//!                      │ (reads)  │  │  worker  │
//!                      └──────────┘  └──────────┘
//!
//!   frame arrives:  back  <- old front
//!                   front <- returned pair
//! ```
//!
//! The sampler always reads the most recent frame that has come home.
//! The spare pair is the one that goes out with the next `step`; while it
//! is away its slot holds the zero-length sentinel.

use super::TransformBufferPair;

/// Front/back transform pairs owned by the controller.
#[derive(Debug)]
pub struct FrameBuffers {
    /// Latest frame received from the worker.
    front: TransformBufferPair,
    /// Pair to send with the next step.
    back: TransformBufferPair,
    /// Frames received so far.
    frames_received: u64,
}

impl FrameBuffers {
    /// Creates the pair set. The front starts as an empty frame (no bodies);
    /// the back gets `slots` of storage ready to go out.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            front: TransformBufferPair::with_slots(slots),
            back: TransformBufferPair::with_slots(slots),
            frames_received: 0,
        }
    }

    /// True when the spare pair is home and can be sent.
    #[inline]
    #[must_use]
    pub fn can_send(&self) -> bool {
        !self.back.is_empty()
    }

    /// Takes the spare pair for a `step`, or `None` if it is with the worker.
    #[must_use]
    pub fn take_back(&mut self) -> Option<TransformBufferPair> {
        if self.back.is_empty() {
            return None;
        }
        Some(self.back.take())
    }

    /// Accepts a pair returned by the worker.
    ///
    /// The returned pair becomes the front frame; the previous front becomes
    /// the spare for the next step.
    pub fn receive(&mut self, returned: TransformBufferPair) {
        let previous = std::mem::replace(&mut self.front, returned);
        if self.back.is_empty() {
            self.back = previous;
        }
        self.frames_received += 1;
    }

    /// Latest frame for the sampler.
    #[inline]
    #[must_use]
    pub fn front(&self) -> &TransformBufferPair {
        &self.front
    }

    /// Read access to the spare pair (diagnostics and tests).
    #[inline]
    #[must_use]
    pub fn back(&self) -> &TransformBufferPair {
        &self.back
    }

    /// Frames received so far.
    #[inline]
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physbridge_shared::{Quaternion, Vec3};

    #[test]
    fn test_creation() {
        let buffers = FrameBuffers::new(8);
        assert!(buffers.can_send());
        assert_eq!(buffers.front().body_count(), 0);
        assert_eq!(buffers.frames_received(), 0);
    }

    #[test]
    fn test_back_is_sentinel_while_away() {
        let mut buffers = FrameBuffers::new(8);

        let away = buffers.take_back().unwrap();
        assert!(!buffers.can_send());
        assert_eq!(buffers.back().byte_len(), 0);
        assert!(away.byte_len() > 0);

        // A second take while the pair is away yields nothing
        assert!(buffers.take_back().is_none());
    }

    #[test]
    fn test_receive_swaps_front_and_back() {
        let mut buffers = FrameBuffers::new(8);

        let mut away = buffers.take_back().unwrap();
        away.prepare(1, 1);
        assert!(away.set(0, Vec3::new(0.0, 4.0, 0.0), Quaternion::IDENTITY));

        buffers.receive(away);
        assert_eq!(buffers.frames_received(), 1);
        assert_eq!(buffers.front().position(0), Some(Vec3::new(0.0, 4.0, 0.0)));
        assert!(buffers.can_send());
        assert!(buffers.back().byte_len() > 0);
    }

    #[test]
    fn test_exactly_one_side_holds_storage() {
        let mut buffers = FrameBuffers::new(4);
        for _ in 0..10 {
            let away = buffers.take_back().unwrap();
            assert_eq!(buffers.back().byte_len(), 0);
            assert!(away.byte_len() > 0);
            buffers.receive(away);
            assert!(buffers.back().byte_len() > 0);
        }
    }
}
