//! # Transform Buffer Pair
//!
//! Flat position/orientation storage that moves between controller and
//! worker by value.
//!
//! ## Layout
//!
//! ```text
//! positions:    [x0 y0 z0 | x1 y1 z1 | ... ]        stride 3
//! orientations: [x0 y0 z0 w0 | x1 y1 z1 w1 | ... ]  stride 4
//!                 ^ ordinal 0    ^ ordinal 1
//! ```
//!
//! Storage has a number of *slots* (capacity); only the first `body_count`
//! slots hold data for the body layout the pair is stamped with.
//!
//! ## Ownership
//!
//! The pair is not `Clone`. Handing it to the other side is a move, and
//! [`TransformBufferPair::take`] leaves a zero-length sentinel behind, so the
//! side that gave it away can observe that it no longer owns any storage.

use physbridge_shared::{Quaternion, Vec3, ORIENTATION_STRIDE, POSITION_STRIDE};

/// Positions and orientations for every live body, indexed by ordinal.
#[derive(Debug, Default, PartialEq)]
pub struct TransformBufferPair {
    positions: Vec<f32>,
    orientations: Vec<f32>,
    body_count: usize,
    generation: u64,
}

impl TransformBufferPair {
    /// Allocates a pair with `slots` bodies worth of storage.
    ///
    /// Orientations start at identity so an unfilled slot is a valid pose.
    #[must_use]
    pub fn with_slots(slots: usize) -> Self {
        let mut orientations = vec![0.0; slots * ORIENTATION_STRIDE];
        for q in bytemuck::cast_slice_mut::<f32, Quaternion>(&mut orientations) {
            *q = Quaternion::IDENTITY;
        }

        Self {
            positions: vec![0.0; slots * POSITION_STRIDE],
            orientations,
            body_count: 0,
            generation: 0,
        }
    }

    /// Number of body slots in storage.
    #[inline]
    #[must_use]
    pub fn slots(&self) -> usize {
        self.positions.len() / POSITION_STRIDE
    }

    /// True when this is the zero-length sentinel left behind by a transfer.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.orientations.is_empty()
    }

    /// Total bytes of storage held by this side.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        bytemuck::cast_slice::<f32, u8>(&self.positions).len()
            + bytemuck::cast_slice::<f32, u8>(&self.orientations).len()
    }

    /// Number of leading slots filled by the last [`prepare`](Self::prepare).
    #[inline]
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.body_count
    }

    /// Topology generation the contents were produced under.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Moves the storage out, leaving the zero-length sentinel in `self`.
    #[must_use]
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    /// Readies the pair to receive `body_count` transforms for layout
    /// `generation`, growing storage if there are more bodies than slots.
    pub fn prepare(&mut self, generation: u64, body_count: usize) {
        let slots = self.slots();
        if body_count > slots {
            let grown = body_count.next_power_of_two().max(slots * 2);
            self.positions.resize(grown * POSITION_STRIDE, 0.0);
            let old_len = self.orientations.len();
            self.orientations.resize(grown * ORIENTATION_STRIDE, 0.0);
            for q in bytemuck::cast_slice_mut::<f32, Quaternion>(&mut self.orientations[old_len..]) {
                *q = Quaternion::IDENTITY;
            }
        }
        self.body_count = body_count;
        self.generation = generation;
    }

    /// Writes the transform for `ordinal`.
    ///
    /// Returns `false` (and writes nothing) when `ordinal` is outside the
    /// prepared body count.
    pub fn set(&mut self, ordinal: usize, position: Vec3, orientation: Quaternion) -> bool {
        if ordinal >= self.body_count {
            return false;
        }
        bytemuck::cast_slice_mut::<f32, Vec3>(&mut self.positions)[ordinal] = position;
        bytemuck::cast_slice_mut::<f32, Quaternion>(&mut self.orientations)[ordinal] = orientation;
        true
    }

    /// Position of `ordinal`, if it is within the filled range.
    #[must_use]
    pub fn position(&self, ordinal: usize) -> Option<Vec3> {
        if ordinal >= self.body_count {
            return None;
        }
        bytemuck::cast_slice::<f32, Vec3>(&self.positions).get(ordinal).copied()
    }

    /// Orientation of `ordinal`, if it is within the filled range.
    #[must_use]
    pub fn orientation(&self, ordinal: usize) -> Option<Quaternion> {
        if ordinal >= self.body_count {
            return None;
        }
        bytemuck::cast_slice::<f32, Quaternion>(&self.orientations)
            .get(ordinal)
            .copied()
    }
}
