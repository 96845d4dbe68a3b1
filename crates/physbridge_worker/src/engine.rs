//! # Physics Engine Seam
//!
//! The solver behind the worker is opaque. The worker only needs to hand
//! it descriptors, advance it, and read back transforms in a stable order.
//!
//! ```text
//! Worker defines:          Engine implements:
//! ┌────────────────────┐   ┌──────────────────────┐
//! │ trait PhysicsEngine│ ←─│ impl for ReferenceEng│
//! └────────────────────┘   └──────────────────────┘
//! ```

use physbridge_core::TransformBufferPair;
use physbridge_shared::{
    BodyDescriptor, BodyId, Quaternion, ShapeKind, Vec3, DEFAULT_GRAVITY, DEFAULT_STEP,
    DEFAULT_TOLERANCE,
};

/// Parameters delivered by `init`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParams {
    /// Gravity vector
    pub gravity: Vec3,
    /// Contact tolerance
    pub tolerance: f32,
    /// Fixed step in seconds
    pub step: f32,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            tolerance: DEFAULT_TOLERANCE,
            step: DEFAULT_STEP,
        }
    }
}

/// Interface to the solver that runs inside the worker.
///
/// Bodies are kept in a stable order; ordinal `i` in
/// [`body_ids`](Self::body_ids) is the slot `write_transforms` fills for
/// that body.
pub trait PhysicsEngine: Send {
    /// Applies (or re-applies) simulation parameters.
    fn configure(&mut self, params: EngineParams);

    /// Inserts a body. Returns `false` if `id` already exists.
    fn add_body(&mut self, id: BodyId, kind: ShapeKind, descriptor: &BodyDescriptor) -> bool;

    /// Removes a body. Returns `false` if `id` is unknown.
    fn remove_body(&mut self, id: BodyId) -> bool;

    /// Teleports a body. Returns `false` if `id` is unknown.
    fn set_position(&mut self, id: BodyId, position: Vec3) -> bool;

    /// Re-orients a body. Returns `false` if `id` is unknown.
    fn set_rotation(&mut self, id: BodyId, rotation: Quaternion) -> bool;

    /// Advances one fixed step.
    fn step(&mut self);

    /// Live bodies in ordinal order.
    fn body_ids(&self) -> Vec<BodyId>;

    /// Number of live bodies.
    fn body_count(&self) -> usize;

    /// Writes every body's transform at its ordinal.
    ///
    /// The caller has already prepared `buffers` for
    /// [`body_count`](Self::body_count) bodies.
    fn write_transforms(&self, buffers: &mut TransformBufferPair);
}
