//! # PHYSBRIDGE Shared
//!
//! Plain data types that cross the controller/worker boundary.
//!
//! ## CRITICAL RULE
//!
//! Nothing in this crate owns a thread, a channel or engine state. If a
//! type needs either side's runtime, it belongs in `physbridge_core` or
//! `physbridge_worker`.

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod constants;
pub mod identity;
pub mod math;
pub mod shapes;

pub use constants::{
    DEFAULT_CAPACITY, DEFAULT_GRAVITY, DEFAULT_STEP, DEFAULT_TOLERANCE, DISPLAY_RATE,
    ORIENTATION_STRIDE, POSITION_STRIDE,
};
pub use identity::{BodyId, ObjectId};
pub use math::{Mat4, Quaternion, Transform, Vec3};
pub use shapes::{box_full_to_half_extents, BodyDescriptor, ShapeArgs, ShapeKind};
