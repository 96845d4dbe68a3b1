//! # Session Constants
//!
//! Defaults shared by the controller and the worker.

use crate::math::Vec3;

/// Floats per body in the positions buffer (x, y, z)
pub const POSITION_STRIDE: usize = 3;

/// Floats per body in the orientations buffer (x, y, z, w)
pub const ORIENTATION_STRIDE: usize = 4;

/// Display refresh rate the controller is paced against
pub const DISPLAY_RATE: u32 = 60;

/// Default fixed simulation step in seconds
pub const DEFAULT_STEP: f32 = 1.0 / 60.0;

/// Default solver tolerance
pub const DEFAULT_TOLERANCE: f32 = 0.001;

/// Default gravity (metres per second squared)
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

/// Default number of body slots allocated in each transform buffer
pub const DEFAULT_CAPACITY: usize = 1000;
