//! Mathematical types shared between controller and worker.
//!
//! These are the canonical representations written into transform buffers
//! and scene objects. All of them are `Pod` so flat `f32` buffers can be
//! viewed as slices of them without copying.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// 3D Vector - position, velocity, scale, Euler angles
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// All-ones vector (unit scale)
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Unit Y vector
    pub const Y: Self = Self::new(0.0, 1.0, 0.0);

    /// Unit Z vector
    pub const Z: Self = Self::new(0.0, 0.0, 1.0);

    /// Converts to array
    #[must_use]
    pub const fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Length squared (avoids sqrt)
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// True when no component is NaN or infinite
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Quaternion for rotations, stored `x, y, z, w`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quaternion {
    /// Creates a new quaternion
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Builds a rotation from Euler angles in radians, applied in X, Y, Z order.
    #[must_use]
    pub fn from_euler(euler: Vec3) -> Self {
        let (s1, c1) = (euler.x * 0.5).sin_cos();
        let (s2, c2) = (euler.y * 0.5).sin_cos();
        let (s3, c3) = (euler.z * 0.5).sin_cos();

        Self::new(
            s1 * c2 * c3 + c1 * s2 * s3,
            c1 * s2 * c3 - s1 * c2 * s3,
            c1 * c2 * s3 + s1 * s2 * c3,
            c1 * c2 * c3 - s1 * s2 * s3,
        )
    }

    /// Length of the quaternion as a 4-vector
    #[must_use]
    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Returns the unit quaternion; a degenerate input yields identity.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return Self::IDENTITY;
        }
        let inv = 1.0 / len;
        Self::new(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
    }

    /// Rotates a vector by this quaternion.
    #[must_use]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }

    /// Advances the orientation by a world-space angular velocity over `dt`.
    #[must_use]
    pub fn integrate(self, angular_velocity: Vec3, dt: f32) -> Self {
        let spin = Self::new(angular_velocity.x, angular_velocity.y, angular_velocity.z, 0.0) * self;
        let half_dt = 0.5 * dt;
        Self::new(
            self.x + spin.x * half_dt,
            self.y + spin.y * half_dt,
            self.z + spin.z * half_dt,
            self.w + spin.w * half_dt,
        )
        .normalize()
    }

    /// True when no component is NaN or infinite
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Quaternion {
    type Output = Self;
    fn mul(self, b: Self) -> Self {
        let a = self;
        Self::new(
            a.x * b.w + a.w * b.x + a.y * b.z - a.z * b.y,
            a.y * b.w + a.w * b.y + a.z * b.x - a.x * b.z,
            a.z * b.w + a.w * b.z + a.x * b.y - a.y * b.x,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}

/// 4x4 matrix, column-major, as consumed by instanced renderers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Mat4 {
    /// Column-major elements
    pub cols: [f32; 16],
}

impl Mat4 {
    /// Identity matrix
    pub const IDENTITY: Self = Self {
        cols: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Composes translation * rotation * scale.
    #[must_use]
    pub fn compose(position: Vec3, rotation: Quaternion, scale: Vec3) -> Self {
        let Quaternion { x, y, z, w } = rotation;
        let (x2, y2, z2) = (x + x, y + y, z + z);
        let (xx, xy, xz) = (x * x2, x * y2, x * z2);
        let (yy, yz, zz) = (y * y2, y * z2, z * z2);
        let (wx, wy, wz) = (w * x2, w * y2, w * z2);

        Self {
            cols: [
                (1.0 - (yy + zz)) * scale.x,
                (xy + wz) * scale.x,
                (xz - wy) * scale.x,
                0.0,
                (xy - wz) * scale.y,
                (1.0 - (xx + zz)) * scale.y,
                (yz + wx) * scale.y,
                0.0,
                (xz + wy) * scale.z,
                (yz - wx) * scale.z,
                (1.0 - (xx + yy)) * scale.z,
                0.0,
                position.x,
                position.y,
                position.z,
                1.0,
            ],
        }
    }

    /// Translation column
    #[must_use]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.cols[12], self.cols[13], self.cols[14])
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Transform - position + rotation + scale
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Transform {
    /// Position
    pub position: Vec3,
    /// Rotation
    pub rotation: Quaternion,
    /// Scale (per axis)
    pub scale: Vec3,
}

impl Transform {
    /// Creates a new transform
    #[must_use]
    pub const fn new(position: Vec3, rotation: Quaternion, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(Vec3::ZERO, Quaternion::IDENTITY, Vec3::ONE);

    /// Matrix form of this transform
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::compose(self.position, self.rotation, self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        let sum = a + b;
        assert_eq!(sum, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(a.dot(b), 32.0);
        assert_eq!(Vec3::new(1.0, 0.0, 0.0).cross(Vec3::Y), Vec3::Z);
    }

    #[test]
    fn test_vec3_bytemuck() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let bytes: &[u8] = bytemuck::bytes_of(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(std::mem::size_of::<Quaternion>(), 16);
    }

    #[test]
    fn test_euler_zero_is_identity() {
        assert_eq!(Quaternion::from_euler(Vec3::ZERO), Quaternion::IDENTITY);
    }

    #[test]
    fn test_minus_quarter_turn_about_x_maps_z_to_y() {
        let q = Quaternion::from_euler(Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0));
        let v = q.rotate(Vec3::Z);
        assert!(approx(v.x, 0.0));
        assert!(approx(v.y, 1.0));
        assert!(approx(v.z, 0.0));
    }

    #[test]
    fn test_integrate_keeps_unit_length() {
        let mut q = Quaternion::IDENTITY;
        for _ in 0..600 {
            q = q.integrate(Vec3::new(0.3, 1.2, -0.7), 1.0 / 60.0);
        }
        assert!(approx(q.length(), 1.0));
    }

    #[test]
    fn test_degenerate_normalize_is_identity() {
        assert_eq!(Quaternion::new(0.0, 0.0, 0.0, 0.0).normalize(), Quaternion::IDENTITY);
    }

    #[test]
    fn test_compose_identity_rotation() {
        let m = Mat4::compose(Vec3::new(1.0, 2.0, 3.0), Quaternion::IDENTITY, Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(m.cols[0], 2.0);
        assert_eq!(m.cols[5], 3.0);
        assert_eq!(m.cols[10], 4.0);
        assert_eq!(m.translation(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(Transform::IDENTITY.to_matrix(), Mat4::IDENTITY);
    }
}
