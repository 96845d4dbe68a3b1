//! Shape kinds, constructor arguments and body descriptors.
//!
//! These are sent to the worker with `addBody`/`addBodies`. The worker's
//! engine interprets them; nothing on the controller side depends on the
//! numbers beyond the initial transform.

use crate::math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape kind identifier
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Infinite plane, normal along local +Z
    Plane = 0,
    /// Box with half extents
    Box = 1,
    /// Cylinder along local Y
    Cylinder = 2,
    /// Height grid
    Heightfield = 3,
    /// Point mass
    Particle = 4,
    /// Sphere
    Sphere = 5,
    /// Triangle mesh
    Trimesh = 6,
}

impl ShapeKind {
    /// All kinds, in discriminant order
    pub const ALL: [Self; 7] = [
        Self::Plane,
        Self::Box,
        Self::Cylinder,
        Self::Heightfield,
        Self::Particle,
        Self::Sphere,
        Self::Trimesh,
    ];

    /// The arguments a body of this kind gets when the caller supplies none.
    #[must_use]
    pub fn default_args(self) -> ShapeArgs {
        match self {
            Self::Plane => ShapeArgs::Plane,
            Self::Box => ShapeArgs::Box {
                half_extents: Vec3::ONE,
            },
            Self::Cylinder => ShapeArgs::Cylinder {
                radius_top: 1.0,
                radius_bottom: 1.0,
                height: 1.0,
                segments: 8,
            },
            Self::Heightfield => ShapeArgs::Heightfield {
                data: Vec::new(),
                element_size: 1.0,
            },
            Self::Particle => ShapeArgs::Particle,
            Self::Sphere => ShapeArgs::Sphere { radius: 1.0 },
            Self::Trimesh => ShapeArgs::Trimesh {
                vertices: Vec::new(),
                indices: Vec::new(),
            },
        }
    }

    /// Normalization applied when the caller does not provide its own.
    ///
    /// Box sizes are given as full extents by the UI layer and the engine
    /// expects half extents; every other kind passes through.
    #[must_use]
    pub fn default_args_transform(self) -> fn(ShapeArgs) -> ShapeArgs {
        match self {
            Self::Box => box_full_to_half_extents,
            _ => std::convert::identity,
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plane => "Plane",
            Self::Box => "Box",
            Self::Cylinder => "Cylinder",
            Self::Heightfield => "Heightfield",
            Self::Particle => "Particle",
            Self::Sphere => "Sphere",
            Self::Trimesh => "Trimesh",
        };
        f.write_str(name)
    }
}

/// Halves the extents of a `Box` argument; other variants pass through.
#[must_use]
pub fn box_full_to_half_extents(args: ShapeArgs) -> ShapeArgs {
    match args {
        ShapeArgs::Box { half_extents } => ShapeArgs::Box {
            half_extents: half_extents * 0.5,
        },
        other => other,
    }
}

/// Kind-specific constructor arguments in the form the engine expects.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShapeArgs {
    /// Plane has no arguments
    Plane,
    /// Box
    ///
    /// Registrations using [`box_full_to_half_extents`] (the default for
    /// `Box`) pass full sizes in `half_extents`; the transform halves them
    /// before the descriptor is sent.
    Box {
        /// Half size along each local axis, as the engine reads it
        half_extents: Vec3,
    },
    /// Cylinder
    Cylinder {
        /// Radius at +Y
        radius_top: f32,
        /// Radius at -Y
        radius_bottom: f32,
        /// Height along Y
        height: f32,
        /// Tessellation of the convex hull
        segments: u32,
    },
    /// Heightfield
    Heightfield {
        /// Rows of heights
        data: Vec<Vec<f32>>,
        /// Distance between samples
        element_size: f32,
    },
    /// Particle has no arguments
    Particle,
    /// Sphere
    Sphere {
        /// Radius
        radius: f32,
    },
    /// Trimesh
    Trimesh {
        /// Flat `x, y, z` vertex positions
        vertices: Vec<f32>,
        /// Triangle indices into `vertices`
        indices: Vec<u32>,
    },
}

impl ShapeArgs {
    /// The kind these arguments construct.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Plane => ShapeKind::Plane,
            Self::Box { .. } => ShapeKind::Box,
            Self::Cylinder { .. } => ShapeKind::Cylinder,
            Self::Heightfield { .. } => ShapeKind::Heightfield,
            Self::Particle => ShapeKind::Particle,
            Self::Sphere { .. } => ShapeKind::Sphere,
            Self::Trimesh { .. } => ShapeKind::Trimesh,
        }
    }

    /// True when every number is finite and sizes are non-negative.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let size = |v: f32| v.is_finite() && v >= 0.0;
        match self {
            Self::Plane | Self::Particle => true,
            Self::Box { half_extents } => {
                size(half_extents.x) && size(half_extents.y) && size(half_extents.z)
            }
            Self::Cylinder {
                radius_top,
                radius_bottom,
                height,
                ..
            } => size(*radius_top) && size(*radius_bottom) && size(*height),
            Self::Heightfield { data, element_size } => {
                size(*element_size) && data.iter().flatten().all(|h| h.is_finite())
            }
            Self::Sphere { radius } => size(*radius),
            Self::Trimesh { vertices, indices } => {
                let vertex_count = vertices.len() / 3;
                vertices.len() % 3 == 0
                    && vertices.iter().all(|v| v.is_finite())
                    && indices.iter().all(|&i| (i as usize) < vertex_count)
            }
        }
    }
}

/// Initial properties of one body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyDescriptor {
    /// Mass; zero makes the body static
    pub mass: f32,
    /// Initial position
    pub position: Vec3,
    /// Initial rotation as Euler angles (radians, X then Y then Z)
    pub rotation: Vec3,
    /// Visual scale applied to the renderable; the engine ignores it
    pub scale: Vec3,
    /// Initial linear velocity
    pub velocity: Vec3,
    /// Initial angular velocity
    pub angular_velocity: Vec3,
    /// Fraction of linear velocity lost per second
    pub linear_damping: f32,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f32,
    /// Keep orientation constant regardless of angular velocity
    pub fixed_rotation: bool,
    /// Shape constructor arguments
    pub args: ShapeArgs,
}

impl BodyDescriptor {
    /// A static body of the given kind at the origin with default arguments.
    #[must_use]
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            mass: 0.0,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_damping: 0.01,
            angular_damping: 0.01,
            fixed_rotation: false,
            args: kind.default_args(),
        }
    }

    /// Sets the mass
    #[must_use]
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Sets the initial position
    #[must_use]
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the initial Euler rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the visual scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the initial velocity
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Sets the initial angular velocity
    #[must_use]
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Sets the shape arguments
    #[must_use]
    pub fn with_args(mut self, args: ShapeArgs) -> Self {
        self.args = args;
        self
    }

    /// True when every vector and scalar is finite and the mass is non-negative.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.mass.is_finite()
            && self.mass >= 0.0
            && self.position.is_finite()
            && self.rotation.is_finite()
            && self.scale.is_finite()
            && self.velocity.is_finite()
            && self.angular_velocity.is_finite()
            && self.linear_damping.is_finite()
            && self.angular_damping.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args_match_kind() {
        for kind in ShapeKind::ALL {
            assert_eq!(kind.default_args().kind(), kind);
            assert_eq!(BodyDescriptor::new(kind).args.kind(), kind);
        }
    }

    #[test]
    fn test_box_transform_halves_extents() {
        let full = ShapeArgs::Box {
            half_extents: Vec3::new(2.0, 4.0, 6.0),
        };
        let normalized = (ShapeKind::Box.default_args_transform())(full);
        assert_eq!(
            normalized,
            ShapeArgs::Box {
                half_extents: Vec3::new(1.0, 2.0, 3.0)
            }
        );

        let sphere = ShapeArgs::Sphere { radius: 0.5 };
        assert_eq!((ShapeKind::Sphere.default_args_transform())(sphere.clone()), sphere);
    }

    #[test]
    fn test_malformed_args() {
        assert!(!ShapeArgs::Sphere { radius: -1.0 }.is_well_formed());
        assert!(!ShapeArgs::Sphere { radius: f32::NAN }.is_well_formed());
        assert!(!ShapeArgs::Trimesh {
            vertices: vec![0.0, 0.0, 0.0],
            indices: vec![0, 1, 2],
        }
        .is_well_formed());
        assert!(ShapeKind::Heightfield.default_args().is_well_formed());
    }

    #[test]
    fn test_descriptor_rejects_negative_mass() {
        assert!(BodyDescriptor::new(ShapeKind::Box).with_mass(1.0).is_finite());
        assert!(!BodyDescriptor::new(ShapeKind::Box).with_mass(-1.0).is_finite());
    }
}
