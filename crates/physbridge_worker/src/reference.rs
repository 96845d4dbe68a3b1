//! # Reference Engine
//!
//! Deterministic stand-in for the solver:
//! - semi-implicit Euler integration of gravity, damping and spin
//! - mass 0 bodies are static and never integrate
//! - dynamic spheres, boxes, cylinders and particles rest on static planes
//!
//! Bodies live in insertion order. Removing one keeps the order of the
//! rest, so ordinals only shift for bodies after the removed one.

use std::collections::HashMap;

use physbridge_core::TransformBufferPair;
use physbridge_shared::{BodyDescriptor, BodyId, Quaternion, ShapeArgs, ShapeKind, Vec3};

use crate::engine::{EngineParams, PhysicsEngine};

// ============================================================================
// BODY STATE
// ============================================================================

#[derive(Clone, Debug)]
struct Body {
    id: BodyId,
    kind: ShapeKind,
    args: ShapeArgs,
    mass: f32,
    position: Vec3,
    rotation: Quaternion,
    velocity: Vec3,
    angular_velocity: Vec3,
    linear_damping: f32,
    angular_damping: f32,
    fixed_rotation: bool,
}

impl Body {
    fn new(id: BodyId, kind: ShapeKind, descriptor: &BodyDescriptor) -> Self {
        Self {
            id,
            kind,
            args: descriptor.args.clone(),
            mass: descriptor.mass,
            position: descriptor.position,
            rotation: Quaternion::from_euler(descriptor.rotation),
            velocity: descriptor.velocity,
            angular_velocity: descriptor.angular_velocity,
            linear_damping: descriptor.linear_damping.clamp(0.0, 1.0),
            angular_damping: descriptor.angular_damping.clamp(0.0, 1.0),
            fixed_rotation: descriptor.fixed_rotation,
        }
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        self.mass > 0.0
    }

    /// Distance from the centre to the surface along `-normal`.
    fn support_extent(&self, normal: Vec3) -> Option<f32> {
        match &self.args {
            ShapeArgs::Sphere { radius } => Some(*radius),
            ShapeArgs::Particle => Some(0.0),
            ShapeArgs::Box { half_extents } => {
                let axes = [
                    self.rotation.rotate(Vec3::new(1.0, 0.0, 0.0)),
                    self.rotation.rotate(Vec3::Y),
                    self.rotation.rotate(Vec3::Z),
                ];
                let halves = half_extents.to_array();
                Some(
                    axes.iter()
                        .zip(halves)
                        .map(|(axis, half)| axis.dot(normal).abs() * half)
                        .sum(),
                )
            }
            ShapeArgs::Cylinder {
                radius_top,
                radius_bottom,
                height,
                ..
            } => {
                let along = self.rotation.rotate(Vec3::Y).dot(normal).abs();
                let across = (1.0 - along * along).max(0.0).sqrt();
                Some(radius_top.max(*radius_bottom) * across + height * 0.5 * along)
            }
            _ => None,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Small built-in solver used by default and in tests.
#[derive(Debug, Default)]
pub struct ReferenceEngine {
    params: EngineParams,
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
}

impl ReferenceEngine {
    /// Creates an empty engine with default parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of a body.
    #[must_use]
    pub fn position(&self, id: BodyId) -> Option<Vec3> {
        self.index.get(&id).map(|&i| self.bodies[i].position)
    }

    /// Orientation of a body.
    #[must_use]
    pub fn rotation(&self, id: BodyId) -> Option<Quaternion> {
        self.index.get(&id).map(|&i| self.bodies[i].rotation)
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        let i = *self.index.get(&id)?;
        self.bodies.get_mut(i)
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.index
            .extend(self.bodies.iter().enumerate().map(|(i, body)| (body.id, i)));
    }

    fn integrate(&mut self) {
        let dt = self.params.step;
        let gravity = self.params.gravity;

        for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
            body.velocity += gravity * dt;
            body.velocity = body.velocity * (1.0 - body.linear_damping).powf(dt);
            body.position += body.velocity * dt;

            if !body.fixed_rotation {
                body.angular_velocity =
                    body.angular_velocity * (1.0 - body.angular_damping).powf(dt);
                body.rotation = body.rotation.integrate(body.angular_velocity, dt);
            }
        }
    }

    fn resolve_plane_contacts(&mut self) {
        let planes: Vec<(Vec3, Vec3)> = self
            .bodies
            .iter()
            .filter(|b| b.kind == ShapeKind::Plane && !b.is_dynamic())
            .map(|b| (b.position, b.rotation.rotate(Vec3::Z)))
            .collect();
        if planes.is_empty() {
            return;
        }

        let slop = self.params.tolerance;
        for body in self.bodies.iter_mut().filter(|b| b.is_dynamic()) {
            for &(origin, normal) in &planes {
                let Some(extent) = body.support_extent(normal) else {
                    continue;
                };
                let distance = (body.position - origin).dot(normal);
                let penetration = extent - distance;
                if penetration <= slop {
                    continue;
                }

                body.position += normal * (penetration - slop);
                let approach = body.velocity.dot(normal);
                if approach < 0.0 {
                    body.velocity = body.velocity - normal * approach;
                }
            }
        }
    }
}

impl PhysicsEngine for ReferenceEngine {
    fn configure(&mut self, params: EngineParams) {
        self.params = params;
    }

    fn add_body(&mut self, id: BodyId, kind: ShapeKind, descriptor: &BodyDescriptor) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.bodies.len());
        self.bodies.push(Body::new(id, kind, descriptor));
        true
    }

    fn remove_body(&mut self, id: BodyId) -> bool {
        let Some(i) = self.index.get(&id).copied() else {
            return false;
        };
        self.bodies.remove(i);
        self.reindex();
        true
    }

    fn set_position(&mut self, id: BodyId, position: Vec3) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.position = position;
                true
            }
            None => false,
        }
    }

    fn set_rotation(&mut self, id: BodyId, rotation: Quaternion) -> bool {
        match self.body_mut(id) {
            Some(body) => {
                body.rotation = rotation.normalize();
                true
            }
            None => false,
        }
    }

    fn step(&mut self) {
        self.integrate();
        self.resolve_plane_contacts();
    }

    fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.iter().map(|b| b.id).collect()
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn write_transforms(&self, buffers: &mut TransformBufferPair) {
        for (ordinal, body) in self.bodies.iter().enumerate() {
            buffers.set(ordinal, body.position, body.rotation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physbridge_shared::ObjectId;
    use std::f32::consts::FRAC_PI_2;

    fn id(n: u64) -> BodyId {
        BodyId::single(ObjectId::new(n))
    }

    fn falling_params() -> EngineParams {
        EngineParams {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            tolerance: 0.001,
            step: 1.0 / 60.0,
        }
    }

    fn ground() -> BodyDescriptor {
        BodyDescriptor::new(ShapeKind::Plane).with_rotation(Vec3::new(-FRAC_PI_2, 0.0, 0.0))
    }

    #[test]
    fn test_free_fall() {
        let mut engine = ReferenceEngine::new();
        engine.configure(falling_params());
        let descriptor = BodyDescriptor::new(ShapeKind::Box)
            .with_mass(1.0)
            .at(Vec3::new(0.0, 5.0, 0.0));
        assert!(engine.add_body(id(1), ShapeKind::Box, &descriptor));

        for _ in 0..60 {
            engine.step();
        }

        let y = engine.position(id(1)).unwrap().y;
        assert!(y < 5.0);
        assert!(y.is_finite());
        // Roughly half of g after one second
        assert!(y.abs() < 0.5, "y = {y}");
    }

    #[test]
    fn test_static_body_never_moves() {
        let mut engine = ReferenceEngine::new();
        engine.configure(falling_params());
        let descriptor = BodyDescriptor::new(ShapeKind::Sphere).at(Vec3::new(1.0, 2.0, 3.0));
        engine.add_body(id(1), ShapeKind::Sphere, &descriptor);

        for _ in 0..30 {
            engine.step();
        }
        assert_eq!(engine.position(id(1)), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_sphere_rests_on_plane() {
        let mut engine = ReferenceEngine::new();
        engine.configure(falling_params());
        engine.add_body(id(1), ShapeKind::Plane, &ground());
        let ball = BodyDescriptor::new(ShapeKind::Sphere)
            .with_mass(1.0)
            .with_args(ShapeArgs::Sphere { radius: 0.5 })
            .at(Vec3::new(0.0, 2.0, 0.0));
        engine.add_body(id(2), ShapeKind::Sphere, &ball);

        for _ in 0..240 {
            engine.step();
        }

        let y = engine.position(id(2)).unwrap().y;
        assert!((y - 0.5).abs() < 0.01, "y = {y}");
    }

    #[test]
    fn test_removal_preserves_order() {
        let mut engine = ReferenceEngine::new();
        for n in 1..=4 {
            engine.add_body(id(n), ShapeKind::Particle, &BodyDescriptor::new(ShapeKind::Particle));
        }

        assert!(engine.remove_body(id(2)));
        assert!(!engine.remove_body(id(2)));
        assert_eq!(engine.body_ids(), vec![id(1), id(3), id(4)]);
        assert!(engine.set_position(id(4), Vec3::ONE));
        assert_eq!(engine.position(id(4)), Some(Vec3::ONE));
    }

    #[test]
    fn test_duplicate_add_rejected() {
        let mut engine = ReferenceEngine::new();
        let descriptor = BodyDescriptor::new(ShapeKind::Sphere);
        assert!(engine.add_body(id(1), ShapeKind::Sphere, &descriptor));
        assert!(!engine.add_body(id(1), ShapeKind::Sphere, &descriptor));
        assert_eq!(engine.body_count(), 1);
    }

    #[test]
    fn test_unknown_overrides_ignored() {
        let mut engine = ReferenceEngine::new();
        assert!(!engine.set_position(id(9), Vec3::ONE));
        assert!(!engine.set_rotation(id(9), Quaternion::IDENTITY));
    }

    #[test]
    fn test_write_transforms_in_ordinal_order() {
        let mut engine = ReferenceEngine::new();
        engine.add_body(
            id(1),
            ShapeKind::Particle,
            &BodyDescriptor::new(ShapeKind::Particle).at(Vec3::new(1.0, 0.0, 0.0)),
        );
        engine.add_body(
            id(2),
            ShapeKind::Particle,
            &BodyDescriptor::new(ShapeKind::Particle).at(Vec3::new(2.0, 0.0, 0.0)),
        );

        let mut buffers = TransformBufferPair::with_slots(1);
        buffers.prepare(1, engine.body_count());
        engine.write_transforms(&mut buffers);

        assert_eq!(buffers.position(0), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(buffers.position(1), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_spin_integrates_rotation() {
        let mut engine = ReferenceEngine::new();
        engine.configure(EngineParams {
            gravity: Vec3::ZERO,
            ..falling_params()
        });
        let spinning = BodyDescriptor::new(ShapeKind::Box)
            .with_mass(1.0)
            .with_angular_velocity(Vec3::new(0.0, 1.0, 0.0));
        engine.add_body(id(1), ShapeKind::Box, &spinning);

        engine.step();
        let q = engine.rotation(id(1)).unwrap();
        assert!(q.y > 0.0);
        assert!((q.length() - 1.0).abs() < 1e-5);
    }
}
