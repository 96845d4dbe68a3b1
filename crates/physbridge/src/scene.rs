//! # Scene Graph Seam
//!
//! The renderer is opaque. The bridge only writes transforms into objects
//! the UI layer has already created:
//!
//! ```text
//! plain object      position | orientation | scale
//! instanced object  [Mat4; count] + one dirty flag
//! ```

use std::collections::HashMap;

use physbridge_shared::{Mat4, ObjectId, Quaternion, Transform, Vec3};

/// Write access to renderable objects.
///
/// Writes to objects the scene does not know are ignored.
pub trait SceneGraph {
    /// Sets an object's position.
    fn set_position(&mut self, object: ObjectId, position: Vec3);

    /// Sets an object's orientation.
    fn set_orientation(&mut self, object: ObjectId, orientation: Quaternion);

    /// Sets an object's scale.
    fn set_scale(&mut self, object: ObjectId, scale: Vec3);

    /// Writes one instance's matrix of a batched object.
    fn set_instance_matrix(&mut self, object: ObjectId, instance: u32, matrix: Mat4);

    /// Flags the instance matrices of a batched object for upload.
    fn mark_instances_dirty(&mut self, object: ObjectId);
}

/// One object in [`InMemoryScene`].
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObject {
    /// Transform of a plain object
    pub transform: Transform,
    /// Instance matrices of a batched object
    pub instances: Vec<Mat4>,
    /// Times the instance block has been flagged dirty
    pub dirty_marks: u64,
}

/// Scene graph kept in memory; used by the demo and tests.
#[derive(Debug, Default)]
pub struct InMemoryScene {
    objects: HashMap<ObjectId, SceneObject>,
    next_id: u64,
}

impl InMemoryScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a plain object at the identity transform.
    pub fn spawn(&mut self) -> ObjectId {
        self.insert(Vec::new())
    }

    /// Creates a batched object with `count` identity instances.
    pub fn spawn_instanced(&mut self, count: u32) -> ObjectId {
        self.insert(vec![Mat4::IDENTITY; count as usize])
    }

    /// Removes an object.
    pub fn despawn(&mut self, object: ObjectId) -> bool {
        self.objects.remove(&object).is_some()
    }

    /// Looks up an object.
    #[must_use]
    pub fn object(&self, object: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&object)
    }

    /// Position of a plain object.
    #[must_use]
    pub fn position(&self, object: ObjectId) -> Option<Vec3> {
        self.object(object).map(|o| o.transform.position)
    }

    /// Matrix of one instance.
    #[must_use]
    pub fn instance_matrix(&self, object: ObjectId, instance: u32) -> Option<Mat4> {
        self.object(object)?.instances.get(instance as usize).copied()
    }

    /// Number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the scene is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn insert(&mut self, instances: Vec<Mat4>) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId::new(self.next_id);
        self.objects.insert(
            id,
            SceneObject {
                transform: Transform::IDENTITY,
                instances,
                dirty_marks: 0,
            },
        );
        id
    }
}

impl SceneGraph for InMemoryScene {
    fn set_position(&mut self, object: ObjectId, position: Vec3) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.transform.position = position;
        }
    }

    fn set_orientation(&mut self, object: ObjectId, orientation: Quaternion) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.transform.rotation = orientation;
        }
    }

    fn set_scale(&mut self, object: ObjectId, scale: Vec3) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.transform.scale = scale;
        }
    }

    fn set_instance_matrix(&mut self, object: ObjectId, instance: u32, matrix: Mat4) {
        if let Some(slot) = self
            .objects
            .get_mut(&object)
            .and_then(|o| o.instances.get_mut(instance as usize))
        {
            *slot = matrix;
        }
    }

    fn mark_instances_dirty(&mut self, object: ObjectId) {
        if let Some(o) = self.objects.get_mut(&object) {
            o.dirty_marks += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_assigns_distinct_ids() {
        let mut scene = InMemoryScene::new();
        let a = scene.spawn();
        let b = scene.spawn_instanced(3);
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.object(b).unwrap().instances.len(), 3);
    }

    #[test]
    fn test_writes() {
        let mut scene = InMemoryScene::new();
        let a = scene.spawn();
        scene.set_position(a, Vec3::new(1.0, 2.0, 3.0));
        scene.set_scale(a, Vec3::ONE * 2.0);

        let object = scene.object(a).unwrap();
        assert_eq!(object.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(object.transform.scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_instance_writes_out_of_range_ignored() {
        let mut scene = InMemoryScene::new();
        let batch = scene.spawn_instanced(2);
        let m = Mat4::compose(Vec3::Y, Quaternion::IDENTITY, Vec3::ONE);

        scene.set_instance_matrix(batch, 1, m);
        scene.set_instance_matrix(batch, 5, m);
        scene.mark_instances_dirty(batch);

        assert_eq!(scene.instance_matrix(batch, 1), Some(m));
        assert_eq!(scene.instance_matrix(batch, 5), None);
        assert_eq!(scene.object(batch).unwrap().dirty_marks, 1);
    }

    #[test]
    fn test_despawned_object_ignores_writes() {
        let mut scene = InMemoryScene::new();
        let a = scene.spawn();
        assert!(scene.despawn(a));
        assert!(!scene.despawn(a));

        scene.set_position(a, Vec3::ONE);
        assert_eq!(scene.position(a), None);
        assert!(scene.is_empty());
    }

    #[test]
    fn test_unknown_object_ignored() {
        let mut scene = InMemoryScene::new();
        scene.set_position(ObjectId::new(99), Vec3::ONE);
        assert!(scene.is_empty());
    }
}
