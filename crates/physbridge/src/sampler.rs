//! # Per-Frame Sampler
//!
//! Copies the latest frame into the scene once per display tick.
//!
//! ```text
//! for each registered object:
//!   Single(id)        resolve id → ordinal → position + orientation
//!   Instanced(ids)    resolve each → compose matrix → instance slot
//!                     then flag the instance block dirty once
//! ```
//!
//! A frame is only trusted when its generation matches the generation of
//! the latest `sync`. Otherwise, or when an identifier does not resolve,
//! the object keeps whatever transform it already has.

use physbridge_core::{BodyGroup, BodyRegistry, RegistryEntry, TransformBufferPair};
use physbridge_shared::{BodyId, Mat4, Quaternion, Vec3};

use crate::scene::SceneGraph;

/// Outcome of one sampling pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SampleStats {
    /// Objects visited.
    pub objects: usize,
    /// Bodies whose transform was written.
    pub applied: usize,
    /// Bodies left at their previous transform.
    pub stale: usize,
    /// Whether the frame's layout matched the latest `sync`.
    pub frame_current: bool,
}

/// Writes `frame` into `scene` for every object in `registry`.
pub fn apply_frame<S>(registry: &BodyRegistry, frame: &TransformBufferPair, scene: &mut S) -> SampleStats
where
    S: SceneGraph + ?Sized,
{
    let frame_current = registry.generation() == Some(frame.generation());
    let mut stats = SampleStats {
        frame_current,
        ..SampleStats::default()
    };

    for entry in registry.entries() {
        stats.objects += 1;
        if !frame_current {
            stats.stale += entry.group.len();
            continue;
        }

        match &entry.group {
            BodyGroup::Single(id) => match lookup(registry, frame, *id) {
                Some((position, orientation)) => {
                    scene.set_position(entry.object, position);
                    scene.set_orientation(entry.object, orientation);
                    stats.applied += 1;
                }
                None => stats.stale += 1,
            },
            BodyGroup::Instanced(ids) => apply_instances(registry, frame, entry, ids, scene, &mut stats),
        }
    }

    stats
}

fn apply_instances<S>(
    registry: &BodyRegistry,
    frame: &TransformBufferPair,
    entry: &RegistryEntry,
    ids: &[BodyId],
    scene: &mut S,
    stats: &mut SampleStats,
) where
    S: SceneGraph + ?Sized,
{
    let mut written = false;
    for id in ids {
        let Some(instance) = id.instance else {
            stats.stale += 1;
            continue;
        };
        match lookup(registry, frame, *id) {
            Some((position, orientation)) => {
                let matrix = Mat4::compose(position, orientation, entry.instance_scale(instance));
                scene.set_instance_matrix(entry.object, instance, matrix);
                stats.applied += 1;
                written = true;
            }
            None => stats.stale += 1,
        }
    }
    if written {
        scene.mark_instances_dirty(entry.object);
    }
}

#[inline]
fn lookup(registry: &BodyRegistry, frame: &TransformBufferPair, id: BodyId) -> Option<(Vec3, Quaternion)> {
    let ordinal = registry.resolve_index(id)?;
    Some((frame.position(ordinal)?, frame.orientation(ordinal)?))
}
