//! # Body Identity Registry
//!
//! Controller-side map from renderable objects to the bodies they own, and
//! from body identifiers to the ordinal the worker last reported for them.
//!
//! ```text
//!   ObjectId ──► RegistryEntry { kind, BodyGroup }
//!                                    │
//!                 Single(obj#3) ─────┤
//!      Instanced([obj#7/0, obj#7/1]) ┘
//!
//!   sync { generation: 4, bodies: [obj#3, obj#7/0, obj#7/1] }
//!        └────────► ordinals { obj#3: 0, obj#7/0: 1, obj#7/1: 2 }
//! ```
//!
//! The registry is eventually consistent with the worker. Every add and
//! remove sent is numbered; a `sync` reports how many of them the worker
//! has handled. An identifier resolves only when it is still registered
//! here, the `sync` covers the add that registered it, and the `sync`
//! listed it. A body removed before the worker acknowledged it stays
//! absent, and an object registered again under the same identifier never
//! picks up the ordinal of the body it replaced.

use std::collections::{BTreeMap, HashMap};

use physbridge_shared::{BodyId, ObjectId, ShapeKind, Vec3};

use crate::error::{BridgeError, BridgeResult};

/// Bodies owned by one renderable object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BodyGroup {
    /// A plain object backed by one body.
    Single(BodyId),
    /// A batched object; one body per instance, in instance order.
    Instanced(Vec<BodyId>),
}

impl BodyGroup {
    /// Identifiers in the group.
    #[must_use]
    pub fn ids(&self) -> &[BodyId] {
        match self {
            Self::Single(id) => std::slice::from_ref(id),
            Self::Instanced(ids) => ids,
        }
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids().len()
    }

    /// True when no bodies remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// True for batched objects.
    #[must_use]
    pub fn is_instanced(&self) -> bool {
        matches!(self, Self::Instanced(_))
    }
}

/// One registered renderable object.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryEntry {
    /// Owning object
    pub object: ObjectId,
    /// Shape kind of every body in the group
    pub kind: ShapeKind,
    /// Bodies owned by the object
    pub group: BodyGroup,
    /// Visual scale per instance, used to compose instance matrices
    pub instance_scales: Vec<Vec3>,
}

impl RegistryEntry {
    /// Scale captured for `instance`, or unit scale if none was recorded.
    #[must_use]
    pub fn instance_scale(&self, instance: u32) -> Vec3 {
        self.instance_scales
            .get(instance as usize)
            .copied()
            .unwrap_or(Vec3::ONE)
    }
}

/// Registry of every object registered in a session.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    entries: BTreeMap<ObjectId, RegistryEntry>,
    /// Registered identifiers and the number of the add that created them
    live: HashMap<BodyId, u64>,
    ordinals: HashMap<BodyId, usize>,
    mutations_sent: u64,
    acknowledged: u64,
    generation: Option<u64>,
    syncs_applied: u64,
}

impl BodyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifiers an object owns: one plain body for `None`, or
    /// `object/0 .. object/n-1` for a batched object with `Some(n)`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::EmptyInstanceGroup`] for `Some(0)`.
    pub fn group_for(object: ObjectId, instances: Option<u32>) -> BridgeResult<BodyGroup> {
        match instances {
            None => Ok(BodyGroup::Single(BodyId::single(object))),
            Some(0) => Err(BridgeError::EmptyInstanceGroup(object)),
            Some(n) => Ok(BodyGroup::Instanced(
                (0..n).map(|i| BodyId::instance(object, i)).collect(),
            )),
        }
    }

    /// Records a new object, and the add message sent for it, and returns
    /// the group it now owns.
    ///
    /// `instances` is as in [`group_for`](Self::group_for).
    /// `instance_scales` is padded with unit scale if it is shorter than
    /// the group.
    ///
    /// # Errors
    ///
    /// [`BridgeError::AlreadyRegistered`] if the object owns bodies already,
    /// [`BridgeError::EmptyInstanceGroup`] for a zero instance count.
    pub fn register(
        &mut self,
        object: ObjectId,
        kind: ShapeKind,
        instances: Option<u32>,
        mut instance_scales: Vec<Vec3>,
    ) -> BridgeResult<&RegistryEntry> {
        if self.entries.contains_key(&object) {
            return Err(BridgeError::AlreadyRegistered(object));
        }
        let group = Self::group_for(object, instances)?;
        instance_scales.resize(group.len(), Vec3::ONE);

        self.mutations_sent += 1;
        let added = self.mutations_sent;
        self.live.extend(group.ids().iter().map(|id| (*id, added)));
        let entry = self.entries.entry(object).or_insert(RegistryEntry {
            object,
            kind,
            group,
            instance_scales,
        });
        Ok(entry)
    }

    /// Checks that every identifier in `ids` belongs to an object
    /// registered as `kind`. Unknown identifiers pass.
    ///
    /// # Errors
    ///
    /// [`BridgeError::ShapeMismatch`] for the first object registered under
    /// another kind.
    pub fn check_kind(&self, ids: &[BodyId], kind: ShapeKind) -> BridgeResult<()> {
        for id in ids {
            if let Some(entry) = self.entries.get(&id.base) {
                if entry.kind != kind {
                    return Err(BridgeError::ShapeMismatch {
                        object: id.base,
                        kind: entry.kind,
                        found: kind,
                    });
                }
            }
        }
        Ok(())
    }

    /// Purges `ids` and records the remove message sent for them. An
    /// object whose last body goes away loses its entry.
    ///
    /// Returns how many identifiers were live. Unknown identifiers are
    /// skipped so a repeated call is harmless. An empty slice records
    /// nothing, since no message is sent for it.
    pub fn deregister(&mut self, ids: &[BodyId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        self.mutations_sent += 1;

        let mut removed = 0;
        for id in ids {
            if self.live.remove(id).is_none() {
                continue;
            }
            removed += 1;

            let emptied = match self.entries.get_mut(&id.base) {
                Some(entry) => match &mut entry.group {
                    BodyGroup::Single(single) => single == id,
                    BodyGroup::Instanced(instances) => {
                        instances.retain(|other| other != id);
                        instances.is_empty()
                    }
                },
                None => false,
            };
            if emptied {
                self.entries.remove(&id.base);
            }
        }
        removed
    }

    /// Rebuilds the ordinal map from a `sync` payload.
    ///
    /// `acknowledged` is the number of add/remove messages the worker had
    /// handled when it built `bodies`.
    ///
    /// Returns `false` (and changes nothing) for a generation older than
    /// the one already applied. Applying the same payload twice yields the
    /// same mapping.
    pub fn apply_sync(&mut self, generation: u64, acknowledged: u64, bodies: &[BodyId]) -> bool {
        if self.generation.is_some_and(|current| generation < current) {
            tracing::debug!(generation, current = ?self.generation, "ignoring out-of-date sync");
            return false;
        }

        self.ordinals.clear();
        self.ordinals.extend(bodies.iter().enumerate().map(|(i, id)| (*id, i)));
        self.acknowledged = acknowledged;
        self.generation = Some(generation);
        self.syncs_applied += 1;

        tracing::trace!(generation, acknowledged, bodies = bodies.len(), "sync applied");
        true
    }

    /// Ordinal of `id` in the latest `sync`, if the body is still registered
    /// and that `sync` already covers its add.
    #[inline]
    #[must_use]
    pub fn resolve_index(&self, id: BodyId) -> Option<usize> {
        let added = *self.live.get(&id)?;
        if added > self.acknowledged {
            return None;
        }
        self.ordinals.get(&id).copied()
    }

    /// Registered objects in object order.
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    /// Entry for one object.
    #[must_use]
    pub fn entry(&self, object: ObjectId) -> Option<&RegistryEntry> {
        self.entries.get(&object)
    }

    /// True if `id` is registered on this side.
    #[must_use]
    pub fn is_live(&self, id: BodyId) -> bool {
        self.live.contains_key(&id)
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registered bodies across every object.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.live.len()
    }

    /// Generation of the latest applied `sync`.
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.generation
    }

    /// Add/remove messages recorded so far.
    #[must_use]
    pub fn mutations_sent(&self) -> u64 {
        self.mutations_sent
    }

    /// Number of `sync` payloads applied.
    #[must_use]
    pub fn syncs_applied(&self) -> u64 {
        self.syncs_applied
    }

    /// Identifier to ordinal mapping of the latest `sync`.
    #[must_use]
    pub fn ordinals(&self) -> &HashMap<BodyId, usize> {
        &self.ordinals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn obj(n: u64) -> ObjectId {
        ObjectId::new(n)
    }

    #[test]
    fn test_single_registration() {
        let mut registry = BodyRegistry::new();
        let entry = registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();

        assert_eq!(entry.group, BodyGroup::Single(BodyId::single(obj(1))));
        assert_eq!(registry.body_count(), 1);

        // Not known to the simulation yet
        assert_eq!(registry.resolve_index(BodyId::single(obj(1))), None);

        registry.apply_sync(1, 1, &[BodyId::single(obj(1))]);
        assert_eq!(registry.resolve_index(BodyId::single(obj(1))), Some(0));
    }

    #[test]
    fn test_instanced_identifiers() {
        let mut registry = BodyRegistry::new();
        let entry = registry
            .register(obj(7), ShapeKind::Sphere, Some(4), vec![Vec3::new(2.0, 2.0, 2.0)])
            .unwrap();

        let expected: Vec<_> = (0..4).map(|i| BodyId::instance(obj(7), i)).collect();
        assert_eq!(entry.group.ids(), expected.as_slice());
        assert!(entry.group.is_instanced());
        assert_eq!(entry.instance_scale(0), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(entry.instance_scale(3), Vec3::ONE);
    }

    #[test]
    fn test_single_instance_batch_stays_instanced() {
        let mut registry = BodyRegistry::new();
        let entry = registry.register(obj(4), ShapeKind::Sphere, Some(1), vec![]).unwrap();

        assert_eq!(entry.group, BodyGroup::Instanced(vec![BodyId::instance(obj(4), 0)]));
        assert!(entry.group.is_instanced());
    }

    #[test]
    fn test_zero_instances_rejected() {
        let mut registry = BodyRegistry::new();
        assert_eq!(
            registry.register(obj(1), ShapeKind::Sphere, Some(0), vec![]).unwrap_err(),
            BridgeError::EmptyInstanceGroup(obj(1))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_double_registration_rejected() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();
        assert_eq!(
            registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap_err(),
            BridgeError::AlreadyRegistered(obj(1))
        );
    }

    #[test]
    fn test_deregister_instanced_leaves_nothing() {
        let mut registry = BodyRegistry::new();
        let ids = registry
            .register(obj(2), ShapeKind::Sphere, Some(3), vec![])
            .unwrap()
            .group
            .ids()
            .to_vec();

        assert_eq!(registry.deregister(&ids), 3);
        assert!(registry.is_empty());
        assert_eq!(registry.body_count(), 0);
        assert!(registry.entry(obj(2)).is_none());

        // Repeating is harmless
        assert_eq!(registry.deregister(&ids), 0);
    }

    #[test]
    fn test_removed_before_sync_stays_absent() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(3), ShapeKind::Box, None, vec![]).unwrap();
        registry.deregister(&[BodyId::single(obj(3))]);

        // A stale sync that still lists the body must not revive it
        registry.apply_sync(1, 1, &[BodyId::single(obj(3))]);
        assert_eq!(registry.resolve_index(BodyId::single(obj(3))), None);

        registry.apply_sync(2, 2, &[]);
        assert_eq!(registry.resolve_index(BodyId::single(obj(3))), None);
    }

    #[test]
    fn test_reregistered_object_waits_for_its_own_add() {
        let id = BodyId::single(obj(5));
        let mut registry = BodyRegistry::new();

        registry.register(obj(5), ShapeKind::Box, None, vec![]).unwrap();
        registry.apply_sync(1, 1, &[id]);
        assert_eq!(registry.resolve_index(id), Some(0));

        registry.deregister(&[id]);
        registry.register(obj(5), ShapeKind::Box, None, vec![]).unwrap();
        assert_eq!(registry.mutations_sent(), 3);

        // The old body's ordinal must not leak into the new registration
        assert_eq!(registry.resolve_index(id), None);
        registry.apply_sync(1, 1, &[id]);
        assert_eq!(registry.resolve_index(id), None);

        // Removal handled, re-add not yet
        registry.apply_sync(2, 2, &[]);
        assert_eq!(registry.resolve_index(id), None);

        registry.apply_sync(3, 3, &[BodyId::single(obj(6)), id]);
        assert_eq!(registry.resolve_index(id), Some(1));
    }

    #[test]
    fn test_empty_deregister_records_nothing() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();
        assert_eq!(registry.deregister(&[]), 0);
        assert_eq!(registry.mutations_sent(), 1);
    }

    #[test]
    fn test_sync_is_idempotent() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();
        registry.register(obj(2), ShapeKind::Sphere, Some(2), vec![]).unwrap();

        let bodies = [
            BodyId::instance(obj(2), 1),
            BodyId::single(obj(1)),
            BodyId::instance(obj(2), 0),
        ];
        registry.apply_sync(5, 2, &bodies);
        let first = registry.ordinals().clone();
        registry.apply_sync(5, 2, &bodies);

        assert_eq!(registry.ordinals(), &first);
        assert_eq!(registry.resolve_index(BodyId::single(obj(1))), Some(1));
        assert_eq!(registry.syncs_applied(), 2);
    }

    #[test]
    fn test_older_generation_ignored() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();

        assert!(registry.apply_sync(3, 1, &[BodyId::single(obj(1))]));
        assert!(!registry.apply_sync(2, 1, &[]));
        assert_eq!(registry.generation(), Some(3));
        assert_eq!(registry.resolve_index(BodyId::single(obj(1))), Some(0));
    }

    #[test]
    fn test_kind_check() {
        let mut registry = BodyRegistry::new();
        registry.register(obj(1), ShapeKind::Box, None, vec![]).unwrap();

        let ids = [BodyId::single(obj(1))];
        assert!(registry.check_kind(&ids, ShapeKind::Box).is_ok());
        assert_eq!(
            registry.check_kind(&ids, ShapeKind::Sphere).unwrap_err(),
            BridgeError::ShapeMismatch {
                object: obj(1),
                kind: ShapeKind::Box,
                found: ShapeKind::Sphere,
            }
        );
        assert!(registry
            .check_kind(&[BodyId::single(obj(9))], ShapeKind::Plane)
            .is_ok());
    }

    #[test]
    fn test_randomized_register_deregister() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut registry = BodyRegistry::new();
        let mut removed: Vec<BodyId> = Vec::new();

        for round in 0..200u64 {
            if rng.gen_bool(0.6) || registry.is_empty() {
                let count = rng.gen_range(1..5);
                registry
                    .register(obj(round), ShapeKind::Sphere, Some(count), vec![])
                    .unwrap();
            } else {
                let victim = registry.entries().next().unwrap().group.ids().to_vec();
                registry.deregister(&victim);
                removed.extend(victim);
            }

            // The worker would report the live set in some order
            let mut bodies: Vec<BodyId> = registry
                .entries()
                .flat_map(|e| e.group.ids().to_vec())
                .collect();
            if rng.gen_bool(0.5) {
                bodies.reverse();
            }
            let acknowledged = registry.mutations_sent();
            registry.apply_sync(round, acknowledged, &bodies);

            let mut seen = HashSet::new();
            for id in &bodies {
                let index = registry.resolve_index(*id).unwrap();
                assert!(seen.insert(index));
            }
            for id in &removed {
                assert_eq!(registry.resolve_index(*id), None);
            }
            assert_eq!(registry.body_count(), bodies.len());
        }
    }
}
