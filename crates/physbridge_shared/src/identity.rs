//! Structured body identifiers.
//!
//! A body is named by the renderable object that owns it plus, for
//! instanced objects, the instance slot. Identifiers compare structurally;
//! nothing ever parses them back out of a string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of a renderable object, supplied by the scene graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Wraps a scene-graph object handle.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw scene-graph handle.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// Identifier of one physics body.
///
/// Simple bodies carry `instance: None`; instance `i` of an instanced
/// object carries `instance: Some(i)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId {
    /// Owning object
    pub base: ObjectId,
    /// Instance slot, if the owner is instanced
    pub instance: Option<u32>,
}

impl BodyId {
    /// Identifier of a simple (non-instanced) body.
    #[must_use]
    pub const fn single(base: ObjectId) -> Self {
        Self { base, instance: None }
    }

    /// Identifier of instance `index` of an instanced object.
    #[must_use]
    pub const fn instance(base: ObjectId, index: u32) -> Self {
        Self {
            base,
            instance: Some(index),
        }
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(i) => write!(f, "{}/{}", self.base, i),
            None => write!(f, "{}", self.base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let obj = ObjectId::new(7);
        assert_eq!(BodyId::instance(obj, 2), BodyId::instance(obj, 2));
        assert_ne!(BodyId::instance(obj, 2), BodyId::single(obj));
        assert_ne!(
            BodyId::instance(ObjectId::new(71), 2),
            BodyId::instance(ObjectId::new(7), 12)
        );
    }

    #[test]
    fn test_display() {
        let obj = ObjectId::new(3);
        assert_eq!(BodyId::single(obj).to_string(), "obj#3");
        assert_eq!(BodyId::instance(obj, 4).to_string(), "obj#3/4");
    }
}
