//! # Worker Protocol Messages
//!
//! Closed message catalogue between the controller and the simulation
//! worker. Each variant carries exactly its operation's payload.
//!
//! | op | direction | effect |
//! |----|-----------|--------|
//! | `init` | controller → worker | (re)configure gravity, tolerance, step |
//! | `step` | controller → worker | advance one tick, refill and return buffers |
//! | `addBody(ies)` | controller → worker | insert bodies, triggers `sync` |
//! | `removeBody(ies)` | controller → worker | remove bodies, triggers `sync` |
//! | `setPosition` / `setRotation` | controller → worker | out-of-band override |
//! | `frame` | worker → controller | refilled buffers from the last `step` |
//! | `sync` | worker → controller | ordered live identifiers |

use std::collections::HashSet;

use physbridge_shared::{BodyDescriptor, BodyId, ShapeKind, Vec3};

use crate::error::ProtocolError;
use crate::sync::TransformBufferPair;

/// Messages sent from the controller to the worker.
#[derive(Debug)]
pub enum ControllerMessage {
    /// Configure the simulation. Sent once before the first `step`.
    Init {
        /// Gravity vector
        gravity: Vec3,
        /// Solver tolerance
        tolerance: f32,
        /// Fixed step duration in seconds
        step: f32,
    },
    /// Advance one fixed tick; `buffers` come back in the `frame`.
    Step {
        /// Storage to refill (ownership moves to the worker)
        buffers: TransformBufferPair,
    },
    /// Insert one body.
    AddBody {
        /// Identifier
        id: BodyId,
        /// Shape kind
        kind: ShapeKind,
        /// Initial properties
        descriptor: BodyDescriptor,
    },
    /// Insert several bodies of one kind, one descriptor per identifier.
    AddBodies {
        /// Identifiers
        ids: Vec<BodyId>,
        /// Shape kind
        kind: ShapeKind,
        /// Initial properties, parallel to `ids`
        descriptors: Vec<BodyDescriptor>,
    },
    /// Remove one body.
    RemoveBody {
        /// Identifier
        id: BodyId,
        /// Shape kind
        kind: ShapeKind,
    },
    /// Remove several bodies.
    RemoveBodies {
        /// Identifiers
        ids: Vec<BodyId>,
        /// Shape kind
        kind: ShapeKind,
    },
    /// Teleport a body.
    SetPosition {
        /// Identifier
        id: BodyId,
        /// New position
        position: Vec3,
    },
    /// Re-orient a body from Euler angles.
    SetRotation {
        /// Identifier
        id: BodyId,
        /// New rotation (radians, X then Y then Z)
        rotation: Vec3,
    },
}

impl ControllerMessage {
    /// Wire name of the operation.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Step { .. } => "step",
            Self::AddBody { .. } => "addBody",
            Self::AddBodies { .. } => "addBodies",
            Self::RemoveBody { .. } => "removeBody",
            Self::RemoveBodies { .. } => "removeBodies",
            Self::SetPosition { .. } => "setPosition",
            Self::SetRotation { .. } => "setRotation",
        }
    }

    /// True for operations that change the simulated body set.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::AddBody { .. }
                | Self::AddBodies { .. }
                | Self::RemoveBody { .. }
                | Self::RemoveBodies { .. }
        )
    }

    /// Checks the payload at the boundary.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProtocolError`] found in the payload.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Init {
                gravity,
                tolerance,
                step,
            } => {
                if !gravity.is_finite() {
                    return Err(ProtocolError::InvalidParams("gravity must be finite"));
                }
                if !tolerance.is_finite() || *tolerance < 0.0 {
                    return Err(ProtocolError::InvalidParams("tolerance must be >= 0"));
                }
                if !step.is_finite() || *step <= 0.0 {
                    return Err(ProtocolError::InvalidParams("step must be > 0"));
                }
                Ok(())
            }
            Self::Step { buffers } => {
                if buffers.is_empty() {
                    return Err(ProtocolError::EmptyStepBuffers);
                }
                Ok(())
            }
            Self::AddBody {
                id,
                kind,
                descriptor,
            } => validate_descriptor(*id, *kind, descriptor),
            Self::AddBodies {
                ids,
                kind,
                descriptors,
            } => {
                if ids.is_empty() {
                    return Err(ProtocolError::EmptyBatch);
                }
                if ids.len() != descriptors.len() {
                    return Err(ProtocolError::CountMismatch {
                        ids: ids.len(),
                        descriptors: descriptors.len(),
                    });
                }
                check_unique(ids)?;
                for (id, descriptor) in ids.iter().zip(descriptors) {
                    validate_descriptor(*id, *kind, descriptor)?;
                }
                Ok(())
            }
            Self::RemoveBody { .. } => Ok(()),
            Self::RemoveBodies { ids, .. } => {
                if ids.is_empty() {
                    return Err(ProtocolError::EmptyBatch);
                }
                check_unique(ids)
            }
            Self::SetPosition { id, position } => finite(*id, *position),
            Self::SetRotation { id, rotation } => finite(*id, *rotation),
        }
    }
}

/// Messages sent from the worker to the controller.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Result of the most recent `step`; ownership of the buffers returns.
    Frame {
        /// Refilled storage
        buffers: TransformBufferPair,
    },
    /// Authoritative ordered list of live bodies.
    Sync {
        /// Topology generation this list describes
        generation: u64,
        /// Add/remove messages handled so far, counted in send order
        acknowledged: u64,
        /// Live identifiers; position in the list is the ordinal
        bodies: Vec<BodyId>,
    },
}

impl WorkerMessage {
    /// Wire name of the operation.
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Frame { .. } => "frame",
            Self::Sync { .. } => "sync",
        }
    }
}

fn validate_descriptor(
    id: BodyId,
    kind: ShapeKind,
    descriptor: &BodyDescriptor,
) -> Result<(), ProtocolError> {
    let found = descriptor.args.kind();
    if found != kind {
        return Err(ProtocolError::ShapeMismatch { id, kind, found });
    }
    if !descriptor.args.is_well_formed() {
        return Err(ProtocolError::MalformedArgs(id));
    }
    if !descriptor.is_finite() {
        return Err(ProtocolError::NonFinite(id));
    }
    Ok(())
}

fn check_unique(ids: &[BodyId]) -> Result<(), ProtocolError> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(*id) {
            return Err(ProtocolError::DuplicateId(*id));
        }
    }
    Ok(())
}

fn finite(id: BodyId, v: Vec3) -> Result<(), ProtocolError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::NonFinite(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physbridge_shared::{ObjectId, ShapeArgs};

    fn id(n: u64) -> BodyId {
        BodyId::single(ObjectId::new(n))
    }

    #[test]
    fn test_op_names() {
        let msg = ControllerMessage::RemoveBody {
            id: id(1),
            kind: ShapeKind::Box,
        };
        assert_eq!(msg.op(), "removeBody");
        assert!(msg.is_mutation());

        let msg = ControllerMessage::SetPosition {
            id: id(1),
            position: Vec3::ZERO,
        };
        assert_eq!(msg.op(), "setPosition");
        assert!(!msg.is_mutation());
    }

    #[test]
    fn test_init_validation() {
        let ok = ControllerMessage::Init {
            gravity: Vec3::new(0.0, -10.0, 0.0),
            tolerance: 0.001,
            step: 1.0 / 60.0,
        };
        assert!(ok.validate().is_ok());

        let bad = ControllerMessage::Init {
            gravity: Vec3::ZERO,
            tolerance: 0.001,
            step: 0.0,
        };
        assert!(matches!(bad.validate(), Err(ProtocolError::InvalidParams(_))));
    }

    #[test]
    fn test_step_with_sentinel_is_rejected() {
        let msg = ControllerMessage::Step {
            buffers: TransformBufferPair::default(),
        };
        assert_eq!(msg.validate(), Err(ProtocolError::EmptyStepBuffers));

        let msg = ControllerMessage::Step {
            buffers: TransformBufferPair::with_slots(1),
        };
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_add_bodies_count_mismatch() {
        let obj = ObjectId::new(5);
        let msg = ControllerMessage::AddBodies {
            ids: vec![BodyId::instance(obj, 0), BodyId::instance(obj, 1)],
            kind: ShapeKind::Sphere,
            descriptors: vec![BodyDescriptor::new(ShapeKind::Sphere)],
        };
        assert_eq!(
            msg.validate(),
            Err(ProtocolError::CountMismatch {
                ids: 2,
                descriptors: 1
            })
        );
    }

    #[test]
    fn test_add_bodies_duplicate() {
        let obj = ObjectId::new(5);
        let msg = ControllerMessage::AddBodies {
            ids: vec![BodyId::instance(obj, 0), BodyId::instance(obj, 0)],
            kind: ShapeKind::Sphere,
            descriptors: vec![BodyDescriptor::new(ShapeKind::Sphere); 2],
        };
        assert_eq!(
            msg.validate(),
            Err(ProtocolError::DuplicateId(BodyId::instance(obj, 0)))
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let msg = ControllerMessage::AddBody {
            id: id(2),
            kind: ShapeKind::Box,
            descriptor: BodyDescriptor::new(ShapeKind::Box).with_args(ShapeArgs::Sphere { radius: 1.0 }),
        };
        assert_eq!(
            msg.validate(),
            Err(ProtocolError::ShapeMismatch {
                id: id(2),
                kind: ShapeKind::Box,
                found: ShapeKind::Sphere,
            })
        );
    }

    #[test]
    fn test_non_finite_override() {
        let msg = ControllerMessage::SetRotation {
            id: id(3),
            rotation: Vec3::new(f32::NAN, 0.0, 0.0),
        };
        assert_eq!(msg.validate(), Err(ProtocolError::NonFinite(id(3))));
    }
}
