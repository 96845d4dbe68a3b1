//! # Bridge Error Types
//!
//! Only session-level failures reach the caller. Stale indices and
//! messages about unknown bodies are absorbed where they happen and never
//! become errors.

use physbridge_shared::{BodyId, ObjectId, ShapeKind};
use thiserror::Error;

/// Errors surfaced to the UI composition layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// The worker has terminated or crashed; the session accepts no more work.
    #[error("simulation session is closed")]
    SessionClosed,

    /// The object already owns bodies in this session.
    #[error("object {0} is already registered")]
    AlreadyRegistered(ObjectId),

    /// Registration asked for zero instances.
    #[error("object {0} registered with an instance count of zero")]
    EmptyInstanceGroup(ObjectId),

    /// Deregistration named a different shape kind than registration.
    #[error("object {object} was registered as {kind}, not {found}")]
    ShapeMismatch {
        /// Object concerned
        object: ObjectId,
        /// Kind recorded at registration
        kind: ShapeKind,
        /// Kind named by the caller
        found: ShapeKind,
    },

    /// A message failed boundary validation and was not sent.
    #[error("invalid message: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Boundary validation failures for controller-to-worker messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A batch carried a different number of identifiers and descriptors.
    #[error("{ids} identifiers but {descriptors} descriptors")]
    CountMismatch {
        /// Identifier count
        ids: usize,
        /// Descriptor count
        descriptors: usize,
    },

    /// A batch carried no identifiers.
    #[error("empty body batch")]
    EmptyBatch,

    /// The same identifier appears twice in one batch.
    #[error("duplicate identifier {0} in batch")]
    DuplicateId(BodyId),

    /// The descriptor's shape arguments belong to another kind.
    #[error("body {id} declared as {kind} but carries {found} arguments")]
    ShapeMismatch {
        /// Body concerned
        id: BodyId,
        /// Declared kind
        kind: ShapeKind,
        /// Kind of the supplied arguments
        found: ShapeKind,
    },

    /// Shape arguments are non-finite, negative or out of range.
    #[error("malformed shape arguments for body {0}")]
    MalformedArgs(BodyId),

    /// A vector or scalar in the payload is NaN or infinite.
    #[error("non-finite value in message for body {0}")]
    NonFinite(BodyId),

    /// A step carried the zero-length sentinel instead of storage.
    #[error("step sent without buffer storage")]
    EmptyStepBuffers,

    /// Session parameters are out of range.
    #[error("invalid session parameters: {0}")]
    InvalidParams(&'static str),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_converts() {
        let err: BridgeError = ProtocolError::EmptyBatch.into();
        assert_eq!(err, BridgeError::Protocol(ProtocolError::EmptyBatch));
        assert_eq!(err.to_string(), "invalid message: empty body batch");
    }

    #[test]
    fn test_display_mentions_object() {
        let err = BridgeError::AlreadyRegistered(ObjectId::new(9));
        assert_eq!(err.to_string(), "object obj#9 is already registered");
    }
}
