//! # PHYSBRIDGE Core
//!
//! The boundary-independent half of the controller/worker synchronization
//! protocol:
//! - transform buffer pairs that move between the two sides by value
//! - the body identity registry (object → bodies, body → ordinal)
//! - the closed message catalogue and its boundary validation
//!
//! ## Architecture Rules
//!
//! 1. **Buffers move, never alias** - a pair is owned by exactly one side
//! 2. **Indices are provisional** - ordinals hold only until the next `sync`
//! 3. **Absent is not an error** - stale lookups resolve to `None`
//!
//! ## Example
//!
//! ```rust,ignore
//! use physbridge_core::{BodyRegistry, TransformBufferPair};
//!
//! let mut registry = BodyRegistry::new();
//! registry.register(object, ShapeKind::Box, None, vec![])?;
//! registry.apply_sync(1, registry.mutations_sent(), &[BodyId::single(object)]);
//! let index = registry.resolve_index(BodyId::single(object));
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod protocol;
pub mod registry;
pub mod sync;

pub use error::{BridgeError, BridgeResult, ProtocolError};
pub use protocol::{ControllerMessage, WorkerMessage};
pub use registry::{BodyGroup, BodyRegistry, RegistryEntry};
pub use sync::{FrameBuffers, TransformBufferPair};
