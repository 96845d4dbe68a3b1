//! # PHYSBRIDGE
//!
//! Controller side of the physics bridge: keeps renderable objects in step
//! with a simulation that runs on its own worker thread.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              CONTROLLER                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐    │
//! │  │  SessionHandle  │────>│   LoopDriver    │     │    Sampler      │    │
//! │  │                 │     │                 │────>│                 │    │
//! │  │  • register     │     │  • init once    │     │  • resolve ids  │    │
//! │  │  • deregister   │     │  • one step     │     │  • write scene  │    │
//! │  │  • override     │     │    in flight    │     │  • dirty once   │    │
//! │  └────────┬────────┘     └────────┬────────┘     └────────┬────────┘    │
//! │           │                       │                       │             │
//! │           └──────── BodyRegistry ─┴────── SceneGraph ─────┘             │
//! │                                                                         │
//! └──────────────────────────────────┬──────────────────────────────────────┘
//!                                    │ crossbeam channels (FIFO, by value)
//!                            ┌───────▼────────┐
//!                            │     WORKER     │
//!                            └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: session parameters and TOML loading
//! - `driver`: step/frame pacing state machine
//! - `sampler`: per-frame transform application
//! - `scene`: scene-graph seam and an in-memory scene
//! - `session`: the public session API

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod driver;
pub mod sampler;
pub mod scene;
pub mod session;

// Re-export the lower layers
pub use physbridge_core as core;
pub use physbridge_shared as shared;
pub use physbridge_worker as worker;

// Re-export commonly used types
pub use config::{ConfigError, SessionConfig};
pub use driver::{DriverState, LoopDriver};
pub use physbridge_core::{BodyGroup, BridgeError, BridgeResult};
pub use physbridge_shared::{BodyDescriptor, BodyId, ObjectId, ShapeArgs, ShapeKind, Vec3};
pub use sampler::{apply_frame, SampleStats};
pub use scene::{InMemoryScene, SceneGraph, SceneObject};
pub use session::{Override, Registration, Session, SessionHandle, SessionStats};
