//! # PHYSBRIDGE Worker
//!
//! The simulation side of the bridge: an opaque physics engine running on
//! its own thread, reachable only through two FIFO channels.
//!
//! ## Architecture
//!
//! - **Engine**: [`PhysicsEngine`] is the seam to the solver
//! - **Reference**: [`ReferenceEngine`] is the built-in deterministic solver
//! - **Worker**: [`SimulationWorker`] handles the protocol, [`WorkerHandle`]
//!   owns the thread from the controller side
//!
//! ## Ownership Model
//!
//! ```text
//! CONTROLLER                         WORKER
//!   |                                  |
//!   |--- step { buffers } ------------>|  buffers now owned here
//!   |                                  |  engine.step(), refill
//!   |<-- frame { buffers } ------------|  buffers owned by controller again
//!   |                                  |
//! ```
//!
//! No memory is shared between the two sides; a pair is moved inside the
//! message that carries it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use physbridge_worker::{ReferenceEngine, WorkerHandle};
//!
//! let worker = WorkerHandle::spawn(ReferenceEngine::new())?;
//! worker.send(ControllerMessage::Init { gravity, tolerance, step })?;
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod engine;
pub mod reference;
pub mod worker;

pub use engine::{EngineParams, PhysicsEngine};
pub use reference::ReferenceEngine;
pub use worker::{SimulationWorker, WorkerHandle, WorkerStats};
