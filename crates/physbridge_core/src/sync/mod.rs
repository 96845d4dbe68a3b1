//! # Transform Transfer Primitives
//!
//! No locks. No shared pointers. Buffers change hands by move.
//!
//! ## The Problem
//!
//! ```text
//! Worker:      WRITE body transforms every step
//! Controller:  READ body transforms every display frame
//!
//! Shared storage:  DATA RACE
//! Mutex:           render waits on the solver
//! ```
//!
//! ## The Solution: Transfer Of Ownership
//!
//! ```text
//! Controller ── step(pair A) ──> Worker     controller keeps pair B (front)
//! Controller <── frame(pair A) ── Worker    A becomes front, B becomes spare
//! ```
//!
//! A pair is only ever reachable from one side. The side that gave a pair
//! away is left holding a zero-length sentinel.

mod double_buffer;
mod transform_buffer;

pub use double_buffer::FrameBuffers;
pub use transform_buffer::TransformBufferPair;
