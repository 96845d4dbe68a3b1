//! # Simulation Worker
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  ControllerMessage (FIFO)   ┌──────────────────────┐
//! │  Controller  │ ──────────────────────────► │   SimulationWorker   │
//! │              │                             │  ┌────────────────┐  │
//! │ WorkerHandle │  WorkerMessage (FIFO)       │  │ PhysicsEngine  │  │
//! │              │ ◄────────────────────────── │  └────────────────┘  │
//! └──────────────┘                             └──────────────────────┘
//! ```
//!
//! The worker thread blocks on its inbox, drains everything queued, and
//! then reports at most one `sync` for the whole batch. A `step` found in
//! the middle of a batch flushes the pending `sync` first, so the
//! controller always learns about a layout before it sees a frame produced
//! under it.
//!
//! Termination drops the inbox sender. The worker finishes whatever it is
//! doing, sees the disconnect and exits; anything it still sends is
//! discarded with the receiver.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use physbridge_core::{BridgeError, BridgeResult, ControllerMessage, WorkerMessage};
use physbridge_shared::{BodyDescriptor, BodyId, Quaternion, ShapeKind};

use crate::engine::{EngineParams, PhysicsEngine};

/// Worker-side counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Steps executed.
    pub steps: u64,
    /// Steps refused because `init` had not arrived.
    pub steps_before_init: u64,
    /// Bodies inserted.
    pub bodies_added: u64,
    /// Bodies removed.
    pub bodies_removed: u64,
    /// `sync` messages produced.
    pub syncs_sent: u64,
    /// Messages dropped by boundary validation.
    pub rejected: u64,
    /// Messages that named an unknown body.
    pub ignored: u64,
}

/// Protocol handler wrapped around an engine.
///
/// Runs on the worker thread, but has no threading of its own so it can
/// be driven directly.
#[derive(Debug)]
pub struct SimulationWorker<E> {
    engine: E,
    configured: bool,
    generation: u64,
    acknowledged: u64,
    sync_pending: bool,
    stats: WorkerStats,
}

impl<E: PhysicsEngine> SimulationWorker<E> {
    /// Wraps an engine. Nothing is simulated until `init` arrives.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            configured: false,
            generation: 0,
            acknowledged: 0,
            sync_pending: false,
            stats: WorkerStats::default(),
        }
    }

    /// Handles one controller message, pushing any replies to `outbox`.
    pub fn handle(&mut self, message: ControllerMessage, outbox: &mut Vec<WorkerMessage>) {
        // The controller numbers its mutations in send order, rejected or not
        if message.is_mutation() {
            self.acknowledged += 1;
        }
        if let Err(err) = message.validate() {
            tracing::warn!(op = message.op(), %err, "dropping invalid message");
            self.stats.rejected += 1;
            return;
        }

        match message {
            ControllerMessage::Init {
                gravity,
                tolerance,
                step,
            } => {
                self.engine.configure(EngineParams {
                    gravity,
                    tolerance,
                    step,
                });
                if self.configured {
                    tracing::info!(?gravity, tolerance, step, "simulation reconfigured");
                } else {
                    tracing::info!(?gravity, tolerance, step, "simulation configured");
                }
                self.configured = true;
            }
            ControllerMessage::Step { mut buffers } => {
                self.flush_sync(outbox);
                if self.configured {
                    self.engine.step();
                    buffers.prepare(self.generation, self.engine.body_count());
                    self.engine.write_transforms(&mut buffers);
                    self.stats.steps += 1;
                    tracing::trace!(
                        generation = self.generation,
                        bodies = buffers.body_count(),
                        "step"
                    );
                } else {
                    tracing::warn!("step before init, returning buffers untouched");
                    self.stats.steps_before_init += 1;
                }
                outbox.push(WorkerMessage::Frame { buffers });
            }
            ControllerMessage::AddBody {
                id,
                kind,
                descriptor,
            } => {
                self.add(id, kind, &descriptor);
                self.sync_pending = true;
            }
            ControllerMessage::AddBodies {
                ids,
                kind,
                descriptors,
            } => {
                for (id, descriptor) in ids.into_iter().zip(&descriptors) {
                    self.add(id, kind, descriptor);
                }
                self.sync_pending = true;
            }
            ControllerMessage::RemoveBody { id, .. } => {
                self.remove(id);
                self.sync_pending = true;
            }
            ControllerMessage::RemoveBodies { ids, .. } => {
                for id in ids {
                    self.remove(id);
                }
                self.sync_pending = true;
            }
            ControllerMessage::SetPosition { id, position } => {
                if !self.engine.set_position(id, position) {
                    self.ignore(id, "setPosition");
                }
            }
            ControllerMessage::SetRotation { id, rotation } => {
                if !self.engine.set_rotation(id, Quaternion::from_euler(rotation)) {
                    self.ignore(id, "setRotation");
                }
            }
        }
    }

    /// Emits the `sync` owed for mutations handled since the last one.
    pub fn flush_sync(&mut self, outbox: &mut Vec<WorkerMessage>) {
        if !self.sync_pending {
            return;
        }
        self.sync_pending = false;
        self.stats.syncs_sent += 1;

        let bodies = self.engine.body_ids();
        tracing::debug!(
            generation = self.generation,
            acknowledged = self.acknowledged,
            bodies = bodies.len(),
            "sync"
        );
        outbox.push(WorkerMessage::Sync {
            generation: self.generation,
            acknowledged: self.acknowledged,
            bodies,
        });
    }

    /// True once `init` has been handled.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Current topology generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// The wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn add(&mut self, id: BodyId, kind: ShapeKind, descriptor: &BodyDescriptor) {
        if self.engine.add_body(id, kind, descriptor) {
            self.generation += 1;
            self.stats.bodies_added += 1;
            tracing::debug!(%id, %kind, "body added");
        } else {
            tracing::warn!(%id, "body already simulated, ignoring add");
            self.stats.ignored += 1;
        }
    }

    fn remove(&mut self, id: BodyId) {
        if self.engine.remove_body(id) {
            self.generation += 1;
            self.stats.bodies_removed += 1;
            tracing::debug!(%id, "body removed");
        } else {
            self.ignore(id, "remove");
        }
    }

    fn ignore(&mut self, id: BodyId, op: &'static str) {
        tracing::trace!(%id, op, "unknown body, ignoring");
        self.stats.ignored += 1;
    }
}

/// Worker thread body: block, drain, reply, repeat until disconnected.
fn run_worker<E: PhysicsEngine>(
    engine: E,
    inbox: Receiver<ControllerMessage>,
    replies: Sender<WorkerMessage>,
) -> WorkerStats {
    let mut worker = SimulationWorker::new(engine);
    let mut outbox = Vec::new();

    tracing::info!("simulation worker started");

    'run: while let Ok(first) = inbox.recv() {
        worker.handle(first, &mut outbox);
        while let Ok(next) = inbox.try_recv() {
            worker.handle(next, &mut outbox);
        }
        worker.flush_sync(&mut outbox);

        for message in outbox.drain(..) {
            if replies.send(message).is_err() {
                tracing::debug!("controller gone, stopping worker");
                break 'run;
            }
        }
    }

    let stats = worker.stats();
    tracing::info!(steps = stats.steps, syncs = stats.syncs_sent, "simulation worker stopped");
    stats
}

// ============================================================================
// CONTROLLER-SIDE HANDLE
// ============================================================================

/// Controller-side handle to a worker thread.
///
/// Dropping the handle terminates the worker.
#[derive(Debug)]
pub struct WorkerHandle {
    thread: Option<JoinHandle<WorkerStats>>,
    inbox: Option<Sender<ControllerMessage>>,
    replies: Receiver<WorkerMessage>,
    final_stats: Option<WorkerStats>,
}

impl WorkerHandle {
    /// Spawns a worker thread around `engine`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] if the thread cannot be started.
    pub fn spawn<E>(engine: E) -> BridgeResult<Self>
    where
        E: PhysicsEngine + 'static,
    {
        let (inbox_tx, inbox_rx) = unbounded();
        let (replies_tx, replies_rx) = unbounded();

        let thread = thread::Builder::new()
            .name("physbridge-worker".into())
            .spawn(move || run_worker(engine, inbox_rx, replies_tx))
            .map_err(|err| {
                tracing::error!(%err, "failed to start simulation worker");
                BridgeError::SessionClosed
            })?;

        Ok(Self {
            thread: Some(thread),
            inbox: Some(inbox_tx),
            replies: replies_rx,
            final_stats: None,
        })
    }

    /// Queues a message for the worker.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] after termination or if the worker
    /// thread has exited.
    pub fn send(&self, message: ControllerMessage) -> BridgeResult<()> {
        let inbox = self.inbox.as_ref().ok_or(BridgeError::SessionClosed)?;
        inbox.send(message).map_err(|_| BridgeError::SessionClosed)
    }

    /// Next reply if one is waiting.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] once the worker is gone and every
    /// reply it sent has been read.
    pub fn try_recv(&self) -> BridgeResult<Option<WorkerMessage>> {
        match self.replies.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BridgeError::SessionClosed),
        }
    }

    /// Waits up to `timeout` for the next reply.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] once the worker is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> BridgeResult<Option<WorkerMessage>> {
        match self.replies.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::SessionClosed),
        }
    }

    /// True while the worker thread can still accept messages.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inbox.is_some() && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the worker and waits for it to exit. Safe to call repeatedly
    /// and while a `step` is outstanding.
    pub fn terminate(&mut self) {
        self.inbox = None;
        if let Some(thread) = self.thread.take() {
            match thread.join() {
                Ok(stats) => self.final_stats = Some(stats),
                Err(_) => tracing::error!("simulation worker panicked"),
            }
        }
    }

    /// Worker counters, available after [`terminate`](Self::terminate).
    #[must_use]
    pub fn final_stats(&self) -> Option<WorkerStats> {
        self.final_stats
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.terminate();
    }
}
