//! # Simulation Session
//!
//! The API the UI composition layer talks to.
//!
//! ```text
//! UI ──register_body──► Session ──addBody(ies)──► worker
//!    ──deregister_body─►         ──removeBody(ies)─►
//!    ──apply_override──►         ──setPosition/Rotation─►
//!    ──frame(scene)────►  pump replies, maybe step, sample into scene
//!    ──terminate───────►  drop inbox, join worker
//! ```
//!
//! [`SessionHandle`] is a cheap clone around the shared session so every
//! component that mounts bodies can hold one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use physbridge_core::{
    BodyGroup, BodyRegistry, BridgeError, BridgeResult, ControllerMessage, ProtocolError, WorkerMessage,
};
use physbridge_shared::{BodyDescriptor, BodyId, Mat4, ObjectId, Quaternion, ShapeArgs, ShapeKind, Vec3};
use physbridge_worker::{PhysicsEngine, ReferenceEngine, WorkerHandle};

use crate::config::SessionConfig;
use crate::driver::{DriverState, LoopDriver};
use crate::sampler::{apply_frame, SampleStats};
use crate::scene::SceneGraph;

/// Out-of-band state override.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Override {
    /// Teleport to a position.
    Position(Vec3),
    /// Re-orient from Euler angles (radians, X then Y then Z).
    Rotation(Vec3),
}

/// Session-wide counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Steps sent to the worker.
    pub steps_sent: u64,
    /// Frames received back.
    pub frames_received: u64,
    /// `sync` messages applied.
    pub syncs_received: u64,
    /// Body transforms written into the scene.
    pub bodies_applied: u64,
    /// Body transforms left untouched for lack of a current index.
    pub bodies_stale: u64,
}

/// Everything needed to register one renderable object.
pub struct Registration<F> {
    kind: ShapeKind,
    object: ObjectId,
    descriptor_fn: F,
    args_transform: fn(ShapeArgs) -> ShapeArgs,
    instances: Option<u32>,
}

impl<F> Registration<F>
where
    F: FnMut(u32) -> BodyDescriptor,
{
    /// A single-body registration using the kind's default args transform.
    ///
    /// `descriptor_fn` is called once per instance index.
    pub fn new(kind: ShapeKind, object: ObjectId, descriptor_fn: F) -> Self {
        Self {
            kind,
            object,
            descriptor_fn,
            args_transform: kind.default_args_transform(),
            instances: None,
        }
    }

    /// Registers `count` instances of a batched object.
    ///
    /// The object is driven through its instance matrices even when
    /// `count` is 1.
    #[must_use]
    pub fn instances(mut self, count: u32) -> Self {
        self.instances = Some(count);
        self
    }

    /// Replaces the args normalization.
    #[must_use]
    pub fn args_transform(mut self, transform: fn(ShapeArgs) -> ShapeArgs) -> Self {
        self.args_transform = transform;
        self
    }
}

/// One configured simulation and its registry.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    worker: WorkerHandle,
    registry: BodyRegistry,
    driver: LoopDriver,
    stats: SessionStats,
    closed: bool,
}

impl Session {
    fn start<E>(config: SessionConfig, engine: E) -> BridgeResult<Self>
    where
        E: PhysicsEngine + 'static,
    {
        config.init_message().validate()?;
        let worker = WorkerHandle::spawn(engine)?;
        tracing::info!(
            gravity = ?config.gravity,
            tolerance = config.tolerance,
            step = config.step,
            capacity = config.capacity,
            "session created"
        );

        Ok(Self {
            driver: LoopDriver::new(config.capacity),
            config,
            worker,
            registry: BodyRegistry::new(),
            stats: SessionStats::default(),
            closed: false,
        })
    }

    fn ensure_open(&self) -> BridgeResult<()> {
        if self.closed {
            Err(BridgeError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn send(&mut self, message: ControllerMessage) -> BridgeResult<()> {
        let op = message.op();
        if let Err(err) = self.worker.send(message) {
            tracing::warn!(op, "worker unavailable, closing session");
            self.close();
            return Err(err);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.driver.halt();
    }

    fn register<S, F>(&mut self, scene: &mut S, mut registration: Registration<F>) -> BridgeResult<Vec<BodyId>>
    where
        S: SceneGraph + ?Sized,
        F: FnMut(u32) -> BodyDescriptor,
    {
        self.ensure_open()?;
        let object = registration.object;
        if self.registry.entry(object).is_some() {
            return Err(BridgeError::AlreadyRegistered(object));
        }
        let group = BodyRegistry::group_for(object, registration.instances)?;
        let ids = group.ids().to_vec();

        let descriptors: Vec<BodyDescriptor> = (0..registration.instances.unwrap_or(1))
            .map(|i| {
                let mut descriptor = (registration.descriptor_fn)(i);
                descriptor.args = (registration.args_transform)(descriptor.args);
                descriptor
            })
            .collect();

        let kind = registration.kind;
        let scales: Vec<Vec3> = descriptors.iter().map(|d| d.scale).collect();
        let poses: Vec<InitialPose> = descriptors.iter().map(InitialPose::from).collect();
        let message = match &group {
            BodyGroup::Single(id) => {
                let descriptor = descriptors
                    .into_iter()
                    .next()
                    .ok_or(BridgeError::EmptyInstanceGroup(object))?;
                ControllerMessage::AddBody {
                    id: *id,
                    kind,
                    descriptor,
                }
            }
            BodyGroup::Instanced(instances) => ControllerMessage::AddBodies {
                ids: instances.clone(),
                kind,
                descriptors,
            },
        };
        message.validate()?;

        if self.driver.activate() {
            let init = self.config.init_message();
            self.send(init)?;
            tracing::debug!("init sent");
        }
        self.send(message)?;
        self.registry.register(object, kind, registration.instances, scales)?;
        apply_initial_transforms(scene, object, &group, &poses);

        tracing::debug!(%object, %kind, bodies = ids.len(), "bodies registered");
        Ok(ids)
    }

    fn deregister(&mut self, ids: &[BodyId], kind: ShapeKind) -> BridgeResult<()> {
        self.ensure_open()?;
        self.registry.check_kind(ids, kind)?;

        let message = match ids {
            [] => return Ok(()),
            [id] => ControllerMessage::RemoveBody { id: *id, kind },
            _ => ControllerMessage::RemoveBodies {
                ids: ids.to_vec(),
                kind,
            },
        };
        message.validate()?;
        self.send(message)?;

        let removed = self.registry.deregister(ids);
        tracing::debug!(%kind, requested = ids.len(), removed, "bodies deregistered");
        Ok(())
    }

    fn apply_override(&mut self, id: BodyId, value: Override) -> BridgeResult<()> {
        self.ensure_open()?;
        let message = match value {
            Override::Position(position) => ControllerMessage::SetPosition { id, position },
            Override::Rotation(rotation) => ControllerMessage::SetRotation { id, rotation },
        };
        message.validate()?;
        self.send(message)
    }

    /// Handles every reply waiting from the worker. Returns how many.
    fn pump(&mut self) -> BridgeResult<usize> {
        if self.closed {
            return Err(BridgeError::SessionClosed);
        }
        let mut handled = 0;
        loop {
            match self.worker.try_recv() {
                Ok(Some(WorkerMessage::Sync {
                    generation,
                    acknowledged,
                    bodies,
                })) => {
                    if self.registry.apply_sync(generation, acknowledged, &bodies) {
                        self.stats.syncs_received += 1;
                    }
                    handled += 1;
                }
                Ok(Some(WorkerMessage::Frame { buffers })) => {
                    self.driver.on_frame(buffers);
                    self.stats.frames_received += 1;
                    handled += 1;
                }
                Ok(None) => return Ok(handled),
                Err(err) => {
                    tracing::warn!("simulation worker lost");
                    self.close();
                    return Err(err);
                }
            }
        }
    }

    fn frame<S>(&mut self, scene: &mut S) -> BridgeResult<SampleStats>
    where
        S: SceneGraph + ?Sized,
    {
        self.pump()?;

        if let Some(step) = self.driver.next_step() {
            self.send(step)?;
            self.stats.steps_sent += 1;
        }

        let sample = apply_frame(&self.registry, self.driver.front(), scene);
        self.stats.bodies_applied += sample.applied as u64;
        self.stats.bodies_stale += sample.stale as u64;
        Ok(sample)
    }

    fn terminate(&mut self) {
        let was_open = !self.closed;
        self.close();
        self.worker.terminate();
        if was_open {
            tracing::info!(
                steps = self.stats.steps_sent,
                frames = self.stats.frames_received,
                "session terminated"
            );
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Registration pose of one body, kept until its add message is sent.
struct InitialPose {
    position: Vec3,
    orientation: Quaternion,
    scale: Vec3,
}

impl From<&BodyDescriptor> for InitialPose {
    fn from(descriptor: &BodyDescriptor) -> Self {
        Self {
            position: descriptor.position,
            orientation: Quaternion::from_euler(descriptor.rotation),
            scale: descriptor.scale,
        }
    }
}

/// Writes the registration pose into the scene before the first frame.
fn apply_initial_transforms<S>(scene: &mut S, object: ObjectId, group: &BodyGroup, poses: &[InitialPose])
where
    S: SceneGraph + ?Sized,
{
    match group {
        BodyGroup::Single(_) => {
            if let Some(pose) = poses.first() {
                scene.set_position(object, pose.position);
                scene.set_orientation(object, pose.orientation);
                scene.set_scale(object, pose.scale);
            }
        }
        BodyGroup::Instanced(ids) => {
            for (id, pose) in ids.iter().zip(poses) {
                let Some(instance) = id.instance else {
                    continue;
                };
                let matrix = Mat4::compose(pose.position, pose.orientation, pose.scale);
                scene.set_instance_matrix(object, instance, matrix);
            }
            scene.mark_instances_dirty(object);
        }
    }
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Cloneable handle to a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    /// Starts a session on the reference engine with default capacity.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Protocol`] for out-of-range parameters,
    /// [`BridgeError::SessionClosed`] if the worker cannot start.
    pub fn create(gravity: Vec3, tolerance: f32, step: f32) -> BridgeResult<Self> {
        Self::with_config(SessionConfig::new(gravity, tolerance, step))
    }

    /// Starts a session on the reference engine.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub fn with_config(config: SessionConfig) -> BridgeResult<Self> {
        Self::with_engine(config, ReferenceEngine::new())
    }

    /// Starts a session on a caller-supplied engine.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub fn with_engine<E>(config: SessionConfig, engine: E) -> BridgeResult<Self>
    where
        E: PhysicsEngine + 'static,
    {
        if config.capacity == 0 {
            return Err(ProtocolError::InvalidParams("capacity must be > 0").into());
        }
        let session = Session::start(config, engine)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(session)),
        })
    }

    /// Registers an object's bodies and sends them to the worker.
    ///
    /// Once the worker has been sent the bodies, the initial pose is written
    /// into `scene` so the object looks right before the first frame. A
    /// failed registration leaves `scene` untouched. The returned identifiers are
    /// needed for [`deregister_body`](Self::deregister_body).
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`], [`BridgeError::AlreadyRegistered`],
    /// [`BridgeError::EmptyInstanceGroup`], or [`BridgeError::Protocol`]
    /// when a descriptor fails validation.
    pub fn register_body<S, F>(&self, scene: &mut S, registration: Registration<F>) -> BridgeResult<Vec<BodyId>>
    where
        S: SceneGraph + ?Sized,
        F: FnMut(u32) -> BodyDescriptor,
    {
        self.inner.lock().register(scene, registration)
    }

    /// Removes bodies. Safe before the worker has acknowledged them.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`], or [`BridgeError::ShapeMismatch`]
    /// if `kind` differs from the registered kind.
    pub fn deregister_body(&self, ids: &[BodyId], kind: ShapeKind) -> BridgeResult<()> {
        self.inner.lock().deregister(ids, kind)
    }

    /// Overrides a body's position or rotation outside the step loop.
    ///
    /// Unknown bodies are ignored by the worker.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`], or [`BridgeError::Protocol`] for
    /// non-finite values.
    pub fn apply_override(&self, id: BodyId, value: Override) -> BridgeResult<()> {
        self.inner.lock().apply_override(id, value)
    }

    /// One display tick: handle worker replies, send the next step if the
    /// previous frame is back, and write the latest frame into `scene`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] once the session has ended.
    pub fn frame<S>(&self, scene: &mut S) -> BridgeResult<SampleStats>
    where
        S: SceneGraph + ?Sized,
    {
        self.inner.lock().frame(scene)
    }

    /// Handles waiting worker replies without stepping or sampling.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SessionClosed`] once the session has ended.
    pub fn pump(&self) -> BridgeResult<usize> {
        self.inner.lock().pump()
    }

    /// Ends the session and joins the worker. Idempotent.
    pub fn terminate(&self) {
        self.inner.lock().terminate();
    }

    /// Ordinal of `id` in the latest `sync`, if still registered.
    #[must_use]
    pub fn resolve_index(&self, id: BodyId) -> Option<usize> {
        self.inner.lock().registry.resolve_index(id)
    }

    /// Identifier to ordinal mapping of the latest `sync`.
    #[must_use]
    pub fn synced_ordinals(&self) -> HashMap<BodyId, usize> {
        self.inner.lock().registry.ordinals().clone()
    }

    /// Generation of the latest applied `sync`.
    #[must_use]
    pub fn sync_generation(&self) -> Option<u64> {
        self.inner.lock().registry.generation()
    }

    /// Bodies currently registered on the controller side.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.inner.lock().registry.body_count()
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.inner.lock().stats
    }

    /// Loop driver state.
    #[must_use]
    pub fn driver_state(&self) -> DriverState {
        self.inner.lock().driver.state()
    }

    /// Steps outstanding (never more than one).
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.lock().driver.in_flight()
    }

    /// True once terminated or the worker is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Session parameters.
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.inner.lock().config.clone()
    }
}
