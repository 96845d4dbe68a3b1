//! # PHYSBRIDGE Demo
//!
//! Headless run of the bridge against an in-memory scene:
//! a static ground plane, a falling box and a batch of spheres.
//!
//! ```text
//! physbridge-demo [config.toml]
//! RUST_LOG=physbridge=debug physbridge-demo
//! ```

use std::process::ExitCode;
use std::time::{Duration, Instant};

use physbridge::{
    BodyDescriptor, InMemoryScene, Registration, SessionConfig, SessionHandle, ShapeArgs,
    ShapeKind, Vec3,
};
use physbridge::shared::DISPLAY_RATE;

/// Display frames to run.
const FRAMES: u32 = 180;

/// Spheres in the instanced batch.
const SPHERES: u32 = 5;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config() -> Result<SessionConfig, physbridge::ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => SessionConfig::load(path),
        None => Ok(SessionConfig::default()),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "cannot load session config");
            return ExitCode::FAILURE;
        }
    };

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "demo failed");
            ExitCode::FAILURE
        }
    }
}

fn run(config: SessionConfig) -> physbridge::BridgeResult<()> {
    let session = SessionHandle::with_config(config)?;
    let mut scene = InMemoryScene::new();

    // === GROUND ===
    let ground = scene.spawn();
    session.register_body(
        &mut scene,
        Registration::new(ShapeKind::Plane, ground, |_| {
            BodyDescriptor::new(ShapeKind::Plane)
                .with_rotation(Vec3::new(-std::f32::consts::FRAC_PI_2, 0.0, 0.0))
        }),
    )?;

    // === FALLING BOX ===
    // Full size 1 x 1 x 1; the default Box args transform halves it
    let crate_box = scene.spawn();
    let box_ids = session.register_body(
        &mut scene,
        Registration::new(ShapeKind::Box, crate_box, |_| {
            BodyDescriptor::new(ShapeKind::Box)
                .with_mass(1.0)
                .at(Vec3::new(0.0, 5.0, 0.0))
                .with_angular_velocity(Vec3::new(0.0, 1.5, 0.0))
                .with_args(ShapeArgs::Box {
                    half_extents: Vec3::ONE,
                })
        }),
    )?;

    // === SPHERE BATCH ===
    let spheres = scene.spawn_instanced(SPHERES);
    let sphere_ids = session.register_body(
        &mut scene,
        Registration::new(ShapeKind::Sphere, spheres, |i| {
            BodyDescriptor::new(ShapeKind::Sphere)
                .with_mass(0.5)
                .at(Vec3::new(i as f32 * 1.5 - 3.0, 3.0 + i as f32, 0.0))
                .with_scale(Vec3::ONE * 0.5)
                .with_args(ShapeArgs::Sphere { radius: 0.5 })
        })
        .instances(SPHERES),
    )?;

    tracing::info!(
        bodies = session.body_count(),
        spheres = sphere_ids.len(),
        "scene registered"
    );

    // === DISPLAY LOOP ===
    let frame_time = Duration::from_micros(1_000_000 / u64::from(DISPLAY_RATE));
    let mut next_frame = Instant::now();

    for frame in 0..FRAMES {
        let now = Instant::now();
        if now < next_frame {
            std::thread::sleep(next_frame - now);
        }
        next_frame += frame_time;

        let sample = session.frame(&mut scene)?;

        if frame % (DISPLAY_RATE / 2) == 0 {
            let box_y = scene.position(crate_box).map_or(f32::NAN, |p| p.y);
            let sphere_y = scene
                .instance_matrix(spheres, 0)
                .map_or(f32::NAN, |m| m.translation().y);
            tracing::info!(
                frame,
                box_y,
                sphere_y,
                applied = sample.applied,
                stale = sample.stale,
                "frame"
            );
        }
    }

    // Unmount the box and let the worker catch up
    session.deregister_body(&box_ids, ShapeKind::Box)?;
    scene.despawn(crate_box);
    for _ in 0..10 {
        session.frame(&mut scene)?;
        std::thread::sleep(frame_time);
    }

    let stats = session.stats();
    tracing::info!(
        steps = stats.steps_sent,
        frames = stats.frames_received,
        syncs = stats.syncs_received,
        applied = stats.bodies_applied,
        stale = stats.bodies_stale,
        "demo finished"
    );
    session.terminate();
    Ok(())
}
