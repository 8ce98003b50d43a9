//! # Particle Engine
//!
//! A real-time particle effects engine: emitters, per-tick physics, depth
//! projection and shape rendering onto a host-provided 2D surface.
//!
//! ## Features
//!
//! - **Arena Registry**: Slot-recycling particle storage with oldest-first eviction at capacity
//! - **Emitters**: Radial bursts, weather-driven continuous emission, trails and a depth field
//! - **Physics**: Explicit Euler integration with life decay and out-of-bounds culling
//! - **Depth Projection**: Scale, opacity, softness and pointer parallax from a depth coordinate
//! - **Rendering**: Disc, star, bolt and trail shapes over any [`render::Surface`]
//! - **Scheduling**: Frame-source driven scheduler with scoped teardown
//!
//! ## Architecture Design
//!
//! Every frame runs the same pipeline on a single thread:
//! - **Emit**: continuous emission joins the bursts already spawned since the last frame
//! - **Integrate**: velocity, position, rotation and life advance one step
//! - **Cull**: dead and out-of-bounds particles are removed
//! - **Project**: depth-field particles wrap and map to the viewport
//! - **Render**: the surface is cleared and redrawn from a read-only pass
//!
//! ### Example
//!
//! ```no_run
//! use particle_engine::config::{EngineConfig, WeatherMode};
//! use particle_engine::core::{ManualFrameSource, ParticleEngine, Scene};
//! use particle_engine::render::particles::{ParticleShape, ShapeMix};
//! use particle_engine::render::RecordingSurface;
//!
//! let engine = ParticleEngine::new(EngineConfig::default());
//! let mut scene = Scene::mount(engine, RecordingSurface::new(800.0, 600.0), ManualFrameSource::new())?;
//! scene.engine_mut().start_continuous(WeatherMode::Storm);
//! scene.engine_mut().burst(&ShapeMix::single(ParticleShape::Star), 20, 400.0, 300.0);
//! scene.pump(60)?;
//! let surface = scene.teardown();
//! # Ok::<(), particle_engine::core::EngineError>(())
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Engine, frame scheduler, countdowns and errors
//! - [`config`]: Configuration loading and validation
//! - [`render`]: Particles, surfaces and the renderer

/// Core engine functionality including the per-frame pipeline and scheduling
pub mod core;
/// Rendering system: particle simulation, surfaces and shape drawing
pub mod render;
/// Configuration system
pub mod config;
