//! 粒子子系统
//!
//! CPU 端粒子模拟：数据模型、注册表、发射器、物理积分和深度投影。
//!
//! ## 每 tick 流程
//!
//! ```text
//! Emitter ──spawn──▶ ParticleRegistry
//!                        │
//!          PhysicsIntegrator::integrate
//!                        │
//!              CullPolicy::apply
//!                        │
//!           DepthProjector::wrap_field
//!                        │
//!               ParticleRenderer (只读)
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! let config = EngineConfig::default();
//! let mut registry = ParticleRegistry::new(config.max_particles);
//! let emitter = Emitter::new(&config);
//! registry.spawn(emitter.burst(&ShapeMix::single(ParticleShape::Star), 20, Vec2::new(400.0, 300.0), &mut rng));
//! ```

pub mod depth;
pub mod emitter;
pub mod particle;
pub mod physics;
pub mod registry;

pub use depth::{DepthProjector, Projection};
pub use emitter::{Emitter, ShapeMix, FIELD_EXTENT};
pub use particle::{
    Color, ColorParseError, EmitterGroup, Particle, ParticleId, ParticleKind, ParticleShape,
    UnknownShape, DEFAULT_DEPTH, LIFE_EPSILON, MIN_LIFE_STEP, MIN_VISUAL_SIZE,
};
pub use physics::{CullPolicy, PhysicsIntegrator};
pub use registry::{ParticleRegistry, SpawnOutcome};
