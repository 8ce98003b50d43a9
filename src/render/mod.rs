//! 渲染模块
//!
//! 粒子模拟与二维绘制。宿主通过 [`Surface`] 提供绘制目标，
//! 无窗口时使用软件光栅化的 [`Canvas`]。

pub mod particles;
pub mod raster;
pub mod renderer;
pub mod surface;

pub use particles::{Color, Particle, ParticleId, ParticleKind, ParticleRegistry, ParticleShape};
pub use raster::Canvas;
pub use renderer::{FrameStats, ParticleRenderer};
pub use surface::{DrawCommand, RecordingSurface, Surface};
