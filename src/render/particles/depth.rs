//! 深度投影
//!
//! 用深度坐标模拟 3D：近大远小、近实远虚，并随指针产生视差。
//! 仅星空粒子使用深度；屏幕空间粒子原样投影。

use super::emitter::FIELD_EXTENT;
use super::particle::{Particle, ParticleKind};
use super::registry::ParticleRegistry;
use crate::config::EngineConfig;
use glam::Vec2;

/// 最远处的缩放/不透明度
const FAR_FACTOR: f32 = 0.3;

/// 单个粒子的可视参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// 屏幕坐标（像素）
    pub position: Vec2,
    /// 渲染缩放
    pub scale: f32,
    /// 不透明度倍率
    pub opacity: f32,
    /// 边缘柔化宽度（像素）
    pub softness: f32,
}

impl Projection {
    /// 屏幕空间粒子的恒等投影
    pub fn identity(position: Vec2) -> Self {
        Self {
            position,
            scale: 1.0,
            opacity: 1.0,
            softness: 0.0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.scale.is_finite()
            && self.opacity.is_finite()
            && self.softness.is_finite()
    }
}

/// 深度投影器
#[derive(Debug, Clone, Copy)]
pub struct DepthProjector {
    viewport: Vec2,
    parallax_strength: f32,
    blur_strength: f32,
    margin: f32,
}

impl DepthProjector {
    pub fn new(viewport: Vec2, parallax_strength: f32, blur_strength: f32, margin: f32) -> Self {
        Self {
            viewport,
            parallax_strength,
            blur_strength,
            margin,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Vec2::new(config.bounds.width, config.bounds.height),
            config.depth.parallax_strength,
            config.depth.blur_strength,
            config.depth.field_margin,
        )
    }

    fn depth_factor(depth: f32) -> f32 {
        (depth / FIELD_EXTENT).clamp(0.0, 1.0)
    }

    /// 渲染缩放：`0.3 + (depth/100)·0.7`
    pub fn depth_scale(depth: f32) -> f32 {
        FAR_FACTOR + Self::depth_factor(depth) * (1.0 - FAR_FACTOR)
    }

    /// 不透明度倍率：`0.3 + (depth/100)·0.7`
    pub fn depth_opacity(depth: f32) -> f32 {
        FAR_FACTOR + Self::depth_factor(depth) * (1.0 - FAR_FACTOR)
    }

    /// 柔化宽度，与缩放成反比
    pub fn softness(&self, depth: f32) -> f32 {
        self.blur_strength / Self::depth_scale(depth)
    }

    /// 视差偏移：`(pointer - center)·(depth/100)·k`
    ///
    /// 无指针时视为位于视口中心，偏移为零。
    pub fn parallax(&self, depth: f32, pointer: Option<Vec2>) -> Vec2 {
        match pointer {
            Some(pointer) if pointer.is_finite() => {
                let center = self.viewport * 0.5;
                (pointer - center) * Self::depth_factor(depth) * self.parallax_strength
            }
            _ => Vec2::ZERO,
        }
    }

    /// 计算粒子的可视参数，不修改粒子
    pub fn project(&self, particle: &Particle, pointer: Option<Vec2>) -> Projection {
        match particle.kind {
            ParticleKind::Expiring => Projection::identity(particle.position.truncate()),
            ParticleKind::Persistent => {
                let depth = particle.position.z;
                let field = particle.position.truncate() / FIELD_EXTENT * self.viewport;
                Projection {
                    position: field + self.parallax(depth, pointer),
                    scale: Self::depth_scale(depth),
                    opacity: Self::depth_opacity(depth),
                    softness: self.softness(depth),
                }
            }
        }
    }

    /// 星空粒子的环绕边界处理
    ///
    /// x/y 越过 `[-margin, 100 + margin]` 时从对侧进入，深度越过 `[0, 100]` 时
    /// 从另一端进入，速度不变。返回是否发生了环绕。
    pub fn wrap(&self, particle: &mut Particle) -> bool {
        if particle.kind != ParticleKind::Persistent || !particle.has_finite_position() {
            return false;
        }
        let low = -self.margin;
        let high = FIELD_EXTENT + self.margin;
        let span = high - low;
        let mut wrapped = false;

        for axis in [&mut particle.position.x, &mut particle.position.y] {
            if *axis < low || *axis > high {
                *axis = (*axis - low).rem_euclid(span) + low;
                wrapped = true;
            }
        }
        let depth = &mut particle.position.z;
        if *depth < 0.0 || *depth > FIELD_EXTENT {
            *depth = depth.rem_euclid(FIELD_EXTENT);
            wrapped = true;
        }
        wrapped
    }

    /// 对注册表中的星空粒子执行环绕，返回环绕数
    pub fn wrap_field(&self, registry: &mut ParticleRegistry) -> usize {
        registry
            .iter_mut()
            .map(|p| self.wrap(p))
            .filter(|wrapped| *wrapped)
            .count()
    }
}
