//! 粒子渲染器
//!
//! 按形状标签分派绘制，只读取注册表和投影结果，从不修改粒子。
//! 每帧清空并整体重绘。

use crate::core::error::{RenderError, RenderResult};
use crate::render::particles::{DepthProjector, Particle, ParticleRegistry, ParticleShape, Projection};
use crate::render::surface::Surface;
use glam::{Vec2, Vec4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::PI;

/// 星形内外半径比
const STAR_INNER_RATIO: f32 = 0.5;
/// 闪电内部顶点的横向抖动（相对长度）
const BOLT_JITTER: f32 = 0.25;
/// 闪电核心线宽
const BOLT_WIDTH: f32 = 2.0;
/// 光晕线宽倍数
const GLOW_WIDTH_FACTOR: f32 = 4.0;
/// 光晕透明度倍数
const GLOW_ALPHA_FACTOR: f32 = 0.25;

/// 单帧渲染统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// 绘制的粒子数
    pub drawn: usize,
    /// 因投影非有限而跳过的粒子数
    pub skipped: usize,
    /// 发出的图元调用数（含清屏）
    pub primitives: usize,
}

/// 粒子渲染器
#[derive(Debug, Clone)]
pub struct ParticleRenderer {
    /// 闪电抖动的随机源，与模拟随机源分离
    rng: StdRng,
}

impl ParticleRenderer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 渲染一帧
    ///
    /// 表面已销毁时返回 [`RenderError::SurfaceLost`]，不发出任何绘制调用。
    pub fn render<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        registry: &ParticleRegistry,
        projector: &DepthProjector,
        pointer: Option<Vec2>,
    ) -> RenderResult<FrameStats> {
        if !surface.is_alive() {
            return Err(RenderError::SurfaceLost);
        }

        let mut stats = FrameStats::default();
        surface.clear();
        stats.primitives += 1;

        for particle in registry.iter() {
            let projection = projector.project(particle, pointer);
            if !projection.is_finite() {
                stats.skipped += 1;
                continue;
            }
            stats.primitives += self.draw(surface, particle, &projection);
            stats.drawn += 1;
        }
        Ok(stats)
    }

    /// 绘制单个粒子，返回图元调用数
    pub fn draw<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        particle: &Particle,
        projection: &Projection,
    ) -> usize {
        let size = particle.visual_size() * projection.scale;
        let alpha = particle.life.clamp(0.0, 1.0) * projection.opacity;
        let color = particle.color.to_vec4(alpha);

        match particle.shape {
            ParticleShape::Disc | ParticleShape::Trail => {
                surface.fill_circle(projection.position, size, color, projection.softness);
                1
            }
            ParticleShape::Star => {
                let points = star_points(projection.position, size, particle.rotation);
                surface.fill_polygon(&points, color);
                1
            }
            ParticleShape::Bolt => {
                let segments = 2 + (particle.id.0 % 2) as usize;
                let points = self.bolt_points(
                    projection.position,
                    size,
                    particle.rotation,
                    segments,
                );
                let glow = Vec4::new(color.x, color.y, color.z, color.w * GLOW_ALPHA_FACTOR);
                surface.stroke_polyline(&points, BOLT_WIDTH * GLOW_WIDTH_FACTOR * projection.scale, glow);
                surface.stroke_polyline(&points, BOLT_WIDTH * projection.scale, color);
                2
            }
        }
    }

    /// 闪电折线：沿 `rotation` 方向延伸 `length`，内部顶点每帧随机横向抖动
    fn bolt_points(&mut self, origin: Vec2, length: f32, rotation: f32, segments: usize) -> Vec<Vec2> {
        let direction = Vec2::from_angle(rotation);
        let normal = direction.perp();
        let step = length / segments as f32;
        let jitter = length * BOLT_JITTER;

        (0..=segments)
            .map(|i| {
                let along = origin + direction * step * i as f32;
                if i == 0 || i == segments {
                    along
                } else {
                    along + normal * self.rng.gen_range(-jitter..=jitter)
                }
            })
            .collect()
    }
}

impl Default for ParticleRenderer {
    fn default() -> Self {
        Self::new(0)
    }
}

/// 五角星的 10 个顶点，外半径 `outer`，内半径 `outer * 0.5`
pub fn star_points(center: Vec2, outer: f32, rotation: f32) -> Vec<Vec2> {
    (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 {
                outer
            } else {
                outer * STAR_INNER_RATIO
            };
            let angle = rotation - PI / 2.0 + i as f32 * PI / 5.0;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}
