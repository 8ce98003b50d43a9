//! 粒子发射器
//!
//! 发射器是无状态的策略：给定配置和随机源，返回一批新粒子。
//! 形状相关的初始参数集中在 [`Emitter::shaped`] 的一次 `match` 中。

use super::particle::{
    EmitterGroup, Particle, ParticleKind, ParticleShape, UnknownShape, DEFAULT_DEPTH,
};
use crate::config::{EngineConfig, ValueRange, WeatherMode};
use glam::{Vec2, Vec3};
use rand::Rng;
use std::f32::consts::{FRAC_PI_2, TAU};
use std::str::FromStr;

/// 爆发角度抖动（弧度）
const BURST_JITTER: f32 = 0.25;

/// 星空坐标范围 `[0, FIELD_EXTENT]`
pub const FIELD_EXTENT: f32 = 100.0;

/// 带权重的形状组合
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeMix {
    entries: Vec<(ParticleShape, f32)>,
}

impl ShapeMix {
    /// 由 `(形状, 权重)` 构造，非正权重被忽略
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (ParticleShape, f32)>,
    {
        Self {
            entries: entries
                .into_iter()
                .filter(|(_, w)| w.is_finite() && *w > 0.0)
                .collect(),
        }
    }

    pub fn single(shape: ParticleShape) -> Self {
        Self::new([(shape, 1.0)])
    }

    pub fn shapes(&self) -> impl Iterator<Item = ParticleShape> + '_ {
        self.entries.iter().map(|(shape, _)| *shape)
    }

    /// 按权重随机选择形状，空组合返回 `Disc`
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> ParticleShape {
        let total: f32 = self.entries.iter().map(|(_, w)| w).sum();
        if self.entries.len() < 2 || total <= 0.0 {
            return self
                .entries
                .first()
                .map(|(shape, _)| *shape)
                .unwrap_or(ParticleShape::Disc);
        }
        let mut roll = rng.gen_range(0.0..total);
        for (shape, weight) in &self.entries {
            if roll < *weight {
                return *shape;
            }
            roll -= weight;
        }
        self.entries[self.entries.len() - 1].0
    }
}

impl From<ParticleShape> for ShapeMix {
    fn from(shape: ParticleShape) -> Self {
        Self::single(shape)
    }
}

/// 解析 `"star"` 或 `"star:3,disc:1"`
impl FromStr for ShapeMix {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, weight) = match part.split_once(':') {
                Some((name, weight)) => (
                    name,
                    weight
                        .trim()
                        .parse::<f32>()
                        .map_err(|_| UnknownShape(part.to_string()))?,
                ),
                None => (part, 1.0),
            };
            entries.push((name.parse::<ParticleShape>()?, weight));
        }
        Ok(Self::new(entries))
    }
}

/// 发射器
///
/// 借用引擎配置，所有方法都是 `配置 + 随机源 → 新粒子` 的纯函数。
#[derive(Debug, Clone, Copy)]
pub struct Emitter<'a> {
    config: &'a EngineConfig,
}

impl<'a> Emitter<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// 径向爆发
    ///
    /// 第 `i` 个粒子的角度为 `2π·i/count + jitter`，
    /// 垂直速度带有向上的偏置：`vy = sin(angle)·speed - upward_bias`。
    pub fn burst<R: Rng + ?Sized>(
        &self,
        mix: &ShapeMix,
        count: usize,
        origin: Vec2,
        rng: &mut R,
    ) -> Vec<Particle> {
        self.burst_tail(mix, count, count, origin, rng)
    }

    /// 只生成爆发中最后 `keep` 个粒子
    ///
    /// 角度仍按完整的 `count` 等分，结果与 `burst` 截掉前面
    /// `count - keep` 个之后的排布相同，但不为被丢弃的粒子分配记录。
    pub fn burst_tail<R: Rng + ?Sized>(
        &self,
        mix: &ShapeMix,
        count: usize,
        keep: usize,
        origin: Vec2,
        rng: &mut R,
    ) -> Vec<Particle> {
        (count.saturating_sub(keep)..count)
            .map(|i| {
                let shape = mix.pick(rng);
                let style = self.config.palette.style(shape);
                let angle =
                    TAU * i as f32 / count as f32 + rng.gen_range(-BURST_JITTER..BURST_JITTER);
                let speed = style.speed.sample(rng);
                let velocity = Vec3::new(
                    angle.cos() * speed,
                    angle.sin() * speed - style.upward_bias,
                    0.0,
                );
                self.shaped(shape, origin, rng)
                    .with_velocity(velocity)
                    .with_group(EmitterGroup::Burst)
            })
            .collect()
    }

    /// 持续发射的一个 tick
    ///
    /// 在视口顶部发射 `continuous_per_tick` 个粒子；风暴模式下每个粒子
    /// 以配置的概率替换为闪电。
    pub fn continuous<R: Rng + ?Sized>(&self, mode: WeatherMode, rng: &mut R) -> Vec<Particle> {
        let profile = self.config.weather.profile(mode);
        let bounds = &self.config.bounds;

        (0..self.config.continuous_per_tick)
            .map(|_| {
                if profile.bolt_probability > 0.0 && rng.gen::<f32>() < profile.bolt_probability {
                    let origin = Vec2::new(
                        ValueRange::new(0.0, bounds.width).sample(rng),
                        ValueRange::new(0.0, bounds.height * 0.3).sample(rng),
                    );
                    return self
                        .shaped(ParticleShape::Bolt, origin, rng)
                        .with_rotation(FRAC_PI_2, 0.0)
                        .with_group(EmitterGroup::Ambient);
                }

                let origin = Vec2::new(
                    ValueRange::new(0.0, bounds.width).sample(rng),
                    rng.gen_range(-10.0..0.0),
                );
                let velocity = Vec3::new(
                    rng.gen_range(-1.0..1.0) * profile.drift,
                    profile.fall_speed.sample(rng),
                    0.0,
                );
                self.shaped(profile.shape, origin, rng)
                    .with_velocity(velocity)
                    .with_acceleration(self.config.gravity * profile.gravity_scale)
                    .with_size(profile.size.sample(rng))
                    .with_max_life(profile.max_life)
                    .with_group(EmitterGroup::Ambient)
            })
            .collect()
    }

    /// 在移动标记后方留下一个拖尾粒子
    pub fn trail<R: Rng + ?Sized>(&self, origin: Vec2, rng: &mut R) -> Particle {
        let style = &self.config.palette.trail;
        let angle = rng.gen_range(0.0..TAU);
        let speed = style.speed.sample(rng);
        self.shaped(ParticleShape::Trail, origin, rng)
            .with_velocity(Vec3::new(angle.cos() * speed, angle.sin() * speed, 0.0))
            .with_group(EmitterGroup::Trail)
    }

    /// 生成深度星空
    ///
    /// 星空粒子使用 `[0, 100]` 的星空坐标，不衰减，越界时环绕。
    pub fn field<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Particle> {
        (0..count)
            .map(|_| {
                let shape = if rng.gen_bool(0.2) {
                    ParticleShape::Star
                } else {
                    ParticleShape::Disc
                };
                let style = self.config.palette.style(shape);
                let position = Vec3::new(
                    rng.gen_range(0.0..FIELD_EXTENT),
                    rng.gen_range(0.0..FIELD_EXTENT),
                    rng.gen_range(0.0..FIELD_EXTENT),
                );
                let velocity = Vec3::new(
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(-0.05..0.05),
                    rng.gen_range(0.02..0.2),
                );
                Particle::new(shape, position.x, position.y)
                    .with_depth(position.z)
                    .with_velocity(velocity)
                    .with_size(style.size.sample(rng) * 0.5)
                    .with_color(style.pick_color(rng))
                    .with_rotation(rng.gen_range(0.0..TAU), rng.gen_range(-0.01..0.01))
                    .with_kind(ParticleKind::Persistent)
                    .with_group(EmitterGroup::Field)
            })
            .collect()
    }

    /// 按形状套用调色板：颜色、尺寸、寿命、重力和自转
    fn shaped<R: Rng + ?Sized>(&self, shape: ParticleShape, origin: Vec2, rng: &mut R) -> Particle {
        let style = self.config.palette.style(shape);
        let spin = style.spin.abs();
        let rotation_speed = if spin > 0.0 {
            rng.gen_range(-spin..spin)
        } else {
            0.0
        };
        let rotation = match shape {
            ParticleShape::Star => rng.gen_range(0.0..TAU),
            // 闪电默认竖直向下
            ParticleShape::Bolt => FRAC_PI_2 + rng.gen_range(-0.3..0.3),
            ParticleShape::Disc | ParticleShape::Trail => 0.0,
        };

        Particle::new(shape, origin.x, origin.y)
            .with_depth(DEFAULT_DEPTH)
            .with_acceleration(self.config.gravity * style.gravity_scale)
            .with_size(style.size.sample(rng))
            .with_color(style.pick_color(rng))
            .with_max_life(style.max_life)
            .with_rotation(rotation, rotation_speed)
    }
}
