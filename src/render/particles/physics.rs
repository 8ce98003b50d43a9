//! 物理积分器
//!
//! 显式欧拉积分，每 tick 一步。粒子纯装饰且寿命很短，不需要更高阶积分。

use super::particle::{Particle, ParticleKind, LIFE_EPSILON, MIN_VISUAL_SIZE};
use super::registry::ParticleRegistry;
use crate::config::{BoundsConfig, EngineConfig};

/// 物理积分器
#[derive(Debug, Clone, Copy)]
pub struct PhysicsIntegrator {
    /// 基础衰减常数，所有粒子相同，只有 `max_life` 改变衰减快慢
    decay_rate: f32,
}

impl PhysicsIntegrator {
    pub fn new(decay_rate: f32) -> Self {
        Self { decay_rate }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.decay_rate)
    }

    pub fn decay_rate(&self) -> f32 {
        self.decay_rate
    }

    /// 推进单个粒子一步
    pub fn step(&self, particle: &mut Particle) {
        particle.velocity += particle.acceleration;
        particle.position += particle.velocity;
        particle.rotation += particle.rotation_speed;

        if particle.kind == ParticleKind::Expiring {
            particle.life = decay(particle.life, self.decay_rate / particle.max_life);
        }
        if !(particle.size.is_finite() && particle.size >= MIN_VISUAL_SIZE) {
            particle.size = MIN_VISUAL_SIZE;
        }
    }

    /// 推进注册表中的全部粒子，返回处理数
    pub fn integrate(&self, registry: &mut ParticleRegistry) -> usize {
        let mut count = 0;
        for particle in registry.iter_mut() {
            self.step(particle);
            count += 1;
        }
        count
    }

    /// 粒子在 `decay_rate` 下从满寿命到死亡所需的 tick 数
    pub fn ticks_to_expire(&self, max_life: f32) -> u32 {
        (max_life / self.decay_rate).ceil() as u32
    }
}

/// 扣除一步寿命，保证有限的 `life` 严格减小
///
/// 步长小于 `life` 的半个 ulp 时减法不改变结果，此时退到下一个更小的 f32。
fn decay(life: f32, step: f32) -> f32 {
    let next = life - step;
    if next < life || !life.is_finite() {
        return next;
    }
    if life > 0.0 {
        f32::from_bits(life.to_bits() - 1)
    } else if life == 0.0 {
        -f32::from_bits(1)
    } else {
        f32::from_bits(life.to_bits() + 1)
    }
}

/// 剔除策略
///
/// 每 tick 在积分之后运行一次。
#[derive(Debug, Clone, Copy)]
pub struct CullPolicy {
    bounds: BoundsConfig,
}

impl CullPolicy {
    pub fn new(bounds: BoundsConfig) -> Self {
        Self { bounds }
    }

    /// 是否应移除该粒子
    ///
    /// NaN 位置一律视为越界；星空粒子只在位置非有限时移除，越界由深度投影器环绕。
    pub fn should_remove(&self, particle: &Particle) -> bool {
        if !particle.has_finite_position() {
            return true;
        }
        match particle.kind {
            ParticleKind::Persistent => false,
            ParticleKind::Expiring => {
                particle.life <= LIFE_EPSILON
                    || !self
                        .bounds
                        .contains(particle.position.x, particle.position.y)
            }
        }
    }

    /// 对注册表执行一次剔除
    pub fn apply(&self, registry: &mut ParticleRegistry) -> usize {
        registry.cull(|p| self.should_remove(p))
    }
}
