//! 引擎主入口
//!
//! 定义 `ParticleEngine`：持有注册表和各子系统，每个 tick 按固定顺序执行
//! 发射 → 积分 → 剔除 → 投影 → 渲染。

use crate::config::{EngineConfig, LoggingConfig, WeatherMode};
use crate::render::particles::{
    CullPolicy, DepthProjector, EmitterGroup, Emitter, ParticleRegistry, PhysicsIntegrator,
    ShapeMix, SpawnOutcome,
};
use crate::render::renderer::{FrameStats, ParticleRenderer};
use crate::render::surface::Surface;
use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::countdown::{Countdown, EffectTimers};
use super::error::{EngineError, EngineResult, RenderError};

/// 初始化日志系统
///
/// 优先使用 `RUST_LOG` 环境变量，未设置时使用配置中的级别。
/// 重复调用无副作用。
pub fn initialize_logging(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.as_directive()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 单个 tick 的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// tick 序号（从 1 开始）
    pub tick: u64,
    pub spawned: usize,
    pub evicted: usize,
    pub culled: usize,
    pub wrapped: usize,
    /// tick 结束时的存活数
    pub live: usize,
    /// 本 tick 的渲染结果，表面丢失时为 `None`
    pub frame: Option<FrameStats>,
    /// 本 tick 到期的限时效果
    pub expired_effects: Vec<String>,
}

/// 累计统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub ticks: u64,
    pub frames_rendered: u64,
    /// 因表面丢失跳过的渲染次数
    pub frames_skipped: u64,
    pub spawned: u64,
    pub evicted: u64,
    pub culled: u64,
}

/// 粒子引擎
///
/// 单线程拥有注册表，是其唯一写入者。宿主事件（爆发、拖尾、星空）
/// 在帧之间调用，粒子立即进入注册表，因此总在下一次积分之前。
///
/// # 示例
///
/// ```ignore
/// let mut engine = ParticleEngine::new(EngineConfig::default());
/// engine.mount(RecordingSurface::new(800.0, 600.0))?;
/// engine.burst(&ShapeMix::single(ParticleShape::Star), 20, 400.0, 300.0);
/// let report = engine.tick()?;
/// ```
///
/// # 生命周期
///
/// 1. **创建**：`new` 只构建子系统，不校验配置
/// 2. **挂载**：`mount` 校验配置并接管表面
/// 3. **运行**：宿主或 [`FrameScheduler`](super::scheduler::FrameScheduler) 逐帧调用 `tick`
/// 4. **卸载**：`unmount` 归还表面
pub struct ParticleEngine<S: Surface> {
    config: EngineConfig,
    registry: ParticleRegistry,
    integrator: PhysicsIntegrator,
    cull: CullPolicy,
    projector: DepthProjector,
    renderer: ParticleRenderer,
    rng: StdRng,
    surface: Option<S>,
    pointer: Option<Vec2>,
    /// 上个 tick 之后由宿主事件产生的生成结果，计入下一个 tick 的报告
    between_ticks: SpawnOutcome,
    continuous: Option<WeatherMode>,
    weather_cycle: Option<Countdown>,
    effects: EffectTimers,
    stats: EngineStats,
}

impl<S: Surface> ParticleEngine<S> {
    pub fn new(config: EngineConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let renderer = ParticleRenderer::new(rng.gen());

        Self {
            registry: ParticleRegistry::new(config.max_particles),
            integrator: PhysicsIntegrator::from_config(&config),
            cull: CullPolicy::new(config.bounds),
            projector: DepthProjector::from_config(&config),
            renderer,
            rng,
            surface: None,
            pointer: None,
            between_ticks: SpawnOutcome::default(),
            continuous: None,
            weather_cycle: None,
            effects: EffectTimers::new(),
            stats: EngineStats::default(),
            config,
        }
    }

    /// 挂载到表面
    ///
    /// 配置无效时拒绝启动，表面随错误一起丢弃。
    pub fn mount(&mut self, surface: S) -> EngineResult<()> {
        if self.surface.is_some() {
            return Err(EngineError::AlreadyMounted);
        }
        self.config.validate()?;

        let size = surface.size();
        self.surface = Some(surface);
        tracing::info!(
            target: "particles",
            "Mounted on {}x{} surface (cap {})",
            size.x,
            size.y,
            self.config.max_particles
        );
        Ok(())
    }

    /// 卸载并归还表面；未挂载时返回 `None`
    pub fn unmount(&mut self) -> Option<S> {
        let surface = self.surface.take();
        if surface.is_some() {
            tracing::info!(target: "particles", "Unmounted ({} live particles)", self.registry.len());
        }
        surface
    }

    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        self.surface.as_mut()
    }

    /// 在 `(x, y)` 处发出一次径向爆发，返回进入注册表的粒子数
    ///
    /// 注册表立即增长 `min(count, max_particles - len)`，其余位置
    /// 通过淘汰最旧的粒子腾出。
    pub fn burst(&mut self, mix: &ShapeMix, count: usize, x: f32, y: f32) -> usize {
        let keep = count.min(self.registry.cap());
        self.spawn_burst(mix, count, keep, Vec2::new(x, y), None)
    }

    /// 同 [`burst`](Self::burst)，但爆发分组的存活数不超过 `cap`，
    /// 超出时淘汰该分组中最旧的粒子
    pub fn burst_capped(&mut self, mix: &ShapeMix, count: usize, x: f32, y: f32, cap: usize) -> usize {
        let keep = count.min(cap).min(self.registry.cap());
        self.spawn_burst(mix, count, keep, Vec2::new(x, y), Some(cap))
    }

    fn spawn_burst(
        &mut self,
        mix: &ShapeMix,
        count: usize,
        keep: usize,
        origin: Vec2,
        group_cap: Option<usize>,
    ) -> usize {
        if count == 0 {
            return 0;
        }
        let particles = Emitter::new(&self.config).burst_tail(mix, count, keep, origin, &mut self.rng);
        tracing::debug!(
            target: "particles",
            "Burst of {} at ({}, {}), {} kept",
            count,
            origin.x,
            origin.y,
            particles.len()
        );

        let mut outcome = match group_cap {
            Some(cap) => self.registry.spawn_capped(particles, EmitterGroup::Burst, cap),
            None => self.registry.spawn(particles),
        };
        // 未生成的部分与注册表内丢弃的一样计入淘汰
        outcome.evicted += count - keep;
        self.record(outcome)
    }

    /// 在 `(x, y)` 处留下一个拖尾粒子
    pub fn trail(&mut self, x: f32, y: f32) -> usize {
        let particle = Emitter::new(&self.config).trail(Vec2::new(x, y), &mut self.rng);
        let outcome = self.registry.spawn([particle]);
        self.record(outcome)
    }

    /// 生成 `count` 个深度星空粒子
    pub fn seed_field(&mut self, count: usize) -> usize {
        let keep = count.min(self.registry.cap());
        let particles = Emitter::new(&self.config).field(keep, &mut self.rng);
        tracing::debug!(target: "particles", "Seeding depth field with {} particles", keep);
        let mut outcome = self.registry.spawn(particles);
        outcome.evicted += count - keep;
        self.record(outcome)
    }

    fn record(&mut self, outcome: SpawnOutcome) -> usize {
        self.between_ticks = self.between_ticks.merge(outcome);
        outcome.inserted
    }

    /// 开始（或切换）持续发射
    pub fn start_continuous(&mut self, mode: WeatherMode) {
        if self.continuous != Some(mode) {
            tracing::info!(target: "particles", "Continuous emission: {}", mode);
        }
        self.continuous = Some(mode);
        self.weather_cycle = self.config.weather.cycle_ticks.map(Countdown::repeating);
    }

    /// 停止持续发射；已有粒子自然消亡
    pub fn stop_continuous(&mut self) {
        if self.continuous.take().is_some() {
            tracing::info!(target: "particles", "Continuous emission stopped");
        }
        self.weather_cycle = None;
    }

    pub fn continuous_mode(&self) -> Option<WeatherMode> {
        self.continuous
    }

    /// 设置指针位置（视口像素）；`None` 表示视口中心
    pub fn set_pointer(&mut self, pointer: Option<Vec2>) {
        self.pointer = pointer.filter(|p| p.is_finite());
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    /// 启动限时效果，持续 `ticks` 个 tick
    pub fn start_effect(&mut self, name: impl Into<String>, ticks: u32) {
        let name = name.into();
        tracing::debug!(target: "particles", "Effect '{}' for {} ticks", name, ticks);
        self.effects.start(name, ticks);
    }

    pub fn effect_active(&self, name: &str) -> bool {
        self.effects.is_active(name)
    }

    pub fn effects(&self) -> &EffectTimers {
        &self.effects
    }

    pub fn cancel_effect(&mut self, name: &str) -> bool {
        self.effects.cancel(name)
    }

    /// 执行一个 tick
    ///
    /// 表面丢失时跳过渲染并计数，不视为错误。
    pub fn tick(&mut self) -> EngineResult<TickReport> {
        if self.surface.is_none() {
            return Err(EngineError::NotMounted);
        }
        self.stats.ticks += 1;
        let mut report = TickReport {
            tick: self.stats.ticks,
            expired_effects: self.effects.tick(),
            ..TickReport::default()
        };
        for name in &report.expired_effects {
            tracing::debug!(target: "particles", "Effect '{}' expired", name);
        }

        let outcome = std::mem::take(&mut self.between_ticks).merge(self.emit());
        report.spawned = outcome.inserted;
        report.evicted = outcome.evicted;

        self.integrator.integrate(&mut self.registry);
        report.culled = self.cull.apply(&mut self.registry);
        report.wrapped = self.projector.wrap_field(&mut self.registry);
        report.live = self.registry.len();

        if let Some(surface) = self.surface.as_mut() {
            let _span = tracing::trace_span!(target: "render", "frame", tick = report.tick).entered();
            match self
                .renderer
                .render(surface, &self.registry, &self.projector, self.pointer)
            {
                Ok(frame) => {
                    self.stats.frames_rendered += 1;
                    report.frame = Some(frame);
                }
                Err(RenderError::SurfaceLost) => {
                    self.stats.frames_skipped += 1;
                    tracing::warn!(target: "render", "Surface lost, skipping frame {}", report.tick);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.stats.spawned += report.spawned as u64;
        self.stats.evicted += report.evicted as u64;
        self.stats.culled += report.culled as u64;
        Ok(report)
    }

    /// 推进天气循环并执行持续发射
    fn emit(&mut self) -> SpawnOutcome {
        let mut outcome = SpawnOutcome::default();
        if let (Some(mode), Some(cycle)) = (self.continuous, self.weather_cycle.as_mut()) {
            if cycle.tick() {
                let next = mode.next();
                tracing::info!(target: "particles", "Weather cycle: {} -> {}", mode, next);
                self.continuous = Some(next);
            }
        }

        if let Some(mode) = self.continuous {
            let cap = self.config.weather.profile(mode).cap;
            let particles = Emitter::new(&self.config).continuous(mode, &mut self.rng);
            outcome = outcome.merge(self.registry.spawn_capped(
                particles,
                EmitterGroup::Ambient,
                cap,
            ));
        }
        outcome
    }

    pub fn registry(&self) -> &ParticleRegistry {
        &self.registry
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 清空所有粒子
    pub fn clear(&mut self) {
        self.registry.clear();
        self.between_ticks = SpawnOutcome::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::render::particles::ParticleShape;
    use crate::render::surface::RecordingSurface;

    fn engine() -> ParticleEngine<RecordingSurface> {
        ParticleEngine::new(EngineConfig {
            seed: Some(7),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_mount_validates_config() {
        let mut engine = ParticleEngine::new(EngineConfig {
            max_particles: 0,
            ..EngineConfig::default()
        });
        let result = engine.mount(RecordingSurface::new(800.0, 600.0));
        assert!(matches!(
            result,
            Err(EngineError::Config(ConfigError::ValidationError(_)))
        ));
        assert!(!engine.is_mounted());
    }

    #[test]
    fn test_double_mount_rejected() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        assert!(matches!(
            engine.mount(RecordingSurface::new(800.0, 600.0)),
            Err(EngineError::AlreadyMounted)
        ));
    }

    #[test]
    fn test_tick_requires_mount() {
        let mut engine = engine();
        assert!(matches!(engine.tick(), Err(EngineError::NotMounted)));
    }

    #[test]
    fn test_burst_enters_registry_immediately() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        let before = engine.registry().len();
        assert_eq!(engine.burst(&ShapeMix::single(ParticleShape::Star), 20, 100.0, 100.0), 20);
        assert_eq!(engine.registry().len(), before + 20);

        let report = engine.tick().unwrap();
        assert_eq!(report.spawned, 20);
        assert_eq!(report.live, 20);
        assert_eq!(report.frame.map(|f| f.drawn), Some(20));

        // 已计入上一个 tick 的报告
        assert_eq!(engine.tick().unwrap().spawned, 0);
    }

    #[test]
    fn test_burst_growth_limited_by_free_space() {
        let mut engine = ParticleEngine::<RecordingSurface>::new(EngineConfig {
            max_particles: 30,
            seed: Some(2),
            ..EngineConfig::default()
        });
        let star = ShapeMix::single(ParticleShape::Star);
        engine.burst(&star, 25, 100.0, 100.0);
        assert_eq!(engine.registry().len(), 25);
        engine.burst(&star, 20, 100.0, 100.0);
        assert_eq!(engine.registry().len(), 30);
    }

    #[test]
    fn test_burst_capped_limits_burst_group() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        let star = ShapeMix::single(ParticleShape::Star);
        engine.burst(&star, 10, 400.0, 300.0);
        engine.tick().unwrap();

        engine.burst_capped(&star, 8, 400.0, 300.0, 12);
        engine.trail(100.0, 100.0);
        let report = engine.tick().unwrap();
        assert_eq!(report.evicted, 6);
        assert_eq!(engine.registry().group_len(EmitterGroup::Burst), 12);
        assert_eq!(engine.registry().group_len(EmitterGroup::Trail), 1);
    }

    #[test]
    fn test_burst_of_zero_is_noop() {
        let mut engine = engine();
        assert_eq!(engine.burst(&ShapeMix::single(ParticleShape::Disc), 0, 0.0, 0.0), 0);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_oversized_burst_only_builds_cap() {
        let mut engine = ParticleEngine::<RecordingSurface>::new(EngineConfig {
            max_particles: 10,
            seed: Some(1),
            ..EngineConfig::default()
        });
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        let inserted = engine.burst(&ShapeMix::single(ParticleShape::Disc), 10_000_000, 10.0, 10.0);
        assert_eq!(inserted, 10);
        assert_eq!(engine.registry().len(), 10);

        let report = engine.tick().unwrap();
        assert_eq!(report.spawned, 10);
        assert_eq!(report.evicted, 10_000_000 - 10);
    }

    #[test]
    fn test_oversized_field_is_limited_to_cap() {
        let mut engine = ParticleEngine::<RecordingSurface>::new(EngineConfig {
            max_particles: 8,
            seed: Some(4),
            ..EngineConfig::default()
        });
        assert_eq!(engine.seed_field(50), 8);
        assert_eq!(engine.registry().group_len(EmitterGroup::Field), 8);
    }

    #[test]
    fn test_surface_lost_skips_render() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        engine.trail(100.0, 100.0);
        if let Some(surface) = engine.surface_mut() {
            surface.destroy();
        }

        let report = engine.tick().unwrap();
        assert_eq!(report.frame, None);
        assert_eq!(report.live, 1);
        assert_eq!(engine.stats().frames_skipped, 1);
        assert_eq!(engine.surface().map(|s| s.call_count()), Some(0));
    }

    #[test]
    fn test_weather_cycle_rotates_mode() {
        let mut config = EngineConfig {
            seed: Some(3),
            ..EngineConfig::default()
        };
        config.weather.cycle_ticks = Some(2);
        let mut engine = ParticleEngine::new(config);
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        engine.start_continuous(WeatherMode::Clear);

        engine.tick().unwrap();
        assert_eq!(engine.continuous_mode(), Some(WeatherMode::Clear));
        engine.tick().unwrap();
        assert_eq!(engine.continuous_mode(), Some(WeatherMode::Overcast));

        engine.stop_continuous();
        assert_eq!(engine.continuous_mode(), None);
    }

    #[test]
    fn test_effects_expire_on_ticks() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        engine.start_effect("magnet", 2);

        assert!(engine.tick().unwrap().expired_effects.is_empty());
        assert!(engine.effect_active("magnet"));
        assert_eq!(engine.tick().unwrap().expired_effects, vec!["magnet".to_string()]);
        assert!(!engine.effect_active("magnet"));
    }

    #[test]
    fn test_non_finite_pointer_ignored() {
        let mut engine = engine();
        engine.set_pointer(Some(Vec2::new(f32::NAN, 1.0)));
        assert_eq!(engine.pointer(), None);
        engine.set_pointer(Some(Vec2::new(1.0, 2.0)));
        assert_eq!(engine.pointer(), Some(Vec2::new(1.0, 2.0)));
    }
}
