//! 核心模块单元测试
//!
//! 覆盖引擎完整帧流程的关键场景

#[cfg(test)]
mod lifecycle_tests {
    use crate::config::{EngineConfig, WeatherMode};
    use crate::core::engine::ParticleEngine;
    use crate::core::scheduler::{ManualFrameSource, Scene};
    use crate::render::particles::{ParticleShape, ShapeMix};
    use crate::render::surface::RecordingSurface;

    fn engine() -> ParticleEngine<RecordingSurface> {
        ParticleEngine::new(EngineConfig {
            seed: Some(42),
            ..EngineConfig::default()
        })
    }

    #[test]
    fn test_mount_then_unmount_makes_no_render_calls() {
        let mut engine = engine();
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        engine.burst(&ShapeMix::single(ParticleShape::Star), 20, 100.0, 100.0);
        let surface = engine.unmount().unwrap();
        assert_eq!(surface.call_count(), 0);
        assert!(engine.unmount().is_none());
    }

    #[test]
    fn test_scene_teardown_is_idempotent() {
        let mut scene = Scene::mount(
            engine(),
            RecordingSurface::new(800.0, 600.0),
            ManualFrameSource::new(),
        )
        .unwrap();
        scene.engine_mut().start_continuous(WeatherMode::Overcast);
        scene.pump(3).unwrap();

        scene.scheduler_mut().stop();
        scene.scheduler_mut().stop();
        assert_eq!(scene.scheduler().source().cancelled(), 1);
        // 停止后不再有帧可触发
        assert_eq!(scene.pump(3).unwrap(), 0);

        let surface = scene.teardown().unwrap();
        assert_eq!(surface.frame_count(), 3);
    }

    #[test]
    fn test_scene_drop_stops_scheduler() {
        let scene = Scene::mount(
            engine(),
            RecordingSurface::new(800.0, 600.0),
            ManualFrameSource::new(),
        )
        .unwrap();
        assert!(scene.scheduler().is_running());
        drop(scene);
    }

    #[test]
    fn test_scheduler_continues_after_surface_loss() {
        let mut scene = Scene::mount(
            engine(),
            RecordingSurface::new(800.0, 600.0),
            ManualFrameSource::new(),
        )
        .unwrap();
        scene.engine_mut().start_continuous(WeatherMode::Clear);
        assert_eq!(scene.pump(2).unwrap(), 2);

        if let Some(surface) = scene.engine_mut().surface_mut() {
            surface.destroy();
        }
        assert_eq!(scene.pump(3).unwrap(), 3);
        assert!(scene.scheduler().is_running());
        assert_eq!(scene.engine().stats().frames_skipped, 3);

        if let Some(surface) = scene.engine_mut().surface_mut() {
            surface.restore();
        }
        assert_eq!(scene.pump(1).unwrap(), 1);
        assert_eq!(scene.engine().stats().frames_rendered, 3);
    }
}

#[cfg(test)]
mod emission_tests {
    use crate::config::{EngineConfig, ValueRange, WeatherMode};
    use crate::core::engine::ParticleEngine;
    use crate::render::particles::{EmitterGroup, ParticleShape, ShapeMix};
    use crate::render::surface::RecordingSurface;
    use glam::Vec3;

    fn still_config(max_particles: usize) -> EngineConfig {
        let mut config = EngineConfig {
            max_particles,
            gravity: Vec3::ZERO,
            seed: Some(5),
            ..EngineConfig::default()
        };
        config.palette.disc.speed = ValueRange::fixed(0.0);
        config.palette.disc.upward_bias = 0.0;
        config
    }

    fn mounted(config: EngineConfig) -> ParticleEngine<RecordingSurface> {
        let mut engine = ParticleEngine::new(config);
        engine.mount(RecordingSurface::new(800.0, 600.0)).unwrap();
        engine
    }

    #[test]
    fn test_burst_count_respects_cap() {
        let mut engine = mounted(still_config(100));
        let disc = ShapeMix::single(ParticleShape::Disc);

        engine.burst(&disc, 90, 400.0, 300.0);
        engine.tick().unwrap();
        assert_eq!(engine.registry().len(), 90);

        engine.burst(&disc, 20, 400.0, 300.0);
        let report = engine.tick().unwrap();
        // 增量为 min(20, cap - size)，其余为淘汰
        assert_eq!(engine.registry().len(), 100);
        assert_eq!(report.spawned, 20);
        assert_eq!(report.evicted, 10);
    }

    #[test]
    fn test_burst_expires_after_exact_tick_count() {
        let mut engine = mounted(still_config(500));
        engine.burst(&ShapeMix::single(ParticleShape::Disc), 20, 400.0, 300.0);

        // max_life = 1, decay_rate = 0.01 → ceil(1 / 0.01) = 100
        for _ in 0..99 {
            engine.tick().unwrap();
        }
        assert_eq!(engine.registry().len(), 20);

        let report = engine.tick().unwrap();
        assert_eq!(report.culled, 20);
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_burst_with_gravity_is_gone_within_lifetime() {
        let mut engine = mounted(EngineConfig {
            seed: Some(9),
            ..EngineConfig::default()
        });
        engine.burst(&ShapeMix::single(ParticleShape::Star), 20, 400.0, 300.0);
        for _ in 0..100 {
            engine.tick().unwrap();
        }
        assert!(engine.registry().is_empty());
    }

    #[test]
    fn test_storm_never_exceeds_cap() {
        let mut engine = mounted(EngineConfig {
            max_particles: 150,
            seed: Some(13),
            ..EngineConfig::default()
        });
        engine.start_continuous(WeatherMode::Storm);

        let storm_cap = engine.config().weather.storm.cap;
        let mut saw_full = false;
        for _ in 0..100 {
            let report = engine.tick().unwrap();
            assert!(report.live <= 150);
            assert!(engine.registry().group_len(EmitterGroup::Ambient) <= storm_cap);
            saw_full |= report.live == 150;
        }
        assert!(saw_full);
    }

    #[test]
    fn test_rapid_mode_toggling() {
        let mut engine = mounted(EngineConfig {
            seed: Some(17),
            ..EngineConfig::default()
        });
        for mode in WeatherMode::ALL.iter().cycle().take(40) {
            engine.start_continuous(*mode);
            engine.tick().unwrap();
            engine.stop_continuous();
            engine.tick().unwrap();
        }
        assert!(engine.registry().len() <= engine.config().max_particles);
    }

    #[test]
    fn test_ids_never_reappear() {
        let mut engine = mounted(still_config(500));
        let disc = ShapeMix::single(ParticleShape::Disc);

        engine.burst(&disc, 10, 400.0, 300.0);
        engine.tick().unwrap();
        let first: Vec<_> = engine.registry().iter().map(|p| p.id).collect();
        for _ in 0..100 {
            engine.tick().unwrap();
        }
        assert!(engine.registry().is_empty());

        engine.burst(&disc, 10, 400.0, 300.0);
        engine.tick().unwrap();
        for particle in engine.registry().iter() {
            assert!(!first.contains(&particle.id));
        }
    }

    #[test]
    fn test_field_survives_and_wraps() {
        let mut config = EngineConfig {
            seed: Some(21),
            ..EngineConfig::default()
        };
        config.max_particles = 200;
        let mut engine = mounted(config);
        engine.seed_field(100);

        let mut wrapped = 0;
        for _ in 0..1000 {
            wrapped += engine.tick().unwrap().wrapped;
        }
        assert_eq!(engine.registry().group_len(EmitterGroup::Field), 100);
        assert!(wrapped > 0);
        for particle in engine.registry().iter() {
            assert!((0.0..=100.0).contains(&particle.position.z));
        }
    }

    #[test]
    fn test_trail_particles_fade_twice_as_fast() {
        let mut engine = mounted(EngineConfig {
            seed: Some(23),
            ..EngineConfig::default()
        });
        engine.trail(400.0, 300.0);
        for _ in 0..49 {
            engine.tick().unwrap();
        }
        assert_eq!(engine.registry().group_len(EmitterGroup::Trail), 1);
        engine.tick().unwrap();
        assert_eq!(engine.registry().group_len(EmitterGroup::Trail), 0);
    }
}

#[cfg(test)]
mod pipeline_tests {
    use crate::config::EngineConfig;
    use crate::render::particles::{
        CullPolicy, DepthProjector, ParticleKind, ParticleRegistry, ParticleShape, Particle,
        PhysicsIntegrator,
    };
    use glam::Vec3;

    #[test]
    fn test_toroidal_wrap_keeps_depth_and_direction() {
        let config = EngineConfig::default();
        let integrator = PhysicsIntegrator::from_config(&config);
        let cull = CullPolicy::new(config.bounds);
        let projector = DepthProjector::from_config(&config);
        let mut registry = ParticleRegistry::new(10);

        registry.spawn(vec![Particle::new(ParticleShape::Disc, 104.9, 50.0)
            .with_depth(30.0)
            .with_velocity(Vec3::new(0.3, 0.0, 0.0))
            .with_kind(ParticleKind::Persistent)]);

        integrator.integrate(&mut registry);
        assert_eq!(cull.apply(&mut registry), 0);
        assert_eq!(projector.wrap_field(&mut registry), 1);

        let star = &registry.snapshot()[0];
        let margin = config.depth.field_margin;
        assert!((star.position.x - (-margin + 0.2)).abs() < 1e-3);
        assert_eq!(star.position.z, 30.0);
        assert!(star.velocity.x > 0.0);
    }
}
