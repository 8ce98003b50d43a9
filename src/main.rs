use glam::Vec2;
use particle_engine::config::{EngineConfig, WeatherMode};
use particle_engine::core::{
    initialize_logging, EngineError, EngineResult, ManualFrameSource, ParticleEngine, Scene,
};
use particle_engine::render::particles::{ParticleShape, ShapeMix};
use particle_engine::render::Canvas;

const DEFAULT_FRAMES: usize = 240;
const DEFAULT_OUTPUT: &str = "particles.png";
const BACKGROUND: [u8; 4] = [8, 10, 28, 255];
const FIELD_SIZE: usize = 150;
const BURST_EVERY: usize = 45;
const BURST_SIZE: usize = 24;

/// 无窗口演示：星空 + 风暴 + 周期性爆发 + 沿曲线移动的拖尾，
/// 运行指定帧数后把最后一帧写成 PNG。
///
/// 用法：`particle_engine [frames] [output.png]`
fn run() -> EngineResult<()> {
    let mut args = std::env::args().skip(1);
    let frames = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let mut config = EngineConfig::load_or_default();
    config.apply_env_overrides();
    initialize_logging(&config.logging);
    tracing::info!(target: "particles", "Particle demo starting ({} frames)", frames);

    let size = Vec2::new(config.bounds.width, config.bounds.height);
    let canvas = Canvas::with_background(size.x as u32, size.y as u32, BACKGROUND);
    let mut scene = Scene::mount(ParticleEngine::new(config), canvas, ManualFrameSource::new())?;

    scene.engine_mut().seed_field(FIELD_SIZE);
    scene.engine_mut().start_continuous(WeatherMode::Storm);
    let mix = ShapeMix::new([(ParticleShape::Star, 3.0), (ParticleShape::Disc, 1.0)]);

    for frame in 0..frames {
        let t = frame as f32 / 60.0;
        let marker = size * 0.5 + Vec2::new(t.cos() * size.x * 0.3, (t * 2.0).sin() * size.y * 0.2);

        let engine = scene.engine_mut();
        engine.set_pointer(Some(marker));
        engine.trail(marker.x, marker.y);
        if frame % BURST_EVERY == 0 {
            engine.burst(&mix, BURST_SIZE, marker.x, marker.y);
        }

        if scene.pump(1)? == 0 {
            tracing::warn!(target: "scheduler", "Scheduler stopped early at frame {}", frame);
            break;
        }
    }

    let stats = scene.engine().stats();
    tracing::info!(
        target: "particles",
        "Ran {} ticks: {} spawned, {} evicted, {} culled, {} live",
        stats.ticks,
        stats.spawned,
        stats.evicted,
        stats.culled,
        scene.engine().registry().len()
    );

    let canvas = scene.teardown().ok_or(EngineError::NotMounted)?;
    canvas.save_png(&output)?;
    tracing::info!(target: "render", "Wrote final frame to {}", output);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Particle demo failed: {}", e);
        std::process::exit(1);
    }
}
