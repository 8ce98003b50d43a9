/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖和启动时校验
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod palette;
pub mod weather;

pub use palette::{PaletteConfig, ShapeStyle, ValueRange};
pub use weather::{WeatherConfig, WeatherMode, WeatherProfile};

use crate::impl_default;
use crate::render::particles::{ParticleShape, MIN_LIFE_STEP};

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 粒子引擎主配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 存活粒子上限
    pub max_particles: usize,

    /// 每 tick 的重力加速度（屏幕坐标，y 向下）
    pub gravity: Vec3,

    /// 基础寿命衰减常数
    pub decay_rate: f32,

    /// 持续发射每 tick 的粒子数
    pub continuous_per_tick: usize,

    /// 随机种子，`None` 时使用系统熵
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// 视口边界
    pub bounds: BoundsConfig,

    /// 深度投影
    pub depth: DepthConfig,

    /// 形状调色板
    pub palette: PaletteConfig,

    /// 天气模式
    pub weather: WeatherConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

impl_default!(EngineConfig {
    max_particles: 500,
    gravity: Vec3::new(0.0, 0.2, 0.0),
    decay_rate: 0.01,
    continuous_per_tick: 5,
    seed: None,
    bounds: BoundsConfig::default(),
    depth: DepthConfig::default(),
    palette: PaletteConfig::default(),
    weather: WeatherConfig::default(),
    logging: LoggingConfig::default(),
});

impl EngineConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Some(max) = env_value("PARTICLES_MAX") {
            self.max_particles = max;
        }
        if let Some(rate) = env_value("PARTICLES_DECAY_RATE") {
            self.decay_rate = rate;
        }
        if let Some(seed) = env_value("PARTICLES_SEED") {
            self.seed = Some(seed);
        }
        if let Some(width) = env_value("PARTICLES_WIDTH") {
            self.bounds.width = width;
        }
        if let Some(height) = env_value("PARTICLES_HEIGHT") {
            self.bounds.height = height;
        }
    }

    /// 验证配置
    ///
    /// 引擎在 `mount()` 时调用，非法配置会拒绝启动。
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_particles == 0 {
            return Err(ConfigError::ValidationError(
                "max_particles must be greater than 0".to_string(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::ValidationError(format!(
                "gravity must be finite, got {:?}",
                self.gravity
            )));
        }
        if !(self.decay_rate.is_finite() && self.decay_rate > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "decay_rate must be positive, got {}",
                self.decay_rate
            )));
        }
        self.bounds.validate()?;
        self.depth.validate()?;
        self.palette.validate()?;
        self.weather.validate()?;
        for shape in ParticleShape::ALL {
            self.validate_life_step(self.palette.style(shape).max_life, &format!("palette.{shape}"))?;
        }
        for mode in WeatherMode::ALL {
            self.validate_life_step(self.weather.profile(mode).max_life, &format!("weather.{mode}"))?;
        }
        Ok(())
    }

    /// 拒绝每 tick 衰减量过小、寿命在 f32 下停滞的组合
    fn validate_life_step(&self, max_life: f32, section: &str) -> ConfigResult<()> {
        let step = self.decay_rate / max_life;
        if step < MIN_LIFE_STEP {
            return Err(ConfigError::ValidationError(format!(
                "{section}.max_life {max_life} is too long for decay_rate {}: per-tick decay {step:e} is below {MIN_LIFE_STEP:e}",
                self.decay_rate
            )));
        }
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particles.toml
    /// 2. ./particles.json
    /// 3. ~/.config/particle_engine/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        let mut candidates = vec![PathBuf::from("particles.toml"), PathBuf::from("particles.json")];
        if let Some(home) = env::var_os("HOME") {
            candidates.push(
                PathBuf::from(home)
                    .join(".config")
                    .join("particle_engine")
                    .join("config.toml"),
            );
        }

        for path in candidates {
            if !path.exists() {
                continue;
            }
            let loaded = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => Self::from_json_file(&path),
                _ => Self::from_toml_file(&path),
            };
            match loaded {
                Ok(config) => {
                    tracing::info!(target: "config", "Loaded config from {:?}", path);
                    return config;
                }
                Err(e) => {
                    tracing::warn!(target: "config", "Ignoring {:?}: {}", path, e);
                }
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

fn env_value<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.trim().parse().ok())
}

/// 视口边界
///
/// 屏幕空间粒子越过 `[-margin, size + margin]` 即被剔除。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl_default!(BoundsConfig {
    width: 800.0,
    height: 600.0,
    margin: 50.0,
});

impl BoundsConfig {
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= -self.margin
            && x <= self.width + self.margin
            && y >= -self.margin
            && y <= self.height + self.margin
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width * 0.5, self.height * 0.5)
    }

    fn validate(&self) -> ConfigResult<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.width) || !positive(self.height) {
            return Err(ConfigError::ValidationError(format!(
                "bounds must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(ConfigError::ValidationError(
                "bounds.margin must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// 深度投影配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
    /// 视差强度 `k`
    pub parallax_strength: f32,
    /// 远景柔化强度
    pub blur_strength: f32,
    /// 星空环绕边距（星空坐标单位）
    pub field_margin: f32,
}

impl_default!(DepthConfig {
    parallax_strength: 0.05,
    blur_strength: 0.6,
    field_margin: 5.0,
});

impl DepthConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !self.parallax_strength.is_finite() {
            return Err(ConfigError::ValidationError(
                "depth.parallax_strength must be finite".to_string(),
            ));
        }
        if !(self.blur_strength.is_finite() && self.blur_strength >= 0.0) {
            return Err(ConfigError::ValidationError(
                "depth.blur_strength must be non-negative".to_string(),
            ));
        }
        if !(self.field_margin.is_finite() && self.field_margin >= 0.0) {
            return Err(ConfigError::ValidationError(
                "depth.field_margin must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 优先）
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    /// `EnvFilter` 指令
    pub fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
