use super::palette::ValueRange;
use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::render::particles::ParticleShape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 持续发射模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMode {
    Clear,
    Overcast,
    Storm,
    Blizzard,
}

impl WeatherMode {
    pub const ALL: [WeatherMode; 4] = [Self::Clear, Self::Overcast, Self::Storm, Self::Blizzard];

    /// 天气轮换中的下一个模式
    pub fn next(self) -> Self {
        match self {
            Self::Clear => Self::Overcast,
            Self::Overcast => Self::Storm,
            Self::Storm => Self::Blizzard,
            Self::Blizzard => Self::Clear,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Overcast => "overcast",
            Self::Storm => "storm",
            Self::Blizzard => "blizzard",
        }
    }
}

impl fmt::Display for WeatherMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WeatherMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" | "sunny" => Ok(Self::Clear),
            "overcast" | "cloudy" => Ok(Self::Overcast),
            "storm" | "stormy" => Ok(Self::Storm),
            "blizzard" | "snow" => Ok(Self::Blizzard),
            other => Err(ConfigError::ParseError(format!("unknown weather mode `{other}`"))),
        }
    }
}

/// 单个天气模式的发射参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherProfile {
    /// 该模式下环境粒子的容量
    pub cap: usize,
    /// 水平漂移幅度
    pub drift: f32,
    /// 下落速度区间
    pub fall_speed: ValueRange,
    /// 尺寸区间
    pub size: ValueRange,
    /// 重力倍率
    pub gravity_scale: f32,
    /// 每个粒子被替换为闪电的概率
    pub bolt_probability: f32,
    /// 寿命尺度
    pub max_life: f32,
    /// 常规粒子形状
    pub shape: ParticleShape,
}

impl WeatherProfile {
    fn calm(cap: usize, drift: f32, fall_speed: ValueRange) -> Self {
        Self {
            cap,
            drift,
            fall_speed,
            size: ValueRange::new(2.0, 5.0),
            gravity_scale: 0.0,
            bolt_probability: 0.0,
            max_life: 4.0,
            shape: ParticleShape::Disc,
        }
    }

    fn validate(&self, mode: WeatherMode) -> ConfigResult<()> {
        if self.cap == 0 {
            return Err(ConfigError::ValidationError(format!(
                "weather.{mode}.cap must be greater than 0"
            )));
        }
        if !(0.0..=1.0).contains(&self.bolt_probability) {
            return Err(ConfigError::ValidationError(format!(
                "weather.{mode}.bolt_probability must be within [0, 1]"
            )));
        }
        if !(self.max_life.is_finite() && self.max_life > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "weather.{mode}.max_life must be positive"
            )));
        }
        if !(self.drift.is_finite() && self.gravity_scale.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "weather.{mode}: non-finite motion parameter"
            )));
        }
        self.fall_speed.validate(&format!("weather.{mode}.fall_speed"))?;
        self.size.validate(&format!("weather.{mode}.size"))
    }
}

/// 天气配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// 自动轮换天气的间隔（tick），`None` 表示不轮换
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycle_ticks: Option<u32>,
    pub clear: WeatherProfile,
    pub overcast: WeatherProfile,
    pub storm: WeatherProfile,
    pub blizzard: WeatherProfile,
}

impl_default!(WeatherConfig {
    cycle_ticks: None,
    clear: WeatherProfile::calm(50, 0.3, ValueRange::new(0.5, 1.5)),
    overcast: WeatherProfile::calm(100, 0.6, ValueRange::new(1.0, 2.5)),
    storm: WeatherProfile {
        bolt_probability: 0.1,
        size: ValueRange::new(1.0, 3.0),
        ..WeatherProfile::calm(200, 1.5, ValueRange::new(3.0, 6.0))
    },
    blizzard: WeatherProfile::calm(300, 3.0, ValueRange::new(1.5, 3.5)),
});

impl WeatherConfig {
    pub fn profile(&self, mode: WeatherMode) -> &WeatherProfile {
        match mode {
            WeatherMode::Clear => &self.clear,
            WeatherMode::Overcast => &self.overcast,
            WeatherMode::Storm => &self.storm,
            WeatherMode::Blizzard => &self.blizzard,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for mode in WeatherMode::ALL {
            self.profile(mode).validate(mode)?;
        }
        if self.cycle_ticks == Some(0) {
            return Err(ConfigError::ValidationError(
                "weather.cycle_ticks must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
