use super::{ConfigError, ConfigResult};
use crate::impl_default;
use crate::render::particles::{Color, ParticleShape};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 数值区间 `[min, max)`
///
/// 配置文件中写作 `[min, max]`。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// 常量区间
    pub const fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    /// 均匀采样，空区间返回 `min`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..self.max)
        } else {
            self.min
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn contains(&self, value: f32) -> bool {
        if self.max > self.min {
            value >= self.min && value < self.max
        } else {
            value == self.min
        }
    }

    pub(crate) fn validate(&self, what: &str) -> ConfigResult<()> {
        if !self.is_valid() {
            return Err(ConfigError::ValidationError(format!(
                "{what}: invalid range [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl From<[f32; 2]> for ValueRange {
    fn from([min, max]: [f32; 2]) -> Self {
        Self::new(min, max)
    }
}

impl From<ValueRange> for [f32; 2] {
    fn from(range: ValueRange) -> Self {
        [range.min, range.max]
    }
}

/// 单个形状的外观与运动参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// 调色板，逐粒子随机取色
    pub colors: Vec<Color>,
    /// 尺寸区间
    pub size: ValueRange,
    /// 爆发初速度区间
    pub speed: ValueRange,
    /// 寿命尺度
    pub max_life: f32,
    /// 重力倍率，0 表示漂浮
    pub gravity_scale: f32,
    /// 爆发时向上的偏置速度
    pub upward_bias: f32,
    /// 最大自转速度（弧度/tick）
    pub spin: f32,
}

impl ShapeStyle {
    pub fn pick_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Color {
        if self.colors.is_empty() {
            return Color::WHITE;
        }
        self.colors[rng.gen_range(0..self.colors.len())]
    }

    fn validate(&self, shape: ParticleShape) -> ConfigResult<()> {
        if self.colors.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "palette.{shape}: at least one color is required"
            )));
        }
        self.size.validate(&format!("palette.{shape}.size"))?;
        self.speed.validate(&format!("palette.{shape}.speed"))?;
        if !(self.max_life.is_finite() && self.max_life > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "palette.{shape}.max_life must be positive"
            )));
        }
        if ![self.gravity_scale, self.upward_bias, self.spin]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::ValidationError(format!(
                "palette.{shape}: non-finite motion parameter"
            )));
        }
        Ok(())
    }
}

fn colors(hex: &[&str]) -> Vec<Color> {
    hex.iter().filter_map(|h| Color::from_hex(h).ok()).collect()
}

/// 形状到外观的映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub disc: ShapeStyle,
    pub star: ShapeStyle,
    pub bolt: ShapeStyle,
    pub trail: ShapeStyle,
}

impl_default!(PaletteConfig {
    disc: ShapeStyle {
        colors: colors(&["#ffffff", "#dbeafe", "#bfdbfe", "#93c5fd"]),
        size: ValueRange::new(2.0, 5.0),
        speed: ValueRange::new(2.0, 5.0),
        max_life: 1.0,
        gravity_scale: 1.0,
        upward_bias: 2.0,
        spin: 0.0,
    },
    star: ShapeStyle {
        colors: colors(&["#ffd700", "#ffed4a", "#fbbf24", "#f59e0b"]),
        size: ValueRange::new(4.0, 8.0),
        speed: ValueRange::new(3.0, 7.0),
        max_life: 1.0,
        gravity_scale: 1.0,
        upward_bias: 3.0,
        spin: 0.2,
    },
    bolt: ShapeStyle {
        colors: colors(&["#e0f2fe", "#a5f3fc", "#fde047"]),
        size: ValueRange::new(40.0, 80.0),
        speed: ValueRange::fixed(0.0),
        max_life: 0.3,
        gravity_scale: 0.0,
        upward_bias: 0.0,
        spin: 0.0,
    },
    trail: ShapeStyle {
        colors: colors(&["#8b5cf6", "#a78bfa", "#c4b5fd"]),
        size: ValueRange::new(2.0, 4.0),
        speed: ValueRange::new(0.0, 0.5),
        max_life: 0.5,
        gravity_scale: 0.0,
        upward_bias: 0.0,
        spin: 0.0,
    },
});

impl PaletteConfig {
    pub fn style(&self, shape: ParticleShape) -> &ShapeStyle {
        match shape {
            ParticleShape::Disc => &self.disc,
            ParticleShape::Star => &self.star,
            ParticleShape::Bolt => &self.bolt,
            ParticleShape::Trail => &self.trail,
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for shape in ParticleShape::ALL {
            self.style(shape).validate(shape)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_palette_is_valid() {
        let palette = PaletteConfig::default();
        assert!(palette.validate().is_ok());
        assert_eq!(palette.star.size, ValueRange::new(4.0, 8.0));
        assert_eq!(palette.disc.size, ValueRange::new(2.0, 5.0));
        assert_eq!(palette.trail.max_life, 0.5);
    }

    #[test]
    fn test_range_sampling_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let range = ValueRange::new(4.0, 8.0);
        for _ in 0..1000 {
            assert!(range.contains(range.sample(&mut rng)));
        }
        assert_eq!(ValueRange::fixed(3.0).sample(&mut rng), 3.0);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut palette = PaletteConfig::default();
        palette.disc.size = ValueRange::new(5.0, 2.0);
        assert!(matches!(
            palette.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_empty_colors_rejected() {
        let mut palette = PaletteConfig::default();
        palette.bolt.colors.clear();
        assert!(palette.validate().is_err());
    }
}
