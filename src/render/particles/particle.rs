//! 粒子数据模型
//!
//! 粒子本身是纯数据：位置、速度、生命周期、外观。
//! 行为分别由发射器、物理积分器、深度投影器和渲染器实现。

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 未指定深度时的默认深度（中景）
pub const DEFAULT_DEPTH: f32 = 50.0;

/// 最小可见尺寸，退化尺寸会被钳制到该值
pub const MIN_VISUAL_SIZE: f32 = 0.5;

/// 生命值低于该阈值视为已死亡
///
/// 吸收浮点累积误差：`max_life = 1`、`decay_rate = 0.01` 时累减 100 次后
/// 余下约 `-7e-8` 到 `1e-6` 的残差，阈值保证恰好在第 100 个 tick 移除。
/// 代价是每步衰减量接近 `1e-4` 时，粒子可能比 `ceil(max_life / decay_rate)`
/// 早一个 tick 被移除。
pub const LIFE_EPSILON: f32 = 1e-4;

/// 每 tick 允许的最小衰减量 `decay_rate / max_life`
///
/// 更小的步长在 `life = 1` 附近会被 f32 舍入吞掉。
pub const MIN_LIFE_STEP: f32 = f32::EPSILON;

/// 粒子唯一标识
///
/// 由注册表在插入时分配，单调递增，永不复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 粒子形状标签
///
/// 封闭集合，渲染器和发射器通过 `match` 分派。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleShape {
    /// 实心圆（雪花、光点）
    Disc,
    /// 五角星
    Star,
    /// 锯齿闪电
    Bolt,
    /// 拖尾（短寿命的圆点）
    Trail,
}

impl ParticleShape {
    /// 全部形状
    pub const ALL: [ParticleShape; 4] = [Self::Disc, Self::Star, Self::Bolt, Self::Trail];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Disc => "disc",
            Self::Star => "star",
            Self::Bolt => "bolt",
            Self::Trail => "trail",
        }
    }
}

impl fmt::Display for ParticleShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 未知形状名称
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown particle shape `{0}`")]
pub struct UnknownShape(pub String);

impl FromStr for ParticleShape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disc" | "circle" | "snow" | "confetti" => Ok(Self::Disc),
            "star" | "coin" => Ok(Self::Star),
            "bolt" | "lightning" => Ok(Self::Bolt),
            "trail" => Ok(Self::Trail),
            other => Err(UnknownShape(other.to_string())),
        }
    }
}

/// 粒子生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    /// 会衰减并在越界时被剔除（爆发、天气、拖尾）
    Expiring,
    /// 不衰减，越界时环绕（深度星空）
    Persistent,
}

/// 发射分组，用于分组容量限制
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitterGroup {
    Burst,
    Ambient,
    Trail,
    Field,
}

impl EmitterGroup {
    pub const COUNT: usize = 4;

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Burst => 0,
            Self::Ambient => 1,
            Self::Trail => 2,
            Self::Field => 3,
        }
    }
}

/// 颜色解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color `{0}`, expected #rrggbb")]
pub struct ColorParseError(pub String);

/// 与渲染后端无关的 RGB 颜色
///
/// 配置文件中以 `"#rrggbb"` 形式书写。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 解析 `#rrggbb` 或 `rrggbb`
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(hex.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| ColorParseError(hex.to_string()))
        };
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// 转换为归一化 RGBA
    pub fn to_vec4(self, alpha: f32) -> Vec4 {
        Vec4::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            alpha.clamp(0.0, 1.0),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// 粒子
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// 标识（插入注册表时分配）
    pub id: ParticleId,
    /// 位置，`z` 为深度
    pub position: Vec3,
    /// 速度（每 tick）
    pub velocity: Vec3,
    /// 加速度（每 tick²），通常为重力
    pub acceleration: Vec3,
    /// 归一化剩余寿命 `[0, 1]`
    pub life: f32,
    /// 寿命尺度，衰减速率为 `decay_rate / max_life`
    pub max_life: f32,
    /// 基础半径/长度
    pub size: f32,
    pub color: Color,
    pub shape: ParticleShape,
    pub rotation: f32,
    pub rotation_speed: f32,
    pub kind: ParticleKind,
    pub group: EmitterGroup,
}

impl Particle {
    /// 在给定二维位置创建默认粒子（中景深度、满寿命）
    pub fn new(shape: ParticleShape, x: f32, y: f32) -> Self {
        Self {
            id: ParticleId::default(),
            position: Vec3::new(x, y, DEFAULT_DEPTH),
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            life: 1.0,
            max_life: 1.0,
            size: 1.0,
            color: Color::WHITE,
            shape,
            rotation: 0.0,
            rotation_speed: 0.0,
            kind: ParticleKind::Expiring,
            group: EmitterGroup::Burst,
        }
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.position.z = depth;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    /// 设置寿命尺度，非正值回退为 1
    pub fn with_max_life(mut self, max_life: f32) -> Self {
        self.max_life = if max_life.is_finite() && max_life > 0.0 {
            max_life
        } else {
            1.0
        };
        self
    }

    pub fn with_size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_rotation(mut self, rotation: f32, rotation_speed: f32) -> Self {
        self.rotation = rotation;
        self.rotation_speed = rotation_speed;
        self
    }

    pub fn with_kind(mut self, kind: ParticleKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_group(mut self, group: EmitterGroup) -> Self {
        self.group = group;
        self
    }

    pub fn is_alive(&self) -> bool {
        self.life > LIFE_EPSILON
    }

    pub fn has_finite_position(&self) -> bool {
        self.position.is_finite()
    }

    /// 渲染使用的尺寸，退化值钳制到 [`MIN_VISUAL_SIZE`]
    pub fn visual_size(&self) -> f32 {
        if self.size.is_finite() && self.size > MIN_VISUAL_SIZE {
            self.size
        } else {
            MIN_VISUAL_SIZE
        }
    }
}
