//! 核心模块
//!
//! 包含引擎的核心功能：
//! - `engine` - 粒子引擎和每帧流程
//! - `scheduler` - 帧调度和挂载作用域
//! - `countdown` - 以 tick 计数的倒计时和限时效果
//! - `error` - 错误类型定义

pub mod countdown;
pub mod engine;
pub mod error;
pub mod scheduler;
#[macro_use]
pub mod macros;

#[cfg(test)]
mod tests;

// 重新导出错误类型
pub use error::{EngineError, EngineResult, RenderError, RenderResult};

// 重新导出主要类型
pub use countdown::{Countdown, EffectTimers};
pub use engine::{initialize_logging, EngineStats, ParticleEngine, TickReport};
pub use scheduler::{FrameHandle, FrameScheduler, FrameSource, ManualFrameSource, Scene, SchedulerState};
