//! 统一错误处理模块
//!
//! 提供引擎范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **配置错误** (`config::ConfigError`): 文件读取、解析和校验
//! - **渲染错误** (`RenderError`): 表面丢失、图像编码
//! - **生命周期错误** (`EngineError`): 挂载状态不符
//!
//! `EngineError` 可以同时承载以上所有错误。

use crate::config::ConfigError;
use thiserror::Error;

/// 引擎核心错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Engine is already mounted on a surface")]
    AlreadyMounted,

    #[error("Engine is not mounted")]
    NotMounted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 渲染系统错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// 宿主已销毁表面
    #[error("Render surface is no longer available")]
    SurfaceLost,

    #[error("Image encode error: {0}")]
    Encode(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
pub type RenderResult<T> = Result<T, RenderError>;
