//! 帧调度系统
//!
//! 每次显示刷新驱动一次模拟与渲染。帧由宿主的帧源触发，
//! 调度器只负责请求、取消和过滤过期的回调，不持有粒子数据。
//!
//! ## 状态机
//!
//! ```text
//! Stopped ──start()──▶ Running { pending } ──stop()──▶ Stopped
//!                         │        ▲
//!                    on_frame()────┘ (请求下一帧)
//! ```

use super::engine::{ParticleEngine, TickReport};
use super::error::EngineResult;
use crate::render::surface::Surface;

/// 帧请求句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// 宿主帧源
///
/// 对应浏览器的 `requestAnimationFrame` / `cancelAnimationFrame`
/// 或原生窗口的重绘请求。
pub trait FrameSource {
    /// 请求下一帧
    fn request_frame(&mut self) -> FrameHandle;

    /// 取消尚未触发的帧请求
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// 手动触发的帧源
///
/// 无窗口运行和测试时使用：调用 [`fire`](Self::fire) 取出待触发的帧。
#[derive(Debug, Default)]
pub struct ManualFrameSource {
    next_id: u64,
    pending: Option<FrameHandle>,
    requested: usize,
    cancelled: usize,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出待触发的帧
    pub fn fire(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running { pending: FrameHandle },
}

/// 帧调度器
#[derive(Debug)]
pub struct FrameScheduler<F: FrameSource> {
    source: F,
    state: SchedulerState,
    frames: u64,
}

impl<F: FrameSource> FrameScheduler<F> {
    pub fn new(source: F) -> Self {
        Self {
            source,
            state: SchedulerState::Stopped,
            frames: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SchedulerState::Running { .. })
    }

    /// 已执行的帧数
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut F {
        &mut self.source
    }

    /// 开始调度；已在运行时无操作
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let pending = self.source.request_frame();
        self.state = SchedulerState::Running { pending };
        tracing::info!(target: "scheduler", "Frame scheduler started");
    }

    /// 停止调度并取消待触发的帧；可重复调用
    pub fn stop(&mut self) {
        if let SchedulerState::Running { pending } = self.state {
            self.source.cancel_frame(pending);
            self.state = SchedulerState::Stopped;
            tracing::info!(target: "scheduler", "Frame scheduler stopped after {} frames", self.frames);
        }
    }

    /// 帧回调
    ///
    /// 只处理当前待触发的句柄，停止后到达的过期回调返回 `Ok(None)`。
    /// 引擎出错时调度器停止并返回错误。
    pub fn on_frame<S: Surface>(
        &mut self,
        handle: FrameHandle,
        engine: &mut ParticleEngine<S>,
    ) -> EngineResult<Option<TickReport>> {
        match self.state {
            SchedulerState::Running { pending } if pending == handle => {}
            _ => {
                tracing::debug!(target: "scheduler", "Ignoring stale frame {:?}", handle);
                return Ok(None);
            }
        }

        match engine.tick() {
            Ok(report) => {
                self.frames += 1;
                let pending = self.source.request_frame();
                self.state = SchedulerState::Running { pending };
                Ok(Some(report))
            }
            Err(e) => {
                self.state = SchedulerState::Stopped;
                tracing::warn!(target: "scheduler", "Frame {} failed, stopping: {}", self.frames + 1, e);
                Err(e)
            }
        }
    }
}

/// 一次挂载的作用域
///
/// 持有引擎和调度器。无论显式 [`teardown`](Self::teardown) 还是被丢弃，
/// 都会先停止调度再释放表面。
pub struct Scene<S: Surface, F: FrameSource> {
    engine: ParticleEngine<S>,
    scheduler: FrameScheduler<F>,
}

impl<S: Surface, F: FrameSource> Scene<S, F> {
    /// 挂载表面并开始调度
    pub fn mount(mut engine: ParticleEngine<S>, surface: S, source: F) -> EngineResult<Self> {
        engine.mount(surface)?;
        let mut scheduler = FrameScheduler::new(source);
        scheduler.start();
        Ok(Self { engine, scheduler })
    }

    pub fn engine(&self) -> &ParticleEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut ParticleEngine<S> {
        &mut self.engine
    }

    pub fn scheduler(&self) -> &FrameScheduler<F> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<F> {
        &mut self.scheduler
    }

    /// 转发宿主的帧回调
    pub fn on_frame(&mut self, handle: FrameHandle) -> EngineResult<Option<TickReport>> {
        self.scheduler.on_frame(handle, &mut self.engine)
    }

    /// 停止调度并归还表面
    pub fn teardown(mut self) -> Option<S> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<S> {
        self.scheduler.stop();
        self.engine.unmount()
    }
}

impl<S: Surface> Scene<S, ManualFrameSource> {
    /// 手动驱动最多 `frames` 帧，返回实际执行的帧数
    pub fn pump(&mut self, frames: usize) -> EngineResult<usize> {
        let mut executed = 0;
        for _ in 0..frames {
            let Some(handle) = self.scheduler.source_mut().fire() else {
                break;
            };
            if self.on_frame(handle)?.is_some() {
                executed += 1;
            }
        }
        Ok(executed)
    }
}

impl<S: Surface, F: FrameSource> Drop for Scene<S, F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
