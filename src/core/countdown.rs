//! 帧计数器
//!
//! 以 tick 为单位的倒计时，由调度循环推进，不依赖系统计时器。

use std::collections::BTreeMap;

/// 倒计时
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    duration: u32,
    remaining: u32,
    repeating: bool,
    finished: bool,
}

impl Countdown {
    /// 单次倒计时，`ticks` 次推进后触发一次
    pub fn once(ticks: u32) -> Self {
        Self {
            duration: ticks,
            remaining: ticks,
            repeating: false,
            finished: false,
        }
    }

    /// 循环倒计时，每 `ticks` 次推进触发一次（至少为 1）
    pub fn repeating(ticks: u32) -> Self {
        let ticks = ticks.max(1);
        Self {
            duration: ticks,
            remaining: ticks,
            repeating: true,
            finished: false,
        }
    }

    /// 推进一个 tick，返回本次是否触发
    pub fn tick(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining > 0 {
            return false;
        }
        if self.repeating {
            self.remaining = self.duration;
        } else {
            self.finished = true;
        }
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.finished = false;
    }
}

/// 具名的限时效果（例如道具持续时间）
#[derive(Debug, Clone, Default)]
pub struct EffectTimers {
    active: BTreeMap<String, Countdown>,
}

impl EffectTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动效果；已存在时重新计时
    pub fn start(&mut self, name: impl Into<String>, ticks: u32) {
        self.active.insert(name.into(), Countdown::once(ticks));
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    pub fn remaining(&self, name: &str) -> Option<u32> {
        self.active.get(name).map(Countdown::remaining)
    }

    pub fn cancel(&mut self, name: &str) -> bool {
        self.active.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// 推进所有效果，返回本次到期的名称（按名称排序）
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.active.retain(|name, countdown| {
            if countdown.tick() {
                expired.push(name.clone());
                false
            } else {
                true
            }
        });
        expired
    }
}
