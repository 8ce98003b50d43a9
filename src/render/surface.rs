//! 渲染表面抽象
//!
//! 宿主提供的二维绘制目标。引擎只调用几种基本图元，不依赖具体图形 API。

use glam::{Vec2, Vec4};

/// 二维绘制目标
pub trait Surface {
    /// 表面是否仍然可用
    ///
    /// 导航过程中宿主可能销毁表面，此时渲染步骤会被跳过。
    fn is_alive(&self) -> bool {
        true
    }

    /// 表面尺寸（像素）
    fn size(&self) -> Vec2;

    /// 清空整个表面
    fn clear(&mut self);

    /// 填充圆，`softness` 为边缘柔化宽度
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4, softness: f32);

    /// 填充多边形
    fn fill_polygon(&mut self, points: &[Vec2], color: Vec4);

    /// 描边折线
    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: Vec4);
}

/// 记录下来的绘制命令
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    Circle {
        center: Vec2,
        radius: f32,
        color: Vec4,
        softness: f32,
    },
    Polygon {
        points: Vec<Vec2>,
        color: Vec4,
    },
    Polyline {
        points: Vec<Vec2>,
        width: f32,
        color: Vec4,
    },
}

/// 显示列表表面
///
/// 把每帧的绘制命令记录下来，可交给宿主回放，也用于测试。
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Vec2,
    alive: bool,
    commands: Vec<DrawCommand>,
    /// 累计调用次数（包括被清空的帧）
    calls: usize,
    frames: usize,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
            alive: true,
            commands: Vec::new(),
            calls: 0,
            frames: 0,
        }
    }

    /// 当前帧的命令
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// 累计的绘制调用次数
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// 已开始的帧数（`clear` 次数）
    pub fn frame_count(&self) -> usize {
        self.frames
    }

    /// 模拟宿主销毁表面
    pub fn destroy(&mut self) {
        self.alive = false;
    }

    pub fn restore(&mut self) {
        self.alive = true;
    }

    fn record(&mut self, command: DrawCommand) {
        self.calls += 1;
        self.commands.push(command);
    }
}

impl Surface for RecordingSurface {
    fn is_alive(&self) -> bool {
        self.alive
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.frames += 1;
        self.record(DrawCommand::Clear);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4, softness: f32) {
        self.record(DrawCommand::Circle {
            center,
            radius,
            color,
            softness,
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Vec4) {
        self.record(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: Vec4) {
        self.record(DrawCommand::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_starts_new_frame() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        surface.fill_circle(Vec2::ZERO, 1.0, Vec4::ONE, 0.0);
        surface.clear();
        assert_eq!(surface.commands(), &[DrawCommand::Clear]);
        assert_eq!(surface.call_count(), 2);
        assert_eq!(surface.frame_count(), 1);
    }

    #[test]
    fn test_destroy_and_restore() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        assert!(surface.is_alive());
        surface.destroy();
        assert!(!surface.is_alive());
        surface.restore();
        assert!(surface.is_alive());
    }
}
