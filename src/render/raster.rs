//! 软件光栅化表面
//!
//! CPU 端 RGBA8 画布，实现 [`Surface`]，可导出为 PNG。无窗口环境下的默认渲染目标。

use crate::core::error::{RenderError, RenderResult};
use crate::render::surface::Surface;
use glam::{Vec2, Vec4};
use std::path::Path;

/// RGBA8 画布
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    background: [u8; 4],
    pixels: Vec<[u8; 4]>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_background(width, height, [0, 0, 0, 0])
    }

    pub fn with_background(width: u32, height: u32, background: [u8; 4]) -> Self {
        Self {
            width,
            height,
            background,
            pixels: vec![background; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// 转换为 `image` 的 RGBA 图像
    pub fn to_image(&self) -> RenderResult<image::RgbaImage> {
        let raw: &[u8] = bytemuck::cast_slice(&self.pixels);
        image::RgbaImage::from_raw(self.width, self.height, raw.to_vec())
            .ok_or_else(|| RenderError::Encode("pixel buffer size mismatch".to_string()))
    }

    /// 保存为 PNG
    pub fn save_png(&self, path: impl AsRef<Path>) -> RenderResult<()> {
        let path = path.as_ref();
        self.to_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| RenderError::Encode(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(target: "render", "Saved {}x{} frame to {:?}", self.width, self.height, path);
        Ok(())
    }

    /// 像素包围盒，已裁剪到画布内；不可见时返回 `None`
    fn clip_box(&self, min: Vec2, max: Vec2) -> Option<(u32, u32, u32, u32)> {
        if !(min.is_finite() && max.is_finite()) {
            return None;
        }
        let x0 = min.x.floor().max(0.0);
        let y0 = min.y.floor().max(0.0);
        let x1 = max.x.ceil().min(self.width as f32);
        let y1 = max.y.ceil().min(self.height as f32);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    /// src-over 混合
    fn blend(&mut self, x: u32, y: u32, color: Vec4, coverage: f32) {
        let alpha = (color.w * coverage).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        let Some(pixel) = self.pixels.get_mut(index) else {
            return;
        };

        let dst = Vec4::new(
            pixel[0] as f32,
            pixel[1] as f32,
            pixel[2] as f32,
            pixel[3] as f32,
        ) / 255.0;
        let rgb = color.truncate().clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * alpha
            + dst.truncate() * (1.0 - alpha);
        let out_alpha = alpha + dst.w * (1.0 - alpha);

        *pixel = [
            to_byte(rgb.x),
            to_byte(rgb.y),
            to_byte(rgb.z),
            to_byte(out_alpha),
        ];
    }
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// 点到线段的距离
fn distance_to_segment(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// 奇偶规则判断点是否在多边形内
fn contains_even_odd(points: &[Vec2], p: Vec2) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn bounds_of(points: &[Vec2]) -> (Vec2, Vec2) {
    points.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    )
}

impl Surface for Canvas {
    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    fn clear(&mut self) {
        self.pixels.fill(self.background);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Vec4, softness: f32) {
        if !(radius.is_finite() && radius > 0.0) {
            return;
        }
        // 至少一个像素的抗锯齿边缘
        let edge = if softness.is_finite() {
            softness.max(1.0)
        } else {
            1.0
        };
        let reach = Vec2::splat(radius + edge);
        let Some((x0, y0, x1, y1)) = self.clip_box(center - reach, center + reach) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = ((radius - p.distance(center)) / edge + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Vec4) {
        if points.len() < 3 {
            return;
        }
        let (min, max) = bounds_of(points);
        let Some((x0, y0, x1, y1)) = self.clip_box(min, max) else {
            return;
        };

        for y in y0..y1 {
            for x in x0..x1 {
                if contains_even_odd(points, Vec2::new(x as f32 + 0.5, y as f32 + 0.5)) {
                    self.blend(x, y, color, 1.0);
                }
            }
        }
    }

    fn stroke_polyline(&mut self, points: &[Vec2], width: f32, color: Vec4) {
        if points.len() < 2 || !(width.is_finite() && width > 0.0) {
            return;
        }
        let half = width * 0.5;
        let (min, max) = bounds_of(points);
        let reach = Vec2::splat(half + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip_box(min - reach, max + reach) else {
            return;
        };

        // 按最近线段计算覆盖率，拐点处不会重复混合
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let distance = points
                    .windows(2)
                    .map(|seg| distance_to_segment(p, seg[0], seg[1]))
                    .fold(f32::INFINITY, f32::min);
                let coverage = (half - distance + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::renderer::star_points;

    const RED: Vec4 = Vec4::new(1.0, 0.0, 0.0, 1.0);

    #[test]
    fn test_clear_restores_background() {
        let mut canvas = Canvas::with_background(4, 4, [1, 2, 3, 255]);
        canvas.fill_circle(Vec2::new(2.0, 2.0), 2.0, RED, 0.0);
        canvas.clear();
        assert_eq!(canvas.pixel(2, 2), Some([1, 2, 3, 255]));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_fill_circle_covers_center_only() {
        let mut canvas = Canvas::new(32, 32);
        canvas.fill_circle(Vec2::new(16.0, 16.0), 4.0, RED, 0.0);
        assert_eq!(canvas.pixel(16, 16), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(16, 25), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_half_alpha_blends_over_background() {
        let mut canvas = Canvas::with_background(8, 8, [0, 0, 255, 255]);
        canvas.fill_circle(Vec2::new(4.0, 4.0), 3.0, Vec4::new(1.0, 0.0, 0.0, 0.5), 0.0);
        let [r, g, b, a] = canvas.pixel(4, 4).unwrap();
        assert!((127..=128).contains(&r));
        assert_eq!(g, 0);
        assert!((127..=128).contains(&b));
        assert_eq!(a, 255);
    }

    #[test]
    fn test_offscreen_shapes_are_clipped() {
        let mut canvas = Canvas::new(8, 8);
        canvas.fill_circle(Vec2::new(-100.0, -100.0), 5.0, RED, 0.0);
        canvas.fill_circle(Vec2::new(f32::NAN, 4.0), 5.0, RED, 0.0);
        canvas.stroke_polyline(&[Vec2::new(50.0, 50.0), Vec2::new(60.0, 60.0)], 2.0, RED);
        assert!(canvas.pixels.iter().all(|p| *p == [0, 0, 0, 0]));
    }

    #[test]
    fn test_star_polygon_fills_center() {
        let mut canvas = Canvas::new(32, 32);
        let points = star_points(Vec2::new(16.0, 16.0), 12.0, 0.0);
        canvas.fill_polygon(&points, RED);
        assert_eq!(canvas.pixel(16, 16), Some([255, 0, 0, 255]));
        // 两个尖角之间的凹陷处未被填充
        assert_eq!(canvas.pixel(16, 25), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_polyline_covers_segments() {
        let mut canvas = Canvas::new(32, 32);
        canvas.stroke_polyline(
            &[Vec2::new(2.0, 2.0), Vec2::new(2.0, 30.0), Vec2::new(30.0, 30.0)],
            3.0,
            RED,
        );
        assert_eq!(canvas.pixel(2, 16), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(16, 30), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(16, 16), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_save_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mut canvas = Canvas::with_background(16, 8, [0, 0, 0, 255]);
        canvas.fill_circle(Vec2::new(8.0, 4.0), 2.0, RED, 0.0);
        canvas.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (16, 8));
        assert_eq!(loaded.get_pixel(8, 4).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_save_png_bad_path_is_encode_error() {
        let canvas = Canvas::new(2, 2);
        let result = canvas.save_png("/nonexistent-dir/frame.png");
        assert!(matches!(result, Err(RenderError::Encode(_))));
    }
}
