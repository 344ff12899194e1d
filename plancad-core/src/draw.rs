//! 绘制接口。
//!
//! 核心层不负责光栅化，只把实体翻译成一组基本绘制调用交给宿主实现的 [`Canvas`]。

use glam::{DAffine2, DVec2};

use crate::geometry::{Point2, Vector2};

/// 绘制样式，由宿主映射为具体颜色/线型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Normal,
    Selected,
    /// 引用失效时的错误标记。
    Error,
}

/// 块参照等对象使用的放置变换：先缩放、再旋转、最后平移。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub translation: Vector2,
    pub rotation: f64,
    pub scale: Vector2,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: Vector2::zero(),
            rotation: 0.0,
            scale: Vector2::new(1.0, 1.0),
        }
    }

    pub fn affine(&self) -> DAffine2 {
        DAffine2::from_scale_angle_translation(
            self.scale.as_vec2(),
            self.rotation,
            self.translation.as_vec2(),
        )
    }

    pub fn apply(&self, point: Point2) -> Point2 {
        Point2::from_vec(self.affine().transform_point2(point.as_vec2()))
    }

    /// 逆变换；缩放分量为零时返回 `None`。
    pub fn inverse_apply(&self, point: Point2) -> Option<Point2> {
        if self.scale.x().abs() <= f64::EPSILON || self.scale.y().abs() <= f64::EPSILON {
            return None;
        }
        Some(Point2::from_vec(
            self.affine().inverse().transform_point2(point.as_vec2()),
        ))
    }
}

/// 宿主提供的绘制目标。坐标均为当前变换栈下的局部坐标。
pub trait Canvas {
    fn push_transform(&mut self, placement: Placement);
    fn pop_transform(&mut self);
    fn set_style(&mut self, style: Style);
    fn polyline(&mut self, points: &[Point2], closed: bool);
    fn circle(&mut self, center: Point2, radius: f64);
    fn arc(&mut self, center: Point2, radius: f64, start_angle: f64, end_angle: f64);
    fn text(&mut self, insert: Point2, content: &str, height: f64, rotation: f64);

    fn line(&mut self, start: Point2, end: Point2) {
        self.polyline(&[start, end], false);
    }
}

/// 错误标记的固定尺寸（世界单位）。
pub const ERROR_MARKER_SIZE: f64 = 10.0;

/// 在 `at` 处绘制一个 "X" 错误标记。
pub fn draw_error_marker(canvas: &mut dyn Canvas, at: Point2) {
    let half = ERROR_MARKER_SIZE * 0.5;
    canvas.set_style(Style::Error);
    canvas.line(
        at.translate(Vector2::new(-half, -half)),
        at.translate(Vector2::new(half, half)),
    );
    canvas.line(
        at.translate(Vector2::new(-half, half)),
        at.translate(Vector2::new(half, -half)),
    );
}

/// 记录下来的绘制调用，坐标已换算到世界坐标。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Polyline {
        points: Vec<Point2>,
        closed: bool,
        style: Style,
    },
    Circle {
        center: Point2,
        radius: f64,
        style: Style,
    },
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        style: Style,
    },
    Text {
        insert: Point2,
        content: String,
        height: f64,
        style: Style,
    },
}

impl DrawCall {
    pub fn style(&self) -> Style {
        match self {
            DrawCall::Polyline { style, .. }
            | DrawCall::Circle { style, .. }
            | DrawCall::Arc { style, .. }
            | DrawCall::Text { style, .. } => *style,
        }
    }
}

/// 把绘制调用记录为列表的画布，用于无界面运行和测试。
#[derive(Debug)]
pub struct RecordingCanvas {
    stack: Vec<DAffine2>,
    style: Style,
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self {
            stack: vec![DAffine2::IDENTITY],
            style: Style::Normal,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn current(&self) -> DAffine2 {
        self.stack.last().copied().unwrap_or(DAffine2::IDENTITY)
    }

    fn world(&self, point: Point2) -> Point2 {
        Point2::from_vec(self.current().transform_point2(point.as_vec2()))
    }

    fn world_length(&self, length: f64) -> f64 {
        let scaled = self.current().transform_vector2(DVec2::new(length, 0.0));
        scaled.length()
    }
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for RecordingCanvas {
    fn push_transform(&mut self, placement: Placement) {
        let next = self.current() * placement.affine();
        self.stack.push(next);
    }

    fn pop_transform(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    fn set_style(&mut self, style: Style) {
        self.style = style;
    }

    fn polyline(&mut self, points: &[Point2], closed: bool) {
        let points = points.iter().map(|point| self.world(*point)).collect();
        self.calls.push(DrawCall::Polyline {
            points,
            closed,
            style: self.style,
        });
    }

    fn circle(&mut self, center: Point2, radius: f64) {
        self.calls.push(DrawCall::Circle {
            center: self.world(center),
            radius: self.world_length(radius),
            style: self.style,
        });
    }

    fn arc(&mut self, center: Point2, radius: f64, start_angle: f64, end_angle: f64) {
        self.calls.push(DrawCall::Arc {
            center: self.world(center),
            radius: self.world_length(radius),
            start_angle,
            end_angle,
            style: self.style,
        });
    }

    fn text(&mut self, insert: Point2, content: &str, height: f64, _rotation: f64) {
        self.calls.push(DrawCall::Text {
            insert: self.world(insert),
            content: content.to_string(),
            height: self.world_length(height),
            style: self.style,
        });
    }
}
