use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// 几何比较使用的默认容差。
pub const EPSILON: f64 = 1e-9;

/// 二维点，内部以 `glam::DVec2` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2(pub DVec2);

impl Point2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self(DVec2::new(x, y))
    }

    #[inline]
    pub fn origin() -> Self {
        Self(DVec2::ZERO)
    }

    #[inline]
    pub fn from_vec(vec: DVec2) -> Self {
        Self(vec)
    }

    #[inline]
    pub fn x(self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(self) -> f64 {
        self.0.y
    }

    #[inline]
    pub fn translate(self, offset: Vector2) -> Self {
        Self(self.0 + offset.0)
    }

    #[inline]
    pub fn vector_to(self, other: Point2) -> Vector2 {
        Vector2(other.0 - self.0)
    }

    #[inline]
    pub fn distance(self, other: Point2) -> f64 {
        self.0.distance(other.0)
    }

    #[inline]
    pub fn lerp(self, other: Point2, t: f64) -> Self {
        Self(self.0.lerp(other.0, t))
    }

    #[inline]
    pub fn as_vec2(self) -> DVec2 {
        self.0
    }

    /// 绕 `center` 逆时针旋转 `angle` 弧度。
    pub fn rotate_about(self, center: Point2, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        let d = self.0 - center.0;
        Self(center.0 + DVec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos))
    }

    /// 以 `center` 为基点做非均匀缩放，负系数表示镜像。
    pub fn scale_about(self, center: Point2, sx: f64, sy: f64) -> Self {
        let d = self.0 - center.0;
        Self(center.0 + DVec2::new(d.x * sx, d.y * sy))
    }

    #[inline]
    pub fn approx_eq(self, other: Point2, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }
}

impl From<DVec2> for Point2 {
    fn from(value: DVec2) -> Self {
        Self::from_vec(value)
    }
}

/// 二维向量。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2(pub DVec2);

impl Vector2 {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self(DVec2::new(x, y))
    }

    #[inline]
    pub fn zero() -> Self {
        Self(DVec2::ZERO)
    }

    #[inline]
    pub fn from_points(start: Point2, end: Point2) -> Self {
        Self(end.0 - start.0)
    }

    /// 单位方向向量。
    #[inline]
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self(DVec2::new(cos, sin))
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.0.length()
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.0.length_squared()
    }

    #[inline]
    pub fn as_vec2(self) -> DVec2 {
        self.0
    }

    #[inline]
    pub fn x(self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(self) -> f64 {
        self.0.y
    }

    /// 与 x 轴正方向的夹角（弧度）。
    #[inline]
    pub fn angle(self) -> f64 {
        self.0.y.atan2(self.0.x)
    }

    #[inline]
    pub fn normalize(self) -> Option<Self> {
        let len = self.0.length();
        if len <= EPSILON {
            None
        } else {
            Some(Self(self.0 / len))
        }
    }

    /// 逆时针旋转 90° 的垂直向量。
    #[inline]
    pub fn perp(self) -> Self {
        Self(DVec2::new(-self.0.y, self.0.x))
    }

    #[inline]
    pub fn scaled(self, factor: f64) -> Self {
        Self(self.0 * factor)
    }

    #[inline]
    pub fn dot(self, other: Vector2) -> f64 {
        self.0.dot(other.0)
    }
}

impl From<DVec2> for Vector2 {
    fn from(value: DVec2) -> Self {
        Self(value)
    }
}

/// 三维点，派生实体的网格顶点使用该类型。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3(pub DVec3);

impl Point3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(DVec3::new(x, y, z))
    }

    #[inline]
    pub fn from_plan(point: Point2, z: f64) -> Self {
        Self(DVec3::new(point.x(), point.y(), z))
    }

    #[inline]
    pub fn x(self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(self) -> f64 {
        self.0.y
    }

    #[inline]
    pub fn z(self) -> f64 {
        self.0.z
    }

    #[inline]
    pub fn as_vec3(self) -> DVec3 {
        self.0
    }

    #[inline]
    pub fn plan(self) -> Point2 {
        Point2::new(self.0.x, self.0.y)
    }
}

impl From<DVec3> for Point3 {
    fn from(value: DVec3) -> Self {
        Self(value)
    }
}

/// 三维向量。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3(pub DVec3);

impl Vector3 {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(DVec3::new(x, y, z))
    }

    #[inline]
    pub fn as_vec3(self) -> DVec3 {
        self.0
    }

    #[inline]
    pub fn length_squared(self) -> f64 {
        self.0.length_squared()
    }

    #[inline]
    pub fn normalize(self) -> Option<Self> {
        let len = self.0.length();
        if len <= EPSILON {
            None
        } else {
            Some(Self(self.0 / len))
        }
    }

    #[inline]
    pub fn dot(self, other: Vector3) -> f64 {
        self.0.dot(other.0)
    }

    #[inline]
    pub fn cross(self, other: Vector3) -> Vector3 {
        Self(self.0.cross(other.0))
    }
}

impl From<DVec3> for Vector3 {
    fn from(value: DVec3) -> Self {
        Self(value)
    }
}

/// 轴对齐边界框，用于估算文档/实体范围。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2D {
    min: Point2,
    max: Point2,
}

impl Bounds2D {
    #[inline]
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn empty() -> Self {
        Self {
            min: Point2::new(f64::INFINITY, f64::INFINITY),
            max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// 退化为单点的包围盒。
    #[inline]
    pub fn point(point: Point2) -> Self {
        Self::new(point, point)
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point2>,
    {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x() > self.max.x() || self.min.y() > self.max.y()
    }

    #[inline]
    pub fn min(&self) -> Point2 {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Point2 {
        self.max
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.max.x() - self.min.x()).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        (self.max.y() - self.min.y()).max(0.0)
    }

    pub fn include_point(&mut self, point: Point2) {
        if self.is_empty() {
            self.min = point;
            self.max = point;
            return;
        }
        let min_vec = self.min.as_vec2().min(point.as_vec2());
        let max_vec = self.max.as_vec2().max(point.as_vec2());
        self.min = Point2::from_vec(min_vec);
        self.max = Point2::from_vec(max_vec);
    }

    pub fn include_bounds(&mut self, other: &Bounds2D) {
        if other.is_empty() {
            return;
        }
        self.include_point(other.min);
        self.include_point(other.max);
    }

    #[inline]
    pub fn center(&self) -> Point2 {
        debug_assert!(!self.is_empty());
        let center = (self.min.as_vec2() + self.max.as_vec2()) * 0.5;
        Point2::from_vec(center)
    }

    /// 四个角点，逆时针顺序。
    pub fn corners(&self) -> [Point2; 4] {
        [
            self.min,
            Point2::new(self.max.x(), self.min.y()),
            self.max,
            Point2::new(self.min.x(), self.max.y()),
        ]
    }

    pub fn contains_point(&self, point: Point2, tolerance: f64) -> bool {
        !self.is_empty()
            && point.x() >= self.min.x() - tolerance
            && point.x() <= self.max.x() + tolerance
            && point.y() >= self.min.y() - tolerance
            && point.y() <= self.max.y() + tolerance
    }

    pub fn translated(&self, offset: Vector2) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(self.min.translate(offset), self.max.translate(offset))
    }
}

/// 三维轴对齐包围盒。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    min: DVec3,
    max: DVec3,
}

impl Bounds3 {
    pub fn empty() -> Self {
        Self {
            min: DVec3::splat(f64::INFINITY),
            max: DVec3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = Point3>,
    {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: Point3) {
        self.min = self.min.min(point.0);
        self.max = self.max.max(point.0);
    }

    #[inline]
    pub fn min(&self) -> Point3 {
        Point3(self.min)
    }

    #[inline]
    pub fn max(&self) -> Point3 {
        Point3(self.max)
    }

    #[inline]
    pub fn size(&self) -> Vector3 {
        if self.is_empty() {
            Vector3::new(0.0, 0.0, 0.0)
        } else {
            Vector3(self.max - self.min)
        }
    }

    pub fn contains_point(&self, point: Point3) -> bool {
        let p = point.0;
        !self.is_empty()
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn intersects(&self, other: &Bounds3) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

/// 编辑操作施加在实体上的二维变换。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform2 {
    Translate(Vector2),
    Rotate { center: Point2, angle: f64 },
    Scale { center: Point2, sx: f64, sy: f64 },
}

impl Transform2 {
    pub fn apply(&self, point: Point2) -> Point2 {
        match *self {
            Transform2::Translate(offset) => point.translate(offset),
            Transform2::Rotate { center, angle } => point.rotate_about(center, angle),
            Transform2::Scale { center, sx, sy } => point.scale_about(center, sx, sy),
        }
    }

    /// 变换方向角：平移不变，旋转叠加，缩放按线性部分重新求角。
    pub fn apply_angle(&self, angle: f64) -> f64 {
        match *self {
            Transform2::Translate(_) => angle,
            Transform2::Rotate { angle: delta, .. } => angle + delta,
            Transform2::Scale { sx, sy, .. } => {
                let (sin, cos) = angle.sin_cos();
                (sin * sy).atan2(cos * sx)
            }
        }
    }

    /// 长度量（半径、字高等）的等效缩放系数。
    pub fn length_factor(&self) -> f64 {
        match *self {
            Transform2::Scale { sx, sy, .. } => (sx.abs() + sy.abs()) * 0.5,
            _ => 1.0,
        }
    }

    /// 是否翻转方向（镜像）。
    pub fn mirrors(&self) -> bool {
        matches!(*self, Transform2::Scale { sx, sy, .. } if sx * sy < 0.0)
    }
}

/// 点到线段的最短距离。
pub fn distance_to_segment(point: Point2, start: Point2, end: Point2) -> f64 {
    let v = end.0 - start.0;
    let w = point.0 - start.0;
    let c1 = w.dot(v);
    if c1 <= 0.0 {
        return point.distance(start);
    }
    let c2 = v.dot(v);
    if c2 <= c1 {
        return point.distance(end);
    }
    let t = c1 / c2;
    point.0.distance(start.0 + v * t)
}

/// 点到折线的最短距离；`closed` 时包含首尾闭合段。
pub fn distance_to_polyline(point: Point2, points: &[Point2], closed: bool) -> f64 {
    match points.len() {
        0 => f64::INFINITY,
        1 => point.distance(points[0]),
        _ => {
            let mut best = f64::INFINITY;
            for pair in points.windows(2) {
                best = best.min(distance_to_segment(point, pair[0], pair[1]));
            }
            if closed {
                best = best.min(distance_to_segment(point, points[points.len() - 1], points[0]));
            }
            best
        }
    }
}

/// 鞋带公式求有向面积，逆时针为正。
pub fn signed_area(points: &[Point2]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (index, current) in points.iter().enumerate() {
        let next = points[(index + 1) % points.len()];
        sum += current.x() * next.y() - next.x() * current.y();
    }
    sum * 0.5
}

/// 多边形顶点的算术平均中心。
pub fn vertex_centroid(points: &[Point2]) -> Option<Point2> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(DVec2::ZERO, |acc, point| acc + point.as_vec2());
    Some(Point2::from_vec(sum / points.len() as f64))
}

/// 奇偶规则判断点是否位于多边形内部。
pub fn point_in_polygon(point: Point2, polygon: &[Point2]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y() > point.y()) != (pj.y() > point.y()) {
            let x = (pj.x() - pi.x()) * (point.y() - pi.y()) / (pj.y() - pi.y()) + pi.x();
            if point.x() < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// 折线总长度。
pub fn polyline_length(points: &[Point2], closed: bool) -> f64 {
    let mut length: f64 = points.windows(2).map(|pair| pair[0].distance(pair[1])).sum();
    if closed && points.len() > 2 {
        length += points[points.len() - 1].distance(points[0]);
    }
    length
}

/// 按弧长将折线重采样为 `count` 个点。
///
/// 闭合折线会沿闭合段回到起点，但结果不重复首点；开放折线保留两个端点。
pub fn resample_by_arc_length(points: &[Point2], count: usize, closed: bool) -> Vec<Point2> {
    if points.is_empty() || count == 0 {
        return Vec::new();
    }
    if points.len() == 1 || count == 1 {
        return vec![points[0]; count];
    }

    let mut path: Vec<Point2> = points.to_vec();
    if closed {
        path.push(points[0]);
    }
    let total = polyline_length(&path, false);
    if total <= EPSILON {
        return vec![points[0]; count];
    }

    let divisions = if closed { count } else { count - 1 };
    let step = total / divisions as f64;
    let mut result = Vec::with_capacity(count);
    let mut segment = 0usize;
    let mut walked = 0.0;
    for index in 0..count {
        let target = step * index as f64;
        while segment + 1 < path.len() - 1
            && walked + path[segment].distance(path[segment + 1]) < target
        {
            walked += path[segment].distance(path[segment + 1]);
            segment += 1;
        }
        let start = path[segment];
        let end = path[segment + 1];
        let length = start.distance(end);
        let t = if length <= EPSILON {
            0.0
        } else {
            ((target - walked) / length).clamp(0.0, 1.0)
        };
        result.push(start.lerp(end, t));
    }
    result
}

/// 使用 Catmull-Rom 样条在控制点之间插值，每段细分 `subdivisions` 次。
pub fn catmull_rom(points: &[Point2], subdivisions: usize) -> Vec<Point2> {
    if points.len() < 3 || subdivisions < 2 {
        return points.to_vec();
    }
    let at = |index: isize| -> DVec2 {
        let clamped = index.clamp(0, points.len() as isize - 1) as usize;
        points[clamped].as_vec2()
    };
    let mut result = Vec::with_capacity((points.len() - 1) * subdivisions + 1);
    for segment in 0..points.len() - 1 {
        let i = segment as isize;
        let (p0, p1, p2, p3) = (at(i - 1), at(i), at(i + 1), at(i + 2));
        for step in 0..subdivisions {
            let t = step as f64 / subdivisions as f64;
            let t2 = t * t;
            let t3 = t2 * t;
            let value = 0.5
                * ((2.0 * p1)
                    + (-p0 + p2) * t
                    + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
                    + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3);
            result.push(Point2::from_vec(value));
        }
    }
    if let Some(last) = points.last() {
        result.push(*last);
    }
    result
}

/// 将圆弧离散为折线点，角度按数学正方向，`end` 小于 `start` 时跨过 2π。
pub fn arc_points(center: Point2, radius: f64, start: f64, end: f64, segments: usize) -> Vec<Point2> {
    let sweep = normalized_sweep(start, end);
    let segments = segments.max(1);
    (0..=segments)
        .map(|index| {
            let angle = start + sweep * index as f64 / segments as f64;
            center.translate(Vector2::from_angle(angle).scaled(radius))
        })
        .collect()
}

/// 圆离散为 `segments` 边形，不重复首点。
pub fn circle_points(center: Point2, radius: f64, segments: usize) -> Vec<Point2> {
    let segments = segments.max(3);
    (0..segments)
        .map(|index| {
            let angle = std::f64::consts::TAU * index as f64 / segments as f64;
            center.translate(Vector2::from_angle(angle).scaled(radius))
        })
        .collect()
}

/// `start` 到 `end` 的逆时针扫角，范围 (0, 2π]。
pub fn normalized_sweep(start: f64, end: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let mut sweep = (end - start) % tau;
    if sweep <= EPSILON {
        sweep += tau;
    }
    sweep
}

/// 判断角度是否落在逆时针区间 `[start, start + sweep]` 内。
pub fn angle_in_sweep(angle: f64, start: f64, end: f64) -> bool {
    let tau = std::f64::consts::TAU;
    let sweep = normalized_sweep(start, end);
    let offset = (angle - start).rem_euclid(tau);
    offset <= sweep + EPSILON
}

/// 斜接方式偏移折线/多边形。正距离向左（逆时针多边形的外侧为右侧）。
///
/// 斜接长度被限制在 `4 * |distance|`，避免锐角处出现尖刺。
pub fn offset_polyline(points: &[Point2], distance: f64, closed: bool) -> Vec<Point2> {
    let count = points.len();
    if count < 2 || distance.abs() <= EPSILON {
        return points.to_vec();
    }
    let edge_normal = |from: Point2, to: Point2| -> Option<DVec2> {
        Vector2::from_points(from, to)
            .normalize()
            .map(|dir| dir.perp().as_vec2())
    };
    let limit = 4.0 * distance.abs();
    let mut result = Vec::with_capacity(count);
    for index in 0..count {
        let prev = if index > 0 {
            Some(points[index - 1])
        } else if closed {
            Some(points[count - 1])
        } else {
            None
        };
        let next = if index + 1 < count {
            Some(points[index + 1])
        } else if closed {
            Some(points[0])
        } else {
            None
        };
        let current = points[index];
        let n1 = prev.and_then(|p| edge_normal(p, current));
        let n2 = next.and_then(|n| edge_normal(current, n));
        let offset = match (n1, n2) {
            (Some(a), Some(b)) => {
                let bisector = a + b;
                let len = bisector.length();
                if len <= EPSILON {
                    a * distance
                } else {
                    let dir = bisector / len;
                    let cos_half = dir.dot(a).max(EPSILON);
                    let miter = (distance / cos_half).clamp(-limit, limit);
                    dir * miter
                }
            }
            (Some(a), None) | (None, Some(a)) => a * distance,
            (None, None) => DVec2::ZERO,
        };
        result.push(Point2::from_vec(current.as_vec2() + offset));
    }
    result
}

/// 多边形的最小边长，用于限制倒角尺寸。
pub fn min_edge_length(points: &[Point2]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for index in 0..points.len() {
        let next = points[(index + 1) % points.len()];
        best = best.min(points[index].distance(next));
    }
    best
}

/// 去掉相邻重复点以及与首点重合的尾点。
pub fn dedup_ring(points: &[Point2]) -> Vec<Point2> {
    let mut result: Vec<Point2> = Vec::with_capacity(points.len());
    for point in points {
        if result
            .last()
            .is_none_or(|last: &Point2| !last.approx_eq(*point, 1e-7))
        {
            result.push(*point);
        }
    }
    if result.len() > 1 && result[0].approx_eq(result[result.len() - 1], 1e-7) {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn square() -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ]
    }

    #[test]
    fn rotate_and_scale_about_center() {
        let p = Point2::new(10.0, 0.0);
        let r = p.rotate_about(Point2::origin(), FRAC_PI_2);
        assert!(r.approx_eq(Point2::new(0.0, 10.0), 1e-9));

        let s = Point2::new(3.0, 4.0).scale_about(Point2::new(1.0, 1.0), 2.0, -1.0);
        assert!(s.approx_eq(Point2::new(5.0, -2.0), 1e-9));
    }

    #[test]
    fn bounds_accumulate_points() {
        let bounds = Bounds2D::from_points(square());
        assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
        assert_eq!(bounds.max(), Point2::new(10.0, 10.0));
        assert!(bounds.contains_point(Point2::new(5.0, 5.0), 0.0));
        assert!(!bounds.contains_point(Point2::new(11.0, 5.0), 0.5));
        assert!(Bounds2D::empty().is_empty());
    }

    #[test]
    fn segment_distance_handles_endpoints() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(10.0, 0.0);
        assert!((distance_to_segment(Point2::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((distance_to_segment(Point2::new(-4.0, 3.0), a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn square_area_and_containment() {
        let sq = square();
        assert!((signed_area(&sq) - 100.0).abs() < 1e-9);
        assert!(point_in_polygon(Point2::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(Point2::new(15.0, 5.0), &sq));
    }

    #[test]
    fn resample_closed_square_spaces_evenly() {
        let samples = resample_by_arc_length(&square(), 8, true);
        assert_eq!(samples.len(), 8);
        assert!(samples[0].approx_eq(Point2::new(0.0, 0.0), 1e-9));
        assert!(samples[1].approx_eq(Point2::new(5.0, 0.0), 1e-9));
        assert!(samples[2].approx_eq(Point2::new(10.0, 0.0), 1e-9));
        assert!(samples[7].approx_eq(Point2::new(0.0, 5.0), 1e-9));
    }

    #[test]
    fn resample_open_keeps_endpoints() {
        let line = [Point2::new(0.0, 0.0), Point2::new(9.0, 0.0)];
        let samples = resample_by_arc_length(&line, 4, false);
        assert_eq!(samples.len(), 4);
        assert!(samples[3].approx_eq(Point2::new(9.0, 0.0), 1e-9));
        assert!(samples[1].approx_eq(Point2::new(3.0, 0.0), 1e-9));
    }

    #[test]
    fn offset_square_outward_and_inward() {
        // 逆时针正方形：负偏移向右侧即外侧。
        let outward = offset_polyline(&square(), -1.0, true);
        assert!(outward[0].approx_eq(Point2::new(-1.0, -1.0), 1e-9));
        let inward = offset_polyline(&square(), 1.0, true);
        assert!(inward[2].approx_eq(Point2::new(9.0, 9.0), 1e-9));
    }

    #[test]
    fn arc_sweep_wraps_around() {
        assert!((normalized_sweep(0.0, PI) - PI).abs() < 1e-9);
        assert!((normalized_sweep(PI, 0.0) - PI).abs() < 1e-9);
        assert!(angle_in_sweep(3.0 * PI / 2.0, PI, 0.0));
        assert!(!angle_in_sweep(FRAC_PI_2, PI, 0.0));
        let pts = arc_points(Point2::origin(), 1.0, 0.0, FRAC_PI_2, 4);
        assert_eq!(pts.len(), 5);
        assert!(pts[4].approx_eq(Point2::new(0.0, 1.0), 1e-9));
    }

    #[test]
    fn catmull_rom_passes_through_controls() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 5.0),
            Point2::new(20.0, 0.0),
        ];
        let curve = catmull_rom(&pts, 4);
        assert_eq!(curve.len(), 9);
        assert!(curve[4].approx_eq(pts[1], 1e-9));
        assert!(curve[8].approx_eq(pts[2], 1e-9));
    }
}
