//! 三角网格与派生实体的网格生成器。
//!
//! 所有生成器都是纯函数：输入二维轮廓与参数，输出外法线朝外的三角网格。

use std::f64::consts::TAU;

use thiserror::Error;
use tracing::warn;

use crate::csg::CsgError;
use crate::document::ObjectId;
use crate::geometry::{
    Bounds3, EPSILON, Point2, Point3, Vector2, catmull_rom, dedup_ring,
    offset_polyline, resample_by_arc_length, signed_area, vertex_centroid,
};

/// 派生实体构建失败的原因。失败时调用方缓存占位网格，不向上传播。
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("源对象 {0:?} 不存在")]
    MissingSource(ObjectId),
    #[error("对象 {id:?} ({kind}) 不能作为{role}")]
    InvalidSource {
        id: ObjectId,
        kind: &'static str,
        role: &'static str,
    },
    #[error("对象 {0:?} 不是派生实体")]
    NotDerived(ObjectId),
    #[error("派生实体 {0:?} 存在循环引用")]
    Cycle(ObjectId),
    #[error("源对象 {0:?} 只有占位网格")]
    PlaceholderInput(ObjectId),
    #[error("至少需要 {needed} 个点，实际 {found} 个")]
    TooFewPoints { needed: usize, found: usize },
    #[error("几何退化: {0}")]
    Degenerate(&'static str),
    #[error(transparent)]
    Boolean(#[from] CsgError),
}

/// 索引三角网格。`placeholder` 标记构建失败时生成的占位盒。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3>,
    pub triangles: Vec<[u32; 3]>,
    placeholder: bool,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以 `center` 为中心、边长为 `size` 的立方体占位网格。
    pub fn placeholder_box(center: Point3, size: f64) -> Self {
        let half = size.abs().max(EPSILON) * 0.5;
        let mut mesh = Self::new();
        let bottom = [
            Point2::new(center.x() - half, center.y() - half),
            Point2::new(center.x() + half, center.y() - half),
            Point2::new(center.x() + half, center.y() + half),
            Point2::new(center.x() - half, center.y() + half),
        ];
        let lower = mesh.push_ring(&bottom, center.z() - half);
        let upper = mesh.push_ring(&bottom, center.z() + half);
        mesh.bridge(lower, upper, 4, true);
        mesh.cap(lower, &bottom, true);
        mesh.cap(upper, &bottom, false);
        mesh.placeholder = true;
        mesh
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn bounds(&self) -> Bounds3 {
        Bounds3::from_points(self.vertices.iter().copied())
    }

    /// 三角形三个顶点坐标。
    pub fn triangle(&self, index: usize) -> Option<[Point3; 3]> {
        let tri = self.triangles.get(index)?;
        Some([
            *self.vertices.get(tri[0] as usize)?,
            *self.vertices.get(tri[1] as usize)?,
            *self.vertices.get(tri[2] as usize)?,
        ])
    }

    /// 闭合网格的有向体积（外法线朝外时为正）。
    pub fn signed_volume(&self) -> f64 {
        (0..self.triangles.len())
            .filter_map(|index| self.triangle(index))
            .map(|[a, b, c]| a.as_vec3().dot(b.as_vec3().cross(c.as_vec3())) / 6.0)
            .sum()
    }

    fn push_ring(&mut self, ring: &[Point2], z: f64) -> u32 {
        let base = self.vertices.len() as u32;
        self.vertices
            .extend(ring.iter().map(|point| Point3::from_plan(*point, z)));
        base
    }

    fn push_points(&mut self, points: impl IntoIterator<Item = Point3>) -> u32 {
        let base = self.vertices.len() as u32;
        self.vertices.extend(points);
        base
    }

    /// 连接两个等长顶点环。下环逆时针时侧面法线朝外。
    fn bridge(&mut self, lower: u32, upper: u32, count: usize, closed: bool) {
        let edges = if closed { count } else { count.saturating_sub(1) };
        for index in 0..edges {
            let next = (index + 1) % count;
            let (li, lj) = (lower + index as u32, lower + next as u32);
            let (ui, uj) = (upper + index as u32, upper + next as u32);
            self.triangles.push([li, lj, uj]);
            self.triangles.push([li, uj, ui]);
        }
    }

    /// 用二维轮廓的三角剖分封口，`flip` 为真时法线反向。
    fn cap(&mut self, base: u32, ring: &[Point2], flip: bool) {
        for [a, b, c] in triangulate(ring) {
            let tri = [base + a as u32, base + b as u32, base + c as u32];
            if flip {
                self.triangles.push([tri[0], tri[2], tri[1]]);
            } else {
                self.triangles.push(tri);
            }
        }
    }

    fn flip_winding(&mut self) {
        for tri in &mut self.triangles {
            tri.swap(1, 2);
        }
    }
}

/// 拉伸封顶的倒角形式。
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bevel {
    #[default]
    None,
    Chamfer {
        size: f64,
    },
    Fillet {
        radius: f64,
    },
}

/// 三角剖分简单多边形，返回逆时针顶点索引三元组。剖分失败时返回空。
pub fn triangulate(ring: &[Point2]) -> Vec<[usize; 3]> {
    if ring.len() < 3 {
        return Vec::new();
    }
    let flat: Vec<f64> = ring.iter().flat_map(|point| [point.x(), point.y()]).collect();
    let indices = match earcutr::earcut(&flat, &[], 2) {
        Ok(indices) => indices,
        Err(err) => {
            warn!(error = ?err, vertices = ring.len(), "polygon triangulation failed");
            return Vec::new();
        }
    };
    indices
        .chunks_exact(3)
        .map(|tri| {
            let [a, b, c] = [tri[0], tri[1], tri[2]];
            if signed_area(&[ring[a], ring[b], ring[c]]) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect()
}

fn prepare_ring(ring: &[Point2]) -> Result<Vec<Point2>, BuildError> {
    let mut ring = dedup_ring(ring);
    if ring.len() < 3 {
        return Err(BuildError::TooFewPoints {
            needed: 3,
            found: ring.len(),
        });
    }
    let area = signed_area(&ring);
    if area.abs() <= EPSILON {
        return Err(BuildError::Degenerate("轮廓面积为零"));
    }
    if area < 0.0 {
        ring.reverse();
    }
    Ok(ring)
}

fn segments_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let side = |p: Point2, q: Point2, r: Point2| {
        (q.x() - p.x()) * (r.y() - p.y()) - (q.y() - p.y()) * (r.x() - p.x())
    };
    let (d1, d2) = (side(a, b, c), side(a, b, d));
    let (d3, d4) = (side(c, d, a), side(c, d, b));
    d1 * d2 < -EPSILON && d3 * d4 < -EPSILON
}

/// 逆时针轮廓内缩 `inset` 后仍为同向、无自交的简单多边形。
fn inset_is_valid(ring: &[Point2], inset: f64) -> bool {
    let inner = offset_polyline(ring, inset, true);
    let count = ring.len();
    let edge = |points: &[Point2], index: usize| {
        Vector2::from_points(points[index], points[(index + 1) % count])
    };
    if (0..count).any(|index| edge(ring, index).dot(edge(&inner, index)) <= EPSILON) {
        return false;
    }
    if signed_area(&inner) <= EPSILON {
        return false;
    }
    for i in 0..count {
        for j in i + 2..count {
            if i == 0 && j == count - 1 {
                continue;
            }
            if segments_cross(inner[i], inner[(i + 1) % count], inner[j], inner[(j + 1) % count]) {
                return false;
            }
        }
    }
    true
}

/// 不超过 `wanted` 的最大有效内缩量。
fn clamp_inset(ring: &[Point2], wanted: f64) -> f64 {
    if wanted <= EPSILON || inset_is_valid(ring, wanted) {
        return wanted;
    }
    let (mut valid, mut invalid) = (0.0, wanted);
    for _ in 0..48 {
        let mid = 0.5 * (valid + invalid);
        if inset_is_valid(ring, mid) {
            valid = mid;
        } else {
            invalid = mid;
        }
    }
    valid * 0.9
}

/// 沿 +Z 拉伸闭合轮廓。倒角通过真实的内偏移环实现：
/// 斜角为一圈内缩环，圆角为按四分之一圆分布的多圈内缩环。
pub fn extrude_polygon(
    ring: &[Point2],
    height: f64,
    bevel: Bevel,
    fillet_segments: usize,
) -> Result<Mesh, BuildError> {
    let ring = prepare_ring(ring)?;
    if !height.is_finite() || height.abs() <= EPSILON {
        return Err(BuildError::Degenerate("拉伸高度为零"));
    }
    let depth = height.abs();

    // (z, 内缩量)
    let mut levels: Vec<(f64, f64)> = vec![(0.0, 0.0)];
    match bevel {
        Bevel::None => levels.push((depth, 0.0)),
        Bevel::Chamfer { size } => {
            let size = clamp_inset(&ring, size.abs().min(depth));
            if size <= EPSILON {
                levels.push((depth, 0.0));
            } else {
                if depth - size > EPSILON {
                    levels.push((depth - size, 0.0));
                }
                levels.push((depth, size));
            }
        }
        Bevel::Fillet { radius } => {
            let radius = clamp_inset(&ring, radius.abs().min(depth));
            if radius <= EPSILON {
                levels.push((depth, 0.0));
            } else {
                if depth - radius > EPSILON {
                    levels.push((depth - radius, 0.0));
                }
                let steps = fillet_segments.max(1);
                for step in 1..=steps {
                    let theta = std::f64::consts::FRAC_PI_2 * step as f64 / steps as f64;
                    levels.push((
                        depth - radius + radius * theta.sin(),
                        radius * (1.0 - theta.cos()),
                    ));
                }
            }
        }
    }

    let mut mesh = Mesh::new();
    let mut bases = Vec::with_capacity(levels.len());
    let mut top_ring = ring.clone();
    for &(z, inset) in &levels {
        let level_ring = if inset <= EPSILON {
            ring.clone()
        } else {
            offset_polyline(&ring, inset, true)
        };
        bases.push(mesh.push_ring(&level_ring, z));
        top_ring = level_ring;
    }
    for pair in bases.windows(2) {
        mesh.bridge(pair[0], pair[1], ring.len(), true);
    }
    mesh.cap(bases[0], &ring, true);
    if let Some(&top) = bases.last() {
        mesh.cap(top, &top_ring, false);
    }

    if height < 0.0 {
        for vertex in &mut mesh.vertices {
            *vertex = Point3::new(vertex.x(), vertex.y(), -vertex.z());
        }
        mesh.flip_winding();
    }
    Ok(mesh)
}

/// 绕平面内轴线旋转轮廓。轴线位于 z=0 平面，点到轴的有向垂距作为半径，
/// 角度为零时得到的截面与原轮廓重合。
pub fn revolve_profile(
    points: &[Point2],
    closed: bool,
    axis_start: Point2,
    axis_end: Point2,
    angle: f64,
    segments: usize,
) -> Result<Mesh, BuildError> {
    let points = if closed {
        prepare_ring(points)?
    } else {
        let mut points = points.to_vec();
        points.dedup_by(|a, b| a.approx_eq(*b, 1e-7));
        points
    };
    if points.len() < 2 {
        return Err(BuildError::TooFewPoints {
            needed: 2,
            found: points.len(),
        });
    }
    let Some(axis) = Vector2::from_points(axis_start, axis_end).normalize() else {
        return Err(BuildError::Degenerate("旋转轴长度为零"));
    };
    if !angle.is_finite() || angle.abs() <= EPSILON {
        return Err(BuildError::Degenerate("旋转角度为零"));
    }

    let full = angle.abs() >= TAU - 1e-6;
    let sweep = if full { TAU } else { angle };
    let steps = ((segments.max(3) as f64) * sweep.abs() / TAU).ceil().max(1.0) as usize;
    let side = axis.perp();

    // (轴向投影, 有向半径)
    let section: Vec<(f64, f64)> = points
        .iter()
        .map(|point| {
            let rel = axis_start.vector_to(*point);
            (rel.dot(axis), rel.dot(side))
        })
        .collect();

    let place = |height: f64, radius: f64, theta: f64| -> Point3 {
        let base = axis_start.translate(axis.scaled(height));
        let plan = base.translate(side.scaled(radius * theta.cos()));
        Point3::from_plan(plan, radius * theta.sin())
    };

    let rings = if full { steps } else { steps + 1 };
    let count = section.len();
    let mut mesh = Mesh::new();
    let mut bases = Vec::with_capacity(rings);
    for step in 0..rings {
        let theta = sweep * step as f64 / steps as f64;
        bases.push(
            mesh.push_points(section.iter().map(|&(h, r)| place(h, r, theta))),
        );
    }
    let pairs = if full { rings } else { rings - 1 };
    for step in 0..pairs {
        let a = bases[step];
        let b = bases[(step + 1) % rings];
        mesh.bridge(a, b, count, closed);
    }

    if closed && !full {
        let flat: Vec<Point2> = section.iter().map(|&(h, r)| Point2::new(h, r)).collect();
        mesh.cap(bases[0], &flat, true);
        if let Some(&last) = bases.last() {
            mesh.cap(last, &flat, false);
        }
    }
    if mesh.signed_volume() < 0.0 {
        mesh.flip_winding();
    }
    Ok(mesh)
}

/// 沿 Catmull-Rom 插值路径扫掠闭合截面。截面 x 对应路径左侧方向，y 对应 +Z。
pub fn sweep_profile(
    profile: &[Point2],
    path: &[Point2],
    subdivisions: usize,
) -> Result<Mesh, BuildError> {
    let profile = prepare_ring(profile)?;
    let mut control = path.to_vec();
    control.dedup_by(|a, b| a.approx_eq(*b, 1e-7));
    if control.len() < 2 {
        return Err(BuildError::TooFewPoints {
            needed: 2,
            found: control.len(),
        });
    }
    let mut samples = catmull_rom(&control, subdivisions);
    samples.dedup_by(|a, b| a.approx_eq(*b, 1e-7));
    if samples.len() < 2 {
        return Err(BuildError::Degenerate("扫掠路径长度为零"));
    }

    let Some(center) = vertex_centroid(&profile) else {
        return Err(BuildError::Degenerate("截面为空"));
    };
    let local: Vec<Vector2> = profile
        .iter()
        .map(|point| center.vector_to(*point))
        .collect();

    let mut mesh = Mesh::new();
    let mut bases = Vec::with_capacity(samples.len());
    for index in 0..samples.len() {
        let prev = samples[index.saturating_sub(1)];
        let next = samples[(index + 1).min(samples.len() - 1)];
        let tangent = Vector2::from_points(prev, next)
            .normalize()
            .unwrap_or(Vector2::new(1.0, 0.0));
        let side = tangent.perp();
        let origin = samples[index];
        bases.push(mesh.push_points(local.iter().map(|offset| {
            Point3::from_plan(origin.translate(side.scaled(offset.x())), offset.y())
        })));
    }
    for pair in bases.windows(2) {
        mesh.bridge(pair[0], pair[1], local.len(), true);
    }

    let cap_ring: Vec<Point2> = local.iter().map(|v| Point2::new(v.x(), v.y())).collect();
    mesh.cap(bases[0], &cap_ring, true);
    if let Some(&last) = bases.last() {
        mesh.cap(last, &cap_ring, false);
    }
    if mesh.signed_volume() < 0.0 {
        mesh.flip_winding();
    }
    Ok(mesh)
}

/// 放样：各截面按弧长重采样到同一点数，置于对应高度，相邻截面间生成直纹三角带并封口。
pub fn loft_profiles(
    profiles: &[Vec<Point2>],
    heights: &[f64],
    samples: usize,
) -> Result<Mesh, BuildError> {
    if profiles.len() < 2 {
        return Err(BuildError::TooFewPoints {
            needed: 2,
            found: profiles.len(),
        });
    }
    if heights.len() != profiles.len() {
        return Err(BuildError::Degenerate("截面高度数量不匹配"));
    }
    let samples = samples.max(3);

    let mut rings: Vec<Vec<Point2>> = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let ring = prepare_ring(profile)?;
        let mut resampled = resample_by_arc_length(&ring, samples, true);
        if let Some(previous) = rings.last() {
            align_start(&mut resampled, previous[0]);
        }
        rings.push(resampled);
    }

    let mut mesh = Mesh::new();
    let bases: Vec<u32> = rings
        .iter()
        .zip(heights)
        .map(|(ring, z)| mesh.push_ring(ring, *z))
        .collect();
    for pair in bases.windows(2) {
        mesh.bridge(pair[0], pair[1], samples, true);
    }
    mesh.cap(bases[0], &rings[0], true);
    let last = rings.len() - 1;
    mesh.cap(bases[last], &rings[last], false);
    if mesh.signed_volume() < 0.0 {
        mesh.flip_winding();
    }
    Ok(mesh)
}

/// 旋转环的起点，使其最接近上一截面的起点，避免扭曲。
fn align_start(ring: &mut [Point2], anchor: Point2) {
    let best = ring
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.distance(anchor)
                .partial_cmp(&b.distance(anchor))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(index, _)| index)
        .unwrap_or(0);
    ring.rotate_left(best);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point2> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(size, 0.0),
            Point2::new(size, size),
            Point2::new(0.0, size),
        ]
    }

    #[test]
    fn plain_extrude_is_closed_box() {
        let mesh = extrude_polygon(&square(10.0), 5.0, Bevel::None, 4).expect("extrude");
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!((mesh.signed_volume() - 500.0).abs() < 1e-6);
        let bounds = mesh.bounds();
        assert!((bounds.max().z() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_profile_still_faces_outward() {
        let mut ring = square(10.0);
        ring.reverse();
        let mesh = extrude_polygon(&ring, 2.0, Bevel::None, 4).expect("extrude");
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn chamfer_insets_top_ring_without_scaling() {
        let mesh = extrude_polygon(&square(10.0), 5.0, Bevel::Chamfer { size: 1.0 }, 4)
            .expect("extrude");
        let top: Vec<_> = mesh
            .vertices
            .iter()
            .filter(|v| (v.z() - 5.0).abs() < 1e-9)
            .collect();
        assert_eq!(top.len(), 4);
        assert!(top.iter().any(|v| (v.x() - 1.0).abs() < 1e-9 && (v.y() - 1.0).abs() < 1e-9));
        assert!(top.iter().any(|v| (v.x() - 9.0).abs() < 1e-9 && (v.y() - 9.0).abs() < 1e-9));
        // 斜角体积 = 完整盒体减去四条边上的三角棱柱
        assert!(mesh.signed_volume() < 500.0);
        assert!(mesh.signed_volume() > 450.0);
    }

    #[test]
    fn fillet_radius_is_clamped_to_profile() {
        let mesh = extrude_polygon(&square(2.0), 10.0, Bevel::Fillet { radius: 50.0 }, 3)
            .expect("extrude");
        assert!(mesh.vertices.iter().all(|v| v.x() >= -1e-9 && v.x() <= 2.0 + 1e-9));
        assert!(mesh.signed_volume() > 0.0);
        // 底环 + 圆角起始环 + 3 圈圆角
        assert_eq!(mesh.vertex_count(), 4 * 5);
    }

    #[test]
    fn degenerate_profiles_fail() {
        let line = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)];
        assert_eq!(
            extrude_polygon(&line, 1.0, Bevel::None, 4),
            Err(BuildError::Degenerate("轮廓面积为零"))
        );
        assert!(matches!(
            extrude_polygon(&square(1.0)[..2], 1.0, Bevel::None, 4),
            Err(BuildError::TooFewPoints { .. })
        ));
    }

    #[test]
    fn revolve_at_zero_angle_reproduces_profile() {
        let profile = vec![
            Point2::new(2.0, 1.0),
            Point2::new(4.0, 1.0),
            Point2::new(4.0, 3.0),
            Point2::new(2.0, 3.0),
        ];
        let mesh = revolve_profile(
            &profile,
            true,
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            TAU,
            16,
        )
        .expect("revolve");
        for point in &profile {
            assert!(
                mesh.vertices
                    .iter()
                    .any(|v| v.z().abs() < 1e-9 && v.plan().approx_eq(*point, 1e-9))
            );
        }
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn sweep_follows_path_length() {
        let profile = square(1.0);
        let path = vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(20.0, 5.0),
        ];
        let mesh = sweep_profile(&profile, &path, 8).expect("sweep");
        let bounds = mesh.bounds();
        assert!(bounds.max().x() > 19.0);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn loft_resamples_every_profile() {
        let small = square(2.0);
        let triangle = vec![Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(2.0, 3.0)];
        let mesh = loft_profiles(&[small, triangle], &[0.0, 10.0], 12).expect("loft");
        assert_eq!(mesh.vertex_count(), 24);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn placeholder_box_is_flagged() {
        let mesh = Mesh::placeholder_box(Point3::new(1.0, 2.0, 3.0), 2.0);
        assert!(mesh.is_placeholder());
        assert!((mesh.signed_volume() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn triangulates_concave_polygon() {
        let l_shape = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let triangles = triangulate(&l_shape);
        assert_eq!(triangles.len(), 4);
        let area: f64 = triangles
            .iter()
            .map(|t| signed_area(&[l_shape[t[0]], l_shape[t[1]], l_shape[t[2]]]))
            .sum();
        assert!((area - 7.0).abs() < 1e-9);
    }

    #[test]
    fn chamfer_on_narrow_concave_profile_keeps_top_ring_simple() {
        let l_shape = vec![
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 4.0),
            Point2::new(0.0, 4.0),
        ];
        let mesh = extrude_polygon(&l_shape, 10.0, Bevel::Chamfer { size: 5.0 }, 4)
            .expect("extrude");
        let count = l_shape.len();
        let top = &mesh.vertices[mesh.vertices.len() - count..];
        assert!(top.iter().all(|v| (v.z() - 10.0).abs() < 1e-9));
        for index in 0..count {
            let next = (index + 1) % count;
            let original = Vector2::from_points(l_shape[index], l_shape[next]);
            let inset = Vector2::from_points(top[index].plan(), top[next].plan());
            assert!(original.dot(inset) > 0.0, "edge {index} reversed");
        }
        // 两臂宽 1，内缩量必须小于 0.5
        assert!(top[0].x() > 0.0 && top[0].x() < 0.5);
        assert!(mesh.signed_volume() > 0.0);
        assert!(mesh.signed_volume() < 70.0);
    }
}
