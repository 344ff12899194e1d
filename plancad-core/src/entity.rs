//! 场景实体定义。
//!
//! `Entity` 是场景对象种类的封闭集合：二维图元、派生实体（拉伸/旋转/扫掠/放样/布尔切除）
//! 以及块参照。图元不引用其他对象，派生实体和编组只保存对象 ID。

use serde::{Deserialize, Serialize};

use crate::block::BlockReference;
use crate::derived::{Cut, Extrude, Loft, Revolve, Sweep};
use crate::document::ObjectId;
use crate::draw::Canvas;
use crate::geometry::{
    Bounds2D, Point2, Transform2, Vector2, angle_in_sweep, arc_points, circle_points, dedup_ring,
    distance_to_polyline, distance_to_segment, normalized_sweep, point_in_polygon,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Entity {
    #[serde(rename = "wall")]
    Wall(Wall),
    #[serde(rename = "door")]
    Door(Door),
    #[serde(rename = "polyline")]
    Polyline(Polyline),
    #[serde(rename = "circle")]
    Circle(Circle),
    #[serde(rename = "arc")]
    Arc(Arc),
    #[serde(rename = "sketch")]
    Sketch(Sketch),
    #[serde(rename = "symbol")]
    Symbol(Symbol),
    #[serde(rename = "text")]
    Text(Text),
    #[serde(rename = "dimension")]
    Dimension(Dimension),
    #[serde(rename = "group")]
    Group(Group),
    #[serde(rename = "extrudeObject")]
    Extrude(Extrude),
    #[serde(rename = "revolveObject")]
    Revolve(Revolve),
    #[serde(rename = "sweepObject")]
    Sweep(Sweep),
    #[serde(rename = "loftObject")]
    Loft(Loft),
    #[serde(rename = "cutObject")]
    Cut(Cut),
    #[serde(rename = "blockReference")]
    BlockReference(BlockReference),
}

impl Entity {
    /// 持久化记录中使用的类型判别字符串。
    pub fn record_tag(&self) -> &'static str {
        match self {
            Entity::Wall(_) => "wall",
            Entity::Door(_) => "door",
            Entity::Polyline(_) => "polyline",
            Entity::Circle(_) => "circle",
            Entity::Arc(_) => "arc",
            Entity::Sketch(_) => "sketch",
            Entity::Symbol(_) => "symbol",
            Entity::Text(_) => "text",
            Entity::Dimension(_) => "dimension",
            Entity::Group(_) => "group",
            Entity::Extrude(_) => "extrudeObject",
            Entity::Revolve(_) => "revolveObject",
            Entity::Sweep(_) => "sweepObject",
            Entity::Loft(_) => "loftObject",
            Entity::Cut(_) => "cutObject",
            Entity::BlockReference(_) => "blockReference",
        }
    }

    /// 是否为派生实体。
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Entity::Extrude(_) | Entity::Revolve(_) | Entity::Sweep(_) | Entity::Loft(_) | Entity::Cut(_)
        )
    }

    /// 是否为不引用其他对象的二维图元。
    pub fn is_primitive(&self) -> bool {
        self.as_primitive().is_some()
    }

    /// 派生实体消费的源对象 ID；二维 fallback 委托给第一个源。
    pub fn source_ids(&self) -> Vec<ObjectId> {
        match self {
            Entity::Extrude(extrude) => vec![extrude.source],
            Entity::Revolve(revolve) => vec![revolve.source],
            Entity::Sweep(sweep) => vec![sweep.profile, sweep.path],
            Entity::Loft(loft) => loft.profiles.clone(),
            Entity::Cut(cut) => vec![cut.target, cut.tool],
            _ => Vec::new(),
        }
    }

    /// 创建时是否把源对象标记为隐藏（源仍在注册表中，仅用于重建三维结果）。
    pub fn hides_sources(&self) -> bool {
        matches!(self, Entity::Sweep(_) | Entity::Loft(_) | Entity::Cut(_))
    }

    /// 按映射表替换派生实体/编组中的引用 ID，用于深拷贝。
    pub fn remap_ids(&mut self, map: &dyn Fn(ObjectId) -> ObjectId) {
        match self {
            Entity::Extrude(extrude) => extrude.source = map(extrude.source),
            Entity::Revolve(revolve) => revolve.source = map(revolve.source),
            Entity::Sweep(sweep) => {
                sweep.profile = map(sweep.profile);
                sweep.path = map(sweep.path);
            }
            Entity::Loft(loft) => {
                for profile in &mut loft.profiles {
                    *profile = map(*profile);
                }
            }
            Entity::Cut(cut) => {
                cut.target = map(cut.target);
                cut.tool = map(cut.tool);
            }
            Entity::Group(group) => {
                for member in &mut group.members {
                    *member = map(*member);
                }
            }
            _ => {}
        }
    }

    /// 借出图元视图；派生实体、编组和块参照返回 `None`。
    pub fn as_primitive(&self) -> Option<PrimitiveRef<'_>> {
        Some(match self {
            Entity::Wall(wall) => PrimitiveRef::Wall(wall),
            Entity::Door(door) => PrimitiveRef::Door(door),
            Entity::Polyline(polyline) => PrimitiveRef::Polyline(polyline),
            Entity::Circle(circle) => PrimitiveRef::Circle(circle),
            Entity::Arc(arc) => PrimitiveRef::Arc(arc),
            Entity::Sketch(sketch) => PrimitiveRef::Sketch(sketch),
            Entity::Symbol(symbol) => PrimitiveRef::Symbol(symbol),
            Entity::Text(text) => PrimitiveRef::Text(text),
            Entity::Dimension(dimension) => PrimitiveRef::Dimension(dimension),
            Entity::Group(_)
            | Entity::Extrude(_)
            | Entity::Revolve(_)
            | Entity::Sweep(_)
            | Entity::Loft(_)
            | Entity::Cut(_)
            | Entity::BlockReference(_) => return None,
        })
    }

    /// 对图元本身施加变换。派生实体只变换自身的位置参数（如旋转轴），
    /// 源对象的级联由文档负责。
    pub fn apply_local(&mut self, transform: &Transform2) {
        match self {
            Entity::Wall(wall) => {
                wall.start = transform.apply(wall.start);
                wall.end = transform.apply(wall.end);
                wall.thickness *= transform.length_factor();
            }
            Entity::Door(door) => {
                door.position = transform.apply(door.position);
                door.rotation = transform.apply_angle(door.rotation);
                door.width *= transform.length_factor();
                if transform.mirrors() {
                    door.swing = door.swing.flipped();
                }
            }
            Entity::Polyline(polyline) => {
                for point in &mut polyline.points {
                    *point = transform.apply(*point);
                }
            }
            Entity::Circle(circle) => {
                circle.center = transform.apply(circle.center);
                circle.radius *= transform.length_factor();
            }
            Entity::Arc(arc) => arc.apply(transform),
            Entity::Sketch(sketch) => {
                for segment in &mut sketch.segments {
                    segment.apply(transform);
                }
            }
            Entity::Symbol(symbol) => {
                symbol.position = transform.apply(symbol.position);
                symbol.rotation = transform.apply_angle(symbol.rotation);
                symbol.size *= transform.length_factor();
            }
            Entity::Text(text) => {
                text.insert = transform.apply(text.insert);
                text.rotation = transform.apply_angle(text.rotation);
                text.height *= transform.length_factor();
            }
            Entity::Dimension(dimension) => {
                dimension.start = transform.apply(dimension.start);
                dimension.end = transform.apply(dimension.end);
                dimension.offset *= transform.length_factor();
                if transform.mirrors() {
                    dimension.offset = -dimension.offset;
                }
            }
            Entity::Revolve(revolve) => {
                revolve.axis_start = transform.apply(revolve.axis_start);
                revolve.axis_end = transform.apply(revolve.axis_end);
            }
            Entity::BlockReference(reference) => reference.apply(transform),
            Entity::Group(_)
            | Entity::Extrude(_)
            | Entity::Sweep(_)
            | Entity::Loft(_)
            | Entity::Cut(_) => {}
        }
    }

    /// 移动图元的第 `index` 个编辑夹点，返回是否生效。
    pub fn move_grip_local(&mut self, index: usize, point: Point2) -> bool {
        match self {
            Entity::Wall(wall) => match index {
                0 => {
                    wall.start = point;
                    true
                }
                1 => {
                    wall.end = point;
                    true
                }
                _ => false,
            },
            Entity::Door(door) => {
                if index == 0 {
                    door.position = point;
                    true
                } else {
                    false
                }
            }
            Entity::Polyline(polyline) => match polyline.points.get_mut(index) {
                Some(vertex) => {
                    *vertex = point;
                    true
                }
                None => false,
            },
            Entity::Circle(circle) => match index {
                0 => {
                    circle.center = point;
                    true
                }
                1 => {
                    circle.radius = circle.center.distance(point);
                    true
                }
                _ => false,
            },
            Entity::Arc(arc) => match index {
                0 => {
                    arc.center = point;
                    true
                }
                1 => {
                    arc.start_angle = arc.center.vector_to(point).angle();
                    arc.radius = arc.center.distance(point);
                    true
                }
                2 => {
                    arc.end_angle = arc.center.vector_to(point).angle();
                    arc.radius = arc.center.distance(point);
                    true
                }
                _ => false,
            },
            Entity::Sketch(sketch) => sketch.move_vertex(index, point),
            Entity::Symbol(symbol) => {
                if index == 0 {
                    symbol.position = point;
                    true
                } else {
                    false
                }
            }
            Entity::Text(text) => {
                if index == 0 {
                    text.insert = point;
                    true
                } else {
                    false
                }
            }
            Entity::Dimension(dimension) => match index {
                0 => {
                    dimension.start = point;
                    true
                }
                1 => {
                    dimension.end = point;
                    true
                }
                _ => false,
            },
            Entity::BlockReference(reference) => {
                if index == 0 {
                    reference.insert = point;
                    true
                } else {
                    false
                }
            }
            Entity::Group(_)
            | Entity::Extrude(_)
            | Entity::Revolve(_)
            | Entity::Sweep(_)
            | Entity::Loft(_)
            | Entity::Cut(_) => false,
        }
    }
}

/// 图元的只读借用视图，集中实现所有叶子实体的几何查询。
#[derive(Debug, Clone, Copy)]
pub enum PrimitiveRef<'a> {
    Wall(&'a Wall),
    Door(&'a Door),
    Polyline(&'a Polyline),
    Circle(&'a Circle),
    Arc(&'a Arc),
    Sketch(&'a Sketch),
    Symbol(&'a Symbol),
    Text(&'a Text),
    Dimension(&'a Dimension),
}

/// 捕捉点类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapKind {
    Endpoint,
    Midpoint,
    Center,
    Quadrant,
    Insertion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapPoint {
    pub point: Point2,
    pub kind: SnapKind,
}

impl SnapPoint {
    #[inline]
    pub fn new(point: Point2, kind: SnapKind) -> Self {
        Self { point, kind }
    }
}

impl<'a> PrimitiveRef<'a> {
    pub fn bounds(self) -> Bounds2D {
        match self {
            PrimitiveRef::Wall(wall) => Bounds2D::from_points(wall.outline()),
            PrimitiveRef::Door(door) => {
                let mut bounds = Bounds2D::from_points([door.position, door.leaf_end()]);
                bounds.include_point(door.open_end());
                bounds
            }
            PrimitiveRef::Polyline(polyline) => Bounds2D::from_points(polyline.points.iter().copied()),
            PrimitiveRef::Circle(circle) => {
                let r = circle.radius.abs();
                Bounds2D::new(
                    circle.center.translate(Vector2::new(-r, -r)),
                    circle.center.translate(Vector2::new(r, r)),
                )
            }
            PrimitiveRef::Arc(arc) => arc.bounds(),
            PrimitiveRef::Sketch(sketch) => {
                let mut bounds = Bounds2D::empty();
                for segment in &sketch.segments {
                    bounds.include_bounds(&segment.bounds());
                }
                bounds
            }
            PrimitiveRef::Symbol(symbol) => Bounds2D::from_points(symbol.outline()),
            PrimitiveRef::Text(text) => Bounds2D::from_points(text.outline()),
            PrimitiveRef::Dimension(dimension) => {
                let (a, b) = dimension.dimension_line();
                Bounds2D::from_points([dimension.start, dimension.end, a, b])
            }
        }
    }

    pub fn contains(self, point: Point2, tolerance: f64) -> bool {
        match self {
            PrimitiveRef::Wall(wall) => {
                distance_to_segment(point, wall.start, wall.end) <= wall.thickness * 0.5 + tolerance
            }
            PrimitiveRef::Door(door) => {
                distance_to_segment(point, door.position, door.leaf_end()) <= tolerance
                    || door.position.distance(point) <= door.width + tolerance
                        && door.swing_contains(point)
            }
            PrimitiveRef::Polyline(polyline) => {
                distance_to_polyline(point, &polyline.points, polyline.closed) <= tolerance
            }
            PrimitiveRef::Circle(circle) => {
                (circle.center.distance(point) - circle.radius).abs() <= tolerance
            }
            PrimitiveRef::Arc(arc) => arc.distance_to(point) <= tolerance,
            PrimitiveRef::Sketch(sketch) => {
                let ring = sketch.boundary(64);
                distance_to_polyline(point, &ring, true) <= tolerance
                    || point_in_polygon(point, &ring)
            }
            PrimitiveRef::Symbol(symbol) => {
                let outline = symbol.outline();
                point_in_polygon(point, &outline)
                    || distance_to_polyline(point, &outline, true) <= tolerance
            }
            PrimitiveRef::Text(text) => {
                let outline = text.outline();
                point_in_polygon(point, &outline)
                    || distance_to_polyline(point, &outline, true) <= tolerance
            }
            PrimitiveRef::Dimension(dimension) => {
                let (a, b) = dimension.dimension_line();
                distance_to_segment(point, a, b) <= tolerance
                    || distance_to_segment(point, dimension.start, a) <= tolerance
                    || distance_to_segment(point, dimension.end, b) <= tolerance
            }
        }
    }

    /// 对象中心：线性对象取中点，插入类对象取插入点。
    pub fn center(self) -> Point2 {
        match self {
            PrimitiveRef::Wall(wall) => wall.start.lerp(wall.end, 0.5),
            PrimitiveRef::Door(door) => door.position.lerp(door.leaf_end(), 0.5),
            PrimitiveRef::Circle(circle) => circle.center,
            PrimitiveRef::Arc(arc) => arc.center,
            PrimitiveRef::Symbol(symbol) => symbol.position,
            PrimitiveRef::Text(text) => text.insert,
            PrimitiveRef::Dimension(dimension) => dimension.start.lerp(dimension.end, 0.5),
            PrimitiveRef::Polyline(_) | PrimitiveRef::Sketch(_) => {
                let bounds = self.bounds();
                if bounds.is_empty() {
                    Point2::origin()
                } else {
                    bounds.center()
                }
            }
        }
    }

    pub fn snap_points(self) -> Vec<SnapPoint> {
        let mut snaps = Vec::new();
        match self {
            PrimitiveRef::Wall(wall) => {
                snaps.push(SnapPoint::new(wall.start, SnapKind::Endpoint));
                snaps.push(SnapPoint::new(wall.end, SnapKind::Endpoint));
                snaps.push(SnapPoint::new(wall.start.lerp(wall.end, 0.5), SnapKind::Midpoint));
                for corner in wall.outline() {
                    snaps.push(SnapPoint::new(corner, SnapKind::Endpoint));
                }
            }
            PrimitiveRef::Door(door) => {
                snaps.push(SnapPoint::new(door.position, SnapKind::Insertion));
                snaps.push(SnapPoint::new(door.leaf_end(), SnapKind::Endpoint));
            }
            PrimitiveRef::Polyline(polyline) => {
                for point in &polyline.points {
                    snaps.push(SnapPoint::new(*point, SnapKind::Endpoint));
                }
                for pair in polyline.points.windows(2) {
                    snaps.push(SnapPoint::new(pair[0].lerp(pair[1], 0.5), SnapKind::Midpoint));
                }
                if polyline.closed && polyline.points.len() > 2 {
                    let first = polyline.points[0];
                    let last = polyline.points[polyline.points.len() - 1];
                    snaps.push(SnapPoint::new(last.lerp(first, 0.5), SnapKind::Midpoint));
                }
            }
            PrimitiveRef::Circle(circle) => {
                snaps.push(SnapPoint::new(circle.center, SnapKind::Center));
                for quadrant in 0..4 {
                    let angle = std::f64::consts::FRAC_PI_2 * quadrant as f64;
                    snaps.push(SnapPoint::new(
                        circle.center.translate(Vector2::from_angle(angle).scaled(circle.radius)),
                        SnapKind::Quadrant,
                    ));
                }
            }
            PrimitiveRef::Arc(arc) => {
                snaps.push(SnapPoint::new(arc.center, SnapKind::Center));
                snaps.push(SnapPoint::new(arc.start_point(), SnapKind::Endpoint));
                snaps.push(SnapPoint::new(arc.end_point(), SnapKind::Endpoint));
                snaps.push(SnapPoint::new(arc.mid_point(), SnapKind::Midpoint));
            }
            PrimitiveRef::Sketch(sketch) => {
                for segment in &sketch.segments {
                    snaps.push(SnapPoint::new(segment.start_point(), SnapKind::Endpoint));
                    snaps.push(SnapPoint::new(segment.mid_point(), SnapKind::Midpoint));
                }
            }
            PrimitiveRef::Symbol(symbol) => {
                snaps.push(SnapPoint::new(symbol.position, SnapKind::Insertion));
            }
            PrimitiveRef::Text(text) => {
                snaps.push(SnapPoint::new(text.insert, SnapKind::Insertion));
            }
            PrimitiveRef::Dimension(dimension) => {
                snaps.push(SnapPoint::new(dimension.start, SnapKind::Endpoint));
                snaps.push(SnapPoint::new(dimension.end, SnapKind::Endpoint));
            }
        }
        snaps
    }

    /// 编辑夹点，顺序与 [`Entity::move_grip_local`] 的索引一致。
    pub fn grips(self) -> Vec<Point2> {
        match self {
            PrimitiveRef::Wall(wall) => vec![wall.start, wall.end],
            PrimitiveRef::Door(door) => vec![door.position],
            PrimitiveRef::Polyline(polyline) => polyline.points.clone(),
            PrimitiveRef::Circle(circle) => vec![
                circle.center,
                circle.center.translate(Vector2::new(circle.radius, 0.0)),
            ],
            PrimitiveRef::Arc(arc) => vec![arc.center, arc.start_point(), arc.end_point()],
            PrimitiveRef::Sketch(sketch) => sketch
                .segments
                .iter()
                .map(|segment| segment.start_point())
                .collect(),
            PrimitiveRef::Symbol(symbol) => vec![symbol.position],
            PrimitiveRef::Text(text) => vec![text.insert],
            PrimitiveRef::Dimension(dimension) => vec![dimension.start, dimension.end],
        }
    }

    /// 封闭轮廓（用于拉伸、扫掠截面、放样）。开放图元返回 `None`。
    pub fn profile_ring(self, segments: usize) -> Option<Vec<Point2>> {
        let ring = match self {
            PrimitiveRef::Wall(wall) => wall.outline().to_vec(),
            PrimitiveRef::Polyline(polyline) => {
                if !polyline.closed {
                    return None;
                }
                polyline.points.clone()
            }
            PrimitiveRef::Circle(circle) => circle_points(circle.center, circle.radius, segments),
            PrimitiveRef::Sketch(sketch) => sketch.boundary(segments),
            PrimitiveRef::Symbol(symbol) => symbol.outline().to_vec(),
            PrimitiveRef::Door(_)
            | PrimitiveRef::Arc(_)
            | PrimitiveRef::Text(_)
            | PrimitiveRef::Dimension(_) => return None,
        };
        let ring = dedup_ring(&ring);
        if ring.len() >= 3 { Some(ring) } else { None }
    }

    /// 路径点序列（用于扫掠路径和旋转轮廓）。
    pub fn path_points(self, segments: usize) -> Option<Vec<Point2>> {
        let points = match self {
            PrimitiveRef::Wall(wall) => vec![wall.start, wall.end],
            PrimitiveRef::Polyline(polyline) => {
                let mut points = polyline.points.clone();
                if polyline.closed {
                    if let Some(first) = polyline.points.first() {
                        points.push(*first);
                    }
                }
                points
            }
            PrimitiveRef::Arc(arc) => {
                arc_points(arc.center, arc.radius, arc.start_angle, arc.end_angle, segments)
            }
            PrimitiveRef::Circle(circle) => {
                let mut points = circle_points(circle.center, circle.radius, segments);
                points.push(points[0]);
                points
            }
            PrimitiveRef::Sketch(sketch) => {
                let mut points = sketch.boundary(segments);
                if let Some(first) = points.first().copied() {
                    points.push(first);
                }
                points
            }
            PrimitiveRef::Dimension(dimension) => vec![dimension.start, dimension.end],
            PrimitiveRef::Door(_) | PrimitiveRef::Symbol(_) | PrimitiveRef::Text(_) => {
                return None;
            }
        };
        if points.len() >= 2 { Some(points) } else { None }
    }

    pub fn draw(self, canvas: &mut dyn Canvas) {
        match self {
            PrimitiveRef::Wall(wall) => canvas.polyline(&wall.outline(), true),
            PrimitiveRef::Door(door) => {
                canvas.line(door.position, door.leaf_end());
                let start = door.rotation;
                let (from, to) = match door.swing {
                    DoorSwing::Left => (start, start + std::f64::consts::FRAC_PI_2),
                    DoorSwing::Right => (start - std::f64::consts::FRAC_PI_2, start),
                };
                canvas.arc(door.position, door.width, from, to);
            }
            PrimitiveRef::Polyline(polyline) => canvas.polyline(&polyline.points, polyline.closed),
            PrimitiveRef::Circle(circle) => canvas.circle(circle.center, circle.radius),
            PrimitiveRef::Arc(arc) => {
                canvas.arc(arc.center, arc.radius, arc.start_angle, arc.end_angle)
            }
            PrimitiveRef::Sketch(sketch) => {
                for segment in &sketch.segments {
                    match *segment {
                        SketchSegment::Line { start, end } => canvas.line(start, end),
                        SketchSegment::Arc {
                            center,
                            radius,
                            start_angle,
                            end_angle,
                        } => canvas.arc(center, radius, start_angle, end_angle),
                    }
                }
            }
            PrimitiveRef::Symbol(symbol) => {
                canvas.polyline(&symbol.outline(), true);
                canvas.text(symbol.position, &symbol.kind, symbol.size * 0.4, symbol.rotation);
            }
            PrimitiveRef::Text(text) => {
                canvas.text(text.insert, &text.content, text.height, text.rotation)
            }
            PrimitiveRef::Dimension(dimension) => {
                let (a, b) = dimension.dimension_line();
                canvas.line(dimension.start, a);
                canvas.line(dimension.end, b);
                canvas.line(a, b);
                let label = format!("{:.0}", dimension.measurement());
                canvas.text(a.lerp(b, 0.5), &label, dimension.text_height, 0.0);
            }
        }
    }
}

/// 墙体：中心线加厚度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub start: Point2,
    pub end: Point2,
    pub thickness: f64,
}

impl Wall {
    /// 墙体轮廓矩形，逆时针顺序。中心线退化时返回四个重合点。
    pub fn outline(&self) -> [Point2; 4] {
        let half = self.thickness.abs() * 0.5;
        let normal = Vector2::from_points(self.start, self.end)
            .normalize()
            .map(|dir| dir.perp().scaled(half))
            .unwrap_or_else(Vector2::zero);
        let back = normal.scaled(-1.0);
        [
            self.start.translate(back),
            self.end.translate(back),
            self.end.translate(normal),
            self.start.translate(normal),
        ]
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorSwing {
    #[default]
    Left,
    Right,
}

impl DoorSwing {
    pub fn flipped(self) -> Self {
        match self {
            DoorSwing::Left => DoorSwing::Right,
            DoorSwing::Right => DoorSwing::Left,
        }
    }
}

/// 门：铰链点、门扇宽度、门扇方向角与开启方向。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub position: Point2,
    pub width: f64,
    pub rotation: f64,
    #[serde(default)]
    pub swing: DoorSwing,
}

impl Door {
    pub fn leaf_end(&self) -> Point2 {
        self.position
            .translate(Vector2::from_angle(self.rotation).scaled(self.width))
    }

    /// 门扇完全打开时的端点。
    pub fn open_end(&self) -> Point2 {
        let quarter = match self.swing {
            DoorSwing::Left => std::f64::consts::FRAC_PI_2,
            DoorSwing::Right => -std::f64::consts::FRAC_PI_2,
        };
        self.position
            .translate(Vector2::from_angle(self.rotation + quarter).scaled(self.width))
    }

    fn swing_contains(&self, point: Point2) -> bool {
        let angle = self.position.vector_to(point).angle();
        match self.swing {
            DoorSwing::Left => angle_in_sweep(
                angle,
                self.rotation,
                self.rotation + std::f64::consts::FRAC_PI_2,
            ),
            DoorSwing::Right => angle_in_sweep(
                angle,
                self.rotation - std::f64::consts::FRAC_PI_2,
                self.rotation,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point2>,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

/// 圆弧实体，角度以弧度形式储存，遵循数学正方向。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Arc {
    pub fn start_point(&self) -> Point2 {
        self.center
            .translate(Vector2::from_angle(self.start_angle).scaled(self.radius))
    }

    pub fn end_point(&self) -> Point2 {
        self.center
            .translate(Vector2::from_angle(self.end_angle).scaled(self.radius))
    }

    pub fn mid_point(&self) -> Point2 {
        let mid = self.start_angle + normalized_sweep(self.start_angle, self.end_angle) * 0.5;
        self.center
            .translate(Vector2::from_angle(mid).scaled(self.radius))
    }

    fn bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::from_points([self.start_point(), self.end_point()]);
        for quadrant in 0..4 {
            let angle = std::f64::consts::FRAC_PI_2 * quadrant as f64;
            if angle_in_sweep(angle, self.start_angle, self.end_angle) {
                bounds.include_point(
                    self.center
                        .translate(Vector2::from_angle(angle).scaled(self.radius)),
                );
            }
        }
        bounds
    }

    fn distance_to(&self, point: Point2) -> f64 {
        let angle = self.center.vector_to(point).angle();
        if angle_in_sweep(angle, self.start_angle, self.end_angle) {
            (self.center.distance(point) - self.radius).abs()
        } else {
            point
                .distance(self.start_point())
                .min(point.distance(self.end_point()))
        }
    }

    /// 通过变换端点重新求角，镜像时交换起止角以保持逆时针方向。
    fn apply(&mut self, transform: &Transform2) {
        let start = transform.apply(self.start_point());
        let end = transform.apply(self.end_point());
        self.center = transform.apply(self.center);
        self.radius *= transform.length_factor();
        let start_angle = self.center.vector_to(start).angle();
        let end_angle = self.center.vector_to(end).angle();
        if transform.mirrors() {
            self.start_angle = end_angle;
            self.end_angle = start_angle;
        } else {
            self.start_angle = start_angle;
            self.end_angle = end_angle;
        }
    }
}

/// 草图段：直线或圆弧。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SketchSegment {
    Line {
        start: Point2,
        end: Point2,
    },
    Arc {
        center: Point2,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
}

impl SketchSegment {
    fn as_arc(&self) -> Option<Arc> {
        match *self {
            SketchSegment::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => Some(Arc {
                center,
                radius,
                start_angle,
                end_angle,
            }),
            SketchSegment::Line { .. } => None,
        }
    }

    pub fn start_point(&self) -> Point2 {
        match self {
            SketchSegment::Line { start, .. } => *start,
            SketchSegment::Arc { .. } => self.as_arc().map_or(Point2::origin(), |a| a.start_point()),
        }
    }

    pub fn end_point(&self) -> Point2 {
        match self {
            SketchSegment::Line { end, .. } => *end,
            SketchSegment::Arc { .. } => self.as_arc().map_or(Point2::origin(), |a| a.end_point()),
        }
    }

    pub fn mid_point(&self) -> Point2 {
        match self {
            SketchSegment::Line { start, end } => start.lerp(*end, 0.5),
            SketchSegment::Arc { .. } => self.as_arc().map_or(Point2::origin(), |a| a.mid_point()),
        }
    }

    fn bounds(&self) -> Bounds2D {
        match self {
            SketchSegment::Line { start, end } => Bounds2D::from_points([*start, *end]),
            SketchSegment::Arc { .. } => self.as_arc().map_or(Bounds2D::empty(), |a| a.bounds()),
        }
    }

    fn points(&self, segments: usize) -> Vec<Point2> {
        match *self {
            SketchSegment::Line { start, end } => vec![start, end],
            SketchSegment::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let sweep = normalized_sweep(start_angle, end_angle);
                let count = ((segments as f64) * sweep / std::f64::consts::TAU).ceil() as usize;
                arc_points(center, radius, start_angle, end_angle, count.max(2))
            }
        }
    }

    fn apply(&mut self, transform: &Transform2) {
        match self {
            SketchSegment::Line { start, end } => {
                *start = transform.apply(*start);
                *end = transform.apply(*end);
            }
            SketchSegment::Arc { .. } => {
                if let Some(mut arc) = self.as_arc() {
                    arc.apply(transform);
                    *self = SketchSegment::Arc {
                        center: arc.center,
                        radius: arc.radius,
                        start_angle: arc.start_angle,
                        end_angle: arc.end_angle,
                    };
                }
            }
        }
    }
}

/// 草图：首尾相接的直线/圆弧段组成的封闭区域。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sketch {
    pub segments: Vec<SketchSegment>,
}

impl Sketch {
    /// 由多边形顶点构造只含直线段的草图。
    pub fn from_polygon(points: &[Point2]) -> Self {
        let segments = (0..points.len())
            .map(|index| SketchSegment::Line {
                start: points[index],
                end: points[(index + 1) % points.len()],
            })
            .collect();
        Self { segments }
    }

    /// 离散后的边界环，不重复首点。
    pub fn boundary(&self, segments: usize) -> Vec<Point2> {
        let mut ring = Vec::new();
        for segment in &self.segments {
            ring.extend(segment.points(segments));
        }
        dedup_ring(&ring)
    }

    /// 移动第 `index` 段起点；前一段若为直线则同步其终点。
    fn move_vertex(&mut self, index: usize, point: Point2) -> bool {
        let count = self.segments.len();
        if index >= count {
            return false;
        }
        let previous = (index + count - 1) % count;
        let old = self.segments[index].start_point();
        match &mut self.segments[index] {
            SketchSegment::Line { start, .. } => *start = point,
            SketchSegment::Arc { center, .. } => {
                let delta = old.vector_to(point);
                *center = center.translate(delta);
            }
        }
        if let SketchSegment::Line { end, .. } = &mut self.segments[previous] {
            if end.approx_eq(old, 1e-9) {
                *end = point;
            }
        }
        true
    }
}

/// 疏散图符号（安全出口、灭火器等），以正方形外框表示。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: String,
    pub position: Point2,
    pub size: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl Symbol {
    pub fn outline(&self) -> [Point2; 4] {
        let half = self.size.abs() * 0.5;
        [(-half, -half), (half, -half), (half, half), (-half, half)].map(|(x, y)| {
            Point2::new(self.position.x() + x, self.position.y() + y)
                .rotate_about(self.position, self.rotation)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub insert: Point2,
    pub content: String,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

impl Text {
    /// 估算文字外框：字宽按字高的 0.6 倍计。
    pub fn outline(&self) -> [Point2; 4] {
        let width = self.content.chars().count().max(1) as f64 * self.height * 0.6;
        let h = self.height;
        [(0.0, 0.0), (width, 0.0), (width, h), (0.0, h)].map(|(x, y)| {
            Point2::new(self.insert.x() + x, self.insert.y() + y)
                .rotate_about(self.insert, self.rotation)
        })
    }
}

/// 对齐标注：两测量点与尺寸线偏移。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub start: Point2,
    pub end: Point2,
    pub offset: f64,
    #[serde(default = "Dimension::default_text_height")]
    pub text_height: f64,
}

impl Dimension {
    fn default_text_height() -> f64 {
        2.5
    }

    pub fn measurement(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// 尺寸线两端点。
    pub fn dimension_line(&self) -> (Point2, Point2) {
        let normal = Vector2::from_points(self.start, self.end)
            .normalize()
            .map(|dir| dir.perp().scaled(self.offset))
            .unwrap_or_else(Vector2::zero);
        (self.start.translate(normal), self.end.translate(normal))
    }
}

/// 编组：按 ID 持有成员，成员归编组所有。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Group {
    pub members: Vec<ObjectId>,
}
