//! 基于点序列的修改命令。
//!
//! [`PointTool`] 负责选择对象并按提示收集若干点；各命令只实现 [`SequenceHook`]，
//! 在点收齐时把它们翻译成一次 [`Edit`]。`dist` 直接使用同一工具，结束时只报告结果。

use plancad_core::document::ObjectId;
use plancad_core::entity::{Arc, Circle, Entity, Polyline, Wall};
use plancad_core::geometry::{
    EPSILON, Point2, Transform2, Vector2, distance_to_polyline, offset_polyline,
};

use super::input::{parse_number, parse_point};
use super::{Edit, Tool, ToolContext, ToolRegistry, ToolStep};

pub(crate) fn register(registry: &mut ToolRegistry) {
    registry.register("move", &["m"], |_| Ok(Box::new(PointTool::new(MoveHook))));
    registry.register("copy", &["co", "cp"], |_| Ok(Box::new(PointTool::new(CopyHook))));
    registry.register("rotate", &["ro"], |_| Ok(Box::new(PointTool::new(RotateHook))));
    registry.register("scale", &["sc"], |_| Ok(Box::new(PointTool::new(ScaleHook))));
    registry.register("mirror", &["mi"], |_| Ok(Box::new(PointTool::new(MirrorHook))));
    registry.register("offset", &["o"], |_| Ok(Box::new(PointTool::new(OffsetHook))));
    registry.register("erase", &["e", "delete"], |_| Ok(Box::new(PointTool::new(EraseHook))));
    registry.register("dist", &["di"], |_| Ok(Box::new(PointTool::new(DistanceHook))));
}

/// 点序列收齐后的处理逻辑。
pub trait SequenceHook {
    fn name(&self) -> &'static str;

    fn needs_selection(&self) -> bool {
        true
    }

    /// 每个待输入点的提示，长度即点数。
    fn prompts(&self) -> &'static [&'static str];

    fn check_selection(&self, _ctx: &ToolContext<'_>, _ids: &[ObjectId]) -> Result<(), String> {
        Ok(())
    }

    /// 每输入一个点后调用，`points` 已含新点；出错时该点被撤回。
    fn check_point(&self, _points: &[Point2]) -> Result<(), String> {
        Ok(())
    }

    /// 所有点齐备后调用。返回 `Reject` 时最后一个点被撤回。
    fn complete(&self, ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep;

    /// 在已有 `points` 的步骤输入了数值；`None` 表示该步骤不接受数值。
    fn value(
        &self,
        _ctx: &ToolContext<'_>,
        _ids: &[ObjectId],
        _points: &[Point2],
        _value: f64,
    ) -> Option<ToolStep> {
        None
    }
}

pub struct PointTool<H> {
    hook: H,
    ids: Vec<ObjectId>,
    selecting: bool,
    points: Vec<Point2>,
}

impl<H: SequenceHook> PointTool<H> {
    pub fn new(hook: H) -> Self {
        let selecting = hook.needs_selection();
        Self {
            hook,
            ids: Vec::new(),
            selecting,
            points: Vec::new(),
        }
    }

    fn add_target(&mut self, id: ObjectId) -> ToolStep {
        if self.ids.contains(&id) {
            return ToolStep::Reject(format!("对象 #{} 已选择", id.get()));
        }
        self.ids.push(id);
        ToolStep::Continue
    }

    fn end_selection(&mut self, ctx: &ToolContext<'_>) -> ToolStep {
        if self.ids.is_empty() {
            return ToolStep::Reject("未选择对象".to_string());
        }
        if let Err(message) = self.hook.check_selection(ctx, &self.ids) {
            self.ids.clear();
            return ToolStep::Reject(message);
        }
        self.selecting = false;
        self.try_complete(ctx)
    }

    fn push_point(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        self.points.push(point);
        if let Err(message) = self.hook.check_point(&self.points) {
            self.points.pop();
            return ToolStep::Reject(message);
        }
        self.try_complete(ctx)
    }

    fn try_complete(&mut self, ctx: &ToolContext<'_>) -> ToolStep {
        if self.points.len() < self.hook.prompts().len() {
            return ToolStep::Continue;
        }
        let step = self.hook.complete(ctx, &self.ids, &self.points);
        if matches!(step, ToolStep::Reject(_)) {
            self.points.pop();
        }
        step
    }
}

impl<H: SequenceHook> Tool for PointTool<H> {
    fn name(&self) -> &'static str {
        self.hook.name()
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        if self.selecting && !preselected.is_empty() {
            for id in preselected {
                if !self.ids.contains(id) {
                    self.ids.push(*id);
                }
            }
            if let Err(message) = self.hook.check_selection(ctx, &self.ids) {
                return ToolStep::Abort(message);
            }
            self.selecting = false;
        }
        if self.selecting {
            ToolStep::Continue
        } else {
            self.try_complete(ctx)
        }
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        if !self.selecting {
            return self.push_point(ctx, point);
        }
        match ctx.pick(point) {
            Some(id) => self.add_target(id),
            None => ToolStep::Reject("未选中对象".to_string()),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        if self.selecting {
            return match ctx.resolve_id(text) {
                Some(id) => self.add_target(id),
                None => ToolStep::Reject(format!("找不到对象 `{text}`")),
            };
        }
        if let Some(point) = parse_point(text, self.points.last().copied()) {
            return self.push_point(ctx, point);
        }
        parse_number(text)
            .and_then(|value| self.hook.value(ctx, &self.ids, &self.points, value))
            .unwrap_or_else(|| ToolStep::Reject(format!("无法识别的输入 `{text}`")))
    }

    fn on_enter(&mut self, ctx: &ToolContext<'_>) -> ToolStep {
        if self.selecting {
            self.end_selection(ctx)
        } else {
            ToolStep::Reject("请指定点".to_string())
        }
    }

    fn prompt(&self) -> String {
        if self.selecting {
            return format!("选择对象（已选 {}，回车结束）:", self.ids.len());
        }
        self.hook
            .prompts()
            .get(self.points.len())
            .map_or_else(String::new, |prompt| (*prompt).to_string())
    }
}

pub struct MoveHook;

impl SequenceHook for MoveHook {
    fn name(&self) -> &'static str {
        "move"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定基点:", "指定第二点:"]
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        ToolStep::Commit(Edit::Transform {
            ids: ids.to_vec(),
            steps: vec![Transform2::Translate(Vector2::from_points(
                points[0], points[1],
            ))],
        })
    }
}

pub struct CopyHook;

impl SequenceHook for CopyHook {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定基点:", "指定第二点:"]
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        ToolStep::Commit(Edit::Copy {
            ids: ids.to_vec(),
            steps: vec![Transform2::Translate(Vector2::from_points(
                points[0], points[1],
            ))],
        })
    }
}

/// 按参照旋转：中心、参照点、目标点；第二步也可直接输入角度（度）。
pub struct RotateHook;

impl RotateHook {
    fn commit(ids: &[ObjectId], center: Point2, angle: f64) -> ToolStep {
        ToolStep::Commit(Edit::Transform {
            ids: ids.to_vec(),
            steps: vec![Transform2::Rotate { center, angle }],
        })
    }
}

impl SequenceHook for RotateHook {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定旋转中心:", "指定参照点或输入角度:", "指定目标点:"]
    }

    fn check_point(&self, points: &[Point2]) -> Result<(), String> {
        match points {
            [center, .., last] if center.distance(*last) <= EPSILON => {
                Err("该点不能与旋转中心重合".to_string())
            }
            _ => Ok(()),
        }
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        let center = points[0];
        let reference = Vector2::from_points(center, points[1]);
        let target = Vector2::from_points(center, points[2]);
        Self::commit(ids, center, target.angle() - reference.angle())
    }

    fn value(
        &self,
        _ctx: &ToolContext<'_>,
        ids: &[ObjectId],
        points: &[Point2],
        value: f64,
    ) -> Option<ToolStep> {
        match points {
            [center] => Some(Self::commit(ids, *center, value.to_radians())),
            _ => None,
        }
    }
}

/// 按参照缩放：基点、参照点、目标点；第二步也可直接输入比例。
pub struct ScaleHook;

impl ScaleHook {
    fn commit(ids: &[ObjectId], center: Point2, factor: f64) -> ToolStep {
        if !(factor.is_finite() && factor > EPSILON) {
            return ToolStep::Reject("比例必须为正数".to_string());
        }
        ToolStep::Commit(Edit::Transform {
            ids: ids.to_vec(),
            steps: vec![Transform2::Scale {
                center,
                sx: factor,
                sy: factor,
            }],
        })
    }
}

impl SequenceHook for ScaleHook {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定基点:", "指定参照点或输入比例:", "指定目标点:"]
    }

    fn check_point(&self, points: &[Point2]) -> Result<(), String> {
        match points {
            [base, reference] if base.distance(*reference) <= EPSILON => {
                Err("参照点不能与基点重合".to_string())
            }
            _ => Ok(()),
        }
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        let reference = points[0].distance(points[1]);
        Self::commit(ids, points[0], points[0].distance(points[2]) / reference)
    }

    fn value(
        &self,
        _ctx: &ToolContext<'_>,
        ids: &[ObjectId],
        points: &[Point2],
        value: f64,
    ) -> Option<ToolStep> {
        match points {
            [base] => Some(Self::commit(ids, *base, value)),
            _ => None,
        }
    }
}

/// 关于过 `origin`、方向角为 `angle` 的直线的镜像。
pub fn mirror_steps(origin: Point2, angle: f64) -> Vec<Transform2> {
    vec![
        Transform2::Rotate {
            center: origin,
            angle: -angle,
        },
        Transform2::Scale {
            center: origin,
            sx: 1.0,
            sy: -1.0,
        },
        Transform2::Rotate {
            center: origin,
            angle,
        },
    ]
}

/// 镜像复制，源对象保留。
pub struct MirrorHook;

impl SequenceHook for MirrorHook {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定镜像线第一点:", "指定镜像线第二点:"]
    }

    fn check_point(&self, points: &[Point2]) -> Result<(), String> {
        match points {
            [first, second] if first.distance(*second) <= EPSILON => {
                Err("镜像线两点不能重合".to_string())
            }
            _ => Ok(()),
        }
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        let axis = Vector2::from_points(points[0], points[1]);
        ToolStep::Commit(Edit::Copy {
            ids: ids.to_vec(),
            steps: mirror_steps(points[0], axis.angle()),
        })
    }
}

/// 偏移单个多段线、墙、圆或圆弧，生成新对象。
pub struct OffsetHook;

impl OffsetHook {
    fn source<'a>(ctx: &ToolContext<'a>, ids: &[ObjectId]) -> Option<&'a Entity> {
        let id = ids.first()?;
        ctx.document.find(*id).map(|object| &object.entity)
    }
}

impl SequenceHook for OffsetHook {
    fn name(&self) -> &'static str {
        "offset"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定通过点或输入偏移距离:"]
    }

    fn check_selection(&self, ctx: &ToolContext<'_>, ids: &[ObjectId]) -> Result<(), String> {
        let [id] = ids else {
            return Err("偏移一次只能选择一个对象".to_string());
        };
        match ctx.document.find(*id).map(|object| &object.entity) {
            Some(Entity::Polyline(_) | Entity::Wall(_) | Entity::Circle(_) | Entity::Arc(_)) => {
                Ok(())
            }
            _ => Err(format!("对象 #{} ({}) 不支持偏移", id.get(), ctx.kind(*id))),
        }
    }

    fn complete(&self, ctx: &ToolContext<'_>, ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        match Self::source(ctx, ids).and_then(|entity| offset_through(entity, points[0])) {
            Some(entity) => ToolStep::Commit(Edit::Create(vec![entity])),
            None => ToolStep::Reject("通过点不能位于对象上".to_string()),
        }
    }

    fn value(
        &self,
        ctx: &ToolContext<'_>,
        ids: &[ObjectId],
        points: &[Point2],
        value: f64,
    ) -> Option<ToolStep> {
        if !points.is_empty() {
            return None;
        }
        Some(
            match Self::source(ctx, ids).and_then(|entity| offset_by(entity, value)) {
                Some(entity) => ToolStep::Commit(Edit::Create(vec![entity])),
                None => ToolStep::Reject(format!("无法按 {value} 偏移")),
            },
        )
    }
}

/// 按带符号距离偏移：多段线与墙向左为正，圆与圆弧向外为正。
pub fn offset_by(entity: &Entity, distance: f64) -> Option<Entity> {
    if distance.abs() <= EPSILON {
        return None;
    }
    match entity {
        Entity::Polyline(polyline) => Some(Entity::Polyline(Polyline {
            points: offset_polyline(&polyline.points, distance, polyline.closed),
            closed: polyline.closed,
        })),
        Entity::Wall(wall) => {
            let normal = Vector2::from_points(wall.start, wall.end)
                .normalize()?
                .perp()
                .scaled(distance);
            Some(Entity::Wall(Wall {
                start: wall.start.translate(normal),
                end: wall.end.translate(normal),
                thickness: wall.thickness,
            }))
        }
        Entity::Circle(circle) => {
            let radius = circle.radius + distance;
            (radius > EPSILON).then(|| {
                Entity::Circle(Circle {
                    center: circle.center,
                    radius,
                })
            })
        }
        Entity::Arc(arc) => {
            let radius = arc.radius + distance;
            (radius > EPSILON).then(|| {
                Entity::Arc(Arc {
                    radius,
                    ..arc.clone()
                })
            })
        }
        _ => None,
    }
}

/// 偏移到经过 `through` 的位置。
pub fn offset_through(entity: &Entity, through: Point2) -> Option<Entity> {
    match entity {
        Entity::Polyline(polyline) => {
            let distance = distance_to_polyline(through, &polyline.points, polyline.closed);
            if distance <= EPSILON {
                return None;
            }
            let left = offset_polyline(&polyline.points, distance, polyline.closed);
            let right = offset_polyline(&polyline.points, -distance, polyline.closed);
            let gap = |points: &[Point2]| distance_to_polyline(through, points, polyline.closed);
            let points = if gap(&left) <= gap(&right) { left } else { right };
            Some(Entity::Polyline(Polyline {
                points,
                closed: polyline.closed,
            }))
        }
        Entity::Wall(wall) => {
            let normal = Vector2::from_points(wall.start, wall.end).normalize()?.perp();
            offset_by(entity, Vector2::from_points(wall.start, through).dot(normal))
        }
        Entity::Circle(circle) => {
            offset_by(entity, circle.center.distance(through) - circle.radius)
        }
        Entity::Arc(arc) => offset_by(entity, arc.center.distance(through) - arc.radius),
        _ => None,
    }
}

pub struct EraseHook;

impl SequenceHook for EraseHook {
    fn name(&self) -> &'static str {
        "erase"
    }

    fn prompts(&self) -> &'static [&'static str] {
        &[]
    }

    fn complete(&self, _ctx: &ToolContext<'_>, ids: &[ObjectId], _points: &[Point2]) -> ToolStep {
        ToolStep::Commit(Edit::Delete(ids.to_vec()))
    }
}

/// 测量两点距离，不修改文档。
pub struct DistanceHook;

impl SequenceHook for DistanceHook {
    fn name(&self) -> &'static str {
        "dist"
    }

    fn needs_selection(&self) -> bool {
        false
    }

    fn prompts(&self) -> &'static [&'static str] {
        &["指定第一点:", "指定第二点:"]
    }

    fn complete(&self, _ctx: &ToolContext<'_>, _ids: &[ObjectId], points: &[Point2]) -> ToolStep {
        let delta = Vector2::from_points(points[0], points[1]);
        ToolStep::Done(Some(format!(
            "距离 = {:.4}，ΔX = {:.4}，ΔY = {:.4}",
            delta.length(),
            delta.x(),
            delta.y()
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::scene::Scene;
    use crate::tool::prompt::PromptLevel;
    use crate::tool::{Outcome, ToolManager, ToolState};

    fn entity(scene: &Scene, id: ObjectId) -> Entity {
        scene
            .document()
            .find(id)
            .map(|object| object.entity.clone())
            .expect("object")
    }

    fn run(scene: &mut Scene, command: &str, preselected: &[ObjectId], inputs: &[&str]) -> ToolManager {
        let mut manager = ToolManager::new();
        manager
            .start_by_name(scene, command, preselected)
            .expect("start");
        for input in inputs {
            manager.handle_text_input(scene, input).expect("input");
        }
        manager
    }

    #[test]
    fn move_translates_selection_with_one_checkpoint() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(1.0, 1.0), 2.0);
        let manager = run(&mut scene, "m", &[circle], &["0,0", "@3,4"]);
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(
            entity(&scene, circle),
            Entity::Circle(Circle {
                center: Point2::new(4.0, 5.0),
                radius: 2.0,
            })
        );
        assert_eq!(scene.history().labels().count(), 1);
    }

    #[test]
    fn selection_step_accepts_picks_and_ids() {
        let mut scene = Scene::new();
        let a = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 1.0);
        let b = scene.document_mut().add_circle(Point2::new(10.0, 0.0), 1.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "copy", &[]).unwrap();
        manager
            .handle_pointer(&mut scene, Point2::new(1.0, 0.0))
            .unwrap();
        manager
            .handle_text_input(&mut scene, &b.get().to_string())
            .unwrap();
        manager
            .handle_text_input(&mut scene, &a.get().to_string())
            .unwrap();
        assert_eq!(
            manager.prompt().last().map(|m| m.level),
            Some(PromptLevel::Prompt)
        );
        manager.handle_text_input(&mut scene, "").unwrap();
        manager.handle_text_input(&mut scene, "0,0").unwrap();
        manager.handle_text_input(&mut scene, "0,5").unwrap();

        let copies = scene.selected_ids();
        assert_eq!(copies.len(), 2);
        assert_eq!(scene.document().len(), 4);
        assert_eq!(
            entity(&scene, a),
            Entity::Circle(Circle {
                center: Point2::new(0.0, 0.0),
                radius: 1.0,
            })
        );
        assert!(copies.iter().all(|id| *id > b));
    }

    #[test]
    fn rotate_by_reference_and_by_angle() {
        let mut scene = Scene::new();
        let wall = scene
            .document_mut()
            .add_wall(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 1.0);
        run(&mut scene, "ro", &[wall], &["0,0", "90"]);
        let Entity::Wall(rotated) = entity(&scene, wall) else {
            panic!("wall");
        };
        assert!(rotated.end.approx_eq(Point2::new(0.0, 10.0), 1e-9));

        run(&mut scene, "rotate", &[wall], &["0,0", "0,1", "-1,0"]);
        let Entity::Wall(back) = entity(&scene, wall) else {
            panic!("wall");
        };
        assert!(back.end.approx_eq(Point2::new(-10.0, 0.0), 1e-9));
    }

    #[test]
    fn scale_by_reference_rejects_coincident_reference() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 5.0);
        let manager = run(&mut scene, "sc", &[circle], &["0,0", "0,0"]);
        assert!(manager.is_active());
        assert_eq!(manager.prompt().current(), Some("指定参照点或输入比例:"));

        run(&mut scene, "scale", &[circle], &["0,0", "5,0", "10,0"]);
        assert_eq!(
            entity(&scene, circle),
            Entity::Circle(Circle {
                center: Point2::new(0.0, 0.0),
                radius: 10.0,
            })
        );
    }

    #[test]
    fn rotate_rejects_point_on_center() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(3.0, 0.0), 1.0);
        let manager = run(&mut scene, "rotate", &[circle], &["0,0", "0,0"]);
        assert!(manager.is_active());
        assert_eq!(manager.prompt().current(), Some("指定参照点或输入角度:"));
    }

    #[test]
    fn mirror_keeps_source_and_reflects_copy() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(5.0, 2.0), 1.0);
        run(&mut scene, "mi", &[circle], &["0,0", "0,10"]);
        let copy = scene.selected_ids()[0];
        let Entity::Circle(mirrored) = entity(&scene, copy) else {
            panic!("circle");
        };
        assert!(mirrored.center.approx_eq(Point2::new(-5.0, 2.0), 1e-9));
        assert!((mirrored.radius - 1.0).abs() < 1e-9);
        assert!(scene.document().contains_id(circle));
    }

    #[test]
    fn offset_through_point_and_by_distance() {
        let mut scene = Scene::new();
        let square = scene.document_mut().add_polyline(
            [
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(10.0, 10.0),
                Point2::new(0.0, 10.0),
            ],
            true,
        );
        run(&mut scene, "o", &[square], &["12,5"]);
        let Entity::Polyline(outer) = entity(&scene, scene.selected_ids()[0]) else {
            panic!("polyline");
        };
        assert!(outer.points[0].approx_eq(Point2::new(-2.0, -2.0), 1e-9));

        let circle = scene.document_mut().add_circle(Point2::new(50.0, 0.0), 5.0);
        run(&mut scene, "offset", &[circle], &["-2"]);
        assert_eq!(
            entity(&scene, scene.selected_ids()[0]),
            Entity::Circle(Circle {
                center: Point2::new(50.0, 0.0),
                radius: 3.0,
            })
        );
    }

    #[test]
    fn offset_rejects_multiple_objects() {
        let mut scene = Scene::new();
        let a = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 1.0);
        let b = scene.document_mut().add_circle(Point2::new(5.0, 0.0), 1.0);
        let mut manager = ToolManager::new();
        assert!(manager.start_by_name(&mut scene, "offset", &[a, b]).is_err());
        assert_eq!(manager.state(), ToolState::Idle);
    }

    #[test]
    fn erase_with_preselection_commits_immediately() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 1.0);
        scene.select(circle).unwrap();
        let manager = run(&mut scene, "e", &[circle], &[]);
        assert_eq!(manager.last_outcome(), Some(Outcome::Finished));
        assert!(scene.document().is_empty());
        assert_eq!(scene.selection_len(), 0);

        scene.undo().unwrap();
        assert!(scene.document().contains_id(circle));
    }

    #[test]
    fn dist_reports_and_returns_to_idle() {
        let mut scene = Scene::new();
        let manager = run(&mut scene, "dist", &[], &["0,0", "3,4"]);
        assert_eq!(manager.state(), ToolState::Idle);
        assert!(!scene.history().can_undo());
        let message = manager.prompt().last().expect("message");
        assert_eq!(message.level, PromptLevel::Info);
        assert!(message.text.starts_with("距离 = 5.0000"));
    }

    #[test]
    fn offset_helpers_handle_walls_and_arcs() {
        let wall = Entity::Wall(Wall {
            start: Point2::new(0.0, 0.0),
            end: Point2::new(10.0, 0.0),
            thickness: 2.0,
        });
        let Some(Entity::Wall(moved)) = offset_through(&wall, Point2::new(5.0, -3.0)) else {
            panic!("wall");
        };
        assert!(moved.start.approx_eq(Point2::new(0.0, -3.0), 1e-9));

        let arc = Entity::Arc(Arc {
            center: Point2::origin(),
            radius: 4.0,
            start_angle: 0.0,
            end_angle: FRAC_PI_2,
        });
        assert!(offset_by(&arc, -5.0).is_none());
        assert!(matches!(offset_by(&arc, 1.0), Some(Entity::Arc(a)) if a.radius == 5.0));
    }
}
