//! 派生实体的创建命令：拉伸、旋转、扫掠、放样与切除。

use plancad_core::derived::{Bevel, Cut, Extrude, Loft, Revolve, Sweep};
use plancad_core::document::ObjectId;
use plancad_core::entity::Entity;
use plancad_core::geometry::{EPSILON, Point2};

use super::input::{parse_number, parse_point};
use super::{Edit, Tool, ToolContext, ToolError, ToolRegistry, ToolStep};

pub(crate) fn register(registry: &mut ToolRegistry) {
    registry.register("extrude", &["ext"], |_| Ok(Box::new(ExtrudeTool::default())));
    registry.register("revolve", &["rev"], |_| Ok(Box::new(RevolveTool::default())));
    registry.register("sweep", &[], |_| Ok(Box::new(SweepTool::default())));
    registry.register("loft", &[], |_| Ok(Box::new(LoftTool::default())));
    registry.register("cut", &[], |ctx| {
        if !ctx.engine.is_available() {
            return Err(ToolError::EngineUnavailable(ctx.engine.name()));
        }
        Ok(Box::new(CutTool::default()))
    });
}

fn not_profile(ctx: &ToolContext<'_>, id: ObjectId) -> String {
    format!("对象 #{} ({}) 不是封闭轮廓", id.get(), ctx.kind(id))
}

fn too_many(command: &str, count: usize) -> String {
    format!("{command}只能选择一个轮廓，已选 {count} 个")
}

fn missed() -> ToolStep {
    ToolStep::Reject("未选中对象".to_string())
}

/// 先选封闭轮廓，再输入高度和可选倒角/圆角。
#[derive(Debug, Default)]
pub struct ExtrudeTool {
    source: Option<ObjectId>,
}

impl ExtrudeTool {
    fn accept(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        if ctx.profile_ring(id).is_none() {
            return ToolStep::Reject(not_profile(ctx, id));
        }
        self.source = Some(id);
        ToolStep::Continue
    }

    fn commit(&self, source: ObjectId, height: f64, bevel: Bevel) -> ToolStep {
        ToolStep::Commit(Edit::Create(vec![Entity::Extrude(Extrude {
            source,
            height,
            bevel,
        })]))
    }
}

/// 解析 `高度 [c 尺寸 | f 半径]`。
fn parse_extrusion(text: &str) -> Result<(f64, Bevel), String> {
    let mut tokens = text.split_whitespace();
    let height = tokens
        .next()
        .and_then(parse_number)
        .ok_or_else(|| format!("无法识别的高度 `{text}`"))?;
    if height <= 0.0 {
        return Err("高度必须为正数".to_string());
    }
    let bevel = match (tokens.next(), tokens.next().and_then(parse_number)) {
        (None, _) => Bevel::None,
        (Some("c" | "chamfer"), Some(size)) if size > 0.0 => Bevel::Chamfer { size },
        (Some("f" | "fillet"), Some(radius)) if radius > 0.0 => Bevel::Fillet { radius },
        _ => return Err(format!("无法识别的倒角参数 `{text}`")),
    };
    Ok((height, bevel))
}

impl Tool for ExtrudeTool {
    fn name(&self) -> &'static str {
        "extrude"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        match preselected {
            [] => ToolStep::Continue,
            [id] if ctx.profile_ring(*id).is_none() => ToolStep::Abort(not_profile(ctx, *id)),
            [id] => {
                self.source = Some(*id);
                ToolStep::Continue
            }
            _ => ToolStep::Abort(too_many("拉伸", preselected.len())),
        }
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        if self.source.is_some() {
            return ToolStep::Reject("请输入拉伸高度".to_string());
        }
        match ctx.pick(point) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        let Some(source) = self.source else {
            return match ctx.resolve_id(text) {
                Some(id) => self.accept(ctx, id),
                None => missed(),
            };
        };
        match parse_extrusion(text) {
            Ok((height, bevel)) => self.commit(source, height, bevel),
            Err(message) => ToolStep::Reject(message),
        }
    }

    fn on_enter(&mut self, ctx: &ToolContext<'_>) -> ToolStep {
        match self.source {
            Some(source) => self.commit(source, ctx.config.default_extrude_height, Bevel::None),
            None => ToolStep::Reject("请先选择轮廓".to_string()),
        }
    }

    fn prompt(&self) -> String {
        match self.source {
            None => "选择要拉伸的封闭轮廓:".to_string(),
            Some(_) => "输入拉伸高度 [c 倒角 | f 圆角] <默认>:".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RevolveTool {
    source: Option<ObjectId>,
    axis_start: Option<Point2>,
    axis_end: Option<Point2>,
}

impl RevolveTool {
    fn accept(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        if ctx.profile_ring(id).is_none() && ctx.path_points(id).is_none() {
            return ToolStep::Reject(format!(
                "对象 #{} ({}) 不能作为旋转轮廓",
                id.get(),
                ctx.kind(id)
            ));
        }
        self.source = Some(id);
        ToolStep::Continue
    }

    fn axis_point(&mut self, point: Point2) -> ToolStep {
        match self.axis_start {
            None => {
                self.axis_start = Some(point);
                ToolStep::Continue
            }
            Some(start) if start.distance(point) <= EPSILON => {
                ToolStep::Reject("旋转轴端点不能重合".to_string())
            }
            Some(_) => {
                self.axis_end = Some(point);
                ToolStep::Continue
            }
        }
    }

    fn commit(&self, angle: f64) -> ToolStep {
        let (Some(source), Some(axis_start), Some(axis_end)) =
            (self.source, self.axis_start, self.axis_end)
        else {
            return ToolStep::Reject("旋转参数不完整".to_string());
        };
        ToolStep::Commit(Edit::Create(vec![Entity::Revolve(Revolve {
            source,
            axis_start,
            axis_end,
            angle,
        })]))
    }
}

impl Tool for RevolveTool {
    fn name(&self) -> &'static str {
        "revolve"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        match preselected {
            [] => ToolStep::Continue,
            [id] => match self.accept(ctx, *id) {
                ToolStep::Reject(message) => ToolStep::Abort(message),
                step => step,
            },
            _ => ToolStep::Abort(too_many("旋转", preselected.len())),
        }
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        if self.source.is_none() {
            return match ctx.pick(point) {
                Some(id) => self.accept(ctx, id),
                None => missed(),
            };
        }
        if self.axis_end.is_some() {
            return ToolStep::Reject("请输入旋转角度".to_string());
        }
        self.axis_point(point)
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        if self.source.is_none() {
            return match ctx.resolve_id(text) {
                Some(id) => self.accept(ctx, id),
                None => missed(),
            };
        }
        if self.axis_end.is_none() {
            return match parse_point(text, self.axis_start) {
                Some(point) => self.axis_point(point),
                None => ToolStep::Reject(format!("无法识别的坐标 `{text}`")),
            };
        }
        match parse_number(text) {
            Some(degrees) if degrees.abs() > EPSILON && degrees.abs() <= 360.0 => {
                self.commit(degrees.to_radians())
            }
            _ => ToolStep::Reject("角度必须在 (0, 360] 度之间".to_string()),
        }
    }

    fn on_enter(&mut self, _ctx: &ToolContext<'_>) -> ToolStep {
        if self.axis_end.is_some() {
            self.commit(Revolve::full_turn())
        } else {
            ToolStep::Reject("请先指定轮廓和旋转轴".to_string())
        }
    }

    fn prompt(&self) -> String {
        if self.source.is_none() {
            "选择旋转轮廓:".to_string()
        } else if self.axis_start.is_none() {
            "指定旋转轴起点:".to_string()
        } else if self.axis_end.is_none() {
            "指定旋转轴终点:".to_string()
        } else {
            "输入旋转角度 <360>:".to_string()
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepTool {
    profile: Option<ObjectId>,
}

impl SweepTool {
    fn accept(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        let Some(profile) = self.profile else {
            if ctx.profile_ring(id).is_none() {
                return ToolStep::Reject(not_profile(ctx, id));
            }
            self.profile = Some(id);
            return ToolStep::Continue;
        };
        if id == profile {
            return ToolStep::Reject("路径不能与截面相同".to_string());
        }
        if ctx.path_points(id).is_none() {
            return ToolStep::Reject(format!(
                "对象 #{} ({}) 不能作为扫掠路径",
                id.get(),
                ctx.kind(id)
            ));
        }
        ToolStep::Commit(Edit::Create(vec![Entity::Sweep(Sweep { profile, path: id })]))
    }
}

impl Tool for SweepTool {
    fn name(&self) -> &'static str {
        "sweep"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        for &id in preselected.iter().take(2) {
            match self.accept(ctx, id) {
                ToolStep::Reject(message) => return ToolStep::Abort(message),
                ToolStep::Continue => {}
                step => return step,
            }
        }
        ToolStep::Continue
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        match ctx.pick(point) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        match ctx.resolve_id(text) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn prompt(&self) -> String {
        match self.profile {
            None => "选择扫掠截面:".to_string(),
            Some(_) => "选择扫掠路径:".to_string(),
        }
    }
}

/// 依次选择截面，回车结束；至少两个。
#[derive(Debug, Default)]
pub struct LoftTool {
    profiles: Vec<ObjectId>,
}

impl LoftTool {
    fn accept(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        if self.profiles.contains(&id) {
            return ToolStep::Reject(format!("截面 #{} 已选择", id.get()));
        }
        if ctx.profile_ring(id).is_none() {
            return ToolStep::Reject(not_profile(ctx, id));
        }
        self.profiles.push(id);
        ToolStep::Continue
    }
}

impl Tool for LoftTool {
    fn name(&self) -> &'static str {
        "loft"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        for &id in preselected {
            if let ToolStep::Reject(message) = self.accept(ctx, id) {
                return ToolStep::Abort(message);
            }
        }
        ToolStep::Continue
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        match ctx.pick(point) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        match ctx.resolve_id(text) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn on_enter(&mut self, _ctx: &ToolContext<'_>) -> ToolStep {
        if self.profiles.len() < 2 {
            return ToolStep::Reject("放样至少需要两个截面".to_string());
        }
        ToolStep::Commit(Edit::Create(vec![Entity::Loft(Loft {
            profiles: self.profiles.clone(),
            heights: Vec::new(),
            samples: None,
        })]))
    }

    fn prompt(&self) -> String {
        format!("选择放样截面（已选 {}，回车结束）:", self.profiles.len())
    }
}

#[derive(Debug, Default)]
pub struct CutTool {
    target: Option<ObjectId>,
}

impl CutTool {
    fn accept(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        if !ctx.is_solid_operand(id) {
            return ToolStep::Reject(format!(
                "对象 #{} ({}) 不能参与切除",
                id.get(),
                ctx.kind(id)
            ));
        }
        let Some(target) = self.target else {
            self.target = Some(id);
            return ToolStep::Continue;
        };
        if target == id {
            return ToolStep::Reject("刀具不能与目标相同".to_string());
        }
        ToolStep::Commit(Edit::Create(vec![Entity::Cut(Cut { target, tool: id })]))
    }
}

impl Tool for CutTool {
    fn name(&self) -> &'static str {
        "cut"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        for &id in preselected.iter().take(2) {
            match self.accept(ctx, id) {
                ToolStep::Reject(message) => return ToolStep::Abort(message),
                ToolStep::Continue => {}
                step => return step,
            }
        }
        ToolStep::Continue
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        match ctx.pick(point) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        match ctx.resolve_id(text) {
            Some(id) => self.accept(ctx, id),
            None => missed(),
        }
    }

    fn prompt(&self) -> String {
        match self.target {
            None => "选择被切除的目标:".to_string(),
            Some(_) => "选择切除刀具:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use plancad_core::geometry::Vector2;

    use super::*;
    use crate::scene::Scene;
    use crate::tool::{Outcome, ToolManager, ToolState};

    fn square(scene: &mut Scene, origin: (f64, f64), size: f64) -> ObjectId {
        let (x, y) = origin;
        scene.document_mut().add_polyline(
            [
                Point2::new(x, y),
                Point2::new(x + size, y),
                Point2::new(x + size, y + size),
                Point2::new(x, y + size),
            ],
            true,
        )
    }

    fn created(scene: &Scene) -> Entity {
        let ids = scene.selected_ids();
        assert_eq!(ids.len(), 1);
        scene
            .document()
            .find(ids[0])
            .map(|object| object.entity.clone())
            .expect("created object")
    }

    #[test]
    fn extrusion_parameters_parse() {
        assert_eq!(parse_extrusion("10"), Ok((10.0, Bevel::None)));
        assert_eq!(
            parse_extrusion("10 c 2"),
            Ok((10.0, Bevel::Chamfer { size: 2.0 }))
        );
        assert_eq!(
            parse_extrusion("10 fillet 1.5"),
            Ok((10.0, Bevel::Fillet { radius: 1.5 }))
        );
        assert!(parse_extrusion("-3").is_err());
        assert!(parse_extrusion("10 x 2").is_err());
        assert!(parse_extrusion("10 c").is_err());
    }

    #[test]
    fn extrude_by_picking_profile() {
        let mut scene = Scene::new();
        let profile = square(&mut scene, (0.0, 0.0), 10.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "extrude", &[]).unwrap();
        manager
            .handle_pointer(&mut scene, Point2::new(0.0, 5.0))
            .unwrap();
        manager.handle_text_input(&mut scene, "40 c 2").unwrap();
        assert_eq!(
            created(&scene),
            Entity::Extrude(Extrude {
                source: profile,
                height: 40.0,
                bevel: Bevel::Chamfer { size: 2.0 },
            })
        );
    }

    #[test]
    fn revolve_collects_axis_and_angle() {
        let mut scene = Scene::new();
        let profile = square(&mut scene, (5.0, 0.0), 2.0);
        let mut manager = ToolManager::new();
        manager
            .start_by_name(&mut scene, "rev", &[profile])
            .unwrap();
        manager
            .handle_pointer(&mut scene, Point2::new(0.0, 0.0))
            .unwrap();
        manager
            .handle_pointer(&mut scene, Point2::new(0.0, 0.0))
            .unwrap();
        assert!(manager.is_active(), "coincident axis end is rejected");
        manager.handle_text_input(&mut scene, "@0,10").unwrap();
        manager.handle_text_input(&mut scene, "180").unwrap();

        let Entity::Revolve(revolve) = created(&scene) else {
            panic!("expected revolve");
        };
        assert_eq!(revolve.source, profile);
        assert_eq!(revolve.axis_end, Point2::new(0.0, 10.0));
        assert!((revolve.angle - PI).abs() < 1e-12);
    }

    #[test]
    fn single_profile_commands_abort_on_multiple_selection() {
        let mut scene = Scene::new();
        let a = square(&mut scene, (0.0, 0.0), 10.0);
        let b = square(&mut scene, (20.0, 0.0), 10.0);
        let before = scene.document().len();
        let mut manager = ToolManager::new();

        for name in ["extrude", "revolve"] {
            let err = manager
                .start_by_name(&mut scene, name, &[a, b])
                .expect_err("two profiles");
            assert!(matches!(err, ToolError::Precondition(ref m) if m.contains("已选 2 个")));
            assert!(!manager.is_active());
        }
        assert_eq!(scene.document().len(), before);
    }

    #[test]
    fn sweep_hides_both_sources() {
        let mut scene = Scene::new();
        let profile = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 1.0);
        let path = scene.document_mut().add_polyline(
            [
                Point2::new(0.0, 0.0),
                Point2::new(50.0, 0.0),
                Point2::new(50.0, 50.0),
            ],
            false,
        );
        let mut manager = ToolManager::new();
        manager
            .start_by_name(&mut scene, "sweep", &[profile, path])
            .unwrap();
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(
            created(&scene),
            Entity::Sweep(Sweep { profile, path })
        );
        assert!(scene.document().find(profile).unwrap().hidden);
        assert!(scene.document().find(path).unwrap().hidden);
    }

    #[test]
    fn loft_needs_two_profiles() {
        let mut scene = Scene::new();
        let a = square(&mut scene, (0.0, 0.0), 10.0);
        let b = square(&mut scene, (100.0, 0.0), 6.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "loft", &[a]).unwrap();
        manager.handle_text_input(&mut scene, "").unwrap();
        assert!(manager.is_active());
        manager
            .handle_text_input(&mut scene, &a.get().to_string())
            .unwrap();
        assert!(manager.prompt().current().is_some_and(|p| p.contains("已选 1")));
        manager
            .handle_text_input(&mut scene, &format!("#{}", b.get()))
            .unwrap();
        manager.handle_text_input(&mut scene, "").unwrap();
        assert_eq!(
            created(&scene),
            Entity::Loft(Loft {
                profiles: vec![a, b],
                heights: Vec::new(),
                samples: None,
            })
        );
    }

    #[test]
    fn cut_hides_then_undo_restores_sources() {
        let mut scene = Scene::new();
        let target = square(&mut scene, (0.0, 0.0), 10.0);
        let tool = scene.document_mut().add_circle(Point2::new(5.0, 5.0), 2.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "cut", &[]).unwrap();
        manager
            .handle_text_input(&mut scene, &target.get().to_string())
            .unwrap();
        manager
            .handle_text_input(&mut scene, &target.get().to_string())
            .unwrap();
        assert!(manager.is_active(), "tool must differ from target");
        manager
            .handle_pointer(&mut scene, Point2::new(7.0, 5.0))
            .unwrap();
        assert_eq!(manager.last_outcome(), Some(Outcome::Finished));

        assert!(scene.document().find(target).unwrap().hidden);
        assert!(scene.document().find(tool).unwrap().hidden);
        let cut = scene.selected_ids()[0];
        let mesh = scene.mesh(cut).expect("mesh");
        assert!(!mesh.is_placeholder());

        scene.undo().unwrap();
        assert!(!scene.document().find(target).unwrap().hidden);
        assert!(!scene.document().find(tool).unwrap().hidden);
        assert!(scene.document().find(cut).is_none());
    }

    #[test]
    fn moving_an_extrusion_moves_its_profile() {
        let mut scene = Scene::new();
        let profile = square(&mut scene, (0.0, 0.0), 10.0);
        let mut manager = ToolManager::new();
        manager
            .start_by_name(&mut scene, "extrude", &[profile])
            .unwrap();
        manager.handle_text_input(&mut scene, "5").unwrap();
        let extrude = scene.selected_ids()[0];
        let first = scene.mesh(extrude).expect("mesh");

        manager.start_by_name(&mut scene, "move", &[extrude]).unwrap();
        manager.handle_text_input(&mut scene, "0,0").unwrap();
        manager.handle_text_input(&mut scene, "@20,0").unwrap();

        let second = scene.mesh(extrude).expect("mesh");
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
        let moved = scene.document().bounding_box(profile).expect("bounds");
        assert_eq!(moved.min(), Point2::origin().translate(Vector2::new(20.0, 0.0)));
    }
}
