//! 块定义与块插入命令。

use plancad_core::document::ObjectId;
use plancad_core::geometry::{Point2, Vector2};

use super::input::parse_point;
use super::{Edit, Tool, ToolContext, ToolRegistry, ToolStep};

pub(crate) fn register(registry: &mut ToolRegistry) {
    registry.register("block", &["b"], |_| Ok(Box::new(BlockTool::default())));
    registry.register("insert", &["i"], |_| Ok(Box::new(InsertTool::default())));
}

fn check_member(ctx: &ToolContext<'_>, id: ObjectId) -> Result<(), String> {
    match ctx.document.find(id) {
        Some(object) if object.entity.is_primitive() => Ok(()),
        Some(object) => Err(format!(
            "对象 #{} ({}) 不能放入块",
            id.get(),
            object.entity.record_tag()
        )),
        None => Err(format!("找不到对象 #{}", id.get())),
    }
}

/// 名称 → 基点 → 成员（未预选时逐个选择，回车结束）。
#[derive(Debug, Default)]
pub struct BlockTool {
    name: Option<String>,
    base_point: Option<Point2>,
    members: Vec<ObjectId>,
}

impl BlockTool {
    fn add_member(&mut self, ctx: &ToolContext<'_>, id: ObjectId) -> ToolStep {
        if self.members.contains(&id) {
            return ToolStep::Reject(format!("对象 #{} 已选择", id.get()));
        }
        if let Err(message) = check_member(ctx, id) {
            return ToolStep::Reject(message);
        }
        self.members.push(id);
        ToolStep::Continue
    }

    fn set_base(&mut self, point: Point2) -> ToolStep {
        self.base_point = Some(point);
        if self.members.is_empty() {
            ToolStep::Continue
        } else {
            self.commit()
        }
    }

    fn commit(&self) -> ToolStep {
        let (Some(name), Some(base_point)) = (self.name.clone(), self.base_point) else {
            return ToolStep::Reject("块名或基点未指定".to_string());
        };
        ToolStep::Commit(Edit::DefineBlock {
            name,
            base_point,
            ids: self.members.clone(),
        })
    }
}

impl Tool for BlockTool {
    fn name(&self) -> &'static str {
        "block"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep {
        for &id in preselected {
            if let ToolStep::Reject(message) = self.add_member(ctx, id) {
                return ToolStep::Abort(message);
            }
        }
        ToolStep::Continue
    }

    fn on_pointer(&mut self, ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        if self.name.is_none() {
            return ToolStep::Reject("请先输入块名".to_string());
        }
        if self.base_point.is_none() {
            return self.set_base(point);
        }
        match ctx.pick(point) {
            Some(id) => self.add_member(ctx, id),
            None => ToolStep::Reject("未选中对象".to_string()),
        }
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        if self.name.is_none() {
            if ctx.document.block(text).is_some() {
                return ToolStep::Reject(format!("块 `{text}` 已存在"));
            }
            self.name = Some(text.to_string());
            return ToolStep::Continue;
        }
        if self.base_point.is_none() {
            return match parse_point(text, None) {
                Some(point) => self.set_base(point),
                None => ToolStep::Reject(format!("无法识别的坐标 `{text}`")),
            };
        }
        match ctx.resolve_id(text) {
            Some(id) => self.add_member(ctx, id),
            None => ToolStep::Reject(format!("找不到对象 `{text}`")),
        }
    }

    fn on_enter(&mut self, _ctx: &ToolContext<'_>) -> ToolStep {
        if self.base_point.is_some() && !self.members.is_empty() {
            self.commit()
        } else {
            ToolStep::Reject("块需要名称、基点和至少一个对象".to_string())
        }
    }

    fn prompt(&self) -> String {
        if self.name.is_none() {
            "输入块名:".to_string()
        } else if self.base_point.is_none() {
            "指定基点:".to_string()
        } else {
            format!("选择块成员（已选 {}，回车结束）:", self.members.len())
        }
    }
}

/// 块名 → 插入点，按单位比例和零旋转插入。
#[derive(Debug, Default)]
pub struct InsertTool {
    name: Option<String>,
}

impl InsertTool {
    fn commit(&self, insert: Point2) -> ToolStep {
        match &self.name {
            Some(name) => ToolStep::Commit(Edit::InsertBlock {
                name: name.clone(),
                insert,
                scale: Vector2::new(1.0, 1.0),
                rotation: 0.0,
            }),
            None => ToolStep::Reject("请先输入块名".to_string()),
        }
    }
}

impl Tool for InsertTool {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn start(&mut self, ctx: &ToolContext<'_>, _preselected: &[ObjectId]) -> ToolStep {
        if ctx.document.blocks().next().is_none() {
            return ToolStep::Abort("文档中没有块定义".to_string());
        }
        ToolStep::Continue
    }

    fn on_pointer(&mut self, _ctx: &ToolContext<'_>, point: Point2) -> ToolStep {
        self.commit(point)
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep {
        if self.name.is_none() {
            if ctx.document.block(text).is_none() {
                return ToolStep::Reject(format!("未定义的块 `{text}`"));
            }
            self.name = Some(text.to_string());
            return ToolStep::Continue;
        }
        match parse_point(text, None) {
            Some(point) => self.commit(point),
            None => ToolStep::Reject(format!("无法识别的坐标 `{text}`")),
        }
    }

    fn prompt(&self) -> String {
        match &self.name {
            None => "输入块名:".to_string(),
            Some(_) => "指定插入点:".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use plancad_core::entity::Entity;

    use super::*;
    use crate::scene::Scene;
    use crate::tool::{ToolError, ToolManager, ToolState};

    fn input(manager: &mut ToolManager, scene: &mut Scene, lines: &[&str]) {
        for line in lines {
            manager.handle_text_input(scene, line).expect("input");
        }
    }

    #[test]
    fn define_then_insert_block() {
        let mut scene = Scene::new();
        let a = scene
            .document_mut()
            .add_wall(Point2::new(40.0, 50.0), Point2::new(80.0, 50.0), 4.0);
        let b = scene
            .document_mut()
            .add_wall(Point2::new(50.0, 40.0), Point2::new(50.0, 90.0), 4.0);
        let c = scene.document_mut().add_circle(Point2::new(65.0, 70.0), 6.0);
        let mut original = scene.document().bounding_box(a).expect("bounds");
        for id in [b, c] {
            original.include_bounds(&scene.document().bounding_box(id).expect("bounds"));
        }

        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "block", &[a, b, c]).unwrap();
        input(&mut manager, &mut scene, &["corner", "50,50"]);
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(
            scene.document().block("corner").map(|d| d.objects.len()),
            Some(3)
        );

        manager.start_by_name(&mut scene, "insert", &[]).unwrap();
        input(&mut manager, &mut scene, &["missing", "corner"]);
        manager
            .handle_pointer(&mut scene, Point2::new(200.0, 200.0))
            .unwrap();
        let reference = scene.selected_ids()[0];
        assert!(matches!(
            scene.document().find(reference).map(|o| &o.entity),
            Some(Entity::BlockReference(r)) if r.rotation == 0.0
        ));
        assert_eq!(
            scene.document().center(reference),
            Some(Point2::new(200.0, 200.0))
        );
        let placed = scene.document().bounding_box(reference).expect("bounds");
        let expected = original.translated(Vector2::new(150.0, 150.0));
        assert!(placed.min().approx_eq(expected.min(), 1e-9));
        assert!(placed.max().approx_eq(expected.max(), 1e-9));
        assert_eq!(
            scene.history().labels().collect::<Vec<_>>(),
            vec!["block", "insert"]
        );
    }

    #[test]
    fn block_members_can_be_picked_after_base_point() {
        let mut scene = Scene::new();
        scene.document_mut().add_circle(Point2::new(0.0, 0.0), 5.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "block", &[]).unwrap();
        input(&mut manager, &mut scene, &["column", "0,0"]);
        manager
            .handle_pointer(&mut scene, Point2::new(5.0, 0.0))
            .unwrap();
        input(&mut manager, &mut scene, &[""]);
        assert!(scene.document().block("column").is_some());
    }

    #[test]
    fn duplicate_block_name_is_rejected() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 5.0);
        scene
            .document_mut()
            .define_block("column", Point2::origin(), &[circle])
            .unwrap();
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "block", &[circle]).unwrap();
        input(&mut manager, &mut scene, &["column"]);
        assert!(manager.is_active());
        assert_eq!(manager.prompt().current(), Some("输入块名:"));
    }

    #[test]
    fn insert_without_blocks_aborts() {
        let mut scene = Scene::new();
        let mut manager = ToolManager::new();
        let err = manager
            .start_by_name(&mut scene, "insert", &[])
            .expect_err("no blocks");
        assert!(matches!(err, ToolError::Precondition(_)));
    }

    #[test]
    fn derived_members_abort_block_command() {
        let mut scene = Scene::new();
        let circle = scene.document_mut().add_circle(Point2::new(0.0, 0.0), 5.0);
        let solid = scene
            .document_mut()
            .add_entity(Entity::Extrude(plancad_core::derived::Extrude {
                source: circle,
                height: 2.0,
                bevel: Default::default(),
            }));
        let mut manager = ToolManager::new();
        assert!(manager.start_by_name(&mut scene, "block", &[solid]).is_err());
        assert!(!manager.is_active());
    }
}
