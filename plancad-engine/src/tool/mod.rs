//! 交互命令（工具）的生命周期。
//!
//! 同一时间只有一个工具处于活动状态：`Idle → Active → Finished | Cancelled → Idle`。
//! 工具在只读文档上推进自己的步骤状态，终止时返回一个 [`Edit`]；管理器恰好应用一次，
//! 随后提交一个撤销点。启动新工具会先取消当前工具。

pub mod blocks;
pub mod input;
pub mod modify;
pub mod prompt;
pub mod solids;

use std::collections::{BTreeMap, HashMap};

use plancad_config::EditorConfig;
use plancad_core::csg::BooleanEngine;
use plancad_core::document::{Document, DocumentError, ObjectId};
use plancad_core::entity::Entity;
use plancad_core::geometry::{Point2, Transform2, Vector2};
use thiserror::Error;
use tracing::debug;

use crate::scene::Scene;
use input::{InputKind, InputRouter, Key, Subscription, parse_object_id};
use prompt::PromptChannel;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("未知命令: {0}")]
    UnknownCommand(String),
    #[error("布尔运算引擎 `{0}` 不可用，无法执行切除")]
    EngineUnavailable(&'static str),
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// 工具终止时产生的文档修改。
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Create(Vec<Entity>),
    /// 依次对对象施加各步变换。
    Transform {
        ids: Vec<ObjectId>,
        steps: Vec<Transform2>,
    },
    /// 深拷贝对象后变换副本。
    Copy {
        ids: Vec<ObjectId>,
        steps: Vec<Transform2>,
    },
    Delete(Vec<ObjectId>),
    DefineBlock {
        name: String,
        base_point: Point2,
        ids: Vec<ObjectId>,
    },
    InsertBlock {
        name: String,
        insert: Point2,
        scale: Vector2,
        rotation: f64,
    },
}

impl Edit {
    /// 应用到文档，返回新建对象的 ID。
    pub fn apply(self, document: &mut Document) -> Result<Vec<ObjectId>, DocumentError> {
        match self {
            Edit::Create(entities) => Ok(entities
                .into_iter()
                .map(|entity| document.add_entity(entity))
                .collect()),
            Edit::Transform { ids, steps } => {
                for id in &ids {
                    if !document.contains_id(*id) {
                        return Err(DocumentError::UnknownObject(*id));
                    }
                }
                for step in steps {
                    document.transform(&ids, step);
                }
                Ok(Vec::new())
            }
            Edit::Copy { ids, steps } => {
                for id in &ids {
                    if !document.contains_id(*id) {
                        return Err(DocumentError::UnknownObject(*id));
                    }
                }
                let copies = document.duplicate_many(&ids);
                for step in steps {
                    document.transform(&copies, step);
                }
                Ok(copies)
            }
            Edit::Delete(ids) => {
                for id in ids {
                    document.remove(id);
                }
                Ok(Vec::new())
            }
            Edit::DefineBlock {
                name,
                base_point,
                ids,
            } => {
                document.define_block(name, base_point, &ids)?;
                Ok(Vec::new())
            }
            Edit::InsertBlock {
                name,
                insert,
                scale,
                rotation,
            } => Ok(vec![document.insert_block(&name, insert, scale, rotation)?]),
        }
    }
}

/// 工具处理一次输入后的结果。
#[derive(Debug, Clone, PartialEq)]
pub enum ToolStep {
    Continue,
    /// 输入无效，保持当前步骤。
    Reject(String),
    Commit(Edit),
    /// 结束且不修改文档，可附带结果消息。
    Done(Option<String>),
    /// 前置条件不满足，命令自行终止。
    Abort(String),
}

/// 工具可见的只读运行环境。
pub struct ToolContext<'a> {
    pub document: &'a Document,
    pub engine: &'a dyn BooleanEngine,
    pub config: &'a EditorConfig,
}

impl<'a> ToolContext<'a> {
    pub fn new(scene: &'a Scene) -> Self {
        Self {
            document: scene.document(),
            engine: scene.engine(),
            config: scene.config(),
        }
    }

    pub fn pick(&self, point: Point2) -> Option<ObjectId> {
        self.document.pick(point, self.config.pick_tolerance)
    }

    /// 按文本 ID 查找文档中的对象。
    pub fn resolve_id(&self, text: &str) -> Option<ObjectId> {
        parse_object_id(text)
            .map(ObjectId::new)
            .filter(|id| self.document.contains_id(*id))
    }

    pub fn kind(&self, id: ObjectId) -> &'static str {
        self.document
            .find(id)
            .map_or("missing", |object| object.entity.record_tag())
    }

    /// 对象作为封闭轮廓时的边界。
    pub fn profile_ring(&self, id: ObjectId) -> Option<Vec<Point2>> {
        self.document
            .find(id)?
            .entity
            .as_primitive()?
            .profile_ring(self.document.options().curve_segments)
    }

    pub fn path_points(&self, id: ObjectId) -> Option<Vec<Point2>> {
        self.document
            .find(id)?
            .entity
            .as_primitive()?
            .path_points(self.document.options().curve_segments)
    }

    /// 可作为切除操作数：派生实体或封闭图元。
    pub fn is_solid_operand(&self, id: ObjectId) -> bool {
        self.document
            .find(id)
            .is_some_and(|object| object.entity.is_derived())
            || self.profile_ring(id).is_some()
    }
}

/// 所有交互工具的接口。
pub trait Tool {
    fn name(&self) -> &'static str;

    /// 激活时调用一次，`preselected` 为当前选中集。
    fn start(&mut self, ctx: &ToolContext<'_>, preselected: &[ObjectId]) -> ToolStep;

    fn on_pointer(&mut self, _ctx: &ToolContext<'_>, _point: Point2) -> ToolStep {
        ToolStep::Reject("当前步骤需要键盘输入".to_string())
    }

    fn on_text(&mut self, ctx: &ToolContext<'_>, text: &str) -> ToolStep;

    /// 空输入或回车。
    fn on_enter(&mut self, _ctx: &ToolContext<'_>) -> ToolStep {
        ToolStep::Reject("需要输入".to_string())
    }

    /// 外部要求结束命令时调用，默认等同回车。
    fn on_finish(&mut self, ctx: &ToolContext<'_>) -> ToolStep {
        self.on_enter(ctx)
    }

    /// 当前步骤的提示文字。
    fn prompt(&self) -> String;

    fn interests(&self) -> &'static [InputKind] {
        &[InputKind::Pointer, InputKind::Text, InputKind::Key]
    }
}

pub type ToolFactory = fn(&ToolContext<'_>) -> Result<Box<dyn Tool>, ToolError>;

/// 命令名、别名到工具构造函数的映射。
#[derive(Default)]
pub struct ToolRegistry {
    factories: BTreeMap<&'static str, ToolFactory>,
    aliases: HashMap<String, &'static str>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册全部内置工具。
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        solids::register(&mut registry);
        modify::register(&mut registry);
        blocks::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &'static str, aliases: &[&str], factory: ToolFactory) {
        self.factories.insert(name, factory);
        for alias in aliases {
            self.aliases.insert(alias.to_lowercase(), name);
        }
    }

    /// 解析命令名或别名（不区分大小写）。
    pub fn resolve(&self, input: &str) -> Option<(&'static str, ToolFactory)> {
        let key = input.trim().to_lowercase();
        let name = match self.factories.get_key_value(key.as_str()) {
            Some((name, _)) => *name,
            None => *self.aliases.get(&key)?,
        };
        self.factories.get(name).map(|factory| (name, *factory))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Idle,
    Active(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Finished,
    Cancelled,
}

struct ActiveTool {
    name: &'static str,
    tool: Box<dyn Tool>,
    _subscriptions: Vec<Subscription>,
}

/// 驱动当前工具并把其终止修改提交到场景。
pub struct ToolManager {
    registry: ToolRegistry,
    active: Option<ActiveTool>,
    router: InputRouter,
    prompt: PromptChannel,
    last_outcome: Option<Outcome>,
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolManager {
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::with_defaults())
    }

    pub fn with_registry(registry: ToolRegistry) -> Self {
        Self {
            registry,
            active: None,
            router: InputRouter::new(),
            prompt: PromptChannel::new(),
            last_outcome: None,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn state(&self) -> ToolState {
        match &self.active {
            Some(active) => ToolState::Active(active.name),
            None => ToolState::Idle,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn last_outcome(&self) -> Option<Outcome> {
        self.last_outcome
    }

    pub fn prompt(&self) -> &PromptChannel {
        &self.prompt
    }

    pub fn prompt_mut(&mut self) -> &mut PromptChannel {
        &mut self.prompt
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    /// 按名称或别名启动工具，先取消当前工具。
    pub fn start_by_name(
        &mut self,
        scene: &mut Scene,
        name: &str,
        preselected: &[ObjectId],
    ) -> Result<(), ToolError> {
        let Some((canonical, factory)) = self.registry.resolve(name) else {
            let err = ToolError::UnknownCommand(name.trim().to_string());
            self.prompt.alert(err.to_string());
            return Err(err);
        };
        self.cancel();

        let ctx = ToolContext::new(scene);
        let mut tool = match factory(&ctx) {
            Ok(tool) => tool,
            Err(err) => {
                self.prompt.alert(err.to_string());
                self.last_outcome = Some(Outcome::Cancelled);
                return Err(err);
            }
        };
        debug!(command = canonical, preselected = preselected.len(), "command started");
        let step = tool.start(&ctx, preselected);
        let subscriptions = tool
            .interests()
            .iter()
            .map(|kind| self.router.subscribe(*kind))
            .collect();
        self.active = Some(ActiveTool {
            name: canonical,
            tool,
            _subscriptions: subscriptions,
        });
        self.advance(scene, step)
    }

    /// 取消当前工具。没有活动工具时返回 `false`。
    pub fn cancel(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        debug!(command = active.name, "command cancelled");
        drop(active);
        self.prompt.info("*取消*");
        self.end(Outcome::Cancelled);
        true
    }

    /// 请求当前工具以现有输入结束；工具无法完成时直接结束且不修改文档。
    pub fn finish(&mut self, scene: &mut Scene) -> Result<(), ToolError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(());
        };
        let step = active.tool.on_finish(&ToolContext::new(scene));
        let result = self.advance(scene, step);
        if self.active.take().is_some() {
            self.end(Outcome::Finished);
        }
        result
    }

    /// 命令行输入。空闲时作为命令名启动工具，否则交给当前工具。
    pub fn handle_text_input(&mut self, scene: &mut Scene, text: &str) -> Result<(), ToolError> {
        let text = text.trim();
        let Some(active) = self.active.as_mut() else {
            if text.is_empty() {
                return Ok(());
            }
            let preselected = scene.selected_ids();
            return self.start_by_name(scene, text, &preselected);
        };
        if !self.router.is_listening(InputKind::Text) {
            return Ok(());
        }
        let ctx = ToolContext::new(scene);
        let step = if text.is_empty() {
            active.tool.on_enter(&ctx)
        } else {
            active.tool.on_text(&ctx, text)
        };
        self.advance(scene, step)
    }

    /// 指针点击。空闲时切换拾取对象的选中状态。
    pub fn handle_pointer(&mut self, scene: &mut Scene, point: Point2) -> Result<(), ToolError> {
        let Some(active) = self.active.as_mut() else {
            if let Some(id) = scene.document().pick(point, scene.config().pick_tolerance) {
                if scene.toggle_selection(id).is_err() {
                    debug!(id = id.get(), "picked object vanished");
                }
            }
            return Ok(());
        };
        if !self.router.is_listening(InputKind::Pointer) {
            return Ok(());
        }
        let step = active.tool.on_pointer(&ToolContext::new(scene), point);
        self.advance(scene, step)
    }

    pub fn handle_key(&mut self, scene: &mut Scene, key: Key) -> Result<(), ToolError> {
        match key {
            Key::Escape => {
                self.cancel();
                Ok(())
            }
            Key::Enter => {
                let Some(active) = self.active.as_mut() else {
                    return Ok(());
                };
                if !self.router.is_listening(InputKind::Key) {
                    return Ok(());
                }
                let step = active.tool.on_enter(&ToolContext::new(scene));
                self.advance(scene, step)
            }
        }
    }

    fn advance(&mut self, scene: &mut Scene, step: ToolStep) -> Result<(), ToolError> {
        match step {
            ToolStep::Continue => {
                self.show_step_prompt();
                Ok(())
            }
            ToolStep::Reject(message) => {
                self.prompt.warn(message);
                self.show_step_prompt();
                Ok(())
            }
            ToolStep::Commit(edit) => {
                let Some(active) = self.active.take() else {
                    return Ok(());
                };
                let label = active.name;
                drop(active);

                let before = scene.document().snapshot();
                match edit.apply(scene.document_mut()) {
                    Ok(created) => {
                        scene.commit(label, before);
                        if created.is_empty() {
                            scene.prune_selection();
                        } else {
                            scene.set_selection(&created);
                        }
                        debug!(command = label, created = created.len(), "command committed");
                        self.prompt.info(format!("{label} 完成"));
                        self.end(Outcome::Finished);
                        Ok(())
                    }
                    Err(err) => {
                        scene.document_mut().restore(before);
                        self.prompt.alert(err.to_string());
                        self.end(Outcome::Cancelled);
                        Err(err.into())
                    }
                }
            }
            ToolStep::Done(message) => {
                if let Some(message) = message {
                    self.prompt.info(message);
                }
                self.active = None;
                self.end(Outcome::Finished);
                Ok(())
            }
            ToolStep::Abort(message) => {
                self.prompt.warn(message.clone());
                self.active = None;
                self.end(Outcome::Finished);
                Err(ToolError::Precondition(message))
            }
        }
    }

    fn show_step_prompt(&mut self) {
        if let Some(active) = &self.active {
            let text = active.tool.prompt();
            self.prompt.show_prompt(text);
        }
    }

    fn end(&mut self, outcome: Outcome) {
        self.active = None;
        self.prompt.clear_prompt();
        self.last_outcome = Some(outcome);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use plancad_core::csg::NullBooleanEngine;
    use plancad_core::derived::Extrude;

    use super::*;
    use crate::tool::prompt::PromptLevel;

    fn scene_with_square() -> (Scene, ObjectId) {
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
        (scene, square)
    }

    #[test]
    fn aliases_resolve_case_insensitively() {
        let registry = ToolRegistry::with_defaults();
        for (alias, name) in [
            ("EXT", "extrude"),
            ("rev", "revolve"),
            ("M", "move"),
            ("ro", "rotate"),
            ("sc", "scale"),
            ("mi", "mirror"),
            ("o", "offset"),
            ("e", "erase"),
            ("Dist", "dist"),
        ] {
            assert_eq!(registry.resolve(alias).map(|(n, _)| n), Some(name), "{alias}");
        }
        assert!(registry.resolve("mate").is_none());
    }

    #[test]
    fn extrude_commits_once_with_one_checkpoint() {
        let (mut scene, square) = scene_with_square();
        let mut manager = ToolManager::new();

        manager
            .start_by_name(&mut scene, "ext", &[square])
            .expect("start");
        assert_eq!(manager.state(), ToolState::Active("extrude"));
        manager
            .handle_text_input(&mut scene, "25")
            .expect("height");

        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(manager.last_outcome(), Some(Outcome::Finished));
        assert_eq!(scene.history().labels().collect::<Vec<_>>(), vec!["extrude"]);
        let created = scene.selected_ids();
        assert_eq!(created.len(), 1);
        assert_eq!(
            scene.document().find(created[0]).map(|o| &o.entity),
            Some(&Entity::Extrude(Extrude {
                source: square,
                height: 25.0,
                bevel: Default::default(),
            }))
        );
        assert_eq!(manager.router().listener_count(), 0);
    }

    #[test]
    fn invalid_target_is_reported_and_step_retained() {
        let (mut scene, _) = scene_with_square();
        let text = scene
            .document_mut()
            .add_text(Point2::new(50.0, 50.0), "101", 5.0);
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "extrude", &[]).expect("start");

        manager
            .handle_text_input(&mut scene, &text.get().to_string())
            .expect("rejected input is not an error");
        assert!(manager.is_active());
        assert!(
            manager
                .prompt()
                .messages()
                .iter()
                .any(|m| m.level == PromptLevel::Warning)
        );
        assert_eq!(manager.prompt().current(), Some("选择要拉伸的封闭轮廓:"));
    }

    #[test]
    fn invalid_preselection_finishes_without_side_effects() {
        let (mut scene, _) = scene_with_square();
        let line = scene
            .document_mut()
            .add_polyline([Point2::new(0.0, 0.0), Point2::new(5.0, 5.0)], false);
        let before = scene.document().snapshot();
        let mut manager = ToolManager::new();

        let err = manager
            .start_by_name(&mut scene, "extrude", &[line])
            .expect_err("open polyline is not a profile");
        assert!(matches!(err, ToolError::Precondition(_)));
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(manager.last_outcome(), Some(Outcome::Finished));
        assert_eq!(scene.document().snapshot(), before);
        assert!(!scene.history().can_undo());
    }

    #[test]
    fn cut_without_engine_leaves_no_active_command() {
        let mut scene = Scene::with_config(EditorConfig::default(), Arc::new(NullBooleanEngine));
        let mut manager = ToolManager::new();
        let err = manager
            .start_by_name(&mut scene, "cut", &[])
            .expect_err("engine unavailable");
        assert!(matches!(err, ToolError::EngineUnavailable("null")));
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(
            manager.prompt().last().map(|m| m.level),
            Some(PromptLevel::Alert)
        );
        assert_eq!(manager.router().listener_count(), 0);
    }

    #[test]
    fn cancelled_command_leaves_no_listeners() {
        let (mut scene, _) = scene_with_square();
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "move", &[]).expect("start");
        assert!(manager.router().listener_count() > 0);

        manager.handle_key(&mut scene, Key::Escape).expect("escape");
        assert_eq!(manager.router().listener_count(), 0);
        assert_eq!(manager.last_outcome(), Some(Outcome::Cancelled));
        assert!(!manager.cancel());
        assert!(manager.finish(&mut scene).is_ok());
        assert_eq!(manager.last_outcome(), Some(Outcome::Cancelled));
    }

    #[test]
    fn starting_another_command_cancels_the_active_one() {
        let (mut scene, square) = scene_with_square();
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "extrude", &[]).expect("start");
        manager.start_by_name(&mut scene, "dist", &[square]).expect("start");
        assert_eq!(manager.state(), ToolState::Active("dist"));
        assert_eq!(manager.router().listener_count(), 3);
    }

    #[test]
    fn unknown_command_is_alerted() {
        let mut scene = Scene::new();
        let mut manager = ToolManager::new();
        let err = manager
            .handle_text_input(&mut scene, "frobnicate")
            .expect_err("unknown");
        assert!(matches!(err, ToolError::UnknownCommand(name) if name == "frobnicate"));
        assert!(!manager.is_active());
    }

    #[test]
    fn finish_accepts_defaults() {
        let (mut scene, square) = scene_with_square();
        let mut manager = ToolManager::new();
        manager.start_by_name(&mut scene, "extrude", &[square]).expect("start");
        manager.finish(&mut scene).expect("finish");
        assert_eq!(manager.state(), ToolState::Idle);
        assert_eq!(scene.document().len(), 2);
        assert!(manager.finish(&mut scene).is_ok());
    }

    #[test]
    fn idle_pointer_toggles_selection() {
        let (mut scene, square) = scene_with_square();
        let mut manager = ToolManager::new();
        manager
            .handle_pointer(&mut scene, Point2::new(10.0, 5.0))
            .expect("pick");
        assert!(scene.is_selected(square));
        manager
            .handle_pointer(&mut scene, Point2::new(10.0, 5.0))
            .expect("pick");
        assert!(!scene.is_selected(square));
    }

    #[test]
    fn failed_edit_restores_document() {
        let (mut scene, square) = scene_with_square();
        let edit = Edit::Transform {
            ids: vec![square, ObjectId::new(999)],
            steps: vec![Transform2::Translate(Vector2::new(1.0, 0.0))],
        };
        let err = edit.apply(scene.document_mut()).expect_err("unknown id");
        assert!(matches!(err, DocumentError::UnknownObject(_)));
        assert_eq!(
            scene.document().bounding_box(square).map(|b| b.min()),
            Some(Point2::new(0.0, 0.0))
        );
    }
}
