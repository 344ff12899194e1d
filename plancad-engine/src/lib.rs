pub mod command;
pub mod history;
pub mod session;
pub mod tool;

pub mod errors {
    use plancad_core::DocumentError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("object with id {0} not found")]
        ObjectNotFound(u64),
        #[error("nothing to undo")]
        NothingToUndo,
        #[error("nothing to redo")]
        NothingToRedo,
        #[error(transparent)]
        Document(#[from] DocumentError),
    }
}

pub mod scene {
    use std::collections::HashSet;
    use std::fmt;
    use std::sync::Arc;

    use plancad_config::EditorConfig;
    use plancad_core::csg::{BooleanEngine, ManifoldEngine};
    use plancad_core::derived::BuildOptions;
    use plancad_core::document::{Document, DocumentSnapshot, ObjectId};
    use plancad_core::entity::{Door, DoorSwing, Entity, Symbol};
    use plancad_core::geometry::{Bounds2D, Point2, Vector2};
    use plancad_core::mesh::Mesh;
    use tracing::debug;

    use crate::errors::EngineError;
    use crate::history::History;

    const DEFAULT_ZOOM: f64 = 1.0;
    const MIN_ZOOM: f64 = 0.01;
    const MAX_ZOOM: f64 = 1_000.0;

    /// 记录视口状态（中心点与缩放）。
    #[derive(Debug, Clone, Copy)]
    pub struct ViewportState {
        pub center: Point2,
        pub zoom: f64,
    }

    impl ViewportState {
        #[inline]
        fn clamp_zoom(value: f64) -> f64 {
            value.clamp(MIN_ZOOM, MAX_ZOOM)
        }
    }

    impl Default for ViewportState {
        fn default() -> Self {
            Self {
                center: Point2::new(0.0, 0.0),
                zoom: DEFAULT_ZOOM,
            }
        }
    }

    /// 由编辑器配置得到网格构建参数。
    pub fn build_options(config: &EditorConfig) -> BuildOptions {
        BuildOptions {
            curve_segments: config.curve_segments,
            fillet_segments: config.fillet_segments,
            loft_samples: config.loft_samples,
            loft_spacing: config.loft_spacing,
            placeholder_size: config.placeholder_size,
            default_extrude_height: config.default_extrude_height,
        }
    }

    /// 引擎层负责维护 `Document` 和运行时状态（选中集、视口、撤销历史）。
    pub struct Scene {
        document: Document,
        selected: HashSet<ObjectId>,
        viewport: ViewportState,
        history: History,
        engine: Arc<dyn BooleanEngine>,
        config: EditorConfig,
    }

    /// 演示平面图中的关键对象。
    #[derive(Debug, Clone, Copy)]
    pub struct DemoObjects {
        pub walls: [ObjectId; 4],
        pub door: ObjectId,
        pub room: ObjectId,
        pub column: ObjectId,
        pub exit_sign: ObjectId,
        pub label: ObjectId,
    }

    impl Scene {
        pub fn new() -> Self {
            Self::with_config(EditorConfig::default(), Arc::new(ManifoldEngine))
        }

        pub fn with_config(config: EditorConfig, engine: Arc<dyn BooleanEngine>) -> Self {
            Self {
                document: Document::with_options(build_options(&config)),
                selected: HashSet::new(),
                viewport: ViewportState::default(),
                history: History::new(config.history_limit),
                engine,
                config,
            }
        }

        /// 新建文档：清空对象、计数器、选中集与撤销历史。
        pub fn reset(&mut self) {
            self.document = Document::with_options(build_options(&self.config));
            self.selected.clear();
            self.viewport = ViewportState::default();
            self.history.clear();
        }

        /// 替换当前文档并重置运行时状态。
        pub fn load_document(&mut self, mut document: Document) {
            document.set_options(build_options(&self.config));
            self.document = document;
            self.selected.clear();
            self.viewport = ViewportState::default();
            self.history.clear();

            if let Some(bounds) = self.document.bounds() {
                self.viewport.center = bounds.center();
            }
        }

        #[inline]
        pub fn config(&self) -> &EditorConfig {
            &self.config
        }

        #[inline]
        pub fn engine(&self) -> &dyn BooleanEngine {
            self.engine.as_ref()
        }

        #[inline]
        pub fn history(&self) -> &History {
            &self.history
        }

        /// 返回当前选中对象数量。
        #[inline]
        pub fn selection_len(&self) -> usize {
            self.selected.len()
        }

        #[inline]
        pub fn is_selected(&self, id: ObjectId) -> bool {
            self.selected.contains(&id)
        }

        /// 选中指定对象。若对象不存在则返回错误。
        pub fn select(&mut self, id: ObjectId) -> Result<(), EngineError> {
            if !self.document.contains_id(id) {
                return Err(EngineError::ObjectNotFound(id.get()));
            }
            self.selected.insert(id);
            Ok(())
        }

        /// 取消选中指定对象，返回之前是否处于选中状态。
        pub fn deselect(&mut self, id: ObjectId) -> bool {
            self.selected.remove(&id)
        }

        /// 切换对象选中状态，返回切换后的状态。
        pub fn toggle_selection(&mut self, id: ObjectId) -> Result<bool, EngineError> {
            if !self.document.contains_id(id) {
                return Err(EngineError::ObjectNotFound(id.get()));
            }
            if !self.selected.insert(id) {
                self.selected.remove(&id);
                Ok(false)
            } else {
                Ok(true)
            }
        }

        /// 用给定对象替换选中集，不存在的 ID 被忽略。
        pub fn set_selection(&mut self, ids: &[ObjectId]) {
            self.selected = ids
                .iter()
                .copied()
                .filter(|id| self.document.contains_id(*id))
                .collect();
        }

        #[inline]
        pub fn clear_selection(&mut self) {
            self.selected.clear();
        }

        /// 按 ID 升序返回选中对象。
        pub fn selected_ids(&self) -> Vec<ObjectId> {
            let mut ids: Vec<_> = self.selected.iter().copied().collect();
            ids.sort();
            ids
        }

        /// 返回当前选中对象的包围盒。
        pub fn selection_bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for id in &self.selected {
                if let Some(object_bounds) = self.document.bounding_box(*id) {
                    bounds.include_bounds(&object_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        #[inline]
        pub fn viewport(&self) -> ViewportState {
            self.viewport
        }

        #[inline]
        pub fn reset_viewport(&mut self) {
            self.viewport = ViewportState::default();
        }

        #[inline]
        pub fn set_viewport_center(&mut self, center: Point2) {
            self.viewport.center = center;
        }

        pub fn pan_viewport(&mut self, delta: Vector2) {
            self.viewport.center = self.viewport.center.translate(delta);
        }

        /// 设置缩放倍数（自动限制在合法范围内）。
        pub fn set_viewport_zoom(&mut self, zoom: f64) {
            self.viewport.zoom = ViewportState::clamp_zoom(zoom);
        }

        pub fn scale_viewport_zoom(&mut self, factor: f64) {
            let current = self.viewport.zoom;
            let target = if factor.is_finite() {
                current * factor
            } else {
                current
            };
            self.set_viewport_zoom(target);
        }

        /// 聚焦当前选中对象，若为空则退化到整个文档范围。
        pub fn focus_on_selection(&mut self) {
            let target = self.selection_bounds().or_else(|| self.document.bounds());
            if let Some(bounds) = target {
                self.viewport.center = bounds.center();
            }
        }

        #[inline]
        pub fn document(&self) -> &Document {
            &self.document
        }

        /// 直接修改文档，不记录撤销点。交互修改应走 [`Scene::apply`]。
        #[inline]
        pub fn document_mut(&mut self) -> &mut Document {
            &mut self.document
        }

        /// 在一个命名撤销点内修改文档。
        pub fn apply<T>(&mut self, label: &str, edit: impl FnOnce(&mut Document) -> T) -> T {
            let before = self.document.snapshot();
            let result = edit(&mut self.document);
            self.commit(label, before);
            result
        }

        /// 以修改前的快照提交一个撤销点。
        pub fn commit(&mut self, label: &str, before: DocumentSnapshot) {
            self.history.record(label, before);
        }

        /// 撤销最近一次提交，返回其名称。
        pub fn undo(&mut self) -> Result<String, EngineError> {
            let label = self
                .history
                .undo(&mut self.document)
                .ok_or(EngineError::NothingToUndo)?;
            self.prune_selection();
            Ok(label)
        }

        pub fn redo(&mut self) -> Result<String, EngineError> {
            let label = self
                .history
                .redo(&mut self.document)
                .ok_or(EngineError::NothingToRedo)?;
            self.prune_selection();
            Ok(label)
        }

        /// 取得派生对象网格，必要时构建并缓存。
        pub fn mesh(&mut self, id: ObjectId) -> Option<Arc<Mesh>> {
            self.document.mesh(id, self.engine.as_ref())
        }

        /// 从选中集中去掉已不在文档中的对象。
        pub fn prune_selection(&mut self) {
            let document = &self.document;
            self.selected.retain(|id| document.contains_id(*id));
        }

        /// 填充一间带门、柱和疏散标志的房间，返回关键对象 ID。
        pub fn populate_demo(&mut self) -> DemoObjects {
            self.clear_selection();

            let corners = [
                Point2::new(0.0, 0.0),
                Point2::new(600.0, 0.0),
                Point2::new(600.0, 400.0),
                Point2::new(0.0, 400.0),
            ];
            let doc = &mut self.document;
            doc.ensure_layer("walls");
            doc.ensure_layer("evacuation");
            let walls = [0, 1, 2, 3].map(|i| {
                let start = corners[i];
                let end = corners[(i + 1) % 4];
                let id = doc.add_wall(start, end, 20.0);
                doc.set_layer(id, "walls");
                id
            });
            let door = doc.add_entity_on(
                Entity::Door(Door {
                    position: Point2::new(250.0, 0.0),
                    width: 90.0,
                    rotation: 0.0,
                    swing: DoorSwing::Left,
                }),
                "walls",
            );
            let room = doc.add_polyline(
                [
                    Point2::new(20.0, 20.0),
                    Point2::new(580.0, 20.0),
                    Point2::new(580.0, 380.0),
                    Point2::new(20.0, 380.0),
                ],
                true,
            );
            let column = doc.add_circle(Point2::new(300.0, 200.0), 25.0);
            let exit_sign = doc.add_entity_on(
                Entity::Symbol(Symbol {
                    kind: "exit".to_string(),
                    position: Point2::new(295.0, 40.0),
                    size: 30.0,
                    rotation: 0.0,
                }),
                "evacuation",
            );
            let label = doc.add_text(Point2::new(40.0, 350.0), "Кабинет 101", 25.0);

            let ids = DemoObjects {
                walls,
                door,
                room,
                column,
                exit_sign,
                label,
            };

            debug!(
                door = ids.door.get(),
                room = ids.room.get(),
                column = ids.column.get(),
                exit_sign = ids.exit_sign.get(),
                label = ids.label.get(),
                "已创建演示平面图"
            );

            ids
        }
    }

    impl Default for Scene {
        fn default() -> Self {
            Self::new()
        }
    }

    impl fmt::Debug for Scene {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Scene")
                .field("objects", &self.document.len())
                .field("selected", &self.selected.len())
                .field("viewport", &self.viewport)
                .field("engine", &self.engine.name())
                .finish_non_exhaustive()
        }
    }

}
