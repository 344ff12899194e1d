//! 文档注册表。
//!
//! 文档按插入顺序持有全部场景对象，是对象变更的唯一入口：任何平移、旋转、缩放、
//! 夹点编辑或参数修改都会沿依赖边让下游派生实体的网格缓存失效。

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::block::{BlockDefinition, BlockReference};
use crate::csg::BooleanEngine;
use crate::derived::{BuildCache, BuildJob, BuildOptions, BuildOutcome, MeshBuilder, SourceLookup};
use crate::draw::{Canvas, Style};
use crate::entity::{Circle, Entity, Polyline, SnapPoint, Text, Wall};
use crate::geometry::{Bounds2D, Point2, Transform2, Vector2};
use crate::mesh::Mesh;

/// 默认图层名。
pub const DEFAULT_LAYER: &str = "0";
/// 展开编组/派生链时的最大深度。
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 提供原始数值，便于序列化或日志输出。
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("对象 {0:?} 不存在")]
    UnknownObject(ObjectId),
    #[error("块 `{0}` 已存在")]
    DuplicateBlock(String),
    #[error("块 `{0}` 不存在")]
    UnknownBlock(String),
    #[error("块名 `{0}` 无效")]
    InvalidBlockName(String),
    #[error("块 `{0}` 没有任何对象")]
    EmptyBlock(String),
    #[error("对象 {id:?} ({kind}) 不能放入块定义")]
    UnsupportedBlockMember { id: ObjectId, kind: &'static str },
}

fn visible_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: u32,
    pub name: String,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
}

fn default_layer_name() -> String {
    DEFAULT_LAYER.to_string()
}

/// 注册表中的一个对象。`hidden` 表示被派生实体消费而在二维视图中隐藏。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default = "default_layer_name")]
    pub layer: String,
    #[serde(flatten)]
    pub entity: Entity,
}

impl SceneObject {
    pub fn new(id: ObjectId, entity: Entity) -> Self {
        Self {
            id,
            hidden: false,
            layer: default_layer_name(),
            entity,
        }
    }

    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }

    /// 二维包围盒。派生实体取第一个源，编组取成员并集；引用全部失效时返回 `None`。
    pub fn bounding_box(&self, document: &Document) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        for leaf in document.leaves(self) {
            match &leaf.entity {
                Entity::BlockReference(reference) => {
                    bounds.include_bounds(&reference.bounds(document.block(&reference.name)))
                }
                entity => {
                    if let Some(primitive) = entity.as_primitive() {
                        bounds.include_bounds(&primitive.bounds());
                    }
                }
            }
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    pub fn contains(&self, document: &Document, point: Point2, tolerance: f64) -> bool {
        document.leaves(self).into_iter().any(|leaf| match &leaf.entity {
            Entity::BlockReference(reference) => {
                reference.contains(document.block(&reference.name), point, tolerance)
            }
            entity => entity
                .as_primitive()
                .is_some_and(|primitive| primitive.contains(point, tolerance)),
        })
    }

    pub fn center(&self, document: &Document) -> Option<Point2> {
        match &self.entity {
            Entity::BlockReference(reference) => Some(reference.insert),
            Entity::Group(_) => self.bounding_box(document).map(|bounds| bounds.center()),
            entity => match entity.as_primitive() {
                Some(primitive) => Some(primitive.center()),
                None => document.fallback(self)?.center(document),
            },
        }
    }

    pub fn snap_points(&self, document: &Document) -> Vec<SnapPoint> {
        document
            .leaves(self)
            .into_iter()
            .flat_map(|leaf| match &leaf.entity {
                Entity::BlockReference(reference) => reference.snap_points(),
                entity => entity
                    .as_primitive()
                    .map(|primitive| primitive.snap_points())
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// 编辑夹点。编组没有夹点，派生实体使用第一个源的夹点。
    pub fn grips(&self, document: &Document) -> Vec<Point2> {
        match &self.entity {
            Entity::Group(_) => Vec::new(),
            Entity::BlockReference(reference) => vec![reference.insert],
            entity => match entity.as_primitive() {
                Some(primitive) => primitive.grips(),
                None => document
                    .fallback(self)
                    .map(|source| source.grips(document))
                    .unwrap_or_default(),
            },
        }
    }

    pub fn draw(&self, document: &Document, canvas: &mut dyn Canvas, style: Style) {
        let leaves = document.leaves(self);
        if leaves.is_empty() {
            debug!(id = self.id.get(), "nothing to draw, all references dangling");
        }
        for leaf in leaves {
            canvas.set_style(style);
            match &leaf.entity {
                Entity::BlockReference(reference) => {
                    reference.draw(document.block(&reference.name), canvas)
                }
                entity => {
                    if let Some(primitive) = entity.as_primitive() {
                        primitive.draw(canvas);
                    }
                }
            }
        }
    }
}

/// 用于撤销/重做的文档内容快照。缓存和依赖索引不在快照内，恢复时重建。
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    layers: BTreeMap<String, Layer>,
    objects: Vec<SceneObject>,
    next_object_id: u64,
    next_layer_id: u32,
    blocks: BTreeMap<String, BlockDefinition>,
}

impl DocumentSnapshot {
    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }
}

#[derive(Debug)]
pub struct Document {
    layers: BTreeMap<String, Layer>,
    objects: Vec<SceneObject>,
    index: HashMap<ObjectId, usize>,
    next_object_id: u64,
    next_layer_id: u32,
    blocks: BTreeMap<String, BlockDefinition>,
    /// 源对象 → 直接消费它的派生实体。源已删除的边也保留，便于恢复时失效。
    dependents: HashMap<ObjectId, BTreeSet<ObjectId>>,
    /// 编组成员 → 所属编组。
    owners: HashMap<ObjectId, ObjectId>,
    cache: BuildCache,
    options: BuildOptions,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    pub fn with_options(options: BuildOptions) -> Self {
        let mut doc = Self {
            layers: BTreeMap::new(),
            objects: Vec::new(),
            index: HashMap::new(),
            next_object_id: 1,
            next_layer_id: 0,
            blocks: BTreeMap::new(),
            dependents: HashMap::new(),
            owners: HashMap::new(),
            cache: BuildCache::default(),
            options,
        };
        doc.ensure_layer(DEFAULT_LAYER);
        doc
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// 替换构建参数，已有网格全部失效。
    pub fn set_options(&mut self, options: BuildOptions) {
        self.options = options;
        self.cache.clear();
    }

    // ---- 图层 ----

    pub fn ensure_layer(&mut self, name: impl AsRef<str>) -> u32 {
        let key = name.as_ref();
        if let Some(layer) = self.layers.get(key) {
            return layer.id;
        }
        let id = self.next_layer_id;
        self.next_layer_id += 1;
        self.layers.insert(
            key.to_string(),
            Layer {
                id,
                name: key.to_string(),
                is_visible: true,
            },
        );
        id
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn set_layer_visible(&mut self, name: &str, visible: bool) -> bool {
        match self.layers.get_mut(name) {
            Some(layer) => {
                layer.is_visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn next_layer_id(&self) -> u32 {
        self.next_layer_id
    }

    /// 加载时整体替换图层表；计数器不小于已有图层的最大 ID + 1。
    pub(crate) fn restore_layers(&mut self, layers: Vec<Layer>, next_layer_id: u32) {
        if layers.is_empty() {
            return;
        }
        let floor = layers.iter().map(|layer| layer.id + 1).max().unwrap_or(0);
        self.layers = layers
            .into_iter()
            .map(|layer| (layer.name.clone(), layer))
            .collect();
        self.next_layer_id = next_layer_id.max(floor);
        self.ensure_layer(DEFAULT_LAYER);
    }

    fn layer_visible(&self, name: &str) -> bool {
        self.layers.get(name).is_none_or(|layer| layer.is_visible)
    }

    // ---- 注册表 ----

    /// 分配新 ID。ID 严格递增，永不复用。
    pub fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_object_id;
        self.next_object_id += 1;
        ObjectId(id)
    }

    pub fn next_object_id(&self) -> u64 {
        self.next_object_id
    }

    /// 追加对象。ID 冲突时重新分配并记录警告；派生实体登记依赖边并隐藏被消费的源。
    pub fn add(&mut self, mut object: SceneObject) -> ObjectId {
        if self.index.contains_key(&object.id) {
            let fresh = self.allocate_id();
            warn!(
                requested = object.id.get(),
                assigned = fresh.get(),
                "duplicate object id, reallocating"
            );
            object.id = fresh;
        }
        self.next_object_id = self.next_object_id.max(object.id.get() + 1);
        self.ensure_layer(&object.layer);

        let id = object.id;
        self.index.insert(id, self.objects.len());
        self.objects.push(object);
        self.register(id, true);
        // 之前悬空引用此 ID 的派生实体需要重建
        self.invalidate_from(&[id]);
        debug!(id = id.get(), "object added");
        id
    }

    pub fn add_entity(&mut self, entity: Entity) -> ObjectId {
        let id = self.allocate_id();
        self.add(SceneObject::new(id, entity))
    }

    pub fn add_entity_on(&mut self, entity: Entity, layer: impl Into<String>) -> ObjectId {
        let id = self.allocate_id();
        self.add(SceneObject::new(id, entity).on_layer(layer))
    }

    pub fn add_wall(&mut self, start: Point2, end: Point2, thickness: f64) -> ObjectId {
        self.add_entity(Entity::Wall(Wall {
            start,
            end,
            thickness,
        }))
    }

    pub fn add_polyline<I>(&mut self, points: I, closed: bool) -> ObjectId
    where
        I: IntoIterator<Item = Point2>,
    {
        self.add_entity(Entity::Polyline(Polyline {
            points: points.into_iter().collect(),
            closed,
        }))
    }

    pub fn add_circle(&mut self, center: Point2, radius: f64) -> ObjectId {
        self.add_entity(Entity::Circle(Circle { center, radius }))
    }

    pub fn add_text(&mut self, insert: Point2, content: impl Into<String>, height: f64) -> ObjectId {
        self.add_entity(Entity::Text(Text {
            insert,
            content: content.into(),
            height,
            rotation: 0.0,
        }))
    }

    /// 删除对象，返回是否存在。
    ///
    /// 编组连同成员一起删除；派生实体删除后恢复源的可见性（除非仍被其他派生实体隐藏）；
    /// 删除源对象会让下游派生实体下次构建为占位盒。
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let Some(position) = self.index.get(&id).copied() else {
            return false;
        };
        let object = self.objects.remove(position);
        self.reindex();
        self.unregister(&object);

        if let Some(owner) = self.owners.remove(&id) {
            if let Some(&owner_position) = self.index.get(&owner) {
                if let Entity::Group(group) = &mut self.objects[owner_position].entity {
                    group.members.retain(|member| *member != id);
                }
            }
        }

        if object.entity.hides_sources() {
            for source in object.entity.source_ids() {
                self.refresh_hidden(source);
            }
        }
        if let Entity::Group(group) = &object.entity {
            for member in &group.members {
                self.remove(*member);
            }
        }
        self.invalidate_from(&[id]);
        self.cache.forget(id);
        debug!(id = id.get(), kind = object.entity.record_tag(), "object removed");
        true
    }

    pub fn find(&self, id: ObjectId) -> Option<&SceneObject> {
        self.index
            .get(&id)
            .and_then(|position| self.objects.get(*position))
    }

    pub fn contains_id(&self, id: ObjectId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// 整体替换对象集合（加载文档）。隐藏标记按传入对象保留，依赖索引重建，缓存清空。
    pub fn replace_all(&mut self, objects: Vec<SceneObject>, next_id: u64) {
        self.objects.clear();
        self.index.clear();
        self.cache.clear();
        self.next_object_id = self.next_object_id.max(next_id);
        for mut object in objects {
            if self.index.contains_key(&object.id) {
                let fresh = ObjectId(self.next_object_id.max(object.id.get() + 1));
                warn!(
                    requested = object.id.get(),
                    assigned = fresh.get(),
                    "duplicate object id in loaded set"
                );
                object.id = fresh;
            }
            self.next_object_id = self.next_object_id.max(object.id.get() + 1);
            self.ensure_layer(&object.layer);
            self.index.insert(object.id, self.objects.len());
            self.objects.push(object);
        }
        self.next_object_id = self.next_object_id.max(next_id);
        self.rebuild_links();
        debug!(count = self.objects.len(), next_id = self.next_object_id, "objects replaced");
    }

    /// 新建文档：清空对象、块、图层并重置计数器。
    pub fn clear(&mut self) {
        self.objects.clear();
        self.index.clear();
        self.blocks.clear();
        self.layers.clear();
        self.dependents.clear();
        self.owners.clear();
        self.cache.clear();
        self.next_object_id = 1;
        self.next_layer_id = 0;
        self.ensure_layer(DEFAULT_LAYER);
    }

    /// 直接依赖 `id` 的派生实体。
    pub fn dependents(&self, id: ObjectId) -> Vec<ObjectId> {
        self.dependents
            .get(&id)
            .map(|set| {
                set.iter()
                    .copied()
                    .filter(|dependent| self.contains_id(*dependent))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 对象所属的编组。
    pub fn owner(&self, id: ObjectId) -> Option<ObjectId> {
        self.owners.get(&id).copied()
    }

    // ---- 变更入口 ----

    pub fn translate(&mut self, id: ObjectId, delta: Vector2) -> bool {
        self.transform(&[id], Transform2::Translate(delta)) > 0
    }

    pub fn rotate(&mut self, id: ObjectId, center: Point2, angle: f64) -> bool {
        self.transform(&[id], Transform2::Rotate { center, angle }) > 0
    }

    pub fn scale(&mut self, id: ObjectId, center: Point2, sx: f64, sy: f64) -> bool {
        self.transform(&[id], Transform2::Scale { center, sx, sy }) > 0
    }

    /// 对一组对象施加变换。派生实体级联到源，编组级联到成员；
    /// 同一对象在一次调用中只变换一次。返回实际变换的对象数。
    pub fn transform(&mut self, ids: &[ObjectId], transform: Transform2) -> usize {
        let mut visited = HashSet::new();
        let mut pending: Vec<ObjectId> = ids.iter().rev().copied().collect();
        let mut touched = Vec::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(&position) = self.index.get(&id) else {
                continue;
            };
            let entity = &mut self.objects[position].entity;
            entity.apply_local(&transform);
            pending.extend(entity.source_ids());
            if let Entity::Group(group) = entity {
                pending.extend(group.members.iter().copied());
            }
            touched.push(id);
        }
        self.invalidate_from(&touched);
        touched.len()
    }

    /// 移动夹点。派生实体的夹点属于其第一个源。
    pub fn move_grip(&mut self, id: ObjectId, index: usize, point: Point2) -> bool {
        let Some(object) = self.find(id) else {
            return false;
        };
        let target = if object.entity.is_derived() {
            match self.fallback(object) {
                Some(source) => source.id,
                None => return false,
            }
        } else {
            id
        };
        let Some(&position) = self.index.get(&target) else {
            return false;
        };
        let moved = self.objects[position].entity.move_grip_local(index, point);
        if moved {
            self.invalidate_from(&[target]);
        }
        moved
    }

    /// 就地修改实体参数。修改后重新登记依赖边与隐藏标记，并失效下游缓存。
    pub fn modify(&mut self, id: ObjectId, edit: impl FnOnce(&mut Entity)) -> bool {
        let Some(&position) = self.index.get(&id) else {
            return false;
        };
        let before = self.objects[position].clone();
        self.unregister(&before);
        edit(&mut self.objects[position].entity);
        self.register(id, true);
        if before.entity.hides_sources() {
            for source in before.entity.source_ids() {
                self.refresh_hidden(source);
            }
        }
        self.invalidate_from(&[id]);
        true
    }

    pub fn set_hidden(&mut self, id: ObjectId, hidden: bool) -> bool {
        match self.index.get(&id) {
            Some(&position) => {
                self.objects[position].hidden = hidden;
                true
            }
            None => false,
        }
    }

    pub fn set_layer(&mut self, id: ObjectId, layer: impl Into<String>) -> bool {
        let layer = layer.into();
        let Some(&position) = self.index.get(&id) else {
            return false;
        };
        self.ensure_layer(&layer);
        self.objects[position].layer = layer;
        true
    }

    /// 深拷贝对象：派生实体连同源链、编组连同成员一起复制，全部使用新 ID。
    pub fn duplicate(&mut self, id: ObjectId) -> Option<ObjectId> {
        let mut mapping = HashMap::new();
        self.duplicate_into(id, &mut mapping, 0)
    }

    /// 批量深拷贝，共享同一映射，因此同时选中的派生实体和源只复制一次。
    pub fn duplicate_many(&mut self, ids: &[ObjectId]) -> Vec<ObjectId> {
        let mut mapping = HashMap::new();
        ids.iter()
            .filter_map(|id| self.duplicate_into(*id, &mut mapping, 0))
            .collect()
    }

    fn duplicate_into(
        &mut self,
        id: ObjectId,
        mapping: &mut HashMap<ObjectId, ObjectId>,
        depth: usize,
    ) -> Option<ObjectId> {
        if let Some(copy) = mapping.get(&id) {
            return Some(*copy);
        }
        if depth > MAX_DEPTH {
            warn!(id = id.get(), "duplicate chain too deep");
            return None;
        }
        let original = self.find(id)?.clone();
        let copy_id = self.allocate_id();
        mapping.insert(id, copy_id);

        let mut children = original.entity.source_ids();
        if let Entity::Group(group) = &original.entity {
            children.extend(group.members.iter().copied());
        }
        for child in children {
            self.duplicate_into(child, mapping, depth + 1);
        }

        let mut entity = original.entity;
        entity.remap_ids(&|old| mapping.get(&old).copied().unwrap_or(old));
        self.add(SceneObject {
            id: copy_id,
            hidden: original.hidden,
            layer: original.layer,
            entity,
        });
        Some(copy_id)
    }

    /// 拾取点下最上层的可见对象。编组成员解析为所属编组。
    pub fn pick(&self, point: Point2, tolerance: f64) -> Option<ObjectId> {
        self.objects
            .iter()
            .rev()
            .filter(|object| !object.hidden && self.layer_visible(&object.layer))
            .find(|object| object.contains(self, point, tolerance))
            .map(|object| self.outermost(object.id))
    }

    /// 与矩形框相交的可见对象。
    pub fn pick_window(&self, window: &Bounds2D) -> Vec<ObjectId> {
        let mut picked = BTreeSet::new();
        for object in &self.objects {
            if object.hidden || !self.layer_visible(&object.layer) {
                continue;
            }
            if let Some(bounds) = object.bounding_box(self) {
                if bounds.min().x() >= window.min().x()
                    && bounds.max().x() <= window.max().x()
                    && bounds.min().y() >= window.min().y()
                    && bounds.max().y() <= window.max().y()
                {
                    picked.insert(self.outermost(object.id));
                }
            }
        }
        picked.into_iter().collect()
    }

    fn outermost(&self, mut id: ObjectId) -> ObjectId {
        for _ in 0..MAX_DEPTH {
            match self.owners.get(&id) {
                Some(owner) => id = *owner,
                None => break,
            }
        }
        id
    }

    // ---- 按 ID 的查询 ----

    pub fn bounding_box(&self, id: ObjectId) -> Option<Bounds2D> {
        self.find(id)?.bounding_box(self)
    }

    pub fn contains(&self, id: ObjectId, point: Point2, tolerance: f64) -> bool {
        self.find(id)
            .is_some_and(|object| object.contains(self, point, tolerance))
    }

    pub fn center(&self, id: ObjectId) -> Option<Point2> {
        self.find(id)?.center(self)
    }

    pub fn snap_points(&self, id: ObjectId) -> Vec<SnapPoint> {
        self.find(id)
            .map(|object| object.snap_points(self))
            .unwrap_or_default()
    }

    pub fn grips(&self, id: ObjectId) -> Vec<Point2> {
        self.find(id)
            .map(|object| object.grips(self))
            .unwrap_or_default()
    }

    /// 所有可见对象的包围盒并集。
    pub fn bounds(&self) -> Option<Bounds2D> {
        let mut bounds = Bounds2D::empty();
        for object in &self.objects {
            if object.hidden || self.owners.contains_key(&object.id) {
                continue;
            }
            if let Some(object_bounds) = object.bounding_box(self) {
                bounds.include_bounds(&object_bounds);
            }
        }
        if bounds.is_empty() { None } else { Some(bounds) }
    }

    /// 绘制全部可见对象；编组成员由编组绘制。
    pub fn draw(&self, canvas: &mut dyn Canvas, selection: &[ObjectId]) {
        for object in &self.objects {
            if object.hidden
                || !self.layer_visible(&object.layer)
                || self.owners.contains_key(&object.id)
            {
                continue;
            }
            let style = if selection.contains(&object.id) {
                Style::Selected
            } else {
                Style::Normal
            };
            object.draw(self, canvas, style);
        }
    }

    // ---- 派生网格 ----

    /// 派生实体的网格。已缓存时返回同一实例；否则构建（失败时为占位盒）并缓存。
    pub fn mesh(&mut self, id: ObjectId, engine: &dyn BooleanEngine) -> Option<Arc<Mesh>> {
        if !self.find(id)?.entity.is_derived() {
            return None;
        }
        if let Some(mesh) = self.cache.get(id) {
            return Some(mesh);
        }
        let (mesh, built) = {
            let mut builder = MeshBuilder::new(&*self, &self.options, engine);
            let mesh = builder.build(id);
            (mesh, builder.into_built())
        };
        for (built_id, built_mesh) in built {
            self.cache.insert(built_id, built_mesh);
        }
        Some(mesh)
    }

    pub fn cached_mesh(&self, id: ObjectId) -> Option<Arc<Mesh>> {
        self.cache.get(id)
    }

    /// 为后台构建准备任务：快照源链并记录当前代数。已缓存或非派生对象返回 `None`。
    pub fn prepare_build(&self, id: ObjectId) -> Option<BuildJob> {
        let object = self.find(id)?;
        if !object.entity.is_derived() || self.cache.get(id).is_some() {
            return None;
        }
        let mut snapshot = HashMap::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if snapshot.contains_key(&current) {
                continue;
            }
            if let Some(found) = self.find(current) {
                queue.extend(found.entity.source_ids());
                snapshot.insert(current, found.entity.clone());
            }
        }
        Some(BuildJob::new(
            id,
            self.cache.generation(id),
            snapshot,
            self.options.clone(),
        ))
    }

    /// 写回后台构建结果。构建期间对象或其源被修改过时丢弃结果并返回 `false`。
    pub fn apply_build(&mut self, outcome: BuildOutcome) -> bool {
        let current = self.cache.generation(outcome.id);
        let alive = self
            .find(outcome.id)
            .is_some_and(|object| object.entity.is_derived());
        if !alive || current != outcome.generation {
            debug!(
                id = outcome.id.get(),
                expected = outcome.generation,
                current,
                "discarding stale build result"
            );
            return false;
        }
        self.cache.insert(outcome.id, outcome.mesh);
        true
    }

    // ---- 块 ----

    /// 由注册表中的对象定义块。原对象保留在文档中。
    pub fn define_block(
        &mut self,
        name: impl Into<String>,
        base_point: Point2,
        ids: &[ObjectId],
    ) -> Result<(), DocumentError> {
        let name = name.into();
        if self.blocks.contains_key(&name) {
            return Err(DocumentError::DuplicateBlock(name));
        }
        let objects = ids
            .iter()
            .map(|id| {
                self.find(*id)
                    .cloned()
                    .ok_or(DocumentError::UnknownObject(*id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let definition = BlockDefinition::from_objects(name, base_point, &objects, self)?;
        debug!(
            name = %definition.name,
            count = definition.objects.len(),
            "block defined"
        );
        self.blocks.insert(definition.name.clone(), definition);
        Ok(())
    }

    /// 注册已构造好的块定义（加载时使用），同名定义被替换。
    pub fn add_block(&mut self, definition: BlockDefinition) {
        for object in &definition.objects {
            self.next_object_id = self.next_object_id.max(object.id.get() + 1);
        }
        if self.blocks.contains_key(&definition.name) {
            warn!(name = %definition.name, "replacing existing block definition");
        }
        self.blocks.insert(definition.name.clone(), definition);
    }

    pub fn insert_block(
        &mut self,
        name: &str,
        insert: Point2,
        scale: Vector2,
        rotation: f64,
    ) -> Result<ObjectId, DocumentError> {
        if !self.blocks.contains_key(name) {
            return Err(DocumentError::UnknownBlock(name.to_string()));
        }
        let mut reference = BlockReference::new(name, insert);
        reference.scale = scale;
        reference.rotation = rotation;
        Ok(self.add_entity(Entity::BlockReference(reference)))
    }

    pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
        self.blocks.get(name)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockDefinition> {
        self.blocks.values()
    }

    /// 删除块定义；现有参照随后绘制为错误标记。
    pub fn remove_block(&mut self, name: &str) -> Option<BlockDefinition> {
        self.blocks.remove(name)
    }

    // ---- 快照 ----

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            layers: self.layers.clone(),
            objects: self.objects.clone(),
            next_object_id: self.next_object_id,
            next_layer_id: self.next_layer_id,
            blocks: self.blocks.clone(),
        }
    }

    /// 恢复快照。对象、源链接与隐藏标记原样恢复；ID 计数器不回退。
    pub fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.layers = snapshot.layers;
        self.objects = snapshot.objects;
        self.blocks = snapshot.blocks;
        self.next_object_id = self.next_object_id.max(snapshot.next_object_id);
        self.next_layer_id = self.next_layer_id.max(snapshot.next_layer_id);
        self.reindex();
        self.rebuild_links();
        self.cache.clear();
    }

    // ---- 内部 ----

    fn reindex(&mut self) {
        self.index = self
            .objects
            .iter()
            .enumerate()
            .map(|(position, object)| (object.id, position))
            .collect();
    }

    fn rebuild_links(&mut self) {
        self.dependents.clear();
        self.owners.clear();
        let ids: Vec<ObjectId> = self.objects.iter().map(|object| object.id).collect();
        for id in ids {
            self.register(id, false);
        }
    }

    /// 登记 `id` 的依赖边与编组归属；`hide` 为真时隐藏被消费的源。
    fn register(&mut self, id: ObjectId, hide: bool) {
        let Some(object) = self.find(id) else {
            return;
        };
        let sources = object.entity.source_ids();
        let hides = object.entity.hides_sources();
        let members = match &object.entity {
            Entity::Group(group) => group.members.clone(),
            _ => Vec::new(),
        };
        for source in &sources {
            self.dependents.entry(*source).or_default().insert(id);
        }
        for member in members {
            self.owners.insert(member, id);
        }
        if hide && hides {
            for source in sources {
                self.set_hidden(source, true);
            }
        }
    }

    fn unregister(&mut self, object: &SceneObject) {
        for source in object.entity.source_ids() {
            if let Some(set) = self.dependents.get_mut(&source) {
                set.remove(&object.id);
                if set.is_empty() {
                    self.dependents.remove(&source);
                }
            }
        }
        if let Entity::Group(group) = &object.entity {
            for member in &group.members {
                if self.owners.get(member) == Some(&object.id) {
                    self.owners.remove(member);
                }
            }
        }
    }

    /// 源对象只要还被任一存活的隐藏型派生实体消费就保持隐藏。
    fn refresh_hidden(&mut self, source: ObjectId) {
        let still_consumed = self.dependents.get(&source).is_some_and(|consumers| {
            consumers.iter().any(|consumer| {
                self.find(*consumer)
                    .is_some_and(|object| object.entity.hides_sources())
            })
        });
        self.set_hidden(source, still_consumed);
    }

    /// 让 `ids` 本身及其全部传递下游的缓存失效。
    fn invalidate_from(&mut self, ids: &[ObjectId]) {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<ObjectId> = ids.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            self.cache.invalidate(id);
            if let Some(consumers) = self.dependents.get(&id) {
                queue.extend(consumers.iter().copied());
            }
        }
    }

    /// 沿第一个源下行，找到非派生对象（派生实体的二维替身）。
    pub(crate) fn fallback<'a>(&'a self, object: &'a SceneObject) -> Option<&'a SceneObject> {
        let mut current = object;
        for _ in 0..MAX_DEPTH {
            if !current.entity.is_derived() {
                return Some(current);
            }
            let first = *current.entity.source_ids().first()?;
            current = self.find(first)?;
        }
        warn!(id = object.id.get(), "derived chain too deep");
        None
    }

    /// 展开为可直接绘制/查询的叶子：图元与块参照。
    fn leaves<'a>(&'a self, object: &'a SceneObject) -> Vec<&'a SceneObject> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![object];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.id) {
                continue;
            }
            match &current.entity {
                Entity::Group(group) => {
                    stack.extend(group.members.iter().rev().filter_map(|m| self.find(*m)));
                }
                entity if entity.is_derived() => {
                    if let Some(source) = self.fallback(current) {
                        stack.push(source);
                    }
                }
                _ => result.push(current),
            }
        }
        result
    }
}

impl SourceLookup for Document {
    fn entity(&self, id: ObjectId) -> Option<&Entity> {
        self.find(id).map(|object| &object.entity)
    }

    fn cached_mesh(&self, id: ObjectId) -> Option<Arc<Mesh>> {
        self.cache.get(id)
    }
}
