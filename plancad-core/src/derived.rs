//! 派生实体：拉伸、旋转、扫掠、放样与布尔切除。
//!
//! 派生实体只保存源对象 ID 与操作参数，三维结果由 [`MeshBuilder`] 按需构建，
//! 缓存由文档持有，源对象变化时由文档统一失效。

use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::csg::BooleanEngine;
use crate::document::ObjectId;
use crate::entity::{Entity, PrimitiveRef};
use crate::geometry::{Point2, Point3};
use crate::mesh::{
    BuildError, Mesh, extrude_polygon, loft_profiles, revolve_profile, sweep_profile,
};

pub use crate::mesh::Bevel;

/// 扫掠路径每段 Catmull-Rom 细分数。
const SWEEP_SUBDIVISIONS: usize = 8;
/// 解析派生链时的最大深度。
const MAX_CHAIN_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extrude {
    pub source: ObjectId,
    pub height: f64,
    #[serde(default)]
    pub bevel: Bevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revolve {
    pub source: ObjectId,
    pub axis_start: Point2,
    pub axis_end: Point2,
    #[serde(default = "Revolve::full_turn")]
    pub angle: f64,
}

impl Revolve {
    pub fn full_turn() -> f64 {
        TAU
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub profile: ObjectId,
    pub path: ObjectId,
}

/// 放样。`heights` 为空时第 i 个截面位于 `i * loft_spacing`；
/// `samples` 为空时使用构建选项中的默认采样数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loft {
    pub profiles: Vec<ObjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heights: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

impl Loft {
    pub fn resolved_heights(&self, spacing: f64) -> Vec<f64> {
        (0..self.profiles.len())
            .map(|index| {
                self.heights
                    .get(index)
                    .copied()
                    .unwrap_or(index as f64 * spacing)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub target: ObjectId,
    pub tool: ObjectId,
}

/// 网格构建参数，由宿主从配置中填充。
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub curve_segments: usize,
    pub fillet_segments: usize,
    pub loft_samples: usize,
    pub loft_spacing: f64,
    pub placeholder_size: f64,
    /// 图元直接作为切除操作数时的拉伸高度。
    pub default_extrude_height: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            curve_segments: 32,
            fillet_segments: 4,
            loft_samples: 100,
            loft_spacing: 100.0,
            placeholder_size: 10.0,
            default_extrude_height: 100.0,
        }
    }
}

/// 网格构建时查询源对象的接口，文档和离线快照都实现它。
pub trait SourceLookup {
    fn entity(&self, id: ObjectId) -> Option<&Entity>;

    fn cached_mesh(&self, _id: ObjectId) -> Option<Arc<Mesh>> {
        None
    }
}

impl SourceLookup for HashMap<ObjectId, Entity> {
    fn entity(&self, id: ObjectId) -> Option<&Entity> {
        self.get(&id)
    }
}

/// 递归构建派生实体网格。失败一律降级为占位盒。
pub struct MeshBuilder<'a> {
    lookup: &'a dyn SourceLookup,
    options: &'a BuildOptions,
    engine: &'a dyn BooleanEngine,
    built: HashMap<ObjectId, Arc<Mesh>>,
    visiting: HashSet<ObjectId>,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(
        lookup: &'a dyn SourceLookup,
        options: &'a BuildOptions,
        engine: &'a dyn BooleanEngine,
    ) -> Self {
        Self {
            lookup,
            options,
            engine,
            built: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// 本次构建过程中新生成的派生实体网格（含嵌套源）。
    pub fn into_built(self) -> HashMap<ObjectId, Arc<Mesh>> {
        self.built
    }

    pub fn build(&mut self, id: ObjectId) -> Arc<Mesh> {
        if let Some(mesh) = self.lookup.cached_mesh(id) {
            return mesh;
        }
        if let Some(mesh) = self.built.get(&id) {
            return Arc::clone(mesh);
        }
        if !self.visiting.insert(id) {
            warn!(id = id.get(), "derived object references itself");
            return Arc::new(self.placeholder(id));
        }
        let result = self.try_build(id);
        self.visiting.remove(&id);

        let mesh = match result {
            Ok(mesh) => {
                debug!(
                    id = id.get(),
                    triangles = mesh.triangle_count(),
                    "built derived mesh"
                );
                mesh
            }
            Err(err) => {
                warn!(id = id.get(), error = %err, "derived build failed, using placeholder");
                self.placeholder(id)
            }
        };
        let mesh = Arc::new(mesh);
        if self.lookup.entity(id).is_some_and(Entity::is_derived) {
            self.built.insert(id, Arc::clone(&mesh));
        }
        mesh
    }

    fn try_build(&mut self, id: ObjectId) -> Result<Mesh, BuildError> {
        let lookup = self.lookup;
        let entity = lookup.entity(id).ok_or(BuildError::MissingSource(id))?;
        let segments = self.options.curve_segments;
        match entity {
            Entity::Extrude(extrude) => {
                let ring = self.profile(extrude.source, "拉伸轮廓")?;
                extrude_polygon(
                    &ring,
                    extrude.height,
                    extrude.bevel,
                    self.options.fillet_segments,
                )
            }
            Entity::Revolve(revolve) => {
                let source = self.primitive(revolve.source, "旋转轮廓")?;
                let (points, closed) = match source.profile_ring(segments) {
                    Some(ring) => (ring, true),
                    None => (
                        source
                            .path_points(segments)
                            .ok_or_else(|| invalid(lookup, revolve.source, "旋转轮廓"))?,
                        false,
                    ),
                };
                revolve_profile(
                    &points,
                    closed,
                    revolve.axis_start,
                    revolve.axis_end,
                    revolve.angle,
                    segments,
                )
            }
            Entity::Sweep(sweep) => {
                let profile = self.profile(sweep.profile, "扫掠截面")?;
                let path = self
                    .primitive(sweep.path, "扫掠路径")?
                    .path_points(segments)
                    .ok_or_else(|| invalid(lookup, sweep.path, "扫掠路径"))?;
                sweep_profile(&profile, &path, SWEEP_SUBDIVISIONS)
            }
            Entity::Loft(loft) => {
                let rings = loft
                    .profiles
                    .iter()
                    .map(|profile| self.profile(*profile, "放样截面"))
                    .collect::<Result<Vec<_>, _>>()?;
                let heights = loft.resolved_heights(self.options.loft_spacing);
                loft_profiles(
                    &rings,
                    &heights,
                    loft.samples.unwrap_or(self.options.loft_samples),
                )
            }
            Entity::Cut(cut) => {
                let target = self.solid(cut.target)?;
                let tool = self.solid(cut.tool)?;
                Ok(self.engine.subtract(&target, &tool)?)
            }
            _ => Err(BuildError::NotDerived(id)),
        }
    }

    fn primitive(&self, id: ObjectId, role: &'static str) -> Result<PrimitiveRef<'a>, BuildError> {
        let lookup = self.lookup;
        let entity = lookup.entity(id).ok_or(BuildError::MissingSource(id))?;
        entity
            .as_primitive()
            .ok_or_else(|| invalid(lookup, id, role))
    }

    fn profile(&self, id: ObjectId, role: &'static str) -> Result<Vec<Point2>, BuildError> {
        self.primitive(id, role)?
            .profile_ring(self.options.curve_segments)
            .ok_or_else(|| invalid(self.lookup, id, role))
    }

    /// 切除操作数：派生实体取其网格，封闭图元按默认高度拉伸。
    fn solid(&mut self, id: ObjectId) -> Result<Arc<Mesh>, BuildError> {
        let entity = self
            .lookup
            .entity(id)
            .ok_or(BuildError::MissingSource(id))?;
        if entity.is_derived() {
            let mesh = self.build(id);
            if mesh.is_placeholder() {
                return Err(BuildError::PlaceholderInput(id));
            }
            return Ok(mesh);
        }
        let ring = self.profile(id, "切除操作数")?;
        Ok(Arc::new(extrude_polygon(
            &ring,
            self.options.default_extrude_height,
            Bevel::None,
            self.options.fillet_segments,
        )?))
    }

    fn placeholder(&self, id: ObjectId) -> Mesh {
        let size = self.options.placeholder_size;
        let anchor = anchor_point(self.lookup, id).unwrap_or_else(Point2::origin);
        Mesh::placeholder_box(Point3::from_plan(anchor, size * 0.5), size)
    }
}

fn invalid(lookup: &dyn SourceLookup, id: ObjectId, role: &'static str) -> BuildError {
    BuildError::InvalidSource {
        id,
        kind: lookup.entity(id).map_or("missing", Entity::record_tag),
        role,
    }
}

/// 沿第一个源向下找到可定位的图元，用于放置占位盒。
pub fn anchor_point(lookup: &dyn SourceLookup, id: ObjectId) -> Option<Point2> {
    let mut current = id;
    for _ in 0..MAX_CHAIN_DEPTH {
        let entity = lookup.entity(current)?;
        if let Some(primitive) = entity.as_primitive() {
            return Some(primitive.center());
        }
        if let Entity::BlockReference(reference) = entity {
            return Some(reference.insert);
        }
        current = *entity.source_ids().first()?;
    }
    None
}

/// 派生实体网格缓存。每次失效都会推进该对象的代数，
/// 离线构建结果只有在代数一致时才会写回。
#[derive(Debug, Default)]
pub struct BuildCache {
    meshes: HashMap<ObjectId, Arc<Mesh>>,
    generations: HashMap<ObjectId, u64>,
    counter: u64,
    floor: u64,
}

impl BuildCache {
    pub fn get(&self, id: ObjectId) -> Option<Arc<Mesh>> {
        self.meshes.get(&id).cloned()
    }

    pub fn insert(&mut self, id: ObjectId, mesh: Arc<Mesh>) {
        self.meshes.insert(id, mesh);
    }

    pub fn invalidate(&mut self, id: ObjectId) {
        self.meshes.remove(&id);
        self.counter += 1;
        self.generations.insert(id, self.counter);
    }

    /// 对象被删除后丢弃其条目；代数回落到 `floor`，删除前发出的任务仍因代数不符或对象缺失被拒绝。
    pub fn forget(&mut self, id: ObjectId) {
        self.meshes.remove(&id);
        self.generations.remove(&id);
    }

    /// 仍记录代数的对象数。
    pub fn tracked(&self) -> usize {
        self.generations.len()
    }

    pub fn generation(&self, id: ObjectId) -> u64 {
        self.generations
            .get(&id)
            .copied()
            .unwrap_or(0)
            .max(self.floor)
    }

    /// 清空所有缓存并让此前发出的构建任务全部过期。
    pub fn clear(&mut self) {
        self.meshes.clear();
        self.generations.clear();
        self.counter += 1;
        self.floor = self.counter;
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// 可移交给后台线程的构建任务：持有源对象快照，不借用文档。
#[derive(Debug, Clone)]
pub struct BuildJob {
    id: ObjectId,
    generation: u64,
    snapshot: HashMap<ObjectId, Entity>,
    options: BuildOptions,
}

impl BuildJob {
    pub(crate) fn new(
        id: ObjectId,
        generation: u64,
        snapshot: HashMap<ObjectId, Entity>,
        options: BuildOptions,
    ) -> Self {
        Self {
            id,
            generation,
            snapshot,
            options,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn run(&self, engine: &dyn BooleanEngine) -> BuildOutcome {
        let mut builder = MeshBuilder::new(&self.snapshot, &self.options, engine);
        let mesh = builder.build(self.id);
        BuildOutcome {
            id: self.id,
            generation: self.generation,
            mesh,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub id: ObjectId,
    pub generation: u64,
    pub mesh: Arc<Mesh>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csg::{ManifoldEngine, NullBooleanEngine};
    use crate::entity::{Circle, Polyline};

    fn lookup_with(entries: Vec<(u64, Entity)>) -> HashMap<ObjectId, Entity> {
        entries
            .into_iter()
            .map(|(id, entity)| (ObjectId::new(id), entity))
            .collect()
    }

    fn square(x: f64, size: f64) -> Entity {
        Entity::Polyline(Polyline {
            points: vec![
                Point2::new(x, 0.0),
                Point2::new(x + size, 0.0),
                Point2::new(x + size, size),
                Point2::new(x, size),
            ],
            closed: true,
        })
    }

    #[test]
    fn nested_cut_builds_each_operand_once() {
        let lookup = lookup_with(vec![
            (1, square(0.0, 10.0)),
            (
                2,
                Entity::Extrude(Extrude {
                    source: ObjectId::new(1),
                    height: 5.0,
                    bevel: Bevel::None,
                }),
            ),
            (
                3,
                Entity::Circle(Circle {
                    center: Point2::new(5.0, 5.0),
                    radius: 2.0,
                }),
            ),
            (
                4,
                Entity::Cut(Cut {
                    target: ObjectId::new(2),
                    tool: ObjectId::new(3),
                }),
            ),
        ]);
        let options = BuildOptions::default();
        let mut builder = MeshBuilder::new(&lookup, &options, &ManifoldEngine);
        let mesh = builder.build(ObjectId::new(4));
        assert!(!mesh.is_placeholder());
        let built = builder.into_built();
        assert!(built.contains_key(&ObjectId::new(2)));
        assert!(built.contains_key(&ObjectId::new(4)));
        assert!(!built.contains_key(&ObjectId::new(3)));
    }

    #[test]
    fn unavailable_engine_degrades_to_placeholder() {
        let lookup = lookup_with(vec![
            (1, square(0.0, 10.0)),
            (2, square(2.0, 2.0)),
            (
                3,
                Entity::Cut(Cut {
                    target: ObjectId::new(1),
                    tool: ObjectId::new(2),
                }),
            ),
        ]);
        let options = BuildOptions::default();
        let mut builder = MeshBuilder::new(&lookup, &options, &NullBooleanEngine);
        assert!(builder.build(ObjectId::new(3)).is_placeholder());
    }

    #[test]
    fn self_reference_is_a_placeholder() {
        let lookup = lookup_with(vec![(
            7,
            Entity::Extrude(Extrude {
                source: ObjectId::new(7),
                height: 1.0,
                bevel: Bevel::None,
            }),
        )]);
        let options = BuildOptions::default();
        let mut builder = MeshBuilder::new(&lookup, &options, &NullBooleanEngine);
        assert!(builder.build(ObjectId::new(7)).is_placeholder());
    }

    #[test]
    fn loft_heights_default_to_spacing() {
        let loft = Loft {
            profiles: vec![ObjectId::new(1), ObjectId::new(2), ObjectId::new(3)],
            heights: vec![5.0],
            samples: None,
        };
        assert_eq!(loft.resolved_heights(10.0), vec![5.0, 10.0, 20.0]);
    }

    #[test]
    fn cache_generation_survives_clear() {
        let mut cache = BuildCache::default();
        let id = ObjectId::new(1);
        let before = cache.generation(id);
        cache.invalidate(id);
        let after = cache.generation(id);
        assert!(after > before);
        cache.clear();
        assert!(cache.generation(id) > after);
        assert!(cache.generation(ObjectId::new(99)) > after);
    }

    #[test]
    fn forgotten_ids_fall_back_to_floor() {
        let mut cache = BuildCache::default();
        let id = ObjectId::new(7);
        cache.invalidate(id);
        cache.insert(id, Arc::new(Mesh::new()));
        let issued = cache.generation(id);
        cache.forget(id);
        assert_eq!(cache.tracked(), 0);
        assert!(cache.get(id).is_none());
        assert_ne!(cache.generation(id), issued);
    }
}
