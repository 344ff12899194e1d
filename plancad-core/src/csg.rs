//! 布尔运算接口。
//!
//! 实体布尔运算由 manifold 内核完成；未配置内核时使用 [`NullBooleanEngine`]，
//! 切除命令在构造时即被拒绝。

use std::collections::HashMap;

use manifold_rs::Manifold;
use thiserror::Error;
use tracing::debug;

use crate::geometry::Point3;
use crate::mesh::Mesh;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CsgError {
    #[error("布尔运算引擎 `{0}` 不可用")]
    Unavailable(&'static str),
    #[error("布尔运算的操作数为空网格")]
    EmptyOperand,
    #[error("布尔运算失败: {0}")]
    Failed(String),
}

/// 三角网格布尔运算引擎。
pub trait BooleanEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// 引擎是否可用；切除命令在构造时检查。
    fn is_available(&self) -> bool {
        true
    }

    /// `target - tool`。
    fn subtract(&self, target: &Mesh, tool: &Mesh) -> Result<Mesh, CsgError>;
}

/// 未配置布尔内核时使用。
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBooleanEngine;

impl BooleanEngine for NullBooleanEngine {
    fn name(&self) -> &'static str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn subtract(&self, _target: &Mesh, _tool: &Mesh) -> Result<Mesh, CsgError> {
        Err(CsgError::Unavailable(self.name()))
    }
}

/// manifold 内核上的网格差集。
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifoldEngine;

impl ManifoldEngine {
    /// 合并重合顶点后交给内核；各生成器按环输出顶点，接缝处的重复点必须先焊接。
    fn to_manifold(mesh: &Mesh, role: &str) -> Result<Manifold, CsgError> {
        let (positions, indices) = weld(mesh);
        if indices.is_empty() {
            return Err(CsgError::EmptyOperand);
        }
        let manifold = manifold_rs::Mesh::new(&positions, &indices).to_manifold();
        if manifold.is_empty() {
            return Err(CsgError::Failed(format!("{role}不是封闭流形")));
        }
        Ok(manifold)
    }

    fn from_manifold(manifold: &Manifold) -> Mesh {
        let raw = manifold.to_mesh();
        let positions = raw.vertices();
        let mut mesh = Mesh::new();
        mesh.vertices = positions
            .chunks_exact(3)
            .map(|p| Point3::new(f64::from(p[0]), f64::from(p[1]), f64::from(p[2])))
            .collect();
        mesh.triangles = raw
            .indices()
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();
        mesh
    }
}

impl BooleanEngine for ManifoldEngine {
    fn name(&self) -> &'static str {
        "manifold"
    }

    fn subtract(&self, target: &Mesh, tool: &Mesh) -> Result<Mesh, CsgError> {
        if target.is_empty() || tool.is_empty() {
            return Err(CsgError::EmptyOperand);
        }
        let base = Self::to_manifold(target, "目标")?;
        let cutter = Self::to_manifold(tool, "刀具")?;
        let result = Self::from_manifold(&base.difference(&cutter));
        debug!(
            target = target.triangle_count(),
            tool = tool.triangle_count(),
            result = result.triangle_count(),
            "manifold subtract"
        );
        Ok(result)
    }
}

/// 按 f32 坐标合并重合顶点，丢弃焊接后退化的三角形。
fn weld(mesh: &Mesh) -> (Vec<f32>, Vec<u32>) {
    let mut lookup: HashMap<[u32; 3], u32> = HashMap::new();
    let mut positions = Vec::with_capacity(mesh.vertices.len() * 3);
    let mut remap = Vec::with_capacity(mesh.vertices.len());
    for vertex in &mesh.vertices {
        let coords = [vertex.x() as f32, vertex.y() as f32, vertex.z() as f32];
        let key = coords.map(|c| if c == 0.0 { 0 } else { c.to_bits() });
        let next = lookup.len() as u32;
        let index = *lookup.entry(key).or_insert_with(|| {
            positions.extend_from_slice(&coords);
            next
        });
        remap.push(index);
    }

    let mut indices = Vec::with_capacity(mesh.triangles.len() * 3);
    for tri in &mesh.triangles {
        let [a, b, c] = tri.map(|i| remap.get(i as usize).copied());
        let (Some(a), Some(b), Some(c)) = (a, b, c) else {
            continue;
        };
        if a != b && b != c && a != c {
            indices.extend_from_slice(&[a, b, c]);
        }
    }
    (positions, indices)
}
