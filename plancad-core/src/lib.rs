//! 平面图/疏散图编辑器的场景对象模型。
//!
//! 文档注册表持有全部对象；派生实体按 ID 引用源对象，三维网格按需构建并缓存，
//! 源对象经注册表变更时缓存随之失效。

pub mod block;
pub mod csg;
pub mod derived;
pub mod document;
pub mod draw;
pub mod entity;
pub mod geometry;
pub mod mesh;
pub mod record;

pub use document::{Document, DocumentError, ObjectId, SceneObject};
pub use entity::Entity;
