//! 基于文档快照的撤销/重做栈。
//!
//! 每个撤销点保存修改前的完整快照（对象、块、图层与计数器），因此派生对象的源链接与
//! 隐藏标记随快照一起原子恢复。网格缓存不入栈，恢复后按需重建。

use plancad_core::document::{Document, DocumentSnapshot};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    label: String,
    snapshot: DocumentSnapshot,
}

impl Checkpoint {
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[derive(Debug, Clone)]
pub struct History {
    undo: Vec<Checkpoint>,
    redo: Vec<Checkpoint>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

impl History {
    /// `limit` 为撤销栈最大深度，至少为 1。
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// 记录一个撤销点，`before` 为修改前的快照。新的提交会清空重做栈。
    pub fn record(&mut self, label: impl Into<String>, before: DocumentSnapshot) {
        let label = label.into();
        debug!(label = %label, depth = self.undo.len() + 1, "history checkpoint");
        self.undo.push(Checkpoint {
            label,
            snapshot: before,
        });
        if self.undo.len() > self.limit {
            let overflow = self.undo.len() - self.limit;
            self.undo.drain(..overflow);
        }
        self.redo.clear();
    }

    pub fn undo(&mut self, document: &mut Document) -> Option<String> {
        let checkpoint = self.undo.pop()?;
        let current = document.snapshot();
        document.restore(checkpoint.snapshot);
        debug!(label = %checkpoint.label, "undo");
        self.redo.push(Checkpoint {
            label: checkpoint.label.clone(),
            snapshot: current,
        });
        Some(checkpoint.label)
    }

    pub fn redo(&mut self, document: &mut Document) -> Option<String> {
        let checkpoint = self.redo.pop()?;
        let current = document.snapshot();
        document.restore(checkpoint.snapshot);
        debug!(label = %checkpoint.label, "redo");
        self.undo.push(Checkpoint {
            label: checkpoint.label.clone(),
            snapshot: current,
        });
        Some(checkpoint.label)
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    /// 撤销栈中的名称，最近的在后。
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.undo.iter().map(Checkpoint::label)
    }
}

#[cfg(test)]
mod tests {
    use plancad_core::derived::{Bevel, Extrude};
    use plancad_core::entity::Entity;
    use plancad_core::geometry::{Point2, Vector2};

    use super::*;

    #[test]
    fn undo_and_redo_walk_checkpoints() {
        let mut doc = Document::new();
        let mut history = History::new(10);

        let before = doc.snapshot();
        let wall = doc.add_wall(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 2.0);
        history.record("wall", before);

        let before = doc.snapshot();
        doc.translate(wall, Vector2::new(0.0, 5.0));
        history.record("move", before);

        assert_eq!(history.undo(&mut doc).as_deref(), Some("move"));
        assert_eq!(
            doc.bounding_box(wall).map(|b| b.center()),
            Some(Point2::new(5.0, 0.0))
        );
        assert_eq!(history.undo(&mut doc).as_deref(), Some("wall"));
        assert!(doc.is_empty());
        assert!(history.undo(&mut doc).is_none());

        assert_eq!(history.redo(&mut doc).as_deref(), Some("wall"));
        assert!(doc.contains_id(wall));
        assert!(history.can_redo());
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut doc = Document::new();
        let mut history = History::new(10);
        let before = doc.snapshot();
        doc.add_circle(Point2::origin(), 1.0);
        history.record("circle", before);
        history.undo(&mut doc);
        assert!(history.can_redo());

        let before = doc.snapshot();
        doc.add_circle(Point2::origin(), 2.0);
        history.record("circle", before);
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_drops_oldest_checkpoints() {
        let mut doc = Document::new();
        let mut history = History::new(2);
        for label in ["a", "b", "c"] {
            let before = doc.snapshot();
            doc.add_circle(Point2::origin(), 1.0);
            history.record(label, before);
        }
        assert_eq!(history.labels().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn ids_allocated_after_undo_are_fresh() {
        let mut doc = Document::new();
        let mut history = History::new(10);
        let source = doc.add_circle(Point2::origin(), 5.0);
        let before = doc.snapshot();
        let extrude = doc.add_entity(Entity::Extrude(Extrude {
            source,
            height: 10.0,
            bevel: Bevel::None,
        }));
        history.record("extrude", before);
        history.undo(&mut doc);

        let next = doc.add_circle(Point2::origin(), 1.0);
        assert!(next > extrude);
    }
}
