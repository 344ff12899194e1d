//! 结构化记录格式。
//!
//! 每个对象序列化为一条带 `type` 判别字段的 JSON 记录；派生实体只记录源 ID，
//! 块定义记录其私有对象列表，文档额外记录 ID 与图层计数器。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::block::BlockDefinition;
use crate::derived::BuildOptions;
use crate::document::{Document, Layer, SceneObject};
use crate::geometry::Point2;

/// 当前记录格式版本。
pub const RECORD_VERSION: u32 = 1;

const KNOWN_TYPES: &[&str] = &[
    "wall",
    "door",
    "polyline",
    "circle",
    "arc",
    "sketch",
    "symbol",
    "text",
    "dimension",
    "group",
    "extrudeObject",
    "revolveObject",
    "sweepObject",
    "loftObject",
    "cutObject",
    "blockReference",
];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("记录缺少 `type` 字段")]
    MissingType,
    #[error("未知的对象类型 `{0}`")]
    UnknownType(String),
    #[error("不支持的记录版本 {found}（当前 {supported}）")]
    UnsupportedVersion { found: u32, supported: u32 },
    #[error("记录格式错误: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SceneObject {
    pub fn to_record(&self) -> Result<Value, RecordError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_record(record: Value) -> Result<Self, RecordError> {
        let tag = record
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingType)?;
        if !KNOWN_TYPES.contains(&tag) {
            return Err(RecordError::UnknownType(tag.to_string()));
        }
        Ok(serde_json::from_value(record)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub name: String,
    pub base_point: Point2,
    pub objects: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub version: u32,
    pub next_id: u64,
    #[serde(default)]
    pub next_layer_id: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
    pub objects: Vec<Value>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

impl Document {
    pub fn to_record(&self) -> Result<DocumentRecord, RecordError> {
        let objects = self
            .objects()
            .iter()
            .map(SceneObject::to_record)
            .collect::<Result<Vec<_>, _>>()?;
        let blocks = self
            .blocks()
            .map(|block| {
                Ok(BlockRecord {
                    name: block.name.clone(),
                    base_point: block.base_point,
                    objects: block
                        .objects
                        .iter()
                        .map(SceneObject::to_record)
                        .collect::<Result<Vec<_>, RecordError>>()?,
                })
            })
            .collect::<Result<Vec<_>, RecordError>>()?;
        Ok(DocumentRecord {
            version: RECORD_VERSION,
            next_id: self.next_object_id(),
            next_layer_id: self.next_layer_id(),
            layers: self.layers().cloned().collect(),
            objects,
            blocks,
        })
    }

    /// 从记录重建文档。无法识别的对象记录被跳过并记录警告。
    pub fn from_record(record: DocumentRecord, options: BuildOptions) -> Result<Self, RecordError> {
        if record.version > RECORD_VERSION {
            return Err(RecordError::UnsupportedVersion {
                found: record.version,
                supported: RECORD_VERSION,
            });
        }
        let mut document = Document::with_options(options);
        document.restore_layers(record.layers, record.next_layer_id);

        for block in record.blocks {
            let objects = decode_all(block.objects);
            document.add_block(BlockDefinition {
                name: block.name,
                base_point: block.base_point,
                objects,
            });
        }
        let objects = decode_all(record.objects);
        document.replace_all(objects, record.next_id);
        Ok(document)
    }
}

fn decode_all(records: Vec<Value>) -> Vec<SceneObject> {
    records
        .into_iter()
        .filter_map(|record| match SceneObject::from_record(record) {
            Ok(object) => Some(object),
            Err(err) => {
                warn!(error = %err, "skipping unreadable object record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockReference;
    use crate::derived::{Bevel, Cut, Extrude, Loft, Revolve, Sweep};
    use crate::document::ObjectId;
    use crate::entity::{
        Arc, Circle, Dimension, Door, DoorSwing, Entity, Group, Polyline, Sketch, SketchSegment,
        Symbol, Text, Wall,
    };
    use crate::geometry::Vector2;
    use serde_json::json;

    fn every_variant() -> Vec<Entity> {
        let p = |x: f64, y: f64| Point2::new(x, y);
        let id = ObjectId::new;
        vec![
            Entity::Wall(Wall {
                start: p(0.0, 0.0),
                end: p(10.0, 0.0),
                thickness: 2.0,
            }),
            Entity::Door(Door {
                position: p(1.0, 1.0),
                width: 9.0,
                rotation: 0.5,
                swing: DoorSwing::Right,
            }),
            Entity::Polyline(Polyline {
                points: vec![p(0.0, 0.0), p(1.0, 2.0)],
                closed: false,
            }),
            Entity::Circle(Circle {
                center: p(3.0, 3.0),
                radius: 1.5,
            }),
            Entity::Arc(Arc {
                center: p(0.0, 0.0),
                radius: 4.0,
                start_angle: 0.0,
                end_angle: 1.0,
            }),
            Entity::Sketch(Sketch {
                segments: vec![
                    SketchSegment::Line {
                        start: p(0.0, 0.0),
                        end: p(4.0, 0.0),
                    },
                    SketchSegment::Arc {
                        center: p(2.0, 0.0),
                        radius: 2.0,
                        start_angle: 0.0,
                        end_angle: std::f64::consts::PI,
                    },
                ],
            }),
            Entity::Symbol(Symbol {
                kind: "exit".into(),
                position: p(5.0, 5.0),
                size: 3.0,
                rotation: 0.0,
            }),
            Entity::Text(Text {
                insert: p(0.0, 9.0),
                content: "Выход".into(),
                height: 2.5,
                rotation: 0.0,
            }),
            Entity::Dimension(Dimension {
                start: p(0.0, 0.0),
                end: p(10.0, 0.0),
                offset: 3.0,
                text_height: 2.5,
            }),
            Entity::Group(Group {
                members: vec![id(1), id(2)],
            }),
            Entity::Extrude(Extrude {
                source: id(1),
                height: 30.0,
                bevel: Bevel::Fillet { radius: 1.0 },
            }),
            Entity::Revolve(Revolve {
                source: id(2),
                axis_start: p(0.0, 0.0),
                axis_end: p(0.0, 1.0),
                angle: 1.0,
            }),
            Entity::Sweep(Sweep {
                profile: id(3),
                path: id(4),
            }),
            Entity::Loft(Loft {
                profiles: vec![id(3), id(4)],
                heights: vec![0.0, 5.0],
                samples: Some(16),
            }),
            Entity::Cut(Cut {
                target: id(5),
                tool: id(6),
            }),
            Entity::BlockReference(BlockReference {
                name: "exit-sign".into(),
                insert: p(7.0, 7.0),
                scale: Vector2::new(2.0, -1.0),
                rotation: 0.25,
            }),
        ]
    }

    #[test]
    fn every_variant_round_trips() {
        for (index, entity) in every_variant().into_iter().enumerate() {
            let object = SceneObject {
                id: ObjectId::new(100 + index as u64),
                hidden: index % 2 == 0,
                layer: "plan".into(),
                entity,
            };
            let record = object.to_record().expect("record");
            assert_eq!(record["type"], object.entity.record_tag());
            let back = SceneObject::from_record(record).expect("decode");
            assert_eq!(back, object);
        }
    }

    #[test]
    fn derived_records_store_source_ids_only() {
        let object = SceneObject::new(
            ObjectId::new(9),
            Entity::Extrude(Extrude {
                source: ObjectId::new(4),
                height: 3.0,
                bevel: Bevel::None,
            }),
        );
        let record = object.to_record().expect("record");
        assert_eq!(record["source"], json!(4));
        assert_eq!(record["type"], json!("extrudeObject"));
    }

    #[test]
    fn unknown_and_untyped_records_are_rejected() {
        assert!(matches!(
            SceneObject::from_record(json!({"id": 1, "type": "mate"})),
            Err(RecordError::UnknownType(tag)) if tag == "mate"
        ));
        assert!(matches!(
            SceneObject::from_record(json!({"id": 1})),
            Err(RecordError::MissingType)
        ));
    }

    #[test]
    fn document_round_trip_keeps_counters_links_and_blocks() {
        let mut doc = Document::new();
        let target = doc.add_wall(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0), 2.0);
        let tool = doc.add_circle(Point2::new(5.0, 0.0), 1.0);
        let cut = doc.add_entity(Entity::Cut(Cut { target, tool }));
        doc.ensure_layer("evacuation");
        doc.define_block("tag", Point2::new(5.0, 0.0), &[tool])
            .expect("block");
        doc.insert_block("tag", Point2::new(50.0, 50.0), Vector2::new(1.0, 1.0), 0.0)
            .expect("insert");

        let record = doc.to_record().expect("record");
        let text = serde_json::to_string(&record).expect("json");
        let parsed: DocumentRecord = serde_json::from_str(&text).expect("parse");
        let loaded = Document::from_record(parsed, BuildOptions::default()).expect("load");

        assert_eq!(loaded.objects(), doc.objects());
        assert_eq!(loaded.next_object_id(), doc.next_object_id());
        assert_eq!(loaded.next_layer_id(), doc.next_layer_id());
        assert!(loaded.layer("evacuation").is_some());
        assert!(loaded.find(target).expect("target").hidden);
        assert_eq!(loaded.dependents(tool), vec![cut]);
        assert_eq!(loaded.block("tag"), doc.block("tag"));
    }

    #[test]
    fn unreadable_object_records_are_skipped() {
        let record = DocumentRecord {
            version: RECORD_VERSION,
            next_id: 10,
            next_layer_id: 1,
            layers: Vec::new(),
            objects: vec![
                json!({"id": 1, "type": "circle", "center": [0.0, 0.0], "radius": 2.0}),
                json!({"id": 2, "type": "mate"}),
            ],
            blocks: Vec::new(),
        };
        let doc = Document::from_record(record, BuildOptions::default()).expect("load");
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.next_object_id(), 10);
    }

    #[test]
    fn newer_versions_are_refused() {
        let record = DocumentRecord {
            version: RECORD_VERSION + 1,
            next_id: 1,
            next_layer_id: 0,
            layers: Vec::new(),
            objects: Vec::new(),
            blocks: Vec::new(),
        };
        assert!(matches!(
            Document::from_record(record, BuildOptions::default()),
            Err(RecordError::UnsupportedVersion { .. })
        ));
    }
}
