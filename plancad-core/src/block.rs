//! 块定义与块参照。
//!
//! 块定义持有一组以基点为原点的图元副本，不属于注册表；块参照只保存块名与放置参数，
//! 绘制和查询时才把定义中的几何变换到世界坐标。

use serde::{Deserialize, Serialize};

use crate::document::{Document, DocumentError, SceneObject};
use crate::draw::{Canvas, Placement, draw_error_marker};
use crate::entity::{SnapKind, SnapPoint};
use crate::geometry::{Bounds2D, Point2, Transform2, Vector2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub name: String,
    pub base_point: Point2,
    pub objects: Vec<SceneObject>,
}

impl BlockDefinition {
    /// 复制 `objects` 并平移到以 `base_point` 为原点的局部坐标。
    /// 副本使用文档新分配的 ID；派生实体、编组和块参照不能放入块。
    pub fn from_objects(
        name: impl Into<String>,
        base_point: Point2,
        objects: &[SceneObject],
        document: &mut Document,
    ) -> Result<Self, DocumentError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DocumentError::InvalidBlockName(name));
        }
        if objects.is_empty() {
            return Err(DocumentError::EmptyBlock(name));
        }
        let to_local = Transform2::Translate(Vector2::from_points(base_point, Point2::origin()));
        let mut local = Vec::with_capacity(objects.len());
        for object in objects {
            if !object.entity.is_primitive() {
                return Err(DocumentError::UnsupportedBlockMember {
                    id: object.id,
                    kind: object.entity.record_tag(),
                });
            }
            let mut entity = object.entity.clone();
            entity.apply_local(&to_local);
            local.push(SceneObject {
                id: document.allocate_id(),
                hidden: false,
                layer: object.layer.clone(),
                entity,
            });
        }
        Ok(Self {
            name,
            base_point,
            objects: local,
        })
    }

    /// 局部坐标下的包围盒。
    pub fn local_bounds(&self) -> Bounds2D {
        let mut bounds = Bounds2D::empty();
        for object in &self.objects {
            if let Some(primitive) = object.entity.as_primitive() {
                bounds.include_bounds(&primitive.bounds());
            }
        }
        bounds
    }
}

fn unit_scale() -> Vector2 {
    Vector2::new(1.0, 1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReference {
    pub name: String,
    pub insert: Point2,
    #[serde(default = "unit_scale")]
    pub scale: Vector2,
    #[serde(default)]
    pub rotation: f64,
}

impl BlockReference {
    pub fn new(name: impl Into<String>, insert: Point2) -> Self {
        Self {
            name: name.into(),
            insert,
            scale: unit_scale(),
            rotation: 0.0,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            translation: Vector2::from_points(Point2::origin(), self.insert),
            rotation: self.rotation,
            scale: self.scale,
        }
    }

    /// 块名无法解析时退化为插入点处的零尺寸包围盒。
    pub fn bounds(&self, definition: Option<&BlockDefinition>) -> Bounds2D {
        let Some(definition) = definition else {
            return Bounds2D::point(self.insert);
        };
        let local = definition.local_bounds();
        if local.is_empty() {
            return Bounds2D::point(self.insert);
        }
        let placement = self.placement();
        Bounds2D::from_points(local.corners().map(|corner| placement.apply(corner)))
    }

    pub fn contains(
        &self,
        definition: Option<&BlockDefinition>,
        point: Point2,
        tolerance: f64,
    ) -> bool {
        let Some(definition) = definition else {
            return self.insert.distance(point) <= tolerance;
        };
        let placement = self.placement();
        let Some(local) = placement.inverse_apply(point) else {
            return false;
        };
        let factor = self.scale.x().abs().min(self.scale.y().abs()).max(f64::EPSILON);
        let local_tolerance = tolerance / factor;
        definition.objects.iter().any(|object| {
            object
                .entity
                .as_primitive()
                .is_some_and(|primitive| primitive.contains(local, local_tolerance))
        })
    }

    pub fn draw(&self, definition: Option<&BlockDefinition>, canvas: &mut dyn Canvas) {
        let Some(definition) = definition else {
            draw_error_marker(canvas, self.insert);
            return;
        };
        canvas.push_transform(self.placement());
        for object in &definition.objects {
            if let Some(primitive) = object.entity.as_primitive() {
                primitive.draw(canvas);
            }
        }
        canvas.pop_transform();
    }

    pub fn snap_points(&self) -> Vec<SnapPoint> {
        vec![SnapPoint::new(self.insert, SnapKind::Insertion)]
    }

    pub(crate) fn apply(&mut self, transform: &Transform2) {
        self.insert = transform.apply(self.insert);
        match *transform {
            Transform2::Translate(_) => {}
            Transform2::Rotate { angle, .. } => self.rotation += angle,
            Transform2::Scale { sx, sy, .. } => {
                if self.rotation.sin().abs() <= 1e-9 {
                    // 轴对齐时缩放与旋转可交换，按轴精确缩放
                    self.scale = Vector2::new(self.scale.x() * sx, self.scale.y() * sy);
                } else {
                    self.rotation = transform.apply_angle(self.rotation);
                    let factor = transform.length_factor();
                    let y_sign = if transform.mirrors() { -1.0 } else { 1.0 };
                    self.scale = Vector2::new(
                        self.scale.x() * factor,
                        self.scale.y() * factor * y_sign,
                    );
                }
            }
        }
    }
}
