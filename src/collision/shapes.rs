use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SceneError;
use crate::math::Vector2;

// ── Rectangle2D ──────────────────────────────────────────────────────────────

/// Axis-aligned rectangle whose top-left corner sits at `position`.
///
/// Width and height may be negative; [`min`](Self::min) and [`max`](Self::max)
/// always return the true corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle2D {
    pub position: Vector2,
    pub origin: Vector2,
    pub width: f32,
    pub height: f32,
}

impl Default for Rectangle2D {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Rectangle2D {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { position: Vector2::new(x, y), origin: Vector2::new(0.5, 0.5), width, height }
    }

    /// Shift from the owner's position to the rectangle's corner.
    pub fn offset(&self) -> Vector2 {
        Vector2::new(-(self.width * self.origin.x), -(self.height * self.origin.y))
    }

    pub fn min(&self) -> Vector2 {
        Vector2::new(
            self.position.x.min(self.position.x + self.width),
            self.position.y.min(self.position.y + self.height),
        )
    }

    pub fn max(&self) -> Vector2 {
        Vector2::new(
            self.position.x.max(self.position.x + self.width),
            self.position.y.max(self.position.y + self.height),
        )
    }

    /// Edges touching counts as overlap.
    pub fn overlaps(&self, other: &Rectangle2D) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Closest point of the rectangle to `point`.
    fn clamp(&self, point: Vector2) -> Vector2 {
        let (min, max) = (self.min(), self.max());
        Vector2::new(point.x.clamp(min.x, max.x), point.y.clamp(min.y, max.y))
    }
}

// ── Circle2D ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Circle2D {
    pub position: Vector2,
    pub origin: Vector2,
    pub radius: f32,
}

impl Circle2D {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { position: Vector2::new(x, y), origin: Vector2::zero(), radius }
    }

    pub fn offset(&self) -> Vector2 {
        Vector2::new(self.radius + self.radius * self.origin.x, self.radius + self.radius * self.origin.y)
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        Vector2::distance(self.position, point) <= self.radius
    }

    fn touches_rectangle(&self, rect: &Rectangle2D) -> bool {
        let closest = rect.clamp(self.position);
        let dx = self.position.x - closest.x;
        let dy = self.position.y - closest.y;
        dx * dx + dy * dy < self.radius * self.radius
    }
}

// ── Shape2D ──────────────────────────────────────────────────────────────────

/// A collision shape. Positions are in scene units with y pointing down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape2D {
    Rectangle(Rectangle2D),
    Circle(Circle2D),
}

#[derive(Deserialize)]
struct ShapeJson {
    #[serde(rename = "type")]
    kind: Option<String>,
    position: Option<Value>,
    origin: Option<Value>,
    width: Option<f32>,
    height: Option<f32>,
    radius: Option<f32>,
}

impl Shape2D {
    /// Builds a shape from `{type: "rectangle"|"circle", ...}`; the type is
    /// matched case-insensitively.
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = ShapeJson::deserialize(json).map_err(SceneError::json("shape"))?;
        let kind = raw
            .kind
            .ok_or(SceneError::MissingField { kind: "collision shape", field: "type" })?
            .to_lowercase();

        let mut shape = match kind.as_str() {
            "rectangle" => Shape2D::Rectangle(Rectangle2D::new(
                0.0,
                0.0,
                raw.width.ok_or(SceneError::MissingField { kind: "rectangle", field: "width" })?,
                raw.height.ok_or(SceneError::MissingField { kind: "rectangle", field: "height" })?,
            )),
            "circle" => Shape2D::Circle(Circle2D::new(
                0.0,
                0.0,
                raw.radius.ok_or(SceneError::MissingField { kind: "circle", field: "radius" })?,
            )),
            _ => return Err(SceneError::UnsupportedShape(kind)),
        };

        let (position, origin) = shape.anchors_mut();
        if let Some(value) = &raw.position {
            position.set_from_json(value)?;
        }
        if let Some(value) = &raw.origin {
            origin.set_from_json(value)?;
        }
        Ok(shape)
    }

    fn anchors_mut(&mut self) -> (&mut Vector2, &mut Vector2) {
        match self {
            Shape2D::Rectangle(r) => (&mut r.position, &mut r.origin),
            Shape2D::Circle(c) => (&mut c.position, &mut c.origin),
        }
    }

    pub fn position(&self) -> Vector2 {
        match self {
            Shape2D::Rectangle(r) => r.position,
            Shape2D::Circle(c) => c.position,
        }
    }

    pub fn offset(&self) -> Vector2 {
        match self {
            Shape2D::Rectangle(r) => r.offset(),
            Shape2D::Circle(c) => c.offset(),
        }
    }

    /// Places the shape at `anchor + offset`.
    pub fn place_at(&mut self, anchor: Vector2) {
        let offset = self.offset();
        let (position, _) = self.anchors_mut();
        position.copy_from(anchor).add(offset);
    }

    pub fn intersects(&self, other: &Shape2D) -> bool {
        match (self, other) {
            (Shape2D::Rectangle(a), Shape2D::Rectangle(b)) => a.overlaps(b),
            (Shape2D::Circle(a), Shape2D::Circle(b)) => {
                Vector2::distance(a.position, b.position) <= a.radius + b.radius
            }
            (Shape2D::Circle(c), Shape2D::Rectangle(r)) | (Shape2D::Rectangle(r), Shape2D::Circle(c)) => {
                c.touches_rectangle(r)
            }
        }
    }

    pub fn point_in_shape(&self, point: Vector2) -> bool {
        match self {
            Shape2D::Rectangle(r) => r.contains_point(point),
            Shape2D::Circle(c) => c.contains_point(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn touching_rectangles_overlap() {
        let a = Rectangle2D::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle2D::new(10.0, 10.0, 5.0, 5.0);
        let c = Rectangle2D::new(10.1, 0.0, 5.0, 5.0);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn negative_extents_use_true_corners() {
        let a = Rectangle2D::new(10.0, 10.0, -10.0, -10.0);
        assert_eq!(a.min(), Vector2::new(0.0, 0.0));
        assert_eq!(a.max(), Vector2::new(10.0, 10.0));
        assert!(a.overlaps(&Rectangle2D::new(2.0, 2.0, 1.0, 1.0)));
        assert!(a.contains_point(Vector2::new(5.0, 5.0)));
    }

    #[test]
    fn circle_rectangle_is_symmetric() {
        let circle = Shape2D::Circle(Circle2D::new(-2.0, 5.0, 3.0));
        let rect = Shape2D::Rectangle(Rectangle2D::new(0.0, 0.0, 10.0, 10.0));
        assert!(circle.intersects(&rect));
        assert!(rect.intersects(&circle));

        let far = Shape2D::Circle(Circle2D::new(-5.0, 5.0, 3.0));
        assert!(!far.intersects(&rect));
    }

    #[test]
    fn circles_touching_at_radius_sum_intersect() {
        let a = Shape2D::Circle(Circle2D::new(0.0, 0.0, 1.0));
        let b = Shape2D::Circle(Circle2D::new(2.0, 0.0, 1.0));
        assert!(a.intersects(&b));
    }

    #[test]
    fn shape_json_requires_type_and_size() {
        assert!(matches!(
            Shape2D::from_json(&json!({"width": 1, "height": 1})),
            Err(SceneError::MissingField { field: "type", .. })
        ));
        assert!(matches!(
            Shape2D::from_json(&json!({"type": "rectangle", "width": 1})),
            Err(SceneError::MissingField { field: "height", .. })
        ));
        assert!(matches!(
            Shape2D::from_json(&json!({"type": "triangle"})),
            Err(SceneError::UnsupportedShape(t)) if t == "triangle"
        ));
    }

    #[test]
    fn rectangle_defaults_to_centred_origin() {
        let shape = Shape2D::from_json(&json!({"type": "Rectangle", "width": 20, "height": 10})).unwrap();
        assert_eq!(shape.offset(), Vector2::new(-10.0, -5.0));
    }
}
