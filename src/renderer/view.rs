use crate::math::{Matrix4x4, Vector3};

/// Per-pass render parameters handed down the scene graph.
#[derive(Debug, Clone, Default)]
pub struct RenderView {
    pub view_matrix: Matrix4x4,
    pub projection_matrix: Matrix4x4,
    pub fov: f32,
    /// Mirrors the projection vertically (render-to-texture passes).
    pub flip_projection: bool,
    pub delta_time: f32,
    /// When set, every sprite draws with this material instead of its own.
    pub global_material: Option<String>,
}

impl RenderView {
    /// Installs `projection`, applying the vertical flip if requested.
    pub fn set_projection(&mut self, projection: Matrix4x4) {
        self.projection_matrix = if self.flip_projection {
            Matrix4x4::scale(Vector3::new(1.0, -1.0, 1.0)) * projection
        } else {
            projection
        };
    }
}
