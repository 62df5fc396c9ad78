use std::cell::Cell;

use crate::math::{Matrix4x4, deg_to_rad};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionType {
    #[default]
    Orthographic,
    Perspective,
}

/// The render target rectangle and its projection.
///
/// The projection is regenerated lazily: setters only mark it dirty and the
/// next [`projection_matrix`](Self::projection_matrix) call rebuilds it.
#[derive(Debug, Clone)]
pub struct RendererViewport {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    fov: f32,
    near: f32,
    far: f32,
    projection_type: ProjectionType,
    projection: Cell<Matrix4x4>,
    dirty: Cell<bool>,
}

impl RendererViewport {
    pub fn new(width: f32, height: f32, near: f32, far: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            fov: deg_to_rad(45.0),
            near,
            far,
            projection_type: ProjectionType::Orthographic,
            projection: Cell::new(Matrix4x4::identity()),
            dirty: Cell::new(true),
        }
    }

    pub fn x(&self) -> f32 { self.x }
    pub fn y(&self) -> f32 { self.y }
    pub fn width(&self) -> f32 { self.width }
    pub fn height(&self) -> f32 { self.height }
    pub fn fov(&self) -> f32 { self.fov }
    pub fn near(&self) -> f32 { self.near }
    pub fn far(&self) -> f32 { self.far }
    pub fn projection_type(&self) -> ProjectionType { self.projection_type }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
        self.dirty.set(true);
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.dirty.set(true);
    }

    /// Field of view in radians; only used by [`ProjectionType::Perspective`].
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.dirty.set(true);
    }

    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.dirty.set(true);
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.dirty.set(true);
    }

    pub fn on_resize(&mut self, width: f32, height: f32) {
        self.set_size(width, height);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn projection_matrix(&self) -> Matrix4x4 {
        if self.dirty.replace(false) {
            self.projection.set(self.regenerate());
        }
        self.projection.get()
    }

    fn regenerate(&self) -> Matrix4x4 {
        match self.projection_type {
            // y runs down the screen, so bottom = height and top = y.
            ProjectionType::Orthographic => {
                Matrix4x4::orthographic(self.x, self.width, self.height, self.y, self.near, self.far)
            }
            ProjectionType::Perspective => {
                let aspect = if self.height > 0.0 { self.width / self.height } else { 1.0 };
                Matrix4x4::perspective(self.fov, aspect, self.near.max(0.01), self.far)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_clip(m: &Matrix4x4, screen: (f32, f32), expected: (f32, f32)) {
        let p = m.transform_point4([screen.0, screen.1, 0.0]);
        let (x, y) = (p[0] / p[3], p[1] / p[3]);
        assert!((x - expected.0).abs() < 1e-5 && (y - expected.1).abs() < 1e-5, "{screen:?} -> ({x}, {y})");
    }

    #[test]
    fn orthographic_maps_screen_corners() {
        let viewport = RendererViewport::new(800.0, 600.0, -100.0, 100.0);
        let m = viewport.projection_matrix();
        assert_clip(&m, (0.0, 0.0), (-1.0, 1.0));
        assert_clip(&m, (800.0, 600.0), (1.0, -1.0));
    }

    #[test]
    fn projection_is_rebuilt_after_resize() {
        let mut viewport = RendererViewport::new(100.0, 100.0, -1.0, 1.0);
        let before = viewport.projection_matrix();
        assert!(!viewport.is_dirty());
        viewport.on_resize(200.0, 50.0);
        assert!(viewport.is_dirty());
        assert_ne!(viewport.projection_matrix(), before);
        assert!(!viewport.is_dirty());
    }

    #[test]
    fn perspective_uses_aspect_ratio() {
        let mut viewport = RendererViewport::new(200.0, 100.0, 0.1, 100.0);
        viewport.set_projection_type(ProjectionType::Perspective);
        let data = viewport.projection_matrix().data();
        assert!((data[5] / data[0] - 2.0).abs() < 1e-5);
    }
}
