use glam::{Mat4, Vec3, Vec4};

use super::Vector3;

/// Column-major 4×4 homogeneous transform.
///
/// Element `12..=14` of [`data`](Self::data) holds the translation. Composition
/// follows the usual column-vector convention: `multiply(a, b)` applies `b`
/// first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4x4(Mat4);

impl Default for Matrix4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Matrix4x4 {
    pub fn identity() -> Self {
        Self(Mat4::IDENTITY)
    }

    pub fn from_data(data: [f32; 16]) -> Self {
        Self(Mat4::from_cols_array(&data))
    }

    /// OpenGL-style orthographic projection; depth maps to `[-1, 1]`.
    ///
    /// Passing `bottom > top` flips y, which is how screen-space pixel
    /// coordinates with y pointing down are expressed.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self(Mat4::orthographic_rh_gl(left, right, bottom, top, near, far))
    }

    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self(Mat4::perspective_rh_gl(fov_y, aspect, near, far))
    }

    pub fn translation(position: Vector3) -> Self {
        Self(Mat4::from_translation(position.into()))
    }

    pub fn rotation_x(angle: f32) -> Self {
        Self(Mat4::from_rotation_x(angle))
    }

    pub fn rotation_y(angle: f32) -> Self {
        Self(Mat4::from_rotation_y(angle))
    }

    pub fn rotation_z(angle: f32) -> Self {
        Self(Mat4::from_rotation_z(angle))
    }

    /// `rz * ry * rx`: x is applied first.
    pub fn rotation_xyz(x: f32, y: f32, z: f32) -> Self {
        let rx = Self::rotation_x(x);
        let ry = Self::rotation_y(y);
        let rz = Self::rotation_z(z);
        Self::multiply(&Self::multiply(&rz, &ry), &rx)
    }

    pub fn scale(scale: Vector3) -> Self {
        Self(Mat4::from_scale(Vec3::from(scale)))
    }

    pub fn multiply(a: &Matrix4x4, b: &Matrix4x4) -> Self {
        Self(a.0 * b.0)
    }

    pub fn data(&self) -> [f32; 16] {
        self.0.to_cols_array()
    }

    pub fn as_mat4(&self) -> &Mat4 {
        &self.0
    }

    pub fn translation_part(&self) -> Vector3 {
        let d = self.data();
        Vector3::new(d[12], d[13], d[14])
    }

    /// Transforms a point (w = 1) and returns the homogeneous result.
    pub fn transform_point4(&self, point: [f32; 3]) -> [f32; 4] {
        (self.0 * Vec4::new(point[0], point[1], point[2], 1.0)).to_array()
    }
}

impl std::ops::Mul for Matrix4x4 {
    type Output = Matrix4x4;

    fn mul(self, rhs: Matrix4x4) -> Matrix4x4 {
        Matrix4x4::multiply(&self, &rhs)
    }
}
