//! Vector, matrix and transform primitives used throughout the scene graph.

mod matrix;
mod transform;
mod vector;

pub use matrix::Matrix4x4;
pub use transform::Transform;
pub use vector::{Vector2, Vector3, VectorJson};

pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}
