use tracing::warn;

use super::{MaterialManager, ShaderManager, TextureManager};
use crate::error::RenderError;
use crate::math::{Matrix4x4, Vector3};
use crate::renderer::{DrawCall, Gpu, RenderView, SpriteVertex};

pub const DEFAULT_SPRITE_SIZE: f32 = 100.0;

/// Model-space vertex before projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Projects model-space vertices into clip-space sprite vertices.
pub(crate) fn project(vertices: &[LocalVertex], model: &Matrix4x4, view: &RenderView, color: [f32; 4]) -> Vec<SpriteVertex> {
    let mvp = view.projection_matrix * view.view_matrix * *model;
    vertices
        .iter()
        .map(|v| SpriteVertex {
            position: mvp.transform_point4(v.position),
            tex_coords: v.tex_coords,
            color,
        })
        .collect()
}

/// A textured quad of `width × height`, anchored at `origin` (0..1 on each axis).
#[derive(Debug, Clone)]
pub struct Sprite {
    name: String,
    material_name: String,
    width: f32,
    height: f32,
    pub origin: Vector3,
    vertices: Vec<LocalVertex>,
    acquired: bool,
}

impl Sprite {
    pub fn new(name: impl Into<String>, material_name: impl Into<String>, width: f32, height: f32) -> Self {
        let mut sprite = Self {
            name: name.into(),
            material_name: material_name.into(),
            width,
            height,
            origin: Vector3::zero(),
            vertices: Vec::new(),
            acquired: false,
        };
        sprite.calculate_vertices();
        sprite
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn material_name(&self) -> &str { &self.material_name }
    pub fn width(&self) -> f32 { self.width }
    pub fn height(&self) -> f32 { self.height }
    pub fn vertices(&self) -> &[LocalVertex] { &self.vertices }

    pub fn set_origin(&mut self, origin: Vector3) {
        self.origin = origin;
        self.calculate_vertices();
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.calculate_vertices();
    }

    /// Two triangles spanning `[-w*ox, w*(1-ox)] × [-h*oy, h*(1-oy)]`.
    fn calculate_vertices(&mut self) {
        let min_x = -(self.width * self.origin.x);
        let max_x = self.width * (1.0 - self.origin.x);
        let min_y = -(self.height * self.origin.y);
        let max_y = self.height * (1.0 - self.origin.y);

        let v = |x: f32, y: f32, u: f32, t: f32| LocalVertex { position: [x, y, 0.0], tex_coords: [u, t] };
        self.vertices = vec![
            v(min_x, min_y, 0.0, 0.0),
            v(min_x, max_y, 0.0, 1.0),
            v(max_x, max_y, 1.0, 1.0),
            v(max_x, max_y, 1.0, 1.0),
            v(max_x, min_y, 1.0, 0.0),
            v(min_x, min_y, 0.0, 0.0),
        ];
    }

    /// Takes a reference on the material.
    pub fn load(
        &mut self,
        materials: &mut MaterialManager,
        textures: &mut TextureManager,
        shaders: &mut ShaderManager,
    ) -> Result<(), RenderError> {
        if self.acquired {
            return Ok(());
        }
        match materials.get_material(&self.material_name, textures, shaders)? {
            Some(_) => self.acquired = true,
            None => warn!(sprite = %self.name, material = %self.material_name, "sprite material is not registered"),
        }
        Ok(())
    }

    /// Retries [`load`](Self::load) for a sprite whose material was not yet
    /// registered when it loaded, such as one read before the materials
    /// manifest arrived.
    pub fn acquire_if_registered(
        &mut self,
        materials: &mut MaterialManager,
        textures: &mut TextureManager,
        shaders: &mut ShaderManager,
    ) {
        if self.acquired || materials.config(&self.material_name).is_none() {
            return;
        }
        if let Err(err) = self.load(materials, textures, shaders) {
            warn!(sprite = %self.name, material = %self.material_name, %err, "sprite material failed to load");
        }
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    pub fn draw(&self, model: &Matrix4x4, view: &RenderView, materials: &MaterialManager, shaders: &ShaderManager, gpu: &Gpu) {
        let material_name = view.global_material.as_deref().unwrap_or(&self.material_name);
        let Some(material) = materials.material(material_name) else {
            return;
        };
        let Some(shader) = shaders.shader_id(material.shader()) else {
            return;
        };
        let vertices = project(&self.vertices, model, view, material.tint.to_float_array());
        gpu.borrow_mut().draw(DrawCall {
            shader,
            texture: material.diffuse_texture().id(),
            vertices,
        });
    }

    /// Releases the material reference taken by [`load`](Self::load).
    pub fn destroy(&mut self, materials: &mut MaterialManager, textures: &mut TextureManager, shaders: &mut ShaderManager) {
        if std::mem::take(&mut self.acquired) {
            materials.release_material(&self.material_name, textures, shaders);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_origin_spans_both_sides() {
        let mut sprite = Sprite::new("s", "m", 100.0, 50.0);
        sprite.set_origin(Vector3::new(0.5, 0.5, 0.0));
        let xs: Vec<f32> = sprite.vertices().iter().map(|v| v.position[0]).collect();
        let ys: Vec<f32> = sprite.vertices().iter().map(|v| v.position[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), -50.0);
        assert_eq!(xs.iter().cloned().fold(f32::MIN, f32::max), 50.0);
        assert_eq!(ys.iter().cloned().fold(f32::MAX, f32::min), -25.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 25.0);
    }

    #[test]
    fn default_origin_is_top_left() {
        let sprite = Sprite::new("s", "m", 10.0, 20.0);
        assert_eq!(sprite.vertices()[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(sprite.vertices()[2].position, [10.0, 20.0, 0.0]);
        assert_eq!(sprite.vertices().len(), 6);
    }
}
