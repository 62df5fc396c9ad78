use std::rc::Rc;

use super::{BASIC_SHADER, BitmapFont, BitmapFontManager, Color, FontMetrics, LocalVertex, ShaderManager, TextureManager};
use super::sprite::project;
use crate::error::RenderError;
use crate::math::{Matrix4x4, Vector3};
use crate::renderer::{DrawCall, Gpu, RenderView};

// ── generate_text_mesh ────────────────────────────────────────────────────────

/// Lays out `text` as two triangles (6 vertices) per glyph, Y pointing down.
///
/// `'\n'` resets X to zero and advances Y by the font size; it produces no
/// geometry. Unknown characters use the `?` glyph when the font has one.
/// The block is shifted by `-(size * origin)` so that `origin` (0..1) picks
/// the anchor point.
pub fn generate_text_mesh(text: &str, font: &FontMetrics, origin: Vector3) -> Vec<LocalVertex> {
    let tw = font.image_width.max(1) as f32;
    let th = font.image_height.max(1) as f32;
    let extent = font.measure_text(text);
    let shift_x = -(extent.x * origin.x);
    let shift_y = -(extent.y * origin.y);

    let mut vertices = Vec::with_capacity(text.len() * 6);
    let mut x = 0.0_f32;
    let mut y = 0.0_f32;

    for ch in text.chars() {
        if ch == '\n' {
            x = 0.0;
            y += font.size;
            continue;
        }
        let Some(glyph) = font.glyph(ch) else {
            continue;
        };

        let min_x = x + glyph.x_offset as f32 + shift_x;
        let min_y = y + glyph.y_offset as f32 + shift_y;
        let max_x = min_x + glyph.width as f32;
        let max_y = min_y + glyph.height as f32;

        let u0 = glyph.x as f32 / tw;
        let v0 = glyph.y as f32 / th;
        let u1 = (glyph.x + glyph.width) as f32 / tw;
        let v1 = (glyph.y + glyph.height) as f32 / th;

        let v = |x: f32, y: f32, u: f32, t: f32| LocalVertex { position: [x, y, 0.0], tex_coords: [u, t] };
        vertices.extend_from_slice(&[
            v(min_x, min_y, u0, v0),
            v(min_x, max_y, u0, v1),
            v(max_x, max_y, u1, v1),
            v(max_x, max_y, u1, v1),
            v(max_x, min_y, u1, v0),
            v(min_x, min_y, u0, v0),
        ]);

        x += glyph.x_advance as f32;
    }
    vertices
}

// ── BitmapText ───────────────────────────────────────────────────────────────

/// A run of text drawn with a [`BitmapFont`].
///
/// The mesh is rebuilt lazily once the font has loaded and whenever the text
/// or origin changes.
pub struct BitmapText {
    name: String,
    font_name: String,
    origin: Vector3,
    text: String,
    pub color: Color,
    font: Option<Rc<BitmapFont>>,
    texture_name: Option<String>,
    vertices: Vec<LocalVertex>,
    dirty: bool,
    shader_acquired: bool,
}

impl BitmapText {
    pub fn new(name: impl Into<String>, font_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            font_name: font_name.into(),
            origin: Vector3::zero(),
            text: String::new(),
            color: Color::WHITE,
            font: None,
            texture_name: None,
            vertices: Vec::new(),
            dirty: true,
            shader_acquired: false,
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn font_name(&self) -> &str { &self.font_name }
    pub fn text(&self) -> &str { &self.text }
    pub fn origin(&self) -> Vector3 { self.origin }
    pub fn vertices(&self) -> &[LocalVertex] { &self.vertices }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.dirty = true;
        }
    }

    pub fn set_origin(&mut self, origin: Vector3) {
        self.origin = origin;
        self.dirty = true;
    }

    /// Resolves the font and takes a reference on the basic shader.
    pub fn load(&mut self, fonts: &BitmapFontManager, shaders: &mut ShaderManager) -> Result<(), RenderError> {
        if self.font.is_none() {
            self.font = fonts.get_font(&self.font_name);
            if self.font.is_none() {
                tracing::warn!(text = %self.name, font = %self.font_name, "font is not registered");
            }
        }
        if !self.shader_acquired {
            self.shader_acquired = shaders.get_shader(BASIC_SHADER)?.is_some();
        }
        Ok(())
    }

    /// Picks up the atlas texture and rebuilds the mesh once the font is ready.
    pub fn update(&mut self, textures: &mut TextureManager) {
        let Some(font) = &self.font else {
            return;
        };
        if self.texture_name.is_none() {
            let Some(name) = font.texture_name() else {
                return;
            };
            textures.get_texture(&name);
            self.texture_name = Some(name);
        }
        if self.dirty {
            if let Some(vertices) = font.with_metrics(|m| generate_text_mesh(&self.text, m, self.origin)) {
                self.vertices = vertices;
                self.dirty = false;
            }
        }
    }

    pub fn draw(&self, model: &Matrix4x4, view: &RenderView, textures: &TextureManager, shaders: &ShaderManager, gpu: &Gpu) {
        if self.vertices.is_empty() {
            return;
        }
        let Some(texture) = self.texture_name.as_deref().and_then(|n| textures.texture(n)) else {
            return;
        };
        let Some(shader) = shaders.shader_id(BASIC_SHADER) else {
            return;
        };
        gpu.borrow_mut().draw(DrawCall {
            shader,
            texture: texture.id(),
            vertices: project(&self.vertices, model, view, self.color.to_float_array()),
        });
    }

    pub fn destroy(&mut self, textures: &mut TextureManager, shaders: &mut ShaderManager) {
        if let Some(name) = self.texture_name.take() {
            textures.release_texture(&name);
        }
        if std::mem::take(&mut self.shader_acquired) {
            shaders.release_shader(BASIC_SHADER);
        }
        self.vertices.clear();
        self.dirty = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> FontMetrics {
        let content = "info face=test size=20\n\
common lineHeight=20 base=16 scaleW=100 scaleH=50\n\
page id=0 file=\"atlas.png\"\n\
chars count=2\n\
char id=63 x=0 y=0 width=10 height=10 xoffset=0 yoffset=0 xadvance=12 page=0 chnl=15\n\
char id=66 x=10 y=0 width=10 height=20 xoffset=1 yoffset=2 xadvance=11 page=0 chnl=15\n";
        FontMetrics::parse(content, "").unwrap()
    }

    #[test]
    fn six_vertices_per_glyph() {
        let vertices = generate_text_mesh("BB?", &metrics(), Vector3::zero());
        assert_eq!(vertices.len(), 18);
    }

    #[test]
    fn newline_resets_x_and_advances_by_size() {
        let vertices = generate_text_mesh("B\nB", &metrics(), Vector3::zero());
        assert_eq!(vertices.len(), 12);
        assert_eq!(vertices[6].position, [1.0, 22.0, 0.0]);
    }

    #[test]
    fn uvs_are_normalised_by_atlas_size() {
        let vertices = generate_text_mesh("B", &metrics(), Vector3::zero());
        assert_eq!(vertices[0].tex_coords, [0.1, 0.0]);
        assert_eq!(vertices[2].tex_coords, [0.2, 0.4]);
    }

    #[test]
    fn origin_shifts_the_block() {
        let vertices = generate_text_mesh("B", &metrics(), Vector3::new(1.0, 0.0, 0.0));
        // advance 11, so the block starts at -11 plus the 1px offset
        assert_eq!(vertices[0].position[0], -10.0);
    }
}
