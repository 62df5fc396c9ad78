//! GPU-backed resources: textures, shaders, materials, sprites and bitmap text.
//!
//! Textures, shaders and materials are reference counted by their managers;
//! the last release frees the GPU object.

mod color;
mod font;
mod material;
mod shader;
mod sprite;
mod text;
mod texture;

pub use color::Color;
pub use font::{BitmapFont, BitmapFontManager, FALLBACK_GLYPH, FontMetrics, Glyph};
pub use material::{Material, MaterialConfig, MaterialManager};
pub use shader::{BASIC_SHADER, ShaderManager, ShaderSource};
pub use sprite::{DEFAULT_SPRITE_SIZE, LocalVertex, Sprite};
pub use text::{BitmapText, generate_text_mesh};
pub use texture::{PLACEHOLDER_PIXEL, Texture, TextureManager};
