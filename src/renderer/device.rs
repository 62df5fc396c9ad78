use std::cell::RefCell;
use std::rc::Rc;

use crate::error::RenderError;
use crate::graphics::{Color, ShaderSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

/// How an uploaded image is sampled. Filtering is always linear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSampling {
    pub generate_mipmaps: bool,
    pub wrap: TextureWrap,
}

impl TextureSampling {
    /// Mipmapped + repeat for power-of-two images, clamp-to-edge otherwise.
    pub fn for_size(width: u32, height: u32) -> Self {
        if width.is_power_of_two() && height.is_power_of_two() {
            Self { generate_mipmaps: true, wrap: TextureWrap::Repeat }
        } else {
            Self { generate_mipmaps: false, wrap: TextureWrap::ClampToEdge }
        }
    }
}

/// Clip-space vertex; positions are already multiplied by
/// `projection * view * model` on the CPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 4],
    pub tex_coords: [f32; 2],
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub shader: ShaderId,
    pub texture: TextureId,
    pub vertices: Vec<SpriteVertex>,
}

/// The GPU operations the engine needs. Implemented by the wgpu backend and
/// by [`HeadlessDevice`](super::HeadlessDevice).
pub trait GraphicsDevice {
    fn create_texture(&mut self, label: &str) -> TextureId;

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, rgba: &[u8], sampling: TextureSampling);

    fn destroy_texture(&mut self, id: TextureId);

    /// Fails with [`RenderError::ShaderCompile`] carrying the compiler log.
    fn compile_shader(&mut self, source: &ShaderSource) -> Result<ShaderId, RenderError>;

    fn destroy_shader(&mut self, id: ShaderId);

    fn resize(&mut self, width: u32, height: u32);

    fn begin_frame(&mut self, clear: Color);

    fn draw(&mut self, call: DrawCall);

    fn end_frame(&mut self) -> Result<(), RenderError>;
}

/// Shared, single-threaded handle to the active device.
pub type Gpu = Rc<RefCell<dyn GraphicsDevice>>;

pub fn shared<D: GraphicsDevice + 'static>(device: D) -> (Rc<RefCell<D>>, Gpu) {
    let concrete = Rc::new(RefCell::new(device));
    let gpu: Gpu = concrete.clone();
    (concrete, gpu)
}
