mod device;
mod headless;
mod view;
mod viewport;
mod wgpu_device;

pub use device::{DrawCall, GraphicsDevice, Gpu, ShaderId, SpriteVertex, TextureId, TextureSampling, TextureWrap, shared};
pub use headless::{HeadlessDevice, TextureRecord};
pub use view::RenderView;
pub use viewport::{ProjectionType, RendererViewport};
pub use wgpu_device::WgpuDevice;

use crate::context::EngineContext;
use crate::error::RenderError;
use crate::graphics::Color;
use crate::level::Level;

/// Drives one frame: clear, set up the view, draw the active level, present.
pub struct Renderer {
    viewport: RendererViewport,
    view: RenderView,
    clear_color: Color,
}

impl Renderer {
    pub fn new(width: u32, height: u32, near: f32, far: f32, clear_color: Color) -> Self {
        Self {
            viewport: RendererViewport::new(width as f32, height as f32, near, far),
            view: RenderView::default(),
            clear_color,
        }
    }

    pub fn viewport(&self) -> &RendererViewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut RendererViewport {
        &mut self.viewport
    }

    /// The view handed to the scene on the last frame.
    pub fn view(&self) -> &RenderView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut RenderView {
        &mut self.view
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Resizes the surface; the projection is rebuilt on the next frame.
    pub fn on_resize(&mut self, width: u32, height: u32, gpu: &Gpu) {
        self.viewport.on_resize(width as f32, height as f32);
        gpu.borrow_mut().resize(width, height);
    }

    pub fn render(&mut self, delta_time: f32, level: Option<&Level>, ctx: &EngineContext) -> Result<(), RenderError> {
        ctx.gpu.borrow_mut().begin_frame(self.clear_color);

        self.view.delta_time = delta_time;
        self.view.fov = self.viewport.fov();
        self.view.set_projection(self.viewport.projection_matrix());
        self.view.view_matrix = level.and_then(Level::camera_view).unwrap_or_default();

        if let Some(level) = level {
            level.render(&self.view, ctx);
        }
        ctx.gpu.borrow_mut().end_frame()
    }
}
