use std::collections::HashMap;

use tracing::trace;

use super::device::{DrawCall, GraphicsDevice, ShaderId, TextureId, TextureSampling};
use crate::error::RenderError;
use crate::graphics::{Color, ShaderSource};

#[derive(Debug, Clone, PartialEq)]
pub struct TextureRecord {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub sampling: Option<TextureSampling>,
    pub uploads: usize,
}

/// A device that draws nothing and remembers everything it was asked to do.
///
/// Used for tests and for running the engine without a window. Shader sources
/// containing `@compile_error` fail to compile so error paths can be exercised.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    pub textures: HashMap<TextureId, TextureRecord>,
    pub shaders: HashMap<ShaderId, String>,
    pub destroyed_textures: usize,
    pub destroyed_shaders: usize,
    pub size: (u32, u32),
    pub frames: usize,
    pub clear_color: Option<Color>,
    /// Draw calls of the frame in progress, or of the last finished frame.
    pub draws: Vec<DrawCall>,
}

impl HeadlessDevice {
    pub fn new(width: u32, height: u32) -> Self {
        Self { size: (width, height), ..Self::default() }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn texture(&self, id: TextureId) -> Option<&TextureRecord> {
        self.textures.get(&id)
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_texture(&mut self, label: &str) -> TextureId {
        let id = TextureId(self.next());
        self.textures.insert(
            id,
            TextureRecord { label: label.to_owned(), width: 0, height: 0, sampling: None, uploads: 0 },
        );
        id
    }

    fn upload_texture(&mut self, id: TextureId, width: u32, height: u32, _rgba: &[u8], sampling: TextureSampling) {
        if let Some(record) = self.textures.get_mut(&id) {
            record.width = width;
            record.height = height;
            record.sampling = Some(sampling);
            record.uploads += 1;
        }
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if self.textures.remove(&id).is_some() {
            self.destroyed_textures += 1;
        }
    }

    fn compile_shader(&mut self, source: &ShaderSource) -> Result<ShaderId, RenderError> {
        if source.wgsl.contains("@compile_error") {
            return Err(RenderError::ShaderCompile {
                name: source.name.clone(),
                log: "forced failure".into(),
            });
        }
        let id = ShaderId(self.next());
        self.shaders.insert(id, source.name.clone());
        Ok(id)
    }

    fn destroy_shader(&mut self, id: ShaderId) {
        if self.shaders.remove(&id).is_some() {
            self.destroyed_shaders += 1;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn begin_frame(&mut self, clear: Color) {
        self.clear_color = Some(clear);
        self.draws.clear();
    }

    fn draw(&mut self, call: DrawCall) {
        trace!(vertices = call.vertices.len(), "headless draw");
        self.draws.push(call);
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.frames += 1;
        Ok(())
    }
}
