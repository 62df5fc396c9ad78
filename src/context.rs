use std::sync::Arc;

use crate::assets::{AssetManager, AssetSource};
use crate::behaviors::Behavior;
use crate::collision::CollisionManager;
use crate::components::Component;
use crate::error::SceneError;
use crate::graphics::{BitmapFontManager, MaterialManager, ShaderManager, TextureManager};
use crate::input::InputManager;
use crate::math::Vector2;
use crate::message::MessageBus;
use crate::page::PageConfig;
use crate::registry::BuilderRegistry;
use crate::renderer::Gpu;

/// Everything one engine instance owns apart from its levels.
///
/// Scene traversal borrows the context mutably while the scene graph itself
/// lives in the level, so hooks can reach every manager at once.
pub struct EngineContext {
    pub bus: MessageBus,
    pub gpu: Gpu,
    pub assets: AssetManager,
    pub textures: TextureManager,
    pub shaders: ShaderManager,
    pub materials: MaterialManager,
    pub fonts: BitmapFontManager,
    pub collisions: CollisionManager,
    pub input: InputManager,
    pub components: BuilderRegistry<Component>,
    pub behaviors: BuilderRegistry<Behavior>,
    pub pages: BuilderRegistry<PageConfig>,
    /// Size of the render target in scene units.
    pub viewport_size: Vector2,
}

impl EngineContext {
    /// Wires the managers together and registers the built-in builders.
    pub fn new(
        gpu: Gpu,
        source: Arc<dyn AssetSource>,
        messages_per_update: usize,
        viewport_size: Vector2,
    ) -> Result<Self, SceneError> {
        let bus = MessageBus::new(messages_per_update);
        let assets = AssetManager::new(bus.clone(), source);
        Ok(Self {
            textures: TextureManager::new(gpu.clone(), bus.clone(), assets.clone()),
            shaders: ShaderManager::new(gpu.clone()),
            materials: MaterialManager::new(),
            fonts: BitmapFontManager::new(),
            collisions: CollisionManager::new(bus.clone()),
            input: InputManager::new(bus.clone()),
            components: Component::registry()?,
            behaviors: Behavior::registry()?,
            pages: PageConfig::registry()?,
            viewport_size,
            assets,
            gpu,
            bus,
        })
    }
}
