use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::assets::{AssetManager, ImageAsset};
use crate::message::{Message, MessageBus, MessageHandler, Subscriber, asset_loaded_code};
use crate::renderer::{Gpu, TextureId, TextureSampling};

/// Single opaque white pixel uploaded until the real image arrives.
pub const PLACEHOLDER_PIXEL: [u8; 4] = [255, 255, 255, 255];

/// A GPU texture backed by an image asset.
///
/// Starts as a 1×1 placeholder so it can be drawn immediately; re-uploads
/// itself when the image asset's load-complete message arrives.
pub struct Texture {
    name: String,
    gpu: Gpu,
    id: TextureId,
    width: Cell<u32>,
    height: Cell<u32>,
    loaded: Cell<bool>,
    subscribed: Cell<bool>,
}

impl Texture {
    pub(crate) fn create(name: &str, gpu: Gpu, assets: &AssetManager, bus: &MessageBus) -> Rc<Self> {
        let id = gpu.borrow_mut().create_texture(name);
        gpu.borrow_mut()
            .upload_texture(id, 1, 1, &PLACEHOLDER_PIXEL, TextureSampling::for_size(1, 1));

        let texture = Rc::new(Self {
            name: name.to_owned(),
            gpu,
            id,
            width: Cell::new(1),
            height: Cell::new(1),
            loaded: Cell::new(false),
            subscribed: Cell::new(false),
        });

        match assets.get_asset(name) {
            Some(asset) => match asset.as_image() {
                Some(image) => texture.load_from_image(image),
                None => warn!(texture = name, "asset is not an image"),
            },
            None => {
                bus.subscribe(asset_loaded_code(name), Subscriber::handler(&texture));
                texture.subscribed.set(true);
            }
        }
        texture
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn id(&self) -> TextureId { self.id }
    pub fn width(&self) -> u32 { self.width.get() }
    pub fn height(&self) -> u32 { self.height.get() }
    pub fn is_loaded(&self) -> bool { self.loaded.get() }

    fn load_from_image(&self, image: &ImageAsset) {
        let sampling = TextureSampling::for_size(image.width, image.height);
        self.gpu
            .borrow_mut()
            .upload_texture(self.id, image.width, image.height, &image.pixels, sampling);
        self.width.set(image.width);
        self.height.set(image.height);
        self.loaded.set(true);
        debug!(texture = %self.name, width = image.width, height = image.height, "texture uploaded");
    }

    fn destroy(self: &Rc<Self>, bus: &MessageBus) {
        if self.subscribed.replace(false) {
            bus.unsubscribe(&asset_loaded_code(&self.name), &Subscriber::handler(self));
        }
        self.gpu.borrow_mut().destroy_texture(self.id);
    }
}

impl MessageHandler for Texture {
    fn on_message(&self, message: &Message) {
        if message.code != asset_loaded_code(&self.name) {
            return;
        }
        match message.asset().and_then(|a| a.as_image()) {
            Some(image) => self.load_from_image(image),
            None => warn!(texture = %self.name, "load-complete message carried no image"),
        }
    }
}

struct TextureNode {
    texture: Rc<Texture>,
    reference_count: usize,
}

/// Reference-counted cache of textures keyed by image asset name.
pub struct TextureManager {
    gpu: Gpu,
    bus: MessageBus,
    assets: AssetManager,
    textures: HashMap<String, TextureNode>,
}

impl TextureManager {
    pub fn new(gpu: Gpu, bus: MessageBus, assets: AssetManager) -> Self {
        Self { gpu, bus, assets, textures: HashMap::new() }
    }

    pub fn get_texture(&mut self, name: &str) -> Rc<Texture> {
        if let Some(node) = self.textures.get_mut(name) {
            node.reference_count += 1;
            return Rc::clone(&node.texture);
        }
        let texture = Texture::create(name, self.gpu.clone(), &self.assets, &self.bus);
        self.textures.insert(
            name.to_owned(),
            TextureNode { texture: Rc::clone(&texture), reference_count: 1 },
        );
        texture
    }

    pub fn release_texture(&mut self, name: &str) {
        let Some(node) = self.textures.get_mut(name) else {
            warn!(texture = name, "a texture named {name} does not exist and therefore cannot be released");
            return;
        };
        node.reference_count = node.reference_count.saturating_sub(1);
        if node.reference_count < 1 {
            if let Some(node) = self.textures.remove(name) {
                node.texture.destroy(&self.bus);
                debug!(texture = name, "texture evicted");
            }
        }
    }

    /// Looks up a cached texture without touching its reference count.
    pub fn texture(&self, name: &str) -> Option<&Rc<Texture>> {
        self.textures.get(name).map(|node| &node.texture)
    }

    pub fn reference_count(&self, name: &str) -> Option<usize> {
        self.textures.get(name).map(|node| node.reference_count)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
