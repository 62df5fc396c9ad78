//! Extension-dispatched asset loading with a load-once cache.
//!
//! Fetch and decode run on a short-lived loader thread per asset; results are
//! collected on the engine thread by [`AssetManager::update`], which caches
//! them and announces each one on the message bus under
//! [`asset_loaded_code`](crate::message::asset_loaded_code).

mod loaders;
mod source;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, warn};

pub use loaders::{AssetLoader, ImageAssetLoader, JsonAssetLoader, TextAssetLoader, extension_of};
pub use source::{AssetSource, FileSource, MemorySource};

use crate::error::AssetError;
use crate::message::{MessageBus, Payload, asset_failed_code, asset_loaded_code};

// ── Assets ──────────────────────────────────────────────────────────────────

/// Decoded RGBA8 image.
#[derive(Clone)]
pub struct ImageAsset {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct JsonAsset {
    pub name: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct TextAsset {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone)]
pub enum Asset {
    Image(ImageAsset),
    Json(JsonAsset),
    Text(TextAsset),
}

impl Asset {
    pub fn name(&self) -> &str {
        match self {
            Asset::Image(a) => &a.name,
            Asset::Json(a) => &a.name,
            Asset::Text(a) => &a.name,
        }
    }

    pub fn as_image(&self) -> Option<&ImageAsset> {
        match self {
            Asset::Image(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Asset::Json(a) => Some(&a.data),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Asset::Text(a) => Some(&a.data),
            _ => None,
        }
    }
}

// ── Load tasks ──────────────────────────────────────────────────────────────

/// Handle to an in-flight load. Cancelling drops the result when it arrives;
/// no load-complete message is sent for a cancelled load.
#[derive(Debug, Clone)]
pub struct LoadHandle {
    name: String,
    cancelled: Arc<AtomicBool>,
}

impl LoadHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

struct PendingLoad {
    handle: LoadHandle,
    receiver: Receiver<Result<Asset, AssetError>>,
}

// ── AssetManager ────────────────────────────────────────────────────────────

struct AssetState {
    bus: MessageBus,
    source: Arc<dyn AssetSource>,
    loaders: Vec<Arc<dyn AssetLoader>>,
    cache: HashMap<String, Rc<Asset>>,
    pending: HashMap<String, PendingLoad>,
    errors: HashMap<String, String>,
}

/// Shared handle to one engine's asset cache.
#[derive(Clone)]
pub struct AssetManager {
    inner: Rc<RefCell<AssetState>>,
}

impl AssetManager {
    /// Creates a manager with the built-in image, json and text loaders.
    pub fn new(bus: MessageBus, source: Arc<dyn AssetSource>) -> Self {
        let manager = Self {
            inner: Rc::new(RefCell::new(AssetState {
                bus,
                source,
                loaders: Vec::new(),
                cache: HashMap::new(),
                pending: HashMap::new(),
                errors: HashMap::new(),
            })),
        };
        manager.register_loader(Arc::new(ImageAssetLoader));
        manager.register_loader(Arc::new(JsonAssetLoader));
        manager.register_loader(Arc::new(TextAssetLoader));
        manager
    }

    /// Loaders are consulted in registration order; the first match wins.
    pub fn register_loader(&self, loader: Arc<dyn AssetLoader>) {
        self.inner.borrow_mut().loaders.push(loader);
    }

    /// Starts loading `name` unless it is already in flight.
    ///
    /// Returns `None` (and logs a warning) when no loader handles the
    /// extension; such an asset never loads.
    pub fn load_asset(&self, name: &str) -> Option<LoadHandle> {
        let mut state = self.inner.borrow_mut();
        if let Some(pending) = state.pending.get(name) {
            return Some(pending.handle.clone());
        }

        let extension = extension_of(name).unwrap_or_default();
        let Some(loader) = state.loaders.iter().find(|l| l.supports(&extension)).cloned() else {
            warn!(
                asset = name,
                "unable to load asset with extension `{extension}` because there is no loader associated with it"
            );
            return None;
        };

        let handle = LoadHandle {
            name: name.to_owned(),
            cancelled: Arc::new(AtomicBool::new(false)),
        };
        let (sender, receiver) = mpsc::channel();
        let source = Arc::clone(&state.source);
        let task_handle = handle.clone();

        let spawned = thread::Builder::new()
            .name(format!("asset:{name}"))
            .spawn(move || {
                let name = task_handle.name();
                let result = source.fetch(name).and_then(|bytes| {
                    if task_handle.is_cancelled() {
                        Err(AssetError::Cancelled(name.to_owned()))
                    } else {
                        loader.decode(name, bytes)
                    }
                });
                // The manager may have been dropped; nothing left to notify.
                let _ = sender.send(result);
            });

        if let Err(source) = spawned {
            error!(asset = name, "failed to start loader thread: {source}");
            state.errors.insert(name.to_owned(), source.to_string());
            return None;
        }

        debug!(asset = name, "loading asset");
        state.errors.remove(name);
        state.pending.insert(name.to_owned(), PendingLoad { handle: handle.clone(), receiver });
        Some(handle)
    }

    /// Collects finished loads. Returns how many completed (successfully or not).
    pub fn update(&self) -> usize {
        let finished: Vec<(String, Result<Asset, AssetError>)> = {
            let mut state = self.inner.borrow_mut();
            let mut finished = Vec::new();
            state.pending.retain(|name, load| {
                if load.handle.is_cancelled() {
                    debug!(asset = %name, "dropping cancelled load");
                    return false;
                }
                match load.receiver.try_recv() {
                    Ok(result) => {
                        finished.push((name.clone(), result));
                        false
                    }
                    Err(TryRecvError::Empty) => true,
                    Err(TryRecvError::Disconnected) => {
                        finished.push((name.clone(), Err(AssetError::WorkerLost(name.clone()))));
                        false
                    }
                }
            });
            finished
        };

        let count = finished.len();
        for (name, result) in finished {
            self.complete(&name, result);
        }
        count
    }

    /// Blocks until every in-flight load has resolved, then processes them.
    pub fn finish_pending(&self) {
        loop {
            let pending: Vec<(String, PendingLoad)> = self.inner.borrow_mut().pending.drain().collect();
            if pending.is_empty() {
                return;
            }
            for (name, load) in pending {
                let result = load
                    .receiver
                    .recv()
                    .unwrap_or_else(|_| Err(AssetError::WorkerLost(name.clone())));
                if load.handle.is_cancelled() {
                    continue;
                }
                self.complete(&name, result);
            }
        }
    }

    fn complete(&self, name: &str, result: Result<Asset, AssetError>) {
        match result {
            Ok(asset) => self.on_asset_loaded(asset),
            Err(AssetError::Cancelled(_)) => debug!(asset = name, "load cancelled"),
            Err(err) => {
                error!(asset = name, "asset failed to load: {err}");
                let bus = {
                    let mut state = self.inner.borrow_mut();
                    state.errors.insert(name.to_owned(), err.to_string());
                    state.bus.clone()
                };
                bus.send(asset_failed_code(name), None, Payload::Text(err.to_string()));
            }
        }
    }

    /// Caches `asset` and announces it with a NORMAL message.
    pub fn on_asset_loaded(&self, asset: Asset) {
        let asset = Rc::new(asset);
        let name = asset.name().to_owned();
        let bus = {
            let mut state = self.inner.borrow_mut();
            state.cache.insert(name.clone(), Rc::clone(&asset));
            state.bus.clone()
        };
        debug!(asset = %name, "asset loaded");
        bus.send(asset_loaded_code(&name), None, Payload::Asset(asset));
    }

    /// Returns the cached asset, or starts loading it and returns `None`.
    /// Callers that need the value should subscribe to the load-complete code.
    pub fn get_asset(&self, name: &str) -> Option<Rc<Asset>> {
        if let Some(asset) = self.inner.borrow().cache.get(name) {
            return Some(Rc::clone(asset));
        }
        self.load_asset(name);
        None
    }

    pub fn is_asset_loaded(&self, name: &str) -> bool {
        self.inner.borrow().cache.contains_key(name)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.inner.borrow().pending.contains_key(name)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn cancel(&self, name: &str) -> bool {
        match self.inner.borrow_mut().pending.remove(name) {
            Some(load) => {
                load.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Last failure reported for `name`, cleared when it is loaded again.
    pub fn load_error(&self, name: &str) -> Option<String> {
        self.inner.borrow().errors.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Mailbox, Subscriber};

    fn manager(source: MemorySource) -> (MessageBus, AssetManager) {
        let bus = MessageBus::default();
        let assets = AssetManager::new(bus.clone(), Arc::new(source));
        (bus, assets)
    }

    #[test]
    fn unknown_extension_never_loads() {
        let (_, assets) = manager(MemorySource::new());
        assert!(assets.load_asset("foo.unknownext").is_none());
        assets.finish_pending();
        assert!(!assets.is_asset_loaded("foo.unknownext"));
    }

    #[test]
    fn get_asset_triggers_load_and_announces_completion() {
        let (bus, assets) = manager(MemorySource::new().with_file("notes.txt", "hello"));
        let mailbox = Mailbox::new();
        bus.subscribe(asset_loaded_code("notes.txt"), Subscriber::handler(&mailbox));

        assert!(assets.get_asset("notes.txt").is_none());
        assert!(assets.is_loading("notes.txt"));
        assets.finish_pending();
        bus.update(0.0);

        let messages = mailbox.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].asset().unwrap().as_text(), Some("hello"));
        assert_eq!(assets.get_asset("notes.txt").unwrap().as_text(), Some("hello"));
    }

    #[test]
    fn missing_file_reports_on_error_channel() {
        let (bus, assets) = manager(MemorySource::new());
        let mailbox = Mailbox::new();
        bus.subscribe(asset_failed_code("gone.json"), Subscriber::handler(&mailbox));

        assets.load_asset("gone.json");
        assets.finish_pending();
        bus.update(0.0);

        assert!(!assets.is_asset_loaded("gone.json"));
        assert!(assets.load_error("gone.json").is_some());
        assert_eq!(mailbox.drain().len(), 1);
    }

    #[test]
    fn cancelled_load_is_not_cached() {
        let (_, assets) = manager(MemorySource::new().with_file("a.txt", "x"));
        let handle = assets.load_asset("a.txt").unwrap();
        handle.cancel();
        assets.finish_pending();
        assert!(!assets.is_asset_loaded("a.txt"));
    }
}
