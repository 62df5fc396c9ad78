use std::collections::HashMap;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::Level;
use crate::context::EngineContext;
use crate::error::EngineError;
use crate::message::{
    ASSET_FAILED_PREFIX, LEVEL_LOADED, Mailbox, Message, MessageBus, Payload, Subscriber, asset_failed_code, asset_loaded_code,
};
use crate::renderer::RenderView;

/// One `{name, file}` entry of the pages manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageEntry {
    pub name: Option<String>,
    pub file: Option<String>,
}

enum Pending {
    Manifest(String),
    Level(String),
}

/// Maps level names to page documents and owns the single active level.
pub struct LevelManager {
    bus: MessageBus,
    registered: HashMap<String, String>,
    active: Option<Level>,
    mailbox: Rc<Mailbox>,
    pending: Vec<Pending>,
    manifest_loaded: bool,
}

impl LevelManager {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            registered: HashMap::new(),
            active: None,
            mailbox: Mailbox::new(),
            pending: Vec::new(),
            manifest_loaded: false,
        }
    }

    pub fn register_level(&mut self, name: impl Into<String>, file: impl Into<String>) {
        let name = name.into();
        if let Some(previous) = self.registered.insert(name.clone(), file.into()) {
            warn!(level = %name, %previous, "level re-registered with a new file");
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registered.contains_key(name)
    }

    /// True once a pages manifest has been processed.
    pub fn is_manifest_loaded(&self) -> bool {
        self.manifest_loaded
    }

    pub fn active_level(&self) -> Option<&Level> {
        self.active.as_ref()
    }

    pub fn active_level_mut(&mut self) -> Option<&mut Level> {
        self.active.as_mut()
    }

    /// True while a manifest or level document is still being fetched.
    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Registers every `{name, file}` pair of a `{pages: [...]}` manifest.
    pub fn load_manifest(&mut self, manifest_name: &str, json: &Value) -> Result<(), EngineError> {
        let invalid = |reason: &str| EngineError::InvalidManifest { name: manifest_name.to_owned(), reason: reason.to_owned() };
        if let Some(pages) = json.get("pages") {
            let pages: Vec<PageEntry> =
                Vec::deserialize(pages).map_err(|e| invalid(&format!("pages is not a list of entries: {e}")))?;
            for page in pages {
                let (Some(name), Some(file)) = (page.name, page.file) else {
                    return Err(invalid("name or file is missing"));
                };
                self.register_level(name, file);
            }
        }
        self.manifest_loaded = true;
        Ok(())
    }

    /// Loads the pages manifest from the asset manager, now if cached or
    /// from [`update`](Self::update) once the fetch completes.
    pub fn request_manifest(&mut self, file: &str, ctx: &mut EngineContext) -> Result<(), EngineError> {
        if let Some(json) = Self::cached_json(file, ctx) {
            return self.load_manifest(file, &json);
        }
        if self.pending.iter().any(|p| matches!(p, Pending::Manifest(f) if f == file)) {
            return Ok(());
        }
        self.wait_for(file, ctx);
        self.pending.push(Pending::Manifest(file.to_owned()));
        Ok(())
    }

    /// Fully unloads the active level, then loads `name`. The new level is
    /// active immediately when its document is cached, otherwise after the
    /// fetch completes. Only the latest request is kept: a level still being
    /// fetched for an earlier call is abandoned.
    pub fn change_level(&mut self, name: &str, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let Some(file) = self.registered.get(name).cloned() else {
            return Err(EngineError::LevelNotRegistered(name.to_owned()));
        };

        self.abandon_level_fetch();
        self.unload_active(ctx);

        if let Some(json) = Self::cached_json(&file, ctx) {
            return self.load_level_from_json(&json, ctx);
        }
        self.wait_for(&file, ctx);
        self.pending.push(Pending::Level(file));
        Ok(())
    }

    fn unload_active(&mut self, ctx: &mut EngineContext) {
        if let Some(mut level) = self.active.take() {
            info!(level = %level.name(), "unloading level");
            level.on_deactivated();
            level.unload(ctx);
        }
    }

    fn abandon_level_fetch(&mut self) {
        let files: Vec<String> = self
            .pending
            .iter()
            .filter_map(|p| match p {
                Pending::Level(f) => Some(f.clone()),
                Pending::Manifest(_) => None,
            })
            .collect();
        for file in files {
            debug!(%file, "abandoning level fetch");
            self.stop_waiting(&file);
        }
    }

    fn cached_json(file: &str, ctx: &EngineContext) -> Option<Value> {
        if !ctx.assets.is_asset_loaded(file) {
            return None;
        }
        ctx.assets.get_asset(file)?.as_json().cloned()
    }

    fn wait_for(&self, file: &str, ctx: &mut EngineContext) {
        let subscriber = Subscriber::handler(&self.mailbox);
        self.bus.subscribe(asset_loaded_code(file), subscriber.clone());
        self.bus.subscribe(asset_failed_code(file), subscriber);
        ctx.assets.load_asset(file);
    }

    fn stop_waiting(&mut self, file: &str) -> Option<Pending> {
        let subscriber = Subscriber::handler(&self.mailbox);
        self.bus.unsubscribe(&asset_loaded_code(file), &subscriber);
        self.bus.unsubscribe(&asset_failed_code(file), &subscriber);
        let index = self.pending.iter().position(|p| match p {
            Pending::Manifest(f) | Pending::Level(f) => f == file,
        })?;
        Some(self.pending.remove(index))
    }

    /// Handles completed manifest and level fetches.
    pub fn update(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        for message in self.mailbox.drain() {
            self.on_message(&message, ctx)?;
        }
        Ok(())
    }

    fn on_message(&mut self, message: &Message, ctx: &mut EngineContext) -> Result<(), EngineError> {
        let Some(asset) = message.asset() else {
            let file = message.code.strip_prefix(ASSET_FAILED_PREFIX).unwrap_or_default().to_owned();
            if let Some(pending) = self.stop_waiting(&file) {
                let what = match pending {
                    Pending::Manifest(_) => "pages manifest",
                    Pending::Level(_) => "level",
                };
                error!(%file, error = ?ctx.assets.load_error(&file), "failed to fetch {what}");
            }
            return Ok(());
        };

        let file = asset.name().to_owned();
        let Some(pending) = self.stop_waiting(&file) else {
            return Ok(());
        };
        let Some(json) = asset.as_json() else {
            return Err(EngineError::InvalidManifest { name: file, reason: "not a JSON document".into() });
        };
        match pending {
            Pending::Manifest(_) => self.load_manifest(&file, json),
            Pending::Level(_) => self.load_level_from_json(json, ctx),
        }
    }

    /// Builds, initializes and loads a level from its document and makes it
    /// the active one. Any level already active is unloaded first. A level
    /// that fails to build is unloaded again.
    pub fn load_level_from_json(&mut self, json: &Value, ctx: &mut EngineContext) -> Result<(), EngineError> {
        self.unload_active(ctx);
        let mut level = Level::from_json(json)?;
        info!(level = %level.name(), "loading level");

        if let Err(err) = level.initialize(json, ctx) {
            level.unload(ctx);
            return Err(err.into());
        }
        level.on_activated();
        if let Err(err) = level.load(ctx) {
            level.unload(ctx);
            return Err(err);
        }

        let name = level.name().to_owned();
        self.active = Some(level);
        self.bus.send(LEVEL_LOADED, None, Payload::Text(name));
        Ok(())
    }

    pub fn update_level(&mut self, delta_time: f32, ctx: &mut EngineContext) {
        if let Some(level) = &mut self.active {
            level.update(delta_time, ctx);
        }
    }

    pub fn render(&self, view: &RenderView, ctx: &EngineContext) {
        if let Some(level) = &self.active {
            level.render(view, ctx);
        }
    }

    /// Unloads the active level and drops every outstanding fetch subscription.
    pub fn unload(&mut self, ctx: &mut EngineContext) {
        self.unload_active(ctx);
        let files: Vec<String> = self
            .pending
            .iter()
            .map(|p| match p {
                Pending::Manifest(f) | Pending::Level(f) => f.clone(),
            })
            .collect();
        for file in files {
            self.stop_waiting(&file);
        }
    }
}
