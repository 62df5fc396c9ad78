//! Levels: one page document instantiated as a scene graph plus its cameras.

mod manager;

pub use manager::{LevelManager, PageEntry};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::EngineContext;
use crate::error::{EngineError, SceneError};
use crate::math::{Matrix4x4, Vector3};
use crate::page::PAGE_SIDE_PANEL_WIDTH;
use crate::renderer::RenderView;
use crate::scene::{EntityId, EntityKind, EntityNode, SceneGraph};

pub const DEFAULT_CAMERA_NAME: &str = "DEFAULT_CAMERA";
pub const ORTHOGRAPHIC_CAMERA: &str = "orthographicCamera";
const LEGACY_ORTHOGRAPHIC_CAMERA: &str = "ortographicCamera";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelState {
    #[default]
    Uninitialized,
    Loading,
    Updating,
}

pub struct Level {
    name: String,
    description: Option<String>,
    state: LevelState,
    scene: SceneGraph,
    cameras: Vec<(String, EntityId)>,
    active_camera: Option<EntityId>,
    default_camera: Option<String>,
}

impl Level {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            state: LevelState::Uninitialized,
            scene: SceneGraph::new(),
            cameras: Vec::new(),
            active_camera: None,
            default_camera: None,
        }
    }

    /// Reads the level header. `name` is required.
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let name = json
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SceneError::MissingField { kind: "level", field: "name" })?;
        let description = json.get("description").and_then(Value::as_str).map(str::to_owned);
        Ok(Self::new(name, description))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn state(&self) -> LevelState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LevelState::Updating
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.scene
    }

    /// Builds the entity tree from `json.page`. Fails on the first malformed
    /// node; whatever was built before that stays in the scene until unload.
    pub fn initialize(&mut self, json: &Value, ctx: &mut EngineContext) -> Result<(), SceneError> {
        let page = json.get("page").ok_or(SceneError::MissingField { kind: "level", field: "page" })?;
        let root = self.scene.root();

        let page_config = page
            .get("pageConfig")
            .ok_or(SceneError::MissingField { kind: "page", field: "pageConfig" })?;
        self.load_page(page_config, root, ctx)?;

        let objects = page
            .get("objects")
            .and_then(Value::as_array)
            .ok_or(SceneError::MissingField { kind: "page", field: "objects" })?;

        self.default_camera = page.get("defaultCamera").map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

        for object in objects {
            self.load_entity(object, root, ctx)?;
        }
        debug!(level = %self.name, entities = self.scene.len(), "level initialized");
        Ok(())
    }

    fn load_page(&mut self, json: &Value, parent: EntityId, ctx: &mut EngineContext) -> Result<(), SceneError> {
        let name = json.get("name").and_then(Value::as_str).unwrap_or("page");
        let mut node = EntityNode::new(name);
        node.transform.position = Vector3::new(
            (ctx.viewport_size.x - PAGE_SIDE_PANEL_WIDTH) / 2.0,
            ctx.viewport_size.y / 2.0,
            -1.0,
        );
        let Some(id) = self.scene.add_entity(parent, node) else {
            return Ok(());
        };
        if json.get("type").is_some() {
            let page = ctx.pages.extract(json, &ctx.bus)?;
            self.scene.add_page_config(id, page);
        }
        Ok(())
    }

    fn load_entity(&mut self, json: &Value, parent: EntityId, ctx: &mut EngineContext) -> Result<(), SceneError> {
        let name = json
            .get("name")
            .and_then(Value::as_str)
            .ok_or(SceneError::MissingField { kind: "object", field: "name" })?;

        let kind = match json.get("type").and_then(Value::as_str) {
            None => EntityKind::Object,
            Some(ORTHOGRAPHIC_CAMERA | LEGACY_ORTHOGRAPHIC_CAMERA) => EntityKind::OrthographicCamera,
            Some(other) => return Err(SceneError::UnknownType { kind: "object", tag: other.to_owned() }),
        };

        let mut node = EntityNode::new(name).with_kind(kind);
        if let Some(transform) = json.get("transform") {
            node.transform.set_from_json(transform)?;
        }

        let Some(id) = self.scene.add_entity(parent, node) else {
            return Ok(());
        };
        if kind == EntityKind::OrthographicCamera {
            self.register_camera(id);
        }

        for component in json.get("components").and_then(Value::as_array).into_iter().flatten() {
            let component = ctx.components.extract(component, &ctx.bus)?;
            self.scene.add_component(id, component);
        }
        for behavior in json.get("behaviors").and_then(Value::as_array).into_iter().flatten() {
            let behavior = ctx.behaviors.extract(behavior, &ctx.bus)?;
            self.scene.add_behavior(id, behavior);
        }
        for child in json.get("children").and_then(Value::as_array).into_iter().flatten() {
            self.load_entity(child, id, ctx)?;
        }
        Ok(())
    }

    /// Loads the scene, runs the ready hooks and picks the active camera.
    pub fn load(&mut self, ctx: &mut EngineContext) -> Result<(), EngineError> {
        self.state = LevelState::Loading;
        self.scene.load(ctx)?;
        self.scene.update_ready(ctx);

        match self.default_camera.clone() {
            Some(name) => {
                let entity = self
                    .scene
                    .entity_by_name(&name)
                    .ok_or_else(|| SceneError::DefaultCameraNotFound(name.clone()))?;
                if self.cameras.iter().any(|(_, id)| *id == entity) {
                    self.active_camera = Some(entity);
                } else {
                    warn!(level = %self.name, camera = %name, "default camera is not a registered camera");
                    self.active_camera = self.cameras.first().map(|(_, id)| *id);
                }
            }
            None if self.active_camera.is_none() => match self.cameras.first() {
                Some((_, id)) => self.active_camera = Some(*id),
                None => {
                    let node = EntityNode::new(DEFAULT_CAMERA_NAME).with_kind(EntityKind::OrthographicCamera);
                    if let Some(id) = self.scene.add_entity(self.scene.root(), node) {
                        self.register_camera(id);
                        self.active_camera = Some(id);
                    }
                }
            },
            None => {}
        }

        self.state = LevelState::Updating;
        info!(level = %self.name, "level loaded");
        Ok(())
    }

    pub fn update(&mut self, delta_time: f32, ctx: &mut EngineContext) {
        if self.state == LevelState::Updating {
            self.scene.update(delta_time, ctx);
        }
    }

    pub fn render(&self, view: &RenderView, ctx: &EngineContext) {
        if self.state == LevelState::Updating {
            self.scene.render(view, ctx);
        }
    }

    /// Destroys every entity and forgets the cameras.
    pub fn unload(&mut self, ctx: &mut EngineContext) {
        self.scene.unload(ctx);
        self.cameras.clear();
        self.active_camera = None;
        self.state = LevelState::Uninitialized;
    }

    pub fn on_activated(&mut self) {
        debug!(level = %self.name, "level activated");
    }

    pub fn on_deactivated(&mut self) {
        debug!(level = %self.name, "level deactivated");
    }

    /// Registers a camera entity; the first one registered becomes active.
    pub fn register_camera(&mut self, id: EntityId) {
        let Some(name) = self.scene.name(id).map(str::to_owned) else {
            return;
        };
        if self.cameras.iter().any(|(n, _)| *n == name) {
            warn!(camera = %name, "a camera with this name is already registered");
            return;
        }
        self.cameras.push((name, id));
        if self.active_camera.is_none() {
            self.active_camera = Some(id);
        }
    }

    pub fn unregister_camera(&mut self, id: EntityId) {
        let Some(index) = self.cameras.iter().position(|(_, c)| *c == id) else {
            warn!(camera = ?id, "camera is not registered");
            return;
        };
        self.cameras.remove(index);
        if self.active_camera == Some(id) {
            self.active_camera = None;
        }
    }

    pub fn cameras(&self) -> impl Iterator<Item = (&str, EntityId)> {
        self.cameras.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn active_camera(&self) -> Option<EntityId> {
        self.active_camera
    }

    /// The active camera's view matrix: its transform, used as is.
    pub fn camera_view(&self) -> Option<Matrix4x4> {
        let node = self.scene.get(self.active_camera?)?;
        Some(node.transform.transformation_matrix())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::assets::MemorySource;
    use crate::math::Vector2;
    use crate::renderer::{HeadlessDevice, shared};

    fn context() -> EngineContext {
        let (_, gpu) = shared(HeadlessDevice::new(800, 600));
        EngineContext::new(gpu, Arc::new(MemorySource::new()), 10, Vector2::new(800.0, 600.0)).unwrap()
    }

    fn level(json: &Value, ctx: &mut EngineContext) -> Result<Level, EngineError> {
        let mut level = Level::from_json(json)?;
        level.initialize(json, ctx)?;
        level.load(ctx)?;
        Ok(level)
    }

    #[test]
    fn level_requires_a_name() {
        let result = Level::from_json(&json!({"page": {}}));
        assert!(matches!(result, Err(SceneError::MissingField { kind: "level", field: "name" })));
    }

    #[test]
    fn page_entity_sits_beside_the_side_panel() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {"pageConfig": {"name": "p"}, "objects": []}});
        let level = level(&doc, &mut ctx).unwrap();
        let page = level.scene().entity_by_name("p").unwrap();
        assert_eq!(level.scene().get(page).unwrap().transform.position, Vector3::new(225.0, 300.0, -1.0));
    }

    #[test]
    fn creates_default_camera_when_none_declared() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {"pageConfig": {"name": "p"}, "objects": [{"name": "a"}]}});
        let level = level(&doc, &mut ctx).unwrap();
        let camera = level.active_camera().unwrap();
        assert_eq!(level.scene().name(camera), Some(DEFAULT_CAMERA_NAME));
        assert_eq!(level.state(), LevelState::Updating);
    }

    #[test]
    fn named_default_camera_becomes_active() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {
            "pageConfig": {"name": "p"},
            "defaultCamera": "second",
            "objects": [
                {"name": "first", "type": "orthographicCamera"},
                {"name": "second", "type": "ortographicCamera", "transform": {"position": {"x": 4}}}
            ]
        }});
        let level = level(&doc, &mut ctx).unwrap();
        let active = level.active_camera().unwrap();
        assert_eq!(level.scene().name(active), Some("second"));
        assert_eq!(level.camera_view().unwrap().translation_part(), Vector3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn missing_default_camera_is_fatal() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {"pageConfig": {"name": "p"}, "defaultCamera": "nope", "objects": []}});
        let result = level(&doc, &mut ctx);
        assert!(matches!(result, Err(EngineError::Scene(SceneError::DefaultCameraNotFound(name))) if name == "nope"));
    }

    #[test]
    fn unknown_object_type_is_fatal() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {"pageConfig": {"name": "p"}, "objects": [{"name": "x", "type": "light"}]}});
        let result = level(&doc, &mut ctx);
        assert!(matches!(result, Err(EngineError::Scene(SceneError::UnknownType { kind: "object", .. }))));
    }

    #[test]
    fn unregistering_active_camera_clears_it() {
        let mut ctx = context();
        let doc = json!({"name": "root", "page": {"pageConfig": {"name": "p"}, "objects": [
            {"name": "cam", "type": "orthographicCamera"}
        ]}});
        let mut level = level(&doc, &mut ctx).unwrap();
        let camera = level.active_camera().unwrap();
        level.register_camera(camera);
        assert_eq!(level.cameras().count(), 1);
        level.unregister_camera(camera);
        assert_eq!(level.active_camera(), None);
        assert!(level.camera_view().is_none());
    }
}
