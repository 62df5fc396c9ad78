use crate::behaviors::Behavior;
use crate::collision::ColliderKey;
use crate::components::Component;
use crate::context::EngineContext;
use crate::math::{Matrix4x4, Transform};
use crate::page::PageConfig;

use super::EntityId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EntityKind {
    #[default]
    Object,
    OrthographicCamera,
}

/// One node of the scene tree.
#[derive(Debug)]
pub struct EntityNode {
    pub(crate) name: String,
    pub(crate) kind: EntityKind,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) components: Vec<Component>,
    pub(crate) behaviors: Vec<Behavior>,
    pub(crate) page_configs: Vec<PageConfig>,
    pub transform: Transform,
    pub(crate) local_matrix: Matrix4x4,
    pub(crate) world_matrix: Matrix4x4,
    pub visible: bool,
    pub(crate) loaded: bool,
}

impl EntityNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::Object,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            behaviors: Vec::new(),
            page_configs: Vec::new(),
            transform: Transform::default(),
            local_matrix: Matrix4x4::identity(),
            world_matrix: Matrix4x4::identity(),
            visible: true,
            loaded: false,
        }
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn is_camera(&self) -> bool {
        self.kind == EntityKind::OrthographicCamera
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn page_configs(&self) -> &[PageConfig] {
        &self.page_configs
    }

    pub fn local_matrix(&self) -> Matrix4x4 {
        self.local_matrix
    }

    pub fn world_matrix(&self) -> Matrix4x4 {
        self.world_matrix
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Runs every dispose hook; `id` is the handle the node was stored under.
    pub(super) fn dispose(&mut self, id: EntityId, ctx: &mut EngineContext) {
        for page in &mut self.page_configs {
            page.dispose(ctx);
        }
        for (index, component) in self.components.iter_mut().enumerate() {
            component.dispose(ColliderKey { entity: id, component: index }, ctx);
        }
        for behavior in &mut self.behaviors {
            behavior.dispose(&ctx.bus);
        }
        self.loaded = false;
    }
}
