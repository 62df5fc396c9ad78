//! The entity tree of one level, stored as an arena of generational handles.
//!
//! Parents own their children through handle lists; back-references are
//! handles too, so a destroyed entity can never be reached through a stale
//! parent or owner link.

mod node;

pub use node::{EntityKind, EntityNode};

use tracing::{debug, warn};

use crate::behaviors::Behavior;
use crate::collision::ColliderKey;
use crate::components::Component;
use crate::context::EngineContext;
use crate::error::RenderError;
use crate::math::{Matrix4x4, Vector3};
use crate::page::PageConfig;
use crate::renderer::RenderView;

pub const ROOT_NAME: &str = "__ROOT__";

/// Generational handle to an entity in a [`SceneGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

struct EntityAllocator {
    generations: Vec<u32>,
    free: Vec<u32>,
}

impl EntityAllocator {
    fn new() -> Self {
        Self { generations: Vec::new(), free: Vec::new() }
    }

    fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop() {
            EntityId { index, generation: self.generations[index as usize] }
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            EntityId { index, generation: 0 }
        }
    }

    fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.generations[id.index as usize] += 1;
        self.free.push(id.index);
        true
    }

    fn is_alive(&self, id: EntityId) -> bool {
        let index = id.index as usize;
        index < self.generations.len() && self.generations[index] == id.generation
    }
}

pub struct SceneGraph {
    allocator: EntityAllocator,
    nodes: Vec<Option<EntityNode>>,
    root: EntityId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut graph = Self { allocator: EntityAllocator::new(), nodes: Vec::new(), root: EntityId { index: 0, generation: 0 } };
        graph.root = graph.insert(EntityNode::new(ROOT_NAME));
        graph
    }

    fn insert(&mut self, node: EntityNode) -> EntityId {
        let id = self.allocator.allocate();
        let index = id.index as usize;
        if index == self.nodes.len() {
            self.nodes.push(Some(node));
        } else {
            self.nodes[index] = Some(node);
        }
        id
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.allocator.is_alive(id)
    }

    /// Number of live entities, the root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get(id.index as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes.get_mut(id.index as usize)?.as_mut()
    }

    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.get(id).map(|n| n.name())
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.get(id)?.parent()
    }

    pub fn children(&self, id: EntityId) -> &[EntityId] {
        self.get(id).map(|n| n.children()).unwrap_or(&[])
    }

    /// Adds `node` as the last child of `parent`. Returns `None` when the
    /// parent is gone.
    pub fn add_entity(&mut self, parent: EntityId, mut node: EntityNode) -> Option<EntityId> {
        if !self.is_alive(parent) {
            warn!(entity = %node.name(), "cannot add an entity under a destroyed parent");
            return None;
        }
        node.parent = Some(parent);
        let id = self.insert(node);
        self.get_mut(parent)?.children.push(id);
        Some(id)
    }

    /// Moves `child` (and its subtree) under `parent`.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> bool {
        if child == self.root || !self.is_alive(parent) || !self.is_alive(child) {
            return false;
        }
        if self.pre_order(child).contains(&parent) {
            warn!(child = ?child, parent = ?parent, "refusing to parent an entity under its own subtree");
            return false;
        }
        if let Some(old) = self.parent(child)
            && let Some(node) = self.get_mut(old)
        {
            node.children.retain(|c| *c != child);
        }
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        true
    }

    pub fn add_component(&mut self, id: EntityId, component: Component) -> Option<usize> {
        let node = self.get_mut(id)?;
        node.components.push(component);
        Some(node.components.len() - 1)
    }

    pub fn add_behavior(&mut self, id: EntityId, behavior: Behavior) -> bool {
        self.get_mut(id).map(|n| n.behaviors.push(behavior)).is_some()
    }

    pub fn add_page_config(&mut self, id: EntityId, page: PageConfig) -> bool {
        self.get_mut(id).map(|n| n.page_configs.push(page)).is_some()
    }

    pub fn component(&self, id: EntityId, index: usize) -> Option<&Component> {
        self.get(id)?.components.get(index)
    }

    pub fn component_mut(&mut self, id: EntityId, index: usize) -> Option<&mut Component> {
        self.get_mut(id)?.components.get_mut(index)
    }

    /// `from` followed by its descendants, parents before children and
    /// siblings in insertion order.
    pub fn pre_order(&self, from: EntityId) -> Vec<EntityId> {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            order.push(id);
            stack.extend(node.children.iter().rev());
        }
        order
    }

    /// First entity named `name`, depth-first from the root.
    pub fn entity_by_name(&self, name: &str) -> Option<EntityId> {
        self.pre_order(self.root)
            .into_iter()
            .skip(1)
            .find(|id| self.name(*id) == Some(name))
    }

    pub fn component_by_name(&self, name: &str) -> Option<(EntityId, usize)> {
        self.pre_order(self.root).into_iter().find_map(|id| {
            let index = self.get(id)?.components.iter().position(|c| c.name() == name)?;
            Some((id, index))
        })
    }

    pub fn behavior_by_name(&self, name: &str) -> Option<(EntityId, usize)> {
        self.pre_order(self.root).into_iter().find_map(|id| {
            let index = self.get(id)?.behaviors.iter().position(|b| b.name() == name)?;
            Some((id, index))
        })
    }

    pub fn world_position(&self, id: EntityId) -> Option<Vector3> {
        Some(self.get(id)?.world_matrix.translation_part())
    }

    fn parent_world(&self, id: EntityId) -> Matrix4x4 {
        self.parent(id)
            .and_then(|p| self.get(p))
            .map(|p| p.world_matrix)
            .unwrap_or_default()
    }

    fn refresh_matrices(&mut self, id: EntityId) {
        let parent_world = self.parent_world(id);
        if let Some(node) = self.get_mut(id) {
            node.local_matrix = node.transform.transformation_matrix();
            node.world_matrix = parent_world * node.local_matrix;
        }
    }

    /// Recomputes every local and world matrix without running any hooks.
    pub fn update_transforms(&mut self) {
        for id in self.pre_order(self.root) {
            self.refresh_matrices(id);
        }
    }

    /// Loads every entity that has not been loaded yet. Colliders register
    /// at their current world position.
    pub fn load(&mut self, ctx: &mut EngineContext) -> Result<(), RenderError> {
        self.update_transforms();
        for id in self.pre_order(self.root) {
            let Some(node) = self.get_mut(id) else { continue };
            if node.loaded {
                continue;
            }
            for page in &mut node.page_configs {
                page.load(ctx)?;
            }
            let world = node.world_matrix;
            for (index, component) in node.components.iter_mut().enumerate() {
                component.load(ColliderKey { entity: id, component: index }, &world, ctx)?;
            }
            node.loaded = true;
        }
        Ok(())
    }

    pub fn update_ready(&mut self, ctx: &mut EngineContext) {
        for id in self.pre_order(self.root) {
            if let Some(node) = self.get_mut(id) {
                for component in &mut node.components {
                    component.update_ready(ctx);
                }
            }
        }
    }

    /// Pre-order update: matrices, then components, then behaviors.
    pub fn update(&mut self, delta_time: f32, ctx: &mut EngineContext) {
        for id in self.pre_order(self.root) {
            self.refresh_matrices(id);
            let Some(node) = self.get_mut(id) else { continue };
            let world = node.world_matrix;
            for page in &mut node.page_configs {
                page.update(ctx);
            }
            for component in &mut node.components {
                component.update(delta_time, &world, ctx);
            }
            for behavior in &mut node.behaviors {
                behavior.update(delta_time, &mut node.transform, &ctx.input);
            }
        }
    }

    /// Draws visible entities in tree order; a hidden entity hides its subtree.
    pub fn render(&self, view: &RenderView, ctx: &EngineContext) {
        self.render_node(self.root, view, ctx);
    }

    fn render_node(&self, id: EntityId, view: &RenderView, ctx: &EngineContext) {
        let Some(node) = self.get(id) else { return };
        if !node.visible {
            return;
        }
        for page in &node.page_configs {
            page.render(&node.world_matrix, view, ctx);
        }
        for component in &node.components {
            component.render(&node.world_matrix, view, ctx);
        }
        for child in &node.children {
            self.render_node(*child, view, ctx);
        }
    }

    /// Disposes `id` and its whole subtree, children first, and frees their
    /// handles. The root is only emptied, never freed.
    pub fn destroy(&mut self, id: EntityId, ctx: &mut EngineContext) {
        if !self.is_alive(id) {
            warn!(entity = ?id, "cannot destroy an entity that is not alive");
            return;
        }
        if id == self.root {
            for child in self.children(id).to_vec() {
                self.destroy(child, ctx);
            }
            return;
        }

        if let Some(parent) = self.parent(id)
            && let Some(node) = self.get_mut(parent)
        {
            node.children.retain(|c| *c != id);
        }
        let mut subtree = self.pre_order(id);
        subtree.reverse();
        for entity in subtree {
            let Some(mut node) = self.nodes.get_mut(entity.index as usize).and_then(Option::take) else {
                continue;
            };
            node.dispose(entity, ctx);
            debug!(entity = %node.name(), "entity destroyed");
            self.allocator.deallocate(entity);
        }
    }

    /// Destroys every entity below the root.
    pub fn unload(&mut self, ctx: &mut EngineContext) {
        self.destroy(self.root, ctx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::assets::MemorySource;
    use crate::math::Vector2;
    use crate::renderer::{HeadlessDevice, shared};

    fn context() -> EngineContext {
        let (_, gpu) = shared(HeadlessDevice::new(800, 600));
        EngineContext::new(gpu, Arc::new(MemorySource::new()), 10, Vector2::new(800.0, 600.0)).unwrap()
    }

    fn node_at(name: &str, x: f32, y: f32) -> EntityNode {
        let mut node = EntityNode::new(name);
        node.transform.position = Vector3::new(x, y, 0.0);
        node
    }

    #[test]
    fn world_matrix_composes_parent_first() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let parent = scene.add_entity(scene.root(), node_at("parent", 10.0, 0.0)).unwrap();
        let child = scene.add_entity(parent, node_at("child", 0.0, 5.0)).unwrap();
        scene.update(0.016, &mut ctx);

        let parent_node = scene.get(parent).unwrap();
        let child_node = scene.get(child).unwrap();
        assert_eq!(child_node.world_matrix(), parent_node.world_matrix() * child_node.local_matrix());
        assert_eq!(parent_node.world_matrix(), parent_node.local_matrix());
        assert_eq!(scene.world_position(child), Some(Vector3::new(10.0, 5.0, 0.0)));
    }

    #[test]
    fn name_lookup_returns_first_depth_first_match() {
        let mut scene = SceneGraph::new();
        let a = scene.add_entity(scene.root(), EntityNode::new("a")).unwrap();
        let nested = scene.add_entity(a, EntityNode::new("dup")).unwrap();
        scene.add_entity(scene.root(), EntityNode::new("dup")).unwrap();
        assert_eq!(scene.entity_by_name("dup"), Some(nested));
        assert_eq!(scene.entity_by_name(ROOT_NAME), None);
    }

    #[test]
    fn destroy_cascades_and_invalidates_handles() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = scene.add_entity(scene.root(), EntityNode::new("a")).unwrap();
        let b = scene.add_entity(a, EntityNode::new("b")).unwrap();
        scene.destroy(a, &mut ctx);

        assert!(!scene.is_alive(a));
        assert!(!scene.is_alive(b));
        assert!(scene.children(scene.root()).is_empty());

        let reused = scene.add_entity(scene.root(), EntityNode::new("c")).unwrap();
        assert_ne!(reused, b);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn reparenting_moves_the_subtree() {
        let mut scene = SceneGraph::new();
        let a = scene.add_entity(scene.root(), EntityNode::new("a")).unwrap();
        let b = scene.add_entity(scene.root(), EntityNode::new("b")).unwrap();
        assert!(scene.add_child(a, b));
        assert_eq!(scene.parent(b), Some(a));
        assert_eq!(scene.children(scene.root()), &[a]);
        assert!(!scene.add_child(b, a));
    }
}
