//! Brute-force 2D collision and pointer hover detection.
//!
//! Every registered collider is tested against every other once per update
//! (O(n²), no spatial partitioning).

mod shapes;

pub use shapes::{Circle2D, Rectangle2D, Shape2D};

use tracing::{trace, warn};

use crate::math::Vector2;
use crate::message::{MessageBus, Payload, collision_entry_code, collision_exit_code, hover_code, hover_exit_code};
use crate::scene::{EntityId, SceneGraph};

/// Addresses one collision component: its entity and its index in the
/// entity's component list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderKey {
    pub entity: EntityId,
    pub component: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventKind {
    Entry,
    Update,
    Exit,
}

/// One pair transition observed during an update.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionEvent {
    pub kind: CollisionEventKind,
    pub a: ColliderKey,
    pub b: ColliderKey,
}

struct CollisionRecord {
    a: ColliderKey,
    b: ColliderKey,
    a_owner: String,
    b_owner: String,
    /// Scan in which the pair last overlapped.
    scan: u64,
}

impl CollisionRecord {
    fn matches(&self, a: ColliderKey, b: ColliderKey) -> bool {
        (self.a == a && self.b == b) || (self.a == b && self.b == a)
    }
}

struct Hovered {
    key: ColliderKey,
    owner: String,
}

pub struct CollisionManager {
    bus: MessageBus,
    colliders: Vec<ColliderKey>,
    records: Vec<CollisionRecord>,
    hovered: Vec<Hovered>,
    scan: u64,
    total_time: f32,
}

impl CollisionManager {
    pub fn new(bus: MessageBus) -> Self {
        Self {
            bus,
            colliders: Vec::new(),
            records: Vec::new(),
            hovered: Vec::new(),
            scan: 0,
            total_time: 0.0,
        }
    }

    pub fn register(&mut self, key: ColliderKey) {
        if self.colliders.contains(&key) {
            warn!(?key, "collider is already registered");
            return;
        }
        self.colliders.push(key);
    }

    /// Forgets `key` along with any pair or hover state involving it.
    pub fn unregister(&mut self, key: ColliderKey) {
        let Some(index) = self.colliders.iter().position(|k| *k == key) else {
            warn!(?key, "cannot unregister a collider that is not registered");
            return;
        };
        self.colliders.remove(index);
        self.records.retain(|r| r.a != key && r.b != key);
        self.hovered.retain(|h| h.key != key);
    }

    pub fn clear(&mut self) {
        self.colliders.clear();
        self.records.clear();
        self.hovered.clear();
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    pub fn is_colliding(&self, a: ColliderKey, b: ColliderKey) -> bool {
        self.records.iter().any(|r| r.matches(a, b))
    }

    /// Entities under the pointer, in registration order. An entity with
    /// several hovered colliders is listed once.
    pub fn hovered_entities(&self) -> Vec<EntityId> {
        let mut entities: Vec<EntityId> = Vec::new();
        for hovered in &self.hovered {
            if !entities.contains(&hovered.key.entity) {
                entities.push(hovered.key.entity);
            }
        }
        entities
    }

    /// Runs one scan over every pair and, when `pointer` is inside the
    /// viewport, one hover pass. Returns the pair transitions in the order
    /// they happened: entries and updates during the scan, exits afterwards.
    pub fn update(&mut self, delta_time: f32, scene: &mut SceneGraph, pointer: Option<Vector2>) -> Vec<CollisionEvent> {
        self.total_time += delta_time;
        self.scan += 1;

        let shapes: Vec<(ColliderKey, Shape2D, String)> = self
            .colliders
            .iter()
            .filter_map(|key| {
                let shape = *scene.component(key.entity, key.component)?.as_collision()?.shape();
                let owner = scene.name(key.entity)?.to_owned();
                Some((*key, shape, owner))
            })
            .collect();

        let mut events = Vec::new();
        for i in 0..shapes.len() {
            for j in (i + 1)..shapes.len() {
                let (a, a_shape, a_owner) = &shapes[i];
                let (b, b_shape, b_owner) = &shapes[j];
                if !a_shape.intersects(b_shape) {
                    continue;
                }
                if let Some(record) = self.records.iter_mut().find(|r| r.matches(*a, *b)) {
                    record.scan = self.scan;
                    Self::touch(scene, *a, *b, CollisionEventKind::Update);
                    Self::touch(scene, *b, *a, CollisionEventKind::Update);
                    events.push(CollisionEvent { kind: CollisionEventKind::Update, a: *a, b: *b });
                    continue;
                }

                trace!(a = %a_owner, b = %b_owner, "collision entry");
                self.records.push(CollisionRecord {
                    a: *a,
                    b: *b,
                    a_owner: a_owner.clone(),
                    b_owner: b_owner.clone(),
                    scan: self.scan,
                });
                Self::touch(scene, *a, *b, CollisionEventKind::Entry);
                Self::touch(scene, *b, *a, CollisionEventKind::Entry);
                self.bus.send(collision_entry_code(a_owner), Some(a_owner), Payload::Entity(b_owner.clone()));
                self.bus.send(collision_entry_code(b_owner), Some(b_owner), Payload::Entity(a_owner.clone()));
                events.push(CollisionEvent { kind: CollisionEventKind::Entry, a: *a, b: *b });
            }
        }

        let scan = self.scan;
        let (stale, live): (Vec<_>, Vec<_>) = self.records.drain(..).partition(|r| r.scan != scan);
        self.records = live;
        for record in stale {
            trace!(a = %record.a_owner, b = %record.b_owner, "collision exit");
            Self::touch(scene, record.a, record.b, CollisionEventKind::Exit);
            Self::touch(scene, record.b, record.a, CollisionEventKind::Exit);
            self.bus
                .send(collision_exit_code(&record.a_owner), Some(&record.a_owner), Payload::Entity(record.b_owner.clone()));
            self.bus
                .send(collision_exit_code(&record.b_owner), Some(&record.b_owner), Payload::Entity(record.a_owner.clone()));
            events.push(CollisionEvent { kind: CollisionEventKind::Exit, a: record.a, b: record.b });
        }

        self.update_hover(&shapes, pointer);
        events
    }

    fn touch(scene: &mut SceneGraph, key: ColliderKey, other: ColliderKey, kind: CollisionEventKind) {
        let Some(collider) = scene
            .component_mut(key.entity, key.component)
            .and_then(|c| c.as_collision_mut())
        else {
            return;
        };
        match kind {
            CollisionEventKind::Entry => collider.on_collision_entry(other),
            CollisionEventKind::Update => collider.on_collision_update(other),
            CollisionEventKind::Exit => collider.on_collision_exit(other),
        }
    }

    fn update_hover(&mut self, shapes: &[(ColliderKey, Shape2D, String)], pointer: Option<Vector2>) {
        let under: Vec<&(ColliderKey, Shape2D, String)> = match pointer {
            Some(point) => shapes.iter().filter(|(_, shape, _)| shape.point_in_shape(point)).collect(),
            None => Vec::new(),
        };

        let previous = std::mem::take(&mut self.hovered);
        for gone in previous.iter().filter(|h| !under.iter().any(|(key, _, _)| *key == h.key)) {
            self.bus.send(hover_exit_code(&gone.owner), Some(&gone.owner), Payload::None);
        }
        for (key, _, owner) in under {
            if !previous.iter().any(|h| h.key == *key) {
                self.bus.send(hover_code(owner), Some(owner), Payload::None);
            }
            self.hovered.push(Hovered { key: *key, owner: owner.clone() });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::assets::MemorySource;
    use crate::context::EngineContext;
    use crate::math::Vector3;
    use crate::message::{Mailbox, Subscriber};
    use crate::renderer::{HeadlessDevice, shared};
    use crate::scene::EntityNode;

    fn context() -> EngineContext {
        let (_, gpu) = shared(HeadlessDevice::new(800, 600));
        EngineContext::new(gpu, Arc::new(MemorySource::new()), 100, Vector2::new(800.0, 600.0)).unwrap()
    }

    fn circle(ctx: &EngineContext, scene: &mut SceneGraph, name: &str, x: f32) -> EntityId {
        let mut node = EntityNode::new(name);
        node.transform.position = Vector3::new(x, 0.0, 0.0);
        let id = scene.add_entity(scene.root(), node).unwrap();
        let component = ctx
            .components
            .extract(&json!({"type": "collision", "shape": {"type": "circle", "radius": 5}}), &ctx.bus)
            .unwrap();
        scene.add_component(id, component);
        id
    }

    fn kinds(events: &[CollisionEvent]) -> Vec<CollisionEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    fn move_to(scene: &mut SceneGraph, ctx: &mut EngineContext, id: EntityId, x: f32) {
        scene.get_mut(id).unwrap().transform.position.x = x;
        scene.update(0.016, ctx);
    }

    #[test]
    fn entry_update_exit_sequence() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = circle(&ctx, &mut scene, "a", 0.0);
        let b = circle(&ctx, &mut scene, "b", 100.0);
        scene.load(&mut ctx).unwrap();
        assert_eq!(ctx.collisions.len(), 2);

        assert!(ctx.collisions.update(0.016, &mut scene, None).is_empty());

        move_to(&mut scene, &mut ctx, b, 8.0);
        let events = ctx.collisions.update(0.016, &mut scene, None);
        assert_eq!(kinds(&events), vec![CollisionEventKind::Entry]);
        let touching = scene.component(a, 0).unwrap().as_collision().unwrap();
        assert!(touching.is_touching(b));

        let events = ctx.collisions.update(0.016, &mut scene, None);
        assert_eq!(kinds(&events), vec![CollisionEventKind::Update]);
        let b_key = ColliderKey { entity: b, component: 0 };
        let touching = scene.component(a, 0).unwrap().as_collision().unwrap();
        assert_eq!(touching.contact_updates(b_key), Some(1));

        move_to(&mut scene, &mut ctx, b, 50.0);
        let events = ctx.collisions.update(0.016, &mut scene, None);
        assert_eq!(kinds(&events), vec![CollisionEventKind::Exit]);
        assert_eq!(scene.component(b, 0).unwrap().as_collision().unwrap().contact_count(), 0);

        assert!(ctx.collisions.update(0.016, &mut scene, None).is_empty());
    }

    #[test]
    fn zero_length_frames_still_report_exit() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        circle(&ctx, &mut scene, "a", 0.0);
        let b = circle(&ctx, &mut scene, "b", 4.0);
        scene.load(&mut ctx).unwrap();

        ctx.collisions.update(0.0, &mut scene, None);
        move_to(&mut scene, &mut ctx, b, 40.0);
        let events = ctx.collisions.update(0.0, &mut scene, None);
        assert_eq!(kinds(&events), vec![CollisionEventKind::Exit]);
    }

    #[test]
    fn entry_is_announced_on_the_bus() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        circle(&ctx, &mut scene, "a", 0.0);
        circle(&ctx, &mut scene, "b", 3.0);
        scene.load(&mut ctx).unwrap();

        let mailbox = Mailbox::new();
        ctx.bus.subscribe(collision_entry_code("a"), Subscriber::handler(&mailbox));
        ctx.collisions.update(0.016, &mut scene, None);
        ctx.bus.update(0.016);

        let messages = mailbox.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), Some("b"));
    }

    #[test]
    fn hover_enters_and_exits_once() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = circle(&ctx, &mut scene, "a", 0.0);
        scene.load(&mut ctx).unwrap();

        let mailbox = Mailbox::new();
        ctx.bus.subscribe(hover_code("a"), Subscriber::handler(&mailbox));
        ctx.bus.subscribe(hover_exit_code("a"), Subscriber::handler(&mailbox));

        ctx.collisions.update(0.016, &mut scene, Some(Vector2::new(1.0, 1.0)));
        ctx.collisions.update(0.016, &mut scene, Some(Vector2::new(2.0, 1.0)));
        assert_eq!(ctx.collisions.hovered_entities(), vec![a]);
        ctx.collisions.update(0.016, &mut scene, None);
        ctx.bus.update(0.016);

        let codes: Vec<String> = mailbox.drain().into_iter().map(|m| m.code).collect();
        assert_eq!(codes, vec![hover_code("a"), hover_exit_code("a")]);
    }

    #[test]
    fn update_is_counted_on_both_colliders() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = circle(&ctx, &mut scene, "a", 0.0);
        let b = circle(&ctx, &mut scene, "b", 3.0);
        scene.load(&mut ctx).unwrap();
        let a_key = ColliderKey { entity: a, component: 0 };
        let b_key = ColliderKey { entity: b, component: 0 };

        for _ in 0..3 {
            ctx.collisions.update(0.016, &mut scene, None);
        }

        let a_collider = scene.component(a, 0).unwrap().as_collision().unwrap();
        let b_collider = scene.component(b, 0).unwrap().as_collision().unwrap();
        assert_eq!(a_collider.contact_updates(b_key), Some(2));
        assert_eq!(b_collider.contact_updates(a_key), Some(2));
    }

    #[test]
    fn same_named_partners_are_separate_contacts() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = circle(&ctx, &mut scene, "a", 0.0);
        let left = circle(&ctx, &mut scene, "twin", -4.0);
        let right = circle(&ctx, &mut scene, "twin", 4.0);
        scene.load(&mut ctx).unwrap();

        ctx.collisions.update(0.016, &mut scene, None);
        let collider = scene.component(a, 0).unwrap().as_collision().unwrap();
        assert_eq!(collider.contact_count(), 2);
        assert!(collider.is_touching(left));
        assert!(collider.is_touching(right));

        move_to(&mut scene, &mut ctx, right, 60.0);
        ctx.collisions.update(0.016, &mut scene, None);
        let collider = scene.component(a, 0).unwrap().as_collision().unwrap();
        assert!(collider.is_touching(left));
        assert!(!collider.is_touching(right));
    }

    #[test]
    fn hover_reports_entity_handles_not_names() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        circle(&ctx, &mut scene, "twin", 0.0);
        let far = circle(&ctx, &mut scene, "twin", 300.0);
        scene.load(&mut ctx).unwrap();

        ctx.collisions.update(0.016, &mut scene, Some(Vector2::new(305.0, 5.0)));
        assert_eq!(ctx.collisions.hovered_entities(), vec![far]);
    }

    #[test]
    fn destroying_an_entity_unregisters_its_collider() {
        let mut ctx = context();
        let mut scene = SceneGraph::new();
        let a = circle(&ctx, &mut scene, "a", 0.0);
        circle(&ctx, &mut scene, "b", 3.0);
        scene.load(&mut ctx).unwrap();
        ctx.collisions.update(0.016, &mut scene, None);

        scene.destroy(a, &mut ctx);
        assert_eq!(ctx.collisions.len(), 1);
        assert!(ctx.collisions.update(0.016, &mut scene, None).is_empty());
    }
}
