//! Components: renderable or structural capabilities owned by one entity.

mod collision;
mod sprite;
mod text;

pub use collision::{CollisionComponent, CollisionComponentData};
pub use sprite::{SpriteComponent, SpriteComponentData};
pub use text::{TextComponent, TextComponentData};

use serde_json::{Value, json};

use crate::collision::ColliderKey;
use crate::context::EngineContext;
use crate::error::{RenderError, SceneError};
use crate::math::Matrix4x4;
use crate::message::MessageBus;
use crate::registry::BuilderRegistry;
use crate::renderer::RenderView;

pub const SPRITE: &str = "sprite";
pub const TEXT: &str = "text";
pub const COLLISION: &str = "collision";

pub enum Component {
    Sprite(SpriteComponent),
    Text(TextComponent),
    Collision(CollisionComponent),
}

fn build_sprite(json: &Value, _bus: &MessageBus) -> Result<Component, SceneError> {
    Ok(Component::Sprite(SpriteComponent::new(SpriteComponentData::from_json(json)?)))
}

fn build_text(json: &Value, bus: &MessageBus) -> Result<Component, SceneError> {
    Ok(Component::Text(TextComponent::new(TextComponentData::from_json(json)?, bus)))
}

fn build_collision(json: &Value, _bus: &MessageBus) -> Result<Component, SceneError> {
    Ok(Component::Collision(CollisionComponent::new(CollisionComponentData::from_json(json)?)))
}

impl Component {
    /// Registry with the `sprite`, `text` and `collision` builders.
    pub fn registry() -> Result<BuilderRegistry<Component>, SceneError> {
        let mut registry = BuilderRegistry::new("component");
        registry.register(SPRITE, build_sprite)?;
        registry.register(TEXT, build_text)?;
        registry.register(COLLISION, build_collision)?;
        Ok(registry)
    }

    pub fn name(&self) -> &str {
        match self {
            Component::Sprite(c) => c.name(),
            Component::Text(c) => c.name(),
            Component::Collision(c) => c.name(),
        }
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Component::Sprite(_) => SPRITE,
            Component::Text(_) => TEXT,
            Component::Collision(_) => COLLISION,
        }
    }

    pub fn as_sprite(&self) -> Option<&SpriteComponent> {
        match self {
            Component::Sprite(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextComponent> {
        match self {
            Component::Text(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collision(&self) -> Option<&CollisionComponent> {
        match self {
            Component::Collision(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collision_mut(&mut self) -> Option<&mut CollisionComponent> {
        match self {
            Component::Collision(c) => Some(c),
            _ => None,
        }
    }

    /// Acquires GPU resources; colliders register themselves under `key`.
    pub fn load(&mut self, key: ColliderKey, world: &Matrix4x4, ctx: &mut EngineContext) -> Result<(), RenderError> {
        match self {
            Component::Sprite(c) => c.load(ctx),
            Component::Text(c) => c.load(ctx),
            Component::Collision(c) => {
                c.follow(world);
                if !c.is_registered() {
                    ctx.collisions.register(key);
                    c.set_registered(true);
                }
                Ok(())
            }
        }
    }

    /// One-time hook once every entity of the level has loaded.
    pub fn update_ready(&mut self, ctx: &mut EngineContext) {
        if let Component::Text(c) = self {
            c.update(ctx);
        }
    }

    pub fn update(&mut self, _delta_time: f32, world: &Matrix4x4, ctx: &mut EngineContext) {
        match self {
            Component::Sprite(c) => c.update(ctx),
            Component::Text(c) => c.update(ctx),
            Component::Collision(c) => c.follow(world),
        }
    }

    pub fn render(&self, world: &Matrix4x4, view: &RenderView, ctx: &EngineContext) {
        match self {
            Component::Sprite(c) => c.render(world, view, ctx),
            Component::Text(c) => c.render(world, view, ctx),
            Component::Collision(_) => {}
        }
    }

    /// Releases resources and subscriptions; the component is inert afterwards.
    pub fn dispose(&mut self, key: ColliderKey, ctx: &mut EngineContext) {
        match self {
            Component::Sprite(c) => c.dispose(ctx),
            Component::Text(c) => c.dispose(ctx),
            Component::Collision(c) => {
                if c.is_registered() {
                    ctx.collisions.unregister(key);
                    c.set_registered(false);
                }
            }
        }
    }

    /// JSON description for the inspector.
    pub fn describe(&self) -> Value {
        let data = match self {
            Component::Sprite(c) => serde_json::to_value(c.data()),
            Component::Text(c) => serde_json::to_value(c.data()),
            Component::Collision(c) => serde_json::to_value(c.data()),
        };
        let mut value = data.unwrap_or_else(|_| json!({ "name": self.name() }));
        if let Value::Object(map) = &mut value {
            map.insert("type".into(), Value::String(self.type_tag().into()));
        }
        value
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.type_tag())
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Shape2D;

    #[test]
    fn builds_sprite_with_defaults() {
        let registry = Component::registry().unwrap();
        let bus = MessageBus::default();
        let component = registry
            .extract(&json!({"type": "sprite", "name": "s", "materialName": "m"}), &bus)
            .unwrap();
        let sprite = component.as_sprite().unwrap();
        assert_eq!(sprite.name(), "s");
        assert_eq!((sprite.data().width, sprite.data().height), (100.0, 100.0));
    }

    #[test]
    fn sprite_requires_material() {
        let registry = Component::registry().unwrap();
        let result = registry.extract(&json!({"type": "sprite", "name": "s"}), &MessageBus::default());
        assert!(matches!(result, Err(SceneError::MissingField { field: "materialName", .. })));
    }

    #[test]
    fn text_subscribes_for_replacement_text() {
        let registry = Component::registry().unwrap();
        let bus = MessageBus::default();
        registry
            .extract(&json!({"type": "text", "name": "title", "fontName": "f"}), &bus)
            .unwrap();
        assert_eq!(bus.subscriber_count("title:SetText"), 1);
    }

    #[test]
    fn collision_defaults_to_static() {
        let registry = Component::registry().unwrap();
        let component = registry
            .extract(
                &json!({"type": "collision", "name": "c", "shape": {"type": "circle", "radius": 4}}),
                &MessageBus::default(),
            )
            .unwrap();
        let collision = component.as_collision().unwrap();
        assert!(collision.is_static());
        assert!(matches!(collision.shape(), Shape2D::Circle(c) if c.radius == 4.0));
    }

    #[test]
    fn describe_includes_type_tag() {
        let registry = Component::registry().unwrap();
        let component = registry
            .extract(&json!({"type": "sprite", "name": "s", "materialName": "m"}), &MessageBus::default())
            .unwrap();
        let described = component.describe();
        assert_eq!(described["type"], "sprite");
        assert_eq!(described["materialName"], "m");
    }
}
