use std::sync::Arc;

use serde_json::{Value, json};

use pagecraft::EngineContext;
use pagecraft::assets::MemorySource;
use pagecraft::level::*;
use pagecraft::math::{Vector2, Vector3};
use pagecraft::message::{LEVEL_LOADED, Mailbox, Subscriber};
use pagecraft::renderer::{HeadlessDevice, shared};

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> EngineContext {
        let (_, gpu) = shared(HeadlessDevice::new(800, 600));
        EngineContext::new(gpu, Arc::new(MemorySource::new()), 10, Vector2::new(800.0, 600.0)).unwrap()
    }

    fn level_json() -> Value {
        json!({
            "name": "root",
            "description": "front page",
            "page": {
                "pageConfig": {"name": "p"},
                "objects": [
                    {"name": "a", "transform": {"position": {"x": 10, "y": 5, "z": 0}}}
                ]
            }
        })
    }

    // -- loading from JSON -----------------------------------------------

    #[test]
    fn objects_become_root_children_beside_the_page() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        levels.load_level_from_json(&level_json(), &mut ctx).unwrap();

        let level = levels.active_level().unwrap();
        assert_eq!(level.name(), "root");
        assert_eq!(level.description(), Some("front page"));
        assert_eq!(level.state(), LevelState::Updating);

        let scene = level.scene();
        let a = scene.entity_by_name("a").unwrap();
        assert_eq!(scene.parent(a), Some(scene.root()));
        assert_eq!(scene.world_position(a), Some(Vector3::new(10.0, 5.0, 0.0)));

        let page = scene.entity_by_name("p").unwrap();
        assert_eq!(scene.parent(page), Some(scene.root()));

        // page, object and the camera created for the level
        assert_eq!(scene.children(scene.root()).len(), 3);
        assert!(scene.entity_by_name(DEFAULT_CAMERA_NAME).is_some());
    }

    #[test]
    fn child_world_position_includes_parent() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({
            "name": "nested",
            "page": {
                "pageConfig": {},
                "objects": [{
                    "name": "parent",
                    "transform": {"position": {"x": 100, "y": 50}},
                    "children": [
                        {"name": "child", "transform": {"position": {"x": 5, "y": 5}}}
                    ]
                }]
            }
        });
        levels.load_level_from_json(&json, &mut ctx).unwrap();

        let scene = levels.active_level().unwrap().scene();
        let child = scene.entity_by_name("child").unwrap();
        assert_eq!(scene.world_position(child), Some(Vector3::new(105.0, 55.0, 0.0)));
        assert_eq!(scene.name(scene.parent(child).unwrap()), Some("parent"));
    }

    #[test]
    fn loading_announces_level_name() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let mailbox = Mailbox::new();
        ctx.bus.subscribe(LEVEL_LOADED, Subscriber::handler(&mailbox));

        levels.load_level_from_json(&level_json(), &mut ctx).unwrap();
        ctx.bus.update(0.0);

        let messages = mailbox.drain();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), Some("root"));
    }

    #[test]
    fn declared_camera_is_used_instead_of_a_default_one() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({
            "name": "cams",
            "page": {
                "pageConfig": {},
                "defaultCamera": "main",
                "objects": [
                    {"name": "main", "type": "orthographicCamera", "transform": {"position": {"x": -20}}}
                ]
            }
        });
        levels.load_level_from_json(&json, &mut ctx).unwrap();

        let level = levels.active_level().unwrap();
        let main = level.scene().entity_by_name("main").unwrap();
        assert_eq!(level.active_camera(), Some(main));
        assert!(level.scene().entity_by_name(DEFAULT_CAMERA_NAME).is_none());
        let view = level.camera_view().unwrap();
        assert_eq!(view.transform_point4([0.0, 0.0, 0.0])[0], -20.0);
    }

    // -- failures --------------------------------------------------------

    #[test]
    fn malformed_level_does_not_become_active() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({"name": "broken", "page": {"pageConfig": {}, "objects": [{"transform": {}}]}});
        assert!(levels.load_level_from_json(&json, &mut ctx).is_err());
        assert!(levels.active_level().is_none());
    }

    #[test]
    fn missing_objects_is_an_error() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({"name": "empty", "page": {"pageConfig": {}}});
        assert!(levels.load_level_from_json(&json, &mut ctx).is_err());
    }

    // -- teardown --------------------------------------------------------

    #[test]
    fn unloading_releases_scene_resources() {
        let mut ctx = context();
        ctx.materials
            .load_manifest(&json!({"materials": [{"name": "wood", "diffuse": "wood.png"}]}))
            .unwrap();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({
            "name": "res",
            "page": {
                "pageConfig": {},
                "objects": [{
                    "name": "box",
                    "components": [
                        {"type": "sprite", "materialName": "wood"},
                        {"type": "collision", "shape": {"type": "rectangle", "width": 10, "height": 10}}
                    ]
                }]
            }
        });
        levels.load_level_from_json(&json, &mut ctx).unwrap();
        assert_eq!(ctx.materials.reference_count("wood"), Some(1));
        assert_eq!(ctx.collisions.len(), 1);

        levels.unload(&mut ctx);
        assert!(levels.active_level().is_none());
        assert!(ctx.materials.material("wood").is_none());
        assert!(ctx.textures.is_empty());
        assert!(ctx.collisions.is_empty());
    }

    // -- late materials --------------------------------------------------

    #[test]
    fn sprite_picks_up_a_material_registered_after_loading() {
        let mut ctx = context();
        let mut levels = LevelManager::new(ctx.bus.clone());
        let json = json!({
            "name": "late",
            "page": {
                "pageConfig": {},
                "objects": [{"name": "box", "components": [{"type": "sprite", "materialName": "wood"}]}]
            }
        });
        levels.load_level_from_json(&json, &mut ctx).unwrap();
        assert!(ctx.materials.material("wood").is_none());

        ctx.materials
            .load_manifest(&json!({"materials": [{"name": "wood", "diffuse": "wood.png"}]}))
            .unwrap();
        levels.update_level(0.016, &mut ctx);
        levels.update_level(0.016, &mut ctx);

        assert_eq!(ctx.materials.reference_count("wood"), Some(1));
        let scene = levels.active_level().unwrap().scene();
        let sprite = scene.component(scene.entity_by_name("box").unwrap(), 0).unwrap();
        assert!(sprite.as_sprite().unwrap().sprite().is_acquired());
    }
}
