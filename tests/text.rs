use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;

use pagecraft::Engine;
use pagecraft::assets::MemorySource;
use pagecraft::message::{Payload, set_text_code};
use pagecraft::renderer::{HeadlessDevice, shared};

#[cfg(test)]
mod tests {
    use super::*;

    const FONT: &str = "info face=\"Body Sans\" size=20\n\
common lineHeight=20 base=16 scaleW=100 scaleH=50\n\
page id=0 file=\"atlas.png\"\n\
chars count=2\n\
char id=63 x=0 y=0 width=10 height=10 xoffset=0 yoffset=0 xadvance=12 page=0 chnl=15\n\
char id=66 x=10 y=0 width=10 height=20 xoffset=1 yoffset=2 xadvance=11 page=0 chnl=15\n";

    fn engine() -> (Rc<RefCell<HeadlessDevice>>, Engine) {
        let pages = json!({"pages": [{"name": "title", "file": "title.json"}]});
        let level = json!({
            "name": "title",
            "page": {
                "pageConfig": {},
                "objects": [{
                    "name": "heading",
                    "components": [{"type": "text", "name": "banner", "fontName": "body", "textContent": "B?"}]
                }]
            }
        });
        let source = MemorySource::new()
            .with_file("pages.json", pages.to_string())
            .with_file("title.json", level.to_string())
            .with_file("fonts/body.fnt", FONT);

        let (device, gpu) = shared(HeadlessDevice::new(400, 300));
        let mut engine = Engine::builder()
            .with_font("body", "fonts/body.fnt")
            .with_start_level("title")
            .build_headless(gpu, Arc::new(source))
            .unwrap();
        for _ in 0..3 {
            engine.context().assets.finish_pending();
            engine.frame(0.016).unwrap();
        }
        (device, engine)
    }

    #[test]
    fn font_loads_before_level_and_text_is_drawn() {
        let (device, engine) = engine();
        assert!(engine.context().fonts.all_loaded());
        let font = engine.context().fonts.get_font("body").unwrap();
        assert_eq!(font.texture_name().as_deref(), Some("fonts/atlas.png"));

        let device = device.borrow();
        assert_eq!(device.draws.len(), 1);
        assert_eq!(device.draws[0].vertices.len(), 12);
    }

    #[test]
    fn set_text_message_rebuilds_the_mesh() {
        let (device, mut engine) = engine();
        engine
            .context()
            .bus
            .send(set_text_code("banner"), None, Payload::Text("BBB?".into()));
        engine.frame(0.016).unwrap();

        assert_eq!(device.borrow().draws[0].vertices.len(), 24);
        let level = engine.levels().active_level().unwrap();
        let (id, index) = level.scene().component_by_name("banner").unwrap();
        let text = level.scene().component(id, index).unwrap().as_text().unwrap();
        assert_eq!(text.text().text(), "BBB?");
    }

    #[test]
    fn measuring_counts_every_line() {
        let (_, engine) = engine();
        let font = engine.context().fonts.get_font("body").unwrap();
        let size = font.measure_text("BB\n?").unwrap();
        assert_eq!(size.x, 22.0);
        assert_eq!(size.y, 40.0);
    }
}
