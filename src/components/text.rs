use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::EngineContext;
use crate::error::{RenderError, SceneError};
use crate::graphics::BitmapText;
use crate::math::{Matrix4x4, Vector3};
use crate::message::{Mailbox, MessageBus, Subscriber, set_text_code};
use crate::renderer::RenderView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextComponentData {
    pub name: String,
    pub font_name: String,
    pub text_content: String,
    pub origin: Vector3,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextData {
    name: Option<String>,
    font_name: Option<String>,
    text_content: Option<String>,
    origin: Option<Value>,
}

impl TextComponentData {
    pub fn from_json(json: &Value) -> Result<Self, SceneError> {
        let raw = RawTextData::deserialize(json).map_err(SceneError::json("text component"))?;
        let mut origin = Vector3::zero();
        if let Some(value) = &raw.origin {
            origin.set_from_json(value)?;
        }
        Ok(Self {
            name: raw.name.ok_or(SceneError::MissingField { kind: "text component", field: "name" })?,
            font_name: raw
                .font_name
                .ok_or(SceneError::MissingField { kind: "text component", field: "fontName" })?,
            text_content: raw.text_content.unwrap_or_default(),
            origin,
        })
    }
}

/// Bitmap text whose content can be replaced with a `<name>:SetText` message.
pub struct TextComponent {
    data: TextComponentData,
    text: BitmapText,
    mailbox: Rc<Mailbox>,
    subscribed: bool,
}

impl TextComponent {
    pub fn new(data: TextComponentData, bus: &MessageBus) -> Self {
        let mut text = BitmapText::new(&data.name, &data.font_name);
        text.set_origin(data.origin);
        text.set_text(data.text_content.clone());

        let mailbox = Mailbox::new();
        bus.subscribe(set_text_code(&data.name), Subscriber::handler(&mailbox));
        Self { data, text, mailbox, subscribed: true }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    pub fn data(&self) -> &TextComponentData {
        &self.data
    }

    pub fn text(&self) -> &BitmapText {
        &self.text
    }

    pub(super) fn load(&mut self, ctx: &mut EngineContext) -> Result<(), RenderError> {
        self.text.load(&ctx.fonts, &mut ctx.shaders)
    }

    pub(super) fn update(&mut self, ctx: &mut EngineContext) {
        for message in self.mailbox.drain() {
            if let Some(content) = message.text() {
                self.data.text_content = content.to_owned();
                self.text.set_text(content);
            }
        }
        self.text.update(&mut ctx.textures);
    }

    pub(super) fn render(&self, world: &Matrix4x4, view: &RenderView, ctx: &EngineContext) {
        self.text.draw(world, view, &ctx.textures, &ctx.shaders, &ctx.gpu);
    }

    pub(super) fn dispose(&mut self, ctx: &mut EngineContext) {
        if std::mem::take(&mut self.subscribed) {
            ctx.bus.unsubscribe(&set_text_code(&self.data.name), &Subscriber::handler(&self.mailbox));
        }
        self.text.destroy(&mut ctx.textures, &mut ctx.shaders);
    }
}
