use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, error, warn};

use crate::assets::{Asset, AssetManager};
use crate::error::FontError;
use crate::math::Vector2;
use crate::message::{Message, MessageBus, MessageHandler, Subscriber, asset_loaded_code};

/// Glyph substituted for characters the font does not contain.
pub const FALLBACK_GLYPH: char = '?';

// ── Glyph ────────────────────────────────────────────────────────────────────

/// Metrics for a single character in the font atlas, in atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub id: char,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: i32,
    pub y_offset: i32,
    pub x_advance: i32,
    pub page: u32,
    pub channel: u32,
}

// ── FontMetrics ──────────────────────────────────────────────────────────────

/// Parsed contents of a BMFont text descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontMetrics {
    /// Nominal font size; also the line advance.
    pub size: f32,
    pub image_width: u32,
    pub image_height: u32,
    /// Atlas image asset name, resolved next to the descriptor.
    pub image_file: String,
    pub glyphs: HashMap<char, Glyph>,
}

/// Splits `key=value` fields, keeping quoted values (which may contain spaces) intact.
fn fields(line: &str) -> (&str, HashMap<&str, &str>) {
    let line = line.trim();
    let (tag, mut rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let mut map = HashMap::new();
    loop {
        rest = rest.trim_start();
        let Some((key, after)) = rest.split_once('=') else {
            break;
        };
        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.split_once('"') {
                Some((value, remainder)) => (value, remainder),
                None => (quoted, ""),
            },
            None => after.split_once(char::is_whitespace).unwrap_or((after, "")),
        };
        map.insert(key.trim(), value);
        rest = remainder;
    }
    (tag, map)
}

fn number<T: std::str::FromStr>(
    map: &HashMap<&str, &str>,
    key: &'static str,
    line: usize,
) -> Result<T, FontError> {
    map.get(key)
        .and_then(|v| v.trim().parse().ok())
        .ok_or(FontError::InvalidField { line, field: key })
}

impl FontMetrics {
    /// Parses a descriptor. `image_dir` is prefixed to the page image name.
    pub fn parse(content: &str, image_dir: &str) -> Result<Self, FontError> {
        let mut metrics = FontMetrics::default();
        let mut declared = None;

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let (tag, map) = fields(line);
            match tag {
                "info" => metrics.size = number(&map, "size", line_no)?,
                "common" => {
                    metrics.image_width = number(&map, "scaleW", line_no)?;
                    metrics.image_height = number(&map, "scaleH", line_no)?;
                }
                "page" => {
                    let file = map
                        .get("file")
                        .ok_or(FontError::InvalidField { line: line_no, field: "file" })?
                        .trim();
                    metrics.image_file = if image_dir.is_empty() {
                        file.to_owned()
                    } else {
                        format!("{}/{file}", image_dir.trim_end_matches('/'))
                    };
                }
                "chars" => declared = Some(number::<usize>(&map, "count", line_no)?),
                "char" => {
                    let code: u32 = number(&map, "id", line_no)?;
                    let Some(id) = char::from_u32(code) else {
                        continue;
                    };
                    let glyph = Glyph {
                        id,
                        x: number(&map, "x", line_no)?,
                        y: number(&map, "y", line_no)?,
                        width: number(&map, "width", line_no)?,
                        height: number(&map, "height", line_no)?,
                        x_offset: number(&map, "xoffset", line_no)?,
                        y_offset: number(&map, "yoffset", line_no)?,
                        x_advance: number(&map, "xadvance", line_no)?,
                        page: number(&map, "page", line_no).unwrap_or(0),
                        channel: number(&map, "chnl", line_no).unwrap_or(0),
                    };
                    metrics.glyphs.insert(id, glyph);
                }
                _ => {}
            }
        }

        if let Some(declared) = declared {
            if declared != metrics.glyphs.len() {
                return Err(FontError::GlyphCountMismatch { declared, found: metrics.glyphs.len() });
            }
        }
        Ok(metrics)
    }

    /// Glyph for `ch`, or the `?` glyph when the font lacks it.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&FALLBACK_GLYPH))
    }

    /// Width of the widest line and total height (`lines × size`).
    pub fn measure_text(&self, text: &str) -> Vector2 {
        let mut max_x = 0.0_f32;
        let mut x = 0.0_f32;
        let mut lines = 1;
        for ch in text.chars() {
            if ch == '\n' {
                max_x = max_x.max(x);
                x = 0.0;
                lines += 1;
            } else if let Some(glyph) = self.glyph(ch) {
                x += glyph.x_advance as f32;
            }
        }
        Vector2::new(max_x.max(x), lines as f32 * self.size)
    }
}

// ── BitmapFont ───────────────────────────────────────────────────────────────

/// A named font whose metrics load asynchronously from a descriptor asset.
pub struct BitmapFont {
    name: String,
    font_file: String,
    metrics: RefCell<Option<FontMetrics>>,
    subscribed: Cell<bool>,
}

impl BitmapFont {
    pub fn new(name: impl Into<String>, font_file: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            font_file: font_file.into(),
            metrics: RefCell::new(None),
            subscribed: Cell::new(false),
        })
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn font_file(&self) -> &str { &self.font_file }

    pub fn is_loaded(&self) -> bool {
        self.metrics.borrow().is_some()
    }

    fn image_dir(&self) -> &str {
        self.font_file.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Parses the descriptor now if cached, otherwise waits for it.
    pub fn load(self: &Rc<Self>, assets: &AssetManager, bus: &MessageBus) -> Result<(), FontError> {
        if self.is_loaded() {
            return Ok(());
        }
        match assets.get_asset(&self.font_file) {
            Some(asset) => self.process(&asset),
            None => {
                if !self.subscribed.replace(true) {
                    bus.subscribe(asset_loaded_code(&self.font_file), Subscriber::handler(self));
                }
                Ok(())
            }
        }
    }

    fn process(&self, asset: &Asset) -> Result<(), FontError> {
        let content = asset.as_text().ok_or_else(|| FontError::NotText(self.font_file.clone()))?;
        let metrics = FontMetrics::parse(content, self.image_dir())?;
        debug!(font = %self.name, glyphs = metrics.glyphs.len(), "font loaded");
        *self.metrics.borrow_mut() = Some(metrics);
        Ok(())
    }

    pub fn with_metrics<R>(&self, f: impl FnOnce(&FontMetrics) -> R) -> Option<R> {
        self.metrics.borrow().as_ref().map(f)
    }

    pub fn size(&self) -> Option<f32> {
        self.with_metrics(|m| m.size)
    }

    pub fn texture_name(&self) -> Option<String> {
        self.with_metrics(|m| m.image_file.clone())
    }

    pub fn glyph(&self, ch: char) -> Option<Glyph> {
        self.with_metrics(|m| m.glyph(ch).copied()).flatten()
    }

    pub fn measure_text(&self, text: &str) -> Option<Vector2> {
        self.with_metrics(|m| m.measure_text(text))
    }

    fn dispose(self: &Rc<Self>, bus: &MessageBus) {
        if self.subscribed.replace(false) {
            bus.unsubscribe(&asset_loaded_code(&self.font_file), &Subscriber::handler(self));
        }
    }
}

impl MessageHandler for BitmapFont {
    fn on_message(&self, message: &Message) {
        if message.code != asset_loaded_code(&self.font_file) || self.is_loaded() {
            return;
        }
        let Some(asset) = message.asset() else {
            return;
        };
        if let Err(err) = self.process(asset) {
            error!(font = %self.name, "failed to parse font: {err}");
        }
    }
}

// ── BitmapFontManager ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct BitmapFontManager {
    fonts: HashMap<String, Rc<BitmapFont>>,
}

impl BitmapFontManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_font(&mut self, name: &str, font_file: &str) {
        if self.fonts.contains_key(name) {
            warn!(font = name, "a font with this name is already registered");
            return;
        }
        self.fonts.insert(name.to_owned(), BitmapFont::new(name, font_file));
    }

    pub fn load(&self, assets: &AssetManager, bus: &MessageBus) -> Result<(), FontError> {
        for font in self.fonts.values() {
            font.load(assets, bus)?;
        }
        Ok(())
    }

    pub fn get_font(&self, name: &str) -> Option<Rc<BitmapFont>> {
        self.fonts.get(name).cloned()
    }

    pub fn all_loaded(&self) -> bool {
        self.fonts.values().all(|f| f.is_loaded())
    }

    pub fn dispose(&mut self, bus: &MessageBus) {
        for font in self.fonts.values() {
            font.dispose(bus);
        }
        self.fonts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "info face=\"Roboto Light\" size=32 bold=0 italic=0\n\
common lineHeight=38 base=30 scaleW=256 scaleH=128 pages=1 packed=0\n\
page id=0 file=\"roboto.png\"\n\
chars count=2\n\
char id=63   x=0   y=0   width=14  height=20  xoffset=1  yoffset=2  xadvance=16  page=0  chnl=15\n\
char id=65   x=16  y=0   width=13  height=20  xoffset=-1 yoffset=2  xadvance=15  page=0  chnl=15\n";

    #[test]
    fn parses_header_fields() {
        let m = FontMetrics::parse(SAMPLE, "fonts").unwrap();
        assert_eq!(m.size, 32.0);
        assert_eq!((m.image_width, m.image_height), (256, 128));
        assert_eq!(m.image_file, "fonts/roboto.png");
        assert_eq!(m.glyphs.len(), 2);
    }

    #[test]
    fn parses_glyph_metrics() {
        let m = FontMetrics::parse(SAMPLE, "").unwrap();
        let a = m.glyphs[&'A'];
        assert_eq!((a.x, a.y, a.width, a.height), (16, 0, 13, 20));
        assert_eq!((a.x_offset, a.y_offset, a.x_advance), (-1, 2, 15));
        assert_eq!(a.channel, 15);
    }

    #[test]
    fn count_mismatch_is_an_error() {
        let bad = SAMPLE.replace("count=2", "count=5");
        match FontMetrics::parse(&bad, "") {
            Err(FontError::GlyphCountMismatch { declared, found }) => assert_eq!((declared, found), (5, 2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_characters_fall_back_to_question_mark() {
        let m = FontMetrics::parse(SAMPLE, "").unwrap();
        assert_eq!(m.glyph('Z').unwrap().id, '?');
    }

    #[test]
    fn measure_uses_widest_line() {
        let m = FontMetrics::parse(SAMPLE, "").unwrap();
        let size = m.measure_text("AA\nA");
        assert_eq!(size, Vector2::new(30.0, 64.0));
    }
}
