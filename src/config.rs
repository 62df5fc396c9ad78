use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::graphics::Color;
use crate::message::DEFAULT_MESSAGES_PER_UPDATE;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FontEntry {
    pub name: String,
    pub file: String,
}

/// Engine settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Directory every asset name is resolved against.
    pub asset_root: PathBuf,
    pub pages_manifest: String,
    pub materials_manifest: Option<String>,
    pub fonts: Vec<FontEntry>,
    /// Level to open once the pages manifest is registered.
    pub start_level: Option<String>,
    pub messages_per_update: usize,
    pub clear_color: Color,
    pub near: f32,
    pub far: f32,
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "pagecraft".into(),
            width: 1280,
            height: 720,
            asset_root: PathBuf::from("assets"),
            pages_manifest: "pages.json".into(),
            materials_manifest: None,
            fonts: Vec::new(),
            start_level: None,
            messages_per_update: DEFAULT_MESSAGES_PER_UPDATE,
            clear_color: Color::GRAY,
            near: -100.0,
            far: 100.0,
            log_filter: "info".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| EngineError::Config { path: path.to_owned(), source })?;
        serde_json::from_str(&content).map_err(|source| EngineError::ConfigFormat { path: path.to_owned(), source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"title": "demo"}"#).unwrap();
        assert_eq!(config.title, "demo");
        assert_eq!(config.pages_manifest, "pages.json");
        assert_eq!(config.messages_per_update, 10);
        assert_eq!(config.clear_color, Color::GRAY);
        assert_eq!((config.near, config.far), (-100.0, 100.0));
    }

    #[test]
    fn reads_fonts_and_start_level() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"fonts": [{"name": "body", "file": "fonts/body.fnt"}], "start_level": "home"}"#,
        )
        .unwrap();
        assert_eq!(config.fonts, vec![FontEntry { name: "body".into(), file: "fonts/body.fnt".into() }]);
        assert_eq!(config.start_level.as_deref(), Some("home"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let result = EngineConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }
}
