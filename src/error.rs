use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed scene, component, behavior or page data.
///
/// Every variant is fatal for the load path that produced it: a level that fails
/// to parse is never left half-built.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("{kind} is missing required field `{field}`")]
    MissingField { kind: &'static str, field: &'static str },

    #[error("{kind} type is missing or builder is not registered for this type")]
    MissingType { kind: &'static str },

    #[error("unsupported {kind} type `{tag}`")]
    UnknownType { kind: &'static str, tag: String },

    #[error("a {kind} builder for type `{tag}` is already registered")]
    DuplicateBuilder { kind: &'static str, tag: String },

    #[error("{kind} builders need a non-empty type tag")]
    EmptyTag { kind: &'static str },

    #[error("unsupported shape type `{0}`")]
    UnsupportedShape(String),

    #[error("default camera `{0}` not found")]
    DefaultCameraNotFound(String),

    #[error("invalid {kind} data: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl SceneError {
    pub(crate) fn json(kind: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| SceneError::Json { kind, source }
    }
}

/// Failures while fetching or decoding an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("asset `{0}` does not exist in the asset source")]
    NotFound(String),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to parse json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("text asset is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("load of `{0}` was cancelled")]
    Cancelled(String),

    #[error("loader for `{0}` stopped before reporting a result")]
    WorkerLost(String),
}

/// Bitmap font description errors.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("font file reported existence of {declared} glyphs, but only {found} were found")]
    GlyphCountMismatch { declared: usize, found: usize },

    #[error("line {line}: field `{field}` is missing or not a number")]
    InvalidField { line: usize, field: &'static str },

    #[error("font asset `{0}` is not a text asset")]
    NotText(String),
}

/// GPU setup and resource errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("error compiling shader `{name}`: {log}")]
    ShaderCompile { name: String, log: String },

    #[error("no suitable GPU adapter found: {0}")]
    Adapter(String),

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("level named `{0}` is not registered")]
    LevelNotRegistered(String),

    #[error("invalid manifest `{name}`: {reason}")]
    InvalidManifest { name: String, reason: String },

    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    ConfigFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid editor event: {0}")]
    Event(#[source] serde_json::Error),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
