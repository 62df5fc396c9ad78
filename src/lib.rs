pub mod assets;
pub mod behaviors;
pub mod collision;
pub mod components;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod graphics;
pub mod input;
pub mod level;
pub mod logging;
pub mod math;
pub mod message;
pub mod page;
pub mod registry;
pub mod renderer;
pub mod scene;

pub use config::EngineConfig;
pub use context::EngineContext;
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, Result};
