//! Type-tag dispatch from JSON nodes to closed enums of runtime objects.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::SceneError;
use crate::message::MessageBus;

/// Builds one variant of `T` from its JSON node. Builders that subscribe to
/// the bus do so here.
pub type Builder<T> = fn(&Value, &MessageBus) -> Result<T, SceneError>;

/// Maps the `type` field of a JSON node to the builder for that variant.
pub struct BuilderRegistry<T> {
    kind: &'static str,
    builders: HashMap<String, Builder<T>>,
}

impl<T> BuilderRegistry<T> {
    /// `kind` names the family in errors ("component", "behavior", ...).
    pub fn new(kind: &'static str) -> Self {
        Self { kind, builders: HashMap::new() }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Tags are validated here so that lookups never see an empty or shadowed tag.
    pub fn register(&mut self, tag: &str, builder: Builder<T>) -> Result<(), SceneError> {
        if tag.is_empty() {
            return Err(SceneError::EmptyTag { kind: self.kind });
        }
        if self.builders.contains_key(tag) {
            return Err(SceneError::DuplicateBuilder { kind: self.kind, tag: tag.to_owned() });
        }
        self.builders.insert(tag.to_owned(), builder);
        Ok(())
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }

    /// Builds the object described by `json`. A missing `type` or a tag with no
    /// registered builder is an error.
    pub fn extract(&self, json: &Value, bus: &MessageBus) -> Result<T, SceneError> {
        let tag = json
            .get("type")
            .and_then(Value::as_str)
            .ok_or(SceneError::MissingType { kind: self.kind })?;
        let builder = self
            .builders
            .get(tag)
            .ok_or_else(|| SceneError::UnknownType { kind: self.kind, tag: tag.to_owned() })?;
        builder(json, bus)
    }
}
