//! Relay event types and serialization
//!
//! Every message on the relay, in both directions, is a single JSON object.
//! The relay treats the object as opaque and forwards it verbatim; by
//! convention most events carry a string `type` discriminator, and recipe
//! mutation handlers and the dashboard use the typed [`RecipeEvent`] view on
//! top of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::error::EventError;

// =============================================================================
// Generic Event
// =============================================================================

/// An application event as carried on the wire: any JSON object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Create an event with no fields besides its `type`
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::default().with_field("type", event_type.into())
    }

    /// Add or replace a field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Parse a raw wire payload. Anything but a JSON object is rejected.
    pub fn parse(raw: &str) -> Result<Self, EventError> {
        serde_json::from_str(raw).map_err(EventError::Malformed)
    }

    /// Encode to the wire format
    pub fn to_json(&self) -> Result<String, EventError> {
        serde_json::to_string(self).map_err(EventError::Encode)
    }

    /// The `type` discriminator, if present and a string
    pub fn event_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl From<Event> for Value {
    fn from(event: Event) -> Self {
        Value::Object(event.0)
    }
}

// =============================================================================
// Recipe Mutation Events
// =============================================================================

/// The recipe mutations that are announced to every connected dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeEventKind {
    #[serde(rename = "recipeCreated")]
    Created,
    #[serde(rename = "recipeUpdated")]
    Updated,
    #[serde(rename = "recipeDeleted")]
    Deleted,
}

impl RecipeEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeEventKind::Created => "recipeCreated",
            RecipeEventKind::Updated => "recipeUpdated",
            RecipeEventKind::Deleted => "recipeDeleted",
        }
    }

    pub fn from_type(event_type: &str) -> Option<Self> {
        match event_type {
            "recipeCreated" => Some(RecipeEventKind::Created),
            "recipeUpdated" => Some(RecipeEventKind::Updated),
            "recipeDeleted" => Some(RecipeEventKind::Deleted),
            _ => None,
        }
    }
}

/// Typed view of a recipe mutation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeEvent {
    #[serde(rename = "type")]
    pub kind: RecipeEventKind,
    /// Display name of the user who made the change
    pub user_name: String,
    pub recipe_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl RecipeEvent {
    pub fn new(
        kind: RecipeEventKind,
        user_name: impl Into<String>,
        recipe_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            user_name: user_name.into(),
            recipe_name: recipe_name.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(user_name: impl Into<String>, recipe_name: impl Into<String>) -> Self {
        Self::new(RecipeEventKind::Created, user_name, recipe_name)
    }

    pub fn updated(user_name: impl Into<String>, recipe_name: impl Into<String>) -> Self {
        Self::new(RecipeEventKind::Updated, user_name, recipe_name)
    }

    pub fn deleted(user_name: impl Into<String>, recipe_name: impl Into<String>) -> Self {
        Self::new(RecipeEventKind::Deleted, user_name, recipe_name)
    }

    /// Convert into the generic wire event
    pub fn to_event(&self) -> Result<Event, EventError> {
        let value = serde_json::to_value(self).map_err(EventError::Encode)?;
        serde_json::from_value(value).map_err(EventError::Encode)
    }

    /// Interpret a generic event as a recipe mutation
    pub fn from_event(event: &Event) -> Result<Self, EventError> {
        let event_type = event.event_type().ok_or(EventError::MissingType)?;
        if RecipeEventKind::from_type(event_type).is_none() {
            return Err(EventError::NotRecipeEvent(event_type.to_string()));
        }
        serde_json::from_value(Value::from(event.clone())).map_err(EventError::Malformed)
    }

    /// One-line notification text as shown on the dashboard
    pub fn summary(&self) -> String {
        match self.kind {
            RecipeEventKind::Created => {
                format!("{} just added \"{}\"!", self.user_name, self.recipe_name)
            }
            RecipeEventKind::Updated => {
                format!("{} updated \"{}\"!", self.user_name, self.recipe_name)
            }
            RecipeEventKind::Deleted => {
                format!("{} deleted \"{}\"", self.user_name, self.recipe_name)
            }
        }
    }
}
