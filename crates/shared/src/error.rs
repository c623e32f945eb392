//! Error types for RecipeMaster events

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    /// Payload was not a JSON object
    #[error("Malformed event payload: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Event has no string `type` field")]
    MissingType,

    /// Event type is not one of the recipe mutation events
    #[error("Not a recipe event: {0}")]
    NotRecipeEvent(String),
}
