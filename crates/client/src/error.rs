//! Client error types

use recipemaster_shared::EventError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Publishing is only possible while connected; nothing is queued
    #[error("Not connected to the relay")]
    NotConnected,

    #[error(transparent)]
    Event(#[from] EventError),
}
