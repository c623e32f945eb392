//! RecipeMaster Shared Types
//!
//! This crate contains the wire event types and identifiers shared by the
//! notification relay server and its clients.

pub mod error;
pub mod event;
pub mod types;

pub use error::*;
pub use event::{Event, RecipeEvent, RecipeEventKind};
pub use types::*;
