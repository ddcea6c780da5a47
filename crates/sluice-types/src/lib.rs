//! Shared type definitions for the Sluice relay retention layer.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for event keys, identities, categories
//!   and store row keys
//! - [`event`] -- The [`Event`] itself and its canonical encoding

pub mod event;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use event::{EncodeError, Event, StoredEvent};
pub use ids::{Category, EventId, Identity, RowId};
