//! The event: the unit of data flowing through the relay.
//!
//! Field names follow the Nostr wire format (`pubkey`, `kind`,
//! `created_at` as unix seconds) so that the encoded size measured by the
//! admission gate matches what a client actually sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{Category, EventId, Identity, RowId};

/// Failure to produce the canonical encoding of an event.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode event: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

/// An immutable event as submitted by a producer.
///
/// Once admitted an event is never updated in place; eviction deletes it
/// outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Producer-supplied unique event key.
    pub id: EventId,
    /// Owner key.
    #[serde(rename = "pubkey")]
    pub identity: Identity,
    /// Creation time. Client supplied and not trusted.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    /// Semantic kind.
    #[serde(rename = "kind")]
    pub category: Category,
    /// Free-form tag lists.
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    /// Event body.
    #[serde(default)]
    pub content: String,
    /// Signature, carried opaquely and never verified here.
    #[serde(default)]
    pub sig: String,
}

impl Event {
    /// Create an event with empty tags, content and signature.
    pub fn new(
        id: impl Into<EventId>,
        identity: impl Into<Identity>,
        kind: u16,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            identity: identity.into(),
            created_at,
            category: Category(kind),
            tags: Vec::new(),
            content: String::new(),
            sig: String::new(),
        }
    }

    /// Replace the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<Vec<String>>) -> Self {
        self.tags = tags;
        self
    }

    /// Canonical JSON encoding of the event.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Size in bytes of the canonical encoding.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if serialization fails.
    pub fn encoded_len(&self) -> Result<usize, EncodeError> {
        self.encode().map(|bytes| bytes.len())
    }

    /// Encode the tags for a JSON column.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if serialization fails.
    pub fn tags_json(&self) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(&self.tags)?)
    }
}

/// An event as held by the store, paired with its row key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Key assigned by the store on insert.
    pub row_id: RowId,
    /// The persisted event.
    pub event: Event,
}
