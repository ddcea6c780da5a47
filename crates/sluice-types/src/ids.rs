//! Type-safe identifier wrappers.
//!
//! Producer-supplied keys ([`EventId`], [`Identity`]) are opaque strings:
//! this crate never interprets their contents, it only compares them.
//! [`Category`] wraps the numeric event kind and [`RowId`] wraps the
//! key assigned by the event store on insert.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_key {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw key.
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw key.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

define_key! {
    /// Producer-supplied unique event key (the Nostr event id).
    ///
    /// The store rejects a second event carrying an id it already holds.
    EventId
}

define_key! {
    /// Owner key grouping events for per-identity retention (the Nostr
    /// `pubkey`).
    Identity
}

/// Integer classifying an event's semantic kind (the Nostr `kind`).
///
/// Retention is scoped to `(Identity, Category)` pairs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Category(pub u16);

impl Category {
    /// Return the raw kind number.
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Widen to the signed column type used by the SQL backends.
    pub fn to_db(self) -> i32 {
        i32::from(self.0)
    }

    /// Narrow a database column back into a category.
    ///
    /// Returns `None` if the stored value is outside the `u16` range.
    pub fn from_db(raw: i32) -> Option<Self> {
        u16::try_from(raw).ok().map(Self)
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for Category {
    fn from(kind: u16) -> Self {
        Self(kind)
    }
}

/// Store-assigned row key returned by a successful persist.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl core::fmt::Display for RowId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
