//! The admission gate: a synchronous accept/reject decision made before
//! an event is persisted.
//!
//! The gate is pure. It performs no I/O and returns the same decision for
//! the same event every time. Rejection is a policy outcome, not an
//! error; the transport decides how to report the reason to the producer.

use std::collections::BTreeSet;

use sluice_types::{Category, EncodeError, Event};

use crate::config::AdmissionConfig;

/// Why an event was turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The encoded event exceeds the size ceiling.
    TooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Configured ceiling in bytes.
        max: usize,
    },
    /// The event could not be encoded to measure its size.
    Unencodable(String),
    /// The relay only accepts a fixed set of kinds and this is not one.
    CategoryNotAllowed(Category),
}

impl core::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooLarge { size, max } => {
                write!(f, "blocked: event is {size} bytes, limit is {max}")
            }
            Self::Unencodable(detail) => write!(f, "invalid: event could not be encoded: {detail}"),
            Self::CategoryNotAllowed(category) => {
                write!(f, "blocked: kind {category} is not accepted by this relay")
            }
        }
    }
}

/// Outcome of [`AdmissionGate::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The event may be persisted.
    Accepted,
    /// The event must not be persisted.
    Rejected(RejectReason),
}

impl Admission {
    /// Whether the event may be persisted.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection reason, if any.
    pub const fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(reason),
        }
    }
}

/// Stateless predicate over a candidate event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionGate {
    max_event_bytes: usize,
    allowed_categories: BTreeSet<Category>,
}

impl AdmissionGate {
    /// A gate with a size ceiling that accepts every kind.
    pub const fn new(max_event_bytes: usize) -> Self {
        Self {
            max_event_bytes,
            allowed_categories: BTreeSet::new(),
        }
    }

    /// Build a gate from configuration.
    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.max_event_bytes).with_allowed_categories(
            config.allowed_categories.iter().copied().map(Category),
        )
    }

    /// Restrict admission to the given kinds. An empty set admits all.
    #[must_use]
    pub fn with_allowed_categories(
        mut self,
        categories: impl IntoIterator<Item = Category>,
    ) -> Self {
        self.allowed_categories = categories.into_iter().collect();
        self
    }

    /// The configured size ceiling.
    pub const fn max_event_bytes(&self) -> usize {
        self.max_event_bytes
    }

    /// The configured kind allowlist (empty = all kinds).
    pub const fn allowed_categories(&self) -> &BTreeSet<Category> {
        &self.allowed_categories
    }

    /// Decide whether `event` may be persisted.
    ///
    /// An event exactly `max_event_bytes` long is accepted; one byte more
    /// is rejected.
    pub fn admit(&self, event: &Event) -> Admission {
        if !self.allowed_categories.is_empty() && !self.allowed_categories.contains(&event.category)
        {
            return Admission::Rejected(RejectReason::CategoryNotAllowed(event.category));
        }

        self.check_size(event.encoded_len())
    }

    /// Apply the size ceiling to a measured encoding. An encoding failure
    /// is a rejection, never a pass.
    fn check_size(&self, encoded: Result<usize, EncodeError>) -> Admission {
        match encoded {
            Ok(size) if size > self.max_event_bytes => Admission::Rejected(RejectReason::TooLarge {
                size,
                max: self.max_event_bytes,
            }),
            Ok(_) => Admission::Accepted,
            Err(e) => Admission::Rejected(RejectReason::Unencodable(e.to_string())),
        }
    }
}
