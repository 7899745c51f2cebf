//! Identifier types for Weft records
//!
//! This module defines RecordId, the opaque primary key assigned to every
//! persisted record.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque primary key for a persisted record
///
/// Ids are unique within a record type, assigned by the storage backend on
/// creation (never by the caller), and comparable for equality and
/// ordering. The payload is an arbitrary string so adapters are free to
/// assign whatever identifiers their store produces; [`RecordId::generate`]
/// yields a UUID v4 for adapters without native id assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create a new random RecordId using UUID v4
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// View the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
