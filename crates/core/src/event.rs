//! Change-event summary emitted after a successful commit
//!
//! One event is produced per committed request: never before commit, never
//! on an aborted request, never more than once.

use crate::ops::UpdateOp;
use crate::record::Record;
use crate::types::RecordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of what one committed request changed
///
/// Keyed by method, then by record type. The `update` map carries both the
/// caller's own update ops (update requests) and the derived ops that kept
/// inverse links consistent (all request kinds); a type appears only if it
/// actually received at least one operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Records created, per record type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub create: BTreeMap<String, Vec<Record>>,
    /// Update operations applied, per record type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub update: BTreeMap<String, Vec<UpdateOp>>,
    /// Record ids deleted, per record type
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub delete: BTreeMap<String, Vec<RecordId>>,
}

impl ChangeEvent {
    /// Whether the event carries no entries at all
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}
