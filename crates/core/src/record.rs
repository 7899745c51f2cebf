//! Record type: a field map plus an optional primary key
//!
//! A Record is constructed from caller payload without an id, persisted by
//! the backend (which assigns the id on creation), and thereafter always
//! carries its primary key.

use crate::types::RecordId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single record of some declared record type
///
/// Fields are an ordered map from field name to [`Value`]. The id is
/// `None` for creation payloads and `Some` once the backend has persisted
/// the record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Primary key, absent until assigned by the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<RecordId>,
    /// Field name to value mapping
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record with no id
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with the given id
    pub fn with_id(id: impl Into<RecordId>) -> Self {
        Self {
            id: Some(id.into()),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, consuming and returning the record (builder style)
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get the primary key, if assigned
    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// Assign the primary key
    pub fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    /// Get a field value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a mutable field value by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Insert or overwrite a field value
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Remove a field, returning its previous value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// Iterate over fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Collect the record ids referenced by a link field
    ///
    /// Unwraps both cardinalities: a singular link (`String`) yields one
    /// id, an array link yields one per string element, and `Null` or an
    /// absent field yields none. Non-string elements are ignored; the
    /// enforcement layer rejects them before any caller relies on this.
    pub fn link_ids(&self, name: &str) -> Vec<RecordId> {
        match self.get(name) {
            Some(value) => link_ids_of(value),
            None => Vec::new(),
        }
    }
}

/// Collect the record ids held by a link value
pub fn link_ids_of(value: &Value) -> Vec<RecordId> {
    match value {
        Value::String(id) => vec![RecordId::from(id.as_str())],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(RecordId::from))
            .collect(),
        _ => Vec::new(),
    }
}
