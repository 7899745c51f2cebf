//! Partial-update representation
//!
//! An [`UpdateOp`] addresses one record by id and carries per-field
//! mutations: `replace` substitutes a whole value, `push` appends to an
//! array field, `pull` removes from one. The same shape serves two roles:
//! callers submit update ops as request payload, and the update-batch
//! builder emits them as the derived writes that keep inverse links
//! consistent.

use crate::record::Record;
use crate::types::RecordId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A partial update against one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateOp {
    /// Primary key of the record to update
    pub id: RecordId,
    /// Whole-value substitutions per field; `Null` clears the field
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub replace: BTreeMap<String, Value>,
    /// Values appended to array fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub push: BTreeMap<String, Vec<Value>>,
    /// Values removed from array fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pull: BTreeMap<String, Vec<Value>>,
}

impl UpdateOp {
    /// Create an empty op addressing the given record
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            replace: BTreeMap::new(),
            push: BTreeMap::new(),
            pull: BTreeMap::new(),
        }
    }

    /// Add a whole-value substitution (builder style)
    pub fn with_replace(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.replace.insert(field.into(), value.into());
        self
    }

    /// Add an array append (builder style)
    pub fn with_push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push.entry(field.into()).or_default().push(value.into());
        self
    }

    /// Add an array removal (builder style)
    pub fn with_pull(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.pull.entry(field.into()).or_default().push(value.into());
        self
    }

    /// Whether the op carries any field mutation at all
    ///
    /// The update-batch builder never emits an op for which this is false.
    pub fn has_mutations(&self) -> bool {
        !self.replace.is_empty() || !self.push.is_empty() || !self.pull.is_empty()
    }

    /// Names of every field the op touches
    pub fn touched_fields(&self) -> BTreeSet<&str> {
        self.replace
            .keys()
            .chain(self.push.keys())
            .chain(self.pull.keys())
            .map(String::as_str)
            .collect()
    }

    /// Drop every mutation touching the named field
    pub fn strip_field(&mut self, field: &str) {
        self.replace.remove(field);
        self.push.remove(field);
        self.pull.remove(field);
    }

    /// Apply the mutations to a record image in memory
    ///
    /// Replace runs first, then push, then pull, so an op that replaces an
    /// array and pushes into it behaves the same as the backend applying
    /// the mutations in that documented order. Pushing into a null or
    /// absent field materializes the array.
    pub fn apply_to(&self, record: &mut Record) {
        for (field, value) in &self.replace {
            record.insert(field.clone(), value.clone());
        }
        for (field, values) in &self.push {
            match record.get_mut(field) {
                Some(Value::Array(items)) => items.extend(values.iter().cloned()),
                _ => record.insert(field.clone(), Value::Array(values.clone())),
            }
        }
        for (field, values) in &self.pull {
            if let Some(Value::Array(items)) = record.get_mut(field) {
                items.retain(|item| !values.contains(item));
            }
        }
    }
}
