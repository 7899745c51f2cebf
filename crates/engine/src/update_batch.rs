//! Update-batch builder: derived writes that keep inverse links consistent
//!
//! After a write produces records with assigned ids, this module computes
//! the minimal set of update operations on *other* record types so that
//! every declared inverse field reflects the change. Operations are built
//! through a lookup-or-create map keyed by `(linked type, target id)`, so
//! a target referenced by many source records receives one merged op
//! listing all back-references instead of one op per reference.
//!
//! All functions here are pure over (records, schema); nothing touches the
//! backend.

use std::collections::{BTreeMap, BTreeSet};
use weft_core::{Record, RecordId, Result, Schema, UpdateOp, Value, WeftError};

/// Accumulator of derived update operations
///
/// Owned by one request and passed through the pipeline by value; there is
/// no ambient shared state between requests.
#[derive(Debug, Default)]
pub struct UpdateBatch {
    ops: BTreeMap<(String, RecordId), UpdateOp>,
}

impl UpdateBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    fn op_mut(&mut self, type_name: &str, target: &RecordId) -> &mut UpdateOp {
        self.ops
            .entry((type_name.to_string(), target.clone()))
            .or_insert_with(|| UpdateOp::new(target.clone()))
    }

    /// Add `id` into an array inverse field, once
    fn push_id(&mut self, type_name: &str, target: &RecordId, field: &str, id: &RecordId) {
        let entry = self
            .op_mut(type_name, target)
            .push
            .entry(field.to_string())
            .or_default();
        let value = Value::from(id.as_str());
        if !entry.contains(&value) {
            entry.push(value);
        }
    }

    /// Point a singular inverse field at `id`
    ///
    /// When several sources in one batch claim the same singular inverse,
    /// the later source in stable input order wins; the overwrite here is
    /// that rule.
    fn set_id(&mut self, type_name: &str, target: &RecordId, field: &str, id: &RecordId) {
        self.op_mut(type_name, target)
            .replace
            .insert(field.to_string(), Value::from(id.as_str()));
    }

    /// Remove `id` from an array inverse field
    fn pull_id(&mut self, type_name: &str, target: &RecordId, field: &str, id: &RecordId) {
        let entry = self
            .op_mut(type_name, target)
            .pull
            .entry(field.to_string())
            .or_default();
        let value = Value::from(id.as_str());
        if !entry.contains(&value) {
            entry.push(value);
        }
    }

    /// Clear a singular inverse field
    fn clear_field(&mut self, type_name: &str, target: &RecordId, field: &str) {
        self.op_mut(type_name, target)
            .replace
            .insert(field.to_string(), Value::Null);
    }

    /// Whether no operations have accumulated
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Group operations per linked record type
    ///
    /// Operations come out in `(type, id)` order; zero-mutation ops are
    /// dropped so a type never receives an empty write.
    pub fn into_per_type(self) -> BTreeMap<String, Vec<UpdateOp>> {
        let mut grouped: BTreeMap<String, Vec<UpdateOp>> = BTreeMap::new();
        for ((type_name, _), op) in self.ops {
            if op.has_mutations() {
                grouped.entry(type_name).or_default().push(op);
            }
        }
        grouped
    }
}

enum Direction {
    Attach,
    Detach,
}

fn propagate(
    batch: &mut UpdateBatch,
    schema: &Schema,
    type_name: &str,
    record: &Record,
    direction: &Direction,
) -> Result<()> {
    let def = schema.type_def(type_name)?;
    let own_id = record.id().cloned().ok_or_else(|| WeftError::BackendContract {
        reason: format!("'{type_name}' record is missing its assigned id"),
    })?;
    for (name, field_def) in def.link_fields() {
        let Some(target) = field_def.link_target() else {
            continue;
        };
        let Some(inverse) = field_def.inverse_name() else {
            continue;
        };
        // The schema builder guarantees the inverse exists on the target.
        let inverse_is_array = schema
            .type_def(target)?
            .field(inverse)
            .map(|d| d.is_array())
            .unwrap_or(false);
        for target_id in record.link_ids(name) {
            match (&direction, inverse_is_array) {
                (Direction::Attach, true) => batch.push_id(target, &target_id, inverse, &own_id),
                (Direction::Attach, false) => batch.set_id(target, &target_id, inverse, &own_id),
                (Direction::Detach, true) => batch.pull_id(target, &target_id, inverse, &own_id),
                (Direction::Detach, false) => batch.clear_field(target, &target_id, inverse),
            }
        }
    }
    Ok(())
}

/// Derive back-reference additions for freshly created records
///
/// Records are visited in stable input order, which is what makes the
/// singular-inverse overwrite rule deterministic.
///
/// # Errors
///
/// `BackendContract` if any record lacks an id.
pub fn attach_records(schema: &Schema, type_name: &str, records: &[Record]) -> Result<UpdateBatch> {
    let mut batch = UpdateBatch::new();
    for record in records {
        propagate(&mut batch, schema, type_name, record, &Direction::Attach)?;
    }
    Ok(batch)
}

/// Derive back-reference removals for records about to be deleted
///
/// Array inverses get a pull of the deleted id; singular inverses are
/// cleared. The inputs are pre-delete images, read before the physical
/// delete executes.
pub fn detach_records(schema: &Schema, type_name: &str, records: &[Record]) -> Result<UpdateBatch> {
    let mut batch = UpdateBatch::new();
    for record in records {
        propagate(&mut batch, schema, type_name, record, &Direction::Detach)?;
    }
    Ok(batch)
}

/// Derive back-reference changes between before and after images
///
/// `before[i]` and `after[i]` must describe the same record. Ids present
/// only in the after image attach; ids present only in the before image
/// detach; unchanged references produce nothing.
pub fn diff_records(
    schema: &Schema,
    type_name: &str,
    before: &[Record],
    after: &[Record],
) -> Result<UpdateBatch> {
    let def = schema.type_def(type_name)?;
    let mut batch = UpdateBatch::new();
    for (old, new) in before.iter().zip(after) {
        let own_id = old.id().cloned().ok_or_else(|| WeftError::BackendContract {
            reason: format!("'{type_name}' record is missing its assigned id"),
        })?;
        for (name, field_def) in def.link_fields() {
            let Some(target) = field_def.link_target() else {
                continue;
            };
            let Some(inverse) = field_def.inverse_name() else {
                continue;
            };
            let inverse_is_array = schema
                .type_def(target)?
                .field(inverse)
                .map(|d| d.is_array())
                .unwrap_or(false);
            let old_ids: BTreeSet<RecordId> = old.link_ids(name).into_iter().collect();
            let new_ids: BTreeSet<RecordId> = new.link_ids(name).into_iter().collect();
            for added in new.link_ids(name) {
                if old_ids.contains(&added) {
                    continue;
                }
                if inverse_is_array {
                    batch.push_id(target, &added, inverse, &own_id);
                } else {
                    batch.set_id(target, &added, inverse, &own_id);
                }
            }
            for removed in old.link_ids(name) {
                if new_ids.contains(&removed) {
                    continue;
                }
                if inverse_is_array {
                    batch.pull_id(target, &removed, inverse, &own_id);
                } else {
                    batch.clear_field(target, &removed, inverse);
                }
            }
        }
    }
    Ok(batch)
}
