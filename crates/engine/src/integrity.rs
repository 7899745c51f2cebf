//! Link integrity: referential existence checks for link values
//!
//! Confirms that every id named by a link field resolves to an existing
//! record of the linked type. The whole module is bypassed when an
//! instance is configured with `enforce_links` off, in which case dangling
//! links are accepted silently.

use std::collections::BTreeSet;
use weft_core::schema::TypeDef;
use weft_core::{link_ids_of, Backend, Record, RecordId, Result, UpdateOp, WeftError};

/// Verify that the named ids all exist in the target type's collection
///
/// Reads committed state through `Backend::find`; a transaction open for
/// the current request never affects what this sees.
async fn require_existing(
    backend: &dyn Backend,
    field: &str,
    target: &str,
    ids: &[RecordId],
) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = backend.find(target, ids).await?;
    let present: BTreeSet<&RecordId> = found.iter().filter_map(Record::id).collect();
    for id in ids {
        if !present.contains(id) {
            return Err(WeftError::InvalidLink {
                field: field.into(),
                target: target.into(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}

/// Check every link value of a candidate record
///
/// # Errors
///
/// `InvalidLink` naming the offending field and the first missing id, in
/// the record's field order.
pub async fn check_record_links(
    backend: &dyn Backend,
    def: &TypeDef,
    record: &Record,
) -> Result<()> {
    for (name, field_def) in def.link_fields() {
        let Some(target) = field_def.link_target() else {
            continue;
        };
        let ids = record.link_ids(name);
        require_existing(backend, name, target, &ids).await?;
    }
    Ok(())
}

/// Check every link id newly introduced by an update op
///
/// Only `replace` and `push` introduce references; `pull` removes them
/// and needs no existence check.
pub async fn check_update_links(
    backend: &dyn Backend,
    def: &TypeDef,
    op: &UpdateOp,
) -> Result<()> {
    for (name, field_def) in def.link_fields() {
        let Some(target) = field_def.link_target() else {
            continue;
        };
        let mut ids = Vec::new();
        if let Some(value) = op.replace.get(name) {
            ids.extend(link_ids_of(value));
        }
        if let Some(values) = op.push.get(name) {
            for value in values {
                ids.extend(link_ids_of(value));
            }
        }
        require_existing(backend, name, target, &ids).await?;
    }
    Ok(())
}
