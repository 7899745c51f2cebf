//! Field enforcement: schema conformance for records and update ops
//!
//! Pure checks over one declared type. Unknown fields are rejected,
//! required fields must be present and non-null, and every value must
//! match its declared type and cardinality. Checks fail fast on the first
//! violation, naming the offending field.

use weft_core::schema::{FieldDef, FieldKind, TypeDef};
use weft_core::{Record, Result, UpdateOp, Value, WeftError};

fn violation(field: &str, reason: impl Into<String>) -> WeftError {
    WeftError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Check one value against one field declaration
///
/// Null passes here for any kind; required-ness is a record-level check,
/// and a nullable field may always be cleared.
fn check_field_value(name: &str, def: &FieldDef, value: &Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match &def.kind {
        FieldKind::Value {
            value_type,
            is_array,
        } => {
            if *is_array {
                let Value::Array(items) = value else {
                    return Err(violation(
                        name,
                        format!("expected array of {}, got {}", value_type.name(), value.type_name()),
                    ));
                };
                for item in items {
                    if !value_type.validates(item) {
                        return Err(violation(
                            name,
                            format!(
                                "array element expected {}, got {}",
                                value_type.name(),
                                item.type_name()
                            ),
                        ));
                    }
                }
            } else if !value_type.validates(value) {
                return Err(violation(
                    name,
                    format!("expected {}, got {}", value_type.name(), value.type_name()),
                ));
            }
        }
        FieldKind::Link { is_array, .. } => {
            if *is_array {
                let Value::Array(items) = value else {
                    return Err(violation(
                        name,
                        format!("expected array of ids, got {}", value.type_name()),
                    ));
                };
                for item in items {
                    if item.as_str().is_none() {
                        return Err(violation(
                            name,
                            format!("link array element expected id, got {}", item.type_name()),
                        ));
                    }
                }
            } else if value.as_str().is_none() {
                return Err(violation(
                    name,
                    format!("expected id, got {}", value.type_name()),
                ));
            }
        }
    }
    Ok(())
}

/// Enforce a candidate record against its declared type
///
/// # Errors
///
/// `Validation` on the first unknown field, missing or null required
/// field, or type/cardinality mismatch.
pub fn enforce_record(def: &TypeDef, record: &Record) -> Result<()> {
    for (name, value) in record.fields() {
        let Some(field_def) = def.field(name) else {
            return Err(violation(name, "unknown field"));
        };
        check_field_value(name, field_def, value)?;
    }
    for (name, field_def) in def.fields() {
        if field_def.required && !matches!(record.get(name), Some(v) if !v.is_null()) {
            return Err(violation(name, "required field is missing"));
        }
    }
    Ok(())
}

/// Enforce an update op against its declared type
///
/// Replacement values must conform to the field declaration; push and
/// pull only apply to array fields, and pushed or pulled elements must
/// conform to the element shape.
///
/// # Errors
///
/// `Validation` on the first violation.
pub fn enforce_update(def: &TypeDef, op: &UpdateOp) -> Result<()> {
    for (name, value) in &op.replace {
        let Some(field_def) = def.field(name) else {
            return Err(violation(name, "unknown field"));
        };
        check_field_value(name, field_def, value)?;
    }
    for (maps, verb) in [(&op.push, "push"), (&op.pull, "pull")] {
        for (name, values) in maps.iter() {
            let Some(field_def) = def.field(name) else {
                return Err(violation(name, "unknown field"));
            };
            if !field_def.is_array() {
                return Err(violation(name, format!("{verb} on a non-array field")));
            }
            let element_probe = Value::Array(values.clone());
            check_field_value(name, field_def, &element_probe)?;
        }
    }
    Ok(())
}
