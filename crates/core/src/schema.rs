//! Schema registry: declared record types and their fields
//!
//! A field is either a value field (scalar or array of a [`ValueType`]) or
//! a link field (a typed relationship to another record type). The
//! [`FieldKind`] enum makes that XOR unrepresentable rather than checked at
//! runtime.
//!
//! Schemas are built once through [`SchemaBuilder`], validated at
//! `build()`, and read-only afterwards: dispatch never mutates the
//! registry, so one schema is safely shared by any number of concurrent
//! requests.

use crate::error::{Result, WeftError};
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field declaration kind: value XOR link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Scalar or array value field
    Value {
        /// Type descriptor every (element) value must satisfy
        value_type: ValueType,
        /// Array cardinality
        is_array: bool,
    },
    /// Relationship to another record type
    Link {
        /// Name of the linked record type
        target: String,
        /// Array cardinality of this side
        is_array: bool,
        /// Field on the linked type that points back, kept consistent
        /// automatically by the dispatcher
        inverse: Option<String>,
        /// Marks a caller-visible cache of inverse data; stripped before
        /// every write and maintained only by integrity propagation
        denormalized: bool,
    },
}

/// A single field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Whether the field must be present and non-null on creation
    pub required: bool,
    /// Value or link declaration
    pub kind: FieldKind,
    // Set when a link-only modifier was applied to a value field; reported
    // at build() so the mistake cannot produce a half-valid schema.
    #[serde(skip)]
    misdeclared: Option<&'static str>,
}

impl FieldDef {
    fn from_kind(kind: FieldKind) -> Self {
        Self {
            required: false,
            kind,
            misdeclared: None,
        }
    }

    /// Declare a singular value field
    pub fn value(value_type: ValueType) -> Self {
        Self::from_kind(FieldKind::Value {
            value_type,
            is_array: false,
        })
    }

    /// Declare an array value field
    pub fn value_array(value_type: ValueType) -> Self {
        Self::from_kind(FieldKind::Value {
            value_type,
            is_array: true,
        })
    }

    /// Declare a singular link to another record type
    pub fn link_one(target: impl Into<String>) -> Self {
        Self::from_kind(FieldKind::Link {
            target: target.into(),
            is_array: false,
            inverse: None,
            denormalized: false,
        })
    }

    /// Declare an array link to another record type
    pub fn link_many(target: impl Into<String>) -> Self {
        Self::from_kind(FieldKind::Link {
            target: target.into(),
            is_array: true,
            inverse: None,
            denormalized: false,
        })
    }

    /// Mark the field as required on creation
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Name the field on the linked type that points back
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            FieldKind::Link { inverse, .. } => *inverse = Some(name.into()),
            FieldKind::Value { .. } => self.misdeclared = Some("inverse"),
        }
        self
    }

    /// Mark a link field as a denormalized cache of its inverse
    pub fn denormalized(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Link { denormalized, .. } => *denormalized = true,
            FieldKind::Value { .. } => self.misdeclared = Some("denormalized"),
        }
        self
    }

    /// Whether this is a link field
    pub fn is_link(&self) -> bool {
        matches!(self.kind, FieldKind::Link { .. })
    }

    /// Array cardinality of the field
    pub fn is_array(&self) -> bool {
        match &self.kind {
            FieldKind::Value { is_array, .. } => *is_array,
            FieldKind::Link { is_array, .. } => *is_array,
        }
    }

    /// Linked record type name, for link fields
    pub fn link_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Link { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Declared inverse field name, for link fields
    pub fn inverse_name(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Link { inverse, .. } => inverse.as_deref(),
            _ => None,
        }
    }

    /// Whether the field is a denormalized inverse cache
    pub fn is_denormalized(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Link {
                denormalized: true,
                ..
            }
        )
    }
}

/// Declared fields of one record type, keyed by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypeDef {
    fields: BTreeMap<String, FieldDef>,
}

impl TypeDef {
    /// Look up a field declaration by name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// Iterate over all field declarations in name order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over link field declarations only
    pub fn link_fields(&self) -> impl Iterator<Item = (&str, &FieldDef)> {
        self.fields().filter(|(_, def)| def.is_link())
    }

    /// Names of fields marked as denormalized inverse caches
    pub fn denormalized_fields(&self) -> impl Iterator<Item = &str> {
        self.fields()
            .filter(|(_, def)| def.is_denormalized())
            .map(|(name, _)| name)
    }
}

/// Read-only registry of record types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    types: BTreeMap<String, TypeDef>,
}

impl Schema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a record type, erroring on unknown names
    pub fn type_def(&self, name: &str) -> Result<&TypeDef> {
        self.types
            .get(name)
            .ok_or_else(|| WeftError::UnknownType { name: name.into() })
    }

    /// Whether a record type is declared
    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Iterate over declared record types in name order
    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Builder for [`Schema`], validated at `build()`
///
/// Cross-type consistency (link targets exist, declared inverses point
/// back) cannot be checked while types are still being added, so all
/// validation happens once in [`SchemaBuilder::build`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    types: BTreeMap<String, TypeDef>,
}

impl SchemaBuilder {
    /// Open a record type declaration
    pub fn record_type(self, name: impl Into<String>) -> TypeBuilder {
        TypeBuilder {
            schema: self,
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Validate cross-type consistency and produce the schema
    pub fn build(self) -> Result<Schema> {
        for (type_name, def) in &self.types {
            for (field_name, field) in def.fields() {
                if let Some(modifier) = field.misdeclared {
                    return Err(WeftError::Schema {
                        reason: format!(
                            "{type_name}.{field_name}: '{modifier}' declared on a value field"
                        ),
                    });
                }
                let Some(target) = field.link_target() else {
                    continue;
                };
                let Some(target_def) = self.types.get(target) else {
                    return Err(WeftError::Schema {
                        reason: format!(
                            "{type_name}.{field_name} links to undeclared type '{target}'"
                        ),
                    });
                };
                if let Some(inverse) = field.inverse_name() {
                    let Some(inverse_def) = target_def.field(inverse) else {
                        return Err(WeftError::Schema {
                            reason: format!(
                                "{type_name}.{field_name}: inverse '{target}.{inverse}' does not exist"
                            ),
                        });
                    };
                    if inverse_def.link_target() != Some(type_name.as_str()) {
                        return Err(WeftError::Schema {
                            reason: format!(
                                "{type_name}.{field_name}: inverse '{target}.{inverse}' does not link back to '{type_name}'"
                            ),
                        });
                    }
                }
            }
        }
        Ok(Schema { types: self.types })
    }
}

/// In-progress declaration of one record type
#[derive(Debug)]
pub struct TypeBuilder {
    schema: SchemaBuilder,
    name: String,
    fields: BTreeMap<String, FieldDef>,
}

impl TypeBuilder {
    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Close this record type and return to the schema builder
    pub fn done(mut self) -> SchemaBuilder {
        self.schema
            .types
            .insert(self.name, TypeDef { fields: self.fields });
        self.schema
    }
}
