//! Core types and traits for Weft
//!
//! This crate defines the foundational types used throughout the system:
//! - Value / ValueType: canonical field values and their type descriptors
//! - RecordId: opaque backend-assigned primary key
//! - Record: field map plus optional primary key
//! - Schema / TypeDef / FieldDef: the declared record types and fields
//! - UpdateOp: partial-update representation (caller payload and derived)
//! - ChangeEvent: per-commit change summary
//! - WeftError: error type hierarchy
//! - Traits: Backend and Transaction storage contract

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;
pub mod ops;
pub mod record;
pub mod schema;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types and traits
pub use error::{Result, WeftError};
pub use event::ChangeEvent;
pub use ops::UpdateOp;
pub use record::{link_ids_of, Record};
pub use schema::{FieldDef, FieldKind, Schema, SchemaBuilder, TypeBuilder, TypeDef};
pub use traits::{Backend, Transaction};
pub use types::RecordId;
pub use value::{Value, ValueType};
