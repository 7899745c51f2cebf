//! Error types for the Weft data-access layer
//!
//! All errors from dispatch and storage are represented by the
//! [`WeftError`] enum. These errors are:
//! - **Structured**: each variant has typed fields for error details
//! - **Serializable**: can be converted to/from JSON
//! - **Final**: nothing in the pipeline retries; recovery is the caller's
//!   responsibility
//!
//! Timing matters for the taxonomy: `BadRequest` and `UnknownType` are
//! raised before any transaction opens; `Validation`, `InvalidLink`, and
//! `NotFound` after a transaction opens but before anything is written;
//! `BackendContract` and `Storage` surface from the backend itself. Every
//! error raised after a transaction opens triggers an abort before it
//! reaches the caller.

use crate::types::RecordId;
use serde::{Deserialize, Serialize};

/// Result type alias for Weft operations
pub type Result<T> = std::result::Result<T, WeftError>;

/// Errors raised by the mutation dispatch pipeline and backend adapters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum WeftError {
    // ==================== Request Errors ====================
    /// Malformed or empty payload, detected before any transaction opens
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    /// Record type is not declared in the schema
    #[error("unknown record type: {name}")]
    UnknownType { name: String },

    /// Schema declaration is inconsistent (builder-time only)
    #[error("invalid schema: {reason}")]
    Schema { reason: String },

    // ==================== Validation Errors ====================
    /// Field type, cardinality, or required-ness violation
    #[error("validation failed on field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Referential-integrity violation: a link value names a record that
    /// does not exist in the target type's collection
    #[error("invalid link in field '{field}': no '{target}' record with id {id}")]
    InvalidLink {
        field: String,
        target: String,
        id: RecordId,
    },

    /// A record addressed by id does not exist
    #[error("record not found: {type_name}/{id}")]
    NotFound { type_name: String, id: RecordId },

    // ==================== Backend Errors ====================
    /// Backend returned no or insufficient results from a write it was
    /// obligated to fulfill; fatal, never retried
    #[error("backend contract violation: {reason}")]
    BackendContract { reason: String },

    /// Error surfaced from a backend call, propagated unchanged after abort
    #[error("storage error: {reason}")]
    Storage { reason: String },

    // ==================== Hook Errors ====================
    /// A transform hook rejected or failed to process a record
    #[error("transform failed for type '{type_name}': {reason}")]
    Transform { type_name: String, reason: String },

    // ==================== Connection Errors ====================
    /// Operation attempted while the backend is disconnected
    #[error("backend is not connected")]
    NotConnected,

    /// A connect attempt failed; waiters during the attempt fail with it
    #[error("connect failed: {reason}")]
    ConnectFailed { reason: String },
}
