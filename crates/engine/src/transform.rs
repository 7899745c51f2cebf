//! Transform hooks: application-supplied per-type record processing
//!
//! A [`Transform`] is registered for one record type at construction time
//! and shared read-only by every concurrent request. Input hooks run
//! inside the transaction before enforcement; the output hook runs on
//! records returned to the caller after commit. Every method defaults to
//! passthrough, so implementations override only what they need.

use async_trait::async_trait;
use weft_core::{Record, Result, UpdateOp};

/// Per-type transform pair (input and output sides)
///
/// Hook invocations are suspension points in the pipeline: each stage
/// awaits all of its hook calls before the next stage starts. Hooks see
/// records in caller order and their results keep that order.
#[async_trait]
pub trait Transform: Send + Sync {
    /// Rewrite a candidate record before creation
    ///
    /// Runs after denormalized fields are stripped and before enforcement,
    /// so whatever this returns is what gets validated and persisted.
    async fn create(&self, record: Record) -> Result<Record> {
        Ok(record)
    }

    /// Rewrite an update op before it is applied
    ///
    /// Receives the record's before-image for context; the returned op is
    /// what gets validated and persisted.
    async fn update(&self, _before: &Record, op: UpdateOp) -> Result<UpdateOp> {
        Ok(op)
    }

    /// Observe a record before it is deleted
    ///
    /// Erroring here aborts the whole deletion.
    async fn delete(&self, _before: &Record) -> Result<()> {
        Ok(())
    }

    /// Rewrite a record before it is returned to the caller
    ///
    /// Runs after commit; it shapes the response, never the stored data.
    async fn output(&self, record: Record) -> Result<Record> {
        Ok(record)
    }
}
