//! Backend contract: the storage adapter traits the dispatcher drives
//!
//! This module defines the [`Backend`] and [`Transaction`] traits that let
//! storage implementations be swapped without touching the dispatch
//! pipeline. The reference in-memory adapter lives in `weft-storage`;
//! adapters over external stores implement the same pair.
//!
//! Thread safety: all methods must be safe to call concurrently from
//! multiple tasks (requires Send + Sync). A transaction handle is
//! exclusively owned by the request that opened it, but the dispatcher
//! issues per-type derived writes against it concurrently, so write
//! methods take `&self` and adapters buffer internally.

use crate::error::Result;
use crate::ops::UpdateOp;
use crate::record::Record;
use crate::types::RecordId;
use async_trait::async_trait;

/// Storage adapter lifecycle and read surface
///
/// `connect`/`disconnect` bracket the whole process; idempotency and
/// reconnection are the caller's responsibility, not the dispatcher's.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Establish the underlying connection
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable; the connection gate
    /// reports the failure to every request that was waiting on it.
    async fn connect(&self) -> Result<()>;

    /// Tear down the underlying connection
    async fn disconnect(&self) -> Result<()>;

    /// Open a transaction scoped to exactly one request
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Fetch records of a type by id
    ///
    /// An empty id slice returns every record of the collection. Missing
    /// ids are simply absent from the result, in no guaranteed order; the
    /// caller correlates by record content, never by position. Reads see
    /// committed state only.
    async fn find(&self, type_name: &str, ids: &[RecordId]) -> Result<Vec<Record>>;
}

/// An open transaction: the atomic unit of backend writes
///
/// All writes issued during one request go through one handle. The handle
/// is either committed or aborted, exactly once - `commit` and `abort`
/// consume it, so "never both, never left open" holds at the type level.
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Create a batch of records, assigning primary keys
    ///
    /// Must return one record per input, each bearing its assigned id, in
    /// no guaranteed order correspondence to the input.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be buffered or staged; the
    /// dispatcher treats an empty or short result as a contract violation.
    async fn create(&self, type_name: &str, records: Vec<Record>) -> Result<Vec<Record>>;

    /// Apply partial updates to records of a type
    async fn update(&self, type_name: &str, ops: &[UpdateOp]) -> Result<()>;

    /// Delete records of a type by id
    async fn delete(&self, type_name: &str, ids: &[RecordId]) -> Result<()>;

    /// Commit every buffered write atomically
    ///
    /// After a successful commit all writes are visible together; after a
    /// failed commit none may be.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every buffered write
    async fn abort(self: Box<Self>) -> Result<()>;
}
