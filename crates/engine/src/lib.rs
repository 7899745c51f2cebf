//! Weft engine: the mutation dispatch pipeline
//!
//! This crate turns caller mutation requests into validated,
//! transform-applied records, the derived updates that keep inverse
//! relationships consistent, and one all-or-nothing transaction against
//! the storage backend, followed by change-event notification.
//!
//! ## Module Structure
//!
//! - `dispatch` - the Dispatcher orchestrating create/update/delete
//! - `enforce` - field enforcement against the declared schema
//! - `integrity` - referential existence checks for link values
//! - `update_batch` - derived inverse-maintenance operations
//! - `transform` - application-supplied per-type hooks
//! - `connection` - the backend connection state machine
//! - `events` - change-event sinks

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod dispatch;
pub mod enforce;
pub mod events;
pub mod integrity;
pub mod transform;
pub mod update_batch;

pub use connection::{ConnectionGate, ConnectionState};
pub use dispatch::{Dispatcher, DispatcherBuilder};
pub use events::{ChannelSink, EventSink};
pub use transform::Transform;
pub use update_batch::UpdateBatch;

// Re-export the core vocabulary so dispatcher callers need one import.
pub use weft_core::{
    ChangeEvent, FieldDef, FieldKind, Record, RecordId, Result, Schema, UpdateOp, Value,
    ValueType, WeftError,
};
pub use weft_core::{Backend, Transaction};
