//! Weft - schema-driven data-access layer with bidirectional link maintenance
//!
//! Weft mediates between application callers and a pluggable storage
//! backend: it validates mutation requests against a declared schema,
//! keeps inverse relationship fields consistent across record types, and
//! commits each request as one all-or-nothing transaction, emitting a
//! change event after every successful commit.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use weft::{Dispatcher, FieldDef, MemoryBackend, Record, Schema, ValueType};
//!
//! let schema = Schema::builder()
//!     .record_type("person")
//!     .field("name", FieldDef::value(ValueType::String).required())
//!     .field("pets", FieldDef::link_many("animal").inverse("owner"))
//!     .done()
//!     .record_type("animal")
//!     .field("owner", FieldDef::link_one("person").inverse("pets"))
//!     .done()
//!     .build()?;
//!
//! let dispatcher = Dispatcher::builder(Arc::new(MemoryBackend::new()), schema).build();
//! let people = dispatcher
//!     .create("person", vec![Record::new().field("name", "Ada")])
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! All mutations go through the [`Dispatcher`], which runs the pipeline:
//! input transforms, enforcement and link-integrity checks, the primary
//! backend write, derived inverse updates, commit, then notification.
//! Storage backends implement the [`Backend`]/[`Transaction`] pair;
//! [`MemoryBackend`] is the bundled reference adapter.

// Re-export the public API from weft-engine, plus the bundled adapter.
pub use weft_engine::*;
pub use weft_storage::MemoryBackend;
