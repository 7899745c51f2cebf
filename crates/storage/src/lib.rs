//! Weft storage adapters
//!
//! Reference implementations of the backend contract from `weft-core`.
//! Currently one adapter ships: [`MemoryBackend`], a transactional
//! in-memory store used by the engine's tests and for embedded use.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;

pub use memory::{MemoryBackend, MemoryTransaction};
