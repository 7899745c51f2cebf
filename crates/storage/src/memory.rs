//! In-memory reference backend
//!
//! Collections are per-type `BTreeMap<RecordId, Record>` under one
//! `RwLock`. A transaction buffers its writes in order and applies the
//! whole buffer under a single write guard at commit, so readers never
//! observe a half-applied request; an aborted transaction simply drops
//! its buffer.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;
use weft_core::{Backend, Record, RecordId, Result, Transaction, UpdateOp, WeftError};

type Collections = BTreeMap<String, BTreeMap<RecordId, Record>>;

/// Transactional in-memory storage adapter
///
/// The default adapter for tests and embedded use. Cheap to clone-share
/// via `Arc`; all state lives behind the lock.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    collections: Arc<RwLock<Collections>>,
    connected: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing the dispatch pipeline
    ///
    /// Fixture helper: the record must already carry its id. Panics
    /// otherwise, since a fixture without an id is a test bug.
    pub fn seed(&self, type_name: &str, record: Record) {
        let id = record
            .id()
            .cloned()
            .expect("seeded records must carry an id");
        self.collections
            .write()
            .entry(type_name.to_string())
            .or_default()
            .insert(id, record);
    }

    /// Number of committed records in a type's collection
    pub fn count(&self, type_name: &str) -> usize {
        self.collections
            .read()
            .get(type_name)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WeftError::NotConnected);
        }
        Ok(Box::new(MemoryTransaction {
            collections: Arc::clone(&self.collections),
            buffer: Mutex::new(Vec::new()),
        }))
    }

    async fn find(&self, type_name: &str, ids: &[RecordId]) -> Result<Vec<Record>> {
        let collections = self.collections.read();
        let Some(collection) = collections.get(type_name) else {
            return Ok(Vec::new());
        };
        if ids.is_empty() {
            return Ok(collection.values().cloned().collect());
        }
        Ok(ids
            .iter()
            .filter_map(|id| collection.get(id).cloned())
            .collect())
    }
}

/// One buffered write
#[derive(Debug)]
enum BufferedOp {
    Create {
        type_name: String,
        records: Vec<Record>,
    },
    Update {
        type_name: String,
        ops: Vec<UpdateOp>,
    },
    Delete {
        type_name: String,
        ids: Vec<RecordId>,
    },
}

/// Buffering transaction over [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryTransaction {
    collections: Arc<RwLock<Collections>>,
    buffer: Mutex<Vec<BufferedOp>>,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn create(&self, type_name: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        let mut records = records;
        for record in &mut records {
            if record.id().is_none() {
                record.set_id(RecordId::generate());
            }
        }
        self.buffer.lock().push(BufferedOp::Create {
            type_name: type_name.to_string(),
            records: records.clone(),
        });
        Ok(records)
    }

    async fn update(&self, type_name: &str, ops: &[UpdateOp]) -> Result<()> {
        self.buffer.lock().push(BufferedOp::Update {
            type_name: type_name.to_string(),
            ops: ops.to_vec(),
        });
        Ok(())
    }

    async fn delete(&self, type_name: &str, ids: &[RecordId]) -> Result<()> {
        self.buffer.lock().push(BufferedOp::Delete {
            type_name: type_name.to_string(),
            ids: ids.to_vec(),
        });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let buffer = self.buffer.into_inner();
        let applied = buffer.len();
        // One write guard across the whole buffer: every write of the
        // request becomes visible together or not at all.
        let mut collections = self.collections.write();
        for op in buffer {
            apply(&mut collections, op)?;
        }
        debug!(target: "weft::storage", ops = applied, "transaction committed");
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        let dropped = self.buffer.into_inner().len();
        debug!(target: "weft::storage", ops = dropped, "transaction aborted");
        Ok(())
    }
}

fn apply(collections: &mut Collections, op: BufferedOp) -> Result<()> {
    match op {
        BufferedOp::Create { type_name, records } => {
            let collection = collections.entry(type_name.clone()).or_default();
            for record in records {
                let id = record.id().cloned().ok_or_else(|| WeftError::Storage {
                    reason: "buffered create lost its id".into(),
                })?;
                if collection.insert(id.clone(), record).is_some() {
                    return Err(WeftError::Storage {
                        reason: format!("duplicate id in '{type_name}': {id}"),
                    });
                }
            }
        }
        BufferedOp::Update { type_name, ops } => {
            let collection = collections.entry(type_name).or_default();
            for op in ops {
                // A target deleted earlier in the same transaction is
                // gone; skipping matches "partial update of whatever
                // still exists".
                if let Some(record) = collection.get_mut(&op.id) {
                    op.apply_to(record);
                }
            }
        }
        BufferedOp::Delete { type_name, ids } => {
            if let Some(collection) = collections.get_mut(&type_name) {
                for id in ids {
                    collection.remove(&id);
                }
            }
        }
    }
    Ok(())
}
