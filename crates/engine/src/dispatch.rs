//! Mutation dispatcher: the create/update/delete pipeline
//!
//! Each request runs as a sequence of async stages with a full barrier
//! between stages: per-record transforms, per-record validation and link
//! checks, the primary backend write, then per-type derived updates, all
//! inside one transaction. Concurrent sub-steps within a stage preserve
//! caller order index-for-index but complete in no particular order; the
//! first observed failure aborts the transaction and is re-raised
//! unchanged. Change events are published exactly once, after commit,
//! never on failure.

use crate::connection::{ConnectionGate, ConnectionState};
use crate::events::EventSink;
use crate::transform::Transform;
use crate::{enforce, integrity, update_batch};
use futures::future::try_join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};
use weft_core::schema::TypeDef;
use weft_core::{
    Backend, ChangeEvent, Record, RecordId, Result, Schema, Transaction, UpdateOp, WeftError,
};

/// Configurable construction of a [`Dispatcher`]
///
/// Everything supplied here is immutable for the lifetime of the built
/// instance.
pub struct DispatcherBuilder {
    backend: Arc<dyn Backend>,
    schema: Schema,
    transforms: BTreeMap<String, Arc<dyn Transform>>,
    sinks: Vec<Arc<dyn EventSink>>,
    enforce_links: bool,
}

impl DispatcherBuilder {
    fn new(backend: Arc<dyn Backend>, schema: Schema) -> Self {
        Self {
            backend,
            schema,
            transforms: BTreeMap::new(),
            sinks: Vec::new(),
            enforce_links: true,
        }
    }

    /// Register a transform pair for one record type
    pub fn transform(mut self, type_name: impl Into<String>, hook: Arc<dyn Transform>) -> Self {
        self.transforms.insert(type_name.into(), hook);
        self
    }

    /// Register a change-event sink
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Toggle referential-integrity enforcement (default: on)
    ///
    /// With enforcement off, dangling links are accepted silently; this
    /// trades safety for write throughput and is an instance-wide choice.
    pub fn enforce_links(mut self, enabled: bool) -> Self {
        self.enforce_links = enabled;
        self
    }

    /// Finish construction
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            backend: self.backend,
            schema: Arc::new(self.schema),
            transforms: self.transforms,
            sinks: self.sinks,
            enforce_links: self.enforce_links,
            connection: ConnectionGate::new(),
        }
    }
}

/// Orchestrator of the mutation dispatch pipeline
///
/// One instance serves any number of concurrent requests: the schema and
/// transform hooks are read-only, and each request owns exactly one
/// transaction and one in-memory working set from open to close.
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    schema: Arc<Schema>,
    transforms: BTreeMap<String, Arc<dyn Transform>>,
    sinks: Vec<Arc<dyn EventSink>>,
    enforce_links: bool,
    connection: ConnectionGate,
}

impl Dispatcher {
    /// Start building a dispatcher over a backend and schema
    pub fn builder(backend: Arc<dyn Backend>, schema: Schema) -> DispatcherBuilder {
        DispatcherBuilder::new(backend, schema)
    }

    /// The declared schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Current connection state
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Connect the backend
    ///
    /// Requests arriving while a connect attempt is in flight wait for it
    /// and share its outcome. Dispatch methods connect lazily, so calling
    /// this up front is optional.
    pub async fn connect(&self) -> Result<()> {
        self.connection.ensure_connected(self.backend.as_ref()).await
    }

    /// Disconnect the backend
    pub async fn disconnect(&self) -> Result<()> {
        self.connection.disconnect(self.backend.as_ref()).await
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Create a batch of records
    ///
    /// Returns the created records, ids assigned, output transforms
    /// applied. Inverse link fields on referenced records are brought up
    /// to date within the same transaction.
    ///
    /// # Errors
    ///
    /// `BadRequest` on an empty payload (before any transaction opens);
    /// `Validation`/`InvalidLink` when a record does not conform;
    /// `BackendContract` when the backend returns too few created
    /// records. Whatever the failure, the transaction is aborted and no
    /// write survives.
    pub async fn create(&self, type_name: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        if records.is_empty() {
            return Err(WeftError::BadRequest {
                reason: "create payload is empty".into(),
            });
        }
        let def = self.schema.type_def(type_name)?;
        self.connection.ensure_connected(self.backend.as_ref()).await?;

        // Denormalized inverse fields are caller-visible caches; whatever
        // the caller sent is discarded before anything else runs.
        let denormalized: Vec<&str> = def.denormalized_fields().collect();
        let mut records = records;
        for record in &mut records {
            for field in &denormalized {
                record.remove(field);
            }
        }

        let txn = self.backend.begin().await?;
        let (created, derived) = match self.stage_create(&*txn, type_name, def, records).await {
            Ok(staged) => staged,
            Err(err) => return Err(self.abort(txn, err).await),
        };
        txn.commit().await?;
        debug!(
            target: "weft::dispatch",
            type_name,
            count = created.len(),
            derived_types = derived.len(),
            "create committed"
        );

        let mut event = ChangeEvent::default();
        event.create.insert(type_name.to_string(), created.clone());
        event.update = derived;
        self.notify(&event);

        self.run_output(type_name, created).await
    }

    /// Transaction-scoped stages of the create flow
    async fn stage_create(
        &self,
        txn: &dyn Transaction,
        type_name: &str,
        def: &TypeDef,
        records: Vec<Record>,
    ) -> Result<(Vec<Record>, BTreeMap<String, Vec<UpdateOp>>)> {
        // Stage: input transforms, concurrent, order-preserving.
        let records = match self.transforms.get(type_name) {
            Some(hook) => try_join_all(records.into_iter().map(|r| hook.create(r))).await?,
            None => records,
        };

        // Stage: enforcement and link checks, concurrent per record.
        try_join_all(records.iter().map(|r| self.validate_record(def, r))).await?;

        // Stage: primary write. The backend owes us one id-bearing record
        // per input, in any order.
        let expected = records.len();
        let created = txn.create(type_name, records).await?;
        if created.len() != expected {
            return Err(WeftError::BackendContract {
                reason: format!("create returned {} of {expected} records", created.len()),
            });
        }

        // Stage: derived updates, grouped per linked type, concurrent
        // across types within the same transaction.
        let derived = update_batch::attach_records(&self.schema, type_name, &created)?
            .into_per_type();
        try_join_all(derived.iter().map(|(t, ops)| txn.update(t, ops))).await?;

        Ok((created, derived))
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Apply a batch of partial updates
    ///
    /// Link fields changed by an op propagate to the declared inverses:
    /// ids added attach a back-reference, ids removed detach one, all
    /// within the request's transaction.
    pub async fn update(&self, type_name: &str, ops: Vec<UpdateOp>) -> Result<()> {
        if ops.is_empty() {
            return Err(WeftError::BadRequest {
                reason: "update payload is empty".into(),
            });
        }
        let ids: Vec<RecordId> = ops.iter().map(|op| op.id.clone()).collect();
        reject_duplicate_ids(&ids)?;
        let def = self.schema.type_def(type_name)?;
        self.connection.ensure_connected(self.backend.as_ref()).await?;

        let denormalized: Vec<&str> = def.denormalized_fields().collect();
        let mut ops = ops;
        for op in &mut ops {
            for field in &denormalized {
                op.strip_field(field);
            }
        }

        let txn = self.backend.begin().await?;
        let summary = match self.stage_update(&*txn, type_name, def, &ids, ops).await {
            Ok(summary) => summary,
            Err(err) => return Err(self.abort(txn, err).await),
        };
        txn.commit().await?;
        debug!(
            target: "weft::dispatch",
            type_name,
            count = ids.len(),
            "update committed"
        );

        let mut event = ChangeEvent::default();
        event.update = summary;
        self.notify(&event);
        Ok(())
    }

    /// Transaction-scoped stages of the update flow
    async fn stage_update(
        &self,
        txn: &dyn Transaction,
        type_name: &str,
        def: &TypeDef,
        ids: &[RecordId],
        ops: Vec<UpdateOp>,
    ) -> Result<BTreeMap<String, Vec<UpdateOp>>> {
        // Before-images drive the transforms and the link diff; they must
        // exist, and they are read before anything is written.
        let before = self.require_records(type_name, ids).await?;

        // Stage: input transforms, concurrent, order-preserving.
        let ops = match self.transforms.get(type_name) {
            Some(hook) => {
                try_join_all(
                    before
                        .iter()
                        .zip(ops)
                        .map(|(record, op)| hook.update(record, op)),
                )
                .await?
            }
            None => ops,
        };

        // Stage: enforcement and link checks, concurrent per op.
        try_join_all(ops.iter().map(|op| self.validate_update(def, op))).await?;

        // Stage: primary write.
        txn.update(type_name, &ops).await?;

        // The after-images are the before-images with the ops applied;
        // the diff between the two is exactly what the inverses owe.
        let after: Vec<Record> = before
            .iter()
            .zip(&ops)
            .map(|(record, op)| {
                let mut image = record.clone();
                op.apply_to(&mut image);
                image
            })
            .collect();
        let derived =
            update_batch::diff_records(&self.schema, type_name, &before, &after)?.into_per_type();
        try_join_all(derived.iter().map(|(t, dops)| txn.update(t, dops))).await?;

        // Event summary: the caller's own ops merged with the derived
        // ones, keyed per type.
        let mut summary = BTreeMap::new();
        summary.insert(type_name.to_string(), ops);
        for (t, dops) in derived {
            summary.entry(t).or_insert_with(Vec::new).extend(dops);
        }
        Ok(summary)
    }

    // ========================================================================
    // Delete
    // ========================================================================

    /// Delete records by id
    ///
    /// The deleted records' ids are stripped from every inverse field
    /// that referenced them, within the same transaction.
    pub async fn delete(&self, type_name: &str, ids: Vec<RecordId>) -> Result<()> {
        if ids.is_empty() {
            return Err(WeftError::BadRequest {
                reason: "delete payload is empty".into(),
            });
        }
        reject_duplicate_ids(&ids)?;
        self.schema.type_def(type_name)?;
        self.connection.ensure_connected(self.backend.as_ref()).await?;

        let txn = self.backend.begin().await?;
        let derived = match self.stage_delete(&*txn, type_name, &ids).await {
            Ok(derived) => derived,
            Err(err) => return Err(self.abort(txn, err).await),
        };
        txn.commit().await?;
        debug!(
            target: "weft::dispatch",
            type_name,
            count = ids.len(),
            "delete committed"
        );

        let mut event = ChangeEvent::default();
        event.delete.insert(type_name.to_string(), ids);
        event.update = derived;
        self.notify(&event);
        Ok(())
    }

    /// Transaction-scoped stages of the delete flow
    async fn stage_delete(
        &self,
        txn: &dyn Transaction,
        type_name: &str,
        ids: &[RecordId],
    ) -> Result<BTreeMap<String, Vec<UpdateOp>>> {
        // Pre-delete images carry the link values that tell us which
        // inverses to detach; they must be read before the physical
        // delete executes.
        let before = self.require_records(type_name, ids).await?;

        if let Some(hook) = self.transforms.get(type_name) {
            try_join_all(before.iter().map(|record| hook.delete(record))).await?;
        }

        txn.delete(type_name, ids).await?;

        let deleted: BTreeSet<&RecordId> = ids.iter().collect();
        let mut derived =
            update_batch::detach_records(&self.schema, type_name, &before)?.into_per_type();
        // A detach aimed at a record dying in this same request has
        // nothing left to maintain.
        if let Some(own_ops) = derived.get_mut(type_name) {
            own_ops.retain(|op| !deleted.contains(&op.id));
            if own_ops.is_empty() {
                derived.remove(type_name);
            }
        }
        try_join_all(derived.iter().map(|(t, dops)| txn.update(t, dops))).await?;
        Ok(derived)
    }

    // ========================================================================
    // Shared stages
    // ========================================================================

    async fn validate_record(&self, def: &TypeDef, record: &Record) -> Result<()> {
        enforce::enforce_record(def, record)?;
        if self.enforce_links {
            integrity::check_record_links(self.backend.as_ref(), def, record).await?;
        }
        Ok(())
    }

    async fn validate_update(&self, def: &TypeDef, op: &UpdateOp) -> Result<()> {
        enforce::enforce_update(def, op)?;
        if self.enforce_links {
            integrity::check_update_links(self.backend.as_ref(), def, op).await?;
        }
        Ok(())
    }

    /// Fetch records by id, in id order, erroring on any absence
    async fn require_records(&self, type_name: &str, ids: &[RecordId]) -> Result<Vec<Record>> {
        let found = self.backend.find(type_name, ids).await?;
        let mut by_id: BTreeMap<RecordId, Record> = found
            .into_iter()
            .filter_map(|record| record.id().cloned().map(|id| (id, record)))
            .collect();
        ids.iter()
            .map(|id| {
                by_id.remove(id).ok_or_else(|| WeftError::NotFound {
                    type_name: type_name.into(),
                    id: id.clone(),
                })
            })
            .collect()
    }

    /// Abort after a staged failure, preserving the original error
    async fn abort(&self, txn: Box<dyn Transaction>, err: WeftError) -> WeftError {
        if let Err(abort_err) = txn.abort().await {
            // Best-effort: the triggering error is what the caller needs
            // to see, not the abort's.
            warn!(target: "weft::dispatch", error = %abort_err, "transaction abort failed");
        }
        err
    }

    fn notify(&self, event: &ChangeEvent) {
        for sink in &self.sinks {
            sink.publish(event);
        }
    }

    /// Output transforms over records returned to the caller
    async fn run_output(&self, type_name: &str, records: Vec<Record>) -> Result<Vec<Record>> {
        match self.transforms.get(type_name) {
            Some(hook) => try_join_all(records.into_iter().map(|r| hook.output(r))).await,
            None => Ok(records),
        }
    }
}

fn reject_duplicate_ids(ids: &[RecordId]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(WeftError::BadRequest {
                reason: format!("duplicate id in payload: {id}"),
            });
        }
    }
    Ok(())
}
