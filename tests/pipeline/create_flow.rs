//! End-to-end create flow

use crate::common::{fixture, fixture_with, ids};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use weft::{
    Backend, Dispatcher, MemoryBackend, Record, RecordId, Transaction, UpdateOp, Value,
    WeftError,
};

#[tokio::test]
async fn creates_every_record_and_assigns_fresh_ids() {
    let f = fixture();
    let created = f
        .dispatcher
        .create(
            "person",
            vec![
                Record::new().field("name", "Ada"),
                Record::new().field("name", "Grace"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(f.backend.count("person"), 2);
    let unique: BTreeSet<_> = created.iter().map(|r| r.id().unwrap().clone()).collect();
    assert_eq!(unique.len(), 2, "every record carries a distinct new id");
}

#[tokio::test]
async fn empty_payload_is_bad_request_before_any_write() {
    let f = fixture();
    let err = f.dispatcher.create("person", vec![]).await.unwrap_err();
    assert!(matches!(err, WeftError::BadRequest { .. }));
}

#[tokio::test]
async fn unknown_type_is_rejected() {
    let f = fixture();
    let err = f
        .dispatcher
        .create("robot", vec![Record::new()])
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::UnknownType { .. }));
}

#[tokio::test]
async fn linking_attaches_singular_inverse_on_target() {
    let f = fixture();
    f.backend.seed("animal", Record::with_id("a1"));
    let created = f
        .dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "Ada").field("pets", ids(&["a1"]))],
        )
        .await
        .unwrap();
    let owner_id = created[0].id().unwrap().clone();
    let animals = f
        .backend
        .find("animal", &[RecordId::from("a1")])
        .await
        .unwrap();
    assert_eq!(
        animals[0].get("owner"),
        Some(&Value::from(owner_id.as_str()))
    );
}

#[tokio::test]
async fn linking_appends_to_array_inverse_on_target() {
    let f = fixture();
    f.backend.seed("group", Record::with_id("g1"));
    let first = f
        .dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "Ada").field("groups", ids(&["g1"]))],
        )
        .await
        .unwrap();
    let second = f
        .dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "Grace").field("groups", ids(&["g1"]))],
        )
        .await
        .unwrap();
    let groups = f
        .backend
        .find("group", &[RecordId::from("g1")])
        .await
        .unwrap();
    let members = groups[0].get("members").unwrap().as_array().unwrap();
    assert_eq!(
        members,
        &[
            Value::from(first[0].id().unwrap().as_str()),
            Value::from(second[0].id().unwrap().as_str()),
        ]
    );
}

#[tokio::test]
async fn shared_target_gets_one_merged_update_operation() {
    let f = fixture();
    f.backend.seed("group", Record::with_id("g1"));
    f.dispatcher
        .create(
            "person",
            vec![
                Record::new().field("name", "Ada").field("groups", ids(&["g1"])),
                Record::new().field("name", "Grace").field("groups", ids(&["g1"])),
            ],
        )
        .await
        .unwrap();
    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    let group_ops = &events[0].update["group"];
    assert_eq!(group_ops.len(), 1, "one op for the shared target, not two");
    assert_eq!(group_ops[0].push["members"].len(), 2);
}

#[tokio::test]
async fn dangling_link_aborts_with_nothing_created() {
    let f = fixture();
    let err = f
        .dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "Ada").field("pets", ids(&["a9"]))],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::InvalidLink { .. }));
    assert_eq!(f.backend.count("person"), 0, "full abort, not partial");
    assert!(f.sink.events().is_empty(), "no event on a failed request");
}

#[tokio::test]
async fn dangling_link_is_accepted_when_enforcement_is_off() {
    let f = fixture_with(|builder| builder.enforce_links(false));
    f.dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "Ada").field("pets", ids(&["a9"]))],
        )
        .await
        .unwrap();
    assert_eq!(f.backend.count("person"), 1);
}

#[tokio::test]
async fn validation_failure_prevents_any_backend_write() {
    let f = fixture();
    let err = f
        .dispatcher
        .create(
            "person",
            vec![
                Record::new().field("name", "Ada"),
                Record::new().field("name", "Grace").field("age", "old"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::Validation { .. }));
    assert_eq!(f.backend.count("person"), 0, "fail-fast covers the whole batch");
}

#[tokio::test]
async fn denormalized_fields_are_stripped_before_persistence() {
    let f = fixture();
    f.backend.seed("group", Record::with_id("g1"));
    let created = f
        .dispatcher
        .create(
            "person",
            vec![Record::new()
                .field("name", "Ada")
                .field("group_names", ids(&["g1"]))],
        )
        .await
        .unwrap();
    assert_eq!(created[0].get("group_names"), None);
    let stored = f
        .backend
        .find("person", &[created[0].id().unwrap().clone()])
        .await
        .unwrap();
    assert_eq!(stored[0].get("group_names"), None);
}

/// Backend whose transactions violate the create contract by returning
/// nothing, while still recording commit/abort calls.
struct EmptyCreateBackend {
    inner: MemoryBackend,
}

#[async_trait]
impl Backend for EmptyCreateBackend {
    async fn connect(&self) -> weft::Result<()> {
        self.inner.connect().await
    }

    async fn disconnect(&self) -> weft::Result<()> {
        self.inner.disconnect().await
    }

    async fn begin(&self) -> weft::Result<Box<dyn Transaction>> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(EmptyCreateTransaction { inner }))
    }

    async fn find(&self, type_name: &str, ids: &[RecordId]) -> weft::Result<Vec<Record>> {
        self.inner.find(type_name, ids).await
    }
}

struct EmptyCreateTransaction {
    inner: Box<dyn Transaction>,
}

#[async_trait]
impl Transaction for EmptyCreateTransaction {
    async fn create(&self, _type_name: &str, _records: Vec<Record>) -> weft::Result<Vec<Record>> {
        Ok(Vec::new())
    }

    async fn update(&self, type_name: &str, ops: &[UpdateOp]) -> weft::Result<()> {
        self.inner.update(type_name, ops).await
    }

    async fn delete(&self, type_name: &str, ids: &[RecordId]) -> weft::Result<()> {
        self.inner.delete(type_name, ids).await
    }

    async fn commit(self: Box<Self>) -> weft::Result<()> {
        self.inner.commit().await
    }

    async fn abort(self: Box<Self>) -> weft::Result<()> {
        self.inner.abort().await
    }
}

#[tokio::test]
async fn short_create_result_is_a_contract_violation() {
    let backend = Arc::new(EmptyCreateBackend {
        inner: MemoryBackend::new(),
    });
    let dispatcher =
        Dispatcher::builder(backend as Arc<dyn Backend>, crate::common::schema()).build();
    let err = dispatcher
        .create("person", vec![Record::new().field("name", "Ada")])
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::BackendContract { .. }));
}
