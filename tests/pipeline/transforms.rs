//! Transform hook behavior across the pipeline

use crate::common::fixture_with;
use async_trait::async_trait;
use std::sync::Arc;
use weft::{Backend, Record, RecordId, Result, Transform, UpdateOp, Value, WeftError};

/// Hook that lowercases names on the way in and redacts ages on the way
/// out, rejects a reserved name, and blocks deletion of protected rows.
struct PersonHooks;

#[async_trait]
impl Transform for PersonHooks {
    async fn create(&self, record: Record) -> Result<Record> {
        if record.get("name") == Some(&Value::from("root")) {
            return Err(WeftError::Transform {
                type_name: "person".into(),
                reason: "'root' is reserved".into(),
            });
        }
        let lowered = record
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_lowercase);
        Ok(match lowered {
            Some(name) => record.field("name", name),
            None => record,
        })
    }

    async fn update(&self, _before: &Record, op: UpdateOp) -> Result<UpdateOp> {
        let mut op = op;
        op.strip_field("age");
        Ok(op)
    }

    async fn delete(&self, before: &Record) -> Result<()> {
        if before.get("name") == Some(&Value::from("keeper")) {
            return Err(WeftError::Transform {
                type_name: "person".into(),
                reason: "protected record".into(),
            });
        }
        Ok(())
    }

    async fn output(&self, record: Record) -> Result<Record> {
        let mut record = record;
        record.remove("age");
        Ok(record)
    }
}

fn hooked() -> crate::common::Fixture {
    fixture_with(|builder| builder.transform("person", Arc::new(PersonHooks)))
}

#[tokio::test]
async fn input_transform_rewrites_before_persistence() {
    let f = hooked();
    let created = f
        .dispatcher
        .create("person", vec![Record::new().field("name", "ADA")])
        .await
        .unwrap();
    assert_eq!(created[0].get("name"), Some(&Value::from("ada")));
    let stored = f
        .backend
        .find("person", &[created[0].id().unwrap().clone()])
        .await
        .unwrap();
    assert_eq!(stored[0].get("name"), Some(&Value::from("ada")));
}

#[tokio::test]
async fn input_transform_failure_aborts_the_batch() {
    let f = hooked();
    let err = f
        .dispatcher
        .create(
            "person",
            vec![
                Record::new().field("name", "ada"),
                Record::new().field("name", "root"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::Transform { .. }));
    assert_eq!(f.backend.count("person"), 0);
}

#[tokio::test]
async fn update_transform_shapes_the_applied_op() {
    let f = hooked();
    f.backend.seed(
        "person",
        Record::with_id("p1").field("name", "ada").field("age", 36i64),
    );
    f.dispatcher
        .update(
            "person",
            vec![UpdateOp::new("p1")
                .with_replace("name", "grace")
                .with_replace("age", 99i64)],
        )
        .await
        .unwrap();
    let stored = f
        .backend
        .find("person", &[RecordId::from("p1")])
        .await
        .unwrap();
    assert_eq!(stored[0].get("name"), Some(&Value::from("grace")));
    assert_eq!(stored[0].get("age"), Some(&Value::Int(36)), "age op stripped");
}

#[tokio::test]
async fn delete_transform_can_veto() {
    let f = hooked();
    f.backend
        .seed("person", Record::with_id("p1").field("name", "keeper"));
    let err = f
        .dispatcher
        .delete("person", vec![RecordId::from("p1")])
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::Transform { .. }));
    assert_eq!(f.backend.count("person"), 1, "veto aborts the delete");
}

#[tokio::test]
async fn output_transform_shapes_the_response_not_the_store() {
    let f = hooked();
    let created = f
        .dispatcher
        .create(
            "person",
            vec![Record::new().field("name", "ada").field("age", 36i64)],
        )
        .await
        .unwrap();
    assert_eq!(created[0].get("age"), None, "redacted in the response");
    let stored = f
        .backend
        .find("person", &[created[0].id().unwrap().clone()])
        .await
        .unwrap();
    assert_eq!(stored[0].get("age"), Some(&Value::Int(36)), "stored intact");
}

#[tokio::test]
async fn types_without_hooks_pass_through() {
    let f = hooked();
    let created = f
        .dispatcher
        .create("animal", vec![Record::new().field("species", "CAT")])
        .await
        .unwrap();
    assert_eq!(created[0].get("species"), Some(&Value::from("CAT")));
}
