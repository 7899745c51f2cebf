//! End-to-end update flow

use crate::common::{fixture, ids};
use weft::{Backend, Record, RecordId, UpdateOp, Value, WeftError};

#[tokio::test]
async fn replace_rewrites_a_scalar_field() {
    let f = fixture();
    f.backend
        .seed("person", Record::with_id("p1").field("name", "Ada"));
    f.dispatcher
        .update(
            "person",
            vec![UpdateOp::new("p1").with_replace("name", "Grace")],
        )
        .await
        .unwrap();
    let stored = f
        .backend
        .find("person", &[RecordId::from("p1")])
        .await
        .unwrap();
    assert_eq!(stored[0].get("name"), Some(&Value::from("Grace")));
}

#[tokio::test]
async fn adding_a_link_attaches_the_inverse() {
    let f = fixture();
    f.backend
        .seed("person", Record::with_id("p1").field("name", "Ada"));
    f.backend.seed("animal", Record::with_id("a1"));
    f.dispatcher
        .update("person", vec![UpdateOp::new("p1").with_push("pets", "a1")])
        .await
        .unwrap();
    let animals = f
        .backend
        .find("animal", &[RecordId::from("a1")])
        .await
        .unwrap();
    assert_eq!(animals[0].get("owner"), Some(&Value::from("p1")));
}

#[tokio::test]
async fn removing_a_link_detaches_the_inverse() {
    let f = fixture();
    f.backend.seed(
        "person",
        Record::with_id("p1")
            .field("name", "Ada")
            .field("pets", ids(&["a1"])),
    );
    f.backend
        .seed("animal", Record::with_id("a1").field("owner", "p1"));
    f.dispatcher
        .update("person", vec![UpdateOp::new("p1").with_pull("pets", "a1")])
        .await
        .unwrap();
    let animals = f
        .backend
        .find("animal", &[RecordId::from("a1")])
        .await
        .unwrap();
    assert_eq!(animals[0].get("owner"), Some(&Value::Null));
}

#[tokio::test]
async fn replacing_a_link_array_attaches_and_detaches() {
    let f = fixture();
    f.backend.seed(
        "person",
        Record::with_id("p1")
            .field("name", "Ada")
            .field("pets", ids(&["a1"])),
    );
    f.backend
        .seed("animal", Record::with_id("a1").field("owner", "p1"));
    f.backend.seed("animal", Record::with_id("a2"));
    f.dispatcher
        .update(
            "person",
            vec![UpdateOp::new("p1").with_replace("pets", ids(&["a2"]))],
        )
        .await
        .unwrap();
    let animals = f
        .backend
        .find(
            "animal",
            &[RecordId::from("a1"), RecordId::from("a2")],
        )
        .await
        .unwrap();
    assert_eq!(animals[0].get("owner"), Some(&Value::Null));
    assert_eq!(animals[1].get("owner"), Some(&Value::from("p1")));
}

#[tokio::test]
async fn update_of_missing_record_is_not_found() {
    let f = fixture();
    let err = f
        .dispatcher
        .update(
            "person",
            vec![UpdateOp::new("p9").with_replace("name", "X")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::NotFound { .. }));
    assert!(f.sink.events().is_empty());
}

#[tokio::test]
async fn update_with_dangling_link_aborts_everything() {
    let f = fixture();
    f.backend
        .seed("person", Record::with_id("p1").field("name", "Ada"));
    let err = f
        .dispatcher
        .update(
            "person",
            vec![UpdateOp::new("p1")
                .with_replace("name", "Grace")
                .with_push("pets", "a9")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::InvalidLink { .. }));
    let stored = f
        .backend
        .find("person", &[RecordId::from("p1")])
        .await
        .unwrap();
    assert_eq!(stored[0].get("name"), Some(&Value::from("Ada")), "aborted");
}

#[tokio::test]
async fn duplicate_ids_in_payload_are_rejected() {
    let f = fixture();
    let err = f
        .dispatcher
        .update(
            "person",
            vec![
                UpdateOp::new("p1").with_replace("name", "A"),
                UpdateOp::new("p1").with_replace("name", "B"),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WeftError::BadRequest { .. }));
}

#[tokio::test]
async fn event_carries_primary_and_derived_ops() {
    let f = fixture();
    f.backend
        .seed("person", Record::with_id("p1").field("name", "Ada"));
    f.backend.seed("animal", Record::with_id("a1"));
    f.dispatcher
        .update("person", vec![UpdateOp::new("p1").with_push("pets", "a1")])
        .await
        .unwrap();
    let events = f.sink.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].update.contains_key("person"));
    assert!(events[0].update.contains_key("animal"));
    assert!(events[0].create.is_empty());
}
