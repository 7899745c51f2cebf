//! Shared fixtures for the pipeline integration tests

use std::sync::{Arc, Mutex};
use weft::{
    ChangeEvent, Dispatcher, EventSink, FieldDef, MemoryBackend, Schema, Value, ValueType,
};

/// Sink that records every published event for later assertions
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ChangeEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn publish(&self, event: &ChangeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Person/animal/group schema exercising every link shape:
/// array-to-singular, singular-to-array, and array-to-array inverses,
/// plus a denormalized cache field.
pub fn schema() -> Schema {
    Schema::builder()
        .record_type("person")
        .field("name", FieldDef::value(ValueType::String).required())
        .field("age", FieldDef::value(ValueType::Int))
        .field("pets", FieldDef::link_many("animal").inverse("owner"))
        .field("groups", FieldDef::link_many("group").inverse("members"))
        .field(
            "group_names",
            FieldDef::link_many("group").denormalized(),
        )
        .field("mentor", FieldDef::link_one("person").inverse("mentees"))
        .field("mentees", FieldDef::link_many("person").inverse("mentor"))
        .done()
        .record_type("animal")
        .field("species", FieldDef::value(ValueType::String))
        .field("owner", FieldDef::link_one("person").inverse("pets"))
        .done()
        .record_type("group")
        .field("members", FieldDef::link_many("person").inverse("groups"))
        .done()
        .build()
        .unwrap()
}

pub struct Fixture {
    pub backend: Arc<MemoryBackend>,
    pub dispatcher: Dispatcher,
    pub sink: Arc<CollectingSink>,
}

pub fn fixture() -> Fixture {
    fixture_with(|builder| builder)
}

pub fn fixture_with(
    configure: impl FnOnce(weft::DispatcherBuilder) -> weft::DispatcherBuilder,
) -> Fixture {
    // First caller wins; later inits are no-ops.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = Arc::new(MemoryBackend::new());
    let sink = Arc::new(CollectingSink::new());
    let builder = Dispatcher::builder(Arc::clone(&backend) as Arc<dyn weft::Backend>, schema())
        .sink(Arc::clone(&sink) as Arc<dyn EventSink>);
    let dispatcher = configure(builder).build();
    Fixture {
        backend,
        dispatcher,
        sink,
    }
}

pub fn ids(values: &[&str]) -> Value {
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}
