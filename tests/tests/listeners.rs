use geostore::{
    EventKind, Feature, FeatureEvent, FeatureType, Filter, GeometryKind, Srid, Store, Type, Value,
};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use tests::{point, tests, GeoTest};

async fn recorded(test: &mut GeoTest) -> (Store, String, Arc<Mutex<Vec<FeatureEvent>>>) {
    let ty = FeatureType::builder(test.type_name("stops"))
        .column("line", Type::String)
        .geometry("geom", GeometryKind::Point, Srid::WGS84, 2)
        .build()
        .unwrap();

    let store = test.setup_store_with(&ty).await;

    let events = Arc::new(Mutex::new(vec![]));
    let sink = events.clone();
    store.add_listener(move |event: &FeatureEvent| sink.lock().unwrap().push(event.clone()));

    (store, ty.name, events)
}

fn stop(line: &str, x: f64, y: f64) -> Feature {
    Feature::new().value("line", line).value("geom", point(x, y))
}

fn take(events: &Mutex<Vec<FeatureEvent>>) -> Vec<FeatureEvent> {
    std::mem::take(&mut *events.lock().unwrap())
}

async fn writes_are_reported(test: &mut GeoTest) {
    let (store, name, events) = recorded(test).await;

    store
        .insert(&name, vec![stop("1", 0.0, 0.0), stop("2", 4.0, 3.0)])
        .await
        .unwrap();

    let reported = take(&events);
    let [added] = &reported[..] else {
        panic!("expected one event");
    };
    assert_eq!(added.kind, EventKind::Added);
    assert_eq!(added.type_name, name);
    assert_eq!(added.count, 2);
    assert_eq!(added.transaction, None);
    let bounds = added.bounds.unwrap();
    assert!(bounds.envelope.contains_point(0.0, 0.0));
    assert!(bounds.envelope.contains_point(4.0, 3.0));

    store
        .update(
            &name,
            Filter::eq("line", "2"),
            vec![("geom".to_string(), Value::from(point(9.0, 9.0)))],
        )
        .await
        .unwrap();

    let reported = take(&events);
    let [changed] = &reported[..] else {
        panic!("expected one event");
    };
    assert_eq!(changed.kind, EventKind::Changed);
    assert_eq!(changed.count, 1);
    let bounds = changed.bounds.unwrap();
    assert!(bounds.envelope.contains_point(4.0, 3.0));
    assert!(bounds.envelope.contains_point(9.0, 9.0));

    store.delete(&name, Filter::eq("line", "1")).await.unwrap();

    let reported = take(&events);
    let [removed] = &reported[..] else {
        panic!("expected one event");
    };
    assert_eq!(removed.kind, EventKind::Removed);
    assert_eq!(removed.count, 1);
    assert!(removed.bounds.unwrap().envelope.contains_point(0.0, 0.0));
}

async fn empty_writes_are_not_reported(test: &mut GeoTest) {
    let (store, name, events) = recorded(test).await;

    let count = store.delete(&name, Filter::eq("line", "9")).await.unwrap();
    assert_eq!(count, 0);

    let count = store
        .update(
            &name,
            Filter::Exclude,
            vec![("line".to_string(), Value::from("0"))],
        )
        .await
        .unwrap();
    assert_eq!(count, 0);

    assert!(take(&events).is_empty());
}

async fn transaction_writes_carry_the_transaction(test: &mut GeoTest) {
    let (store, name, events) = recorded(test).await;

    let tx = store.begin().await.unwrap();
    tx.insert(&name, vec![stop("1", 1.0, 1.0)]).await.unwrap();
    let id = tx.id();
    tx.commit().await.unwrap();

    let reported = take(&events);
    let [added] = &reported[..] else {
        panic!("expected one event");
    };
    assert_eq!(added.transaction, Some(id));
    assert_eq!(added.kind, EventKind::Added);
}

tests!(
    writes_are_reported,
    empty_writes_are_not_reported,
    transaction_writes_carry_the_transaction,
);
