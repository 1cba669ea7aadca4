use geostore::{Feature, FeatureType, Filter, Query, Store, Type, Value};
use pretty_assertions::assert_eq;
use tests::{tests, GeoTest};

// In-memory SQLite pools hold a single connection, so these tests never
// call the store while a transaction is open.

async fn notes(test: &mut GeoTest) -> (Store, String) {
    let ty = FeatureType::builder(test.type_name("notes"))
        .column("text", Type::String)
        .build()
        .unwrap();

    let store = test.setup_store_with(&ty).await;
    (store, ty.name)
}

fn note(text: &str) -> Feature {
    Feature::new().value("text", text)
}

async fn commit_publishes_writes(test: &mut GeoTest) {
    let (store, name) = notes(test).await;

    let tx = store.begin().await.unwrap();
    let ids = tx.insert(&name, vec![note("a"), note("b")]).await.unwrap();
    tx.update_by_id(
        &name,
        ids[1].clone(),
        vec![("text".to_string(), Value::from("c"))],
    )
    .await
    .unwrap();

    // Uncommitted writes are visible inside the transaction
    let features: Vec<Feature> = tx
        .features(Query::new(&name).natural_order())
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let texts: Vec<_> = features
        .iter()
        .filter_map(|feature| feature.get("text").and_then(Value::as_str))
        .collect();
    assert_eq!(texts, vec!["a", "c"]);

    tx.commit().await.unwrap();

    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 2);
}

async fn rollback_discards_writes(test: &mut GeoTest) {
    let (store, name) = notes(test).await;
    store.insert(&name, vec![note("kept")]).await.unwrap();

    let tx = store.begin().await.unwrap();
    assert_eq!(tx.delete(&name, Filter::Include).await.unwrap(), 1);
    assert_eq!(tx.count(Query::new(&name)).await.unwrap(), 0);
    tx.rollback().await.unwrap();

    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 1);
}

async fn dropped_transactions_roll_back(test: &mut GeoTest) {
    let (store, name) = notes(test).await;

    let tx = store.begin().await.unwrap();
    tx.insert(&name, vec![note("lost")]).await.unwrap();
    drop(tx);

    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 0);
}

async fn failed_writes_leave_nothing_behind(test: &mut GeoTest) {
    let (store, name) = notes(test).await;

    // The second feature is invalid, so the first is not kept either
    let err = store
        .insert(&name, vec![note("a"), Feature::new().value("title", "b")])
        .await
        .unwrap_err();
    assert!(err.any(geostore::Error::is_validation), "{err}");

    assert_eq!(store.count(Query::new(&name)).await.unwrap(), 0);
}

tests!(
    commit_publishes_writes,
    rollback_discards_writes,
    dropped_transactions_roll_back,
    failed_writes_leave_nothing_behind,
);
