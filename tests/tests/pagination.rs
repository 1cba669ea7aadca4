use geostore::{Direction, Feature, FeatureId, FeatureType, Query, Store, Type, Value};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use tests::{tests, GeoTest};

async fn numbered(test: &mut GeoTest, count: i32) -> (Store, String) {
    let ty = FeatureType::builder(test.type_name("numbers"))
        .column("n", Type::I32)
        .build()
        .unwrap();

    let store = test.setup_store_with(&ty).await;
    let features = (0..count).map(|n| Feature::new().value("n", n)).collect();
    store.insert(&ty.name, features).await.unwrap();

    (store, ty.name)
}

async fn page(store: &Store, query: Query) -> Vec<Feature> {
    store
        .features(query)
        .await
        .unwrap()
        .collect()
        .await
        .unwrap()
}

fn numbers(features: &[Feature]) -> Vec<i64> {
    features
        .iter()
        .filter_map(|feature| feature.get("n").and_then(Value::as_i64))
        .collect()
}

async fn pages_are_stable_and_disjoint(test: &mut GeoTest) {
    let (store, name) = numbered(test, 25).await;

    let mut seen: HashSet<FeatureId> = HashSet::new();
    let mut pages = vec![];

    for offset in (0..25).step_by(10) {
        let query = Query::new(&name).natural_order().offset(offset).max(10);

        let first = page(&store, query.clone()).await;
        let again = page(&store, query).await;
        assert_eq!(first, again);

        for feature in &first {
            assert!(seen.insert(feature.id.clone().unwrap()));
        }
        pages.push(first.len());
    }

    assert_eq!(pages, vec![10, 10, 5]);
    assert_eq!(seen.len(), 25);
}

async fn reverse_order_mirrors_natural_order(test: &mut GeoTest) {
    let (store, name) = numbered(test, 12).await;

    let forward = page(&store, Query::new(&name).natural_order()).await;
    let mut backward = page(&store, Query::new(&name).reverse_order()).await;
    backward.reverse();

    assert_eq!(forward, backward);
}

async fn sorted_by_attribute(test: &mut GeoTest) {
    let (store, name) = numbered(test, 12).await;

    let top = page(
        &store,
        Query::new(&name).sort_by("n", Direction::Desc).max(3),
    )
    .await;
    assert_eq!(numbers(&top), vec![11, 10, 9]);

    let next = page(
        &store,
        Query::new(&name)
            .sort_by("n", Direction::Desc)
            .offset(3)
            .max(3),
    )
    .await;
    assert_eq!(numbers(&next), vec![8, 7, 6]);
}

async fn offset_past_the_end_is_empty(test: &mut GeoTest) {
    let (store, name) = numbered(test, 4).await;

    let features = page(&store, Query::new(&name).natural_order().offset(10)).await;
    assert!(features.is_empty());

    let features = page(&store, Query::new(&name).natural_order().max(0)).await;
    assert!(features.is_empty());
}

tests!(
    pages_are_stable_and_disjoint,
    reverse_order_mirrors_natural_order,
    sorted_by_attribute,
    offset_past_the_end_is_empty,
);
