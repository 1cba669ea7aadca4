use geostore::{
    schema::KeyStrategy, Feature, FeatureType, GeometryKind, Query, Srid, Store, Type,
};
use pretty_assertions::assert_eq;
use tests::{tests, GeoTest};

fn roads(test: &GeoTest) -> FeatureType {
    FeatureType::builder(test.type_name("roads"))
        .column("name", Type::String)
        .column("lanes", Type::I32)
        .geometry("geom", GeometryKind::LineString, Srid::WGS84, 2)
        .build()
        .unwrap()
}

async fn created_types_are_described(test: &mut GeoTest) {
    let ty = roads(test);
    let store = test.setup_store_with(&ty).await;

    assert!(store.type_names().await.unwrap().contains(&ty.name));

    let described = store.schema(&ty.name).await.unwrap();
    assert_eq!(described.name, ty.name);
    assert_eq!(described.identity.strategy, KeyStrategy::AutoGenerated);
    assert!(!described.identity.exposed);

    let names: Vec<_> = described.attribute_names().collect();
    assert_eq!(names, vec!["name", "lanes", "geom"]);
    assert_eq!(described.attribute("name").unwrap().ty, Type::String);

    let geometry = described.geometry().unwrap();
    assert_eq!(geometry.name, "geom");
    let descriptor = geometry.geometry.as_ref().unwrap();
    assert_eq!(descriptor.kind, GeometryKind::LineString);
    assert_eq!(descriptor.srid, Srid::WGS84);
    assert_eq!(descriptor.dimension, 2);
}

async fn creating_twice_fails(test: &mut GeoTest) {
    let ty = roads(test);
    let store = test.setup_store_with(&ty).await;

    let err = store.create_schema(&ty).await.unwrap_err();
    assert!(err.is_schema(), "{err}");
}

async fn unknown_types_fail(test: &mut GeoTest) {
    let store = test.setup_store().await;
    let name = test.type_name("missing");

    let err = store.schema(&name).await.unwrap_err();
    assert!(err.is_schema(), "{err}");

    let err = store.count(Query::new(&name)).await.unwrap_err();
    assert!(err.is_schema(), "{err}");
}

async fn keyless_types_read_with_volatile_ids(test: &mut GeoTest) {
    let ty = FeatureType::builder(test.type_name("readings"))
        .column("value", Type::F64)
        .identity(geostore::IdentityMapper::volatile())
        .build()
        .unwrap();
    let store = test.setup_store_with(&ty).await;

    store
        .insert(
            &ty.name,
            vec![
                Feature::new().value("value", 1.0),
                Feature::new().value("value", 2.0),
            ],
        )
        .await
        .unwrap();

    assert!(store.schema(&ty.name).await.unwrap().identity.is_volatile());

    let ids = store
        .features(Query::new(&ty.name))
        .await
        .unwrap()
        .ids()
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(ids.iter().all(|id| id.is_volatile()));
    assert_eq!(store.count(Query::new(&ty.name)).await.unwrap(), 2);
}

async fn builder_settings_apply(test: &mut GeoTest) {
    let store: Store = test
        .try_setup_store(Store::builder().loose_bbox(true).max_connections(4))
        .await
        .unwrap();

    assert!(store.config().loose_bbox);
    assert_eq!(store.capability().dialect, test.capability().dialect);
    assert_eq!(store.config().pool.max_connections, Some(4));
}

tests!(
    created_types_are_described,
    creating_twice_fails,
    unknown_types_fail,
    keyless_types_read_with_volatile_ids,
    builder_settings_apply,
);
