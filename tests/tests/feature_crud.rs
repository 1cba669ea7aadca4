use geostore::{
    schema::KeyColumn, Error, Feature, FeatureId, FeatureType, Filter, Geometry, GeometryKind,
    IdentityMapper, Query, Srid, Store, Type, Value,
};
use pretty_assertions::assert_eq;
use tests::{point, tests, GeoTest};

fn places(test: &GeoTest) -> FeatureType {
    FeatureType::builder(test.type_name("places"))
        .column("name", Type::String)
        .column("rank", Type::I32)
        .geometry("geom", GeometryKind::Point, Srid::WGS84, 2)
        .build()
        .unwrap()
}

fn place(name: &str, rank: i32, x: f64, y: f64) -> Feature {
    Feature::new()
        .value("name", name)
        .value("rank", rank)
        .value("geom", point(x, y))
}

async fn insert_query_delete(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    let ids = store.insert(name, vec![place("a", 1, 0.0, 0.0)]).await.unwrap();
    assert_eq!(ids.len(), 1);

    let features: Vec<Feature> = store
        .features(Query::new(name).filter(Filter::eq("name", "a")))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(features.len(), 1);
    assert_eq!(features[0].id.as_ref(), Some(&ids[0]));
    assert_eq!(features[0].get("name").and_then(Value::as_str), Some("a"));
    assert_eq!(features[0].get("rank").and_then(Value::as_i64), Some(1));

    let geom = features[0].get("geom").and_then(Value::as_geometry).unwrap();
    assert_eq!(geom.geometry, Geometry::point(0.0, 0.0));

    let bounds = store.bounds(Query::new(name)).await.unwrap().unwrap();
    assert!(bounds.envelope.contains_point(0.0, 0.0));
    assert_eq!(bounds.srid, Srid::WGS84);

    assert_eq!(store.delete(name, Filter::Include).await.unwrap(), 1);
    assert_eq!(store.count(Query::new(name)).await.unwrap(), 0);
    assert!(store.bounds(Query::new(name)).await.unwrap().is_none());
}

async fn generated_ids_are_distinct(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    let ids = store
        .insert(
            name,
            vec![
                place("a", 1, 0.0, 0.0),
                place("b", 2, 1.0, 1.0),
                place("c", 3, 2.0, 2.0),
            ],
        )
        .await
        .unwrap();

    assert_eq!(ids.len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);

    for id in &ids {
        assert!(id.as_str().starts_with(&format!("{name}.")));
    }

    let found = store
        .features(Query::new(name).filter(Filter::ids([ids[1].clone()])))
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name").and_then(Value::as_str), Some("b"));
}

async fn update_is_idempotent(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    store
        .insert(
            name,
            vec![
                place("a", 1, 0.0, 0.0),
                place("b", 1, 1.0, 1.0),
                place("c", 5, 2.0, 2.0),
            ],
        )
        .await
        .unwrap();

    let renamed = vec![("name".to_string(), Value::from("x"))];
    for _ in 0..2 {
        let count = store
            .update(name, Filter::eq("rank", 1), renamed.clone())
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    let promoted = vec![("rank".to_string(), Value::from(7))];
    assert_eq!(
        store.update(name, Filter::lt("rank", 7), promoted.clone()).await.unwrap(),
        3
    );
    assert_eq!(
        store.update(name, Filter::lt("rank", 7), promoted).await.unwrap(),
        0
    );

    let count = store
        .count(Query::new(name).filter(Filter::eq("name", "x")))
        .await
        .unwrap();
    assert_eq!(count, 2);
}

async fn update_moves_geometry(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    let ids = store.insert(name, vec![place("a", 1, 0.0, 0.0)]).await.unwrap();

    store
        .update_by_id(
            name,
            ids[0].clone(),
            vec![("geom".to_string(), Value::from(point(5.0, 6.0)))],
        )
        .await
        .unwrap();

    let bounds = store.bounds(Query::new(name)).await.unwrap().unwrap();
    assert!(bounds.envelope.contains_point(5.0, 6.0));
}

async fn writes_by_missing_id_conflict(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    let ids = store.insert(name, vec![place("a", 1, 0.0, 0.0)]).await.unwrap();
    store.delete_by_id(name, ids[0].clone()).await.unwrap();

    let err = store.delete_by_id(name, ids[0].clone()).await.unwrap_err();
    assert!(err.is_write_conflict(), "{err}");

    let err = store
        .update_by_id(
            name,
            ids[0].clone(),
            vec![("name".to_string(), Value::from("b"))],
        )
        .await
        .unwrap_err();
    assert!(err.is_write_conflict(), "{err}");
}

async fn unknown_attributes_are_rejected(test: &mut GeoTest) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;
    let name = ty.name.as_str();

    let err = store
        .insert(name, vec![Feature::new().value("height", 3)])
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");
    assert_eq!(store.count(Query::new(name)).await.unwrap(), 0);
}

async fn assigned_keys(test: &mut GeoTest) {
    let ty = FeatureType::builder(test.type_name("parcels"))
        .column("code", Type::String)
        .column("owner", Type::String)
        .identity(IdentityMapper::assigned(vec![KeyColumn::new("code", Type::String)]).exposed(true))
        .build()
        .unwrap();

    // Key columns are only writable as attributes when exposed
    let store = test
        .try_setup_store(Store::builder().expose_primary_keys(true))
        .await
        .unwrap();
    store.create_schema(&ty).await.unwrap();
    let name = ty.name.as_str();

    let ids = store
        .insert(
            name,
            vec![Feature::new().value("code", "P-1").value("owner", "ann")],
        )
        .await
        .unwrap();
    assert_eq!(ids, vec![FeatureId::new(name, &[Value::from("P-1")])]);

    let feature = store
        .features(Query::new(name).filter(Filter::ids(ids.clone())))
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .unwrap()
        .remove(0);
    assert_eq!(feature.get("owner").and_then(Value::as_str), Some("ann"));

    let err = store
        .update(
            name,
            Filter::Include,
            vec![("code".to_string(), Value::from("P-2"))],
        )
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");
}

tests!(
    insert_query_delete,
    generated_ids_are_distinct,
    update_is_idempotent,
    update_moves_geometry,
    writes_by_missing_id_conflict,
    unknown_attributes_are_rejected,
    assigned_keys,
);
