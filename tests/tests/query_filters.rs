use geostore::{
    filter::{Expr, Func},
    CompareOp, Envelope, Error, Feature, FeatureType, Filter, GeometryKind, Query, Srid, Store,
    Type, Value,
};
use pretty_assertions::assert_eq;
use tests::{assert_eq_unordered, point, tests, GeoTest};

fn places(test: &GeoTest) -> FeatureType {
    FeatureType::builder(test.type_name("places"))
        .column("name", Type::String)
        .column("rank", Type::I32)
        .geometry("geom", GeometryKind::Point, Srid::WGS84, 2)
        .build()
        .unwrap()
}

async fn seeded(test: &mut GeoTest) -> (Store, String) {
    let ty = places(test);
    let store = test.setup_store_with(&ty).await;

    let features = [("ab", 1, 0.0, 0.0), ("ba", 2, 1.0, 1.0), ("cc", 3, 10.0, 10.0)]
        .into_iter()
        .map(|(name, rank, x, y)| {
            Feature::new()
                .value("name", name)
                .value("rank", rank)
                .value("geom", point(x, y))
        })
        .collect();

    store.insert(&ty.name, features).await.unwrap();
    (store, ty.name)
}

async fn names(store: &Store, query: Query) -> Vec<String> {
    store
        .features(query)
        .await
        .unwrap()
        .collect::<Vec<_>>()
        .await
        .unwrap()
        .into_iter()
        .filter_map(|feature| feature.get("name").and_then(Value::as_str).map(str::to_string))
        .collect()
}

/// `reverse(name) = 'ab'` has no SQL form and is evaluated after reading.
fn reversed_is(value: &str) -> Filter {
    Filter::compare(
        CompareOp::Eq,
        Expr::function(Func::Reverse, [Expr::property("name")]),
        Expr::literal(value),
    )
}

async fn residual_filters_match_pushdown(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    let pushed = names(&store, Query::new(&name).filter(Filter::eq("name", "ba"))).await;
    let residual = names(&store, Query::new(&name).filter(reversed_is("ab"))).await;

    assert_eq!(pushed, vec!["ba".to_string()]);
    assert_eq!(residual, pushed);

    // Mixed: the encodable half runs in the store
    let mixed = names(
        &store,
        Query::new(&name).filter(Filter::and(Filter::ge("rank", 2), reversed_is("cc"))),
    )
    .await;
    assert_eq!(mixed, vec!["cc".to_string()]);
}

async fn nested_bbox_residuals_see_the_geometry(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    // The `or` keeps the bbox on the client together with the residual
    let filter = Filter::or(
        Filter::bbox(Envelope::new(-0.5, -0.5, 0.5, 0.5), Srid::WGS84),
        reversed_is("cc"),
    );

    let all = names(&store, Query::new(&name).filter(filter.clone())).await;
    let subset = names(&store, Query::new(&name).filter(filter).properties(["name"])).await;

    assert_eq_unordered!(&all, [&"ab".to_string(), &"cc".to_string()]);
    assert_eq_unordered!(&subset, &all);
}

async fn count_matches_features(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    for filter in [
        Filter::Include,
        Filter::Exclude,
        Filter::gt("rank", 1),
        Filter::or(Filter::eq("name", "ab"), Filter::eq("name", "cc")),
        reversed_is("ba"),
    ] {
        let query = Query::new(&name).filter(filter);
        let expect = names(&store, query.clone()).await.len() as u64;
        assert_eq!(store.count(query).await.unwrap(), expect);
    }

    let paginated = Query::new(&name).natural_order().offset(1).max(5);
    assert_eq!(store.count(paginated).await.unwrap(), 2);
}

async fn spatial_filters(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    let near_origin = Filter::bbox(Envelope::new(-0.5, -0.5, 1.5, 1.5), Srid::WGS84);
    let found = names(&store, Query::new(&name).filter(near_origin)).await;
    assert_eq_unordered!(&found, [&"ab".to_string(), &"ba".to_string()]);

    let within = Filter::dwithin("geom", point(10.0, 11.0), 2.0);
    let found = names(&store, Query::new(&name).filter(within)).await;
    assert_eq!(found, vec!["cc".to_string()]);
}

async fn selected_properties(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    let features: Vec<Feature> = store
        .features(
            Query::new(&name)
                .filter(Filter::eq("name", "ab"))
                .properties(["rank"]),
        )
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(features.len(), 1);
    assert!(features[0].id.is_some());
    assert_eq!(features[0].values.keys().collect::<Vec<_>>(), vec!["rank"]);
}

async fn unknown_properties_are_rejected(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    let err = store
        .features(Query::new(&name).filter(Filter::eq("height", 3)))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");

    let err = store
        .features(Query::new(&name).properties(["height"]))
        .await
        .unwrap_err();
    assert!(err.any(Error::is_validation), "{err}");
}

async fn bounds_of_filtered_features(test: &mut GeoTest) {
    let (store, name) = seeded(test).await;

    let all = store.bounds(Query::new(&name)).await.unwrap().unwrap();
    assert_eq!(all.envelope, Envelope::new(0.0, 0.0, 10.0, 10.0));

    let low = store
        .bounds(Query::new(&name).filter(Filter::lt("rank", 3)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(low.envelope, Envelope::new(0.0, 0.0, 1.0, 1.0));

    let none = store
        .bounds(Query::new(&name).filter(Filter::gt("rank", 10)))
        .await
        .unwrap();
    assert!(none.is_none());

    // A residual leaves the bounds unknown
    let residual = store
        .bounds(Query::new(&name).filter(reversed_is("ab")))
        .await
        .unwrap();
    assert!(residual.is_none());
}

tests!(
    residual_filters_match_pushdown,
    nested_bbox_residuals_see_the_geometry,
    count_matches_features,
    spatial_filters,
    selected_properties,
    unknown_properties_are_rejected,
    bounds_of_filtered_features,
);
