use geostore::{
    geom::Coord, Feature, FeatureType, Geometry, GeometryKind, GeometryValue, Query, Srid, Store,
    Type, Value, WireFormat,
};
use pretty_assertions::assert_eq;
use tests::{tests, GeoTest};

const FORMATS: [WireFormat; 3] = [WireFormat::Wkt, WireFormat::Wkb, WireFormat::Ewkb];

fn points(test: &GeoTest, format: WireFormat, dimension: u8) -> FeatureType {
    let name = format!("points_{}d_{format:?}", dimension).to_lowercase();
    FeatureType::builder(test.type_name(&name))
        .column("name", Type::String)
        .geometry("geom", GeometryKind::Point, Srid::WGS84, dimension)
        .build()
        .unwrap()
}

fn point_z(x: f64, y: f64, z: f64) -> GeometryValue {
    GeometryValue::new(Geometry::Point(Coord::xyz(x, y, z)), Srid::WGS84)
}

/// Writes one feature and reads its geometry back.
async fn round_trip(store: &Store, ty: &FeatureType, value: GeometryValue) -> GeometryValue {
    store
        .insert(&ty.name, vec![Feature::new().value("name", "p").value("geom", value)])
        .await
        .unwrap();

    let features: Vec<Feature> = store
        .features(Query::new(&ty.name))
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(features.len(), 1);
    features[0]
        .get("geom")
        .and_then(Value::as_geometry)
        .cloned()
        .unwrap()
}

async fn two_dimensional_columns(test: &mut GeoTest) {
    for format in FORMATS {
        let store = test
            .try_setup_store(Store::builder().wire_format(format))
            .await
            .unwrap();
        let ty = points(test, format, 2);
        store.create_schema(&ty).await.unwrap();

        // Z is dropped on the way into a 2D column
        let read = round_trip(&store, &ty, point_z(1.0, 2.0, 3.0)).await;
        assert_eq!(read.geometry, Geometry::point(1.0, 2.0), "{format:?}");
        assert_eq!(read.srid, Srid::WGS84, "{format:?}");
    }
}

async fn three_dimensional_columns(test: &mut GeoTest) {
    for format in FORMATS {
        let store = test
            .try_setup_store(Store::builder().wire_format(format))
            .await
            .unwrap();
        let ty = points(test, format, 3);
        store.create_schema(&ty).await.unwrap();

        let read = round_trip(&store, &ty, point_z(1.0, 2.0, 3.0)).await;

        // WKB carries two dimensions only: what comes back is the
        // projection of what was written
        let expect = if format.keeps_z() {
            Geometry::Point(Coord::xyz(1.0, 2.0, 3.0))
        } else {
            Geometry::point(1.0, 2.0)
        };
        assert_eq!(read.geometry, expect, "{format:?}");
        assert_eq!(read.srid, Srid::WGS84, "{format:?}");
    }
}

tests!(
    two_dimensional_columns,
    three_dimensional_columns,
);
