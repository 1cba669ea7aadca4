//! Spatial SQL functions for SQLite.
//!
//! SQLite has no geometry type, so geometry columns hold EWKB blobs and the
//! `ST_*` functions the SQL layer emits are registered on every connection.
//! All of them return `NULL` when a geometry argument is `NULL`.

use crate::Value;

use geostore_core::{
    geom::{algorithm, Envelope, GeometryCodec, WireFormat},
    Error, Geometry, GeometryValue, Srid, Value as CoreValue,
};
use rusqlite::{
    functions::{Context, FunctionFlags},
    types::ValueRef,
    Connection,
};

type Predicate = fn(&Geometry, &Geometry) -> bool;
type Scalar = fn(&GeometryValue) -> CoreValue;

pub(crate) fn register(connection: &Connection) -> rusqlite::Result<()> {
    // CHECK constraints may only call deterministic functions
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    let predicates: [(&str, Predicate); 6] = [
        ("ST_Intersects", algorithm::intersects),
        ("ST_Disjoint", algorithm::disjoint),
        ("ST_Contains", algorithm::contains),
        ("ST_Within", algorithm::within),
        ("ST_Equals", algorithm::equals),
        ("ST_EnvIntersects", envelopes_intersect),
    ];

    for (name, predicate) in predicates {
        connection.create_scalar_function(name, 2, flags, move |ctx| {
            let (Some(a), Some(b)) = (geometry_arg(ctx, 0)?, geometry_arg(ctx, 1)?) else {
                return Ok(Value::from(CoreValue::Null));
            };
            Ok(Value::from(CoreValue::Bool(predicate(
                &a.geometry,
                &b.geometry,
            ))))
        })?;
    }

    connection.create_scalar_function("ST_DWithin", 3, flags, |ctx| {
        let (Some(a), Some(b)) = (geometry_arg(ctx, 0)?, geometry_arg(ctx, 1)?) else {
            return Ok(Value::from(CoreValue::Null));
        };
        let distance: f64 = ctx.get(2)?;
        Ok(Value::from(CoreValue::Bool(algorithm::dwithin(
            &a.geometry,
            &b.geometry,
            distance,
        ))))
    })?;

    let scalars: [(&str, Scalar); 12] = [
        ("ST_AsText", |value| encode(WireFormat::Wkt, value)),
        ("ST_AsBinary", |value| encode(WireFormat::Wkb, value)),
        ("ST_AsEWKB", |value| encode(WireFormat::Ewkb, value)),
        ("ST_Force2D", |value| encode(WireFormat::Ewkb, &value.to_2d())),
        ("ST_Force3D", |value| encode(WireFormat::Ewkb, &value.to_3d())),
        ("ST_XMin", |value| bound(value, |env| env.min_x)),
        ("ST_YMin", |value| bound(value, |env| env.min_y)),
        ("ST_XMax", |value| bound(value, |env| env.max_x)),
        ("ST_YMax", |value| bound(value, |env| env.max_y)),
        // PostGIS reports an unknown reference system as 0
        ("ST_SRID", |value| {
            CoreValue::I64(value.srid.known().unwrap_or(0) as i64)
        }),
        ("ST_NDims", |value| CoreValue::I64(value.dimension() as i64)),
        ("GeometryType", |value| {
            CoreValue::String(value.geometry.kind().name().to_string())
        }),
    ];

    for (name, scalar) in scalars {
        connection.create_scalar_function(name, 1, flags, move |ctx| {
            Ok(Value::from(match geometry_arg(ctx, 0)? {
                Some(value) => scalar(&value),
                None => CoreValue::Null,
            }))
        })?;
    }

    // The optional second argument overrides the reference system
    for name in ["ST_GeomFromText", "ST_GeomFromWKB"] {
        for arity in [1, 2] {
            connection.create_scalar_function(name, arity, flags, geometry_from)?;
        }
    }
    connection.create_scalar_function("ST_GeomFromEWKB", 1, flags, geometry_from)?;

    for arity in [4, 5] {
        connection.create_scalar_function("ST_MakeEnvelope", arity, flags, make_envelope)?;
    }

    Ok(())
}

fn geometry_from(ctx: &Context<'_>) -> rusqlite::Result<Value> {
    let Some(mut value) = geometry_arg(ctx, 0)? else {
        return Ok(Value::from(CoreValue::Null));
    };

    if ctx.len() > 1 {
        let srid: Option<i32> = ctx.get(1)?;
        value.srid = srid.map_or(Srid::UNKNOWN, Srid::new).or(value.srid);
    }

    Ok(Value::from(encode(WireFormat::Ewkb, &value)))
}

fn make_envelope(ctx: &Context<'_>) -> rusqlite::Result<Value> {
    let mut corners = [0.0; 4];
    for (index, corner) in corners.iter_mut().enumerate() {
        *corner = ctx.get(index)?;
    }
    let [x1, y1, x2, y2] = corners;

    let srid = if ctx.len() > 4 {
        ctx.get::<Option<i32>>(4)?.map_or(Srid::UNKNOWN, Srid::new)
    } else {
        Srid::UNKNOWN
    };

    let envelope = Envelope::new(x1, y1, x2, y2);
    Ok(Value::from(encode(
        WireFormat::Ewkb,
        &GeometryValue::new(envelope.to_geometry(), srid),
    )))
}

/// Reads a stored geometry. Text arguments are accepted as WKT or hex EWKB.
fn geometry_arg(ctx: &Context<'_>, index: usize) -> rusqlite::Result<Option<GeometryValue>> {
    let value = match ctx.get_raw(index) {
        ValueRef::Null => return Ok(None),
        ValueRef::Blob(bytes) => CoreValue::Bytes(bytes.to_vec()),
        ValueRef::Text(text) => CoreValue::String(String::from_utf8_lossy(text).into_owned()),
        other => {
            return Err(user_error(Error::codec(format!(
                "expected a geometry, found {}",
                other.data_type()
            ))))
        }
    };

    GeometryCodec::new(WireFormat::Ewkb)
        .decode(&value, Srid::UNKNOWN)
        .map_err(user_error)
}

fn encode(format: WireFormat, value: &GeometryValue) -> CoreValue {
    GeometryCodec::new(format).encode(value)
}

fn envelopes_intersect(a: &Geometry, b: &Geometry) -> bool {
    match (a.envelope(), b.envelope()) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}

/// Empty geometries have no bounds.
fn bound(value: &GeometryValue, side: fn(&Envelope) -> f64) -> CoreValue {
    match value.geometry.envelope() {
        Some(envelope) => CoreValue::F64(side(&envelope)),
        None => CoreValue::Null,
    }
}

fn user_error(err: Error) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        register(&connection).unwrap();
        connection
    }

    #[test]
    fn round_trips_text() {
        let connection = connection();
        let text: String = connection
            .query_row(
                "SELECT ST_AsText(ST_GeomFromText('POINT(1 2)', 4326))",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(text, "POINT(1 2)");

        let srid: i64 = connection
            .query_row(
                "SELECT ST_SRID(ST_GeomFromText('POINT(1 2)', 4326))",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(srid, 4326);
    }

    #[test]
    fn envelope_predicates() {
        let connection = connection();
        let (inside, outside): (bool, bool) = connection
            .query_row(
                "SELECT ST_Intersects(ST_GeomFromText('POINT(1 1)'), ST_MakeEnvelope(0, 0, 2, 2)), \
                        ST_Intersects(ST_GeomFromText('POINT(5 5)'), ST_MakeEnvelope(0, 0, 2, 2))",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(inside);
        assert!(!outside);

        let x_max: f64 = connection
            .query_row(
                "SELECT ST_XMax(ST_GeomFromText('LINESTRING(0 0, 3 4)'))",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(x_max, 3.0);
    }

    #[test]
    fn nulls_propagate() {
        let connection = connection();
        let value: Option<bool> = connection
            .query_row(
                "SELECT ST_Within(NULL, ST_MakeEnvelope(0, 0, 1, 1))",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn kind_and_dimension() {
        let connection = connection();
        let (kind, dims): (String, i64) = connection
            .query_row(
                "SELECT GeometryType(g), ST_NDims(g) FROM (SELECT ST_GeomFromText('POINT Z(1 2 3)') AS g)",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(kind, "POINT");
        assert_eq!(dims, 3);
    }

    #[test]
    fn force_3d_pads_z() {
        let connection = connection();
        let dims: (i64, i64) = connection
            .query_row(
                "SELECT ST_NDims(ST_Force3D(ST_GeomFromText('POINT(1 2)'))), \
                        ST_NDims(ST_Force2D(ST_Force3D(ST_GeomFromText('POINT(1 2)'))))",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(dims, (3, 2));
    }
}
