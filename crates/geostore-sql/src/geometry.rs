//! Column expressions that move geometries through the configured wire
//! format.

use crate::stmt::Expr;

use geostore_core::{
    driver::Capability,
    geom::{GeometryCodec, WireFormat},
    schema::GeometryDescriptor,
    Error, GeometryValue, Result, Srid, Value,
};

/// Expression reading geometry column `column` in `format`.
///
/// `reproject` asks the store to transform the geometry first. WKB output is
/// always two dimensional, so the column is projected before encoding.
pub fn select_expr(
    column: &str,
    format: WireFormat,
    force_2d: bool,
    reproject: Option<Srid>,
) -> Expr {
    let mut expr = Expr::column(column);

    if let Some(code) = reproject.and_then(Srid::known) {
        expr = Expr::func("ST_Transform", [expr, Expr::literal(code as i64)]);
    }

    if force_2d || format == WireFormat::Wkb {
        expr = Expr::func("ST_Force2D", [expr]);
    }

    let name = match format {
        WireFormat::Wkt => "ST_AsText",
        WireFormat::Wkb => "ST_AsBinary",
        WireFormat::Ewkb => "ST_AsEWKB",
    };

    Expr::func(name, [expr])
}

/// Expression writing `value` into a geometry column.
///
/// Values are dropped to two dimensions for 2D columns and tagged with the
/// column's reference system when they carry none. WKB cannot carry Z, so
/// values written to 3D columns in WKB arrive with a Z of 0. A value in another known
/// reference system is transformed by the store if it can, and rejected
/// otherwise. `None` writes a typed null.
pub fn insert_expr(
    value: Option<&GeometryValue>,
    column: &GeometryDescriptor,
    codec: GeometryCodec,
    capability: &Capability,
) -> Result<Expr> {
    let format = codec.format();

    let (param, srid, transform) = match value {
        None => (
            Expr::typed_value(Value::Null, format.value_type()),
            column.srid,
            None,
        ),
        Some(value) => {
            let geometry = if column.dimension == 2 {
                value.geometry.to_2d()
            } else {
                value.geometry.clone()
            };
            let srid = value.srid.or(column.srid);

            let transform = match (srid.known(), column.srid.known()) {
                (Some(a), Some(b)) if a != b => {
                    if !capability.transform {
                        return Err(Error::validation(format!(
                            "geometry in SRID {a} cannot be written to a column in SRID {b}"
                        )));
                    }
                    Some(b)
                }
                _ => None,
            };

            let encoded = codec.encode(&GeometryValue::new(geometry, srid));
            (
                Expr::typed_value(encoded, format.value_type()),
                srid,
                transform,
            )
        }
    };

    let mut args = vec![param];
    let name = match format {
        WireFormat::Wkt => "ST_GeomFromText",
        WireFormat::Wkb => "ST_GeomFromWKB",
        WireFormat::Ewkb => "ST_GeomFromEWKB",
    };
    if format != WireFormat::Ewkb {
        if let Some(code) = srid.known() {
            args.push(Expr::literal(code as i64));
        }
    }

    let mut expr = Expr::func(name, args);
    if let Some(target) = transform {
        expr = Expr::func("ST_Transform", [expr, Expr::literal(target as i64)]);
    }
    if value.is_some() && column.dimension == 3 && !format.keeps_z() {
        expr = Expr::func("ST_Force3D", [expr]);
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostore_core::geom::{Coord, Geometry, GeometryKind};

    fn point_column(dimension: u8) -> GeometryDescriptor {
        GeometryDescriptor {
            kind: GeometryKind::Point,
            srid: Srid::new(4326),
            dimension,
        }
    }

    #[test]
    fn wkb_reads_are_two_dimensional() {
        let expr = select_expr("geom", WireFormat::Wkb, false, None);
        assert_eq!(
            expr,
            Expr::func("ST_AsBinary", [Expr::func("ST_Force2D", [Expr::column("geom")])])
        );

        let expr = select_expr("geom", WireFormat::Ewkb, false, None);
        assert_eq!(expr, Expr::func("ST_AsEWKB", [Expr::column("geom")]));
    }

    #[test]
    fn reprojection_wraps_the_column() {
        let expr = select_expr("geom", WireFormat::Wkt, true, Some(Srid::new(3857)));
        assert_eq!(
            expr,
            Expr::func(
                "ST_AsText",
                [Expr::func(
                    "ST_Force2D",
                    [Expr::func("ST_Transform", [Expr::column("geom"), Expr::literal(3857)])]
                )]
            )
        );
    }

    #[test]
    fn inserts_drop_z_for_2d_columns() {
        let value = GeometryValue::unknown(Geometry::Point(Coord::xyz(1.0, 2.0, 3.0)));
        let codec = GeometryCodec::new(WireFormat::Ewkb);

        let Expr::Func(func) =
            insert_expr(Some(&value), &point_column(2), codec, &Capability::SQLITE).unwrap()
        else {
            panic!("expected a function call");
        };
        assert_eq!(func.name, "ST_GeomFromEWKB");

        let Expr::Value(param) = &func.args[0] else {
            panic!("expected a parameter");
        };
        let decoded = codec.decode(&param.value, Srid::UNKNOWN).unwrap().unwrap();
        assert_eq!(decoded.geometry, Geometry::point(1.0, 2.0));
        assert_eq!(decoded.srid, Srid::new(4326));
    }

    #[test]
    fn wkb_inserts_into_3d_columns_pad_z() {
        let value = GeometryValue::unknown(Geometry::Point(Coord::xyz(1.0, 2.0, 3.0)));
        let codec = GeometryCodec::new(WireFormat::Wkb);

        let Expr::Func(func) =
            insert_expr(Some(&value), &point_column(3), codec, &Capability::SQLITE).unwrap()
        else {
            panic!("expected a function call");
        };
        assert_eq!(func.name, "ST_Force3D");

        let Expr::Func(inner) = &func.args[0] else {
            panic!("expected a function call");
        };
        assert_eq!(inner.name, "ST_GeomFromWKB");

        // Formats that keep Z write the value as is
        let codec = GeometryCodec::new(WireFormat::Wkt);
        let Expr::Func(func) =
            insert_expr(Some(&value), &point_column(3), codec, &Capability::SQLITE).unwrap()
        else {
            panic!("expected a function call");
        };
        assert_eq!(func.name, "ST_GeomFromText");
    }

    #[test]
    fn null_inserts_stay_typed() {
        let codec = GeometryCodec::new(WireFormat::Wkt);
        let expr = insert_expr(None, &point_column(2), codec, &Capability::POSTGIS).unwrap();
        assert_eq!(
            expr,
            Expr::func(
                "ST_GeomFromText",
                [
                    Expr::typed_value(Value::Null, geostore_core::Type::String),
                    Expr::literal(4326)
                ]
            )
        );
    }

    #[test]
    fn foreign_srids_need_transform() {
        let value = GeometryValue::new(Geometry::point(1.0, 2.0), Srid::new(3857));
        let codec = GeometryCodec::new(WireFormat::Ewkb);

        let err = insert_expr(Some(&value), &point_column(2), codec, &Capability::SQLITE)
            .unwrap_err();
        assert!(err.is_validation());

        let expr = insert_expr(Some(&value), &point_column(2), codec, &Capability::POSTGIS).unwrap();
        let Expr::Func(func) = expr else {
            panic!("expected a function call");
        };
        assert_eq!(func.name, "ST_Transform");
    }
}
