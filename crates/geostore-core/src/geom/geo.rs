use super::{Coord, Geometry};

fn coord_from(c: geo_types::Coord<f64>) -> Coord {
    Coord::xy(c.x, c.y)
}

fn coord_into(c: &Coord) -> geo_types::Coord<f64> {
    geo_types::Coord { x: c.x, y: c.y }
}

fn line_from(line: geo_types::LineString<f64>) -> Vec<Coord> {
    line.0.into_iter().map(coord_from).collect()
}

fn line_into(line: &[Coord]) -> geo_types::LineString<f64> {
    geo_types::LineString(line.iter().map(coord_into).collect())
}

fn polygon_from(polygon: geo_types::Polygon<f64>) -> Vec<Vec<Coord>> {
    let (exterior, interiors) = polygon.into_inner();
    std::iter::once(exterior)
        .chain(interiors)
        .map(line_from)
        .collect()
}

fn polygon_into(rings: &[Vec<Coord>]) -> geo_types::Polygon<f64> {
    match rings.split_first() {
        Some((shell, holes)) => {
            geo_types::Polygon::new(line_into(shell), holes.iter().map(|h| line_into(h)).collect())
        }
        None => geo_types::Polygon::new(geo_types::LineString(vec![]), vec![]),
    }
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(value: geo_types::Geometry<f64>) -> Geometry {
        use geo_types::Geometry as G;

        match value {
            G::Point(p) => Geometry::Point(coord_from(p.0)),
            G::Line(l) => Geometry::LineString(vec![coord_from(l.start), coord_from(l.end)]),
            G::LineString(l) => Geometry::LineString(line_from(l)),
            G::Polygon(p) => Geometry::Polygon(polygon_from(p)),
            G::MultiPoint(mp) => Geometry::MultiPoint(mp.0.into_iter().map(|p| coord_from(p.0)).collect()),
            G::MultiLineString(ml) => {
                Geometry::MultiLineString(ml.0.into_iter().map(line_from).collect())
            }
            G::MultiPolygon(mp) => Geometry::MultiPolygon(mp.0.into_iter().map(polygon_from).collect()),
            G::GeometryCollection(gc) => {
                Geometry::GeometryCollection(gc.0.into_iter().map(Geometry::from).collect())
            }
            G::Rect(r) => Geometry::Polygon(polygon_from(r.to_polygon())),
            G::Triangle(t) => Geometry::Polygon(polygon_from(t.to_polygon())),
        }
    }
}

/// Converts to `geo-types`, dropping Z.
impl From<&Geometry> for geo_types::Geometry<f64> {
    fn from(value: &Geometry) -> geo_types::Geometry<f64> {
        use geo_types::Geometry as G;

        match value {
            Geometry::Point(c) => G::Point(geo_types::Point(coord_into(c))),
            Geometry::LineString(cs) => G::LineString(line_into(cs)),
            Geometry::Polygon(rings) => G::Polygon(polygon_into(rings)),
            Geometry::MultiPoint(cs) => G::MultiPoint(geo_types::MultiPoint(
                cs.iter().map(|c| geo_types::Point(coord_into(c))).collect(),
            )),
            Geometry::MultiLineString(lines) => G::MultiLineString(geo_types::MultiLineString(
                lines.iter().map(|l| line_into(l)).collect(),
            )),
            Geometry::MultiPolygon(polygons) => G::MultiPolygon(geo_types::MultiPolygon(
                polygons.iter().map(|p| polygon_into(p)).collect(),
            )),
            Geometry::GeometryCollection(geometries) => G::GeometryCollection(
                geo_types::GeometryCollection(geometries.iter().map(Into::into).collect()),
            ),
        }
    }
}
