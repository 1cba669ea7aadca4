//! In-memory geometry model.
//!
//! Geometries are plain coordinate trees. Every stored geometry travels with
//! its spatial reference identifier as a [`GeometryValue`]; the wire encodings
//! live in [`codec`].

pub mod algorithm;

pub mod codec;
pub use codec::{GeometryCodec, WireFormat};

mod envelope;
pub use envelope::{BoundingBox, Envelope};

mod kind;
pub use kind::GeometryKind;

mod srid;
pub use srid::Srid;

pub(crate) mod wkb;
pub(crate) mod wkt;

#[cfg(feature = "geo-types")]
mod geo;

/// A single position. `z` is present on three dimensional geometries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// Rings of a polygon. The first ring is the shell, the rest are holes.
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Geometry>),
}

/// A geometry tagged with its spatial reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryValue {
    pub geometry: Geometry,
    pub srid: Srid,
}

impl Coord {
    pub fn xy(x: f64, y: f64) -> Coord {
        Coord { x, y, z: None }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Coord {
        Coord { x, y, z: Some(z) }
    }

    pub fn to_2d(self) -> Coord {
        Coord { z: None, ..self }
    }

    pub fn to_3d(self) -> Coord {
        Coord {
            z: Some(self.z.unwrap_or(0.0)),
            ..self
        }
    }
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Geometry {
        Geometry::Point(Coord::xy(x, y))
    }

    pub fn line_string(coords: impl IntoIterator<Item = (f64, f64)>) -> Geometry {
        Geometry::LineString(coords.into_iter().map(|(x, y)| Coord::xy(x, y)).collect())
    }

    /// Builds a polygon from a single shell. The ring is closed if needed.
    pub fn polygon(shell: impl IntoIterator<Item = (f64, f64)>) -> Geometry {
        let mut ring: Vec<Coord> = shell.into_iter().map(|(x, y)| Coord::xy(x, y)).collect();
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        Geometry::Polygon(vec![ring])
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Visits every coordinate of the geometry.
    pub fn for_each_coord(&self, f: &mut impl FnMut(&Coord)) {
        match self {
            Geometry::Point(c) => f(c),
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => cs.iter().for_each(f),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().for_each(f)
            }
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().for_each(f),
            Geometry::GeometryCollection(geoms) => {
                for geom in geoms {
                    geom.for_each_coord(f);
                }
            }
        }
    }

    fn map_coords(&self, f: &impl Fn(Coord) -> Coord) -> Geometry {
        let line = |cs: &Vec<Coord>| cs.iter().copied().map(f).collect::<Vec<_>>();
        let rings = |rs: &Vec<Vec<Coord>>| rs.iter().map(line).collect::<Vec<_>>();

        match self {
            Geometry::Point(c) => Geometry::Point(f(*c)),
            Geometry::LineString(cs) => Geometry::LineString(line(cs)),
            Geometry::MultiPoint(cs) => Geometry::MultiPoint(line(cs)),
            Geometry::Polygon(rs) => Geometry::Polygon(rings(rs)),
            Geometry::MultiLineString(rs) => Geometry::MultiLineString(rings(rs)),
            Geometry::MultiPolygon(ps) => Geometry::MultiPolygon(ps.iter().map(rings).collect()),
            Geometry::GeometryCollection(gs) => {
                Geometry::GeometryCollection(gs.iter().map(|g| g.map_coords(f)).collect())
            }
        }
    }

    /// Returns `true` if any coordinate carries a Z value.
    pub fn has_z(&self) -> bool {
        let mut z = false;
        self.for_each_coord(&mut |c| z |= c.z.is_some());
        z
    }

    /// Number of dimensions of the coordinates, 2 or 3.
    pub fn dimension(&self) -> u8 {
        if self.has_z() {
            3
        } else {
            2
        }
    }

    /// Drops Z values, projecting the geometry onto the XY plane.
    pub fn to_2d(&self) -> Geometry {
        self.map_coords(&Coord::to_2d)
    }

    /// Gives every coordinate a Z value, 0 where it had none.
    pub fn to_3d(&self) -> Geometry {
        self.map_coords(&Coord::to_3d)
    }

    pub fn is_empty(&self) -> bool {
        let mut empty = true;
        self.for_each_coord(&mut |_| empty = false);
        empty
    }

    /// The bounding envelope, or `None` for an empty geometry.
    pub fn envelope(&self) -> Option<Envelope> {
        let mut envelope: Option<Envelope> = None;
        self.for_each_coord(&mut |c| {
            envelope
                .get_or_insert(Envelope::new(c.x, c.y, c.x, c.y))
                .expand_to_include_point(c.x, c.y);
        });
        envelope
    }
}

impl GeometryValue {
    pub fn new(geometry: Geometry, srid: Srid) -> GeometryValue {
        GeometryValue { geometry, srid }
    }

    /// A geometry with no known spatial reference system.
    pub fn unknown(geometry: Geometry) -> GeometryValue {
        GeometryValue::new(geometry, Srid::UNKNOWN)
    }

    pub fn dimension(&self) -> u8 {
        self.geometry.dimension()
    }

    pub fn to_2d(&self) -> GeometryValue {
        GeometryValue::new(self.geometry.to_2d(), self.srid)
    }

    pub fn to_3d(&self) -> GeometryValue {
        GeometryValue::new(self.geometry.to_3d(), self.srid)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.geometry
            .envelope()
            .map(|envelope| BoundingBox::new(envelope, self.srid))
    }
}
