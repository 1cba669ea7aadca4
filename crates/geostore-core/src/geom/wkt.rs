//! Well-known text.
//!
//! Writes the ISO spelling (`POINT Z (1 2 3)`) and reads both ISO and the
//! older untagged three-coordinate form, plus an optional `SRID=n;` prefix.

use super::{Coord, Geometry, GeometryKind, Srid};
use crate::{Error, Result};

use std::fmt::Write;

pub(crate) fn write(geometry: &Geometry) -> String {
    let mut out = String::new();
    let z = geometry.has_z();
    write_geometry(&mut out, geometry, z);
    out
}

fn write_geometry(out: &mut String, geometry: &Geometry, z: bool) {
    out.push_str(geometry.kind().name());
    if z {
        out.push_str(" Z ");
    }

    if geometry.is_empty() {
        if !z {
            out.push(' ');
        }
        out.push_str("EMPTY");
        return;
    }

    match geometry {
        Geometry::Point(c) => {
            out.push('(');
            write_coord(out, c, z);
            out.push(')');
        }
        Geometry::LineString(cs) => write_coords(out, cs, z),
        Geometry::MultiPoint(cs) => {
            out.push('(');
            for (i, c) in cs.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('(');
                write_coord(out, c, z);
                out.push(')');
            }
            out.push(')');
        }
        Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => write_rings(out, rings, z),
        Geometry::MultiPolygon(polygons) => {
            out.push('(');
            for (i, rings) in polygons.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_rings(out, rings, z);
            }
            out.push(')');
        }
        Geometry::GeometryCollection(geometries) => {
            out.push('(');
            for (i, geometry) in geometries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_geometry(out, geometry, z);
            }
            out.push(')');
        }
    }
}

fn write_rings(out: &mut String, rings: &[Vec<Coord>], z: bool) {
    out.push('(');
    for (i, ring) in rings.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_coords(out, ring, z);
    }
    out.push(')');
}

fn write_coords(out: &mut String, coords: &[Coord], z: bool) {
    out.push('(');
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_coord(out, c, z);
    }
    out.push(')');
}

fn write_coord(out: &mut String, c: &Coord, z: bool) {
    // Writing to a String cannot fail
    let _ = write!(out, "{} {}", c.x, c.y);
    if z {
        let _ = write!(out, " {}", c.z.unwrap_or(0.0));
    }
}

/// Parses well-known text, returning the SRID when the text carries one.
///
/// `POINT EMPTY` has no coordinate to hold and parses to `None`.
pub(crate) fn parse(text: &str) -> Result<Option<(Geometry, Option<Srid>)>> {
    let mut parser = Parser { src: text, pos: 0 };

    let srid = parser.srid_prefix()?;
    let geometry = parser.geometry()?;

    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(parser.error("trailing characters"));
    }

    Ok(geometry.map(|geometry| (geometry, srid)))
}

#[derive(Clone, Copy)]
enum Dims {
    /// Decided by the number of ordinates in each coordinate.
    Inferred,
    Z,
    M,
    Zm,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::codec(format!("malformed WKT at offset {}: {message}", self.pos))
    }

    fn rest(&self) -> &str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn expect(&mut self, ch: char) -> Result<()> {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected `{ch}`")))
        }
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> &str {
        self.skip_ws();
        let start = self.pos;
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(self.rest().len());
        self.pos += len;
        &self.src[start..self.pos]
    }

    fn srid_prefix(&mut self) -> Result<Option<Srid>> {
        self.skip_ws();
        let rest = self.rest();
        if rest.len() < 5 || !rest[..5].eq_ignore_ascii_case("SRID=") {
            return Ok(None);
        }

        let Some(end) = rest.find(';') else {
            return Err(self.error("unterminated SRID prefix"));
        };

        let code: i32 = rest[5..end]
            .trim()
            .parse()
            .map_err(|_| self.error("invalid SRID"))?;
        self.pos += end + 1;
        Ok(Some(Srid::new(code)))
    }

    fn geometry(&mut self) -> Result<Option<Geometry>> {
        let word = self.word().to_ascii_uppercase();
        if word.is_empty() {
            return Err(self.error("expected a geometry type"));
        }

        let (kind, mut dims) = split_dims(&word).ok_or_else(|| self.error("unknown geometry type"))?;

        if matches!(dims, Dims::Inferred) {
            let save = self.pos;
            match self.word().to_ascii_uppercase().as_str() {
                "Z" => dims = Dims::Z,
                "M" => dims = Dims::M,
                "ZM" => dims = Dims::Zm,
                _ => self.pos = save,
            }
        }

        let save = self.pos;
        if self.word().eq_ignore_ascii_case("EMPTY") {
            return Ok(Some(match kind {
                GeometryKind::Point => return Ok(None),
                GeometryKind::LineString => Geometry::LineString(vec![]),
                GeometryKind::Polygon => Geometry::Polygon(vec![]),
                GeometryKind::MultiPoint => Geometry::MultiPoint(vec![]),
                GeometryKind::MultiLineString => Geometry::MultiLineString(vec![]),
                GeometryKind::MultiPolygon => Geometry::MultiPolygon(vec![]),
                GeometryKind::GeometryCollection | GeometryKind::Geometry => {
                    Geometry::GeometryCollection(vec![])
                }
            }));
        }
        self.pos = save;

        Ok(Some(match kind {
            GeometryKind::Point => {
                self.expect('(')?;
                let c = self.coord(dims)?;
                self.expect(')')?;
                Geometry::Point(c)
            }
            GeometryKind::LineString => Geometry::LineString(self.coords(dims)?),
            GeometryKind::Polygon => Geometry::Polygon(self.rings(dims)?),
            GeometryKind::MultiPoint => Geometry::MultiPoint(self.multi_point(dims)?),
            GeometryKind::MultiLineString => Geometry::MultiLineString(self.rings(dims)?),
            GeometryKind::MultiPolygon => {
                let mut polygons = vec![];
                self.expect('(')?;
                loop {
                    polygons.push(self.rings(dims)?);
                    if !self.eat(',') {
                        break;
                    }
                }
                self.expect(')')?;
                Geometry::MultiPolygon(polygons)
            }
            GeometryKind::GeometryCollection => {
                let mut geometries = vec![];
                self.expect('(')?;
                loop {
                    geometries.extend(self.geometry()?);
                    if !self.eat(',') {
                        break;
                    }
                }
                self.expect(')')?;
                Geometry::GeometryCollection(geometries)
            }
            GeometryKind::Geometry => return Err(self.error("GEOMETRY is not a concrete type")),
        }))
    }

    fn multi_point(&mut self, dims: Dims) -> Result<Vec<Coord>> {
        let mut coords = vec![];
        self.expect('(')?;
        loop {
            // Both `MULTIPOINT(1 2,3 4)` and `MULTIPOINT((1 2),(3 4))` are in use
            if self.eat('(') {
                coords.push(self.coord(dims)?);
                self.expect(')')?;
            } else {
                coords.push(self.coord(dims)?);
            }
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(coords)
    }

    fn rings(&mut self, dims: Dims) -> Result<Vec<Vec<Coord>>> {
        let mut rings = vec![];
        self.expect('(')?;
        loop {
            rings.push(self.coords(dims)?);
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(rings)
    }

    fn coords(&mut self, dims: Dims) -> Result<Vec<Coord>> {
        let mut coords = vec![];
        self.expect('(')?;
        loop {
            coords.push(self.coord(dims)?);
            if !self.eat(',') {
                break;
            }
        }
        self.expect(')')?;
        Ok(coords)
    }

    fn coord(&mut self, dims: Dims) -> Result<Coord> {
        let mut ordinates = [0.0; 4];
        let mut n = 0;
        while n < 4 {
            match self.peek() {
                Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => {
                    ordinates[n] = self.number()?;
                    n += 1;
                }
                _ => break,
            }
        }

        let [x, y, third, _] = ordinates;
        let z = match (dims, n) {
            (Dims::Inferred, 2) | (Dims::M, 3) => None,
            (Dims::Inferred, 3) | (Dims::Inferred, 4) | (Dims::Z, 3) | (Dims::Zm, 4) => Some(third),
            _ => return Err(self.error("wrong number of ordinates")),
        };

        Ok(Coord { x, y, z })
    }

    fn number(&mut self) -> Result<f64> {
        self.skip_ws();
        let len = self
            .rest()
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
            .unwrap_or(self.rest().len());
        let token = &self.rest()[..len];
        let value = token.parse().map_err(|_| self.error("invalid number"))?;
        self.pos += len;
        Ok(value)
    }
}

/// Splits a type word such as `POINTZ` into its kind and dimension suffix.
fn split_dims(word: &str) -> Option<(GeometryKind, Dims)> {
    let kind = |name: &str| match name {
        "POINT" => Some(GeometryKind::Point),
        "LINESTRING" => Some(GeometryKind::LineString),
        "POLYGON" => Some(GeometryKind::Polygon),
        "MULTIPOINT" => Some(GeometryKind::MultiPoint),
        "MULTILINESTRING" => Some(GeometryKind::MultiLineString),
        "MULTIPOLYGON" => Some(GeometryKind::MultiPolygon),
        "GEOMETRYCOLLECTION" => Some(GeometryKind::GeometryCollection),
        _ => None,
    };

    if let Some(kind) = kind(word) {
        return Some((kind, Dims::Inferred));
    }

    for (suffix, dims) in [("ZM", Dims::Zm), ("Z", Dims::Z), ("M", Dims::M)] {
        if let Some(kind) = word.strip_suffix(suffix).and_then(kind) {
            return Some((kind, dims));
        }
    }

    None
}
