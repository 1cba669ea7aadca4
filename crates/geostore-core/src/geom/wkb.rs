//! Well-known binary and its extended (SRID carrying) variant.
//!
//! Plain WKB is written two dimensional. EWKB keeps Z and embeds the SRID in
//! the outermost header. The reader accepts little and big endian input, the
//! EWKB flag bits, and ISO style dimension offsets (1000, 2000, 3000).

use super::{Coord, Geometry, GeometryKind, Srid};
use crate::{Error, Result};

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;

/// Writes plain WKB. Z values are dropped.
pub(crate) fn write_wkb(geometry: &Geometry) -> Vec<u8> {
    let mut out = Vec::new();
    write_geometry(&mut out, geometry, false, None);
    out
}

/// Writes EWKB, embedding `srid` when it is known.
pub(crate) fn write_ewkb(geometry: &Geometry, srid: Srid) -> Vec<u8> {
    let mut out = Vec::new();
    write_geometry(&mut out, geometry, geometry.has_z(), srid.known());
    out
}

fn write_geometry(out: &mut Vec<u8>, geometry: &Geometry, z: bool, srid: Option<i32>) {
    // Little endian
    out.push(1);

    let mut code = geometry.kind().code();
    if z {
        code |= EWKB_Z;
    }
    if srid.is_some() {
        code |= EWKB_SRID;
    }
    out.extend_from_slice(&code.to_le_bytes());
    if let Some(srid) = srid {
        out.extend_from_slice(&srid.to_le_bytes());
    }

    match geometry {
        Geometry::Point(c) => write_coord(out, c, z),
        Geometry::LineString(cs) => write_coords(out, cs, z),
        Geometry::Polygon(rings) => write_rings(out, rings, z),
        Geometry::MultiPoint(cs) => {
            write_len(out, cs.len());
            for c in cs {
                write_geometry(out, &Geometry::Point(*c), z, None);
            }
        }
        Geometry::MultiLineString(lines) => {
            write_len(out, lines.len());
            for line in lines {
                out.push(1);
                out.extend_from_slice(&(GeometryKind::LineString.code() | z_flag(z)).to_le_bytes());
                write_coords(out, line, z);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_len(out, polygons.len());
            for rings in polygons {
                out.push(1);
                out.extend_from_slice(&(GeometryKind::Polygon.code() | z_flag(z)).to_le_bytes());
                write_rings(out, rings, z);
            }
        }
        Geometry::GeometryCollection(geometries) => {
            write_len(out, geometries.len());
            for geometry in geometries {
                write_geometry(out, geometry, z, None);
            }
        }
    }
}

fn z_flag(z: bool) -> u32 {
    if z {
        EWKB_Z
    } else {
        0
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u32).to_le_bytes());
}

fn write_rings(out: &mut Vec<u8>, rings: &[Vec<Coord>], z: bool) {
    write_len(out, rings.len());
    for ring in rings {
        write_coords(out, ring, z);
    }
}

fn write_coords(out: &mut Vec<u8>, coords: &[Coord], z: bool) {
    write_len(out, coords.len());
    for c in coords {
        write_coord(out, c, z);
    }
}

fn write_coord(out: &mut Vec<u8>, c: &Coord, z: bool) {
    out.extend_from_slice(&c.x.to_le_bytes());
    out.extend_from_slice(&c.y.to_le_bytes());
    if z {
        out.extend_from_slice(&c.z.unwrap_or(0.0).to_le_bytes());
    }
}

/// Reads WKB or EWKB, returning the embedded SRID if present.
///
/// An empty point, written as NaN ordinates, reads as `None`.
pub(crate) fn read(bytes: &[u8]) -> Result<Option<(Geometry, Option<Srid>)>> {
    let mut reader = Reader { bytes, pos: 0 };
    let (geometry, srid) = reader.geometry()?;
    if reader.pos != bytes.len() {
        return Err(Error::codec(format!(
            "{} trailing bytes after WKB geometry",
            bytes.len() - reader.pos
        )));
    }
    Ok(geometry.map(|geometry| (geometry, srid)))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

struct Header {
    little_endian: bool,
    kind: u32,
    z: bool,
    m: bool,
    srid: Option<Srid>,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let Some(slice) = self.bytes.get(self.pos..end) else {
            return Err(Error::codec("unexpected end of WKB input"));
        };
        self.pos = end;
        let mut buf = [0; N];
        buf.copy_from_slice(slice);
        Ok(buf)
    }

    fn u32(&mut self, little_endian: bool) -> Result<u32> {
        let buf = self.take::<4>()?;
        Ok(if little_endian {
            u32::from_le_bytes(buf)
        } else {
            u32::from_be_bytes(buf)
        })
    }

    fn f64(&mut self, little_endian: bool) -> Result<f64> {
        let buf = self.take::<8>()?;
        Ok(if little_endian {
            f64::from_le_bytes(buf)
        } else {
            f64::from_be_bytes(buf)
        })
    }

    fn header(&mut self) -> Result<Header> {
        let [order] = self.take::<1>()?;
        let little_endian = match order {
            0 => false,
            1 => true,
            other => return Err(Error::codec(format!("invalid WKB byte order {other}"))),
        };

        let raw = self.u32(little_endian)?;
        let mut z = raw & EWKB_Z != 0;
        let mut m = raw & EWKB_M != 0;
        let srid = if raw & EWKB_SRID != 0 {
            Some(Srid::new(self.u32(little_endian)? as i32))
        } else {
            None
        };

        let mut kind = raw & 0x0FFF_FFFF;
        match kind / 1000 {
            0 => {}
            1 => z = true,
            2 => m = true,
            3 => {
                z = true;
                m = true;
            }
            _ => return Err(Error::codec(format!("unknown WKB geometry type {raw:#x}"))),
        }
        kind %= 1000;

        Ok(Header {
            little_endian,
            kind,
            z,
            m,
            srid,
        })
    }

    fn geometry(&mut self) -> Result<(Option<Geometry>, Option<Srid>)> {
        let header = self.header()?;
        let le = header.little_endian;

        let geometry = match header.kind {
            1 => {
                let c = self.coord(&header)?;
                if c.x.is_nan() && c.y.is_nan() {
                    return Ok((None, header.srid));
                }
                Geometry::Point(c)
            }
            2 => Geometry::LineString(self.coords(&header)?),
            3 => Geometry::Polygon(self.rings(&header)?),
            4 => {
                let n = self.u32(le)?;
                let mut coords = Vec::with_capacity(self.capacity(n));
                for _ in 0..n {
                    match self.geometry()?.0 {
                        Some(Geometry::Point(c)) => coords.push(c),
                        None => {}
                        _ => return Err(Error::codec("MULTIPOINT member is not a point")),
                    }
                }
                Geometry::MultiPoint(coords)
            }
            5 => {
                let n = self.u32(le)?;
                let mut lines = Vec::with_capacity(self.capacity(n));
                for _ in 0..n {
                    match self.geometry()?.0 {
                        Some(Geometry::LineString(cs)) => lines.push(cs),
                        _ => {
                            return Err(Error::codec(
                                "MULTILINESTRING member is not a line string",
                            ))
                        }
                    }
                }
                Geometry::MultiLineString(lines)
            }
            6 => {
                let n = self.u32(le)?;
                let mut polygons = Vec::with_capacity(self.capacity(n));
                for _ in 0..n {
                    match self.geometry()?.0 {
                        Some(Geometry::Polygon(rings)) => polygons.push(rings),
                        _ => return Err(Error::codec("MULTIPOLYGON member is not a polygon")),
                    }
                }
                Geometry::MultiPolygon(polygons)
            }
            7 => {
                let n = self.u32(le)?;
                let mut geometries = Vec::with_capacity(self.capacity(n));
                for _ in 0..n {
                    geometries.extend(self.geometry()?.0);
                }
                Geometry::GeometryCollection(geometries)
            }
            other => return Err(Error::codec(format!("unsupported WKB geometry type {other}"))),
        };

        Ok((Some(geometry), header.srid))
    }

    /// Caps preallocation so a corrupt count cannot exhaust memory.
    fn capacity(&self, n: u32) -> usize {
        (n as usize).min(self.bytes.len() - self.pos)
    }

    fn rings(&mut self, header: &Header) -> Result<Vec<Vec<Coord>>> {
        let n = self.u32(header.little_endian)?;
        let mut rings = Vec::with_capacity(self.capacity(n));
        for _ in 0..n {
            rings.push(self.coords(header)?);
        }
        Ok(rings)
    }

    fn coords(&mut self, header: &Header) -> Result<Vec<Coord>> {
        let n = self.u32(header.little_endian)?;
        let mut coords = Vec::with_capacity(self.capacity(n));
        for _ in 0..n {
            coords.push(self.coord(header)?);
        }
        Ok(coords)
    }

    fn coord(&mut self, header: &Header) -> Result<Coord> {
        let le = header.little_endian;
        let x = self.f64(le)?;
        let y = self.f64(le)?;
        let z = if header.z { Some(self.f64(le)?) } else { None };
        if header.m {
            self.f64(le)?;
        }
        Ok(Coord { x, y, z })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bytes: &[u8]) -> Result<(Geometry, Option<Srid>)> {
        super::read(bytes).map(|read| read.expect("non-empty geometry"))
    }

    #[test]
    fn wkb_point_layout() {
        let bytes = write_wkb(&Geometry::point(1.0, 2.0));
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..5], &1u32.to_le_bytes());
        assert_eq!(read(&bytes).unwrap(), (Geometry::point(1.0, 2.0), None));
    }

    #[test]
    fn ewkb_carries_srid_and_z() {
        let geom = Geometry::LineString(vec![Coord::xyz(0.0, 0.0, 1.0), Coord::xyz(2.0, 2.0, 3.0)]);
        let bytes = write_ewkb(&geom, Srid::new(3857));
        let (decoded, srid) = read(&bytes).unwrap();
        assert_eq!(decoded, geom);
        assert_eq!(srid, Some(Srid::new(3857)));
    }

    #[test]
    fn wkb_truncates_to_2d() {
        let geom = Geometry::Point(Coord::xyz(1.0, 2.0, 3.0));
        let (decoded, _) = read(&write_wkb(&geom)).unwrap();
        assert_eq!(decoded, Geometry::point(1.0, 2.0));
    }

    #[test]
    fn reads_big_endian_iso_z() {
        let mut bytes = vec![0];
        bytes.extend_from_slice(&1001u32.to_be_bytes());
        for v in [1.0f64, 2.0, 3.0] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let (decoded, srid) = read(&bytes).unwrap();
        assert_eq!(decoded, Geometry::Point(Coord::xyz(1.0, 2.0, 3.0)));
        assert_eq!(srid, None);
    }

    #[test]
    fn truncated_input_is_a_codec_error() {
        let bytes = write_wkb(&Geometry::point(1.0, 2.0));
        assert!(read(&bytes[..10]).unwrap_err().is_codec());
    }

    #[test]
    fn collection_round_trip() {
        let geom = Geometry::GeometryCollection(vec![
            Geometry::point(1.0, 1.0),
            Geometry::MultiPolygon(vec![vec![vec![
                Coord::xy(0.0, 0.0),
                Coord::xy(1.0, 0.0),
                Coord::xy(1.0, 1.0),
                Coord::xy(0.0, 0.0),
            ]]]),
        ]);
        assert_eq!(read(&write_ewkb(&geom, Srid::UNKNOWN)).unwrap().0, geom);
    }

    #[test]
    fn empty_points_read_as_nothing() {
        let empty = hex::decode("0101000000000000000000F87F000000000000F87F").unwrap();
        assert_eq!(super::read(&empty).unwrap(), None);

        // MULTIPOINT(EMPTY, 1 2)
        let mut bytes = vec![1];
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&empty);
        bytes.extend_from_slice(&write_wkb(&Geometry::point(1.0, 2.0)));
        assert_eq!(
            read(&bytes).unwrap().0,
            Geometry::MultiPoint(vec![Coord::xy(1.0, 2.0)])
        );
    }
}
