/// The declared type of a geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    /// Any geometry.
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    /// The upper case name used by geometry catalogs and constraints.
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Geometry => "GEOMETRY",
            GeometryKind::Point => "POINT",
            GeometryKind::LineString => "LINESTRING",
            GeometryKind::Polygon => "POLYGON",
            GeometryKind::MultiPoint => "MULTIPOINT",
            GeometryKind::MultiLineString => "MULTILINESTRING",
            GeometryKind::MultiPolygon => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Parses a catalog type name.
    ///
    /// Accepts any case, the `ST_` prefix some functions report, and the
    /// measured and 3D spellings such as `POINTM` or `POINTZ`, which map to
    /// the plain kind.
    pub fn from_name(name: &str) -> Option<GeometryKind> {
        let upper = name.trim().to_ascii_uppercase();
        let upper = upper.strip_prefix("ST_").unwrap_or(&upper);

        let kind = match upper {
            "GEOMETRY" => GeometryKind::Geometry,
            "POINT" => GeometryKind::Point,
            "LINESTRING" => GeometryKind::LineString,
            "POLYGON" => GeometryKind::Polygon,
            "MULTIPOINT" => GeometryKind::MultiPoint,
            "MULTILINESTRING" => GeometryKind::MultiLineString,
            "MULTIPOLYGON" => GeometryKind::MultiPolygon,
            "GEOMETRYCOLLECTION" => GeometryKind::GeometryCollection,
            other => {
                let plain = other
                    .strip_suffix('M')
                    .or_else(|| other.strip_suffix('Z'))?;
                return GeometryKind::from_name(plain);
            }
        };

        Some(kind)
    }

    /// WKB type code.
    pub(crate) fn code(self) -> u32 {
        match self {
            GeometryKind::Geometry => 0,
            GeometryKind::Point => 1,
            GeometryKind::LineString => 2,
            GeometryKind::Polygon => 3,
            GeometryKind::MultiPoint => 4,
            GeometryKind::MultiLineString => 5,
            GeometryKind::MultiPolygon => 6,
            GeometryKind::GeometryCollection => 7,
        }
    }

    /// Returns `true` if a geometry of kind `other` may be stored in a column
    /// declared as `self`.
    pub fn accepts(self, other: GeometryKind) -> bool {
        self == GeometryKind::Geometry || self == other
    }
}

impl core::fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_catalog_names() {
        assert_eq!(GeometryKind::from_name("point"), Some(GeometryKind::Point));
        assert_eq!(GeometryKind::from_name("ST_Polygon"), Some(GeometryKind::Polygon));
        assert_eq!(
            GeometryKind::from_name("MULTILINESTRINGM"),
            Some(GeometryKind::MultiLineString)
        );
        assert_eq!(GeometryKind::from_name("raster"), None);
    }
}
