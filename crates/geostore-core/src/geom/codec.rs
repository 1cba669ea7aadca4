use super::{wkb, wkt, Geometry, GeometryValue, Srid};
use crate::{Error, Result, Type, Value};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;

/// How geometries travel between geostore and the store.
///
/// Every format can be read; the configured one is used for writing and for
/// the column expressions of queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Well-known text. Keeps Z, loses the SRID.
    #[serde(alias = "text")]
    Wkt,

    /// Well-known binary. Two dimensional only, loses the SRID.
    #[serde(alias = "binary")]
    Wkb,

    /// Extended well-known binary. Keeps Z and the SRID.
    #[default]
    #[serde(alias = "binary-with-srid")]
    Ewkb,
}

impl WireFormat {
    /// The value type geometries take on the wire.
    pub fn value_type(self) -> Type {
        match self {
            WireFormat::Wkt => Type::String,
            WireFormat::Wkb | WireFormat::Ewkb => Type::Bytes,
        }
    }

    /// Returns `true` if three dimensional coordinates survive the encoding.
    pub fn keeps_z(self) -> bool {
        !matches!(self, WireFormat::Wkb)
    }
}

impl std::str::FromStr for WireFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<WireFormat> {
        match s.to_ascii_lowercase().as_str() {
            "wkt" | "text" => Ok(WireFormat::Wkt),
            "wkb" | "binary" => Ok(WireFormat::Wkb),
            "ewkb" | "binary-with-srid" => Ok(WireFormat::Ewkb),
            other => Err(Error::validation(format!("unknown wire format `{other}`"))),
        }
    }
}

/// Converts geometry values to and from their wire representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryCodec {
    format: WireFormat,
}

impl GeometryCodec {
    pub fn new(format: WireFormat) -> GeometryCodec {
        GeometryCodec { format }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Encodes a geometry with the configured format.
    ///
    /// Writing a three dimensional geometry as WKB drops Z.
    pub fn encode(&self, value: &GeometryValue) -> Value {
        match self.format {
            WireFormat::Wkt => Value::String(wkt::write(&value.geometry)),
            WireFormat::Wkb => Value::Bytes(wkb::write_wkb(&value.geometry)),
            WireFormat::Ewkb => Value::Bytes(wkb::write_ewkb(&value.geometry, value.srid)),
        }
    }

    /// Decodes a wire value read from a geometry column.
    ///
    /// `Null` and empty points decode to `None`. Binary input is read as (E)WKB; text input is
    /// accepted as hex or base64 encoded WKB, or as WKT. An SRID embedded in
    /// the input wins over `column_srid`.
    pub fn decode(&self, value: &Value, column_srid: Srid) -> Result<Option<GeometryValue>> {
        let decoded = match value {
            Value::Null => return Ok(None),
            Value::Geometry(value) => return Ok(Some(value.clone())),
            Value::Bytes(bytes) => wkb::read(bytes)?,
            Value::String(text) => decode_text(text)?,
            other => {
                return Err(Error::codec(format!(
                    "expected a geometry, found {other:?}"
                )))
            }
        };

        let Some((geometry, srid)) = decoded else {
            return Ok(None);
        };

        let srid = srid.unwrap_or(Srid::UNKNOWN).or(column_srid);
        Ok(Some(GeometryValue::new(geometry, srid)))
    }

    /// Encodes a geometry as hex WKB or EWKB, for text-only transports.
    pub fn to_hex(&self, value: &GeometryValue) -> String {
        hex::encode_upper(self.binary(value))
    }

    /// Encodes a geometry as base64 WKB or EWKB, for text-only transports.
    pub fn to_base64(&self, value: &GeometryValue) -> String {
        STANDARD.encode(self.binary(value))
    }

    fn binary(&self, value: &GeometryValue) -> Vec<u8> {
        match self.format {
            WireFormat::Wkb => wkb::write_wkb(&value.geometry),
            WireFormat::Wkt | WireFormat::Ewkb => wkb::write_ewkb(&value.geometry, value.srid),
        }
    }
}

fn decode_text(text: &str) -> Result<Option<(Geometry, Option<Srid>)>> {
    let text = text.trim();

    if text.len() % 2 == 0 && !text.is_empty() && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bytes = hex::decode(text).map_err(|e| Error::codec(e.to_string()))?;
        return wkb::read(&bytes);
    }

    match wkt::parse(text) {
        Ok(parsed) => Ok(parsed),
        Err(err) => match STANDARD.decode(text) {
            Ok(bytes) => wkb::read(&bytes),
            Err(_) => Err(err),
        },
    }
}
