use super::Expr;

use geostore_core::{
    driver::Capability,
    geom::{GeometryKind, Srid},
    schema::AttributeDescriptor,
    Type,
};

#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,

    pub ty: ColumnType,

    pub nullable: bool,

    pub default: Option<Expr>,

    /// Declares a single column primary key inline.
    pub primary_key: bool,
}

/// Column storage types as declared in DDL.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Varchar(u32),
    Text,
    Binary,

    /// Store generated integer key.
    Serial,

    Geometry {
        kind: GeometryKind,
        srid: Srid,
        dimension: u8,
    },
}

/// Length given to string attributes without one.
pub const DEFAULT_VARCHAR_LENGTH: u32 = 256;

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
            primary_key: false,
        }
    }

    /// Hidden generated key column.
    pub fn serial_key(name: impl Into<String>) -> ColumnDef {
        ColumnDef {
            nullable: false,
            primary_key: true,
            ..ColumnDef::new(name, ColumnType::Serial)
        }
    }

    /// Column for an attribute. Defaults that have no inline form (binary
    /// and geometry values) are dropped.
    pub fn from_attribute(attr: &AttributeDescriptor, capability: &Capability) -> ColumnDef {
        let ty = match (&attr.geometry, attr.ty) {
            (Some(geometry), _) => ColumnType::Geometry {
                kind: geometry.kind,
                srid: geometry.srid,
                dimension: geometry.dimension,
            },
            (None, ty) => ColumnType::from_type(ty, attr.length, capability),
        };

        ColumnDef {
            name: attr.name.clone(),
            ty,
            nullable: attr.nullable,
            default: attr
                .default
                .as_ref()
                .and_then(super::Literal::from_value)
                .map(Expr::Literal),
            primary_key: false,
        }
    }
}

impl ColumnType {
    pub fn from_type(ty: Type, length: Option<u32>, capability: &Capability) -> ColumnType {
        match ty {
            Type::Bool => ColumnType::Boolean,
            Type::I16 => ColumnType::SmallInt,
            Type::I32 => ColumnType::Integer,
            Type::I64 => ColumnType::BigInt,
            Type::F32 => ColumnType::Real,
            Type::F64 => ColumnType::DoublePrecision,
            Type::String => ColumnType::Varchar(
                length
                    .unwrap_or(DEFAULT_VARCHAR_LENGTH)
                    .min(capability.varchar_max),
            ),
            Type::Bytes => ColumnType::Binary,
            Type::Geometry => ColumnType::Geometry {
                kind: GeometryKind::Geometry,
                srid: Srid::UNKNOWN,
                dimension: 2,
            },
        }
    }
}
