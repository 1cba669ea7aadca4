use geostore_core::Type as CoreType;
use postgres_types::Type;

pub trait TypeExt {
    /// The PostgreSQL type a parameter of this type is declared as.
    fn to_postgres_type(&self) -> Type;
}

impl TypeExt for CoreType {
    fn to_postgres_type(&self) -> Type {
        match self {
            CoreType::Bool => Type::BOOL,
            CoreType::I16 => Type::INT2,
            CoreType::I32 => Type::INT4,
            CoreType::I64 => Type::INT8,
            CoreType::F32 => Type::FLOAT4,
            CoreType::F64 => Type::FLOAT8,
            CoreType::String => Type::TEXT,
            // Geometries are bound in their wire encoding
            CoreType::Bytes | CoreType::Geometry => Type::BYTEA,
        }
    }
}
