use geostore_core::{err, Result, Type as CoreType, Value as CoreValue};
use postgres_types::{accepts, private::BytesMut, to_sql_checked, IsNull, ToSql, Type};
use tokio_postgres::Row;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

#[derive(Debug)]
pub struct Value(pub(crate) CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Reads column `index` of a row and converts it to `ty`.
    pub fn from_row(row: &Row, index: usize, ty: CoreType) -> Result<Self> {
        let column = &row.columns()[index];
        let pg_ty = column.type_();

        let value = if *pg_ty == Type::BOOL {
            get::<bool>(row, index)?.map(CoreValue::Bool)
        } else if *pg_ty == Type::INT2 {
            get::<i16>(row, index)?.map(CoreValue::I16)
        } else if *pg_ty == Type::INT4 {
            get::<i32>(row, index)?.map(CoreValue::I32)
        } else if *pg_ty == Type::INT8 {
            get::<i64>(row, index)?.map(CoreValue::I64)
        } else if *pg_ty == Type::FLOAT4 {
            get::<f32>(row, index)?.map(CoreValue::F32)
        } else if *pg_ty == Type::FLOAT8 {
            get::<f64>(row, index)?.map(CoreValue::F64)
        } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(pg_ty) {
            get::<String>(row, index)?.map(CoreValue::String)
        } else if *pg_ty == Type::BYTEA {
            get::<Vec<u8>>(row, index)?.map(CoreValue::Bytes)
        } else {
            return Err(err!(
                "column `{}` has unsupported type `{pg_ty}`",
                column.name()
            ));
        };

        Ok(Value(value.unwrap_or(CoreValue::Null).cast(ty)?))
    }
}

fn get<'a, T: postgres_types::FromSql<'a>>(row: &'a Row, index: usize) -> Result<Option<T>> {
    row.try_get(index).map_err(geostore_core::Error::driver)
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError>
    where
        Self: Sized,
    {
        match &self.0 {
            CoreValue::Null => Ok(IsNull::Yes),
            CoreValue::Bool(value) => value.to_sql(ty, out),
            CoreValue::I16(value) => integer(*value as i64, ty, out),
            CoreValue::I32(value) => integer(*value as i64, ty, out),
            CoreValue::I64(value) => integer(*value, ty, out),
            CoreValue::F32(value) => float(*value as f64, ty, out),
            CoreValue::F64(value) => float(*value, ty, out),
            CoreValue::String(value) => value.to_sql(ty, out),
            CoreValue::Bytes(value) => value.to_sql(ty, out),
            CoreValue::Geometry(_) => Err("geometries must be encoded before binding".into()),
        }
    }

    accepts!(BOOL, INT2, INT4, INT8, FLOAT4, FLOAT8, TEXT, VARCHAR, BPCHAR, NAME, BYTEA);
    to_sql_checked!();
}

/// Integers narrow to the declared width, failing when out of range.
fn integer(value: i64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        Type::FLOAT8 => (value as f64).to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}

fn float(value: f64, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (value as f32).to_sql(ty, out),
        _ => value.to_sql(ty, out),
    }
}
