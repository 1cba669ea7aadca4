use super::FeatureId;
use crate::{Error, Result, Type, Value};

/// How the key of a new row is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The store generates the key (serial or autoincrement column).
    AutoGenerated,

    /// The writer supplies the key: taken from the feature, else computed
    /// from the current maximum or a random UUID.
    Assigned,

    /// The table has no key. Identifiers are made up per read.
    Volatile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyColumn {
    pub name: String,
    pub ty: Type,
}

/// Maps the physical key columns of a table to feature identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityMapper {
    pub columns: Vec<KeyColumn>,

    pub strategy: KeyStrategy,

    /// Whether the key columns are also reported as ordinary attributes.
    pub exposed: bool,
}

impl KeyColumn {
    pub fn new(name: impl Into<String>, ty: Type) -> KeyColumn {
        KeyColumn {
            name: name.into(),
            ty,
        }
    }
}

impl IdentityMapper {
    pub fn generated(column: KeyColumn) -> IdentityMapper {
        IdentityMapper {
            columns: vec![column],
            strategy: KeyStrategy::AutoGenerated,
            exposed: false,
        }
    }

    pub fn assigned(columns: Vec<KeyColumn>) -> IdentityMapper {
        IdentityMapper {
            columns,
            strategy: KeyStrategy::Assigned,
            exposed: false,
        }
    }

    pub fn volatile() -> IdentityMapper {
        IdentityMapper {
            columns: vec![],
            strategy: KeyStrategy::Volatile,
            exposed: false,
        }
    }

    pub fn exposed(mut self, exposed: bool) -> IdentityMapper {
        self.exposed = exposed;
        self
    }

    pub fn is_volatile(&self) -> bool {
        self.strategy == KeyStrategy::Volatile
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column.name == name)
    }

    /// Builds the identifier of a row from its key column values.
    pub fn id_for(&self, type_name: &str, key: &[Value]) -> FeatureId {
        if self.is_volatile() {
            FeatureId::volatile(type_name)
        } else {
            FeatureId::new(type_name, key)
        }
    }

    /// Recovers the key column values from an identifier.
    pub fn key_values(&self, type_name: &str, id: &FeatureId) -> Result<Vec<Value>> {
        if self.is_volatile() {
            return Err(Error::validation(format!(
                "`{type_name}` has no primary key; feature ids cannot be resolved"
            )));
        }

        let parts = id.key_parts(type_name)?;
        if parts.len() != self.columns.len() {
            return Err(Error::validation(format!(
                "feature id `{id}` has {} key parts, `{type_name}` has {} key columns",
                parts.len(),
                self.columns.len()
            )));
        }

        parts
            .into_iter()
            .zip(&self.columns)
            .map(|(part, column)| Value::String(part).cast(column.ty))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_values_cast_to_column_types() {
        let mapper = IdentityMapper::assigned(vec![
            KeyColumn::new("region", Type::String),
            KeyColumn::new("seq", Type::I32),
        ]);
        let id = mapper.id_for("parcels", &[Value::from("north"), Value::I32(12)]);
        assert_eq!(id.as_str(), "parcels.north&12");
        assert_eq!(
            mapper.key_values("parcels", &id).unwrap(),
            [Value::from("north"), Value::I32(12)]
        );
    }

    #[test]
    fn malformed_ids() {
        let mapper = IdentityMapper::generated(KeyColumn::new("fid", Type::I64));
        assert!(mapper.key_values("t", &FeatureId::from("t.abc")).is_err());
        assert!(mapper.key_values("t", &FeatureId::from("t.1&2")).is_err());
    }

    #[test]
    fn volatile_ids_do_not_resolve() {
        let mapper = IdentityMapper::volatile();
        let id = mapper.id_for("t", &[]);
        assert!(id.is_volatile());
        assert!(mapper.key_values("t", &id).unwrap_err().is_validation());
    }
}
