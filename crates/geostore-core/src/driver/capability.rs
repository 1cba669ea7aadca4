#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgresql,
    Sqlite,
}

#[derive(Debug)]
pub struct Capability {
    /// SQL flavor used to render statements.
    pub dialect: Dialect,

    /// Supports `INSERT .. RETURNING`. Without it generated keys are read
    /// back with `last_insert_id`.
    pub returning: bool,

    /// Query returning the key generated by the last insert on the
    /// connection.
    pub last_insert_id: Option<&'static str>,

    /// Has an index-assisted envelope overlap operator for loose bounding
    /// box filters.
    pub loose_bbox: bool,

    /// Provides `ST_EstimatedExtent` over table statistics.
    pub estimated_extent: bool,

    /// Can reproject with `ST_Transform`.
    pub transform: bool,

    /// Tables live in named schemas.
    pub schemas: bool,

    /// Schema searched when none is configured.
    pub default_schema: Option<&'static str>,

    /// Longest identifier the store accepts. Generated constraint and index
    /// names are truncated to fit.
    pub max_identifier_length: usize,

    /// Filter functions that can be pushed down, by lower case name.
    pub functions: &'static [&'static str],

    /// Has a case-insensitive `ILIKE`.
    pub ilike: bool,

    /// Check constraints are added after `CREATE TABLE` with
    /// `ALTER TABLE .. ADD CONSTRAINT` rather than inline.
    pub alter_table_add_constraint: bool,

    /// New geometry columns are registered by inserting into
    /// `geometry_columns`. Stores that derive the catalog from column
    /// type modifiers do not need it.
    pub register_geometry_columns: bool,

    /// Geometry columns can be declared as `geometry(KIND, SRID)`.
    pub geometry_typmod: bool,

    /// `USING` method for spatial indexes, if the store has one.
    pub spatial_index_method: Option<&'static str>,

    /// Longest `VARCHAR` the store declares.
    pub varchar_max: u32,
}

impl Capability {
    /// PostgreSQL with PostGIS.
    pub const POSTGIS: Self = Self {
        dialect: Dialect::Postgresql,
        returning: true,
        last_insert_id: None,
        loose_bbox: true,
        estimated_extent: true,
        transform: true,
        schemas: true,
        default_schema: Some("public"),
        max_identifier_length: 63,
        functions: &["lower", "upper", "length", "abs", "area", "reverse"],
        ilike: true,
        alter_table_add_constraint: true,
        register_geometry_columns: false,
        geometry_typmod: true,
        spatial_index_method: Some("GIST"),
        varchar_max: 10_485_760,
    };

    /// SQLite with the geostore spatial function set registered.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,
        returning: false,
        last_insert_id: Some("SELECT last_insert_rowid()"),
        estimated_extent: false,
        transform: false,
        schemas: false,
        default_schema: None,
        max_identifier_length: 1024,
        functions: &["lower", "upper", "length", "abs"],
        ilike: false,
        alter_table_add_constraint: false,
        register_geometry_columns: true,
        geometry_typmod: false,
        spatial_index_method: None,
        ..Self::POSTGIS
    };

    pub fn supports_function(&self, name: &str) -> bool {
        self.functions.contains(&name)
    }

    /// Truncates a generated identifier to the store's limit.
    pub fn truncate_identifier(&self, name: &str) -> String {
        match name.char_indices().nth(self.max_identifier_length) {
            Some((end, _)) => name[..end].to_string(),
            None => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_identifiers() {
        let long = "x".repeat(80);
        assert_eq!(Capability::POSTGIS.truncate_identifier(&long).len(), 63);
        assert_eq!(Capability::SQLITE.truncate_identifier("short"), "short");
    }

    #[test]
    fn sqlite_pushes_down_fewer_functions() {
        assert!(Capability::POSTGIS.supports_function("area"));
        assert!(!Capability::SQLITE.supports_function("area"));
        assert!(Capability::SQLITE.supports_function("lower"));
    }
}
