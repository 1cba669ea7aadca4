pub mod driver;
pub use driver::{Connection, Driver};

mod error;
pub use error::Error;

pub mod feature;
pub use feature::Feature;

pub mod filter;
pub use filter::Filter;

pub mod geom;
pub use geom::{BoundingBox, Envelope, Geometry, GeometryValue, Srid};

pub mod query;
pub use query::Query;

pub mod schema;
pub use schema::{FeatureId, FeatureType};

mod value;
pub use value::{Type, Value};

/// A Result type alias that uses geostore's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;

pub use async_trait::async_trait;
