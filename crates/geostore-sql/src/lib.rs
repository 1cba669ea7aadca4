pub mod ddl;

pub mod extent;

pub mod geometry;

pub mod introspect;

pub mod serializer;
pub use serializer::{Params, Placeholder, Serializer};

pub mod split;
pub use split::{Split, Splitter};

pub mod stmt;
pub use stmt::Statement;

pub use geostore_core::driver::TypedValue;
