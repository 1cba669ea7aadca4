mod exec;

pub mod extent;

pub mod introspect;

pub mod listener;
pub use listener::{EventKind, FeatureEvent, FeatureListener};

pub mod lock;
pub use lock::{Authorizations, BatchResult, FeatureLock, LockOwner, TransactionId};

pub mod plan;

pub mod reader;
pub use reader::FeatureStream;

pub mod store;
pub use store::{PoolConfig, Store, StoreConfig, Transaction};

mod writer;

pub use geostore_core::{
    err,
    filter::{self, CompareOp},
    geom::{self, GeometryKind, WireFormat},
    query::{self, Direction},
    schema::{self, AttributeDescriptor, IdentityMapper},
    BoundingBox, Envelope, Error, Feature, FeatureId, FeatureType, Filter, Geometry,
    GeometryValue, Query, Result, Srid, Type, Value,
};
