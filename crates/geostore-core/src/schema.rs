mod feature_id;
pub use feature_id::FeatureId;

mod identity;
pub use identity::{IdentityMapper, KeyColumn, KeyStrategy};

use crate::{
    geom::{GeometryKind, Srid},
    Error, Result, Type, Value,
};

use std::collections::HashSet;

/// Describes one feature type: its attributes and how its features are
/// identified.
///
/// Once built a feature type is immutable. Stores hand out shared references
/// to the types they discover.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureType {
    /// Type name. Doubles as the table name.
    pub name: String,

    /// Attributes in column order. At most one is a geometry.
    pub attributes: Vec<AttributeDescriptor>,

    pub identity: IdentityMapper,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDescriptor {
    pub name: String,

    pub ty: Type,

    pub nullable: bool,

    pub default: Option<Value>,

    /// Maximum length of string attributes, if bounded.
    pub length: Option<u32>,

    /// Present on geometry attributes.
    pub geometry: Option<GeometryDescriptor>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryDescriptor {
    pub kind: GeometryKind,
    pub srid: Srid,
    /// 2 or 3.
    pub dimension: u8,
}

#[derive(Debug)]
pub struct Builder {
    name: String,
    attributes: Vec<AttributeDescriptor>,
    identity: Option<IdentityMapper>,
}

impl FeatureType {
    pub fn builder(name: impl Into<String>) -> Builder {
        Builder {
            name: name.into(),
            attributes: vec![],
            identity: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// The geometry attribute, if the type has one.
    pub fn geometry(&self) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|attr| attr.geometry.is_some())
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }

    /// Fails with a validation error naming the first property that is not
    /// an attribute of this type.
    pub fn check_properties<'a>(&self, properties: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for property in properties {
            if self.attribute(property).is_none() {
                return Err(Error::validation(format!(
                    "property `{property}` is not an attribute of `{}`",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl AttributeDescriptor {
    pub fn new(name: impl Into<String>, ty: Type) -> AttributeDescriptor {
        AttributeDescriptor {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
            length: None,
            geometry: None,
        }
    }

    pub fn geometry(
        name: impl Into<String>,
        kind: GeometryKind,
        srid: Srid,
        dimension: u8,
    ) -> AttributeDescriptor {
        AttributeDescriptor {
            geometry: Some(GeometryDescriptor {
                kind,
                srid,
                dimension,
            }),
            ..AttributeDescriptor::new(name, Type::Geometry)
        }
    }

    pub fn not_null(mut self) -> AttributeDescriptor {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> AttributeDescriptor {
        self.default = Some(value.into());
        self
    }

    pub fn length(mut self, length: u32) -> AttributeDescriptor {
        self.length = Some(length);
        self
    }

    pub fn is_geometry(&self) -> bool {
        self.geometry.is_some()
    }
}

impl Builder {
    pub fn attribute(mut self, attribute: AttributeDescriptor) -> Builder {
        self.attributes.push(attribute);
        self
    }

    /// Shorthand for a nullable attribute of the given type.
    pub fn column(self, name: impl Into<String>, ty: Type) -> Builder {
        self.attribute(AttributeDescriptor::new(name, ty))
    }

    pub fn geometry(
        self,
        name: impl Into<String>,
        kind: GeometryKind,
        srid: Srid,
        dimension: u8,
    ) -> Builder {
        self.attribute(AttributeDescriptor::geometry(name, kind, srid, dimension))
    }

    pub fn identity(mut self, identity: IdentityMapper) -> Builder {
        self.identity = Some(identity);
        self
    }

    /// Builds the feature type.
    ///
    /// Without an explicit identity the type gets a generated integer key in
    /// a hidden `<name>_fid` column.
    pub fn build(self) -> Result<FeatureType> {
        let mut seen = HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(Error::schema(format!(
                    "duplicate attribute `{}` in `{}`",
                    attr.name, self.name
                )));
            }
            if let Some(geometry) = &attr.geometry {
                if !matches!(geometry.dimension, 2 | 3) {
                    return Err(Error::schema(format!(
                        "geometry attribute `{}` has dimension {}",
                        attr.name, geometry.dimension
                    )));
                }
            }
        }

        if self.attributes.iter().filter(|attr| attr.is_geometry()).count() > 1 {
            return Err(Error::schema(format!(
                "`{}` declares more than one geometry attribute",
                self.name
            )));
        }

        let identity = self.identity.unwrap_or_else(|| {
            IdentityMapper::generated(KeyColumn::new(
                format!("{}_fid", self.name.to_lowercase()),
                Type::I64,
            ))
        });

        Ok(FeatureType {
            name: self.name,
            attributes: self.attributes,
            identity,
        })
    }
}
