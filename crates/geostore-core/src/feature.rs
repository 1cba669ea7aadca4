use crate::{schema::FeatureId, Value};

use indexmap::IndexMap;

/// A feature read from or written to a store: an optional identifier and
/// attribute values by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub id: Option<FeatureId>,

    pub values: IndexMap<String, Value>,

    /// Name of the default geometry attribute.
    pub geometry_name: Option<String>,
}

impl Feature {
    pub fn new() -> Feature {
        Feature::default()
    }

    pub fn with_id(id: FeatureId) -> Feature {
        Feature {
            id: Some(id),
            ..Feature::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Feature {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Builder-style [`Feature::set`].
    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Feature {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }

    /// The default geometry attribute value. Without a known geometry name
    /// the first geometry valued attribute is used.
    pub fn default_geometry(&self) -> Option<&Value> {
        match &self.geometry_name {
            Some(name) => self.values.get(name),
            None => self.values.values().find(|value| value.as_geometry().is_some()),
        }
    }

    /// Keeps only the named attributes, in the given order.
    pub fn retain(&mut self, names: &[String]) {
        let mut values = IndexMap::with_capacity(names.len());
        for name in names {
            if let Some(value) = self.values.shift_remove(name) {
                values.insert(name.clone(), value);
            }
        }
        self.values = values;
    }
}
