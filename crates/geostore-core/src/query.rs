use crate::{geom::Srid, Filter};

/// A request for features of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub type_name: String,

    pub filter: Filter,

    pub properties: Properties,

    /// Maximum number of features to return.
    pub max: Option<u64>,

    /// Number of features to skip.
    pub offset: Option<u64>,

    pub sort: Vec<SortBy>,

    /// Reproject geometries into this reference system.
    pub reproject: Option<Srid>,

    /// Return two dimensional geometries.
    pub force_2d: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Properties {
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortBy {
    Property { name: String, direction: Direction },

    /// Ascending identifier order.
    Natural,

    /// Descending identifier order.
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Query {
    pub fn new(type_name: impl Into<String>) -> Query {
        Query {
            type_name: type_name.into(),
            filter: Filter::Include,
            properties: Properties::All,
            max: None,
            offset: None,
            sort: vec![],
            reproject: None,
            force_2d: false,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Query {
        self.filter = filter;
        self
    }

    pub fn properties<I, S>(mut self, properties: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Properties::Only(properties.into_iter().map(Into::into).collect());
        self
    }

    pub fn max(mut self, max: u64) -> Query {
        self.max = Some(max);
        self
    }

    pub fn offset(mut self, offset: u64) -> Query {
        self.offset = Some(offset);
        self
    }

    pub fn sort_by(mut self, name: impl Into<String>, direction: Direction) -> Query {
        self.sort.push(SortBy::Property {
            name: name.into(),
            direction,
        });
        self
    }

    pub fn natural_order(mut self) -> Query {
        self.sort.push(SortBy::Natural);
        self
    }

    pub fn reverse_order(mut self) -> Query {
        self.sort.push(SortBy::Reverse);
        self
    }

    pub fn reproject(mut self, srid: Srid) -> Query {
        self.reproject = Some(srid);
        self
    }

    pub fn force_2d(mut self, force_2d: bool) -> Query {
        self.force_2d = force_2d;
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.max.is_some() || self.offset.is_some_and(|offset| offset > 0)
    }

    /// Returns `true` if the sort already orders by identifier.
    pub fn sorts_by_identity(&self) -> bool {
        self.sort
            .iter()
            .any(|sort| matches!(sort, SortBy::Natural | SortBy::Reverse))
    }
}

impl Properties {
    pub fn is_all(&self) -> bool {
        matches!(self, Properties::All)
    }
}
