//! Backend agnostic predicate model.
//!
//! A [`Filter`] is a tree of boolean nodes over [`Expr`] operands. Stores push
//! the parts they can express down into SQL and evaluate the rest against
//! decoded features with [`Filter::evaluate`].

mod eval;
pub use eval::Truth;

mod expr;
pub use expr::{ArithmeticOp, Expr, ExprArithmetic, ExprFunction, Func};

mod like;

use crate::{
    geom::{Envelope, GeometryValue, Srid},
    schema::FeatureId,
    Value,
};

use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every feature.
    Include,

    /// Matches no feature.
    Exclude,

    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),

    Compare(FilterCompare),
    Between(FilterBetween),
    Like(FilterLike),
    IsNull(Expr),

    /// Matches features whose identifier is in the set.
    Id(BTreeSet<FeatureId>),

    Spatial(FilterSpatial),
    BBox(FilterBBox),
    DWithin(FilterDWithin),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCompare {
    pub op: CompareOp,
    pub lhs: Expr,
    pub rhs: Expr,

    /// When `false`, strings compare case-insensitively.
    pub match_case: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterBetween {
    pub expr: Expr,
    pub lower: Expr,
    pub upper: Expr,
}

/// A wildcard match over the text of `expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterLike {
    pub expr: Expr,
    pub pattern: String,

    /// Matches any run of characters.
    pub wildcard: char,

    /// Matches exactly one character.
    pub single: char,

    /// Makes the following character literal.
    pub escape: Option<char>,

    pub match_case: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialOp {
    Intersects,
    Contains,
    Within,
    Disjoint,
    Equals,
}

/// A binary spatial relation between a geometry attribute and a literal.
///
/// `Contains` reads as "the attribute contains the literal".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpatial {
    pub op: SpatialOp,
    pub property: String,
    pub geometry: GeometryValue,
}

/// Envelope intersection. `property` defaults to the type's geometry
/// attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBBox {
    pub property: Option<String>,
    pub envelope: Envelope,
    pub srid: Srid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterDWithin {
    pub property: String,
    pub geometry: GeometryValue,
    pub distance: f64,
}

impl Filter {
    /// Conjunction that folds constants and flattens nested `And` nodes.
    pub fn and(lhs: impl Into<Filter>, rhs: impl Into<Filter>) -> Filter {
        Filter::and_from_vec(vec![lhs.into(), rhs.into()])
    }

    pub fn and_from_vec(operands: Vec<Filter>) -> Filter {
        let mut flat = vec![];

        for operand in operands {
            match operand {
                Filter::Include => {}
                Filter::Exclude => return Filter::Exclude,
                Filter::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Filter::Include,
            1 => flat.swap_remove(0),
            _ => Filter::And(flat),
        }
    }

    /// Disjunction that folds constants and flattens nested `Or` nodes.
    pub fn or(lhs: impl Into<Filter>, rhs: impl Into<Filter>) -> Filter {
        Filter::or_from_vec(vec![lhs.into(), rhs.into()])
    }

    pub fn or_from_vec(operands: Vec<Filter>) -> Filter {
        let mut flat = vec![];

        for operand in operands {
            match operand {
                Filter::Exclude => {}
                Filter::Include => return Filter::Include,
                Filter::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }

        match flat.len() {
            0 => Filter::Exclude,
            1 => flat.swap_remove(0),
            _ => Filter::Or(flat),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: impl Into<Filter>) -> Filter {
        match operand.into() {
            Filter::Include => Filter::Exclude,
            Filter::Exclude => Filter::Include,
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }

    pub fn compare(op: CompareOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Filter {
        Filter::Compare(FilterCompare {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
            match_case: true,
        })
    }

    /// `property = value`
    pub fn eq(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Eq, Expr::property(property), Expr::literal(value))
    }

    pub fn ne(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Ne, Expr::property(property), Expr::literal(value))
    }

    pub fn lt(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Lt, Expr::property(property), Expr::literal(value))
    }

    pub fn le(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Le, Expr::property(property), Expr::literal(value))
    }

    pub fn gt(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Gt, Expr::property(property), Expr::literal(value))
    }

    pub fn ge(property: &str, value: impl Into<Value>) -> Filter {
        Filter::compare(CompareOp::Ge, Expr::property(property), Expr::literal(value))
    }

    /// Case-insensitive string equality.
    pub fn eq_ignore_case(property: &str, value: impl Into<Value>) -> Filter {
        Filter::Compare(FilterCompare {
            op: CompareOp::Eq,
            lhs: Expr::property(property),
            rhs: Expr::literal(value),
            match_case: false,
        })
    }

    pub fn between(
        expr: impl Into<Expr>,
        lower: impl Into<Expr>,
        upper: impl Into<Expr>,
    ) -> Filter {
        Filter::Between(FilterBetween {
            expr: expr.into(),
            lower: lower.into(),
            upper: upper.into(),
        })
    }

    /// SQL style pattern: `%` matches any run, `_` one character, `\`
    /// escapes.
    pub fn like(property: &str, pattern: impl Into<String>) -> Filter {
        Filter::Like(FilterLike {
            expr: Expr::property(property),
            pattern: pattern.into(),
            wildcard: '%',
            single: '_',
            escape: Some('\\'),
            match_case: true,
        })
    }

    pub fn is_null(expr: impl Into<Expr>) -> Filter {
        Filter::IsNull(expr.into())
    }

    pub fn ids(ids: impl IntoIterator<Item = FeatureId>) -> Filter {
        Filter::Id(ids.into_iter().collect())
    }

    pub fn spatial(op: SpatialOp, property: &str, geometry: GeometryValue) -> Filter {
        Filter::Spatial(FilterSpatial {
            op,
            property: property.to_string(),
            geometry,
        })
    }

    pub fn intersects(property: &str, geometry: GeometryValue) -> Filter {
        Filter::spatial(SpatialOp::Intersects, property, geometry)
    }

    pub fn contains(property: &str, geometry: GeometryValue) -> Filter {
        Filter::spatial(SpatialOp::Contains, property, geometry)
    }

    pub fn within(property: &str, geometry: GeometryValue) -> Filter {
        Filter::spatial(SpatialOp::Within, property, geometry)
    }

    pub fn disjoint(property: &str, geometry: GeometryValue) -> Filter {
        Filter::spatial(SpatialOp::Disjoint, property, geometry)
    }

    pub fn equals(property: &str, geometry: GeometryValue) -> Filter {
        Filter::spatial(SpatialOp::Equals, property, geometry)
    }

    /// Envelope test against the default geometry attribute.
    pub fn bbox(envelope: Envelope, srid: Srid) -> Filter {
        Filter::BBox(FilterBBox {
            property: None,
            envelope,
            srid,
        })
    }

    pub fn dwithin(property: &str, geometry: GeometryValue, distance: f64) -> Filter {
        Filter::DWithin(FilterDWithin {
            property: property.to_string(),
            geometry,
            distance,
        })
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Filter::Include)
    }

    pub fn is_exclude(&self) -> bool {
        matches!(self, Filter::Exclude)
    }

    /// Visits the name of every property the filter reads. `BBox` nodes
    /// without a property are skipped.
    pub fn visit_properties(&self, f: &mut impl FnMut(&str)) {
        match self {
            Filter::Include | Filter::Exclude | Filter::Id(_) => {}
            Filter::And(operands) | Filter::Or(operands) => {
                for operand in operands {
                    operand.visit_properties(f);
                }
            }
            Filter::Not(operand) => operand.visit_properties(f),
            Filter::Compare(c) => {
                c.lhs.visit_properties(f);
                c.rhs.visit_properties(f);
            }
            Filter::Between(b) => {
                b.expr.visit_properties(f);
                b.lower.visit_properties(f);
                b.upper.visit_properties(f);
            }
            Filter::Like(l) => l.expr.visit_properties(f),
            Filter::IsNull(expr) => expr.visit_properties(f),
            Filter::Spatial(s) => f(&s.property),
            Filter::BBox(b) => {
                if let Some(property) = &b.property {
                    f(property);
                }
            }
            Filter::DWithin(d) => f(&d.property),
        }
    }

    /// Returns `true` if evaluating the filter needs the feature identifier.
    pub fn uses_ids(&self) -> bool {
        match self {
            Filter::Id(_) => true,
            Filter::And(operands) | Filter::Or(operands) => operands.iter().any(Filter::uses_ids),
            Filter::Not(operand) => operand.uses_ids(),
            _ => false,
        }
    }

    /// Returns `true` if some `BBox` node, at any depth, tests the default
    /// geometry. [`Filter::visit_properties`] does not report those.
    pub fn reads_default_geometry(&self) -> bool {
        match self {
            Filter::BBox(b) => b.property.is_none(),
            Filter::And(operands) | Filter::Or(operands) => {
                operands.iter().any(Filter::reads_default_geometry)
            }
            Filter::Not(operand) => operand.reads_default_geometry(),
            _ => false,
        }
    }
}

impl From<bool> for Filter {
    fn from(value: bool) -> Filter {
        if value {
            Filter::Include
        } else {
            Filter::Exclude
        }
    }
}

impl CompareOp {
    /// The operator with its operands swapped.
    pub fn commute(self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
        }
    }
}

impl core::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        })
    }
}

impl SpatialOp {
    /// The PostGIS function implementing the relation.
    pub fn function_name(self) -> &'static str {
        match self {
            SpatialOp::Intersects => "ST_Intersects",
            SpatialOp::Contains => "ST_Contains",
            SpatialOp::Within => "ST_Within",
            SpatialOp::Disjoint => "ST_Disjoint",
            SpatialOp::Equals => "ST_Equals",
        }
    }
}

impl FilterLike {
    /// The pattern rewritten with `%`, `_` and `\` as the wildcard, single
    /// character and escape characters.
    pub fn sql_pattern(&self) -> String {
        like::to_sql_pattern(self)
    }
}
