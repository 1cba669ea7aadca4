//! Splitting filters into the part a store evaluates and the part that is
//! evaluated against decoded features.

use crate::stmt::{BinaryOp, Expr};

use geostore_core::{
    driver::Capability,
    filter::{
        self, ArithmeticOp, CompareOp, FilterBBox, FilterBetween, FilterCompare, FilterDWithin,
        FilterLike, FilterSpatial, Func,
    },
    geom::{GeometryCodec, WireFormat},
    schema::{AttributeDescriptor, GeometryDescriptor},
    Error, FeatureId, FeatureType, Filter, GeometryValue, Result, Srid, Type, Value,
};

use std::collections::BTreeSet;

/// Classifies filter nodes against one feature type and lowers the
/// encodable ones to SQL expressions.
#[derive(Debug, Clone)]
pub struct Splitter<'a> {
    feature_type: &'a FeatureType,
    capability: &'a Capability,
    codec: GeometryCodec,

    /// Bounding box filters test envelope overlap instead of intersection.
    loose_bbox: bool,

    /// Geometry columns are compared in two dimensions.
    force_2d: bool,
}

/// Result of [`Splitter::split`]. The conjunction of both parts is
/// equivalent to the input filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// The part rendered into the `WHERE` clause.
    pub encodable: Filter,

    /// The part evaluated against decoded features.
    pub residual: Filter,
}

/// Operand categories. Comparisons are only pushed down between operands of
/// the same category so the store and the client order values the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Null,
    Bool,
    Numeric,
    String,
    Geometry,
    Binary,
}

/// How a geometry literal relates to the column's reference system.
enum SridMatch {
    Same,
    Transform(i32),
}

impl Split {
    pub fn has_residual(&self) -> bool {
        !self.residual.is_include()
    }
}

impl<'a> Splitter<'a> {
    pub fn new(feature_type: &'a FeatureType, capability: &'a Capability) -> Splitter<'a> {
        Splitter {
            feature_type,
            capability,
            codec: GeometryCodec::default(),
            loose_bbox: false,
            force_2d: false,
        }
    }

    pub fn codec(mut self, codec: GeometryCodec) -> Splitter<'a> {
        self.codec = codec;
        self
    }

    /// Enables envelope overlap for bounding box filters. Ignored when the
    /// store has no overlap operator.
    pub fn loose_bbox(mut self, loose_bbox: bool) -> Splitter<'a> {
        self.loose_bbox = loose_bbox && self.capability.loose_bbox;
        self
    }

    pub fn force_2d(mut self, force_2d: bool) -> Splitter<'a> {
        self.force_2d = force_2d;
        self
    }

    /// Splits `filter` into an encodable part and a residual.
    ///
    /// Conjunctions are split operand by operand. Any other node goes to one
    /// side as a whole.
    pub fn split(&self, filter: &Filter) -> Split {
        match filter {
            Filter::And(operands) => {
                let (encodable, residual): (Vec<_>, Vec<_>) = operands
                    .iter()
                    .cloned()
                    .partition(|operand| self.is_encodable(operand));

                Split {
                    encodable: Filter::and_from_vec(encodable),
                    residual: Filter::and_from_vec(residual),
                }
            }
            filter if self.is_encodable(filter) => Split {
                encodable: filter.clone(),
                residual: Filter::Include,
            },
            filter => Split {
                encodable: Filter::Include,
                residual: filter.clone(),
            },
        }
    }

    /// Returns `true` if the store can evaluate the whole filter.
    pub fn is_encodable(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Include | Filter::Exclude => true,
            Filter::And(operands) | Filter::Or(operands) => {
                operands.iter().all(|operand| self.is_encodable(operand))
            }
            Filter::Not(operand) => self.is_encodable(operand),
            Filter::Compare(compare) => self.is_compare_encodable(compare),
            Filter::Between(between) => self.is_between_encodable(between),
            Filter::Like(like) => self.category(&like.expr) == Some(Category::String),
            Filter::IsNull(expr) => match expr {
                filter::Expr::Property(name) => self.feature_type.attribute(name).is_some(),
                expr => self.category(expr).is_some(),
            },
            Filter::Id(_) => !self.feature_type.identity.is_volatile(),
            Filter::Spatial(spatial) => {
                self.geometry_attribute(Some(&spatial.property)).is_some()
                    && self.srid_match(spatial.geometry.srid).is_some()
            }
            Filter::BBox(bbox) => {
                self.geometry_attribute(bbox.property.as_deref()).is_some()
                    && self.srid_match(bbox.srid).is_some()
            }
            Filter::DWithin(dwithin) => {
                self.geometry_attribute(Some(&dwithin.property)).is_some()
                    && self.srid_match(dwithin.geometry.srid).is_some()
                    && dwithin.distance.is_finite()
            }
        }
    }

    /// Lowers an encodable filter to a SQL predicate. `Include` lowers to
    /// `None`.
    ///
    /// Fails with a translation error when the filter holds a node that is
    /// not encodable, which means the caller skipped [`Splitter::split`].
    pub fn lower(&self, filter: &Filter) -> Result<Option<Expr>> {
        match filter {
            Filter::Include => Ok(None),
            filter => self.lower_filter(filter).map(Some),
        }
    }

    fn lower_filter(&self, filter: &Filter) -> Result<Expr> {
        if !self.is_encodable(filter) {
            return Err(Error::translation(format!(
                "filter node is not encodable for `{}`: {filter:?}",
                self.feature_type.name
            )));
        }

        Ok(match filter {
            Filter::Include => Expr::eq(Expr::literal(1), Expr::literal(1)),
            Filter::Exclude => Expr::false_(),
            Filter::And(operands) => Expr::and_from_vec(
                operands
                    .iter()
                    .map(|operand| self.lower_filter(operand))
                    .collect::<Result<_>>()?,
            ),
            Filter::Or(operands) => Expr::or_from_vec(
                operands
                    .iter()
                    .map(|operand| self.lower_filter(operand))
                    .collect::<Result<_>>()?,
            ),
            Filter::Not(operand) => Expr::not(self.lower_filter(operand)?),
            Filter::Compare(compare) => self.lower_compare(compare)?,
            Filter::Between(between) => Expr::Between {
                expr: Box::new(self.lower_expr(&between.expr)?),
                lower: Box::new(self.lower_expr(&between.lower)?),
                upper: Box::new(self.lower_expr(&between.upper)?),
            },
            Filter::Like(like) => self.lower_like(like)?,
            Filter::IsNull(expr) => Expr::is_null(self.lower_expr(expr)?),
            Filter::Id(ids) => self.lower_ids(ids),
            Filter::Spatial(spatial) => self.lower_spatial(spatial)?,
            Filter::BBox(bbox) => self.lower_bbox(bbox)?,
            Filter::DWithin(dwithin) => self.lower_dwithin(dwithin)?,
        })
    }

    fn is_compare_encodable(&self, compare: &FilterCompare) -> bool {
        let (Some(lhs), Some(rhs)) = (self.category(&compare.lhs), self.category(&compare.rhs))
        else {
            return false;
        };

        compatible(&[lhs, rhs])
    }

    fn is_between_encodable(&self, between: &FilterBetween) -> bool {
        let categories = [&between.expr, &between.lower, &between.upper]
            .map(|expr| self.category(expr));

        match categories {
            [Some(a), Some(b), Some(c)] => compatible(&[a, b, c]),
            _ => false,
        }
    }

    /// The category of an operand, or `None` if the store cannot evaluate it.
    fn category(&self, expr: &filter::Expr) -> Option<Category> {
        match expr {
            filter::Expr::Property(name) => {
                let attr = self.feature_type.attribute(name)?;
                Some(category_of(attr.ty))
            }
            filter::Expr::Literal(value) => match value.ty() {
                None => Some(Category::Null),
                Some(Type::Bytes | Type::Geometry) => None,
                Some(ty) => Some(category_of(ty)),
            },
            filter::Expr::Function(function) => {
                let func = function.func;
                if !self.capability.supports_function(func.name())
                    || function.args.len() != func.arity()
                {
                    return None;
                }

                let arg = self.category(&function.args[0])?;
                let (input, output) = match func {
                    Func::Lower | Func::Upper | Func::Reverse => (Category::String, Category::String),
                    Func::Length => (Category::String, Category::Numeric),
                    Func::Abs => (Category::Numeric, Category::Numeric),
                    Func::Area => (Category::Geometry, Category::Numeric),
                };
                (arg == input).then_some(output)
            }
            filter::Expr::Arithmetic(arith) => {
                let lhs = self.category(&arith.lhs)?;
                let rhs = self.category(&arith.rhs)?;
                if lhs != Category::Numeric || rhs != Category::Numeric {
                    return None;
                }

                // Division by zero fails in the store but yields null on the
                // client, so only constant non-zero divisors are pushed down.
                if arith.op == ArithmeticOp::Div {
                    let divisor = arith.rhs.as_literal().and_then(Value::as_f64)?;
                    if divisor == 0.0 {
                        return None;
                    }
                }

                Some(Category::Numeric)
            }
        }
    }

    fn lower_expr(&self, expr: &filter::Expr) -> Result<Expr> {
        Ok(match expr {
            filter::Expr::Property(name) => Expr::column(name),
            filter::Expr::Literal(value) => Expr::value(value.clone()),
            filter::Expr::Function(function) => {
                let name = match function.func {
                    Func::Lower => "LOWER",
                    Func::Upper => "UPPER",
                    Func::Length => "LENGTH",
                    Func::Abs => "ABS",
                    Func::Area => "ST_Area",
                    Func::Reverse => "REVERSE",
                };
                let args = function
                    .args
                    .iter()
                    .map(|arg| self.lower_expr(arg))
                    .collect::<Result<Vec<_>>>()?;
                Expr::func(name, args)
            }
            filter::Expr::Arithmetic(arith) => {
                let op = match arith.op {
                    ArithmeticOp::Add => BinaryOp::Add,
                    ArithmeticOp::Sub => BinaryOp::Sub,
                    ArithmeticOp::Mul => BinaryOp::Mul,
                    ArithmeticOp::Div => BinaryOp::Div,
                };
                Expr::binary_op(self.lower_expr(&arith.lhs)?, op, self.lower_expr(&arith.rhs)?)
            }
        })
    }

    fn lower_compare(&self, compare: &FilterCompare) -> Result<Expr> {
        let mut lhs = self.lower_expr(&compare.lhs)?;
        let mut rhs = self.lower_expr(&compare.rhs)?;

        if !compare.match_case {
            if self.category(&compare.lhs) == Some(Category::String) {
                lhs = Expr::func("LOWER", [lhs]);
            }
            if self.category(&compare.rhs) == Some(Category::String) {
                rhs = Expr::func("LOWER", [rhs]);
            }
        }

        let op = match compare.op {
            CompareOp::Eq => BinaryOp::Eq,
            CompareOp::Ne => BinaryOp::Ne,
            CompareOp::Lt => BinaryOp::Lt,
            CompareOp::Le => BinaryOp::Le,
            CompareOp::Gt => BinaryOp::Gt,
            CompareOp::Ge => BinaryOp::Ge,
        };

        Ok(Expr::binary_op(lhs, op, rhs))
    }

    fn lower_like(&self, like: &FilterLike) -> Result<Expr> {
        Ok(Expr::Like {
            expr: Box::new(self.lower_expr(&like.expr)?),
            pattern: Box::new(Expr::value(like.sql_pattern())),
            case_insensitive: !like.match_case,
            escape: Some('\\'),
        })
    }

    /// Identifier sets become key column lookups. Identifiers that do not
    /// resolve to a key of this type match nothing and are dropped.
    fn lower_ids(&self, ids: &BTreeSet<FeatureId>) -> Expr {
        let identity = &self.feature_type.identity;
        let type_name = &self.feature_type.name;

        let keys: Vec<Vec<Value>> = ids
            .iter()
            .filter_map(|id| identity.key_values(type_name, id).ok())
            .collect();

        if keys.is_empty() {
            return Expr::false_();
        }

        if let [column] = &identity.columns[..] {
            return Expr::InList {
                expr: Box::new(Expr::column(&column.name)),
                list: keys
                    .into_iter()
                    .flatten()
                    .map(|value| Expr::typed_value(value, column.ty))
                    .collect(),
            };
        }

        Expr::or_from_vec(
            keys.into_iter()
                .map(|key| {
                    Expr::and_from_vec(
                        identity
                            .columns
                            .iter()
                            .zip(key)
                            .map(|(column, value)| {
                                Expr::eq(
                                    Expr::column(&column.name),
                                    Expr::typed_value(value, column.ty),
                                )
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    fn lower_spatial(&self, spatial: &FilterSpatial) -> Result<Expr> {
        let (attr, _) = self.require_geometry(Some(&spatial.property))?;
        let column = self.geometry_column(&attr.name);
        let literal = self.geometry_literal(&spatial.geometry)?;
        Ok(Expr::func(spatial.op.function_name(), [column, literal]))
    }

    fn lower_bbox(&self, bbox: &FilterBBox) -> Result<Expr> {
        let (attr, geometry) = self.require_geometry(bbox.property.as_deref())?;
        let envelope = &bbox.envelope;

        let mut args: Vec<Expr> = [envelope.min_x, envelope.min_y, envelope.max_x, envelope.max_y]
            .into_iter()
            .map(|coord| Expr::typed_value(coord, Type::F64))
            .collect();

        let srid = bbox.srid.or(geometry.srid);
        if let Some(code) = srid.known() {
            args.push(Expr::literal(code as i64));
        }

        let mut envelope = Expr::func("ST_MakeEnvelope", args);
        if let SridMatch::Transform(target) = self.require_srid_match(bbox.srid)? {
            envelope = Expr::func("ST_Transform", [envelope, Expr::literal(target as i64)]);
        }

        if self.loose_bbox {
            Ok(Expr::binary_op(
                Expr::column(&attr.name),
                BinaryOp::Overlaps,
                envelope,
            ))
        } else {
            Ok(Expr::func(
                "ST_Intersects",
                [self.geometry_column(&attr.name), envelope],
            ))
        }
    }

    fn lower_dwithin(&self, dwithin: &FilterDWithin) -> Result<Expr> {
        let (attr, _) = self.require_geometry(Some(&dwithin.property))?;
        Ok(Expr::func(
            "ST_DWithin",
            [
                self.geometry_column(&attr.name),
                self.geometry_literal(&dwithin.geometry)?,
                Expr::typed_value(dwithin.distance, Type::F64),
            ],
        ))
    }

    /// A geometry column reference, projected to 2D when configured.
    fn geometry_column(&self, name: &str) -> Expr {
        let column = Expr::column(name);
        if self.force_2d {
            Expr::func("ST_Force2D", [column])
        } else {
            column
        }
    }

    /// A geometry constant, tagged with the column's reference system.
    fn geometry_literal(&self, value: &GeometryValue) -> Result<Expr> {
        let (_, column) = self.require_geometry(None)?;
        let srid_match = self.require_srid_match(value.srid)?;

        let srid = value.srid.or(column.srid);
        let geometry = if self.force_2d {
            value.geometry.to_2d()
        } else {
            value.geometry.clone()
        };
        let encoded = self.codec.encode(&GeometryValue::new(geometry, srid));

        let (name, embeds_srid) = match self.codec.format() {
            WireFormat::Wkt => ("ST_GeomFromText", false),
            WireFormat::Wkb => ("ST_GeomFromWKB", false),
            WireFormat::Ewkb => ("ST_GeomFromEWKB", true),
        };

        let mut args = vec![Expr::value(encoded)];
        if let (false, Some(code)) = (embeds_srid, srid.known()) {
            args.push(Expr::literal(code as i64));
        }

        let literal = Expr::func(name, args);
        Ok(match srid_match {
            SridMatch::Same => literal,
            SridMatch::Transform(target) => {
                Expr::func("ST_Transform", [literal, Expr::literal(target as i64)])
            }
        })
    }

    /// The geometry attribute a spatial node refers to. `None` stands for
    /// the default geometry.
    fn geometry_attribute(
        &self,
        property: Option<&str>,
    ) -> Option<(&'a AttributeDescriptor, &'a GeometryDescriptor)> {
        let feature_type: &'a FeatureType = self.feature_type;
        let attr = match property {
            Some(name) => feature_type.attribute(name)?,
            None => feature_type.geometry()?,
        };
        attr.geometry.as_ref().map(|geometry| (attr, geometry))
    }

    fn require_geometry(
        &self,
        property: Option<&str>,
    ) -> Result<(&'a AttributeDescriptor, &'a GeometryDescriptor)> {
        self.geometry_attribute(property).ok_or_else(|| {
            Error::translation(format!(
                "`{}` has no geometry attribute {}",
                self.feature_type.name,
                property.unwrap_or_default()
            ))
        })
    }

    /// Mixed reference systems are transformed by the store when it can,
    /// otherwise the node stays on the client.
    fn srid_match(&self, srid: Srid) -> Option<SridMatch> {
        let column = self.feature_type.geometry()?.geometry.as_ref()?.srid;

        match (srid.known(), column.known()) {
            (Some(a), Some(b)) if a != b => {
                self.capability.transform.then_some(SridMatch::Transform(b))
            }
            _ => Some(SridMatch::Same),
        }
    }

    fn require_srid_match(&self, srid: Srid) -> Result<SridMatch> {
        self.srid_match(srid).ok_or_else(|| {
            Error::translation(format!(
                "cannot compare SRID {srid} with the geometry column of `{}`",
                self.feature_type.name
            ))
        })
    }
}

fn category_of(ty: Type) -> Category {
    match ty {
        Type::Bool => Category::Bool,
        Type::I16 | Type::I32 | Type::I64 | Type::F32 | Type::F64 => Category::Numeric,
        Type::String => Category::String,
        Type::Bytes => Category::Binary,
        Type::Geometry => Category::Geometry,
    }
}

/// Operands are comparable in the store when they share one scalar
/// category. Null literals compare with anything.
fn compatible(categories: &[Category]) -> bool {
    let mut found = None;

    for &category in categories {
        match category {
            Category::Null => {}
            Category::Geometry | Category::Binary => return false,
            category => match found {
                None => found = Some(category),
                Some(prev) if prev == category => {}
                Some(_) => return false,
            },
        }
    }

    true
}
