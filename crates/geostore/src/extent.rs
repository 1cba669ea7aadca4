//! Bounding boxes of feature collections.
//!
//! Three strategies, tried in order for unfiltered requests:
//!
//! 1. table statistics, when enabled and the store keeps them;
//! 2. sampling blocks of rows at growing offsets, when statistics were
//!    asked for but are missing;
//! 3. one exact aggregate over the matching rows.
//!
//! Filtered requests always use the aggregate. Both approximations are
//! padded, since they may miss features.

use crate::{exec, plan::Planner};

use geostore_core::{
    driver::{Capability, Row},
    BoundingBox, Connection, Envelope, Filter, Result, Srid,
};
use geostore_sql::{extent, stmt::Expr, Serializer};

/// Offsets of the sampled blocks. Signed, since bisection can leave an
/// offset below the one before it.
const SAMPLE_OFFSETS: [i64; 7] = [0, 10, 100, 1000, 10_000, 20_000, 40_000];

/// Rows read per sampled block.
const SAMPLE_BLOCK: i64 = 10;

/// When the last block that found rows started below this offset, the
/// table is small enough to read whole.
const FETCH_ALL_BELOW: i64 = 99;

const MAX_MISSES: usize = 4;

/// Padding per side of a statistics extent, relative to its size.
const ESTIMATE_PADDING: f64 = 0.1;

/// Padding per side of a sampled extent, relative to its size.
const SAMPLE_PADDING: f64 = 1.0;

/// Computes the extent of the geometry column of one feature type.
#[derive(Debug, Clone)]
pub struct ExtentEstimator<'a> {
    planner: Planner<'a>,
    capability: &'static Capability,
    column: Option<(&'a str, Srid)>,
    estimated: bool,
}

impl<'a> ExtentEstimator<'a> {
    pub fn new(planner: Planner<'a>) -> ExtentEstimator<'a> {
        let feature_type = planner.feature_type();
        let column = feature_type.geometry().and_then(|attr| {
            let descriptor = attr.geometry.as_ref()?;
            Some((attr.name.as_str(), descriptor.srid))
        });

        ExtentEstimator {
            capability: planner.capability(),
            planner,
            column,
            estimated: false,
        }
    }

    /// Answers unfiltered requests from table statistics when the store
    /// keeps them.
    pub fn estimated(mut self, estimated: bool) -> ExtentEstimator<'a> {
        self.estimated = estimated;
        self
    }

    /// The extent of the features matching `filter`, in the column's
    /// reference system.
    ///
    /// `None` when the type has no geometry, nothing matches, the filter
    /// has a part the store cannot evaluate, or a result row cannot be
    /// read.
    pub async fn extent(
        &self,
        connection: &mut dyn Connection,
        filter: &Filter,
    ) -> Result<Option<BoundingBox>> {
        let Some((column, srid)) = self.column else {
            return Ok(None);
        };

        let (split, expr) = self.planner.split(filter, false)?;
        if split.has_residual() {
            tracing::debug!(
                type_name = %self.planner.feature_type().name,
                "extent filter has a residual; no extent"
            );
            return Ok(None);
        }

        if filter.is_include() && self.estimated && self.capability.estimated_extent {
            if let Some(envelope) = self.statistics(&mut *connection, column).await? {
                return Ok(Some(BoundingBox::new(envelope.pad(ESTIMATE_PADDING), srid)));
            }

            tracing::warn!(
                table = %self.planner.table_name().name,
                "no extent statistics, run ANALYZE; sampling instead"
            );
            return Ok(self
                .sample(connection, column)
                .await?
                .map(|envelope| BoundingBox::new(envelope.pad(SAMPLE_PADDING), srid)));
        }

        self.exact(connection, expr).await
    }

    /// The exact extent of the rows matching an already lowered filter.
    pub async fn exact(
        &self,
        connection: &mut dyn Connection,
        filter: Option<Expr>,
    ) -> Result<Option<BoundingBox>> {
        let Some((column, srid)) = self.column else {
            return Ok(None);
        };

        let rows = exec::query_all(
            connection,
            self.serializer(),
            extent::exact(self.planner.table_name().clone(), column, filter),
            &extent::RETURNING,
        )
        .await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(envelope)
            .map(|envelope| BoundingBox::new(envelope, srid)))
    }

    /// Reads the extent from the planner statistics. Unqualified tables are
    /// resolved through the search path.
    async fn statistics(
        &self,
        connection: &mut dyn Connection,
        column: &str,
    ) -> Result<Option<Envelope>> {
        let table = self.planner.table_name();

        let rows = exec::query_all(
            connection,
            self.serializer(),
            extent::estimated(table.schema.as_deref(), &table.name, column),
            &extent::RETURNING,
        )
        .await?;

        Ok(rows.into_iter().next().and_then(envelope))
    }

    /// Reads envelopes in small blocks at growing offsets instead of
    /// scanning the table.
    ///
    /// A block that finds no rows means the offset went past the end of
    /// the table: a small table is then read whole, a large one is bisected
    /// between the last blocks that found rows.
    async fn sample(&self, connection: &mut dyn Connection, column: &str) -> Result<Option<Envelope>> {
        // `None` reads the whole table
        let mut offsets = SAMPLE_OFFSETS.map(Some);
        let mut extent: Option<Envelope> = None;
        let mut hits = 0;
        let mut misses = 0;
        let mut i = 0;

        while i < offsets.len() && misses < MAX_MISSES {
            let mut window = offsets[i].map(|start| (start, SAMPLE_BLOCK));

            // A next block that touches this one, or lies before it, is read
            // together with it
            if let (Some(start), Some(Some(next))) = (offsets[i], offsets.get(i + 1).copied()) {
                if next - start <= SAMPLE_BLOCK {
                    window = Some((start, SAMPLE_BLOCK * 2));
                    offsets[i + 1] = Some(start + SAMPLE_BLOCK);
                    i += 1;
                }
            }

            // A window before the first row reads the whole table
            let window = window.and_then(|(start, len)| {
                Some((u64::try_from(start).ok()?, u64::try_from(len).ok()?))
            });

            let Some(envelopes) = self.sample_block(&mut *connection, column, window).await? else {
                return Ok(None);
            };

            if !envelopes.is_empty() {
                hits += 1;
                for envelope in envelopes.into_iter().flatten() {
                    match &mut extent {
                        Some(extent) => extent.expand_to_include(&envelope),
                        None => extent = Some(envelope),
                    }
                }

                if window.is_none() {
                    break;
                }
                i += 1;
                continue;
            }

            misses += 1;
            if hits == 0 {
                return Ok(None);
            }
            let Some(prev) = i.checked_sub(1) else {
                break;
            };

            match offsets[prev] {
                Some(start) if start < FETCH_ALL_BELOW => offsets[i] = None,
                _ if misses < 3 => {
                    // First miss: halve the step. Second: search between the
                    // last two blocks that found rows.
                    let bounds = if misses == 2 {
                        (prev.checked_sub(1).and_then(|j| offsets[j]), offsets[prev])
                    } else {
                        (offsets[prev], offsets[i])
                    };
                    let (Some(min), Some(max)) = bounds else {
                        break;
                    };

                    offsets[i] = Some((min + max) / 2);
                    let width = (max - min) / (offsets.len() - i) as i64;
                    for (step, offset) in (1..).zip(&mut offsets[i + 1..]) {
                        *offset = Some(min + width * step);
                    }
                }
                _ => break,
            }
            // The same block index is read again with its new offset
        }

        tracing::debug!(hits, misses, "sampled extent");
        Ok(extent)
    }

    /// One block of envelopes; `None` if a row cannot be read. Rows with
    /// empty geometries yield `None` envelopes but still count as found.
    async fn sample_block(
        &self,
        connection: &mut dyn Connection,
        column: &str,
        window: Option<(u64, u64)>,
    ) -> Result<Option<Vec<Option<Envelope>>>> {
        let keys: Vec<&str> = self
            .planner
            .feature_type()
            .identity
            .column_names()
            .collect();

        let (offset, limit) = window.unzip();
        let select = extent::sample(
            self.planner.table_name().clone(),
            column,
            &keys,
            offset.unwrap_or(0),
            limit.unwrap_or(0),
        )
        .offset(offset)
        .limit(limit);

        let rows = match exec::query_all(connection, self.serializer(), select, &extent::RETURNING)
            .await
        {
            Ok(rows) => rows,
            Err(err) if err.any(|err| err.is_codec() || err.is_read()) => {
                tracing::debug!(%err, "unreadable sample block");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        Ok(Some(rows.into_iter().map(envelope).collect()))
    }

    fn serializer(&self) -> Serializer {
        Serializer::for_capability(self.capability)
    }
}

/// Reads `min_x, min_y, max_x, max_y`. `None` if any is missing.
fn envelope(row: Row) -> Option<Envelope> {
    let [min_x, min_y, max_x, max_y] = <[_; 4]>::try_from(row).ok()?;
    Some(Envelope::new(
        min_x.as_f64()?,
        min_y.as_f64()?,
        max_x.as_f64()?,
        max_y.as_f64()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostore_core::{
        async_trait,
        driver::{Operation, Response},
        geom::GeometryKind,
        FeatureType, Value,
    };
    use geostore_sql::stmt::TableName;

    /// A table of `rows` points, row `n` at `(n, n)`, ordered by key.
    #[derive(Debug)]
    struct Table {
        rows: u64,
        statistics: Option<Envelope>,
        /// Statements run so far.
        sql: Vec<String>,
    }

    impl Table {
        fn new(rows: u64) -> Table {
            Table {
                rows,
                statistics: None,
                sql: vec![],
            }
        }

        /// `(offset, limit)` of every sampled block; `None` for whole
        /// table reads.
        fn windows(&self) -> Vec<Option<(u64, u64)>> {
            self.sql
                .iter()
                .filter(|sql| !sql.contains("ST_EstimatedExtent"))
                .map(|sql| Some((number_after(sql, " OFFSET ")?, number_after(sql, " LIMIT ")?)))
                .collect()
        }
    }

    fn number_after(sql: &str, keyword: &str) -> Option<u64> {
        let rest = &sql[sql.find(keyword)? + keyword.len()..];
        rest.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
    }

    fn point_row(n: u64) -> Row {
        vec![Value::F64(n as f64); 4]
    }

    #[async_trait]
    impl Connection for Table {
        async fn exec(&mut self, op: Operation) -> Result<Response> {
            let Operation::Query(query) = op else {
                return Ok(Response::count(0));
            };
            self.sql.push(query.sql.clone());

            if query.sql.contains("ST_EstimatedExtent") {
                let row = match self.statistics {
                    Some(e) => [e.min_x, e.min_y, e.max_x, e.max_y].map(Value::F64).into(),
                    None => vec![Value::Null; 4],
                };
                return Ok(Response::row_stream(vec![row]));
            }

            let (start, end) = match number_after(&query.sql, " LIMIT ") {
                Some(limit) => {
                    let start = number_after(&query.sql, " OFFSET ").unwrap_or(0);
                    (start.min(self.rows), (start + limit).min(self.rows))
                }
                None => (0, self.rows),
            };
            Ok(Response::row_stream(
                (start..end).map(point_row).collect::<Vec<_>>(),
            ))
        }

        fn in_transaction(&self) -> bool {
            false
        }
    }

    fn points() -> FeatureType {
        FeatureType::builder("points")
            .geometry("geom", GeometryKind::Point, Srid::new(4326), 2)
            .build()
            .unwrap()
    }

    async fn estimate(ft: &FeatureType, table: &mut Table) -> Option<BoundingBox> {
        ExtentEstimator::new(Planner::new(ft, &Capability::POSTGIS))
            .estimated(true)
            .extent(table, &Filter::Include)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sampling_follows_the_table_size() {
        let ft = points();

        // (rows, blocks read, last row seen)
        let cases: [(u64, &[Option<(u64, u64)>], Option<u64>); 7] = [
            (0, &[Some((0, 20))], None),
            (5, &[Some((0, 20)), Some((100, 10)), None], Some(4)),
            (50, &[Some((0, 20)), Some((100, 10)), None], Some(49)),
            (
                500,
                &[
                    Some((0, 20)),
                    Some((100, 10)),
                    Some((1000, 10)),
                    Some((550, 20)),
                    Some((325, 20)),
                    Some((400, 10)),
                ],
                Some(409),
            ),
            (
                6000,
                &[
                    Some((0, 20)),
                    Some((100, 10)),
                    Some((1000, 10)),
                    Some((10_000, 10)),
                    Some((5500, 20)),
                    Some((7000, 10)),
                    Some((5505, 10)),
                ],
                Some(5519),
            ),
            (
                15_000,
                &[
                    Some((0, 20)),
                    Some((100, 10)),
                    Some((1000, 10)),
                    Some((10_000, 10)),
                    Some((20_000, 10)),
                    Some((15_000, 20)),
                    Some((12_500, 10)),
                ],
                Some(12_509),
            ),
            (
                50_000,
                &[
                    Some((0, 20)),
                    Some((100, 10)),
                    Some((1000, 10)),
                    Some((10_000, 10)),
                    Some((20_000, 10)),
                    Some((40_000, 10)),
                ],
                Some(40_009),
            ),
        ];

        for (rows, windows, last) in cases {
            let mut table = Table::new(rows);
            let extent = estimate(&ft, &mut table).await;

            assert_eq!(table.windows(), windows, "{rows} rows");

            // Sampled extents are padded by their own size on every side
            let expect = last.map(|last| {
                let last = last as f64;
                BoundingBox::new(Envelope::new(-last, -last, 2.0 * last, 2.0 * last), Srid::new(4326))
            });
            assert_eq!(extent, expect, "{rows} rows");
        }
    }

    #[tokio::test]
    async fn statistics_are_padded() {
        let ft = points();
        let mut table = Table::new(1000);
        table.statistics = Some(Envelope::new(0.0, 0.0, 10.0, 20.0));

        let extent = estimate(&ft, &mut table).await.unwrap();

        assert_eq!(extent.envelope, Envelope::new(-1.0, -2.0, 11.0, 22.0));
        assert_eq!(table.sql.len(), 1);
    }

    #[tokio::test]
    async fn statistics_follow_table_qualification() {
        let ft = points();

        for (table_name, expect) in [
            (TableName::qualified("gis", "points"), "ST_EstimatedExtent('gis', 'points', 'geom')"),
            (TableName::new("points"), "ST_EstimatedExtent('points', 'geom')"),
        ] {
            let mut table = Table::new(0);
            let planner = Planner::new(&ft, &Capability::POSTGIS).table(table_name);
            ExtentEstimator::new(planner)
                .estimated(true)
                .extent(&mut table, &Filter::Include)
                .await
                .unwrap();

            assert!(table.sql[0].contains(expect), "{}", table.sql[0]);
        }
    }

    #[tokio::test]
    async fn filtered_extents_are_exact() {
        let ft = points();
        let mut table = Table::new(100);

        ExtentEstimator::new(Planner::new(&ft, &Capability::POSTGIS))
            .estimated(true)
            .extent(&mut table, &Filter::IsNull(geostore_core::filter::Expr::property("geom")))
            .await
            .unwrap();

        assert_eq!(table.sql.len(), 1);
        assert!(table.sql[0].contains("MIN(ST_XMin("), "{}", table.sql[0]);
    }

    #[test]
    fn envelope_rows() {
        assert_eq!(
            envelope(vec![
                Value::F64(1.0),
                Value::F64(2.0),
                Value::F64(3.0),
                Value::F64(4.0)
            ]),
            Some(Envelope::new(1.0, 2.0, 3.0, 4.0))
        );
        assert_eq!(
            envelope(vec![Value::Null, Value::Null, Value::Null, Value::Null]),
            None
        );
        assert_eq!(envelope(vec![Value::F64(1.0)]), None);
    }
}
