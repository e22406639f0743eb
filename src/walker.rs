//! Decoding of the aggregation response tree into ranked price records.
//!
//! The engine answers with an untyped JSON tree whose shape depends on the
//! aggregation that produced it. [`Node`] walks that tree while tracking a
//! JSON path, so a contract violation fails with the exact location instead
//! of a panic. The walk is shared by both strategies; [`PriceSource`] only
//! decides where the region buckets live and where their price comes from.
//!
//! Shape errors are fatal to the whole extraction. Degenerate numbers in the
//! client-side ratio (zero area, missing sums) are not: that record's average
//! drops to 0 and the walk continues.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config;
use crate::error::{EstateError, Result};
use crate::models::{PriceRecord, ResultSet, Strategy};

// ---------------------------------------------------------------------------
// Node: path-tracking view into the response tree
// ---------------------------------------------------------------------------

/// A borrowed node of the response tree plus its location.
#[derive(Debug, Clone)]
pub struct Node<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> Node<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: "$".to_string(),
        }
    }

    pub fn value(&self) -> &'a Value {
        self.value
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn child(&self, key: &str, value: &'a Value) -> Node<'a> {
        Node {
            value,
            path: format!("{}.{}", self.path, key),
        }
    }

    fn shape_error(&self, expected: &'static str) -> EstateError {
        EstateError::UnexpectedShape {
            path: self.path.clone(),
            expected,
        }
    }

    pub fn as_object(&self) -> Result<&'a Map<String, Value>> {
        self.value.as_object().ok_or_else(|| self.shape_error("object"))
    }

    /// Required member of an object node.
    pub fn field(&self, key: &str) -> Result<Node<'a>> {
        match self.as_object()?.get(key) {
            Some(value) => Ok(self.child(key, value)),
            None => Err(EstateError::UnexpectedShape {
                path: format!("{}.{}", self.path, key),
                expected: "field",
            }),
        }
    }

    /// Optional member of an object node. The node itself must be an object.
    pub fn opt_field(&self, key: &str) -> Result<Option<Node<'a>>> {
        Ok(self.as_object()?.get(key).map(|value| self.child(key, value)))
    }

    /// Members of an object node, in key order.
    pub fn entries(&self) -> Result<Vec<(&'a str, Node<'a>)>> {
        Ok(self
            .as_object()?
            .iter()
            .map(|(key, value)| (key.as_str(), self.child(key, value)))
            .collect())
    }

    /// Elements of an array node.
    pub fn items(&self) -> Result<Vec<Node<'a>>> {
        let items = self.value.as_array().ok_or_else(|| self.shape_error("array"))?;
        Ok(items
            .iter()
            .enumerate()
            .map(|(i, value)| Node {
                value,
                path: format!("{}[{}]", self.path, i),
            })
            .collect())
    }

    pub fn as_str(&self) -> Result<&'a str> {
        self.value.as_str().ok_or_else(|| self.shape_error("string"))
    }

    /// A document count. Integral floats are accepted since some clients
    /// re-encode counts as doubles.
    pub fn as_count(&self) -> Result<u64> {
        if let Some(n) = self.value.as_u64() {
            return Ok(n);
        }
        match self.value.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
            _ => Err(self.shape_error("non-negative integer")),
        }
    }

    /// A numeric leaf, or `None` for null and non-numeric values.
    pub fn as_number(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

// ---------------------------------------------------------------------------
// Typed intermediate structures
// ---------------------------------------------------------------------------

/// One day bucket of the histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct DayAggregation {
    pub date: String,
    pub doc_count: u64,
    /// Engine-computed whole-day average, when the aggregation asked for one.
    pub average_price: Option<f64>,
    pub regions: Vec<RegionAggregation>,
}

/// One region bucket inside a day.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionAggregation {
    pub key: String,
    pub doc_count: u64,
    pub metric: RegionMetric,
}

/// The price information a region bucket carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionMetric {
    /// Raw sums; `None` when the engine returned a null or non-numeric value.
    Sums {
        price: Option<f64>,
        area: Option<f64>,
    },
    /// Ratio already computed by the `bucket_script` pipeline.
    Pipeline(f64),
}

impl RegionMetric {
    /// The region's average price per area unit ×10000.
    ///
    /// For raw sums this is rounded to two decimals, and falls back to 0 when
    /// the ratio is not a finite number.
    pub fn average_price(&self) -> f64 {
        match *self {
            RegionMetric::Sums { price, area } => price_ratio(price, area).unwrap_or(0.0),
            RegionMetric::Pipeline(avg) => avg,
        }
    }
}

/// `sum_price × 10000 / sum_area` rounded to two decimals, or `None` if any
/// input is missing or the result is NaN or infinite.
pub fn price_ratio(sum_price: Option<f64>, sum_area: Option<f64>) -> Option<f64> {
    let ratio = sum_price? * config::PRICE_SCALE / sum_area?;
    if !ratio.is_finite() {
        return None;
    }
    round2(ratio)
}

/// Round through the exact decimal expansion, so ties go to even
/// (`0.125` becomes `0.12`, `0.375` becomes `0.38`).
fn round2(x: f64) -> Option<f64> {
    format!("{x:.2}").parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// PriceSource: the strategy descriptor
// ---------------------------------------------------------------------------

/// Where a strategy's region buckets live and where their price comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Every array inside the region sub-aggregation holds region buckets
    /// carrying `sumPrice` and `sumArea`.
    Sums,
    /// `regions.buckets` holds region buckets carrying `avgPrice`.
    Pipeline,
}

impl From<Strategy> for PriceSource {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::V1 => PriceSource::Sums,
            Strategy::V2 => PriceSource::Pipeline,
        }
    }
}

impl PriceSource {
    fn region_buckets<'a>(self, day: &Node<'a>) -> Result<Vec<Node<'a>>> {
        match self {
            PriceSource::Sums => {
                let container = day.field(config::AGG_REGIONS_V1)?;
                let mut buckets = Vec::new();
                for (_, entry) in container.entries()? {
                    if entry.value().is_array() {
                        buckets.extend(entry.items()?);
                    }
                }
                Ok(buckets)
            }
            PriceSource::Pipeline => day.field(config::AGG_REGIONS)?.field("buckets")?.items(),
        }
    }

    fn metric(self, region: &Node<'_>) -> Result<RegionMetric> {
        match self {
            PriceSource::Sums => {
                let price = region.field(config::AGG_SUM_PRICE)?;
                let area = region.field(config::AGG_SUM_AREA)?;
                Ok(RegionMetric::Sums {
                    price: metric_value(&price)?,
                    area: metric_value(&area)?,
                })
            }
            PriceSource::Pipeline => {
                let missing = || EstateError::MissingPipelineValue {
                    path: format!("{}.{}.value", region.path(), config::AGG_AVG_PRICE),
                };
                let avg = region.opt_field(config::AGG_AVG_PRICE)?.ok_or_else(missing)?;
                avg.opt_field("value")?
                    .and_then(|v| v.as_number())
                    .map(RegionMetric::Pipeline)
                    .ok_or_else(missing)
            }
        }
    }

    fn day_average(self, day: &Node<'_>) -> Result<Option<f64>> {
        match self {
            PriceSource::Sums => Ok(None),
            PriceSource::Pipeline => match day.opt_field(config::AGG_AVG_PRICE)? {
                Some(avg) => Ok(avg.opt_field("value")?.and_then(|v| v.as_number())),
                None => Ok(None),
            },
        }
    }
}

/// The `value` of a single-value metric. The metric must be an object; a
/// null or non-numeric value is reported as `None`.
fn metric_value(metric: &Node<'_>) -> Result<Option<f64>> {
    Ok(metric.opt_field("value")?.and_then(|v| v.as_number()))
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// Decode the day histogram into typed day and region aggregations.
pub fn decode_days(tree: &Value, source: PriceSource) -> Result<Vec<DayAggregation>> {
    let root = Node::root(tree);
    let mut days = Vec::new();

    for day in root.field("buckets")?.items()? {
        let date = day.field("key_as_string")?.as_str()?.to_string();
        let doc_count = day.field("doc_count")?.as_count()?;
        let average_price = source.day_average(&day)?;

        let mut regions = Vec::new();
        for region in source.region_buckets(&day)? {
            regions.push(RegionAggregation {
                key: region_key(&region.field("key")?)?,
                doc_count: region.field("doc_count")?.as_count()?,
                metric: source.metric(&region)?,
            });
        }

        days.push(DayAggregation {
            date,
            doc_count,
            average_price,
            regions,
        });
    }

    Ok(days)
}

/// Terms keys are strings for keyword fields; numeric keys are accepted and
/// rendered as text.
fn region_key(key: &Node<'_>) -> Result<String> {
    match key.value() {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(EstateError::UnexpectedShape {
            path: key.path().to_string(),
            expected: "string",
        }),
    }
}

/// Build a ranked result set from an aggregation tree.
///
/// Pure function of its input. Either the whole tree decodes or an error is
/// returned; nothing is partially populated.
pub fn extract(tree: &Value, strategy: Strategy) -> Result<ResultSet> {
    let days = decode_days(tree, strategy.into())?;

    let mut result = ResultSet::default();
    let mut degraded = 0usize;
    for day in days {
        let records = day
            .regions
            .iter()
            .map(|region| {
                let average_price = region.metric.average_price();
                if let RegionMetric::Sums { price, area } = region.metric {
                    if price_ratio(price, area).is_none() {
                        degraded += 1;
                        warn!(
                            date = %day.date,
                            region = %region.key,
                            sum_price = ?price,
                            sum_area = ?area,
                            "average price is not a finite number; using 0"
                        );
                    }
                }
                PriceRecord::new(&day.date, &region.key, region.doc_count, average_price)
            })
            .collect();
        result.insert_day(&day.date, day.doc_count, day.average_price, records);
    }

    debug!(
        %strategy,
        days = result.len(),
        records = result.records().count(),
        degraded,
        "extracted average prices"
    );
    Ok(result)
}

/// Extract with client-side ratios from a `by_day` tree.
pub fn extract_v1(tree: &Value) -> Result<ResultSet> {
    extract(tree, Strategy::V1)
}

/// Extract with engine-computed ratios from a `per_day` tree.
pub fn extract_v2(tree: &Value) -> Result<ResultSet> {
    extract(tree, Strategy::V2)
}
