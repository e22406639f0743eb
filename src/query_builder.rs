//! Search request construction.
//!
//! Produces the JSON body of an Elasticsearch `_search` request: a filtered
//! `bool` query plus one of two nested aggregation trees. Builder methods
//! return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use estate_price_sdk::{PriceFilter, QueryBuilder, Strategy};
//!
//! let filter = PriceFilter::new("Region", "pudong", "2020-05-01", "2020-05-31");
//! let (agg_name, body) = QueryBuilder::new()
//!     .region_size(50)
//!     .build(&filter, Strategy::V2);
//! assert_eq!(agg_name, "per_day");
//! assert_eq!(body["size"], 0);
//! ```

use serde_json::{json, Map, Value};

use crate::config;
use crate::models::{PriceFilter, Strategy};

/// Builds `_search` request bodies for the average-price aggregations.
///
/// Field names default to the listing schema (`Date`, `SubRegion.keyword`,
/// `TotalPrice`, `Area`). Values are copied into the body verbatim.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    date_field: String,
    region_field: String,
    price_field: String,
    area_field: String,
    region_size: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self {
            date_field: config::DATE_FIELD.to_string(),
            region_field: config::REGION_FIELD.to_string(),
            price_field: config::PRICE_FIELD.to_string(),
            area_field: config::AREA_FIELD.to_string(),
            region_size: config::REGION_TERMS_SIZE,
        }
    }

    /// Field used both for the date range and the daily histogram.
    pub fn date_field(&mut self, field: &str) -> &mut Self {
        self.date_field = field.to_string();
        self
    }

    /// Keyword field the region terms aggregation groups on.
    pub fn region_field(&mut self, field: &str) -> &mut Self {
        self.region_field = field.to_string();
        self
    }

    pub fn price_field(&mut self, field: &str) -> &mut Self {
        self.price_field = field.to_string();
        self
    }

    pub fn area_field(&mut self, field: &str) -> &mut Self {
        self.area_field = field.to_string();
        self
    }

    /// Maximum number of regions per day, ranked by document count.
    pub fn region_size(&mut self, n: usize) -> &mut Self {
        self.region_size = n;
        self
    }

    /// The predicate: `term {field: value}` AND `start <= date <= end`.
    pub fn filter(&self, filter: &PriceFilter) -> Value {
        json!({
            "bool": {
                "must": [
                    { "term": { filter.field.as_str(): filter.value } }
                ],
                "filter": [
                    { "range": { self.date_field.as_str(): { "gte": filter.start_date } } },
                    { "range": { self.date_field.as_str(): { "lte": filter.end_date } } }
                ]
            }
        })
    }

    /// Daily histogram of region terms carrying raw price and area sums.
    pub fn aggregation_v1(&self) -> Value {
        let mut regions = self.region_terms();
        regions.insert("aggs".to_string(), Value::Object(self.sums()));

        self.daily_histogram(Map::from_iter([(
            config::AGG_REGIONS_V1.to_string(),
            Value::Object(regions),
        )]))
    }

    /// Daily histogram of region terms where both levels also carry an
    /// engine-computed `avgPrice` derived from the sibling sums.
    pub fn aggregation_v2(&self) -> Value {
        let mut region_aggs = self.sums();
        region_aggs.insert(config::AGG_AVG_PRICE.to_string(), avg_price_script());

        let mut regions = self.region_terms();
        regions.insert("aggs".to_string(), Value::Object(region_aggs));

        let mut day_aggs = Map::new();
        day_aggs.insert(config::AGG_REGIONS.to_string(), Value::Object(regions));
        day_aggs.extend(self.sums());
        day_aggs.insert(config::AGG_AVG_PRICE.to_string(), avg_price_script());

        self.daily_histogram(day_aggs)
    }

    pub fn aggregation(&self, strategy: Strategy) -> Value {
        match strategy {
            Strategy::V1 => self.aggregation_v1(),
            Strategy::V2 => self.aggregation_v2(),
        }
    }

    /// Build the full request body.
    ///
    /// Returns `(aggregation_name, body)`. The engine answers with the tree
    /// under `aggregations.<aggregation_name>`. No raw documents are requested.
    pub fn build(&self, filter: &PriceFilter, strategy: Strategy) -> (String, Value) {
        let name = aggregation_name(strategy);
        let body = json!({
            "size": 0,
            "query": self.filter(filter),
            "aggs": { name: self.aggregation(strategy) }
        });
        (name.to_string(), body)
    }

    fn daily_histogram(&self, aggs: Map<String, Value>) -> Value {
        json!({
            "date_histogram": {
                "field": self.date_field,
                "calendar_interval": "day",
                "format": config::DATE_FORMAT,
                "min_doc_count": 1
            },
            "aggs": Value::Object(aggs)
        })
    }

    fn region_terms(&self) -> Map<String, Value> {
        Map::from_iter([(
            "terms".to_string(),
            json!({ "field": self.region_field, "size": self.region_size }),
        )])
    }

    fn sums(&self) -> Map<String, Value> {
        Map::from_iter([
            (
                config::AGG_SUM_PRICE.to_string(),
                json!({ "sum": { "field": self.price_field } }),
            ),
            (
                config::AGG_SUM_AREA.to_string(),
                json!({ "sum": { "field": self.area_field } }),
            ),
        ])
    }
}

/// Name of the top-level aggregation for a strategy.
pub fn aggregation_name(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::V1 => config::AGG_BY_DAY,
        Strategy::V2 => config::AGG_PER_DAY,
    }
}

fn avg_price_script() -> Value {
    json!({
        "bucket_script": {
            "buckets_path": {
                "A": config::AGG_SUM_PRICE,
                "B": config::AGG_SUM_AREA
            },
            "script": config::AVG_PRICE_SCRIPT
        }
    })
}
