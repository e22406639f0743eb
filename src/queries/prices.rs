//! Average-price queries against the listing index.

use std::time::Duration;

use tracing::debug;

use crate::connection::{Connection, SearchBackend};
use crate::error::Result;
use crate::models::{PriceFilter, ResultSet, Strategy};
use crate::query_builder::QueryBuilder;
use crate::walker;

// ---------------------------------------------------------------------------
// PriceQuery
// ---------------------------------------------------------------------------

/// Query interface for per-day regional average prices.
///
/// Each call issues exactly one search request and walks its response to
/// completion. A request is either entirely V1 or entirely V2.
pub struct PriceQuery<'a, B: SearchBackend + ?Sized = Connection> {
    backend: &'a B,
    builder: QueryBuilder,
    timeout: Option<Duration>,
}

impl<'a, B: SearchBackend + ?Sized> PriceQuery<'a, B> {
    /// Create a new `PriceQuery` bound to the given backend.
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            builder: QueryBuilder::new(),
            timeout: None,
        }
    }

    /// Use a customized [`QueryBuilder`] (field names, region count).
    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Abort the engine round-trip if it takes longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `filter` with the given strategy end to end.
    pub fn search(&self, filter: &PriceFilter, strategy: Strategy) -> Result<ResultSet> {
        let (aggregation, body) = self.builder.build(filter, strategy);
        debug!(
            %strategy,
            field = %filter.field,
            value = %filter.value,
            start = %filter.start_date,
            end = %filter.end_date,
            "average price search"
        );

        let tree = self.backend.search(&body, &aggregation, self.timeout)?;
        walker::extract(&tree, strategy)
    }

    /// Daily region averages computed client-side from raw sums, rounded to
    /// two decimals.
    pub fn avg_price_search(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        self.search(
            &PriceFilter::new(field, value, start_date, end_date),
            Strategy::V1,
        )
    }

    /// Daily region averages computed by the engine's pipeline aggregation.
    ///
    /// Day buckets also carry the engine's whole-day average.
    pub fn avg_price_search_v2(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        self.search(
            &PriceFilter::new(field, value, start_date, end_date),
            Strategy::V2,
        )
    }
}
