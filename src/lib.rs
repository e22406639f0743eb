//! Estate price SDK for Rust.
//!
//! Computes per-day, per-region average listing prices from a real-estate
//! index in Elasticsearch and ranks the regions of each day by that average.
//! The engine does the grouping and summing; the SDK builds the aggregation
//! request, decodes the nested response into typed records and orders them.
//!
//! # Quick start
//!
//! ```no_run
//! use estate_price_sdk::EstatePriceSdk;
//!
//! let sdk = EstatePriceSdk::builder()
//!     .base_url("http://localhost:9200")
//!     .index("lianjia")
//!     .build()
//!     .unwrap();
//!
//! let days = sdk
//!     .prices()
//!     .avg_price_search("Region", "pudong", "2020-05-01", "2020-05-31")
//!     .unwrap();
//!
//! for (date, day) in &days {
//!     if let Some(best) = day.records().first() {
//!         println!("{date}: {best}");
//!     }
//! }
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod connection;
pub mod error;
pub mod models;
pub mod queries;
pub mod query_builder;
pub mod ranker;
pub mod walker;

#[cfg(feature = "async")]
pub use async_client::AsyncEstatePriceSdk;
pub use connection::{Connection, SearchBackend};
pub use error::{EstateError, Result};
pub use models::{DayBucket, PriceFilter, PriceRecord, ResultSet, Strategy};
pub use query_builder::QueryBuilder;
pub use walker::{extract, extract_v1, extract_v2};

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// EstatePriceSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`EstatePriceSdk`] instance.
///
/// Use [`EstatePriceSdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](EstatePriceSdkBuilder::build) to create the SDK.
#[derive(Debug, Clone)]
pub struct EstatePriceSdkBuilder {
    base_url: String,
    index: String,
    timeout: Duration,
}

impl Default for EstatePriceSdkBuilder {
    fn default() -> Self {
        Self {
            base_url: config::DEFAULT_BASE_URL.to_string(),
            index: config::DEFAULT_INDEX.to_string(),
            timeout: config::DEFAULT_TIMEOUT,
        }
    }
}

impl EstatePriceSdkBuilder {
    /// Start from the defaults, overridden by `ESTATE_ELASTIC_URL`,
    /// `ESTATE_ELASTIC_INDEX` and `ESTATE_TIMEOUT_SECS` when they are set.
    ///
    /// Fails if `ESTATE_TIMEOUT_SECS` is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::default();
        if let Some(url) = config::env_var(config::ENV_BASE_URL) {
            builder.base_url = url;
        }
        if let Some(index) = config::env_var(config::ENV_INDEX) {
            builder.index = index;
        }
        if let Some(secs) = config::env_var(config::ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.parse().map_err(|_| {
                EstateError::InvalidArgument(format!(
                    "{} must be a whole number of seconds, got {secs:?}",
                    config::ENV_TIMEOUT_SECS
                ))
            })?;
            builder.timeout = Duration::from_secs(secs);
        }
        Ok(builder)
    }

    /// Set the cluster URL. Defaults to `http://localhost:9200`.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Set the listing index name.
    pub fn index(mut self, index: &str) -> Self {
        self.index = index.to_string();
        self
    }

    /// Set the default HTTP request timeout.
    ///
    /// Defaults to 30 seconds. Individual queries can override it with
    /// [`PriceQuery::timeout`](queries::PriceQuery::timeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the SDK. No request is sent until the first query.
    pub fn build(self) -> Result<EstatePriceSdk> {
        let conn = Connection::new(&self.base_url, &self.index, self.timeout)?;
        Ok(EstatePriceSdk { conn })
    }
}

// ---------------------------------------------------------------------------
// EstatePriceSdk
// ---------------------------------------------------------------------------

/// The main entry point for the estate price SDK.
///
/// Wraps a [`Connection`] and exposes query interfaces as lightweight
/// borrowing wrappers. Safe to share between threads.
#[derive(Debug, Clone)]
pub struct EstatePriceSdk {
    conn: Connection,
}

impl EstatePriceSdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> EstatePriceSdkBuilder {
        EstatePriceSdkBuilder::default()
    }

    /// Access the average-price query interface.
    pub fn prices(&self) -> queries::PriceQuery<'_> {
        queries::PriceQuery::new(&self.conn)
    }

    /// Per-day region averages with client-side ratios (strategy V1).
    pub fn avg_price_search(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        self.prices()
            .avg_price_search(field, value, start_date, end_date)
    }

    /// Per-day region averages with engine-computed ratios (strategy V2).
    pub fn avg_price_search_v2(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        self.prices()
            .avg_price_search_v2(field, value, start_date, end_date)
    }

    /// Return a reference to the underlying [`Connection`].
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl fmt::Display for EstatePriceSdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EstatePriceSdk(base_url={}, index={})",
            self.conn.base_url(),
            self.conn.index()
        )
    }
}
