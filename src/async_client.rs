//! Async wrapper around [`EstatePriceSdk`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all SDK operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free while
//! the engine round-trip is in flight.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use estate_price_sdk::AsyncEstatePriceSdk;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sdk = AsyncEstatePriceSdk::builder().index("lianjia").build().await.unwrap();
//!
//!     let days = sdk
//!         .avg_price_search_v2("Region", "pudong", "2020-05-01", "2020-05-31")
//!         .await
//!         .unwrap();
//!
//!     // Give up on the call after two seconds.
//!     let days = sdk
//!         .run_with_deadline(Duration::from_secs(2), |s| {
//!             s.avg_price_search("Region", "pudong", "2020-05-01", "2020-05-31")
//!         })
//!         .await;
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::{EstateError, Result};
use crate::models::ResultSet;
use crate::{EstatePriceSdk, EstatePriceSdkBuilder};

// ---------------------------------------------------------------------------
// AsyncEstatePriceSdkBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing an [`AsyncEstatePriceSdk`] instance.
#[derive(Debug, Clone, Default)]
pub struct AsyncEstatePriceSdkBuilder {
    inner: EstatePriceSdkBuilder,
}

impl AsyncEstatePriceSdkBuilder {
    /// Start from the environment, see [`EstatePriceSdkBuilder::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            inner: EstatePriceSdkBuilder::from_env()?,
        })
    }

    /// Set the cluster URL.
    pub fn base_url(mut self, url: &str) -> Self {
        self.inner = self.inner.base_url(url);
        self
    }

    /// Set the listing index name.
    pub fn index(mut self, index: &str) -> Self {
        self.inner = self.inner.index(index);
        self
    }

    /// Set the default HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Build the async SDK.
    ///
    /// The blocking HTTP client is created on the blocking thread pool so
    /// it never touches the async event loop.
    pub async fn build(self) -> Result<AsyncEstatePriceSdk> {
        tokio::task::spawn_blocking(move || {
            let sdk = self.inner.build()?;
            Ok(AsyncEstatePriceSdk {
                inner: Arc::new(sdk),
            })
        })
        .await
        .map_err(|e| EstateError::Task(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// AsyncEstatePriceSdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`EstatePriceSdk`].
///
/// All operations are dispatched to a blocking thread pool via
/// [`tokio::task::spawn_blocking`]. Cloning is cheap and clones share the
/// same connection.
#[derive(Debug, Clone)]
pub struct AsyncEstatePriceSdk {
    inner: Arc<EstatePriceSdk>,
}

impl AsyncEstatePriceSdk {
    /// Create a new builder for configuring the async SDK.
    pub fn builder() -> AsyncEstatePriceSdkBuilder {
        AsyncEstatePriceSdkBuilder::default()
    }

    /// Run a sync SDK operation on the blocking thread pool.
    ///
    /// The closure receives an `&EstatePriceSdk` reference and should return
    /// a `Result<T>`.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&EstatePriceSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&sdk))
            .await
            .map_err(|e| EstateError::Task(e.to_string()))?
    }

    /// Like [`run()`](Self::run), but fails with [`EstateError::Timeout`]
    /// once `deadline` has elapsed.
    ///
    /// The blocking task is detached, not killed; it finishes in the
    /// background and its result is discarded. Combine with
    /// [`PriceQuery::timeout`](crate::queries::PriceQuery::timeout) to also
    /// abort the HTTP request itself.
    pub async fn run_with_deadline<F, T>(&self, deadline: Duration, f: F) -> Result<T>
    where
        F: FnOnce(&EstatePriceSdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(deadline, self.run(f)).await {
            Ok(result) => result,
            Err(_) => Err(EstateError::Timeout(deadline)),
        }
    }

    /// Async [`EstatePriceSdk::avg_price_search`].
    pub async fn avg_price_search(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        let (field, value) = (field.to_string(), value.to_string());
        let (start, end) = (start_date.to_string(), end_date.to_string());
        self.run(move |s| s.avg_price_search(&field, &value, &start, &end))
            .await
    }

    /// Async [`EstatePriceSdk::avg_price_search_v2`].
    pub async fn avg_price_search_v2(
        &self,
        field: &str,
        value: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultSet> {
        let (field, value) = (field.to_string(), value.to_string());
        let (start, end) = (start_date.to_string(), end_date.to_string());
        self.run(move |s| s.avg_price_search_v2(&field, &value, &start, &end))
            .await
    }
}
