//! Shared test fixtures for the estate price SDK integration tests.
//!
//! Provides builders for aggregation response trees shaped the way
//! Elasticsearch returns them for the `by_day` (V1) and `per_day` (V2)
//! aggregations, and a [`StubBackend`] that answers searches with a canned
//! tree while recording the requests it received. [`serve`] runs a stub
//! `_search` endpoint for tests of the HTTP boundary.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing, Json, Router};
use estate_price_sdk::{EstateError, Result, SearchBackend};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Route SDK logs to the captured test output. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("estate_price_sdk=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// `(region, doc_count, sum_price, sum_area)`
pub type Region<'a> = (&'a str, u64, f64, f64);

/// `(date, regions)`
pub type Day<'a> = (&'a str, &'a [Region<'a>]);

pub fn epoch_millis(date: &str) -> i64 {
    // Only used as the histogram's numeric key; any stable value will do.
    date.bytes().fold(0i64, |acc, b| acc * 31 + b as i64)
}

/// A `by_day` tree: day buckets whose `a` terms aggregation carries raw sums.
pub fn v1_tree(days: &[Day<'_>]) -> Value {
    let buckets: Vec<Value> = days
        .iter()
        .map(|(date, regions)| {
            let region_buckets: Vec<Value> = regions
                .iter()
                .map(|(key, count, price, area)| {
                    json!({
                        "key": key,
                        "doc_count": count,
                        "sumPrice": { "value": price },
                        "sumArea": { "value": area }
                    })
                })
                .collect();
            json!({
                "key_as_string": date,
                "key": epoch_millis(date),
                "doc_count": regions.iter().map(|r| r.1).sum::<u64>(),
                "a": {
                    "doc_count_error_upper_bound": 0,
                    "sum_other_doc_count": 0,
                    "buckets": region_buckets
                }
            })
        })
        .collect();
    json!({ "buckets": buckets })
}

/// A `per_day` tree: same data with `bucket_script` averages at both levels.
///
/// Regions with zero area get no `avgPrice`, as the engine skips the script
/// when it cannot produce a value.
pub fn v2_tree(days: &[Day<'_>]) -> Value {
    let buckets: Vec<Value> = days
        .iter()
        .map(|(date, regions)| {
            let region_buckets: Vec<Value> = regions
                .iter()
                .map(|(key, count, price, area)| {
                    let mut bucket = json!({
                        "key": key,
                        "doc_count": count,
                        "sumPrice": { "value": price },
                        "sumArea": { "value": area }
                    });
                    if *area != 0.0 {
                        bucket["avgPrice"] = json!({ "value": price / area * 10000.0 });
                    }
                    bucket
                })
                .collect();
            let day_price: f64 = regions.iter().map(|r| r.2).sum();
            let day_area: f64 = regions.iter().map(|r| r.3).sum();
            json!({
                "key_as_string": date,
                "key": epoch_millis(date),
                "doc_count": regions.iter().map(|r| r.1).sum::<u64>(),
                "regions": {
                    "doc_count_error_upper_bound": 0,
                    "sum_other_doc_count": 0,
                    "buckets": region_buckets
                },
                "sumPrice": { "value": day_price },
                "sumArea": { "value": day_area },
                "avgPrice": { "value": day_price / day_area * 10000.0 }
            })
        })
        .collect();
    json!({ "buckets": buckets })
}

// TotalPrice is in units of 10000, so 200 over 100 area units is 20000 per unit.
const FIRST_DAY: &[Region<'static>] = &[("A", 5, 200.0, 100.0), ("B", 3, 90.0, 100.0)];

const SECOND_DAY: &[Region<'static>] = &[
    ("B", 6, 30.0, 300.0),
    ("C", 4, 250.0, 50.0),
    ("A", 2, 120.0, 60.0),
];

/// Two days of sample data. Region ordering mimics the engine: by
/// document count, not by price.
pub fn sample_days() -> Vec<Day<'static>> {
    vec![("2020-05-01", FIRST_DAY), ("2020-05-02", SECOND_DAY)]
}

/// Wrap an aggregation tree in a full `_search` response envelope.
pub fn envelope(name: &str, tree: Value) -> Value {
    json!({
        "took": 3,
        "timed_out": false,
        "_shards": { "total": 1, "successful": 1, "skipped": 0, "failed": 0 },
        "hits": { "total": { "value": 0, "relation": "eq" }, "max_score": null, "hits": [] },
        "aggregations": { name: tree }
    })
}

// ---------------------------------------------------------------------------
// StubBackend
// ---------------------------------------------------------------------------

/// What the stub answers with.
pub enum Reply {
    Tree(Value),
    Fail { status: u16, reason: String },
}

/// One recorded `search` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub body: Value,
    pub aggregation: String,
    pub timeout: Option<Duration>,
}

pub struct StubBackend {
    reply: Reply,
    pub calls: Mutex<Vec<Call>>,
}

impl StubBackend {
    pub fn tree(tree: Value) -> Self {
        Self {
            reply: Reply::Tree(tree),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16, reason: &str) -> Self {
        Self {
            reply: Reply::Fail {
                status,
                reason: reason.to_string(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl SearchBackend for StubBackend {
    fn search(
        &self,
        body: &Value,
        aggregation: &str,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push(Call {
            body: body.clone(),
            aggregation: aggregation.to_string(),
            timeout,
        });
        match &self.reply {
            Reply::Tree(tree) => Ok(tree.clone()),
            Reply::Fail { status, reason } => Err(EstateError::QueryFailed {
                status: *status,
                reason: reason.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Stub search server
// ---------------------------------------------------------------------------

/// Canned answer of the stub `_search` endpoint.
pub struct Canned {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    /// `(index, request body)` of every request received.
    pub requests: Mutex<Vec<(String, Value)>>,
}

impl Canned {
    pub fn json(status: u16, body: Value) -> Self {
        Self::text(status, &body.to_string())
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

async fn search_handler(
    State(canned): State<Arc<Canned>>,
    Path(index): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    canned.requests.lock().unwrap().push((index, body));
    if !canned.delay.is_zero() {
        tokio::time::sleep(canned.delay).await;
    }
    let status = StatusCode::from_u16(canned.status).unwrap();
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body.clone(),
    )
        .into_response()
}

/// Serve `canned` on `POST /{index}/_search` from a background runtime and
/// return the base URL.
///
/// The server lives on its own thread so the blocking client under test
/// never runs inside an async context.
pub fn serve(canned: Arc<Canned>) -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("Failed to build stub server runtime.");
        rt.block_on(async move {
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind stub server.");
            tx.send(listener.local_addr().expect("Failed to read stub server address."))
                .expect("Failed to report stub server address.");
            let app = Router::new()
                .route("/{index}/_search", routing::post(search_handler))
                .with_state(canned);
            let _ = axum::serve(listener, app).await;
        });
    });
    let addr = rx.recv().expect("Stub server did not start.");
    format!("http://{addr}")
}
