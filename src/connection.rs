//! Elasticsearch HTTP connection and the search backend seam.
//!
//! [`SearchBackend`] is the only thing the pricing pipeline needs from the
//! engine: send a request body, get back the tree of one named aggregation.
//! [`Connection`] implements it over the `_search` REST endpoint.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{EstateError, Result};

/// Executes a search request and returns one aggregation result tree.
pub trait SearchBackend {
    /// Run `body` and return the tree stored under `aggregations.<aggregation>`.
    ///
    /// `timeout` overrides the backend's default request timeout.
    fn search(&self, body: &Value, aggregation: &str, timeout: Option<Duration>)
        -> Result<Value>;
}

/// Blocking HTTP connection to one Elasticsearch index.
///
/// The inner client is shared read-only, so one `Connection` can serve
/// concurrent calls.
#[derive(Debug, Clone)]
pub struct Connection {
    client: Client,
    base_url: String,
    index: String,
}

impl Connection {
    /// Create a connection to `index` on the cluster at `base_url`.
    pub fn new(base_url: &str, index: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EstateError::InvalidArgument(format!(
                "base URL must start with http:// or https://: {base_url:?}"
            )));
        }
        let index = index.trim();
        if index.is_empty() || index.contains('/') {
            return Err(EstateError::InvalidArgument(format!(
                "invalid index name: {index:?}"
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            index: index.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn search_url(&self) -> String {
        format!("{}/{}/_search", self.base_url, self.index)
    }

    /// POST `body` to `_search` and return the full response envelope.
    ///
    /// Any non-success status, engine error object or shard failure is
    /// reported as [`EstateError::QueryFailed`].
    pub fn execute(&self, body: &Value, timeout: Option<Duration>) -> Result<Value> {
        let url = self.search_url();
        debug!(%url, ?timeout, "sending search request");

        let mut request = self.client.post(&url).json(body);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }
        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            return Err(EstateError::QueryFailed {
                status: status.as_u16(),
                reason: error_reason(&text),
            });
        }

        let envelope: Value = serde_json::from_str(&text)?;
        check_envelope(&envelope, status.as_u16())?;
        Ok(envelope)
    }
}

impl SearchBackend for Connection {
    fn search(
        &self,
        body: &Value,
        aggregation: &str,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let mut envelope = self.execute(body, timeout)?;
        take_aggregation(&mut envelope, aggregation)
    }
}

/// Reject envelopes that carry an error, timed out in the engine or report
/// failed shards. Each of these would otherwise yield a partial result.
pub fn check_envelope(envelope: &Value, status: u16) -> Result<()> {
    if !envelope.is_object() {
        return Err(EstateError::QueryFailed {
            status,
            reason: "response is not a JSON object".to_string(),
        });
    }
    if let Some(err) = envelope.get("error") {
        return Err(EstateError::QueryFailed {
            status,
            reason: describe_error(err),
        });
    }

    if envelope.get("timed_out").and_then(Value::as_bool) == Some(true) {
        return Err(EstateError::QueryFailed {
            status,
            reason: "search timed out in the engine; aggregations are partial".to_string(),
        });
    }

    let failed = envelope
        .pointer("/_shards/failed")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if failed > 0 {
        let reason = envelope
            .pointer("/_shards/failures/0/reason")
            .map(describe_error)
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(EstateError::QueryFailed {
            status,
            reason: format!("{failed} shard(s) failed: {reason}"),
        });
    }
    Ok(())
}

/// Move the named aggregation tree out of a response envelope.
pub fn take_aggregation(envelope: &mut Value, aggregation: &str) -> Result<Value> {
    envelope
        .get_mut("aggregations")
        .and_then(|aggs| aggs.get_mut(aggregation))
        .map(Value::take)
        .ok_or_else(|| EstateError::MissingAggregation(aggregation.to_string()))
}

fn error_reason(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => v
            .get("error")
            .map(describe_error)
            .unwrap_or_else(|| v.to_string()),
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

fn describe_error(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let kind = obj.get("type").and_then(Value::as_str);
            let reason = obj.get("reason").and_then(Value::as_str);
            match (kind, reason) {
                (Some(k), Some(r)) => format!("{k}: {r}"),
                (None, Some(r)) => r.to_string(),
                (Some(k), None) => k.to_string(),
                (None, None) => err.to_string(),
            }
        }
        other => other.to_string(),
    }
}
