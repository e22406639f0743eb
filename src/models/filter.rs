use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PriceFilter: Equality + inclusive date range
// ---------------------------------------------------------------------------

/// Listing filter: `field == value` and `start_date <= Date <= end_date`.
///
/// Nothing is validated here. Unknown fields simply match no documents and
/// malformed dates are rejected by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PriceFilter {
    pub field: String,
    pub value: String,
    pub start_date: String,
    pub end_date: String,
}

impl PriceFilter {
    pub fn new(
        field: impl Into<String>,
        value: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Where the region average comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Engine returns raw sums; the ratio is computed and rounded client-side.
    V1,
    /// Engine computes the ratio with a `bucket_script` pipeline aggregation.
    V2,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::V1 => f.write_str("v1"),
            Strategy::V2 => f.write_str("v2"),
        }
    }
}
