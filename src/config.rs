use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9200";
pub const DEFAULT_INDEX: &str = "lianjia";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_BASE_URL: &str = "ESTATE_ELASTIC_URL";
pub const ENV_INDEX: &str = "ESTATE_ELASTIC_INDEX";
pub const ENV_TIMEOUT_SECS: &str = "ESTATE_TIMEOUT_SECS";

// Listing document schema
pub const DATE_FIELD: &str = "Date";
pub const REGION_FIELD: &str = "SubRegion.keyword";
pub const PRICE_FIELD: &str = "TotalPrice";
pub const AREA_FIELD: &str = "Area";

pub const DATE_FORMAT: &str = "yyyy-MM-dd";
pub const REGION_TERMS_SIZE: usize = 100;

/// Multiplier turning `price / area` into the published unit.
pub const PRICE_SCALE: f64 = 10000.0;

// Aggregation names, chosen by us and echoed back by the engine.
pub const AGG_BY_DAY: &str = "by_day";
pub const AGG_PER_DAY: &str = "per_day";
pub const AGG_REGIONS_V1: &str = "a";
pub const AGG_REGIONS: &str = "regions";
pub const AGG_SUM_PRICE: &str = "sumPrice";
pub const AGG_SUM_AREA: &str = "sumArea";
pub const AGG_AVG_PRICE: &str = "avgPrice";

pub const AVG_PRICE_SCRIPT: &str = "params.A / params.B * 10000";

/// Read a non-empty environment variable.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
