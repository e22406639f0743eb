//! Unit tests for search request construction.

use estate_price_sdk::query_builder::aggregation_name;
use estate_price_sdk::{PriceFilter, QueryBuilder, Strategy};
use serde_json::json;

fn filter() -> PriceFilter {
    PriceFilter::new("Region", "pudong", "2020-05-01", "2020-05-31")
}

// ---------------------------------------------------------------------------
// Predicate
// ---------------------------------------------------------------------------

#[test]
fn filter_combines_term_and_inclusive_range() {
    let query = QueryBuilder::new().filter(&filter());
    assert_eq!(
        query,
        json!({
            "bool": {
                "must": [ { "term": { "Region": "pudong" } } ],
                "filter": [
                    { "range": { "Date": { "gte": "2020-05-01" } } },
                    { "range": { "Date": { "lte": "2020-05-31" } } }
                ]
            }
        })
    );
}

#[test]
fn filter_passes_values_through_uninterpreted() {
    let query = QueryBuilder::new().filter(&PriceFilter::new(
        "No.Such\"Field",
        "x",
        "not-a-date",
        "2020-13-45",
    ));
    assert_eq!(query["bool"]["must"][0]["term"]["No.Such\"Field"], "x");
    assert_eq!(query["bool"]["filter"][0]["range"]["Date"]["gte"], "not-a-date");
    assert_eq!(query["bool"]["filter"][1]["range"]["Date"]["lte"], "2020-13-45");
}

#[test]
fn custom_date_field_is_used_for_range_and_histogram() {
    let mut qb = QueryBuilder::new();
    qb.date_field("ListedOn");
    let query = qb.filter(&filter());
    assert!(query["bool"]["filter"][0]["range"].get("ListedOn").is_some());
    assert_eq!(qb.aggregation_v1()["date_histogram"]["field"], "ListedOn");
}

// ---------------------------------------------------------------------------
// Aggregations
// ---------------------------------------------------------------------------

#[test]
fn v1_nests_raw_sums_under_daily_region_terms() {
    let agg = QueryBuilder::new().aggregation_v1();
    assert_eq!(
        agg,
        json!({
            "date_histogram": {
                "field": "Date",
                "calendar_interval": "day",
                "format": "yyyy-MM-dd",
                "min_doc_count": 1
            },
            "aggs": {
                "a": {
                    "terms": { "field": "SubRegion.keyword", "size": 100 },
                    "aggs": {
                        "sumPrice": { "sum": { "field": "TotalPrice" } },
                        "sumArea": { "sum": { "field": "Area" } }
                    }
                }
            }
        })
    );
}

#[test]
fn v1_has_no_server_side_ratio() {
    let agg = QueryBuilder::new().aggregation_v1();
    assert!(agg.to_string().find("bucket_script").is_none());
}

#[test]
fn v2_adds_pipeline_ratio_at_region_and_day_level() {
    let agg = QueryBuilder::new().aggregation_v2();
    let script = json!({
        "bucket_script": {
            "buckets_path": { "A": "sumPrice", "B": "sumArea" },
            "script": "params.A / params.B * 10000"
        }
    });

    let day_aggs = &agg["aggs"];
    assert_eq!(day_aggs["avgPrice"], script);
    assert_eq!(day_aggs["sumPrice"], json!({ "sum": { "field": "TotalPrice" } }));
    assert_eq!(day_aggs["sumArea"], json!({ "sum": { "field": "Area" } }));

    let regions = &day_aggs["regions"];
    assert_eq!(regions["terms"], json!({ "field": "SubRegion.keyword", "size": 100 }));
    assert_eq!(regions["aggs"]["avgPrice"], script);
    assert_eq!(regions["aggs"]["sumPrice"], json!({ "sum": { "field": "TotalPrice" } }));
    assert_eq!(regions["aggs"]["sumArea"], json!({ "sum": { "field": "Area" } }));

    assert_eq!(agg["date_histogram"]["calendar_interval"], "day");
    assert_eq!(agg["date_histogram"]["format"], "yyyy-MM-dd");
}

#[test]
fn builder_overrides_fields_and_region_size() {
    let agg = QueryBuilder::new()
        .region_field("District.keyword")
        .price_field("Price")
        .area_field("Size")
        .region_size(10)
        .aggregation_v2();

    let regions = &agg["aggs"]["regions"];
    assert_eq!(regions["terms"]["field"], "District.keyword");
    assert_eq!(regions["terms"]["size"], 10);
    assert_eq!(regions["aggs"]["sumPrice"]["sum"]["field"], "Price");
    assert_eq!(agg["aggs"]["sumArea"]["sum"]["field"], "Size");
}

// ---------------------------------------------------------------------------
// Full request
// ---------------------------------------------------------------------------

#[test]
fn build_requests_no_documents_and_names_aggregation() {
    let (name, body) = QueryBuilder::new().build(&filter(), Strategy::V1);
    assert_eq!(name, "by_day");
    assert_eq!(body["size"], 0);
    assert_eq!(body["query"], QueryBuilder::new().filter(&filter()));
    assert_eq!(body["aggs"]["by_day"], QueryBuilder::new().aggregation_v1());
    assert_eq!(body["aggs"].as_object().unwrap().len(), 1);

    let (name, body) = QueryBuilder::new().build(&filter(), Strategy::V2);
    assert_eq!(name, "per_day");
    assert_eq!(body["aggs"]["per_day"], QueryBuilder::new().aggregation_v2());
    assert_eq!(body["aggs"].as_object().unwrap().len(), 1);
}

#[test]
fn aggregation_names_per_strategy() {
    assert_eq!(aggregation_name(Strategy::V1), "by_day");
    assert_eq!(aggregation_name(Strategy::V2), "per_day");
}
