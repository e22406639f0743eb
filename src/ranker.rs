//! Per-day ranking of region records.

use crate::models::PriceRecord;

/// Order one day's records by descending average price.
///
/// The sort is stable: records with equal averages keep the order in which
/// the engine returned their buckets.
pub fn rank_day(records: &mut [PriceRecord]) {
    records.sort_by(|a, b| b.average_price().total_cmp(&a.average_price()));
}

/// Whether `records` is non-increasing by average price.
pub fn is_ranked(records: &[PriceRecord]) -> bool {
    records
        .windows(2)
        .all(|pair| pair[0].average_price() >= pair[1].average_price())
}
