use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ranker;

// ---------------------------------------------------------------------------
// PriceRecord: Average price of one region on one day
// ---------------------------------------------------------------------------

/// Average listing price of one region on one day.
///
/// `average_price` is `Σ TotalPrice / Σ Area × 10000` over the listings the
/// engine grouped into the region bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceRecord {
    date: String,
    region: String,
    doc_count: u64,
    average_price: f64,
}

impl PriceRecord {
    pub fn new(
        date: impl Into<String>,
        region: impl Into<String>,
        doc_count: u64,
        average_price: f64,
    ) -> Self {
        Self {
            date: date.into(),
            region: region.into(),
            doc_count,
            average_price,
        }
    }

    /// Calendar day (`yyyy-MM-dd`).
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    pub fn average_price(&self) -> f64 {
        self.average_price
    }
}

impl fmt::Display for PriceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} avg={:.2} (n={})",
            self.date, self.region, self.average_price, self.doc_count
        )
    }
}

// ---------------------------------------------------------------------------
// DayBucket: Ranked region records for one day
// ---------------------------------------------------------------------------

/// Region records of a single day, highest average price first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    date: String,
    doc_count: u64,
    /// Whole-day average computed by the engine. Only present for V2.
    average_price: Option<f64>,
    records: Vec<PriceRecord>,
}

impl DayBucket {
    pub(crate) fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            doc_count: 0,
            average_price: None,
            records: Vec::new(),
        }
    }

    pub(crate) fn absorb(
        &mut self,
        doc_count: u64,
        average_price: Option<f64>,
        records: Vec<PriceRecord>,
    ) {
        self.doc_count += doc_count;
        if average_price.is_some() {
            self.average_price = average_price;
        }
        self.records.extend(records);
        ranker::rank_day(&mut self.records);
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Number of listings matched on this day across all regions.
    pub fn doc_count(&self) -> u64 {
        self.doc_count
    }

    pub fn average_price(&self) -> Option<f64> {
        self.average_price
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    /// The `n` most expensive regions of the day.
    pub fn top(&self, n: usize) -> &[PriceRecord] {
        &self.records[..n.min(self.records.len())]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PriceRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a DayBucket {
    type Item = &'a PriceRecord;
    type IntoIter = std::slice::Iter<'a, PriceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ---------------------------------------------------------------------------
// ResultSet: Date -> DayBucket
// ---------------------------------------------------------------------------

/// Ranked region averages keyed by day, in ascending date order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    days: BTreeMap<String, DayBucket>,
}

impl ResultSet {
    /// Merge one day's extracted regions into the set.
    ///
    /// Days without any region record are not materialized.
    pub(crate) fn insert_day(
        &mut self,
        date: &str,
        doc_count: u64,
        average_price: Option<f64>,
        records: Vec<PriceRecord>,
    ) {
        if records.is_empty() {
            return;
        }
        self.days
            .entry(date.to_string())
            .or_insert_with(|| DayBucket::new(date))
            .absorb(doc_count, average_price, records);
    }

    pub fn get(&self, date: &str) -> Option<&DayBucket> {
        self.days.get(date)
    }

    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.days.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, DayBucket> {
        self.days.iter()
    }

    /// All records, by date and then by rank within the day.
    pub fn records(&self) -> impl Iterator<Item = &PriceRecord> {
        self.days.values().flat_map(|day| day.records.iter())
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, DayBucket> {
        self.days
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = (&'a String, &'a DayBucket);
    type IntoIter = btree_map::Iter<'a, String, DayBucket>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.iter()
    }
}
