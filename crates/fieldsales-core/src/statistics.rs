//! # Statistics Module
//!
//! Rolls filtered sales up into per-product and per-franchise summaries and
//! a zero-filled daily series.
//!
//! ## Grouping Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     aggregate(facts)                                    │
//! │                                                                         │
//! │  SaleFact ──► explode lines ──► (product, franchise, sale) rows         │
//! │                                        │                                │
//! │                  Stage 1: group by (product, franchise, sale)           │
//! │                                        │                                │
//! │                  Stage 2: group by (product, franchise)                 │
//! │                           count = distinct sales                        │
//! │                                        │                                │
//! │                  Stage 3: group by franchise ──► productwise_sales      │
//! │                                                                         │
//! │  Separately: global per-product totals, distinct sale count, and        │
//! │  franchise totals that add each sale's amount exactly once.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Facts arrive already filtered (date range, franchise, product, retailer,
//! salesman) by the repository layer.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::ValidationError;
use crate::geo::GeoPoint;
use crate::money::Money;
use crate::types::{FranchiseRef, SaleLine};
use crate::validation::ValidationResult;
use crate::UNKNOWN_FRANCHISE;

/// Longest daily series a single request may ask for.
pub const MAX_SERIES_DAYS: i64 = 366;

/// Default graph window when no range is supplied.
pub const DEFAULT_SERIES_DAYS: i64 = 7;

// =============================================================================
// Input
// =============================================================================

/// One sale as seen by the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFact {
    pub sale_id: String,
    pub retailer_id: String,
    pub amount: Money,
    pub lines: Vec<SaleLine>,
    pub location: GeoPoint,
    /// `None` when the salesman has no franchise.
    pub franchise: Option<FranchiseRef>,
    pub created_at: DateTime<Utc>,
}

impl SaleFact {
    /// Returns why this fact cannot be aggregated, if anything.
    fn defect(&self) -> Option<&'static str> {
        if self.retailer_id.trim().is_empty() {
            Some("missing retailer")
        } else if self.lines.is_empty() {
            Some("no product lines")
        } else if self.amount.is_negative() {
            Some("negative amount")
        } else if !self.location.is_finite() {
            Some("non-finite coordinates")
        } else {
            None
        }
    }

    fn is_aggregatable(&self) -> bool {
        match self.defect() {
            None => true,
            Some(reason) => {
                warn!(sale_id = %self.sale_id, reason, "Skipping sale in statistics");
                false
            }
        }
    }

    /// Drops every line except `product` and re-derives the amount from
    /// what is left. Returns `false` when the sale has no such line.
    pub fn retain_product(&mut self, product: &str) -> bool {
        self.lines.retain(|line| line.product == product);
        self.amount = self.lines.iter().map(|line| line.line_total).sum();
        !self.lines.is_empty()
    }
}

/// Narrows facts to one product, so totals and breakdowns only report that
/// product's lines.
pub fn restrict_to_product(facts: &mut Vec<SaleFact>, product: &str) {
    facts.retain_mut(|fact| fact.retain_product(product));
}

// =============================================================================
// Output
// =============================================================================

/// Global totals for one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductTotals {
    pub quantity: i64,
    pub sales_amount: Money,
    /// Distinct sales containing the product.
    pub count: u64,
}

/// One product's totals inside a franchise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBreakdown {
    pub product: String,
    pub quantity: i64,
    pub sales_amount: Money,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FranchiseStatistics {
    /// Franchise name, or `"Unknown"` for salesmen without one.
    pub franchise: String,
    pub franchise_id: Option<String>,
    pub total_sale_amount: Money,
    pub total_count: u64,
    pub productwise_sales: Vec<ProductBreakdown>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStatistics {
    pub total_amount: Money,
    pub total_count: u64,
    pub products: BTreeMap<String, ProductTotals>,
    pub franchises: Vec<FranchiseStatistics>,
}

/// One 24-hour window of the daily series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayBucket {
    /// `YYYY-MM-DD` of the window start.
    pub date: String,
    pub window_start: DateTime<Utc>,
    pub total_amount: Money,
    pub count: u64,
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive creation-time filter. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

enum Bound {
    Date(NaiveDate),
    Instant(DateTime<Utc>),
}

fn parse_bound(field: &str, raw: &str) -> ValidationResult<Bound> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Bound::Date(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Bound::Instant(dt.with_timezone(&Utc)))
        .map_err(|_| ValidationError::invalid_format(field, "expected YYYY-MM-DD or an RFC 3339 timestamp"))
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

impl DateRange {
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// The whole UTC day containing `date`.
    pub fn whole_day(date: NaiveDate) -> Self {
        DateRange::new(start_of_day(date), end_of_day(date))
    }

    /// Resolves `startDate` / `endDate` query parameters.
    ///
    /// ## Rules
    /// - identical start and end → that whole UTC day
    /// - otherwise both bounds are raw: a date-only value is 00:00:00.000 of
    ///   that day, so `endDate=2024-03-05` stops at the start of March 5th
    /// - RFC 3339 timestamps are used as given
    ///
    /// ## Example
    /// ```rust
    /// use fieldsales_core::statistics::DateRange;
    ///
    /// let range = DateRange::resolve(Some("2024-03-05"), Some("2024-03-05")).unwrap();
    /// assert_eq!(range.start.unwrap().to_rfc3339(), "2024-03-05T00:00:00+00:00");
    /// assert_eq!(range.end.unwrap().to_rfc3339(), "2024-03-05T23:59:59.999+00:00");
    /// ```
    pub fn resolve(start: Option<&str>, end: Option<&str>) -> ValidationResult<Self> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let end = end.map(str::trim).filter(|s| !s.is_empty());

        if let (Some(s), Some(e)) = (start, end) {
            if s == e {
                let date = match parse_bound("startDate", s)? {
                    Bound::Date(date) => date,
                    Bound::Instant(instant) => instant.date_naive(),
                };
                return Ok(DateRange::whole_day(date));
            }
        }

        let start = start
            .map(|s| parse_bound("startDate", s))
            .transpose()?
            .map(|b| match b {
                Bound::Date(date) => start_of_day(date),
                Bound::Instant(instant) => instant,
            });

        let end = end
            .map(|e| parse_bound("endDate", e))
            .transpose()?
            .map(|b| match b {
                Bound::Date(date) => start_of_day(date),
                Bound::Instant(instant) => instant,
            });

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ValidationError::invalid_format(
                    "startDate",
                    "must not be after endDate",
                ));
            }
        }

        Ok(DateRange { start, end })
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

// =============================================================================
// Aggregation
// =============================================================================

type FranchiseKey = Option<String>;

#[derive(Default)]
struct LineSums {
    quantity: i64,
    amount: Money,
}

#[derive(Default)]
struct ProductFranchiseSums {
    quantity: i64,
    amount: Money,
    sales: u64,
}

#[derive(Default)]
struct FranchiseAccumulator {
    label: String,
    amount: Money,
    sales: HashSet<String>,
}

/// Rolls sale facts up into product and franchise summaries.
///
/// Facts with defects (empty retailer, no lines, negative amount,
/// non-finite coordinates) are skipped with a warning.
pub fn aggregate(facts: &[SaleFact]) -> SalesStatistics {
    let facts: Vec<&SaleFact> = facts.iter().filter(|f| f.is_aggregatable()).collect();

    // Stage 1: (product, franchise, sale)
    let mut by_sale: BTreeMap<(String, FranchiseKey, String), LineSums> = BTreeMap::new();
    let mut franchises: HashMap<FranchiseKey, FranchiseAccumulator> = HashMap::new();
    let mut sale_ids: HashSet<&str> = HashSet::new();
    let mut total_amount = Money::zero();

    for fact in &facts {
        let key: FranchiseKey = fact.franchise.as_ref().map(|f| f.id.clone());

        let entry = franchises.entry(key.clone()).or_insert_with(|| FranchiseAccumulator {
            label: fact
                .franchise
                .as_ref()
                .map(|f| f.name.clone())
                .unwrap_or_else(|| UNKNOWN_FRANCHISE.to_string()),
            ..Default::default()
        });
        if entry.sales.insert(fact.sale_id.clone()) {
            entry.amount += fact.amount;
        }

        if sale_ids.insert(fact.sale_id.as_str()) {
            total_amount += fact.amount;
        }

        for line in &fact.lines {
            let sums = by_sale
                .entry((line.product.clone(), key.clone(), fact.sale_id.clone()))
                .or_default();
            sums.quantity = sums.quantity.saturating_add(line.quantity);
            sums.amount += line.line_total;
        }
    }

    // Stage 2: (product, franchise), counting distinct sales
    let mut by_product_franchise: BTreeMap<(String, FranchiseKey), ProductFranchiseSums> =
        BTreeMap::new();
    for ((product, franchise, _sale), sums) in by_sale {
        let entry = by_product_franchise.entry((product, franchise)).or_default();
        entry.quantity = entry.quantity.saturating_add(sums.quantity);
        entry.amount += sums.amount;
        entry.sales += 1;
    }

    // Stage 3: franchise breakdowns plus global product totals
    let mut products: BTreeMap<String, ProductTotals> = BTreeMap::new();
    let mut breakdowns: HashMap<FranchiseKey, Vec<ProductBreakdown>> = HashMap::new();
    for ((product, franchise), sums) in by_product_franchise {
        let global = products.entry(product.clone()).or_default();
        global.quantity = global.quantity.saturating_add(sums.quantity);
        global.sales_amount += sums.amount;
        global.count += sums.sales;

        breakdowns.entry(franchise).or_default().push(ProductBreakdown {
            product,
            quantity: sums.quantity,
            sales_amount: sums.amount,
            count: sums.sales,
        });
    }

    let mut franchise_stats: Vec<FranchiseStatistics> = franchises
        .into_iter()
        .map(|(key, acc)| {
            let mut productwise_sales = breakdowns.remove(&key).unwrap_or_default();
            productwise_sales.sort_by(|a, b| {
                b.sales_amount
                    .cmp(&a.sales_amount)
                    .then_with(|| a.product.cmp(&b.product))
            });
            FranchiseStatistics {
                franchise: acc.label,
                franchise_id: key,
                total_sale_amount: acc.amount,
                total_count: acc.sales.len() as u64,
                productwise_sales,
            }
        })
        .collect();

    franchise_stats.sort_by(|a, b| {
        b.total_sale_amount
            .cmp(&a.total_sale_amount)
            .then_with(|| a.franchise.cmp(&b.franchise))
            .then_with(|| a.franchise_id.cmp(&b.franchise_id))
    });

    SalesStatistics {
        total_amount,
        total_count: sale_ids.len() as u64,
        products,
        franchises: franchise_stats,
    }
}

// =============================================================================
// Daily Series
// =============================================================================

/// Fills in open bounds of `range` for the graph.
///
/// Missing bounds default to the seven days ending on the latest sale's UTC
/// day. Returns `None` when a bound is missing and there are no sales.
pub fn series_window(
    range: &DateRange,
    latest_sale: Option<DateTime<Utc>>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let latest_day = latest_sale.map(|t| t.date_naive());

    let end = match (range.end, latest_day) {
        (Some(end), _) => end,
        (None, Some(day)) => end_of_day(day),
        (None, None) => return None,
    };

    let start = match (range.start, latest_day) {
        (Some(start), _) => start,
        (None, Some(day)) => start_of_day(day - Duration::days(DEFAULT_SERIES_DAYS - 1)),
        (None, None) => return None,
    };

    Some((start, end))
}

/// Partitions `[start, end]` into 24-hour windows anchored at `start`.
///
/// Every window is emitted, empty ones with zero totals.
pub fn time_series(
    facts: &[SaleFact],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ValidationResult<Vec<DayBucket>> {
    if end < start {
        return Ok(Vec::new());
    }

    let span_ms = (end - start).num_milliseconds();
    let day_ms = Duration::days(1).num_milliseconds();
    let windows = span_ms / day_ms + 1;

    if windows > MAX_SERIES_DAYS {
        return Err(ValidationError::OutOfRange {
            field: "date range (days)".to_string(),
            min: 1.0,
            max: MAX_SERIES_DAYS as f64,
        });
    }

    let mut buckets: Vec<DayBucket> = (0..windows)
        .map(|i| {
            let window_start = start + Duration::days(i);
            DayBucket {
                date: window_start.format("%Y-%m-%d").to_string(),
                window_start,
                total_amount: Money::zero(),
                count: 0,
            }
        })
        .collect();

    for fact in facts.iter().filter(|f| f.is_aggregatable()) {
        if fact.created_at < start || fact.created_at > end {
            continue;
        }
        let index = ((fact.created_at - start).num_milliseconds() / day_ms) as usize;
        if let Some(bucket) = buckets.get_mut(index) {
            bucket.total_amount += fact.amount;
            bucket.count += 1;
        }
    }

    Ok(buckets)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: &str, quantity: i64, unit_cents: i64) -> SaleLine {
        SaleLine {
            product: product.to_string(),
            quantity,
            unit_price: Money::from_cents(unit_cents),
            line_total: Money::from_cents(unit_cents * quantity),
        }
    }

    fn franchise(id: &str, name: &str) -> Option<FranchiseRef> {
        Some(FranchiseRef {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    fn fact(id: &str, lines: Vec<SaleLine>, franchise: Option<FranchiseRef>, at: &str) -> SaleFact {
        let amount = lines.iter().map(|l| l.line_total).sum();
        SaleFact {
            sale_id: id.to_string(),
            retailer_id: "r-1".to_string(),
            amount,
            lines,
            location: GeoPoint::new(0.0, 0.0),
            franchise,
            created_at: DateTime::parse_from_rfc3339(at).unwrap().with_timezone(&Utc),
        }
    }

    #[test]
    fn test_single_line_sales_product_sum_equals_total() {
        let facts = vec![
            fact("s1", vec![line("Tea", 2, 100)], franchise("f1", "North"), "2024-01-01T10:00:00Z"),
            fact("s2", vec![line("Sugar", 1, 500)], franchise("f2", "South"), "2024-01-01T11:00:00Z"),
            fact("s3", vec![line("Tea", 1, 100)], None, "2024-01-02T09:00:00Z"),
        ];

        let stats = aggregate(&facts);
        let product_sum: Money = stats.products.values().map(|p| p.sales_amount).sum();

        assert_eq!(stats.total_amount, Money::from_cents(800));
        assert_eq!(product_sum, stats.total_amount);
        assert_eq!(stats.total_count, 3);
    }

    #[test]
    fn test_multi_line_sale_counted_once() {
        let facts = vec![fact(
            "s1",
            vec![line("Tea", 2, 100), line("Sugar", 1, 500)],
            franchise("f1", "North"),
            "2024-01-01T10:00:00Z",
        )];

        let stats = aggregate(&facts);
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.total_amount, Money::from_cents(700));

        let north = &stats.franchises[0];
        assert_eq!(north.franchise, "North");
        assert_eq!(north.total_count, 1);
        assert_eq!(north.total_sale_amount, Money::from_cents(700));
        assert_eq!(north.productwise_sales.len(), 2);
        assert_eq!(north.productwise_sales[0].product, "Sugar");
    }

    #[test]
    fn test_product_count_is_distinct_sales() {
        let facts = vec![
            fact("s1", vec![line("Tea", 2, 100)], franchise("f1", "North"), "2024-01-01T10:00:00Z"),
            fact("s2", vec![line("Tea", 3, 100)], franchise("f1", "North"), "2024-01-01T12:00:00Z"),
            fact("s3", vec![line("Tea", 1, 100)], franchise("f2", "South"), "2024-01-01T12:00:00Z"),
        ];

        let stats = aggregate(&facts);
        let tea = stats.products["Tea"];
        assert_eq!(tea.quantity, 6);
        assert_eq!(tea.count, 3);
        assert_eq!(tea.sales_amount, Money::from_cents(600));

        let north = stats.franchises.iter().find(|f| f.franchise == "North").unwrap();
        assert_eq!(north.productwise_sales[0].count, 2);
        assert_eq!(north.productwise_sales[0].quantity, 5);
    }

    #[test]
    fn test_salesman_without_franchise_is_unknown() {
        let facts = vec![fact("s1", vec![line("Tea", 1, 100)], None, "2024-01-01T10:00:00Z")];
        let stats = aggregate(&facts);
        assert_eq!(stats.franchises.len(), 1);
        assert_eq!(stats.franchises[0].franchise, UNKNOWN_FRANCHISE);
        assert!(stats.franchises[0].franchise_id.is_none());
    }

    #[test]
    fn test_defective_facts_are_skipped() {
        let mut no_retailer = fact("s1", vec![line("Tea", 1, 100)], None, "2024-01-01T10:00:00Z");
        no_retailer.retailer_id = String::new();
        let no_lines = fact("s2", vec![], None, "2024-01-01T10:00:00Z");
        let mut nan = fact("s3", vec![line("Tea", 1, 100)], None, "2024-01-01T10:00:00Z");
        nan.location = GeoPoint::new(f64::NAN, 0.0);
        let good = fact("s4", vec![line("Tea", 1, 100)], None, "2024-01-01T10:00:00Z");

        let stats = aggregate(&[no_retailer, no_lines, nan, good]);
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.total_amount, Money::from_cents(100));
    }

    #[test]
    fn test_huge_amounts_saturate_instead_of_overflowing() {
        let half = 4_611_686_018_427_387_904;
        let facts = vec![
            fact("s1", vec![line("Tea", 1, half)], franchise("f1", "North"), "2024-01-01T10:00:00Z"),
            fact("s2", vec![line("Tea", 1, half)], franchise("f1", "North"), "2024-01-01T11:00:00Z"),
        ];

        let stats = aggregate(&facts);
        assert_eq!(stats.total_amount.cents(), i64::MAX);
        assert_eq!(stats.products["Tea"].sales_amount.cents(), i64::MAX);
        assert_eq!(stats.franchises[0].total_sale_amount.cents(), i64::MAX);
        assert_eq!(stats.total_count, 2);

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let series = time_series(&facts, start, start + Duration::hours(23)).unwrap();
        assert_eq!(series[0].total_amount.cents(), i64::MAX);
        assert_eq!(series[0].count, 2);
    }

    #[test]
    fn test_product_restriction_drops_other_lines() {
        let mut facts = vec![
            fact(
                "s1",
                vec![line("Tea", 2, 100), line("Sugar", 1, 500)],
                franchise("f1", "North"),
                "2024-01-01T10:00:00Z",
            ),
            fact("s2", vec![line("Sugar", 3, 500)], None, "2024-01-01T11:00:00Z"),
        ];

        restrict_to_product(&mut facts, "Tea");
        let stats = aggregate(&facts);

        assert_eq!(stats.products.len(), 1);
        assert_eq!(stats.products["Tea"].sales_amount, Money::from_cents(200));
        assert_eq!(stats.total_amount, Money::from_cents(200));
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.franchises.len(), 1);
        assert_eq!(stats.franchises[0].productwise_sales.len(), 1);
        assert_eq!(stats.franchises[0].total_sale_amount, Money::from_cents(200));
    }

    #[test]
    fn test_empty_input() {
        let stats = aggregate(&[]);
        assert_eq!(stats, SalesStatistics::default());
    }

    #[test]
    fn test_resolve_same_day() {
        let range = DateRange::resolve(Some("2024-03-05"), Some("2024-03-05")).unwrap();
        assert_eq!(range.start.unwrap(), Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
        assert_eq!(
            range.end.unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
    }

    #[test]
    fn test_resolve_open_and_raw_bounds() {
        let range = DateRange::resolve(Some("2024-03-01"), None).unwrap();
        assert_eq!(range.start.unwrap(), Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert!(range.end.is_none());

        let range =
            DateRange::resolve(Some("2024-03-01T08:30:00Z"), Some("2024-03-02T12:00:00+02:00"))
                .unwrap();
        assert_eq!(range.start.unwrap(), Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
        assert_eq!(range.end.unwrap(), Utc.with_ymd_and_hms(2024, 3, 2, 10, 0, 0).unwrap());

        assert!(DateRange::resolve(None, None).unwrap().is_unbounded());
    }

    #[test]
    fn test_resolve_distinct_dates_uses_raw_end() {
        let range = DateRange::resolve(Some("2024-03-01"), Some("2024-03-05")).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(range.end.unwrap(), end);
        assert!(range.contains(end));
        assert!(range.contains(Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap()));
        assert!(!range.contains(Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()));
    }

    #[test]
    fn test_resolve_rejects_bad_input() {
        assert!(DateRange::resolve(Some("yesterday"), None).is_err());
        assert!(DateRange::resolve(Some("2024-03-05"), Some("2024-03-01")).is_err());
    }

    #[test]
    fn test_series_default_window_is_seven_days() {
        let latest = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        let (start, end) = series_window(&DateRange::default(), Some(latest)).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());

        let facts = vec![fact("s1", vec![line("Tea", 1, 100)], None, "2024-03-10T15:00:00Z")];
        let series = time_series(&facts, start, end).unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, "2024-03-04");
        assert_eq!(series[6].date, "2024-03-10");
        assert_eq!(series[6].count, 1);
        assert!(series[..6].iter().all(|b| b.count == 0 && b.total_amount.is_zero()));
    }

    #[test]
    fn test_series_without_sales_or_range_is_empty() {
        assert!(series_window(&DateRange::default(), None).is_none());
    }

    #[test]
    fn test_series_windows_anchor_at_start() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 3, 11, 59, 59).unwrap();
        let facts = vec![
            fact("s1", vec![line("Tea", 1, 100)], None, "2024-03-02T06:00:00Z"),
            fact("s2", vec![line("Tea", 1, 300)], None, "2024-03-02T13:00:00Z"),
        ];

        let series = time_series(&facts, start, end).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].total_amount, Money::from_cents(100));
        assert_eq!(series[1].total_amount, Money::from_cents(300));
        assert_eq!(series[1].window_start, start + Duration::days(1));
    }

    #[test]
    fn test_series_rejects_huge_range() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(time_series(&[], start, end).is_err());
    }
}
