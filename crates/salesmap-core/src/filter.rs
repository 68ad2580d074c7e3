//! Category, sales-range and date-range filtering over a record set.
//!
//! Filtering never mutates its input and never adds records. The three
//! predicates are independent and AND together, so their order does not
//! matter.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Inclusive sales bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalesRange {
    pub min: f64,
    pub max: f64,
}

impl SalesRange {
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Inclusive calendar-day bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let day = ts.date();
        self.start <= day && day <= self.end
    }
}

/// Active constraints for one rendering pass.
///
/// `sales: None` disables the sales predicate; `dates: None` disables the
/// date predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub categories: BTreeSet<String>,
    pub sales: Option<SalesRange>,
    pub dates: Option<DateRange>,
}

impl FilterState {
    /// The default state for `records`: every observed category, the observed
    /// sales extent, and the observed date extent.
    ///
    /// Recompute this whenever the underlying record set changes.
    #[must_use]
    pub fn defaults_for(records: &[Record]) -> Self {
        let categories = records.iter().map(|r| r.category.clone()).collect();

        let sales = records
            .iter()
            .filter_map(|r| r.sales)
            .fold(None, |acc: Option<SalesRange>, v| {
                Some(match acc {
                    None => SalesRange { min: v, max: v },
                    Some(r) => SalesRange {
                        min: r.min.min(v),
                        max: r.max.max(v),
                    },
                })
            });

        let dates = records
            .iter()
            .filter_map(|r| r.recorded_at.map(|ts| ts.date()))
            .fold(None, |acc: Option<DateRange>, d| {
                Some(match acc {
                    None => DateRange { start: d, end: d },
                    Some(r) => DateRange {
                        start: r.start.min(d),
                        end: r.end.max(d),
                    },
                })
            });

        Self {
            categories,
            sales,
            dates,
        }
    }

    fn keeps(&self, record: &Record, date_filter_active: bool) -> bool {
        if !self.categories.contains(&record.category) {
            return false;
        }
        if let Some(range) = self.sales {
            // Missing sales cannot fall inside a numeric range.
            if !record.sales.is_some_and(|v| range.contains(v)) {
                return false;
            }
        }
        if date_filter_active {
            if let (Some(range), Some(ts)) = (self.dates, record.recorded_at) {
                return range.contains(ts);
            }
        }
        true
    }
}

/// Apply `state` to `records`, returning the surviving records in input order.
///
/// The date predicate only engages when at least one input record carries a
/// timestamp; records without a timestamp always pass it.
#[must_use]
pub fn apply_filters(records: &[Record], state: &FilterState) -> Vec<Record> {
    let date_filter_active = records.iter().any(|r| r.recorded_at.is_some());
    records
        .iter()
        .filter(|r| state.keeps(r, date_filter_active))
        .cloned()
        .collect()
}

/// Partial filter selection, as received from a query string or CLI flags.
///
/// Every unset field falls back to [`FilterState::defaults_for`] on the
/// record set being filtered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    pub categories: Option<Vec<String>>,
    pub sales_min: Option<f64>,
    pub sales_max: Option<f64>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FilterQuery {
    /// Resolve this selection against `records`.
    #[must_use]
    pub fn resolve(&self, records: &[Record]) -> FilterState {
        let defaults = FilterState::defaults_for(records);

        let categories = match &self.categories {
            Some(selected) => selected.iter().map(|c| c.trim().to_string()).collect(),
            None => defaults.categories,
        };

        let sales = match (defaults.sales, self.sales_min, self.sales_max) {
            (_, Some(min), Some(max)) => Some(SalesRange { min, max }),
            (Some(d), min, max) => Some(SalesRange {
                min: min.unwrap_or(d.min),
                max: max.unwrap_or(d.max),
            }),
            (None, Some(min), None) => Some(SalesRange {
                min,
                max: f64::INFINITY,
            }),
            (None, None, Some(max)) => Some(SalesRange {
                min: f64::NEG_INFINITY,
                max,
            }),
            (None, None, None) => None,
        };

        let dates = match (defaults.dates, self.start, self.end) {
            (_, Some(start), Some(end)) => Some(DateRange { start, end }),
            (Some(d), start, end) => Some(DateRange {
                start: start.unwrap_or(d.start),
                end: end.unwrap_or(d.end),
            }),
            (None, _, _) => None,
        };

        FilterState {
            categories,
            sales,
            dates,
        }
    }

    /// Resolve against `records` and filter them in one step.
    #[must_use]
    pub fn apply(&self, records: &[Record]) -> Vec<Record> {
        apply_filters(records, &self.resolve(records))
    }
}
