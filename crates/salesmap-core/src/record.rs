//! The normalized sales-location record and the column layout shared by
//! every record source.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Categories offered by the submission form, each with a fixed map color.
pub const KNOWN_CATEGORIES: [&str; 5] = ["Deli", "Grocery", "Hotel", "Restaurant", "Other"];

/// Source columns, looked up by header name rather than position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Latitude,
    Longitude,
    Sales,
    Category,
    AddedBy,
    Timestamp,
}

impl Column {
    /// Canonical column order used when writing rows and exports.
    pub const ALL: [Column; 7] = [
        Column::Name,
        Column::Latitude,
        Column::Longitude,
        Column::Sales,
        Column::Category,
        Column::AddedBy,
        Column::Timestamp,
    ];

    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Column::Name => "Name",
            Column::Latitude => "Latitude",
            Column::Longitude => "Longitude",
            Column::Sales => "Sales",
            Column::Category => "Category",
            Column::AddedBy => "AddedBy",
            Column::Timestamp => "Timestamp",
        }
    }

    /// Resolve a header cell to a column, ignoring surrounding whitespace and case.
    #[must_use]
    pub fn from_header(raw: &str) -> Option<Column> {
        let raw = raw.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.header().eq_ignore_ascii_case(raw))
    }

    /// The canonical header row.
    #[must_use]
    pub fn header_row() -> Vec<String> {
        Column::ALL.iter().map(|c| c.header().to_string()).collect()
    }
}

/// One sales location with validated coordinates.
///
/// `sales` and `recorded_at` are `None` when the source cell was empty or
/// unparsable. Records are never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub sales: Option<f64>,
    pub category: String,
    pub added_by: String,
    pub recorded_at: Option<NaiveDateTime>,
}

/// Parse a numeric cell. Non-finite values count as missing.
#[must_use]
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a timestamp cell.
///
/// Accepts RFC 3339 (converted to UTC), naive ISO-8601 with `T` or space
/// separators, the `M/D/YYYY H:MM:SS` form spreadsheets display, and bare
/// dates (taken as midnight).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
    ];
    const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// ISO-8601 rendering used for appended rows and exports.
#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_from_header_is_case_insensitive() {
        assert_eq!(Column::from_header(" latitude "), Some(Column::Latitude));
        assert_eq!(Column::from_header("AddedBy"), Some(Column::AddedBy));
        assert_eq!(Column::from_header("Notes"), None);
    }

    #[test]
    fn parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 41.88 "), Some(41.88));
        assert_eq!(parse_number("x"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn parse_timestamp_accepts_naive_iso() {
        let ts = parse_timestamp("2024-01-01T00:00:00").expect("iso");
        assert_eq!(format_timestamp(ts), "2024-01-01T00:00:00");
    }

    #[test]
    fn parse_timestamp_keeps_fractional_seconds() {
        let ts = parse_timestamp("2024-03-05T10:11:12.345678").expect("fractional");
        assert_eq!(format_timestamp(ts), "2024-03-05T10:11:12.345678");
    }

    #[test]
    fn parse_timestamp_converts_offsets_to_utc() {
        let ts = parse_timestamp("2024-01-01T05:00:00-06:00").expect("rfc3339");
        assert_eq!(format_timestamp(ts), "2024-01-01T11:00:00");
    }

    #[test]
    fn parse_timestamp_accepts_spreadsheet_display_format() {
        let ts = parse_timestamp("1/2/2024 3:04:05").expect("sheet format");
        assert_eq!(format_timestamp(ts), "2024-01-02T03:04:05");
    }

    #[test]
    fn parse_timestamp_bare_date_is_midnight() {
        let ts = parse_timestamp("2024-06-30").expect("date");
        assert_eq!(format_timestamp(ts), "2024-06-30T00:00:00");
    }

    #[test]
    fn parse_timestamp_garbage_is_missing() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
