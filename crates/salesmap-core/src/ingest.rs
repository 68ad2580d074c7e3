//! Conversion from raw spreadsheet rows to validated [`Record`]s.
//!
//! The first row is the header; every later row is zipped with it by column
//! name. Numeric and timestamp cells that fail to parse become `None`. Only a
//! missing latitude or longitude drops a row, since such a row cannot be
//! placed on a map. Nothing here returns an error: malformed input shrinks
//! the output instead.

use std::collections::HashMap;

use crate::record::{parse_number, parse_timestamp, Column, Record};

/// Result of one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingestion {
    /// Valid records in source order.
    pub records: Vec<Record>,
    /// 1-based data row numbers (header excluded) that were dropped.
    pub dropped_rows: Vec<usize>,
}

/// Column positions resolved from a header row.
struct HeaderIndex(HashMap<Column, usize>);

impl HeaderIndex {
    fn new(header: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (idx, cell) in header.iter().enumerate() {
            if let Some(column) = Column::from_header(cell) {
                // First occurrence wins when a header is duplicated.
                positions.entry(column).or_insert(idx);
            }
        }
        Self(positions)
    }

    fn has(&self, column: Column) -> bool {
        self.0.contains_key(&column)
    }

    /// Cell text for `column`, or `""` when the column or the cell is absent.
    fn cell<'a>(&self, row: &'a [String], column: Column) -> &'a str {
        self.0
            .get(&column)
            .and_then(|&idx| row.get(idx))
            .map_or("", |s| s.trim())
    }
}

/// Ingest a full sheet (header row first).
///
/// An empty input or a header-only input yields an empty [`Ingestion`].
#[must_use]
pub fn ingest(rows: &[Vec<String>]) -> Ingestion {
    let Some((header, data)) = rows.split_first() else {
        return Ingestion::default();
    };

    let index = HeaderIndex::new(header);
    if !index.has(Column::Latitude) || !index.has(Column::Longitude) {
        tracing::warn!(
            header = ?header,
            "ingest: header has no Latitude/Longitude column; every row will be dropped"
        );
    }
    let has_timestamp = index.has(Column::Timestamp);

    let mut ingestion = Ingestion::default();
    for (offset, row) in data.iter().enumerate() {
        let row_number = offset + 1;
        match parse_row(&index, row, has_timestamp) {
            Some(record) => ingestion.records.push(record),
            None => {
                tracing::debug!(row = row_number, "ingest: dropping row without coordinates");
                ingestion.dropped_rows.push(row_number);
            }
        }
    }

    if !ingestion.dropped_rows.is_empty() {
        tracing::info!(
            kept = ingestion.records.len(),
            dropped = ingestion.dropped_rows.len(),
            "ingest: dropped rows with unparsable coordinates"
        );
    }
    ingestion
}

fn parse_row(index: &HeaderIndex, row: &[String], has_timestamp: bool) -> Option<Record> {
    let latitude = parse_number(index.cell(row, Column::Latitude))?;
    let longitude = parse_number(index.cell(row, Column::Longitude))?;

    let recorded_at = if has_timestamp {
        parse_timestamp(index.cell(row, Column::Timestamp))
    } else {
        None
    };

    Some(Record {
        name: index.cell(row, Column::Name).to_string(),
        latitude,
        longitude,
        sales: parse_number(index.cell(row, Column::Sales)),
        category: index.cell(row, Column::Category).to_string(),
        added_by: index.cell(row, Column::AddedBy).to_string(),
        recorded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| (*s).to_string()).collect()
    }

    fn header() -> Vec<String> {
        Column::header_row()
    }

    #[test]
    fn empty_source_yields_empty_set() {
        assert_eq!(ingest(&[]), Ingestion::default());
    }

    #[test]
    fn header_only_yields_empty_set() {
        let ingestion = ingest(&[header()]);
        assert!(ingestion.records.is_empty());
        assert!(ingestion.dropped_rows.is_empty());
    }

    #[test]
    fn drops_row_with_unparsable_latitude() {
        let rows = vec![
            header(),
            row(&["Deli A", "41.88", "-87.62", "100", "Deli", "Alice", "2024-01-01T00:00:00"]),
            row(&["Bad", "x", "-87.63", "50", "Grocery", "Bob", ""]),
        ];
        let ingestion = ingest(&rows);
        assert_eq!(ingestion.records.len(), 1);
        assert_eq!(ingestion.records[0].name, "Deli A");
        assert_eq!(ingestion.records[0].sales, Some(100.0));
        assert!(ingestion.records[0].recorded_at.is_some());
        assert_eq!(ingestion.dropped_rows, vec![2]);
    }

    #[test]
    fn drops_only_rows_with_bad_coordinates() {
        let rows = vec![
            header(),
            row(&["A", "41.9", "-87.6", "10", "Deli", "", ""]),
            row(&["B", "41.9", "", "10", "Deli", "", ""]),
            row(&["C", "41.9", "-87.6", "oops", "Hotel", "", "not a date"]),
            row(&["D", "north", "-87.6", "10", "Deli", "", ""]),
            row(&["E", "41.7", "-87.7", "", "Other", "", ""]),
        ];
        let ingestion = ingest(&rows);
        let names: Vec<&str> = ingestion.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "E"]);
        assert_eq!(ingestion.dropped_rows, vec![2, 4]);
    }

    #[test]
    fn non_numeric_sales_and_bad_timestamp_are_missing_not_dropped() {
        let rows = vec![
            header(),
            row(&["C", "41.9", "-87.6", "lots", "Hotel", "Zed", "someday"]),
        ];
        let record = &ingest(&rows).records[0];
        assert_eq!(record.sales, None);
        assert_eq!(record.recorded_at, None);
        assert_eq!(record.added_by, "Zed");
    }

    #[test]
    fn columns_are_looked_up_by_name() {
        let rows = vec![
            row(&["Category", "Sales", "Longitude", "Name", "Latitude"]),
            row(&["Hotel", "250", "-87.61", "Palmer", "41.88"]),
        ];
        let ingestion = ingest(&rows);
        let record = &ingestion.records[0];
        assert_eq!(record.name, "Palmer");
        assert_eq!(record.category, "Hotel");
        assert_eq!(record.sales, Some(250.0));
        assert!((record.latitude - 41.88).abs() < f64::EPSILON);
        assert_eq!(record.added_by, "");
        assert_eq!(record.recorded_at, None);
    }

    #[test]
    fn short_rows_are_padded_with_empty_cells() {
        // Sheets omits trailing empty cells from each row.
        let rows = vec![header(), row(&["Short", "41.9", "-87.6"])];
        let record = &ingest(&rows).records[0];
        assert_eq!(record.sales, None);
        assert_eq!(record.category, "");
    }

    #[test]
    fn missing_coordinate_columns_drop_everything() {
        let rows = vec![row(&["Name", "Sales"]), row(&["A", "10"])];
        let ingestion = ingest(&rows);
        assert!(ingestion.records.is_empty());
        assert_eq!(ingestion.dropped_rows, vec![1]);
    }

    #[test]
    fn ingestion_is_idempotent() {
        let rows = vec![
            header(),
            row(&["A", "41.9", "-87.6", "10", "Deli", "", "2024-02-02T10:00:00"]),
            row(&["B", "41.8", "-87.5", "20", "Cafe", "Ann", ""]),
        ];
        assert_eq!(ingest(&rows), ingest(&rows));
    }
}
