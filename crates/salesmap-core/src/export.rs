//! CSV export of a record set.

use std::io::Write;

use crate::error::ExportError;
use crate::record::{format_timestamp, Column, Record};

/// Write `records` as UTF-8 CSV with the canonical header row.
///
/// Missing sales and timestamps are written as empty cells.
///
/// # Errors
///
/// Returns [`ExportError`] if the underlying writer fails.
pub fn write_csv<W: Write>(records: &[Record], writer: W) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for record in records {
        writer.write_record([
            record.name.clone(),
            record.latitude.to_string(),
            record.longitude.to_string(),
            record.sales.map(|v| v.to_string()).unwrap_or_default(),
            record.category.clone(),
            record.added_by.clone(),
            record.recorded_at.map(format_timestamp).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Render `records` to an in-memory CSV document.
///
/// # Errors
///
/// Returns [`ExportError`] if serialization fails.
pub fn to_csv_bytes(records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    Ok(buf)
}
