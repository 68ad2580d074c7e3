use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use salesmap_core::{NewRecord, SourceConfig};

use crate::{FileSource, SheetsClient, SourceError};

/// A spreadsheet-like store of sales-location rows.
///
/// Appends are not idempotent: retrying a failed append may write the row
/// twice, and nothing downstream deduplicates.
pub trait RecordSource: Send + Sync {
    /// Short human-readable description for logs.
    fn describe(&self) -> String;

    /// Fetch every row, header first. An empty sheet yields an empty vector.
    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Vec<String>>, SourceError>>;

    /// Append one record stamped with `recorded_at`.
    fn append<'a>(
        &'a self,
        record: &'a NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SourceError>>;
}

/// Build the source selected by configuration.
///
/// # Errors
///
/// Returns [`SourceError::Unavailable`] if the Sheets HTTP client cannot be
/// constructed.
pub fn build_source(
    config: &SourceConfig,
    timeout_secs: u64,
) -> Result<Arc<dyn RecordSource>, SourceError> {
    let source: Arc<dyn RecordSource> = match config {
        SourceConfig::File(path) => Arc::new(FileSource::new(path.clone())),
        SourceConfig::Sheets {
            spreadsheet_id,
            range,
            access_token,
            base_url,
        } => Arc::new(SheetsClient::with_base_url(
            spreadsheet_id,
            range,
            access_token.as_deref(),
            timeout_secs,
            base_url,
        )?),
    };
    tracing::info!(source = %source.describe(), "record source configured");
    Ok(source)
}
