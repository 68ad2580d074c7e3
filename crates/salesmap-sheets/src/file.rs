//! A local CSV file used as a record source.
//!
//! A missing file behaves like an empty sheet. Appending to a missing or
//! empty file writes the canonical header first; appending to an existing
//! file writes cells in that file's own header order.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use salesmap_core::{Column, NewRecord};

use crate::error::SourceError;
use crate::source::RecordSource;

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, SourceError>
    where
        T: Send + 'static,
        F: FnOnce(PathBuf) -> Result<T, SourceError> + Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || op(path))
            .await
            .map_err(|e| SourceError::Unavailable(format!("file task failed: {e}")))?
    }
}

fn io_unavailable(path: &Path, err: impl std::fmt::Display) -> SourceError {
    SourceError::Unavailable(format!("{}: {err}", path.display()))
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, SourceError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "records file missing; treating as empty");
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| io_unavailable(path, e))?;

    reader
        .records()
        .map(|row| {
            row.map(|r| r.iter().map(ToString::to_string).collect())
                .map_err(|e| io_unavailable(path, e))
        })
        .collect()
}

/// True when the file is non-empty and its last byte is not `\n`.
fn ends_mid_line(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn append_row(path: &Path, record: &NewRecord, recorded_at: DateTime<Utc>) -> Result<(), SourceError> {
    let existing_header = read_rows(path)?.into_iter().next();
    let needs_terminator = ends_mid_line(path).map_err(|e| io_unavailable(path, e))?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_unavailable(path, e))?;
    if needs_terminator {
        tracing::debug!(path = %path.display(), "records file lacks trailing newline; terminating last row");
        file.write_all(b"\n").map_err(|e| io_unavailable(path, e))?;
    }
    let mut writer = csv::Writer::from_writer(file);

    let canonical = record.to_row(recorded_at);
    let row = match existing_header {
        Some(header) => header
            .iter()
            .map(|cell| {
                Column::from_header(cell)
                    .and_then(|column| Column::ALL.iter().position(|c| *c == column))
                    .map(|idx| canonical[idx].clone())
                    .unwrap_or_default()
            })
            .collect(),
        None => {
            writer
                .write_record(Column::header_row())
                .map_err(|e| io_unavailable(path, e))?;
            canonical
        }
    };

    writer
        .write_record(&row)
        .map_err(|e| io_unavailable(path, e))?;
    writer.flush().map_err(|e| io_unavailable(path, e))
}

impl RecordSource for FileSource {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Vec<String>>, SourceError>> {
        self.run_blocking(|path| read_rows(&path)).boxed()
    }

    fn append<'a>(
        &'a self,
        record: &'a NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        let record = record.clone();
        self.run_blocking(move |path| append_row(&path, &record, recorded_at))
            .boxed()
    }
}
