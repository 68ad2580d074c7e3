//! In-process record source for demos and tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use salesmap_core::{Column, NewRecord};

use crate::error::SourceError;
use crate::source::RecordSource;

/// Rows held in memory. Can be primed to fail its next call.
#[derive(Default)]
pub struct MemorySource {
    rows: Mutex<Vec<Vec<String>>>,
    fail_next: Mutex<Option<SourceError>>,
    fetches: AtomicUsize,
}

impl MemorySource {
    /// A source holding `rows` verbatim (header first).
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    /// A source with the canonical header and the given data rows.
    #[must_use]
    pub fn with_data<I, R, S>(data: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rows = vec![Column::header_row()];
        rows.extend(
            data.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect()),
        );
        Self::new(rows)
    }

    /// Make the next `fetch_all` or `append` return `err`.
    pub fn fail_next(&self, err: SourceError) {
        *lock(&self.fail_next) = Some(err);
    }

    /// Number of completed `fetch_all` calls, successful or not.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Snapshot of the stored rows.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<String>> {
        lock(&self.rows).clone()
    }

    fn take_failure(&self) -> Option<SourceError> {
        lock(&self.fail_next).take()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl RecordSource for MemorySource {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn fetch_all(&self) -> BoxFuture<'_, Result<Vec<Vec<String>>, SourceError>> {
        async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.take_failure() {
                Some(err) => Err(err),
                None => Ok(self.rows()),
            }
        }
        .boxed()
    }

    fn append<'a>(
        &'a self,
        record: &'a NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<(), SourceError>> {
        async move {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            let mut rows = lock(&self.rows);
            if rows.is_empty() {
                rows.push(Column::header_row());
            }
            rows.push(record.to_row(recorded_at));
            Ok(())
        }
        .boxed()
    }
}
