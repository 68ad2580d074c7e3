//! Process-lifetime snapshot of the ingested record set.
//!
//! The snapshot is reused across requests until its TTL expires, a refresh
//! replaces it, or a successful append invalidates it. A failed refresh
//! leaves the previous snapshot in place and servable until its TTL runs out. Every source call happens
//! under one async mutex, so fetches and appends never overlap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use salesmap_core::{ingest, NewRecord, Record};
use salesmap_sheets::{RecordSource, SourceError};
use tokio::sync::Mutex;

/// An immutable, ingested view of the record source.
#[derive(Debug)]
pub struct Snapshot {
    pub records: Vec<Record>,
    pub dropped_rows: usize,
    pub fetched_at: DateTime<Utc>,
    loaded_at: Instant,
}

impl Snapshot {
    #[must_use]
    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    stale: bool,
}

pub struct RecordCache {
    source: Arc<dyn RecordSource>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

impl RecordCache {
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            state: Mutex::new(CacheState::default()),
        }
    }

    #[must_use]
    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// The live snapshot, reloading first if it is missing, invalidated, or
    /// older than the TTL.
    ///
    /// # Errors
    ///
    /// Returns the source error when a reload is needed and fails.
    pub async fn current(&self) -> Result<Arc<Snapshot>, SourceError> {
        let mut state = self.state.lock().await;
        if let Some(snapshot) = &state.snapshot {
            if !state.stale && snapshot.age() < self.ttl {
                return Ok(Arc::clone(snapshot));
            }
        }
        self.reload(&mut state).await
    }

    /// Refetch unconditionally.
    ///
    /// # Errors
    ///
    /// Returns the source error; the previous snapshot is retained and keeps
    /// serving reads within its TTL.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, SourceError> {
        let mut state = self.state.lock().await;
        self.reload(&mut state).await
    }

    /// Append `record`, then invalidate and try to reload.
    ///
    /// The returned snapshot is `None` when the append succeeded but the
    /// follow-up reload failed; the next read will retry the reload.
    ///
    /// # Errors
    ///
    /// Returns the source error when the append itself fails. Nothing is
    /// retried.
    pub async fn append(
        &self,
        record: &NewRecord,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<Arc<Snapshot>>, SourceError> {
        let mut state = self.state.lock().await;
        self.source.append(record, recorded_at).await?;
        tracing::info!(name = %record.name, category = %record.category, "record appended");

        state.stale = true;
        match self.reload(&mut state).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                tracing::warn!(error = %e, "reload after append failed; snapshot left stale");
                Ok(None)
            }
        }
    }

    /// The last loaded snapshot, without triggering a reload.
    pub async fn peek(&self) -> Option<Arc<Snapshot>> {
        self.state.lock().await.snapshot.clone()
    }

    async fn reload(&self, state: &mut CacheState) -> Result<Arc<Snapshot>, SourceError> {
        let rows = match self.source.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %e,
                    retained = state.snapshot.is_some(),
                    "record fetch failed"
                );
                return Err(e);
            }
        };

        let ingestion = ingest(&rows);
        let snapshot = Arc::new(Snapshot {
            records: ingestion.records,
            dropped_rows: ingestion.dropped_rows.len(),
            fetched_at: Utc::now(),
            loaded_at: Instant::now(),
        });
        tracing::info!(
            records = snapshot.records.len(),
            dropped = snapshot.dropped_rows,
            "record snapshot loaded"
        );

        state.snapshot = Some(Arc::clone(&snapshot));
        state.stale = false;
        Ok(snapshot)
    }
}
