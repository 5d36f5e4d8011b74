//! Retrieval, decryption and aggregation of ledger readings.
//!
//! Every query is a stateless pass over fresh ledger calls: resolve an index
//! window from the current count, fetch each index, decrypt, then format or
//! aggregate. Batch queries tolerate per-record decryption failures but not
//! ledger failures.

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::crypto::ReadingCipher;
use crate::ledger::{LedgerReader, RawRecord};

mod error;
mod reading;
mod stats;
mod window;

pub use error::ReadingError;
pub use reading::{decrypt_record, format_reading, open_reading, DecryptedPayload, FormattedReading};
pub use stats::{ReadingStats, StatsAccumulator, COLD_THRESHOLD, HOT_THRESHOLD};
pub use window::{
    HistoryQuery, IndexWindow, DEFAULT_HISTORY_LIMIT, DEFAULT_STATS_LIMIT, MAX_HISTORY_LIMIT,
};

/// Tuning knobs for batch queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Upper bound on in-flight per-index ledger calls
    pub fetch_concurrency: usize,
    /// Stats windows are clamped to `[1, stats_max_limit]`
    pub stats_max_limit: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fetch_concurrency: 8,
            stats_max_limit: 100,
        }
    }
}

/// Result of decoding a fetched window record by record
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub successes: Vec<T>,
    /// Indices that failed to decrypt, with the reason
    pub failures: Vec<(u64, ReadingError)>,
}

impl<T> Default for BatchOutcome<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchOutcome<T> {
    /// Decode each record in order, keeping successes and recording failures
    pub fn fold<I, F>(records: I, mut decode: F) -> Self
    where
        I: IntoIterator<Item = (u64, RawRecord)>,
        F: FnMut(&RawRecord) -> Result<T, ReadingError>,
    {
        records
            .into_iter()
            .fold(Self::default(), |mut outcome, (index, record)| {
                match decode(&record) {
                    Ok(value) => outcome.successes.push(value),
                    Err(e) => {
                        warn!("Skipping reading {}: {}", index, e);
                        outcome.failures.push((index, e));
                    }
                }
                outcome
            })
    }
}

/// One page of history, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub readings: Vec<FormattedReading>,
    /// Full ledger size
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    /// Readings that decrypted; may be lower than the window size
    pub returned: u64,
    /// Window indices that failed to decrypt
    #[serde(skip)]
    pub skipped: Vec<u64>,
}

/// The decrypt-aggregate pipeline shared by all request handlers
#[derive(Clone)]
pub struct ReadingPipeline {
    ledger: Arc<dyn LedgerReader>,
    cipher: ReadingCipher,
    options: PipelineOptions,
}

impl ReadingPipeline {
    pub fn new(ledger: Arc<dyn LedgerReader>, cipher: ReadingCipher, options: PipelineOptions) -> Self {
        Self {
            ledger,
            cipher,
            options,
        }
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Current ledger size; no decryption involved
    pub async fn count(&self) -> Result<u64, ReadingError> {
        Ok(self.ledger.total_count().await?)
    }

    /// Most recent reading
    pub async fn latest(&self) -> Result<FormattedReading, ReadingError> {
        let total = self.count().await?;
        if total == 0 {
            return Err(ReadingError::EmptyLedger);
        }
        self.decrypt_at(total - 1).await
    }

    /// Reading at an explicit index. A decryption failure fails the request.
    pub async fn reading(&self, index: u64) -> Result<FormattedReading, ReadingError> {
        self.check_index(index).await?;
        self.decrypt_at(index).await
    }

    /// Undecrypted record at `index`, signature included as stored
    pub async fn raw_record(&self, index: u64) -> Result<RawRecord, ReadingError> {
        self.check_index(index).await?;
        Ok(self.ledger.get_record(index).await?)
    }

    /// Newest-first page of decrypted readings. Records that fail to decrypt
    /// are skipped, so `returned` can be lower than the window size.
    pub async fn history(&self, query: HistoryQuery) -> Result<HistoryPage, ReadingError> {
        let total = self.count().await?;
        let window = IndexWindow::history(total, query);
        debug!(
            "History window [{}, {}) of {} readings",
            window.start, window.end, total
        );

        let records = self.fetch_all(window.descending()).await?;
        let outcome = BatchOutcome::fold(records, |record| open_reading(&self.cipher, record));

        info!(
            "History: returned {} of {} in window ({} skipped)",
            outcome.successes.len(),
            window.len(),
            outcome.failures.len()
        );

        Ok(HistoryPage {
            returned: outcome.successes.len() as u64,
            readings: outcome.successes,
            total,
            limit: query.limit(),
            offset: query.offset(),
            skipped: outcome.failures.into_iter().map(|(index, _)| index).collect(),
        })
    }

    /// Aggregates over the newest `limit` readings, clamped to `[1, stats_max_limit]`
    pub async fn stats(&self, limit: u64) -> Result<ReadingStats, ReadingError> {
        let limit = limit.clamp(1, self.options.stats_max_limit.max(1));
        let total = self.count().await?;
        if total == 0 {
            return Ok(ReadingStats::empty(0));
        }

        let window = IndexWindow::trailing(total, limit);
        let records = self.fetch_all(window.ascending()).await?;
        let outcome = BatchOutcome::fold(records, |record| decrypt_record(&self.cipher, record));

        let mut acc = StatsAccumulator::default();
        acc.extend(outcome.successes.iter());
        info!(
            "Stats: analyzed {} of {} in window ({} skipped)",
            acc.count(),
            window.len(),
            outcome.failures.len()
        );

        Ok(acc.finish(total))
    }

    async fn check_index(&self, index: u64) -> Result<(), ReadingError> {
        let total = self.count().await?;
        if index >= total {
            return Err(ReadingError::NotFound { index, total });
        }
        Ok(())
    }

    async fn decrypt_at(&self, index: u64) -> Result<FormattedReading, ReadingError> {
        let record = self.ledger.get_record(index).await?;
        let reading = open_reading(&self.cipher, &record)?;
        debug!("Reading {} decrypted", index);
        Ok(reading)
    }

    /// Fetch every index with bounded concurrency, preserving iteration order.
    /// The first ledger failure aborts the whole batch.
    async fn fetch_all<I>(&self, indices: I) -> Result<Vec<(u64, RawRecord)>, ReadingError>
    where
        I: Iterator<Item = u64>,
    {
        let ledger = &self.ledger;
        stream::iter(indices)
            .map(|index| async move { ledger.get_record(index).await.map(|record| (index, record)) })
            .buffered(self.options.fetch_concurrency.max(1))
            .try_collect::<Vec<_>>()
            .await
            .map_err(ReadingError::from)
    }
}
