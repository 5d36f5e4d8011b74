//! Index range arithmetic for paged history and stats windows.

use super::ReadingError;
use std::ops::Range;

pub const DEFAULT_HISTORY_LIMIT: u64 = 50;
pub const MAX_HISTORY_LIMIT: u64 = 100;
pub const DEFAULT_STATS_LIMIT: u64 = 20;

/// Validated history page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    limit: u64,
    offset: u64,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_HISTORY_LIMIT,
            offset: 0,
        }
    }
}

impl HistoryQuery {
    /// `limit` must lie in `[1, 100]`; `offset` counts back from the newest record
    pub fn new(limit: u64, offset: u64) -> Result<Self, ReadingError> {
        if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
            return Err(ReadingError::InvalidInput(format!(
                "Limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }
        Ok(Self { limit, offset })
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Contiguous half-open index range `[start, end)` of the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
    pub start: u64,
    pub end: u64,
}

impl IndexWindow {
    /// Page of `limit` records ending `offset` records before the newest one
    pub fn history(total: u64, query: HistoryQuery) -> Self {
        Self {
            start: total.saturating_sub(query.offset.saturating_add(query.limit)),
            end: total.saturating_sub(query.offset),
        }
    }

    /// The newest `limit` records
    pub fn trailing(total: u64, limit: u64) -> Self {
        Self {
            start: total.saturating_sub(limit),
            end: total,
        }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Oldest to newest
    pub fn ascending(&self) -> Range<u64> {
        self.start..self.end
    }

    /// Newest to oldest
    pub fn descending(&self) -> impl Iterator<Item = u64> {
        (self.start..self.end).rev()
    }
}
