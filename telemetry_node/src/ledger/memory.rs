use super::{LedgerError, LedgerReader, RawRecord};
use async_trait::async_trait;
use std::sync::RwLock;

/// Append-only in-process ledger for tests and local development
pub struct InMemoryLedger {
    records: RwLock<Vec<RawRecord>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    pub fn with_records(records: Vec<RawRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Append a record and return its index
    pub fn append(&self, record: RawRecord) -> Result<u64, LedgerError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))?;
        records.push(record);
        Ok(records.len() as u64 - 1)
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn total_count(&self) -> Result<u64, LedgerError> {
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))?;
        Ok(records.len() as u64)
    }

    async fn get_record(&self, index: u64) -> Result<RawRecord, LedgerError> {
        let records = self
            .records
            .read()
            .map_err(|_| LedgerError::Unavailable("ledger lock poisoned".to_string()))?;
        let total = records.len() as u64;
        usize::try_from(index)
            .ok()
            .and_then(|i| records.get(i))
            .cloned()
            .ok_or(LedgerError::IndexOutOfRange { index, total })
    }
}
