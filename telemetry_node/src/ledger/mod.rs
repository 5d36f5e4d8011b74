//! Read-only access to the on-chain reading log.
//!
//! Records live at dense, zero-based indices `[0, total)`; the highest index
//! is the most recent append. The log is append-only, so an index that was
//! below the count at check time stays valid for the rest of a request.

use async_trait::async_trait;
use thiserror::Error;

pub mod ethereum;
pub mod memory;

pub use ethereum::EvmLedgerReader;
pub use memory::InMemoryLedger;

/// A reading exactly as the ledger stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Reporting device, not validated here
    pub device_id: String,
    /// AES-GCM ciphertext with the 16-byte tag appended
    pub ciphertext: Vec<u8>,
    /// AES-GCM nonce
    pub nonce: Vec<u8>,
    /// Device signature, passed through without verification
    pub signature: Vec<u8>,
    /// Ledger-assigned unix timestamp (seconds)
    pub timestamp: u64,
    /// Block the record was appended in
    pub block_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
    #[error("Index {index} is out of range. Total readings: {total}")]
    IndexOutOfRange { index: u64, total: u64 },
}

/// The two read calls the pipeline needs from the ledger.
///
/// Both are remote round trips; count and fetch are not atomic with respect to
/// concurrent appends.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Current number of appended records
    async fn total_count(&self) -> Result<u64, LedgerError>;

    /// Record at `index`. Callers check `index < total_count()` first.
    async fn get_record(&self, index: u64) -> Result<RawRecord, LedgerError>;
}
