use crate::crypto::CipherError;
use crate::ledger::LedgerError;
use thiserror::Error;

/// Failure taxonomy of the decrypt-aggregate pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadingError {
    /// RPC or network failure reaching the ledger; aborts the request
    #[error("{0}")]
    LedgerUnavailable(String),
    #[error("Index {index} is out of range. Total readings: {total}")]
    NotFound { index: u64, total: u64 },
    #[error("No readings recorded yet")]
    EmptyLedger,
    /// Rejected before any ledger call is made
    #[error("{0}")]
    InvalidInput(String),
    /// Tag mismatch, malformed nonce/ciphertext, or unusable plaintext
    #[error("{0}")]
    DecryptionFailed(String),
}

impl From<LedgerError> for ReadingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Unavailable(msg) => ReadingError::LedgerUnavailable(msg),
            LedgerError::IndexOutOfRange { index, total } => ReadingError::NotFound { index, total },
        }
    }
}

impl From<CipherError> for ReadingError {
    fn from(err: CipherError) -> Self {
        ReadingError::DecryptionFailed(err.to_string())
    }
}
