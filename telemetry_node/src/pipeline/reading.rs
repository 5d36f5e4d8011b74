use super::ReadingError;
use crate::crypto::ReadingCipher;
use crate::ledger::RawRecord;
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

/// Plaintext JSON object sealed by the edge device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecryptedPayload {
    pub temperature: f64,
    pub humidity: f64,
    /// Unix seconds at which the device took the reading
    pub timestamp: i64,
}

/// Reading as returned to dashboard clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedReading {
    pub device_id: String,
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: i64,
    /// ISO-8601 rendering of `timestamp`, millisecond precision, UTC
    pub timestamp_date: String,
    pub block_number: u64,
}

/// Decrypt a ledger record's payload
pub fn decrypt_record(cipher: &ReadingCipher, record: &RawRecord) -> Result<DecryptedPayload, ReadingError> {
    Ok(cipher.open(&record.ciphertext, &record.nonce)?)
}

/// Combine ledger metadata with the decrypted payload.
///
/// A payload timestamp outside the representable date range is reported as a
/// decryption failure rather than rendered as an invalid date.
pub fn format_reading(record: &RawRecord, payload: &DecryptedPayload) -> Result<FormattedReading, ReadingError> {
    let date = DateTime::from_timestamp(payload.timestamp, 0).ok_or_else(|| {
        ReadingError::DecryptionFailed(format!(
            "payload timestamp {} is not a valid date",
            payload.timestamp
        ))
    })?;

    Ok(FormattedReading {
        device_id: record.device_id.clone(),
        temperature: payload.temperature,
        humidity: payload.humidity,
        timestamp: payload.timestamp,
        timestamp_date: date.to_rfc3339_opts(SecondsFormat::Millis, true),
        block_number: record.block_number,
    })
}

/// Decrypt and format in one step
pub fn open_reading(cipher: &ReadingCipher, record: &RawRecord) -> Result<FormattedReading, ReadingError> {
    let payload = decrypt_record(cipher, record)?;
    format_reading(record, &payload)
}
