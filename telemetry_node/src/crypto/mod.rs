//! Authenticated encryption for sensor readings.
//!
//! Edge gateways seal every reading with AES-256-GCM before it is appended to
//! the ledger. The ledger stores the ciphertext with the 16-byte tag appended
//! and the 12-byte nonce alongside it.

mod cipher;

pub use cipher::{CipherError, ReadingCipher, SealedPayload, KEY_LEN, NONCE_LEN, TAG_LEN};
