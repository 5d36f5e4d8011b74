//! Read-only decrypting API over an on-chain telemetry log.
//!
//! Edge devices append AES-256-GCM sealed temperature/humidity readings to a
//! ledger contract. This crate fetches them back, decrypts them with the shared
//! key and serves point lookups, paged history and windowed statistics.

pub mod api;
pub mod config;
pub mod crypto;
pub mod ledger;
pub mod pipeline;

pub use config::Config;
