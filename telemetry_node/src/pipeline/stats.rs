use super::DecryptedPayload;
use serde::{Deserialize, Serialize};

/// Readings above this temperature raise a hot alert
pub const HOT_THRESHOLD: f64 = 29.0;
/// Readings below this temperature raise a cold alert
pub const COLD_THRESHOLD: f64 = 17.0;

/// Aggregates over the successfully decrypted part of a stats window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingStats {
    /// Full ledger size, independent of the window
    pub total: u64,
    /// Records in the window that decrypted
    pub analyzed: u64,
    pub avg_temperature: f64,
    pub avg_humidity: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    pub hot_alerts: u64,
    pub cold_alerts: u64,
}

impl ReadingStats {
    /// Zero-filled stats for a window with nothing to analyze
    pub fn empty(total: u64) -> Self {
        Self {
            total,
            analyzed: 0,
            avg_temperature: 0.0,
            avg_humidity: 0.0,
            min_temperature: 0.0,
            max_temperature: 0.0,
            hot_alerts: 0,
            cold_alerts: 0,
        }
    }
}

/// Commutative running reduction over decrypted payloads
#[derive(Debug, Clone, Default)]
pub struct StatsAccumulator {
    count: u64,
    temperature_sum: f64,
    humidity_sum: f64,
    min_temperature: Option<f64>,
    max_temperature: Option<f64>,
    hot_alerts: u64,
    cold_alerts: u64,
}

impl StatsAccumulator {
    pub fn push(&mut self, payload: &DecryptedPayload) {
        let t = payload.temperature;
        self.count += 1;
        self.temperature_sum += t;
        self.humidity_sum += payload.humidity;
        self.min_temperature = Some(self.min_temperature.map_or(t, |m| m.min(t)));
        self.max_temperature = Some(self.max_temperature.map_or(t, |m| m.max(t)));
        if t > HOT_THRESHOLD {
            self.hot_alerts += 1;
        }
        if t < COLD_THRESHOLD {
            self.cold_alerts += 1;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Final aggregates, rounded to one decimal. An empty accumulator yields zeros.
    pub fn finish(self, total: u64) -> ReadingStats {
        if self.count == 0 {
            return ReadingStats::empty(total);
        }
        let n = self.count as f64;
        ReadingStats {
            total,
            analyzed: self.count,
            avg_temperature: round_one(self.temperature_sum / n),
            avg_humidity: round_one(self.humidity_sum / n),
            min_temperature: round_one(self.min_temperature.unwrap_or_default()),
            max_temperature: round_one(self.max_temperature.unwrap_or_default()),
            hot_alerts: self.hot_alerts,
            cold_alerts: self.cold_alerts,
        }
    }
}

impl<'a> Extend<&'a DecryptedPayload> for StatsAccumulator {
    fn extend<I: IntoIterator<Item = &'a DecryptedPayload>>(&mut self, iter: I) {
        for payload in iter {
            self.push(payload);
        }
    }
}

/// Round to one decimal from the exact binary value, ties away from zero.
///
/// `22.15_f64` is really 22.1499..., so it rounds down even though
/// `22.15 * 10.0` lands exactly on 221.5.
fn round_one(value: f64) -> f64 {
    let quarters = value * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        // exact x.x5 tie, and `value * 10.0` is exact here
        return (value * 10.0).round() / 10.0;
    }
    format!("{:.1}", value).parse().unwrap_or(value)
}
