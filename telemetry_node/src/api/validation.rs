//! Request parameter parsing for the readings API.
//!
//! Integers are read leniently from the leading digits of the raw value, so
//! `?limit=20abc` means 20 and an empty or non-numeric value means "absent".

use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::pipeline::{HistoryQuery, DEFAULT_HISTORY_LIMIT, DEFAULT_STATS_LIMIT, MAX_HISTORY_LIMIT};

/// Parse the leading integer of `raw`, ignoring leading whitespace
pub fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude = rest[..digits_len]
        .bytes()
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d - b'0')));
    Some(if negative { -magnitude } else { magnitude })
}

/// Validate a reading index path segment
pub fn parse_index(raw: &str) -> Result<u64, ApiError> {
    match parse_int(raw) {
        Some(index) if index >= 0 => Ok(index as u64),
        _ => Err(ApiError::bad_request("Invalid index parameter")),
    }
}

/// `GET /api/readings/history` query string
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl HistoryParams {
    /// Missing or zero limit means the default; negative offsets clamp to zero
    pub fn to_query(&self) -> Result<HistoryQuery, ApiError> {
        let limit = match self.limit.as_deref().and_then(parse_int) {
            None | Some(0) => DEFAULT_HISTORY_LIMIT as i64,
            Some(limit) => limit,
        };
        if limit < 1 || limit > MAX_HISTORY_LIMIT as i64 {
            return Err(ApiError::bad_request(&format!(
                "Limit must be between 1 and {}",
                MAX_HISTORY_LIMIT
            )));
        }

        let offset = self
            .offset
            .as_deref()
            .and_then(parse_int)
            .unwrap_or(0)
            .max(0);

        HistoryQuery::new(limit as u64, offset as u64).map_err(|e| ApiError::bad_request(&e.to_string()))
    }
}

/// `GET /api/readings/stats` query string
#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    pub limit: Option<String>,
}

impl StatsParams {
    /// Requested window size; the pipeline applies the upper clamp
    pub fn limit(&self) -> u64 {
        match self.limit.as_deref().and_then(parse_int) {
            None | Some(0) => DEFAULT_STATS_LIMIT,
            Some(limit) => limit.max(1) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(limit: Option<&str>, offset: Option<&str>) -> Result<HistoryQuery, ApiError> {
        HistoryParams {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
        .to_query()
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("  7"), Some(7));
        assert_eq!(parse_int("-3"), Some(-3));
        assert_eq!(parse_int("+3"), Some(3));
        assert_eq!(parse_int("12abc"), Some(12));
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("99999999999999999999999"), Some(i64::MAX));
    }

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("0").unwrap(), 0);
        assert_eq!(parse_index("17").unwrap(), 17);
        assert_eq!(parse_index("abc").unwrap_err().code, 400);
        assert_eq!(parse_index("-1").unwrap_err().error, "Invalid index parameter");
    }

    #[test]
    fn test_history_defaults() {
        let query = history(None, None).unwrap();
        assert_eq!(query.limit(), 50);
        assert_eq!(query.offset(), 0);

        assert_eq!(history(Some("0"), None).unwrap().limit(), 50);
        assert_eq!(history(Some("junk"), Some("junk")).unwrap().offset(), 0);
    }

    #[test]
    fn test_history_limit_bounds() {
        assert_eq!(history(Some("100"), None).unwrap().limit(), 100);
        assert_eq!(history(Some("1"), None).unwrap().limit(), 1);

        let err = history(Some("101"), None).unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.error, "Limit must be between 1 and 100");
        assert!(history(Some("-5"), None).is_err());
    }

    #[test]
    fn test_history_negative_offset_clamped() {
        assert_eq!(history(Some("10"), Some("-4")).unwrap().offset(), 0);
        assert_eq!(history(Some("10"), Some("30")).unwrap().offset(), 30);
    }

    #[test]
    fn test_stats_limit() {
        let limit = |raw: Option<&str>| StatsParams { limit: raw.map(str::to_string) }.limit();
        assert_eq!(limit(None), 20);
        assert_eq!(limit(Some("0")), 20);
        assert_eq!(limit(Some("x")), 20);
        assert_eq!(limit(Some("-9")), 1);
        assert_eq!(limit(Some("500")), 500);
    }
}
