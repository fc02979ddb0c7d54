// Loads a recorded candle feed from CSV for replay through the indicator service
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use shared::models::{CandleEvent, TimeFrame};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::EngineError;

// Parsers for the individual column formats
pub mod feed_format {
    use super::*;

    pub fn parse_price(s: &str) -> Result<f64, String> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse price '{}': {}", s, e))?;
        if !value.is_finite() {
            return Err(format!("Price '{}' is not finite", s));
        }
        Ok(value)
    }

    /// Accepts RFC 3339 (`2024-12-30T18:20:00Z`) or epoch milliseconds.
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
        let s = s.trim();
        if let Ok(millis) = s.parse::<i64>() {
            return DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| format!("Timestamp {} ms is out of range", millis));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("Failed to parse timestamp '{}': {}", s, e))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Datelike, Timelike};

        #[test]
        fn test_parse_price() {
            assert_eq!(parse_price(" 123.45 ").unwrap(), 123.45);
            assert!(parse_price("12,5").is_err());
            assert!(parse_price("NaN").is_err());
        }

        #[test]
        fn test_parse_timestamp_rfc3339() {
            let dt = parse_timestamp("2024-12-30T18:20:00Z").unwrap();
            assert_eq!(dt.year(), 2024);
            assert_eq!(dt.month(), 12);
            assert_eq!(dt.day(), 30);
            assert_eq!(dt.hour(), 18);
            assert_eq!(dt.minute(), 20);
        }

        #[test]
        fn test_parse_timestamp_millis() {
            let dt = parse_timestamp("1700000000000").unwrap();
            assert_eq!(dt.timestamp(), 1_700_000_000);
        }

        #[test]
        fn test_parse_timestamp_invalid() {
            assert!(parse_timestamp("30/12/2024").is_err());
        }
    }
}

pub struct FeedCsvParser;

impl FeedCsvParser {
    // CSV Header: symbol,timeframe,timestamp,high,low,close
    // Example Row: BTCUSDT,5m,2024-12-30T18:20:00Z,94210.5,94102.0,94188.3
    pub fn load_events_from_csv(file_path: impl AsRef<Path>) -> Result<Vec<CandleEvent>, EngineError> {
        let file = File::open(file_path.as_ref())?;
        Self::read_events(BufReader::new(file))
    }

    pub fn read_events<R: Read>(reader: R) -> Result<Vec<CandleEvent>, EngineError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut events = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;
            let field = |name: &'static str| Self::require_field(&record, &headers, name, line);
            let format_err =
                |name: &str, e: String| EngineError::CsvDataFormatError(format!("Error parsing '{}' at line {}: {}", name, line, e));

            let symbol = field("symbol")?.to_string();
            let timeframe: TimeFrame = field("timeframe")?.parse().map_err(|e| format_err("timeframe", e))?;
            let timestamp = feed_format::parse_timestamp(field("timestamp")?).map_err(|e| format_err("timestamp", e))?;
            let high = feed_format::parse_price(field("high")?).map_err(|e| format_err("high", e))?;
            let low = feed_format::parse_price(field("low")?).map_err(|e| format_err("low", e))?;
            let close = feed_format::parse_price(field("close")?).map_err(|e| format_err("close", e))?;

            events.push(CandleEvent {
                symbol,
                timeframe,
                high,
                low,
                close,
                timestamp,
            });
        }
        tracing::debug!(count = events.len(), "Parsed candle events from CSV");
        Ok(events)
    }

    fn require_field<'a>(
        record: &'a StringRecord,
        headers: &StringRecord,
        name: &str,
        line: usize,
    ) -> Result<&'a str, EngineError> {
        Self::get_field(record, headers, name).ok_or_else(|| {
            EngineError::CsvDataFormatError(format!("Missing '{}' field in CSV record at line {}", name, line))
        })
    }

    // Looks a field up by header name so column order does not matter.
    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }
}
