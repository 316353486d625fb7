//! CSV file candle adapter.
//!
//! One `<SYMBOL>.csv` per symbol under a base directory, with header
//! `time,open,high,low,close,volume`.

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Deserialize)]
struct CandleRow {
    time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

pub fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

impl DataPort for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, EngineError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => EngineError::NoData {
                symbol: symbol.to_string(),
            },
            _ => EngineError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for (line, result) in rdr.deserialize::<CandleRow>().enumerate() {
            let row = result.map_err(|e| EngineError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let time = parse_time(&row.time).ok_or_else(|| EngineError::DataSource {
                reason: format!(
                    "{}: invalid time '{}' on row {}",
                    path.display(),
                    row.time,
                    line + 1
                ),
            })?;

            if time < start || time >= end {
                continue;
            }

            candles.push(Candle {
                time,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        candles.sort_by_key(|c| c.time);
        Ok(candles)
    }
}
