//! OHLC candle representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Column views over a candle slice, extracted once per simulation pass.
#[derive(Debug, Clone, Default)]
pub struct PriceColumns {
    pub close: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
}

impl PriceColumns {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let mut columns = PriceColumns {
            close: Vec::with_capacity(candles.len()),
            high: Vec::with_capacity(candles.len()),
            low: Vec::with_capacity(candles.len()),
        };
        for candle in candles {
            columns.close.push(candle.close);
            columns.high.push(candle.high);
            columns.low.push(candle.low);
        }
        columns
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}
