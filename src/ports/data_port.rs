//! Candle data access port.

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use chrono::NaiveDateTime;

pub trait DataPort {
    /// Candles for `symbol` with `start <= time < end`, ascending by time.
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, EngineError>;
}
