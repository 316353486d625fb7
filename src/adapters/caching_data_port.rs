//! Memoizing wrapper around any candle source.
//!
//! Keyed by `(symbol, start, end)` and kept for the wrapper's lifetime,
//! which is one mining run. Failed fetches are not cached.

use crate::domain::candle::Candle;
use crate::domain::error::EngineError;
use crate::ports::data_port::DataPort;
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::collections::HashMap;

type CacheKey = (String, NaiveDateTime, NaiveDateTime);

pub struct CachingDataPort<D: DataPort> {
    inner: D,
    cache: RefCell<HashMap<CacheKey, Vec<Candle>>>,
}

impl<D: DataPort> CachingDataPort<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn cached_ranges(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl<D: DataPort> DataPort for CachingDataPort<D> {
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, EngineError> {
        let key = (symbol.to_string(), start, end);
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(hit.clone());
        }
        let candles = self.inner.fetch_candles(symbol, start, end)?;
        self.cache.borrow_mut().insert(key, candles.clone());
        Ok(candles)
    }
}
