//! Technical indicator implementations.
//!
//! Every calculator produces a compact series: the leading warm-up bars that
//! cannot be computed are dropped instead of padded, and the series records
//! its `offset` (`total_bars - values.len()`) so callers can map an original
//! bar index onto a series index.
//!
//! - `IndicatorType`: indicator identity + parameters (serves as HashMap key)
//! - `IndicatorValue`: single-value or MACD-shaped output
//! - `IndicatorSeries`: aligned output of one indicator
//! - `IndicatorSet`: every series computed for one simulation pass

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::calculate_atr;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
}

impl IndicatorType {
    /// Number of leading bars for which the indicator has no value.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(period) | IndicatorType::Ema(period) | IndicatorType::Atr(period) => {
                period.saturating_sub(1)
            }
            IndicatorType::Rsi(period) => period,
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_sub(1) + signal.saturating_sub(1)
            }
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
}

impl IndicatorValue {
    /// The value rules compare against: the histogram for MACD, the value otherwise.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorValue::Simple(v) => v,
            IndicatorValue::Macd { histogram, .. } => histogram,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorValue>,
    pub offset: usize,
}

impl IndicatorSeries {
    pub fn new(indicator_type: IndicatorType, total_bars: usize, values: Vec<IndicatorValue>) -> Self {
        let offset = total_bars.saturating_sub(values.len());
        IndicatorSeries {
            indicator_type,
            values,
            offset,
        }
    }

    pub fn empty(indicator_type: IndicatorType, total_bars: usize) -> Self {
        Self::new(indicator_type, total_bars, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `bar_index - offset`, or `None` while the indicator is still warming up.
    pub fn series_index(&self, bar_index: usize) -> Option<usize> {
        bar_index
            .checked_sub(self.offset)
            .filter(|&i| i < self.values.len())
    }

    pub fn value_at(&self, bar_index: usize) -> Option<&IndicatorValue> {
        self.series_index(bar_index).map(|i| &self.values[i])
    }
}

/// All indicator series computed for one simulation pass, keyed by type.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type, series);
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    pub fn contains(&self, indicator_type: &IndicatorType) -> bool {
        self.series.contains_key(indicator_type)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Primary value of `indicator_type` at `bar_index`, if computed and warmed up.
    pub fn value_at(&self, indicator_type: &IndicatorType, bar_index: usize) -> Option<f64> {
        self.get(indicator_type)
            .and_then(|s| s.value_at(bar_index))
            .map(IndicatorValue::primary)
    }
}
