//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Rules never parametrize MACD, so it is always computed with the default
//! (12, 26, 9) configuration.
//! Warmup: max(fast, slow) - 1 + signal - 1 bars.

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub const DEFAULT_MACD: IndicatorType = IndicatorType::Macd {
    fast: DEFAULT_FAST,
    slow: DEFAULT_SLOW,
    signal: DEFAULT_SIGNAL,
};

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd { fast, slow, signal };
    if fast == 0 || slow == 0 || signal == 0 {
        return IndicatorSeries::empty(indicator_type, closes.len());
    }

    let ema_fast = ema_values(closes, fast);
    let ema_slow = ema_values(closes, slow);
    if ema_fast.is_empty() || ema_slow.is_empty() {
        return IndicatorSeries::empty(indicator_type, closes.len());
    }

    // Align both EMAs on the first bar where the slower one exists.
    let line_start = fast.max(slow) - 1;
    let macd_line: Vec<f64> = (line_start..closes.len())
        .map(|i| ema_fast[i + 1 - fast] - ema_slow[i + 1 - slow])
        .collect();

    let signal_line = ema_values(&macd_line, signal);
    let values: Vec<IndicatorValue> = signal_line
        .iter()
        .enumerate()
        .map(|(j, &sig)| {
            let line = macd_line[j + signal - 1];
            IndicatorValue::Macd {
                line,
                signal: sig,
                histogram: line - sig,
            }
        })
        .collect();

    IndicatorSeries::new(indicator_type, closes.len(), values)
}
