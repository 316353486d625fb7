//! Average True Range indicator.
//!
//! TR[0] = high - low, TR[i] = true range against the previous close.
//! Seed with the mean of the first n TRs, then Wilder smoothing:
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.
//! Warmup: first (n-1) bars have no value.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> IndicatorSeries {
    let total = closes.len().min(highs.len()).min(lows.len());
    if period == 0 || total < period {
        return IndicatorSeries::empty(IndicatorType::Atr(period), closes.len());
    }

    let tr: Vec<f64> = (0..total)
        .map(|i| {
            if i == 0 {
                highs[0] - lows[0]
            } else {
                let hl = highs[i] - lows[i];
                let hc = (highs[i] - closes[i - 1]).abs();
                let lc = (lows[i] - closes[i - 1]).abs();
                hl.max(hc).max(lc)
            }
        })
        .collect();

    let mut atr = tr[..period].iter().sum::<f64>() / period as f64;
    let mut values = Vec::with_capacity(total - period + 1);
    values.push(IndicatorValue::Simple(atr));

    for &range in &tr[period..] {
        atr = (atr * (period - 1) as f64 + range) / period as f64;
        values.push(IndicatorValue::Simple(atr));
    }

    IndicatorSeries::new(IndicatorType::Atr(period), closes.len(), values)
}
