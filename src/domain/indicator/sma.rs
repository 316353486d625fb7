//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Warmup: first (n-1) bars have no value.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorSeries {
    let values = sma_values(closes, period)
        .into_iter()
        .map(IndicatorValue::Simple)
        .collect();
    IndicatorSeries::new(IndicatorType::Sma(period), closes.len(), values)
}

/// Rolling-sum SMA over `values`, compact (no warm-up padding).
pub(crate) fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut sum: f64 = values[..period].iter().sum();
    out.push(sum / period as f64);

    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out.push(sum / period as f64);
    }
    out
}
