//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars have no value.

use crate::domain::indicator::{IndicatorSeries, IndicatorType, IndicatorValue};

pub fn calculate_ema(closes: &[f64], period: usize) -> IndicatorSeries {
    let values = ema_values(closes, period)
        .into_iter()
        .map(IndicatorValue::Simple)
        .collect();
    IndicatorSeries::new(IndicatorType::Ema(period), closes.len(), values)
}

/// EMA over `values`, compact: element 0 corresponds to input index `period - 1`.
pub(crate) fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);
    let mut ema = values[..period].iter().sum::<f64>() / period as f64;
    out.push(ema);

    for &value in &values[period..] {
        ema = value * k + ema * (1.0 - k);
        out.push(ema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_warmup() {
        let series = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        assert_eq!(series.offset, 2);
        assert!(series.value_at(0).is_none());
        assert!(series.value_at(1).is_none());
        assert!(series.value_at(2).is_some());
        assert!(series.value_at(4).is_some());
    }

    #[test]
    fn ema_seed_is_sma() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 3);
        let expected_sma = (10.0 + 20.0 + 30.0) / 3.0;
        assert!((series.values[0].primary() - expected_sma).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);

        let k = 2.0 / 4.0;
        let sma = 20.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert!((series.values[1].primary() - ema_3).abs() < f64::EPSILON);
        assert!((series.values[2].primary() - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&[100.0; 6], 3);
        for value in &series.values {
            assert!((value.primary() - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_indicator_type() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 5);
        assert_eq!(series.indicator_type, IndicatorType::Ema(5));
        assert!(series.is_empty());
        assert_eq!(series.offset, 3);
    }

    #[test]
    fn ema_period_0() {
        assert!(calculate_ema(&[10.0, 20.0], 0).is_empty());
    }
}
