//! Batch indicator computation for one simulation pass.

use crate::domain::candle::PriceColumns;
use crate::domain::indicator::{
    calculate_atr, calculate_ema, calculate_macd, calculate_rsi, calculate_sma, IndicatorSeries,
    IndicatorSet, IndicatorType,
};

pub fn compute_indicator(columns: &PriceColumns, indicator_type: IndicatorType) -> IndicatorSeries {
    match indicator_type {
        IndicatorType::Sma(period) => calculate_sma(&columns.close, period),
        IndicatorType::Ema(period) => calculate_ema(&columns.close, period),
        IndicatorType::Rsi(period) => calculate_rsi(&columns.close, period),
        IndicatorType::Atr(period) => calculate_atr(&columns.high, &columns.low, &columns.close, period),
        IndicatorType::Macd { fast, slow, signal } => calculate_macd(&columns.close, fast, slow, signal),
    }
}

/// Compute each distinct indicator once. Duplicate keys are skipped.
pub fn compute_indicators<I>(columns: &PriceColumns, types: I) -> IndicatorSet
where
    I: IntoIterator<Item = IndicatorType>,
{
    let mut set = IndicatorSet::new();
    for indicator_type in types {
        if !set.contains(&indicator_type) {
            set.insert(compute_indicator(columns, indicator_type));
        }
    }
    set
}
