#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::cell::Cell;
use std::collections::HashMap;
use wfminer::domain::backtest::BacktestConfig;
pub use wfminer::domain::candle::Candle;
use wfminer::domain::error::EngineError;
use wfminer::domain::fitness::FitnessPolicy;
use wfminer::domain::optimizer::GeneticConfig;
use wfminer::domain::rule::{Comparand, Indicator, Operator, Rule};
use wfminer::domain::strategy::{StopLoss, StrategyGene};
use wfminer::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
    pub calls: Cell<usize>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, EngineError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(EngineError::DataSource {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|candles| {
                candles
                    .iter()
                    .filter(|c| c.time >= start && c.time < end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Hourly candles from `start`, one per close, with a fixed intrabar range.
pub fn hourly_from_closes(start: NaiveDateTime, closes: &[f64]) -> Vec<Candle> {
    let mut prev = closes.first().copied().unwrap_or(100.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            Candle {
                time: start + Duration::hours(i as i64),
                open,
                high: open.max(close) * 1.004,
                low: open.min(close) * 0.996,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

/// Oscillating market with a slow drift: RSI and MA crosses fire regularly.
pub fn wave_candles(start: NaiveDateTime, count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + 8.0 * (t / 30.0).sin() + 3.0 * (t / 7.0).sin() + t * 0.002
        })
        .collect();
    hourly_from_closes(start, &closes)
}

/// Hours between two timestamps.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> usize {
    (end - start).num_hours().max(0) as usize
}

pub fn always_long() -> Rule {
    Rule::new(Indicator::Sma, 1, Operator::Gt, Comparand::Value(0.0)).unwrap()
}

pub fn fixed_stop_gene(stop_pct: f64, take_profit_pct: f64) -> StrategyGene {
    StrategyGene {
        name: "Fixed stop".into(),
        entry_long: vec![always_long()],
        entry_short: vec![],
        exit_long: vec![],
        exit_short: vec![],
        stop_loss: StopLoss::Fixed { pct: stop_pct },
        take_profit_pct,
        break_even_pct: None,
        trend_filter: false,
        fee_pct: 0.0,
        slippage_pct: 0.0,
    }
}

pub fn small_backtest_config() -> BacktestConfig {
    BacktestConfig {
        warmup_bars: 20,
        min_bars: 20,
        equity_sample_interval: 0,
        ..BacktestConfig::default()
    }
}

pub fn small_genetic_config() -> GeneticConfig {
    GeneticConfig {
        population_size: 6,
        generations: 2,
        elite_count: 2,
        ..GeneticConfig::default()
    }
}

pub fn lenient_fitness() -> FitnessPolicy {
    FitnessPolicy {
        min_trades: 1,
        ..FitnessPolicy::default()
    }
}
