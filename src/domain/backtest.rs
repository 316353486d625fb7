//! Backtest engine: a bar-by-bar position state machine.
//!
//! The simulator is FLAT, IN_LONG or IN_SHORT at every bar. Indicators are
//! computed once per run, before the loop. Transitions start at the
//! effective warm-up bar:
//!
//! - FLAT: the trend filter (if enabled) gates each side on price vs EMA200,
//!   then the side's entry list must hold. Long is checked first.
//! - IN_LONG / IN_SHORT: the active stop and take-profit are fixed for the
//!   bar, break-even may activate for later bars, then stop, take-profit
//!   and exit rules are checked in that order.
//!
//! A position closed on a bar cannot be replaced on the same bar.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::candle::{Candle, PriceColumns};
use super::error::EngineError;
use super::execution::{close_position, open_position};
use super::indicator::{IndicatorSet, IndicatorType};
use super::indicator_helpers::compute_indicators;
use super::metrics::Metrics;
use super::position::{ExitReason, Position, Side, Trade};
use super::rule_eval::{all_hold, any_fires, WarmupPolicy};
use super::strategy::{StopLoss, StrategyGene, TREND_FILTER_EMA};
use crate::ports::data_port::DataPort;

/// What an empty entry list means for its side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyEntryPolicy {
    /// The trend filter alone gates the side, when enabled.
    #[default]
    TrendOnly,
    /// An empty side never opens.
    Disabled,
}

impl FromStr for EmptyEntryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trend_only" => Ok(EmptyEntryPolicy::TrendOnly),
            "disabled" => Ok(EmptyEntryPolicy::Disabled),
            other => Err(format!("unknown empty entry policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Bars skipped before the first transition. Raised to the gene's
    /// longest indicator warm-up when that is larger.
    pub warmup_bars: usize,
    /// Bars required after warm-up.
    pub min_bars: usize,
    pub warmup_policy: WarmupPolicy,
    pub empty_entry_policy: EmptyEntryPolicy,
    /// Record the balance every N bars; 0 records only the final point.
    pub equity_sample_interval: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            warmup_bars: 200,
            min_bars: 50,
            warmup_policy: WarmupPolicy::Lenient,
            empty_entry_policy: EmptyEntryPolicy::TrendOnly,
            equity_sample_interval: 24,
        }
    }
}

impl BacktestConfig {
    pub fn effective_warmup(&self, gene: &StrategyGene) -> usize {
        self.warmup_bars.max(gene.required_warmup())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub total_return_pct: f64,
    pub trade_count: usize,
    pub win_rate_pct: f64,
    pub max_drawdown_pct: f64,
    pub downside_deviation: f64,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Simulate `gene` over `candles`.
///
/// Returns `InsufficientData` when fewer than `warmup + min_bars` candles
/// are supplied.
pub fn run_backtest(
    candles: &[Candle],
    gene: &StrategyGene,
    config: &BacktestConfig,
) -> Result<SimulationResult, EngineError> {
    let warmup = config.effective_warmup(gene);
    let minimum = warmup + config.min_bars;
    if candles.len() < minimum {
        return Err(EngineError::InsufficientData {
            bars: candles.len(),
            minimum,
        });
    }

    let columns = PriceColumns::from_candles(candles);
    let indicators = compute_indicators(&columns, gene.required_indicators());

    let mut balance = config.initial_capital;
    let mut position: Option<Position> = None;
    let mut trades: Vec<Trade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();

    for (i, candle) in candles.iter().enumerate().skip(warmup) {
        if let Some(pos) = position.as_mut() {
            if let Some(trade) = step_open_position(pos, candle, i, gene, &indicators, config) {
                balance += trade.pnl;
                trades.push(trade);
                position = None;
            }
        } else if let Some(side) = entry_side(gene, config, i, candle.close, &indicators) {
            let initial_atr = match gene.stop_loss {
                StopLoss::Atr { period, .. } => indicators
                    .value_at(&IndicatorType::Atr(period), i)
                    .unwrap_or(0.0),
                StopLoss::Fixed { .. } => 0.0,
            };
            position = Some(open_position(
                side,
                candle.close,
                balance,
                i,
                candle.time,
                initial_atr,
                gene,
            ));
        }

        if config.equity_sample_interval > 0 && (i - warmup) % config.equity_sample_interval == 0 {
            equity_curve.push(EquityPoint {
                time: candle.time,
                balance,
            });
        }
    }

    if let Some(last) = candles.last() {
        if equity_curve.last().map(|p| p.time) != Some(last.time) {
            equity_curve.push(EquityPoint {
                time: last.time,
                balance,
            });
        }
    }

    let metrics = Metrics::compute(&trades, config.initial_capital, balance);

    Ok(SimulationResult {
        total_return_pct: metrics.total_return_pct,
        trade_count: metrics.trade_count,
        win_rate_pct: metrics.win_rate_pct,
        max_drawdown_pct: metrics.max_drawdown_pct,
        downside_deviation: metrics.downside_deviation,
        initial_balance: config.initial_capital,
        final_balance: balance,
        trades,
        equity_curve,
    })
}

/// Advance an open position by one bar. Returns the closed trade if it exits.
fn step_open_position(
    pos: &mut Position,
    candle: &Candle,
    bar_index: usize,
    gene: &StrategyGene,
    indicators: &IndicatorSet,
    config: &BacktestConfig,
) -> Option<Trade> {
    let stop = pos.active_stop(gene);
    let target = pos.take_profit(gene);

    if let Some(trigger) = pos.break_even_trigger(gene) {
        if pos.target_hit(trigger, candle.high, candle.low) {
            pos.break_even_active = true;
        }
    }

    let exit_rules = match pos.side {
        Side::Long => &gene.exit_long,
        Side::Short => &gene.exit_short,
    };

    let exit = match (stop, target) {
        (Some(s), _) if pos.stop_hit(s, candle.high, candle.low) => Some((s, ExitReason::StopLoss)),
        (_, Some(t)) if pos.target_hit(t, candle.high, candle.low) => {
            Some((t, ExitReason::TakeProfit))
        }
        _ if any_fires(exit_rules, bar_index, candle.close, indicators, config.warmup_policy) => {
            Some((candle.close, ExitReason::ExitRule))
        }
        _ => None,
    };

    exit.map(|(price, reason)| close_position(pos, price, candle.time, reason, gene))
}

fn entry_side(
    gene: &StrategyGene,
    config: &BacktestConfig,
    bar_index: usize,
    price: f64,
    indicators: &IndicatorSet,
) -> Option<Side> {
    [Side::Long, Side::Short]
        .into_iter()
        .find(|&side| entry_fires(side, gene, config, bar_index, price, indicators))
}

fn entry_fires(
    side: Side,
    gene: &StrategyGene,
    config: &BacktestConfig,
    bar_index: usize,
    price: f64,
    indicators: &IndicatorSet,
) -> bool {
    if gene.trend_filter {
        let Some(ema) = indicators.value_at(&TREND_FILTER_EMA, bar_index) else {
            return false;
        };
        let with_trend = match side {
            Side::Long => price > ema,
            Side::Short => price < ema,
        };
        if !with_trend {
            return false;
        }
    }

    let rules = match side {
        Side::Long => &gene.entry_long,
        Side::Short => &gene.entry_short,
    };
    if rules.is_empty() {
        return gene.trend_filter && config.empty_entry_policy == EmptyEntryPolicy::TrendOnly;
    }
    all_hold(rules, bar_index, price, indicators, config.warmup_policy)
}

/// Input of one backtest invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRequest {
    pub symbol: String,
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub strategy: StrategyGene,
}

/// Fetch the request's candles and simulate its strategy.
pub fn run_request(
    data: &dyn DataPort,
    request: &BacktestRequest,
    config: &BacktestConfig,
) -> Result<SimulationResult, EngineError> {
    request.strategy.validate()?;

    let candles = data.fetch_candles(
        &request.symbol,
        request.start_date.and_time(chrono::NaiveTime::MIN),
        request.end_date.and_time(chrono::NaiveTime::MIN),
    )?;
    if candles.is_empty() {
        return Err(EngineError::NoData {
            symbol: request.symbol.clone(),
        });
    }

    let config = BacktestConfig {
        initial_capital: request.initial_capital,
        ..config.clone()
    };
    run_backtest(&candles, &request.strategy, &config)
}
