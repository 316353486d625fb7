//! Hand-authored seed genes and random gene generation.

use rand::Rng;

use super::indicator::macd::DEFAULT_SLOW;
use super::rule::{Comparand, Indicator, Operator, Rule};
use super::strategy::{StopLoss, StrategyGene};

const RSI_PERIODS: [usize; 4] = [7, 9, 14, 21];
const MA_PERIODS: [usize; 5] = [10, 20, 50, 100, 150];

/// Round to four decimal places so generated genes stay readable.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Classic strategies that seed every population.
pub fn seed_genes(fee_pct: f64, slippage_pct: f64) -> Vec<StrategyGene> {
    vec![
        StrategyGene {
            name: "Counter-trend momentum short".into(),
            entry_long: vec![],
            entry_short: vec![
                Rule::from_valid_parts(Indicator::Rsi, 14, Operator::Gt, Comparand::Value(70.0)),
                Rule::from_valid_parts(Indicator::Macd, DEFAULT_SLOW, Operator::Lt, Comparand::Value(0.0)),
            ],
            exit_long: vec![],
            exit_short: vec![Rule::from_valid_parts(
                Indicator::Rsi,
                14,
                Operator::Lt,
                Comparand::Value(45.0),
            )],
            stop_loss: StopLoss::Fixed { pct: 0.03 },
            take_profit_pct: 0.06,
            break_even_pct: Some(0.02),
            trend_filter: false,
            fee_pct,
            slippage_pct,
        },
        StrategyGene {
            name: "Trend-following pullback".into(),
            entry_long: vec![Rule::from_valid_parts(
                Indicator::Rsi,
                14,
                Operator::Lt,
                Comparand::Value(40.0),
            )],
            entry_short: vec![Rule::from_valid_parts(
                Indicator::Rsi,
                14,
                Operator::Gt,
                Comparand::Value(60.0),
            )],
            exit_long: vec![Rule::from_valid_parts(
                Indicator::Rsi,
                14,
                Operator::Gt,
                Comparand::Value(70.0),
            )],
            exit_short: vec![Rule::from_valid_parts(
                Indicator::Rsi,
                14,
                Operator::Lt,
                Comparand::Value(30.0),
            )],
            stop_loss: StopLoss::Atr {
                period: 14,
                multiplier: 2.0,
            },
            take_profit_pct: 0.08,
            break_even_pct: Some(0.03),
            trend_filter: true,
            fee_pct,
            slippage_pct,
        },
        StrategyGene {
            name: "Moving-average cross breakout".into(),
            entry_long: vec![
                Rule::from_valid_parts(Indicator::Ema, 20, Operator::Lt, Comparand::Price),
                Rule::from_valid_parts(Indicator::Sma, 50, Operator::Lt, Comparand::Price),
            ],
            entry_short: vec![],
            exit_long: vec![Rule::from_valid_parts(
                Indicator::Ema,
                20,
                Operator::Gt,
                Comparand::Price,
            )],
            exit_short: vec![],
            stop_loss: StopLoss::Fixed { pct: 0.02 },
            take_profit_pct: 0.05,
            break_even_pct: None,
            trend_filter: false,
            fee_pct,
            slippage_pct,
        },
    ]
}

pub fn random_rule<R: Rng + ?Sized>(rng: &mut R) -> Rule {
    let indicator = Indicator::ALL[rng.gen_range(0..Indicator::ALL.len())];
    let operator = if rng.gen_bool(0.5) {
        Operator::Gt
    } else {
        Operator::Lt
    };

    match indicator {
        Indicator::Rsi => {
            let period = RSI_PERIODS[rng.gen_range(0..RSI_PERIODS.len())];
            let threshold = match operator {
                Operator::Gt => rng.gen_range(55..=80),
                Operator::Lt => rng.gen_range(20..=45),
            };
            Rule::from_valid_parts(indicator, period, operator, Comparand::Value(threshold as f64))
        }
        Indicator::Macd => {
            Rule::from_valid_parts(indicator, DEFAULT_SLOW, operator, Comparand::Value(0.0))
        }
        Indicator::Sma | Indicator::Ema => {
            let period = MA_PERIODS[rng.gen_range(0..MA_PERIODS.len())];
            Rule::from_valid_parts(indicator, period, operator, Comparand::Price)
        }
    }
}

fn random_rules<R: Rng + ?Sized>(rng: &mut R, max: usize) -> Vec<Rule> {
    let count = rng.gen_range(1..=max);
    (0..count).map(|_| random_rule(rng)).collect()
}

pub fn random_stop_loss<R: Rng + ?Sized>(rng: &mut R) -> StopLoss {
    if rng.gen_bool(0.5) {
        StopLoss::Fixed {
            pct: round4(rng.gen_range(0.01..0.05)),
        }
    } else {
        StopLoss::Atr {
            period: 14,
            multiplier: round4(rng.gen_range(1.0..3.0)),
        }
    }
}

/// A random gene with at least one non-empty entry side.
pub fn random_gene<R: Rng + ?Sized>(
    rng: &mut R,
    name: String,
    fee_pct: f64,
    slippage_pct: f64,
) -> StrategyGene {
    let (long_side, short_side) = match rng.gen_range(0..3) {
        0 => (true, false),
        1 => (false, true),
        _ => (true, true),
    };

    let entry_long = if long_side { random_rules(rng, 2) } else { vec![] };
    let entry_short = if short_side { random_rules(rng, 2) } else { vec![] };
    let exit_long = if long_side && rng.gen_bool(0.7) {
        random_rules(rng, 1)
    } else {
        vec![]
    };
    let exit_short = if short_side && rng.gen_bool(0.7) {
        random_rules(rng, 1)
    } else {
        vec![]
    };

    let stop_loss = random_stop_loss(rng);
    let take_profit_pct = round4(rng.gen_range(0.02..0.10));
    let break_even_pct = if rng.gen_bool(0.5) {
        Some(round4(rng.gen_range(0.01..0.03)))
    } else {
        None
    };

    StrategyGene {
        name,
        entry_long,
        entry_short,
        exit_long,
        exit_short,
        stop_loss,
        take_profit_pct,
        break_even_pct,
        trend_filter: rng.gen_bool(0.3),
        fee_pct,
        slippage_pct,
    }
}
