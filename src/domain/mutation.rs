//! Point mutations on strategy genes.
//!
//! `mutate` always works on a deep copy: the parent passed in is borrowed
//! immutably and is never modified.

use rand::Rng;

use super::rule::{Comparand, Indicator, Rule};
use super::seeds::{random_rule, round4};
use super::strategy::{StopLoss, StrategyGene};

const RSI_MIN: f64 = 5.0;
const RSI_MAX: f64 = 95.0;

/// Clone `parent` and apply each point mutation independently with
/// probability `rate`. At least one mutation is always attempted.
pub fn mutate<R: Rng + ?Sized>(parent: &StrategyGene, rate: f64, rng: &mut R) -> StrategyGene {
    let rate = rate.clamp(0.0, 1.0);
    let mut child = parent.clone();
    let mut touched = false;

    if rng.gen_bool(rate) {
        touched |= shift_threshold(&mut child, rng);
    }
    if rng.gen_bool(rate) {
        perturb_break_even(&mut child, rng);
        touched = true;
    }
    if rng.gen_bool(rate) {
        replace_rule(&mut child, rng);
        touched = true;
    }
    if rng.gen_bool(rate) {
        perturb_exits(&mut child, rng);
        touched = true;
    }
    if rng.gen_bool(rate / 2.0) {
        touched |= toggle_trend_filter(&mut child);
    }
    if !touched {
        replace_rule(&mut child, rng);
    }

    child
}

fn rule_lists_mut(gene: &mut StrategyGene) -> [&mut Vec<Rule>; 4] {
    [
        &mut gene.entry_long,
        &mut gene.entry_short,
        &mut gene.exit_long,
        &mut gene.exit_short,
    ]
}

/// Nudge one RSI threshold by up to five points.
fn shift_threshold<R: Rng + ?Sized>(gene: &mut StrategyGene, rng: &mut R) -> bool {
    let mut lists = rule_lists_mut(gene);
    let positions: Vec<(usize, usize)> = lists
        .iter()
        .enumerate()
        .flat_map(|(li, list)| {
            list.iter()
                .enumerate()
                .filter(|(_, r)| r.indicator() == Indicator::Rsi)
                .filter(|(_, r)| matches!(r.comparand(), Comparand::Value(_)))
                .map(move |(ri, _)| (li, ri))
        })
        .collect();

    if positions.is_empty() {
        return false;
    }
    let (li, ri) = positions[rng.gen_range(0..positions.len())];
    let rule = lists[li][ri].clone();
    if let Comparand::Value(v) = rule.comparand() {
        let shifted = (v + rng.gen_range(-5.0..=5.0)).round().clamp(RSI_MIN, RSI_MAX);
        lists[li][ri] = rule.with_threshold(shifted);
    }
    true
}

fn perturb_break_even<R: Rng + ?Sized>(gene: &mut StrategyGene, rng: &mut R) {
    gene.break_even_pct = match gene.break_even_pct {
        Some(_) if rng.gen_bool(0.2) => None,
        Some(pct) => Some(round4((pct * rng.gen_range(0.7..1.3)).clamp(0.005, 0.1))),
        None => Some(round4(rng.gen_range(0.01..0.03))),
    };
}

/// Swap one rule for a freshly generated one. A gene with no rules at all
/// gains a long entry rule instead.
fn replace_rule<R: Rng + ?Sized>(gene: &mut StrategyGene, rng: &mut R) {
    let mut lists = rule_lists_mut(gene);
    let candidates: Vec<usize> = (0..lists.len()).filter(|&i| !lists[i].is_empty()).collect();
    if candidates.is_empty() {
        lists[0].push(random_rule(rng));
        return;
    }
    let li = candidates[rng.gen_range(0..candidates.len())];
    let ri = rng.gen_range(0..lists[li].len());
    lists[li][ri] = random_rule(rng);
}

fn perturb_exits<R: Rng + ?Sized>(gene: &mut StrategyGene, rng: &mut R) {
    if gene.take_profit_pct > 0.0 {
        gene.take_profit_pct = round4((gene.take_profit_pct * rng.gen_range(0.8..1.2)).clamp(0.01, 0.25));
    }
    gene.stop_loss = match gene.stop_loss {
        StopLoss::Fixed { pct } if pct > 0.0 => StopLoss::Fixed {
            pct: round4((pct * rng.gen_range(0.8..1.2)).clamp(0.005, 0.2)),
        },
        StopLoss::Fixed { pct } => StopLoss::Fixed { pct },
        StopLoss::Atr { period, multiplier } => StopLoss::Atr {
            period,
            multiplier: round4((multiplier + rng.gen_range(-0.5..0.5)).clamp(0.5, 5.0)),
        },
    };
}

/// Flip the trend filter unless that would leave the gene unable to enter.
fn toggle_trend_filter(gene: &mut StrategyGene) -> bool {
    if gene.trend_filter && gene.entry_long.is_empty() && gene.entry_short.is_empty() {
        return false;
    }
    gene.trend_filter = !gene.trend_filter;
    true
}
