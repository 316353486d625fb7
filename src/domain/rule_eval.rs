//! Rule evaluation engine.
//!
//! Evaluates rules against pre-computed indicator series at a bar index.
//!
//! # Evaluation Semantics
//!
//! - A rule reads its indicator at `bar_index - series.offset`, so it only
//!   ever sees values computed from bars at or before `bar_index`
//! - MACD rules compare the histogram, not the MACD line
//! - `PRICE` comparands resolve to the price passed in by the caller
//! - Entry lists are ANDed (`all_hold`), exit lists are ORed (`any_fires`)
//! - Before an indicator has warmed up, [`WarmupPolicy`] decides the outcome

use crate::domain::indicator::IndicatorSet;
use crate::domain::rule::Rule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a rule behaves when its indicator has no value at the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupPolicy {
    /// Missing values read as 0 and the comparison proceeds.
    #[default]
    Lenient,
    /// Missing values make the rule evaluate to false.
    Strict,
}

impl FromStr for WarmupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(WarmupPolicy::Lenient),
            "strict" => Ok(WarmupPolicy::Strict),
            other => Err(format!("unknown warmup policy '{}'", other)),
        }
    }
}

pub fn evaluate(
    rule: &Rule,
    bar_index: usize,
    current_price: f64,
    indicators: &IndicatorSet,
    policy: WarmupPolicy,
) -> bool {
    let value = match indicators.value_at(&rule.indicator_type(), bar_index) {
        Some(v) => v,
        None => match policy {
            WarmupPolicy::Lenient => 0.0,
            WarmupPolicy::Strict => return false,
        },
    };
    let comparand = rule.comparand().resolve(current_price);
    rule.operator().apply(value, comparand)
}

/// AND over an entry list. An empty list holds vacuously; callers decide
/// whether an empty side may trade at all.
pub fn all_hold(
    rules: &[Rule],
    bar_index: usize,
    current_price: f64,
    indicators: &IndicatorSet,
    policy: WarmupPolicy,
) -> bool {
    rules
        .iter()
        .all(|r| evaluate(r, bar_index, current_price, indicators, policy))
}

/// OR over an exit list. An empty list never fires.
pub fn any_fires(
    rules: &[Rule],
    bar_index: usize,
    current_price: f64,
    indicators: &IndicatorSet,
    policy: WarmupPolicy,
) -> bool {
    rules
        .iter()
        .any(|r| evaluate(r, bar_index, current_price, indicators, policy))
}
