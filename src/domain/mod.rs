//! Core engine: indicators, rules, simulation, search and walk-forward.

pub mod candle;
pub mod position;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod rule;
pub mod rule_parser;
pub mod rule_eval;
pub mod strategy;
pub mod backtest;
pub mod metrics;
pub mod fitness;
pub mod seeds;
pub mod mutation;
pub mod optimizer;
pub mod walk_forward;
pub mod config_validation;
pub mod error;
