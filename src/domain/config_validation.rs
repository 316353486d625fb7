//! Configuration validation.
//!
//! Checks engine settings after they have been read from the config file
//! and before any candle data is fetched.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::EngineError;
use crate::domain::fitness::FitnessPolicy;
use crate::domain::optimizer::GeneticConfig;
use crate::domain::walk_forward::WalkForwardConfig;

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), EngineError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(EngineError::config_invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if config.min_bars == 0 {
        return Err(EngineError::config_invalid(
            "backtest",
            "min_bars",
            "min_bars must be at least 1",
        ));
    }
    Ok(())
}

pub fn validate_genetic_config(config: &GeneticConfig) -> Result<(), EngineError> {
    if config.population_size == 0 {
        return Err(EngineError::config_invalid(
            "genetic",
            "population_size",
            "population_size must be positive",
        ));
    }
    if config.generations == 0 {
        return Err(EngineError::config_invalid(
            "genetic",
            "generations",
            "generations must be positive",
        ));
    }
    if config.elite_count == 0 || config.elite_count > config.population_size {
        return Err(EngineError::config_invalid(
            "genetic",
            "elite_count",
            "elite_count must be between 1 and population_size",
        ));
    }
    if !(0.0..=1.0).contains(&config.mutation_rate) {
        return Err(EngineError::config_invalid(
            "genetic",
            "mutation_rate",
            "mutation_rate must be between 0 and 1",
        ));
    }
    if !(0.0..0.5).contains(&config.fee_pct) {
        return Err(EngineError::config_invalid(
            "genetic",
            "fee_pct",
            "fee_pct must be in [0, 0.5)",
        ));
    }
    if !(0.0..0.5).contains(&config.slippage_pct) {
        return Err(EngineError::config_invalid(
            "genetic",
            "slippage_pct",
            "slippage_pct must be in [0, 0.5)",
        ));
    }
    Ok(())
}

pub fn validate_fitness_policy(policy: &FitnessPolicy) -> Result<(), EngineError> {
    if !policy.low_sample_penalty.is_finite() {
        return Err(EngineError::config_invalid(
            "fitness",
            "low_sample_penalty",
            "low_sample_penalty must be finite",
        ));
    }
    if !policy.risk_floor.is_finite() || policy.risk_floor <= 0.0 {
        return Err(EngineError::config_invalid(
            "fitness",
            "risk_floor",
            "risk_floor must be positive",
        ));
    }
    Ok(())
}

pub fn validate_walk_forward_config(config: &WalkForwardConfig) -> Result<(), EngineError> {
    if config.train_months == 0 {
        return Err(EngineError::config_invalid(
            "walk_forward",
            "train_months",
            "train_months must be positive",
        ));
    }
    if config.test_months == 0 {
        return Err(EngineError::config_invalid(
            "walk_forward",
            "test_months",
            "test_months must be positive",
        ));
    }
    if !config.max_drawdown_pct.is_finite() || config.max_drawdown_pct <= 0.0 {
        return Err(EngineError::config_invalid(
            "walk_forward",
            "max_drawdown_pct",
            "max_drawdown_pct must be positive",
        ));
    }
    if !config.min_total_return_pct.is_finite() {
        return Err(EngineError::config_invalid(
            "walk_forward",
            "min_total_return_pct",
            "min_total_return_pct must be finite",
        ));
    }
    if config.max_attempts == 0 {
        return Err(EngineError::config_invalid(
            "walk_forward",
            "max_attempts",
            "max_attempts must be positive",
        ));
    }
    Ok(())
}
