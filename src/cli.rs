//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::adapters::caching_data_port::CachingDataPort;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_sink::JsonStrategySink;
use crate::domain::backtest::{run_request, BacktestConfig, BacktestRequest};
use crate::domain::config_validation::{
    validate_backtest_config, validate_fitness_policy, validate_genetic_config,
    validate_walk_forward_config,
};
use crate::domain::error::EngineError;
use crate::domain::fitness::FitnessPolicy;
use crate::domain::optimizer::{GeneticConfig, GeneticOptimizer};
use crate::domain::rule::Rule;
use crate::domain::rule_parser;
use crate::domain::strategy::{StopLoss, StrategyGene};
use crate::domain::walk_forward::{mine, MiningOutcome, WalkForwardConfig, WalkForwardDriver};
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "wfminer", about = "Strategy backtester and walk-forward genetic miner")]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one strategy over a date range
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy INI file with a [strategy] section
        #[arg(short, long, conflicts_with = "gene", required_unless_present = "gene")]
        strategy: Option<PathBuf>,
        /// Strategy gene JSON (as written by `mine`)
        #[arg(short, long)]
        gene: Option<PathBuf>,
        #[arg(long)]
        symbol: String,
        /// Inclusive start date, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Exclusive end date, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search for a strategy that survives walk-forward validation
    Mine {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        /// RNG seed; overrides [walk_forward] seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Parse and validate a strategy file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Backtest {
            config,
            strategy,
            gene,
            symbol,
            start,
            end,
            output,
        } => run_backtest(
            &config,
            strategy.as_deref(),
            gene.as_deref(),
            symbol,
            start,
            end,
            output.as_deref(),
        ),
        Command::Mine {
            config,
            symbol,
            start,
            end,
            seed,
        } => run_mine(&config, &symbol, start, end, seed),
        Command::Validate { strategy } => run_validate(&strategy),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Logs go to stderr; stdout carries JSON only.
pub fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn start_of(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn parse_key<T>(adapter: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, EngineError>
where
    T: FromStr,
    T::Err: Display,
{
    match adapter.get_string(section, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::config_invalid(section, key, e.to_string())),
        None => Ok(default),
    }
}

fn optional_key<T>(adapter: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<T>, EngineError>
where
    T: FromStr,
    T::Err: Display,
{
    match adapter.get_string(section, key).filter(|s| !s.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| EngineError::config_invalid(section, key, e.to_string())),
        None => Ok(None),
    }
}

fn get_u32(adapter: &dyn ConfigPort, section: &str, key: &str, default: u32) -> Result<u32, EngineError> {
    let value = adapter.get_usize(section, key, default as usize)?;
    u32::try_from(value).map_err(|_| EngineError::config_invalid(section, key, "value too large"))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, EngineError> {
    let d = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", d.initial_capital)?,
        warmup_bars: adapter.get_usize("backtest", "warmup_bars", d.warmup_bars)?,
        min_bars: adapter.get_usize("backtest", "min_bars", d.min_bars)?,
        warmup_policy: parse_key(adapter, "backtest", "warmup_policy", d.warmup_policy)?,
        empty_entry_policy: parse_key(adapter, "backtest", "empty_entry_policy", d.empty_entry_policy)?,
        equity_sample_interval: adapter.get_usize(
            "backtest",
            "equity_sample_interval",
            d.equity_sample_interval,
        )?,
    })
}

pub fn build_genetic_config(adapter: &dyn ConfigPort) -> Result<GeneticConfig, EngineError> {
    let d = GeneticConfig::default();
    Ok(GeneticConfig {
        population_size: adapter.get_usize("genetic", "population_size", d.population_size)?,
        generations: adapter.get_usize("genetic", "generations", d.generations)?,
        elite_count: adapter.get_usize("genetic", "elite_count", d.elite_count)?,
        mutation_rate: adapter.get_double("genetic", "mutation_rate", d.mutation_rate)?,
        parallel: adapter.get_bool("genetic", "parallel", d.parallel)?,
        fee_pct: adapter.get_double("genetic", "fee_pct", d.fee_pct)?,
        slippage_pct: adapter.get_double("genetic", "slippage_pct", d.slippage_pct)?,
    })
}

pub fn build_fitness_policy(adapter: &dyn ConfigPort) -> Result<FitnessPolicy, EngineError> {
    let d = FitnessPolicy::default();
    Ok(FitnessPolicy {
        min_trades: adapter.get_usize("fitness", "min_trades", d.min_trades)?,
        low_sample_penalty: adapter.get_double("fitness", "low_sample_penalty", d.low_sample_penalty)?,
        risk_measure: parse_key(adapter, "fitness", "risk_measure", d.risk_measure)?,
        risk_floor: adapter.get_double("fitness", "risk_floor", d.risk_floor)?,
    })
}

pub fn build_walk_forward_config(adapter: &dyn ConfigPort) -> Result<WalkForwardConfig, EngineError> {
    let d = WalkForwardConfig::default();
    Ok(WalkForwardConfig {
        train_months: get_u32(adapter, "walk_forward", "train_months", d.train_months)?,
        test_months: get_u32(adapter, "walk_forward", "test_months", d.test_months)?,
        min_total_return_pct: adapter.get_double(
            "walk_forward",
            "min_total_return_pct",
            d.min_total_return_pct,
        )?,
        max_drawdown_pct: adapter.get_double("walk_forward", "max_drawdown_pct", d.max_drawdown_pct)?,
        max_attempts: adapter.get_usize("walk_forward", "max_attempts", d.max_attempts)?,
        seed: optional_key(adapter, "walk_forward", "seed")?,
    })
}

fn parse_rule_key(adapter: &dyn ConfigPort, key: &str) -> Result<Vec<Rule>, EngineError> {
    let text = adapter.get_string("strategy", key).unwrap_or_default();
    rule_parser::parse_rules(&text).map_err(|e| {
        eprintln!(
            "error: failed to parse {}:\n{}",
            key,
            e.display_with_context(&text)
        );
        EngineError::from(e)
    })
}

/// Build a gene from a `[strategy]` section.
pub fn build_strategy(adapter: &dyn ConfigPort) -> Result<StrategyGene, EngineError> {
    let name = adapter
        .get_string("strategy", "name")
        .unwrap_or_else(|| "Unnamed".to_string());

    let stop_kind = adapter
        .get_string("strategy", "stop_loss")
        .unwrap_or_else(|| "fixed".to_string());
    let stop_loss = match stop_kind.trim().to_ascii_lowercase().as_str() {
        "fixed" => StopLoss::Fixed {
            pct: adapter.get_double("strategy", "stop_loss_pct", 0.02)?,
        },
        "atr" => StopLoss::Atr {
            period: adapter.get_usize("strategy", "atr_period", 14)?,
            multiplier: adapter.get_double("strategy", "atr_multiplier", 2.0)?,
        },
        other => {
            return Err(EngineError::config_invalid(
                "strategy",
                "stop_loss",
                format!("unknown stop loss '{}', expected fixed or atr", other),
            ));
        }
    };

    Ok(StrategyGene {
        name,
        entry_long: parse_rule_key(adapter, "entry_long")?,
        entry_short: parse_rule_key(adapter, "entry_short")?,
        exit_long: parse_rule_key(adapter, "exit_long")?,
        exit_short: parse_rule_key(adapter, "exit_short")?,
        stop_loss,
        take_profit_pct: adapter.get_double("strategy", "take_profit_pct", 0.05)?,
        break_even_pct: optional_key(adapter, "strategy", "break_even_pct")?,
        trend_filter: adapter.get_bool("strategy", "trend_filter", false)?,
        fee_pct: adapter.get_double("strategy", "fee_pct", 0.001)?,
        slippage_pct: adapter.get_double("strategy", "slippage_pct", 0.0005)?,
    })
}

/// Read a gene from JSON: either a bare gene or a persisted strategy record
/// (whose `config` field holds the gene).
pub fn load_gene(path: &Path) -> Result<StrategyGene, EngineError> {
    let text = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let gene_value = match value.get("config") {
        Some(config) if config.is_object() => config.clone(),
        _ => value,
    };
    Ok(serde_json::from_value(gene_value)?)
}

fn csv_dir(adapter: &dyn ConfigPort) -> Result<PathBuf, EngineError> {
    adapter
        .get_string("data", "csv_dir")
        .map(PathBuf::from)
        .ok_or_else(|| EngineError::ConfigMissing {
            section: "data".into(),
            key: "csv_dir".into(),
        })
}

fn write_output(output: Option<&Path>, text: &str) -> Result<(), EngineError> {
    match output {
        Some(path) => {
            fs::write(path, text)?;
            info!("Result written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    strategy_path: Option<&Path>,
    gene_path: Option<&Path>,
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
    output: Option<&Path>,
) -> Result<(), EngineError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let config = build_backtest_config(&adapter)?;
    validate_backtest_config(&config)?;

    let gene = match (strategy_path, gene_path) {
        (Some(path), _) => build_strategy(&FileConfigAdapter::from_file(path)?)?,
        (None, Some(path)) => load_gene(path)?,
        (None, None) => {
            return Err(EngineError::ConfigMissing {
                section: "strategy".into(),
                key: "--strategy or --gene".into(),
            });
        }
    };

    let data = CsvAdapter::new(csv_dir(&adapter)?);
    let request = BacktestRequest {
        symbol,
        start_date: start,
        end_date: end,
        initial_capital: config.initial_capital,
        strategy: gene,
    };
    info!(
        "Backtesting '{}' on {} from {} to {}",
        request.strategy.name, request.symbol, start, end
    );

    match run_request(&data, &request, &config) {
        Ok(result) => {
            info!(
                "Return {:.2}%, {} trades, win rate {:.1}%, max drawdown {:.2}%",
                result.total_return_pct, result.trade_count, result.win_rate_pct, result.max_drawdown_pct
            );
            write_output(output, &serde_json::to_string_pretty(&result)?)
        }
        Err(e @ (EngineError::InsufficientData { .. } | EngineError::NoData { .. })) => {
            let body = json!({ "error": e.to_string() });
            write_output(output, &serde_json::to_string_pretty(&body)?)?;
            Err(e)
        }
        Err(e) => Err(e),
    }
}

fn run_mine(
    config_path: &Path,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    seed_override: Option<u64>,
) -> Result<(), EngineError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let backtest = build_backtest_config(&adapter)?;
    let genetic = build_genetic_config(&adapter)?;
    let fitness = build_fitness_policy(&adapter)?;
    let walk_forward = build_walk_forward_config(&adapter)?;
    validate_backtest_config(&backtest)?;
    validate_genetic_config(&genetic)?;
    validate_fitness_policy(&fitness)?;
    validate_walk_forward_config(&walk_forward)?;

    let mut rng = match seed_override.or(walk_forward.seed) {
        Some(seed) => {
            info!("Using RNG seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let data = CachingDataPort::new(CsvAdapter::new(csv_dir(&adapter)?));
    let output_dir = adapter
        .get_string("data", "output_dir")
        .unwrap_or_else(|| "strategies".to_string());
    let sink = JsonStrategySink::new(PathBuf::from(output_dir));

    let optimizer = GeneticOptimizer::new(genetic, backtest.clone(), fitness);
    let driver = WalkForwardDriver::new(&data, &optimizer, &backtest, &walk_forward);

    let outcome = mine(&driver, &sink, symbol, start_of(start), start_of(end), &mut rng)?;
    let body = match outcome {
        MiningOutcome::Found { record, attempts } => json!({
            "status": "found",
            "attempts": attempts,
            "name": record.name,
            "path": sink
                .last_written()
                .unwrap_or_else(|| sink.path_for(&record))
                .display()
                .to_string(),
            "roi": record.roi,
            "drawdown": record.drawdown,
            "winRate": record.win_rate,
            "trades": record.trades,
        }),
        MiningOutcome::Exhausted { attempts } => json!({
            "status": "no viable strategy found",
            "attempts": attempts,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

fn run_validate(strategy_path: &Path) -> Result<(), EngineError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let adapter = FileConfigAdapter::from_file(strategy_path)?;
    let gene = build_strategy(&adapter)?;
    gene.validate()?;

    let sections = [
        ("Entry Long", &gene.entry_long),
        ("Entry Short", &gene.entry_short),
        ("Exit Long", &gene.exit_long),
        ("Exit Short", &gene.exit_short),
    ];
    for (label, rules) in sections {
        eprintln!("\n{}:", label);
        if rules.is_empty() {
            eprintln!("  (none)");
        }
        for rule in rules.iter() {
            eprintln!("  {}", rule);
        }
    }

    let indicators: Vec<String> = gene
        .required_indicators()
        .iter()
        .map(|i| i.to_string())
        .collect();
    eprintln!("\nIndicators to compute: {}", indicators.join(", "));
    eprintln!("Warm-up bars required: {}", gene.required_warmup());
    eprintln!("\nStrategy configuration is valid.");
    Ok(())
}
