//! CLI integration tests.
//!
//! Tests cover:
//! - Config builders against INI text
//! - Strategy INI and gene JSON loading
//! - `backtest`, `validate` and `mine` end to end over CSV files on disk

mod common;

use clap::Parser;
use common::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;
use wfminer::adapters::file_config_adapter::FileConfigAdapter;
use wfminer::cli::{self, Cli};
use wfminer::domain::backtest::SimulationResult;
use wfminer::domain::error::EngineError;
use wfminer::domain::seeds::seed_genes;
use wfminer::domain::strategy::StopLoss;
use wfminer::domain::walk_forward::StrategyRecord;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn write_candle_csv(dir: &Path, symbol: &str, candles: &[Candle]) {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.time.format("%Y-%m-%d %H:%M:%S"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        ));
    }
    fs::write(dir.join(format!("{}.csv", symbol)), out).unwrap();
}

const STRATEGY_INI: &str = r#"
[strategy]
name = RSI Reversal
entry_long = RSI(14) < 35
exit_long = RSI(14) > 65
entry_short = RSI(14) > 70
exit_short = RSI(14) < 40
stop_loss = fixed
stop_loss_pct = 0.02
take_profit_pct = 0.04
break_even_pct = 0.015
fee_pct = 0.001
slippage_pct = 0.0005
"#;

/// Market data and an engine config pointing at it.
struct Workspace {
    dir: TempDir,
    config: std::path::PathBuf,
}

impl Workspace {
    fn new(engine_sections: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let start = at(2024, 1, 1);
        let count = hours_between(start, at(2024, 4, 1));
        write_candle_csv(dir.path(), "BTCUSDT", &wave_candles(start, count));

        let config = dir.path().join("engine.ini");
        fs::write(
            &config,
            format!(
                "[data]\ncsv_dir = {}\noutput_dir = {}\n{}",
                dir.path().display(),
                dir.path().join("strategies").display(),
                engine_sections
            ),
        )
        .unwrap();
        Workspace { dir, config }
    }

    fn path(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join(name)
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn build_strategy_full_section() {
        let adapter = FileConfigAdapter::from_string(STRATEGY_INI).unwrap();
        let gene = cli::build_strategy(&adapter).unwrap();

        assert_eq!(gene.name, "RSI Reversal");
        assert_eq!(gene.entry_long.len(), 1);
        assert_eq!(gene.exit_short.len(), 1);
        assert_eq!(gene.stop_loss, StopLoss::Fixed { pct: 0.02 });
        assert!((gene.take_profit_pct - 0.04).abs() < f64::EPSILON);
        assert_eq!(gene.break_even_pct, Some(0.015));
        assert!(!gene.trend_filter);
        assert!(gene.validate().is_ok());
    }

    #[test]
    fn build_strategy_defaults() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nentry_long = EMA(20) < PRICE\n").unwrap();
        let gene = cli::build_strategy(&adapter).unwrap();

        assert_eq!(gene.name, "Unnamed");
        assert_eq!(gene.stop_loss, StopLoss::Fixed { pct: 0.02 });
        assert!((gene.take_profit_pct - 0.05).abs() < f64::EPSILON);
        assert_eq!(gene.break_even_pct, None);
        assert!((gene.fee_pct - 0.001).abs() < f64::EPSILON);
    }

    #[test]
    fn build_strategy_invalid_rule() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nentry_long = RSI(14) <\n").unwrap();
        let err = cli::build_strategy(&adapter).unwrap_err();
        assert!(matches!(err, EngineError::RuleParse(_)));
    }

    #[test]
    fn build_strategy_bad_break_even() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nentry_long = RSI(14) < 30\nbreak_even_pct = soon\n")
                .unwrap();
        let err = cli::build_strategy(&adapter).unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid { .. }));
    }

    #[test]
    fn walk_forward_seed_must_be_numeric() {
        let adapter = FileConfigAdapter::from_string("[walk_forward]\nseed = abc\n").unwrap();
        assert!(matches!(
            cli::build_walk_forward_config(&adapter),
            Err(EngineError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn negative_population_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[genetic]\npopulation_size = -3\n").unwrap();
        assert!(matches!(
            cli::build_genetic_config(&adapter),
            Err(EngineError::ConfigInvalid { .. })
        ));
    }
}

mod gene_loading {
    use super::*;

    #[test]
    fn loads_bare_gene() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gene.json");
        let gene = seed_genes(0.001, 0.0005).remove(0);
        fs::write(&path, serde_json::to_string(&gene).unwrap()).unwrap();

        let loaded = cli::load_gene(&path).unwrap();
        assert_eq!(loaded.name, gene.name);
        assert_eq!(loaded.entry_short, gene.entry_short);
    }

    #[test]
    fn loads_gene_from_strategy_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("record.json");
        let gene = seed_genes(0.001, 0.0005).remove(2);
        let record = StrategyRecord {
            name: "BTCUSDT WFA test".into(),
            symbol: "BTCUSDT".into(),
            config: gene.clone(),
            roi: 7.5,
            drawdown: 4.0,
            win_rate: 50.0,
            trades: 0,
            trade_history: vec![],
            train_start_date: None,
            train_end_date: None,
        };
        fs::write(&path, serde_json::to_string_pretty(&record).unwrap()).unwrap();

        let loaded = cli::load_gene(&path).unwrap();
        assert_eq!(loaded.name, gene.name);
        assert_eq!(loaded.entry_long, gene.entry_long);
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            cli::load_gene(&path),
            Err(EngineError::Serialization(_))
        ));
    }
}

mod commands {
    use super::*;

    fn run(args: &[&str]) -> ExitCode {
        let mut argv = vec!["wfminer"];
        argv.extend_from_slice(args);
        cli::run(Cli::parse_from(argv))
    }

    #[test]
    fn validate_accepts_good_strategy() {
        let file = write_temp_ini(STRATEGY_INI);
        let code = run(&["validate", "--strategy", file.path().to_str().unwrap()]);
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn validate_rejects_strategy_without_entries() {
        let file = write_temp_ini("[strategy]\nname = Idle\nexit_long = RSI(14) > 70\n");
        let code = run(&["validate", "--strategy", file.path().to_str().unwrap()]);
        assert_ne!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn backtest_writes_result_json() {
        let ws = Workspace::new("[backtest]\ninitial_capital = 5000\nwarmup_bars = 50\n");
        let strategy = write_temp_ini(STRATEGY_INI);
        let output = ws.path("result.json");

        let code = run(&[
            "backtest",
            "--config",
            ws.config.to_str().unwrap(),
            "--strategy",
            strategy.path().to_str().unwrap(),
            "--symbol",
            "BTCUSDT",
            "--start",
            "2024-01-01",
            "--end",
            "2024-03-01",
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);

        let result: SimulationResult =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert!((result.initial_balance - 5000.0).abs() < 1e-9);
        assert_eq!(result.trade_count, result.trades.len());
        assert!(result.equity_curve.last().unwrap().time < at(2024, 3, 1));
    }

    #[test]
    fn backtest_insufficient_data_reports_error_object() {
        let ws = Workspace::new("[backtest]\nwarmup_bars = 200\nmin_bars = 50\n");
        let strategy = write_temp_ini(STRATEGY_INI);
        let output = ws.path("result.json");

        let code = run(&[
            "backtest",
            "--config",
            ws.config.to_str().unwrap(),
            "--strategy",
            strategy.path().to_str().unwrap(),
            "--symbol",
            "BTCUSDT",
            "--start",
            "2024-01-01",
            "--end",
            "2024-01-05",
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_ne!(code, ExitCode::SUCCESS);

        let body: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert!(body["error"].as_str().unwrap().contains("insufficient"));
    }

    #[test]
    fn backtest_missing_csv_dir_fails() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("engine.ini");
        fs::write(&config, "[backtest]\nwarmup_bars = 50\n").unwrap();
        let strategy = write_temp_ini(STRATEGY_INI);

        let code = run(&[
            "backtest",
            "--config",
            config.to_str().unwrap(),
            "--strategy",
            strategy.path().to_str().unwrap(),
            "--symbol",
            "BTCUSDT",
            "--start",
            "2024-01-01",
            "--end",
            "2024-02-01",
        ]);
        assert_ne!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn mine_then_backtest_mined_gene() {
        let ws = Workspace::new(
            "[backtest]\nwarmup_bars = 50\nmin_bars = 20\n\
             [genetic]\npopulation_size = 4\ngenerations = 1\nelite_count = 2\n\
             [fitness]\nmin_trades = 1\n\
             [walk_forward]\ntrain_months = 1\ntest_months = 1\n\
             min_total_return_pct = -1000000000\nmax_drawdown_pct = 101\nmax_attempts = 1\nseed = 17\n",
        );

        let code = run(&[
            "mine",
            "--config",
            ws.config.to_str().unwrap(),
            "--symbol",
            "BTCUSDT",
            "--start",
            "2024-01-01",
            "--end",
            "2024-04-01",
        ]);
        assert_eq!(code, ExitCode::SUCCESS);

        let written: Vec<_> = fs::read_dir(ws.path("strategies"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(written.len(), 1);
        let record: StrategyRecord =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert!(record.name.starts_with("BTCUSDT WFA "));

        let output = ws.path("replay.json");
        let code = run(&[
            "backtest",
            "--config",
            ws.config.to_str().unwrap(),
            "--gene",
            written[0].to_str().unwrap(),
            "--symbol",
            "BTCUSDT",
            "--start",
            "2024-02-01",
            "--end",
            "2024-04-01",
            "--output",
            output.to_str().unwrap(),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(output.exists());
    }
}
