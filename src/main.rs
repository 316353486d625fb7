use clap::Parser;
use wfminer::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
