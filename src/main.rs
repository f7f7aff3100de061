use clap::Parser;
use resale_ledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
