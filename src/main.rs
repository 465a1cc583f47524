use clap::Parser;
use cointrack::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
