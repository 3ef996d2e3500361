use clap::Parser;
use northflow::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
