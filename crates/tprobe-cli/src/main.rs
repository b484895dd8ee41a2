//! CLI entrypoint for tprobe.

mod check;
mod cli;
mod replay;

use clap::Parser;

use cli::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli.command) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Check { definition } => check::run_check(&definition),
        Command::Replay {
            definition,
            trace,
            config,
            format,
            output,
            threads,
            keep_going,
        } => replay::run_replay(replay::ReplayArgs {
            definition,
            trace,
            config,
            format: format.map(Into::into),
            output,
            concurrent: threads,
            keep_going,
        }),
    }
}
