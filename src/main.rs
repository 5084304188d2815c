use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod consensus;
mod core;
mod parsing;
mod tools;
mod utils;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Pipeline progress is logged at info; verbose adds per-tool detail
    let filter = if cli.verbose {
        EnvFilter::new("minvar=debug,info")
    } else {
        EnvFilter::new("minvar=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        cli::Commands::Prepare(args) => {
            cli::prepare::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Phase(args) => {
            cli::phase::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Subtype(args) => {
            cli::subtype::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
