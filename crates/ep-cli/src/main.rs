use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ep_cli::commands::{analyze, episodes};
use ep_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // stdout carries the report and CSV output
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut stdout = io::stdout().lock();
    match command {
        Commands::Analyze { input, json } => analyze::run(&mut stdout, input, *json, &config)?,
        Commands::Episodes { input, output } => {
            episodes::run(&mut stdout, input, output.as_deref(), &config)?;
        }
    }

    Ok(())
}
