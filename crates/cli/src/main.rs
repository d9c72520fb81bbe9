// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Smishing evaluation CLI

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, EvalConfig, commands, signal::cancel_on_signal};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries progress and tables
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Run(args) => {
            let config = EvalConfig::from_env()?;
            info!(models = args.models.len(), "Starting evaluation run");

            let cancel = CancellationToken::new();
            let signal_handler = tokio::spawn(cancel_on_signal(cancel.clone()));
            let outcome = commands::run(&args, &config, cancel).await;
            signal_handler.abort();
            outcome?;
        }
        Commands::Metrics(args) => {
            println!("{}", commands::metrics(&args)?);
        }
    }

    Ok(())
}
