//! # subrepro
//!
//! Runs the subscriptions store as a GraphQL server, or drives the cached
//! client view against it to show how normalization loses rows.

#![deny(unsafe_code)]

mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use subrepro_core::AccountScope;
use subrepro_store::{Seed, Store, StoreConfig};
use subrepro_telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// Subscription cache reproduction harness.
#[derive(Parser, Debug)]
#[command(name = "subrepro", about = "Subscription cache reproduction harness")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the GraphQL schema over HTTP.
    Serve {
        /// Host to bind.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to bind (0 for auto-assign).
        #[arg(long, default_value = "9091")]
        port: u16,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Mount the view, add rows through it and compare with the server.
    Demo(demo::DemoArgs),
    /// Print the schema SDL.
    Schema,
}

/// Store options shared by `serve` and in-process `demo`.
#[derive(clap::Args, Debug, Clone)]
struct StoreArgs {
    /// Which rows the account's subscriptions field returns
    /// (`full` or `filtered`, default `full`).
    #[arg(long)]
    account_scope: Option<AccountScope>,

    /// JSON seed file replacing the built-in rows.
    #[arg(long)]
    seed: Option<PathBuf>,
}

impl StoreArgs {
    /// Whether any store option was given on the command line.
    fn is_set(&self) -> bool {
        self.account_scope.is_some() || self.seed.is_some()
    }

    fn build(&self) -> Result<Store> {
        let seed = match &self.seed {
            Some(path) => Seed::from_path(path)
                .with_context(|| format!("Failed to load seed: {}", path.display()))?,
            None => Seed::default(),
        };
        Ok(Store::new(StoreConfig {
            account_scope: self.account_scope.unwrap_or_default(),
            seed,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let telemetry = init_telemetry(TelemetryConfig {
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        // The demo reports how many warnings the run produced
        capture_warnings: matches!(cli.command, Command::Demo(_)),
        ..Default::default()
    });

    match cli.command {
        Command::Serve { host, port, store } => serve(host, port, store).await,
        Command::Demo(args) => demo::run(args, telemetry.logs()).await,
        Command::Schema => {
            print!("{}", subrepro_schema::build_schema(Store::default()).sdl());
            Ok(())
        }
    }
}

async fn serve(host: String, port: u16, store: StoreArgs) -> Result<()> {
    let store = store.build()?;
    let handle = subrepro_server::start(subrepro_server::ServerConfig { host, port }, store)
        .await
        .context("Failed to start server")?;

    tracing::info!(url = %handle.graphql_url(), "subrepro server ready");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c")?;

    tracing::info!("Shutting down");
    handle.shutdown();
    Ok(())
}
