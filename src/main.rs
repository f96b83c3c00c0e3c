//! ClimaQL entry point.

use clap::{Parser, Subcommand};
use climaql::{run_stdio, ClimaqlServer, Config, Domain};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

/// ClimaQL: natural-language queries over climate and disaster datasets
#[derive(Parser, Debug)]
#[command(name = "climaql")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Run against a spawned query service instead of opening the datasets
    /// in-process, e.g. --remote "climaql serve"
    #[arg(short, long, global = true)]
    remote: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run as a query service over stdio (default behavior)
    Serve {
        /// Enable JSON logging format
        #[arg(long)]
        json_logs: bool,
    },
    /// Ask a natural-language question against one domain
    Ask {
        /// Dataset domain
        #[arg(short, long)]
        domain: Domain,
        /// Question text
        question: String,
    },
    /// List the tables of a domain
    Tables {
        /// Dataset domain
        #[arg(short, long)]
        domain: Domain,
    },
    /// Describe one table's columns
    Describe {
        /// Dataset domain
        #[arg(short, long)]
        domain: Domain,
        /// Table name
        table: String,
    },
    /// Print the first rows of a table
    Sample {
        /// Dataset domain
        #[arg(short, long)]
        domain: Domain,
        /// Table name
        table: String,
        /// Number of rows
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Serve is handled first: it owns the process and its logging setup.
    match &args.command {
        None => return run_serve(config, false).await,
        Some(Command::Serve { json_logs }) => {
            let json_logs = *json_logs || config.logging.json;
            return run_serve(config, json_logs).await;
        }
        _ => {}
    }

    // Minimal logging for CLI commands
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let mode = if let Some(command) = &args.remote {
        cli::ExecutionMode::Remote(Box::new(config), command.clone())
    } else {
        cli::ExecutionMode::Local(Box::new(config))
    };

    match args.command {
        Some(Command::Ask { domain, question }) => {
            cli::run_ask(mode, domain, &question, args.json).await
        }
        Some(Command::Tables { domain }) => cli::run_tables(mode, domain, args.json).await,
        Some(Command::Describe { domain, table }) => {
            cli::run_describe(mode, domain, &table, args.json).await
        }
        Some(Command::Sample {
            domain,
            table,
            count,
        }) => cli::run_sample(mode, domain, &table, count, args.json).await,
        Some(Command::Serve { .. }) | None => unreachable!("serve handled above"),
    }
}

async fn run_serve(config: Config, json_logs: bool) -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the protocol.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let stores = cli::open_stores(&config)?;
    if stores.is_empty() {
        anyhow::bail!("no datasets configured; add a [datasets] section to the config");
    }
    run_stdio(ClimaqlServer::new(stores)).await
}
