//! Cascade CLI entrypoint.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod config;
mod handlers;
mod host;

use commands::Commands;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Parser)]
#[command(name = "cascade")]
#[command(author, version, about = "Downstream build trigger workspace tool", long_about = None)]
struct Cli {
    /// Workspace description file
    #[arg(short, long, global = true, default_value = "cascade.yaml")]
    workspace: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Validate => handlers::validate(&cli.workspace)?,
        Commands::Graph => handlers::graph(&cli.workspace)?,
        Commands::Simulate {
            project,
            number,
            result,
            change,
            matrix_end,
        } => {
            handlers::simulate(&cli.workspace, &project, number, &result, change, matrix_end).await?
        }
        Commands::Complete { prefix } => handlers::complete(&cli.workspace, &prefix)?,
        Commands::Rename {
            old_name,
            new_name,
            write,
        } => handlers::rename(&cli.workspace, &old_name, &new_name, write)?,
        Commands::Schema { target } => handlers::schema(target)?,
    }

    Ok(())
}
