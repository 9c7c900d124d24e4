// genui - declarative UI trees from patch streams
//
// The binary is a thin shell over the library:
// - render: open a patch source (file, stdin, HTTP generator), build the tree
//   incrementally, validate it against a catalog, print an outline
// - validate / prompt: catalog tooling for generator authors
// - config: manage ~/.config/genui/config.toml
//
// Warnings raised by the library while skipping bad input are collected by a
// tracing layer and summarised at the end of a render.

mod cli;
mod config;
mod logging;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, RenderArgs};
use config::{Config, LogRotation, LoggingConfig};
use logging::WarningCollector;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands run before logging so a broken config file can still be reset
    if let Commands::Config { show, path, reset } = cli.command {
        return cli::handle_config(show, path, reset);
    }

    let config = Config::from_env()?;

    let warnings = WarningCollector::new();
    // The guard must be kept alive for the duration of the program to ensure logs flush
    let _file_guard = init_logging(&config.logging, &warnings);

    match cli.command {
        Commands::Render {
            source,
            catalog,
            data,
            signed_in,
            prompt,
            json,
        } => {
            let args = RenderArgs {
                source,
                catalog,
                data,
                signed_in,
                prompt,
                json,
            };
            cli::handle_render(&config, args, &warnings).await
        }
        Commands::Validate { tree, catalog } => {
            cli::handle_validate(&config, &tree, catalog.as_deref())
        }
        Commands::Prompt { catalog } => cli::handle_prompt(&config, catalog.as_deref()),
        Commands::Config { .. } => Ok(()),
    }
}

/// Initialize tracing: stderr output, warning capture, optional JSON log files
///
/// Precedence: RUST_LOG env var > config file > default "info"
fn init_logging(logging: &LoggingConfig, warnings: &WarningCollector) -> Option<WorkerGuard> {
    let default_filter = format!("genui={}", logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Set up file logging if enabled (non-blocking writer with rotation)
    let (file_layer, guard) = if logging.file_enabled {
        match std::fs::create_dir_all(&logging.file_dir) {
            Ok(()) => {
                let file_appender = match logging.file_rotation {
                    LogRotation::Hourly => {
                        tracing_appender::rolling::hourly(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Daily => {
                        tracing_appender::rolling::daily(&logging.file_dir, &logging.file_prefix)
                    }
                    LogRotation::Never => {
                        tracing_appender::rolling::never(&logging.file_dir, &logging.file_prefix)
                    }
                };

                // Wrap in non-blocking writer (writes happen in background thread)
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

                // File layer uses JSON format for structured log parsing
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_ansi(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!(
                    "Warning: Could not create log directory {:?}: {}",
                    logging.file_dir, e
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(warnings.layer())
        .with(file_layer)
        .init();

    guard
}
