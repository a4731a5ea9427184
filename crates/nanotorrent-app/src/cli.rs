//! Command-line front end.
//!
//! Every invocation restores persisted transfers, runs one command and shuts
//! the manager down again, so state carries across invocations.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use nanotorrent_config::defaults;
use nanotorrent_torrent_core::{DescriptorSource, TransferStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::{AppContext, bootstrap, rate_limits};
use crate::error::{AppError, AppResult};

/// Top-level arguments.
#[derive(Debug, Parser)]
#[command(name = "nanotorrent", version, about = "Minimal torrent lifecycle manager")]
pub struct Cli {
    /// Settings file; created with defaults when missing.
    #[arg(long, global = true, env = "NANOTORRENT_CONFIG", default_value = defaults::SETTINGS_FILE)]
    pub config: PathBuf,
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a transfer from a `.torrent` file.
    Add {
        /// Descriptor file to read.
        descriptor: PathBuf,
        /// Final save path; defaults to `download_path` from settings.
        #[arg(long)]
        save_path: Option<PathBuf>,
    },
    /// List transfers with their current status.
    List {
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
    /// Remove a transfer.
    Remove {
        /// Transfer identifier printed by `add` or `list`.
        id: Uuid,
        /// Delete downloaded data as well.
        #[arg(long)]
        delete_files: bool,
    },
    /// Poll transfers until interrupted with Ctrl-C.
    Run,
    /// Print metrics in the Prometheus text format.
    Metrics,
    /// Change persisted settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

/// Settings changes; each is written to the settings file immediately.
#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Set the default save path.
    SetDownloadPath {
        /// New default save path.
        path: PathBuf,
    },
    /// Set session-wide rate limits in bytes per second (0 = unlimited).
    SetSpeed {
        /// Download limit.
        #[arg(long, default_value_t = 0)]
        download: u64,
        /// Upload limit.
        #[arg(long, default_value_t = 0)]
        upload: u64,
    },
}

/// Output format for `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns.
    Table,
    /// Pretty-printed JSON array.
    Json,
}

/// Parse arguments, start the manager, run the command and shut down.
///
/// # Errors
///
/// Returns bootstrap failures, the command's failure, or a shutdown failure
/// when the command itself succeeded.
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let mut context = bootstrap(&cli.config).await?;
    let outcome = execute(cli.command, &mut context).await;
    let shutdown = context
        .manager
        .shutdown()
        .await
        .map_err(|err| AppError::lifecycle("shutdown", err));
    outcome.and(shutdown)
}

/// Run one command against a started context.
///
/// # Errors
///
/// Returns an error when the command's arguments are invalid or the
/// underlying operation fails.
pub async fn execute(command: Command, context: &mut AppContext) -> AppResult<()> {
    match command {
        Command::Add {
            descriptor,
            save_path,
        } => {
            let save_path = save_path
                .or_else(|| context.settings.settings().downloads.save_path())
                .ok_or(AppError::InvalidArgument {
                    field: "save_path",
                    reason: "no save path given and download_path is not set",
                    value: None,
                })?;
            let id = context
                .manager
                .add_transfer(DescriptorSource::path(descriptor), &save_path)
                .await
                .map_err(|err| AppError::lifecycle("add", err))?;
            println!("{id}");
            Ok(())
        }
        Command::List { output } => {
            let transfers = context.manager.list_transfers().await;
            println!("{}", render_transfers(&transfers, output)?);
            Ok(())
        }
        Command::Remove { id, delete_files } => context
            .manager
            .remove_transfer(id, delete_files)
            .await
            .map_err(|err| AppError::lifecycle("remove", err)),
        Command::Run => {
            info!("polling transfers; press Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .map_err(|source| AppError::Io {
                    operation: "signal.ctrl_c",
                    source,
                })?;
            info!("interrupt received");
            Ok(())
        }
        Command::Metrics => {
            let text = context
                .metrics
                .render()
                .map_err(|err| AppError::telemetry("metrics.render", err))?;
            print!("{text}");
            Ok(())
        }
        Command::Settings(change) => apply_settings(change, context).await,
    }
}

async fn apply_settings(change: SettingsCommand, context: &mut AppContext) -> AppResult<()> {
    match change {
        SettingsCommand::SetDownloadPath { path } => {
            if path.as_os_str().is_empty() {
                return Err(AppError::InvalidArgument {
                    field: "path",
                    reason: "download path is empty",
                    value: None,
                });
            }
            context
                .settings
                .set_download_path(&path)
                .map_err(|err| AppError::config("settings.set_download_path", err))
        }
        SettingsCommand::SetSpeed { download, upload } => {
            context
                .settings
                .set_speed_limits(download, upload)
                .map_err(|err| AppError::config("settings.set_speed_limits", err))?;
            let limits = rate_limits(context.settings.settings());
            if let Err(err) = context.manager.set_rate_limits(limits).await {
                warn!(error = %err, "rate limits saved but not applied");
            }
            Ok(())
        }
    }
}

/// Render transfer rows in the requested format.
///
/// # Errors
///
/// Returns [`AppError::Render`] if JSON encoding fails.
pub fn render_transfers(transfers: &[TransferStatus], format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(transfers)
            .map_err(|source| AppError::Render { source }),
        OutputFormat::Table => {
            let header = format!("{:<36} {:<20} {:>7} NAME", "ID", "STATE", "PROG");
            let rows = transfers.iter().map(|transfer| {
                let progress = format!("{:.1}%", transfer.progress * 100.0);
                format!(
                    "{:<36} {:<20} {:>7} {}",
                    transfer.id,
                    transfer.state.label(),
                    progress,
                    transfer.name
                )
            });
            Ok(std::iter::once(header)
                .chain(rows)
                .collect::<Vec<_>>()
                .join("\n"))
        }
    }
}
