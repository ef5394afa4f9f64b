//! CLI command definitions and execution
//!
//! This module contains all CLI commands and their implementations.
//! Every command receives a [`Context`] carrying the resolved output settings,
//! the config location and the cancellation token shared with the transfer
//! engine.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use s3cli_core::{
    AliasManager, ColorMode, ConfigManager, Defaults, Error, ObjectStore, RemotePath, Result,
    TransferOptions, TransferStats, parse_remote_path,
};
use s3cli_s3::S3Client;
use tokio_util::sync::CancellationToken;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod alias;
mod cat;
mod get;
mod ls;
mod put;
mod rm;
mod share;
mod stat;

/// Deadline for metadata operations when `--timeout` is not given
const METADATA_DEADLINE: Duration = Duration::from_secs(2 * 60);
/// Deadline for `cat`
const STREAM_DEADLINE: Duration = Duration::from_secs(10 * 60);
/// Deadline for `put` and `get`
const TRANSFER_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

/// s3cli - S3 command-line client
///
/// A command-line interface for S3-compatible object storage services with
/// parallel bulk upload and download.
#[derive(Parser, Debug)]
#[command(name = "s3cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    /// Configuration file to use instead of the default location
    /// ($S3CLI_CONFIG_DIR/config.toml, else the platform config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Abort the operation after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storage service aliases
    #[command(subcommand)]
    Alias(alias::AliasCommands),

    /// List buckets and objects
    Ls(ls::LsArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Display object contents
    Cat(cat::CatArgs),

    /// Remove objects
    Rm(rm::RmArgs),

    /// Upload a file or a directory tree
    Put(put::PutArgs),

    /// Download an object or everything under a prefix
    Get(get::GetArgs),

    /// Generate a presigned URL
    Share(share::ShareArgs),
}

impl Commands {
    /// Deadline applied when `--timeout` is not given
    fn default_deadline(&self) -> Option<Duration> {
        match self {
            Commands::Alias(_) => None,
            Commands::Cat(_) => Some(STREAM_DEADLINE),
            Commands::Put(_) | Commands::Get(_) => Some(TRANSFER_DEADLINE),
            Commands::Ls(_) | Commands::Stat(_) | Commands::Rm(_) | Commands::Share(_) => {
                Some(METADATA_DEADLINE)
            }
        }
    }
}

/// Resolved global state handed to every command
pub struct Context {
    pub output: OutputConfig,
    pub config: ConfigManager,
    pub defaults: Defaults,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.output.clone())
    }

    pub fn aliases(&self) -> AliasManager {
        AliasManager::with_config_manager(self.config.clone())
    }

    /// Resolve an alias and connect to its endpoint
    pub async fn client(&self, alias_name: &str) -> Result<Arc<dyn ObjectStore>> {
        let alias = self.aliases().get(alias_name)?;
        let client = S3Client::new(alias).await?;
        Ok(Arc::new(client))
    }

    /// Transfer settings for `put` and `get`, falling back to the configured concurrency
    pub fn transfer_options(&self, jobs: Option<i64>) -> TransferOptions {
        let default_jobs = i64::try_from(self.defaults.concurrency).unwrap_or(i64::MAX);
        TransferOptions::new()
            .concurrency(jobs.unwrap_or(default_jobs))
            .cancel(self.cancel.clone())
    }

    /// Run a store call, giving up when the operation is cancelled
    pub async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = fut => result,
        }
    }
}

/// Print an error and turn it into an exit code
pub fn fail(formatter: &Formatter, err: &Error) -> ExitCode {
    formatter.error(&err.to_string());
    ExitCode::from(err)
}

/// JSON output for a single-object transfer
#[derive(Debug, Serialize)]
struct TransferOutput {
    status: &'static str,
    source: String,
    target: String,
    size_bytes: u64,
    size_human: String,
}

/// Print the outcome of a single-object transfer
fn report_single(formatter: &Formatter, source: String, target: String, bytes: u64) {
    let size_human = humansize::format_size(bytes, humansize::BINARY);
    if formatter.is_json() {
        formatter.json(&TransferOutput {
            status: "success",
            source,
            target,
            size_bytes: bytes,
            size_human,
        });
    } else {
        formatter.println(&format!("{source} -> {target} ({size_human})"));
    }
}

/// Print the outcome of a bulk transfer and pick the exit code
fn report_stats(
    formatter: &Formatter,
    stats: &TransferStats,
    cancel: &CancellationToken,
) -> ExitCode {
    if formatter.is_json() {
        formatter.json(stats);
    } else {
        for failure in &stats.failures {
            formatter.error(&failure.error);
        }
        formatter.println(&stats.summary());
    }

    if stats.is_complete() {
        ExitCode::Success
    } else if cancel.is_cancelled() {
        ExitCode::Interrupted
    } else {
        ExitCode::PartialFailure
    }
}

/// Parse a remote path that must name a single object
fn parse_object_path(path: &str) -> Result<RemotePath> {
    let remote = parse_remote_path(path)?;
    if remote.key.is_empty() || remote.key.ends_with('/') {
        return Err(Error::InvalidPath(format!(
            "'{path}' does not name an object. Use format: alias/bucket/key"
        )));
    }
    Ok(remote)
}

/// Cancel `token` on Ctrl+C or when `deadline` elapses
fn spawn_cancel_triggers(token: CancellationToken, deadline: Option<Duration>) {
    tokio::spawn(async move {
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::signal::ctrl_c() => tracing::warn!("interrupted, cancelling"),
            _ = expired => tracing::warn!(?deadline, "deadline reached, cancelling"),
        }
        token.cancel();
    });
}

fn config_manager(cli: &Cli) -> Result<ConfigManager> {
    match &cli.config {
        Some(path) => Ok(ConfigManager::with_path(path.clone())),
        None => ConfigManager::new(),
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let flags = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    let loaded = config_manager(&cli).and_then(|manager| {
        let config = manager.load()?;
        Ok((manager, config))
    });
    let (config, file) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return fail(&Formatter::new(flags), &e),
    };
    tracing::debug!(path = %config.config_path().display(), "using configuration");

    let output = flags.with_defaults(&file.defaults);
    if output.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    } else if file.defaults.color == ColorMode::Always {
        console::set_colors_enabled(true);
        console::set_colors_enabled_stderr(true);
    }

    let deadline = cli
        .timeout
        .map(Duration::from_secs)
        .or_else(|| cli.command.default_deadline());
    let cancel = CancellationToken::new();
    spawn_cancel_triggers(cancel.clone(), deadline);

    let ctx = Context {
        output,
        config,
        defaults: file.defaults,
        cancel: cancel.clone(),
    };

    let code = match cli.command {
        Commands::Alias(cmd) => alias::execute(cmd, &ctx).await,
        Commands::Ls(args) => ls::execute(args, &ctx).await,
        Commands::Stat(args) => stat::execute(args, &ctx).await,
        Commands::Cat(args) => cat::execute(args, &ctx).await,
        Commands::Rm(args) => rm::execute(args, &ctx).await,
        Commands::Put(args) => put::execute(args, &ctx).await,
        Commands::Get(args) => get::execute(args, &ctx).await,
        Commands::Share(args) => share::execute(args, &ctx).await,
    };

    // Stop the trigger task
    cancel.cancel();
    code
}
