//! get command - Download an object or everything under a prefix
//!
//! A key ending in `/` is treated as a prefix: all keys below it are listed
//! and downloaded in parallel, mirroring the key layout under the local
//! directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use s3cli_core::{Error, RemotePath, Result, download_file, download_keys, parse_remote_path};

use super::{Context, fail, report_single, report_stats};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Download objects
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Source (alias/bucket/key or alias/bucket/prefix/)
    pub source: String,

    /// Local file or directory
    pub target: PathBuf,

    /// Number of concurrent downloads for prefixes
    #[arg(short = 'j', long, value_name = "N", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,
}

/// Execute the get command
pub async fn execute(args: GetArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let source = match parse_get_source(&args.source) {
        Ok(source) => source,
        Err(e) => return fail(&formatter, &e),
    };

    let client = match ctx.client(&source.alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };
    let options = ctx.transfer_options(args.concurrency);

    if source.key.ends_with('/') {
        let keys = match ctx.guard(client.list_all_keys(&source)).await {
            Ok(keys) if keys.is_empty() => {
                let err = Error::NotFound(format!("No objects under {source}"));
                return fail(&formatter, &err);
            }
            Ok(keys) => keys,
            Err(e) => return fail(&formatter, &e),
        };

        let progress = Arc::new(ProgressBar::files(formatter.config()));
        let result =
            download_keys(client, &keys, &source, &args.target, &options, progress).await;
        return match result {
            Ok(stats) => report_stats(&formatter, &stats, &ctx.cancel),
            Err(e) => fail(&formatter, &e),
        };
    }

    let local = local_destination(&source, &args.target);
    let progress = Arc::new(ProgressBar::bytes(formatter.config()));
    match download_file(client, &source, &local, &options, progress).await {
        Ok(bytes) => {
            let target = local.display().to_string();
            report_single(&formatter, source.to_string(), target, bytes);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

/// Parse the source, rejecting the bucket root
fn parse_get_source(path: &str) -> Result<RemotePath> {
    let source = parse_remote_path(path)?;
    if source.key.is_empty() {
        return Err(Error::InvalidPath(format!(
            "'{path}' has no key. Use alias/bucket/key or alias/bucket/prefix/"
        )));
    }
    Ok(source)
}

/// File a single object is written to
///
/// An existing directory, or a target spelled with a trailing separator,
/// receives the object under its own name.
fn local_destination(source: &RemotePath, target: &Path) -> PathBuf {
    let names_dir = target.is_dir()
        || target
            .as_os_str()
            .to_string_lossy()
            .ends_with(std::path::is_separator);
    match source.file_name() {
        Some(name) if names_dir => target.join(name),
        _ => target.to_path_buf(),
    }
}
