//! put command - Upload a file or a directory tree
//!
//! Directories are uploaded in parallel through the transfer engine; a single
//! file is streamed with a byte progress bar.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use s3cli_core::{Error, RemotePath, Result, parse_remote_path, upload_file, upload_tree};

use super::{Context, fail, report_single, report_stats};
use crate::exit_code::ExitCode;
use crate::output::ProgressBar;

/// Upload local files
#[derive(Args, Debug)]
pub struct PutArgs {
    /// Local file or directory
    pub source: PathBuf,

    /// Destination (alias/bucket/key or alias/bucket/prefix/)
    pub target: String,

    /// Number of concurrent uploads for directories
    #[arg(short = 'j', long, value_name = "N", allow_negative_numbers = true)]
    pub concurrency: Option<i64>,

    /// Content type for uploaded objects (guessed from file names by default)
    #[arg(long)]
    pub content_type: Option<String>,
}

/// Execute the put command
pub async fn execute(args: PutArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let destination = match parse_remote_path(&args.target) {
        Ok(path) => path,
        Err(e) => return fail(&formatter, &e),
    };

    let metadata = match tokio::fs::metadata(&args.source).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let err = Error::NotFound(format!("{}", args.source.display()));
            return fail(&formatter, &err);
        }
        Err(e) => return fail(&formatter, &e.into()),
    };

    let client = match ctx.client(&destination.alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };
    let options = ctx
        .transfer_options(args.concurrency)
        .content_type(args.content_type);

    if metadata.is_dir() {
        let progress = Arc::new(ProgressBar::files(formatter.config()));
        return match upload_tree(client, &args.source, &destination, &options, progress).await {
            Ok(stats) => report_stats(&formatter, &stats, &ctx.cancel),
            Err(e) => fail(&formatter, &e),
        };
    }

    let target = match object_destination(&destination, &args.source) {
        Ok(target) => target,
        Err(e) => return fail(&formatter, &e),
    };
    let progress = Arc::new(ProgressBar::bytes(formatter.config()));
    match upload_file(client, &args.source, &target, &options, progress).await {
        Ok(bytes) => {
            let source = args.source.display().to_string();
            report_single(&formatter, source, target.to_string(), bytes);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

/// Object a single file lands on
///
/// A destination naming a prefix (empty key or trailing `/`) gets the file name appended.
fn object_destination(destination: &RemotePath, local: &Path) -> Result<RemotePath> {
    if !destination.key.is_empty() && !destination.key.ends_with('/') {
        return Ok(destination.clone());
    }

    let name = local
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::InvalidPath(format!(
                "Cannot derive an object name from '{}'",
                local.display()
            ))
        })?;
    Ok(destination.join(name))
}
