//! rm command - Remove objects
//!
//! Removes a single object, or every object under a prefix with `-r`.

use std::collections::HashSet;

use clap::Args;
use s3cli_core::{Error, ObjectStore, RemotePath, Result, parse_remote_path};
use serde::Serialize;

use super::{Context, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Most keys a single bulk delete request accepts
const DELETE_BATCH_SIZE: usize = 1000;

/// Remove objects
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Object or prefix to remove (alias/bucket/key or alias/bucket/prefix/)
    pub path: String,

    /// Remove recursively (remove all objects with the given prefix)
    #[arg(short, long)]
    pub recursive: bool,

    /// Ignore objects that do not exist
    #[arg(short, long)]
    pub force: bool,

    /// Only show what would be deleted (dry run)
    #[arg(long)]
    pub dry_run: bool,
}

/// What an rm invocation will delete
#[derive(Debug, PartialEq, Eq)]
enum RmTarget {
    Object(RemotePath),
    Prefix(RemotePath),
}

#[derive(Debug, Default, Serialize)]
struct RmOutput {
    dry_run: bool,
    deleted: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<String>,
}

impl RmOutput {
    fn exit_code(&self) -> ExitCode {
        if self.failed.is_empty() {
            ExitCode::Success
        } else {
            ExitCode::PartialFailure
        }
    }
}

/// Execute the rm command
pub async fn execute(args: RmArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let target = match plan(&args.path, args.recursive) {
        Ok(target) => target,
        Err(e) => return fail(&formatter, &e),
    };

    let alias = match &target {
        RmTarget::Object(path) | RmTarget::Prefix(path) => path.alias.clone(),
    };
    let client = match ctx.client(&alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };

    let result = match &target {
        RmTarget::Object(path) => ctx.guard(delete_single(client.as_ref(), path, &args)).await,
        RmTarget::Prefix(prefix) => {
            ctx.guard(delete_prefix(client.as_ref(), prefix, &args, &formatter))
                .await
        }
    };

    match result {
        Ok(output) => {
            report(&formatter, &output);
            output.exit_code()
        }
        Err(e) => fail(&formatter, &e),
    }
}

/// Decide between a single delete and a prefix delete
fn plan(path: &str, recursive: bool) -> Result<RmTarget> {
    let remote = parse_remote_path(path)?;

    if recursive {
        // Never wipe a whole bucket through rm
        if remote.key.trim_matches('/').is_empty() {
            return Err(Error::InvalidPath(format!(
                "Refusing to remove everything in bucket '{}'",
                remote.bucket
            )));
        }
        let prefix = remote.with_key(remote.dir_prefix());
        return Ok(RmTarget::Prefix(prefix));
    }

    if remote.key.is_empty() || remote.key.ends_with('/') {
        return Err(Error::InvalidPath(format!(
            "'{path}' is a prefix. Use -r to remove everything under it"
        )));
    }
    Ok(RmTarget::Object(remote))
}

async fn delete_single(
    client: &dyn ObjectStore,
    path: &RemotePath,
    args: &RmArgs,
) -> Result<RmOutput> {
    let mut output = RmOutput {
        dry_run: args.dry_run,
        ..Default::default()
    };

    if args.dry_run {
        output.deleted.push(path.to_full_path());
        return Ok(output);
    }

    match client.delete_object(path).await {
        Ok(()) => output.deleted.push(path.to_full_path()),
        Err(Error::NotFound(_)) if args.force => {
            tracing::debug!(path = %path, "object already absent");
        }
        Err(e) => return Err(e),
    }
    Ok(output)
}

async fn delete_prefix(
    client: &dyn ObjectStore,
    prefix: &RemotePath,
    args: &RmArgs,
    formatter: &Formatter,
) -> Result<RmOutput> {
    let keys = client.list_all_keys(prefix).await?;
    let mut output = RmOutput {
        dry_run: args.dry_run,
        ..Default::default()
    };

    if keys.is_empty() {
        if !args.force {
            formatter.warning(&format!("No objects found under {prefix}"));
        }
        return Ok(output);
    }

    if args.dry_run {
        output.deleted = keys.iter().map(|k| prefix.with_key(k).to_full_path()).collect();
        return Ok(output);
    }

    for chunk in keys.chunks(DELETE_BATCH_SIZE) {
        match client.delete_objects(&prefix.bucket, chunk.to_vec()).await {
            Ok(deleted) => {
                let (done, missed) = split_batch(chunk, &deleted);
                let full = |k: &str| prefix.with_key(k).to_full_path();
                output.deleted.extend(done.into_iter().map(full));
                output.failed.extend(missed.into_iter().map(full));
            }
            Err(e) => {
                tracing::warn!(prefix = %prefix, error = %e, "batch delete failed");
                output
                    .failed
                    .extend(chunk.iter().map(|k| prefix.with_key(k.as_str()).to_full_path()));
            }
        }
    }

    Ok(output)
}

/// Partition a batch into the keys the store confirmed and the rest
fn split_batch<'a>(requested: &'a [String], deleted: &[String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let confirmed: HashSet<&str> = deleted.iter().map(String::as_str).collect();
    requested
        .iter()
        .map(String::as_str)
        .partition(|key| confirmed.contains(key))
}

fn report(formatter: &Formatter, output: &RmOutput) {
    if formatter.is_json() {
        formatter.json(output);
        return;
    }

    let verb = if output.dry_run { "Would remove" } else { "Removed" };
    for path in &output.deleted {
        formatter.println(&format!("{verb}: {path}"));
    }
    for path in &output.failed {
        formatter.error(&format!("Failed to remove: {path}"));
    }

    if !output.dry_run && output.deleted.len() > 1 {
        formatter.success(&format!("Removed {} objects.", output.deleted.len()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_single_object() {
        let target = plan("myalias/mybucket/file.txt", false).unwrap();
        assert_eq!(
            target,
            RmTarget::Object(RemotePath::new("myalias", "mybucket", "file.txt"))
        );
    }

    #[test]
    fn test_plan_prefix_requires_recursive() {
        assert!(matches!(
            plan("myalias/mybucket/path/to/", false),
            Err(Error::InvalidPath(_))
        ));
        assert!(plan("myalias/mybucket", false).is_err());
    }

    #[test]
    fn test_plan_recursive_normalizes_prefix() {
        let RmTarget::Prefix(prefix) = plan("myalias/mybucket/logs", true).unwrap() else {
            panic!("expected prefix delete");
        };
        assert_eq!(prefix.key, "logs/");
    }

    #[test]
    fn test_plan_refuses_whole_bucket() {
        assert!(plan("myalias/mybucket", true).is_err());
        assert!(plan("myalias/mybucket/", true).is_err());
    }

    #[test]
    fn test_split_batch() {
        let requested = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let deleted = vec!["c".to_string(), "a".to_string()];
        let (done, missed) = split_batch(&requested, &deleted);
        assert_eq!(done, vec!["a", "c"]);
        assert_eq!(missed, vec!["b"]);
    }

    #[test]
    fn test_partial_delete_exit_code() {
        let output = RmOutput {
            deleted: vec!["a/b/x".into()],
            failed: vec!["a/b/y".into()],
            ..Default::default()
        };
        assert_eq!(output.exit_code(), ExitCode::PartialFailure);
        assert_eq!(RmOutput::default().exit_code(), ExitCode::Success);
    }
}
