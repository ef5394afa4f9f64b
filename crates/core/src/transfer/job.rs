//! Transfer jobs and the enumerators that produce them
//!
//! Enumeration is synchronous and exhaustive: the whole job list is built
//! before any worker starts.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path::{ParsedPath, RemotePath, normalize_prefix};

/// One unit of work: a single source copied to a single destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source: ParsedPath,
    pub destination: ParsedPath,
    /// Forward-slash path relative to the transfer root
    pub relative_path: String,
}

impl TransferJob {
    /// Local file to remote object
    pub fn upload(local: PathBuf, remote: RemotePath, relative_path: impl Into<String>) -> Self {
        Self {
            source: ParsedPath::Local(local),
            destination: ParsedPath::Remote(remote),
            relative_path: relative_path.into(),
        }
    }

    /// Remote object to local file
    pub fn download(remote: RemotePath, local: PathBuf, relative_path: impl Into<String>) -> Self {
        Self {
            source: ParsedPath::Remote(remote),
            destination: ParsedPath::Local(local),
            relative_path: relative_path.into(),
        }
    }
}

/// Build one upload job per regular file under `local_root`
///
/// Destination keys are `prefix + relative_path` where the prefix is the
/// destination key normalized to end with `/`. Symbolic links are neither
/// followed nor uploaded. Any walk error aborts the whole enumeration.
pub fn enumerate_upload(local_root: &Path, destination: &RemotePath) -> Result<Vec<TransferJob>> {
    let metadata = std::fs::metadata(local_root).map_err(|e| {
        Error::Enumeration(format!("cannot read {}: {e}", local_root.display()))
    })?;
    if !metadata.is_dir() {
        return Err(Error::Enumeration(format!(
            "{} is not a directory",
            local_root.display()
        )));
    }

    let prefix = destination.dir_prefix();
    let mut jobs = Vec::new();

    for entry in WalkDir::new(local_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let at = e
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| local_root.display().to_string());
            Error::Enumeration(format!("cannot walk {at}: {e}"))
        })?;

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            tracing::debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(local_root).map_err(|_| {
            Error::Enumeration(format!(
                "{} is outside {}",
                entry.path().display(),
                local_root.display()
            ))
        })?;
        let relative_path = key_segment(relative)?;
        let key = format!("{prefix}{relative_path}");

        jobs.push(TransferJob::upload(
            entry.into_path(),
            destination.with_key(key),
            relative_path,
        ));
    }

    tracing::debug!(
        root = %local_root.display(),
        files = jobs.len(),
        "enumerated upload tree"
    );
    Ok(jobs)
}

/// Download jobs for a key listing, plus the keys left out of it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadPlan {
    pub jobs: Vec<TransferJob>,
    /// Listed keys that produced no job
    pub skipped: Vec<String>,
}

/// Build one download job per key listed under `source`
///
/// Keys are expected to start with the source prefix. Directory marker keys
/// (ending in `/`), keys whose relative part contains `..` and keys mapping
/// to a local file already claimed by an earlier key are skipped. Keys
/// differing only in empty segments (`a//b` and `a/b`) share a local path,
/// so the first one listed wins.
pub fn enumerate_download(keys: &[String], source: &RemotePath, local_root: &Path) -> DownloadPlan {
    let prefix = source.dir_prefix();
    let mut plan = DownloadPlan::default();
    let mut claimed: HashSet<PathBuf> = HashSet::with_capacity(keys.len());

    for key in keys {
        let relative = relative_key(&prefix, key);
        if relative.is_empty() || relative.ends_with('/') {
            tracing::debug!(key = %key, "skipping directory marker");
            plan.skipped.push(key.clone());
            continue;
        }
        if relative.split('/').any(|segment| segment == "..") {
            tracing::warn!(key = %key, "skipping key that escapes the destination directory");
            plan.skipped.push(key.clone());
            continue;
        }

        let local = local_root.join(local_relative_path(relative));
        if !claimed.insert(local.clone()) {
            tracing::warn!(
                key = %key,
                path = %local.display(),
                "skipping key whose local path is already taken"
            );
            plan.skipped.push(key.clone());
            continue;
        }

        plan.jobs
            .push(TransferJob::download(source.with_key(key.clone()), local, relative));
    }

    plan
}

/// Part of `key` below `prefix`
///
/// Keys that do not start with the prefix are returned unchanged.
pub fn relative_key<'a>(prefix: &str, key: &'a str) -> &'a str {
    key.strip_prefix(prefix).unwrap_or(key)
}

/// Forward-slash relative key as a native relative path
pub fn local_relative_path(relative_key: &str) -> PathBuf {
    relative_key
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Inverse of [`relative_key`] followed by [`local_relative_path`]
pub fn reconstruct_key(prefix: &str, relative_path: &Path) -> String {
    let segments: Vec<String> = relative_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("{}{}", normalize_prefix(prefix), segments.join("/"))
}

/// Relative filesystem path as a forward-slash key segment
fn key_segment(relative: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_str().ok_or_else(|| {
                    Error::Enumeration(format!(
                        "file name is not valid UTF-8: {}",
                        relative.display()
                    ))
                })?;
                segments.push(name);
            }
            Component::CurDir => {}
            _ => {
                return Err(Error::Enumeration(format!(
                    "unexpected path component in {}",
                    relative.display()
                )));
            }
        }
    }
    Ok(segments.join("/"))
}
