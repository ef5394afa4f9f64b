//! Parallel bulk transfer engine
//!
//! A batch is enumerated up front into [`TransferJob`]s, then drained by a
//! fixed number of workers sharing one queue. Per-file failures are counted,
//! never propagated: callers get [`TransferStats`] back and decide what a
//! partial result means. Only enumeration and pool setup fail the whole call.

mod executor;
mod job;
mod pool;
mod progress;
mod stats;

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::traits::ObjectStore;

pub use crate::config::DEFAULT_CONCURRENCY;
pub use executor::{DestinationFile, TransferExecutor};
pub use job::{
    DownloadPlan, TransferJob, enumerate_download, enumerate_upload, local_relative_path,
    reconstruct_key, relative_key,
};
pub use pool::{run_pool, worker_count};
pub use progress::{NoopProgress, ProgressReader, ProgressSink, noop};
pub use stats::{StatsAggregator, TransferFailure, TransferOutcome, TransferStats};

/// Knobs shared by all transfer entry points
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Maximum concurrent jobs
    pub concurrency: usize,
    /// Content type for uploads; guessed from the file name when unset
    pub content_type: Option<String>,
    /// Cancels queued and in-flight jobs
    pub cancel: CancellationToken,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            content_type: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker count; values below one become one
    pub fn concurrency(mut self, requested: i64) -> Self {
        self.concurrency = worker_count(requested);
        self
    }

    pub fn content_type(mut self, content_type: Option<String>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn executor(&self, store: Arc<dyn ObjectStore>) -> Arc<TransferExecutor> {
        Arc::new(TransferExecutor::new(
            store,
            self.cancel.clone(),
            self.content_type.clone(),
        ))
    }
}

/// Upload every regular file under `local_root` below `destination`
///
/// `progress` counts finished files.
pub async fn upload_tree(
    store: Arc<dyn ObjectStore>,
    local_root: &Path,
    destination: &RemotePath,
    options: &TransferOptions,
    progress: Arc<dyn ProgressSink>,
) -> Result<TransferStats> {
    let jobs = enumerate_upload(local_root, destination)?;
    tracing::info!(
        files = jobs.len(),
        src = %local_root.display(),
        dst = %destination,
        "uploading tree"
    );
    run_pool(jobs, options.executor(store), options.concurrency, progress).await
}

/// Download `keys` from below `source` into `local_root`
///
/// Keys are typically the result of [`ObjectStore::list_all_keys`] on the
/// same source. Keys that produce no job are counted in
/// [`TransferStats::skipped`]. `progress` counts finished files.
pub async fn download_keys(
    store: Arc<dyn ObjectStore>,
    keys: &[String],
    source: &RemotePath,
    local_root: &Path,
    options: &TransferOptions,
    progress: Arc<dyn ProgressSink>,
) -> Result<TransferStats> {
    let plan = enumerate_download(keys, source, local_root);
    tracing::info!(
        files = plan.jobs.len(),
        skipped = plan.skipped.len(),
        src = %source,
        dst = %local_root.display(),
        "downloading keys"
    );
    let mut stats =
        run_pool(plan.jobs, options.executor(store), options.concurrency, progress).await?;
    stats.skipped = plan.skipped.len();
    Ok(stats)
}

/// Upload a single file, reporting bytes to `progress`
pub async fn upload_file(
    store: Arc<dyn ObjectStore>,
    local: &Path,
    destination: &RemotePath,
    options: &TransferOptions,
    progress: Arc<dyn ProgressSink>,
) -> Result<u64> {
    let size = tokio::fs::metadata(local)
        .await
        .map_err(|e| Error::transfer(local.display().to_string(), destination.to_string(), e.into()))?
        .len();
    progress.set_total(Some(size));

    let relative = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let job = TransferJob::upload(local.to_path_buf(), destination.clone(), relative);

    let result = options.executor(store).execute(&job, &progress).await;
    progress.finish();
    result
}

/// Download a single object, reporting bytes to `progress`
pub async fn download_file(
    store: Arc<dyn ObjectStore>,
    source: &RemotePath,
    local: &Path,
    options: &TransferOptions,
    progress: Arc<dyn ProgressSink>,
) -> Result<u64> {
    let size = match store.head_object(source).await {
        Ok(info) => info.size_bytes.and_then(|s| u64::try_from(s).ok()),
        Err(e) => {
            tracing::debug!(src = %source, error = %e, "size unknown before download");
            None
        }
    };
    progress.set_total(size);

    let relative = source.file_name().unwrap_or_default().to_string();
    let job = TransferJob::download(source.clone(), local.to_path_buf(), relative);

    let result = options.executor(store).execute(&job, &progress).await;
    progress.finish();
    result
}
