//! Single-job execution
//!
//! Every store call races the shared cancellation token so a cancelled or
//! timed out batch stops in-flight requests instead of waiting for them.

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::job::TransferJob;
use super::progress::{ProgressReader, ProgressSink};
use crate::error::{Error, Result};
use crate::path::{ParsedPath, RemotePath};
use crate::traits::{ObjectStore, WriteAt};

/// Local file opened as a random-access download target
pub struct DestinationFile {
    file: File,
    progress: Arc<dyn ProgressSink>,
}

impl DestinationFile {
    pub fn new(file: File, progress: Arc<dyn ProgressSink>) -> Self {
        Self { file, progress }
    }
}

impl WriteAt for DestinationFile {
    #[cfg(unix)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        use std::os::unix::fs::FileExt;

        self.file.write_all_at(buf, offset)?;
        self.progress.inc(buf.len() as u64);
        Ok(())
    }

    #[cfg(windows)]
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        let mut written = 0;
        while written < buf.len() {
            let n = self
                .file
                .seek_write(&buf[written..], offset + written as u64)?;
            if n == 0 {
                return Err(io::Error::from(io::ErrorKind::WriteZero));
            }
            written += n;
        }
        self.progress.inc(buf.len() as u64);
        Ok(())
    }
}

/// Runs transfer jobs against one store
pub struct TransferExecutor {
    store: Arc<dyn ObjectStore>,
    cancel: CancellationToken,
    content_type: Option<String>,
}

impl TransferExecutor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        cancel: CancellationToken,
        content_type: Option<String>,
    ) -> Self {
        Self {
            store,
            cancel,
            content_type,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Copy one job's source to its destination
    ///
    /// Bytes moved are reported to `bytes`. Returns the number of bytes
    /// transferred. A job picked up after cancellation fails without touching
    /// the store.
    pub async fn execute(&self, job: &TransferJob, bytes: &Arc<dyn ProgressSink>) -> Result<u64> {
        let result = if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            match (&job.source, &job.destination) {
                (ParsedPath::Local(src), ParsedPath::Remote(dst)) => self.put(src, dst, bytes).await,
                (ParsedPath::Remote(src), ParsedPath::Local(dst)) => self.get(src, dst, bytes).await,
                _ => Err(Error::UnsupportedFeature(
                    "transfers must be between a local path and a remote path".into(),
                )),
            }
        };

        result.map_err(|e| Error::transfer(job.source.to_string(), job.destination.to_string(), e))
    }

    async fn put(&self, src: &Path, dst: &RemotePath, bytes: &Arc<dyn ProgressSink>) -> Result<u64> {
        let file = tokio::fs::File::open(src).await?;
        let size = file.metadata().await?.len();

        let guessed = mime_guess::from_path(src)
            .first()
            .map(|m| m.essence_str().to_string());
        let content_type = self.content_type.as_deref().or(guessed.as_deref());

        let body = Box::new(ProgressReader::new(file, Arc::clone(bytes)));
        let upload = self.store.upload_object(dst, body, size, content_type);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            result = upload => {
                result?;
                tracing::debug!(src = %src.display(), dst = %dst, size, "uploaded");
                Ok(size)
            }
        }
    }

    async fn get(&self, src: &RemotePath, dst: &Path, bytes: &Arc<dyn ProgressSink>) -> Result<u64> {
        if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(dst).await?.into_std().await;
        let target = DestinationFile::new(file, Arc::clone(bytes));

        let result = {
            let download = self.store.download_object(src, &target);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(Error::Cancelled),
                result = download => result,
            }
        };
        drop(target);

        match result {
            Ok(size) => {
                tracing::debug!(src = %src, dst = %dst.display(), size, "downloaded");
                Ok(size)
            }
            Err(e) => {
                remove_partial(dst).await;
                Err(e)
            }
        }
    }
}

/// Best-effort removal of a destination left behind by a failed download
async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %e, "could not remove partial download");
        }
    }
}
