//! End-to-end tests for the transfer engine against an in-memory store

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use s3cli_core::transfer::{self, ProgressSink, TransferOptions};
use s3cli_core::{
    Error, ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, PresignMethod,
    RemotePath, Result, WriteAt,
};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

/// Bucket/key to bytes, with knobs for injected failures and latency
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    fail_keys: HashSet<String>,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryStore {
    fn new() -> Self {
        Self::default()
    }

    fn with_object(self, bucket: &str, key: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data.to_vec());
        self
    }

    fn failing(mut self, key: &str) -> Self {
        self.fail_keys.insert(key.to_string());
        self
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Account one transfer call; the guard keeps it in flight
    async fn begin(&self, key: &str) -> Result<InFlight<'_>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_keys.contains(key) {
            return Err(Error::Network(format!("injected failure for {key}")));
        }
        Ok(guard)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        let buckets: std::collections::BTreeSet<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .map(|(b, _)| b.clone())
            .collect();
        Ok(buckets.into_iter().map(ObjectInfo::bucket).collect())
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let all: Vec<(String, usize)> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|((b, k), _)| *b == path.bucket && k.starts_with(&path.key))
            .map(|((_, k), v)| (k.clone(), v.len()))
            .collect();

        let start: usize = options
            .continuation_token
            .as_deref()
            .map(|t| t.parse().unwrap())
            .unwrap_or(0);
        let page = options.max_keys.unwrap_or(1000) as usize;
        let end = (start + page).min(all.len());
        let truncated = end < all.len();

        Ok(ListResult {
            items: all[start..end]
                .iter()
                .map(|(k, size)| ObjectInfo::file(k.clone(), *size as i64))
                .collect(),
            truncated,
            continuation_token: truncated.then(|| end.to_string()),
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        self.object(&path.bucket, &path.key)
            .map(|data| ObjectInfo::file(path.key.clone(), data.len() as i64))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        self.object(&path.bucket, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn download_object(&self, path: &RemotePath, target: &dyn WriteAt) -> Result<u64> {
        let _guard = self.begin(&path.key).await?;
        let data = self
            .object(&path.bucket, &path.key)
            .ok_or_else(|| Error::NotFound(path.to_string()))?;

        // Second half first: targets must honour offsets
        let mid = data.len() / 2;
        target.write_at(&data[mid..], mid as u64)?;
        target.write_at(&data[..mid], 0)?;
        Ok(data.len() as u64)
    }

    async fn upload_object(
        &self,
        path: &RemotePath,
        mut body: ObjectReader,
        size: u64,
        _content_type: Option<&str>,
    ) -> Result<ObjectInfo> {
        let _guard = self.begin(&path.key).await?;
        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;
        if data.len() as u64 != size {
            return Err(Error::General(format!(
                "declared {size} bytes but read {}",
                data.len()
            )));
        }
        let size = data.len() as i64;
        self.objects
            .lock()
            .unwrap()
            .insert((path.bucket.clone(), path.key.clone()), data);
        Ok(ObjectInfo::file(path.key.clone(), size))
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(path.bucket.clone(), path.key.clone()));
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<Vec<String>> {
        let mut objects = self.objects.lock().unwrap();
        for key in &keys {
            objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(keys)
    }

    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires: Duration,
    ) -> Result<String> {
        Ok(format!(
            "memory://{}/{}?method={method:?}&expires={}",
            path.bucket,
            path.key,
            expires.as_secs()
        ))
    }
}

/// Progress sink that remembers what it was told
#[derive(Default)]
struct RecordingProgress {
    total: Mutex<Option<Option<u64>>>,
    position: AtomicU64,
    history: Mutex<Vec<u64>>,
    finished: AtomicBool,
}

impl ProgressSink for RecordingProgress {
    fn set_total(&self, total: Option<u64>) {
        *self.total.lock().unwrap() = Some(total);
    }

    fn inc(&self, delta: u64) {
        let now = self.position.fetch_add(delta, Ordering::SeqCst) + delta;
        self.history.lock().unwrap().push(now);
    }

    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

impl RecordingProgress {
    fn position(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    fn total(&self) -> Option<Option<u64>> {
        *self.total.lock().unwrap()
    }
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), vec![b'a'; 10]).unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();
    std::fs::write(dir.path().join("sub").join("b.txt"), vec![b'b'; 20]).unwrap();
    std::fs::write(dir.path().join("sub").join("c.txt"), b"").unwrap();
    dir
}

fn tree_of(count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..count {
        std::fs::write(dir.path().join(format!("file-{i:03}.bin")), vec![i as u8; 64]).unwrap();
    }
    dir
}

fn count_files(root: &Path) -> usize {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

fn remote(key: &str) -> RemotePath {
    RemotePath::new("mem", "bucket", key)
}

#[tokio::test]
async fn upload_tree_uploads_every_file() {
    let dir = sample_tree();
    let store = Arc::new(MemoryStore::new());
    let progress = Arc::new(RecordingProgress::default());
    let options = TransferOptions::new().concurrency(2);

    let stats = transfer::upload_tree(
        store.clone(),
        dir.path(),
        &remote("data/"),
        &options,
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (3, 3, 0));
    assert!(stats.is_complete());
    assert_eq!(
        store.keys("bucket"),
        vec!["data/a.txt", "data/sub/b.txt", "data/sub/c.txt"]
    );
    assert_eq!(store.object("bucket", "data/sub/b.txt").unwrap(), vec![b'b'; 20]);
    assert_eq!(store.object("bucket", "data/sub/c.txt").unwrap(), Vec::<u8>::new());

    assert_eq!(progress.total(), Some(Some(3)));
    assert_eq!(progress.position(), 3);
    assert!(progress.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn upload_tree_prefix_without_slash_and_bucket_root() {
    let dir = sample_tree();
    let store = Arc::new(MemoryStore::new());
    let options = TransferOptions::new();

    transfer::upload_tree(store.clone(), dir.path(), &remote("data"), &options, transfer::noop())
        .await
        .unwrap();
    assert!(store.object("bucket", "data/a.txt").is_some());

    let store = Arc::new(MemoryStore::new());
    transfer::upload_tree(store.clone(), dir.path(), &remote(""), &options, transfer::noop())
        .await
        .unwrap();
    assert_eq!(store.keys("bucket"), vec!["a.txt", "sub/b.txt", "sub/c.txt"]);
}

#[tokio::test]
async fn empty_tree_reports_zero() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let progress = Arc::new(RecordingProgress::default());

    let stats = transfer::upload_tree(
        store.clone(),
        dir.path(),
        &remote("x/"),
        &TransferOptions::new(),
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (0, 0, 0));
    assert_eq!(store.attempts(), 0);
    assert!(progress.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn download_keys_with_one_failure_is_partial() {
    let keys = [
        "logs/2025/01/a.log",
        "logs/2025/01/b.log",
        "logs/2025/02/c.log",
        "logs/2025/02/d.log",
        "logs/2025/e.log",
    ];
    let mut store = MemoryStore::new();
    for (i, key) in keys.iter().enumerate() {
        store = store.with_object("bucket", key, format!("line {i}\n").as_bytes());
    }
    let store = Arc::new(store.failing("logs/2025/02/c.log"));
    let out = TempDir::new().unwrap();
    let progress = Arc::new(RecordingProgress::default());

    let listed = store.list_all_keys(&remote("logs/2025/")).await.unwrap();
    assert_eq!(listed.len(), 5);

    let stats = transfer::download_keys(
        store.clone(),
        &listed,
        &remote("logs/2025/"),
        out.path(),
        &TransferOptions::new().concurrency(3),
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (5, 4, 1));
    assert!(stats.is_partial_failure());
    assert_eq!(stats.failures.len(), 1);
    assert!(stats.failures[0].source.ends_with("logs/2025/02/c.log"));
    assert!(stats.failures[0].error.contains("injected failure"));

    assert_eq!(
        std::fs::read_to_string(out.path().join("01").join("a.log")).unwrap(),
        "line 0\n"
    );
    assert_eq!(
        std::fs::read_to_string(out.path().join("e.log")).unwrap(),
        "line 4\n"
    );
    // Failed downloads leave nothing behind
    assert!(!out.path().join("02").join("c.log").exists());
    assert_eq!(count_files(out.path()), 4);

    // Failures still advance the count
    assert_eq!(progress.position(), 5);
}

#[tokio::test]
async fn colliding_keys_do_not_clobber_a_finished_download() {
    // Both keys map to out/a/b; the second one would fail
    let store = Arc::new(
        MemoryStore::new()
            .with_object("bucket", "logs/a/b", b"kept")
            .with_object("bucket", "logs/a//b", b"other")
            .failing("logs/a//b"),
    );
    let keys = vec!["logs/a/b".to_string(), "logs/a//b".to_string()];
    let out = TempDir::new().unwrap();

    let stats = transfer::download_keys(
        store.clone(),
        &keys,
        &remote("logs/"),
        out.path(),
        &TransferOptions::new().concurrency(1),
        transfer::noop(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (1, 1, 0));
    assert_eq!(stats.skipped, 1);
    assert_eq!(store.attempts(), 1);
    assert_eq!(
        std::fs::read(out.path().join("a").join("b")).unwrap(),
        b"kept"
    );
}

#[tokio::test]
async fn directory_markers_are_counted_as_skipped() {
    let store = Arc::new(
        MemoryStore::new()
            .with_object("bucket", "site/", b"")
            .with_object("bucket", "site/css/", b"")
            .with_object("bucket", "site/index.html", b"<html>"),
    );
    let keys = store.list_all_keys(&remote("site/")).await.unwrap();
    let out = TempDir::new().unwrap();

    let stats = transfer::download_keys(
        store.clone(),
        &keys,
        &remote("site/"),
        out.path(),
        &TransferOptions::new(),
        transfer::noop(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.skipped), (1, 1, 2));
    assert_eq!(stats.total_files + stats.skipped, keys.len());
    assert_eq!(count_files(out.path()), 1);
}

#[tokio::test]
async fn missing_source_tree_fails_before_any_transfer() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    let result = transfer::upload_tree(
        store.clone(),
        &dir.path().join("absent"),
        &remote("x/"),
        &TransferOptions::new(),
        transfer::noop(),
    )
    .await;

    assert!(matches!(result, Err(Error::Enumeration(_))));
    assert_eq!(store.attempts(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_entry_fails_before_any_transfer() {
    use std::os::unix::fs::PermissionsExt;

    let dir = sample_tree();
    let locked = dir.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::write(locked.join("secret.txt"), b"x").unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read the directory anyway
    if std::fs::read_dir(&locked).is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let store = Arc::new(MemoryStore::new());
    let result = transfer::upload_tree(
        store.clone(),
        dir.path(),
        &remote("x/"),
        &TransferOptions::new(),
        transfer::noop(),
    )
    .await;

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(result, Err(Error::Enumeration(_))));
    assert_eq!(store.attempts(), 0);
    assert!(store.keys("bucket").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_is_bounded() {
    for workers in [1usize, 3, 20] {
        let dir = tree_of(12);
        let store = Arc::new(MemoryStore::new().delayed(Duration::from_millis(15)));

        let stats = transfer::upload_tree(
            store.clone(),
            dir.path(),
            &remote("bounded/"),
            &TransferOptions::new().concurrency(workers as i64),
            transfer::noop(),
        )
        .await
        .unwrap();

        assert_eq!(stats.succeeded, 12);
        assert_eq!(stats.succeeded + stats.failed, stats.total_files);
        assert_eq!(store.attempts(), 12);

        let peak = store.max_in_flight.load(Ordering::SeqCst);
        assert!(peak >= 1);
        assert!(peak <= workers.min(12), "peak {peak} exceeded {workers} workers");
    }
}

#[tokio::test]
async fn non_positive_concurrency_still_runs() {
    let dir = sample_tree();
    let store = Arc::new(MemoryStore::new());

    let stats = transfer::upload_tree(
        store.clone(),
        dir.path(),
        &remote(""),
        &TransferOptions::new().concurrency(-5),
        transfer::noop(),
    )
    .await
    .unwrap();

    assert_eq!(stats.succeeded, 3);
    assert_eq!(store.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn upload_file_reports_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("report.csv");
    let data = vec![b'r'; 300_000];
    std::fs::write(&path, &data).unwrap();

    let store = Arc::new(MemoryStore::new());
    let progress = Arc::new(RecordingProgress::default());

    let size = transfer::upload_file(
        store.clone(),
        &path,
        &remote("reports/report.csv"),
        &TransferOptions::new(),
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!(size, 300_000);
    assert_eq!(store.object("bucket", "reports/report.csv").unwrap(), data);
    assert_eq!(progress.total(), Some(Some(300_000)));
    assert_eq!(progress.position(), 300_000);

    let history = progress.history.lock().unwrap().clone();
    assert!(history.windows(2).all(|w| w[0] <= w[1]));
    assert!(history.iter().all(|&p| p <= 300_000));
}

#[tokio::test]
async fn download_file_reports_bytes() {
    let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    let store = Arc::new(MemoryStore::new().with_object("bucket", "img/photo.raw", &data));
    let out = TempDir::new().unwrap();
    let dest = out.path().join("nested").join("photo.raw");
    let progress = Arc::new(RecordingProgress::default());

    let size = transfer::download_file(
        store.clone(),
        &remote("img/photo.raw"),
        &dest,
        &TransferOptions::new(),
        progress.clone(),
    )
    .await
    .unwrap();

    assert_eq!(size, 10_000);
    assert_eq!(std::fs::read(&dest).unwrap(), data);
    assert_eq!(progress.total(), Some(Some(10_000)));
    assert_eq!(progress.position(), 10_000);
    assert!(progress.finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn download_missing_object_leaves_no_file() {
    let store = Arc::new(MemoryStore::new());
    let out = TempDir::new().unwrap();
    let dest = out.path().join("gone.txt");

    let err = transfer::download_file(
        store,
        &remote("gone.txt"),
        &dest,
        &TransferOptions::new(),
        transfer::noop(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err.root_cause(), Error::NotFound(_)));
    assert_eq!(err.exit_code(), 5);
    assert!(!dest.exists());
}

#[tokio::test]
async fn upload_then_download_round_trips() {
    let src = sample_tree();
    let store = Arc::new(MemoryStore::new());
    let options = TransferOptions::new().concurrency(4);

    transfer::upload_tree(store.clone(), src.path(), &remote("backup"), &options, transfer::noop())
        .await
        .unwrap();

    let keys = store.list_all_keys(&remote("backup/")).await.unwrap();
    let dst = TempDir::new().unwrap();
    let stats = transfer::download_keys(
        store.clone(),
        &keys,
        &remote("backup/"),
        dst.path(),
        &options,
        transfer::noop(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (3, 3, 0));
    for relative in ["a.txt", "sub/b.txt", "sub/c.txt"] {
        let local = transfer::local_relative_path(relative);
        assert_eq!(
            std::fs::read(src.path().join(&local)).unwrap(),
            std::fs::read(dst.path().join(&local)).unwrap()
        );
        assert_eq!(
            transfer::reconstruct_key("backup/", &local),
            format!("backup/{relative}")
        );
    }
}

#[tokio::test]
async fn list_all_keys_follows_pages() {
    let mut store = MemoryStore::new();
    for i in 0..2500 {
        store = store.with_object("bucket", &format!("many/{i:05}"), b"");
    }
    store = store.with_object("bucket", "other/x", b"");

    let keys = store.list_all_keys(&remote("many/")).await.unwrap();
    assert_eq!(keys.len(), 2500);
    assert_eq!(keys.first().map(String::as_str), Some("many/00000"));
    assert_eq!(keys.last().map(String::as_str), Some("many/02499"));
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() {
    let dir = sample_tree();
    let store = Arc::new(MemoryStore::new());
    let token = CancellationToken::new();
    token.cancel();

    let stats = transfer::upload_tree(
        store.clone(),
        dir.path(),
        &remote("x/"),
        &TransferOptions::new().cancel(token),
        transfer::noop(),
    )
    .await
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (3, 0, 3));
    assert_eq!(store.attempts(), 0);
    assert!(stats.failures.iter().all(|f| f.error == "Operation cancelled"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_interrupts_in_flight_downloads() {
    let mut store = MemoryStore::new().delayed(Duration::from_secs(30));
    for i in 0..6 {
        store = store.with_object("bucket", &format!("slow/{i}.bin"), &[1u8; 128]);
    }
    let store = Arc::new(store);
    let keys = store.list_all_keys(&remote("slow/")).await.unwrap();
    let out = TempDir::new().unwrap();
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let stats = tokio::time::timeout(
        Duration::from_secs(5),
        transfer::download_keys(
            store.clone(),
            &keys,
            &remote("slow/"),
            out.path(),
            &TransferOptions::new().concurrency(2).cancel(token),
            transfer::noop(),
        ),
    )
    .await
    .expect("cancellation did not stop the pool")
    .unwrap();

    assert_eq!((stats.total_files, stats.succeeded, stats.failed), (6, 0, 6));
    // Queued jobs never reached the store
    assert!(store.attempts() <= 2);
    assert_eq!(count_files(out.path()), 0);
}
