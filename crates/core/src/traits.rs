//! ObjectStore trait definition
//!
//! This trait defines the interface for S3-compatible storage operations.
//! It allows the CLI and the transfer engine to be decoupled from the
//! specific S3 SDK implementation.

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use crate::error::Result;
use crate::path::RemotePath;

/// Page size used when walking a prefix to completion
pub const LIST_PAGE_SIZE: i32 = 1000;

/// Metadata for an object or bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Object key or bucket name
    pub key: String,

    /// Size in bytes (None for buckets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,

    /// Human-readable size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,

    /// Last modified timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// ETag (usually MD5 for single-part uploads)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    /// Storage class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Whether this is a directory/prefix
    pub is_dir: bool,
}

impl ObjectInfo {
    /// Create a new ObjectInfo for a file
    pub fn file(key: impl Into<String>, size: i64) -> Self {
        Self {
            key: key.into(),
            size_bytes: Some(size),
            size_human: Some(humansize::format_size(size.max(0) as u64, humansize::BINARY)),
            last_modified: None,
            etag: None,
            storage_class: None,
            content_type: None,
            is_dir: false,
        }
    }

    /// Create a new ObjectInfo for a directory/prefix
    pub fn dir(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size_bytes: None,
            size_human: None,
            last_modified: None,
            etag: None,
            storage_class: None,
            content_type: None,
            is_dir: true,
        }
    }

    /// Create a new ObjectInfo for a bucket
    pub fn bucket(name: impl Into<String>) -> Self {
        Self::dir(name)
    }
}

/// Result of a list operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResult {
    /// Listed objects
    pub items: Vec<ObjectInfo>,

    /// Whether the result is truncated (more items available)
    pub truncated: bool,

    /// Continuation token for pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

/// Options for list operations
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Maximum number of keys to return per request
    pub max_keys: Option<i32>,

    /// Delimiter for grouping (usually "/")
    pub delimiter: Option<String>,

    /// Continuation token for pagination
    pub continuation_token: Option<String>,

    /// Whether to list recursively (ignore delimiter)
    pub recursive: bool,
}

/// HTTP method a presigned URL is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresignMethod {
    Get,
    Put,
}

/// Random-access write target for downloads
///
/// Stores may deliver object bytes in any order (for example from parallel
/// range requests), so writes carry an explicit offset instead of relying on
/// append position. Each call writes the whole buffer.
pub trait WriteAt: Send + Sync {
    fn write_at(&self, buf: &[u8], offset: u64) -> std::io::Result<()>;
}

/// Sequential byte source for uploads
pub type ObjectReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Trait for S3-compatible storage operations
///
/// This trait is implemented by the S3 adapter and by in-memory stores in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List buckets
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>>;

    /// List one page of objects under `path.key`
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult>;

    /// Get object metadata
    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;

    /// Get object content as bytes
    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>>;

    /// Download an object into a random-access target, returning the byte count
    async fn download_object(&self, path: &RemotePath, target: &dyn WriteAt) -> Result<u64>;

    /// Upload exactly `size` bytes read from `body` as one object
    ///
    /// Implementations stream the body; it is read as the bytes are sent.
    async fn upload_object(
        &self,
        path: &RemotePath,
        body: ObjectReader,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo>;

    /// Delete a single object
    async fn delete_object(&self, path: &RemotePath) -> Result<()>;

    /// Delete up to 1000 keys in one request, returning the keys reported deleted
    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<Vec<String>>;

    /// Generate a presigned URL
    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires: Duration,
    ) -> Result<String>;

    /// All object keys under `path.key`, following continuation tokens
    async fn list_all_keys(&self, path: &RemotePath) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let options = ListOptions {
                recursive: true,
                max_keys: Some(LIST_PAGE_SIZE),
                continuation_token: continuation_token.take(),
                ..Default::default()
            };
            let page = self.list_objects(path, options).await?;
            keys.extend(page.items.into_iter().filter(|i| !i.is_dir).map(|i| i.key));

            match page.continuation_token {
                Some(token) if page.truncated => continuation_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(prefix = %path, count = keys.len(), "listed keys");
        Ok(keys)
    }
}
