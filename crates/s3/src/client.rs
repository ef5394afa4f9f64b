//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from s3cli-core.

use std::fmt::Display;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use futures::TryStreamExt;
use http_body::{Body, Frame, SizeHint};
use http_body_util::StreamBody;
use tokio_util::io::ReaderStream;

use s3cli_core::{
    Alias, Error, ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, PresignMethod,
    RemotePath, Result, WriteAt,
};

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a new S3 client from an alias configuration
    pub async fn new(alias: Alias) -> Result<Self> {
        let endpoint = alias.endpoint_url()?;
        let timeout = alias.timeout_config();

        // Build credentials provider
        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None, // session token
            None, // expiry
            "s3cli-static-credentials",
        );

        let timeouts = aws_smithy_types::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build();

        // Build SDK config
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(endpoint.as_str().trim_end_matches('/'))
            .timeout_config(timeouts)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.bucket_lookup.force_path_style())
            .build();

        tracing::debug!(
            alias = %alias.name,
            endpoint = %endpoint,
            bucket_lookup = %alias.bucket_lookup,
            "created S3 client"
        );

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }
}

/// Request body read from `reader` as the SDK sends it
fn streaming_body(reader: ObjectReader, size: u64) -> ByteStream {
    let frames = ReaderStream::new(reader).map_ok(Frame::data);
    ByteStream::from_body_1_x(SizedBody {
        inner: StreamBody::new(frames),
        size,
    })
}

/// Body with a known exact length
///
/// Stream bodies report no size, and the SDK needs one to sign and
/// checksum a PUT without buffering it.
struct SizedBody<B> {
    inner: B,
    size: u64,
}

impl<B: Body + Unpin> Body for SizedBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.size)
    }
}

/// Map an SDK failure onto the core error kinds
fn map_sdk_error<E>(err: E, resource: impl Display) -> Error
where
    E: std::error::Error,
{
    classify(DisplayErrorContext(&err).to_string(), resource.to_string())
}

fn classify(message: String, resource: String) -> Error {
    const NOT_FOUND: &[&str] = &["NotFound", "NoSuchKey", "NoSuchBucket"];
    const DENIED: &[&str] = &[
        "AccessDenied",
        "InvalidAccessKeyId",
        "SignatureDoesNotMatch",
        "Forbidden",
    ];

    if NOT_FOUND.iter().any(|m| message.contains(m)) {
        Error::NotFound(resource)
    } else if DENIED.iter().any(|m| message.contains(m)) {
        Error::Auth(message)
    } else {
        Error::Network(message)
    }
}

fn timestamp(value: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::from_second(value.secs()).ok()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "buckets"))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = ObjectInfo::bucket(b.name().unwrap_or_default());
                info.last_modified = b.creation_date().and_then(timestamp);
                info
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&path.bucket);

        if !path.key.is_empty() {
            request = request.prefix(&path.key);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter(options.delimiter.as_deref().unwrap_or("/"));
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        let mut items = Vec::new();

        // Add common prefixes (directories)
        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default().to_string();
            let size = object.size().unwrap_or(0);
            let mut info = ObjectInfo::file(&key, size);

            info.last_modified = object.last_modified().and_then(timestamp);
            if let Some(etag) = object.e_tag() {
                info.etag = Some(etag.trim_matches('"').to_string());
            }
            if let Some(sc) = object.storage_class() {
                info.storage_class = Some(sc.as_str().to_string());
            }

            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        let size = response.content_length().unwrap_or(0);
        let mut info = ObjectInfo::file(&path.key, size);

        info.last_modified = response.last_modified().and_then(timestamp);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        if let Some(ct) = response.content_type() {
            info.content_type = Some(ct.to_string());
        }
        if let Some(sc) = response.storage_class() {
            info.storage_class = Some(sc.as_str().to_string());
        }

        Ok(info)
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn download_object(&self, path: &RemotePath, target: &dyn WriteAt) -> Result<u64> {
        let mut response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        let mut offset = 0u64;
        while let Some(chunk) = response
            .body
            .try_next()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
        {
            target.write_at(&chunk, offset)?;
            offset += chunk.len() as u64;
        }

        Ok(offset)
    }

    async fn upload_object(
        &self,
        path: &RemotePath,
        body: ObjectReader,
        size: u64,
        content_type: Option<&str>,
    ) -> Result<ObjectInfo> {
        let content_length = i64::try_from(size)
            .map_err(|_| Error::UnsupportedFeature(format!("object too large: {size} bytes")))?;

        let mut request = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_length(content_length)
            .body(streaming_body(body, size));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        let mut info = ObjectInfo::file(&path.key, content_length);
        if let Some(etag) = response.e_tag() {
            info.etag = Some(etag.trim_matches('"').to_string());
        }
        info.content_type = content_type.map(str::to_string);
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, path))?;

        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<Vec<String>> {
        use aws_sdk_s3::types::{Delete, ObjectIdentifier};

        if keys.is_empty() {
            return Ok(vec![]);
        }

        let objects = keys
            .iter()
            .map(|k| {
                ObjectIdentifier::builder()
                    .key(k)
                    .build()
                    .map_err(|e| Error::General(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, bucket))?;

        let deleted: Vec<String> = response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(|k| k.to_string()))
            .collect();

        for failed in response.errors() {
            tracing::warn!(
                key = failed.key().unwrap_or_default(),
                code = failed.code().unwrap_or_default(),
                message = failed.message().unwrap_or_default(),
                "failed to delete object"
            );
        }

        Ok(deleted)
    }

    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires: Duration,
    ) -> Result<String> {
        let config =
            PresigningConfig::expires_in(expires).map_err(|e| Error::General(e.to_string()))?;

        let request = match method {
            PresignMethod::Get => self
                .inner
                .get_object()
                .bucket(&path.bucket)
                .key(&path.key)
                .presigned(config)
                .await
                .map_err(|e| map_sdk_error(e, path))?,
            PresignMethod::Put => self
                .inner
                .put_object()
                .bucket(&path.bucket)
                .key(&path.key)
                .presigned(config)
                .await
                .map_err(|e| map_sdk_error(e, path))?,
        };

        Ok(request.uri().to_string())
    }
}
