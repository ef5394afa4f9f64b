//! s3cli-core: Core library for the s3cli object storage client
//!
//! This crate provides the core functionality for the CLI, including:
//! - Configuration and alias management
//! - Path parsing and resolution
//! - ObjectStore trait for S3 operations
//! - The parallel bulk transfer engine
//!
//! Nothing here depends on a specific S3 SDK; the engine is driven entirely
//! through [`ObjectStore`], so tests can substitute an in-memory store.

pub mod alias;
pub mod config;
pub mod error;
pub mod path;
pub mod traits;
pub mod transfer;

pub use alias::{Alias, AliasManager, BucketLookup, TimeoutConfig};
pub use config::{ColorMode, Config, ConfigManager, Defaults, OutputFormat};
pub use error::{Error, Result};
pub use path::{ParsedPath, RemotePath, parse_path, parse_remote_path};
pub use traits::{
    ListOptions, ListResult, ObjectInfo, ObjectReader, ObjectStore, PresignMethod, WriteAt,
};
pub use transfer::{
    ProgressSink, TransferJob, TransferOptions, TransferStats, download_file, download_keys,
    upload_file, upload_tree,
};
