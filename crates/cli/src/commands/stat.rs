//! stat command - Show object metadata
//!
//! Displays detailed metadata information about an object.

use clap::Args;
use s3cli_core::ObjectInfo;
use serde::Serialize;

use super::{Context, fail, parse_object_path};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object path (alias/bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<String>,
}

impl From<ObjectInfo> for StatOutput {
    fn from(info: ObjectInfo) -> Self {
        Self {
            name: info.key,
            last_modified: info.last_modified.map(|d| d.to_string()),
            size_bytes: info.size_bytes,
            size_human: info.size_human,
            etag: info.etag,
            content_type: info.content_type,
            storage_class: info.storage_class,
        }
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let path = match parse_object_path(&args.path) {
        Ok(path) => path,
        Err(e) => return fail(&formatter, &e),
    };

    let client = match ctx.client(&path.alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };

    match ctx.guard(client.head_object(&path)).await {
        Ok(info) => {
            print_stat(&formatter, info);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

fn print_stat(formatter: &Formatter, info: ObjectInfo) {
    if formatter.is_json() {
        formatter.json(&StatOutput::from(info));
        return;
    }

    formatter.println(&format!("Name      : {}", info.key));
    if let Some(modified) = info.last_modified {
        formatter.println(&format!(
            "Date      : {}",
            modified.strftime("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let (Some(size), Some(human)) = (info.size_bytes, &info.size_human) {
        formatter.println(&format!("Size      : {human} ({size} bytes)"));
    }
    if let Some(etag) = &info.etag {
        formatter.println(&format!("ETag      : {etag}"));
    }
    if let Some(ct) = &info.content_type {
        formatter.println(&format!("Type      : {ct}"));
    }
    if let Some(sc) = &info.storage_class {
        formatter.println(&format!("Class     : {sc}"));
    }
}
