//! share command - Generate presigned URLs
//!
//! Presigning happens locally from the alias credentials; the object is not
//! contacted.

use std::time::Duration;

use clap::Args;
use s3cli_core::{Error, PresignMethod};
use serde::Serialize;

use super::{Context, fail, parse_object_path};
use crate::exit_code::ExitCode;

/// Longest validity S3 signatures allow
const MAX_EXPIRY_SECS: u64 = 7 * 24 * 60 * 60;

/// Generate a presigned URL for downloading or uploading an object
#[derive(Args, Debug)]
pub struct ShareArgs {
    /// Object path (alias/bucket/key)
    pub path: String,

    /// Validity of the URL in seconds (at most 7 days)
    #[arg(long, value_name = "SECS", default_value_t = 3600)]
    pub expire: u64,

    /// Generate an upload (PUT) URL instead of a download URL
    #[arg(long)]
    pub upload: bool,
}

#[derive(Debug, Serialize)]
struct ShareOutput {
    url: String,
    method: PresignMethod,
    expires_secs: u64,
}

fn validate_expiry(secs: u64) -> Result<Duration, Error> {
    if secs == 0 || secs > MAX_EXPIRY_SECS {
        return Err(Error::InvalidPath(format!(
            "Expiry must be between 1 and {MAX_EXPIRY_SECS} seconds, got {secs}"
        )));
    }
    Ok(Duration::from_secs(secs))
}

/// Execute the share command
pub async fn execute(args: ShareArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let path = match parse_object_path(&args.path) {
        Ok(path) => path,
        Err(e) => return fail(&formatter, &e),
    };
    let expires = match validate_expiry(args.expire) {
        Ok(expires) => expires,
        Err(e) => return fail(&formatter, &e),
    };
    let method = if args.upload {
        PresignMethod::Put
    } else {
        PresignMethod::Get
    };

    let client = match ctx.client(&path.alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };

    match ctx.guard(client.presign(&path, method, expires)).await {
        Ok(url) => {
            if formatter.is_json() {
                formatter.json(&ShareOutput {
                    url,
                    method,
                    expires_secs: args.expire,
                });
            } else {
                formatter.println(&url);
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
