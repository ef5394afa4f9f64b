//! ls command - List buckets and objects
//!
//! Lists buckets when given an alias only, or lists objects when given a bucket path.

use clap::Args;
use s3cli_core::alias::is_valid_alias_name;
use s3cli_core::traits::LIST_PAGE_SIZE;
use s3cli_core::{Error, ListOptions, ObjectInfo, ObjectStore, RemotePath, Result};
use serde::Serialize;

use super::{Context, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Placeholder printed where an entry has no modification time
const NO_DATE: &str = "                   ";

/// List buckets or objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (alias/ or alias/bucket[/prefix])
    pub path: String,

    /// List recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Summarize output (show totals)
    #[arg(long)]
    pub summarize: bool,
}

/// What an `ls` argument points at
#[derive(Debug, PartialEq, Eq)]
enum LsTarget {
    Buckets(String),
    Objects(RemotePath),
}

/// Output structure for ls command (JSON format)
#[derive(Debug, Serialize)]
struct LsOutput {
    items: Vec<ObjectInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_objects: usize,
    total_size_bytes: i64,
    total_size_human: String,
}

impl Summary {
    fn of(items: &[ObjectInfo]) -> Self {
        let total_size: i64 = items.iter().filter_map(|i| i.size_bytes).sum();
        Self {
            total_objects: items.iter().filter(|i| !i.is_dir).count(),
            total_size_bytes: total_size,
            total_size_human: humansize::format_size(total_size.max(0) as u64, humansize::BINARY),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: LsArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let target = match parse_ls_target(&args.path) {
        Ok(target) => target,
        Err(e) => return fail(&formatter, &e),
    };

    let alias_name = match &target {
        LsTarget::Buckets(alias) => alias.as_str(),
        LsTarget::Objects(path) => path.alias.as_str(),
    };
    let client = match ctx.client(alias_name).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };

    let items = match &target {
        LsTarget::Buckets(_) => ctx.guard(client.list_buckets()).await,
        LsTarget::Objects(path) => {
            ctx.guard(list_all(client.as_ref(), path, args.recursive))
                .await
        }
    };

    match items {
        Ok(items) => {
            print_items(&formatter, items, &target, args.summarize);
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

/// Parse `alias`, `alias/` or `alias/bucket[/prefix]`
fn parse_ls_target(path: &str) -> Result<LsTarget> {
    let bare = path.strip_prefix("s3://").unwrap_or(path);
    let alias = bare.trim_end_matches('/');

    if !alias.contains('/') {
        if !is_valid_alias_name(alias) {
            return Err(Error::InvalidPath(format!(
                "Invalid alias in '{path}'. Use format: alias/ or alias/bucket[/prefix]"
            )));
        }
        return Ok(LsTarget::Buckets(alias.to_string()));
    }

    s3cli_core::parse_remote_path(path).map(LsTarget::Objects)
}

/// Walk every page of a listing
///
/// The key is treated as a directory. Non-recursive listings show one level,
/// with folders ahead of objects.
async fn list_all(
    client: &dyn ObjectStore,
    path: &RemotePath,
    recursive: bool,
) -> Result<Vec<ObjectInfo>> {
    let path = path.with_key(path.dir_prefix());

    let mut items = Vec::new();
    let mut continuation_token: Option<String> = None;

    loop {
        let options = ListOptions {
            recursive,
            max_keys: Some(LIST_PAGE_SIZE),
            continuation_token: continuation_token.take(),
            ..Default::default()
        };
        let page = client.list_objects(&path, options).await?;
        items.extend(page.items);

        match page.continuation_token {
            Some(token) if page.truncated => continuation_token = Some(token),
            _ => break,
        }
    }

    // Stable, so each group keeps the server's key order
    items.sort_by_key(|item| !item.is_dir);
    Ok(items)
}

fn format_date(item: &ObjectInfo) -> String {
    item.last_modified
        .map(|d| d.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| NO_DATE.to_string())
}

/// Entry name relative to the listed prefix
fn display_name<'a>(item: &'a ObjectInfo, target: &LsTarget) -> &'a str {
    match target {
        LsTarget::Buckets(_) => &item.key,
        LsTarget::Objects(path) => {
            let prefix = path.dir_prefix();
            item.key
                .strip_prefix(prefix.as_str())
                .filter(|rest| !rest.is_empty())
                .unwrap_or(&item.key)
        }
    }
}

fn print_items(formatter: &Formatter, items: Vec<ObjectInfo>, target: &LsTarget, summarize: bool) {
    if formatter.is_json() {
        let summary = summarize.then(|| Summary::of(&items));
        formatter.json(&LsOutput { items, summary });
        return;
    }

    for item in &items {
        let date = formatter.dim(&format!("[{}]", format_date(item)));
        let name = display_name(item, target);

        match target {
            LsTarget::Buckets(_) => {
                let name = formatter.dir_name(&format!("{name}/"));
                formatter.println(&format!("{date} {:>10} {name}", "0B"));
            }
            LsTarget::Objects(_) if item.is_dir => {
                let name = formatter.dir_name(name);
                formatter.println(&format!("{date} {:>10} {name}", "0B"));
            }
            LsTarget::Objects(_) => {
                let size = item.size_human.as_deref().unwrap_or("0 B");
                formatter.println(&format!("{date} {size:>10} {name}"));
            }
        }
    }

    if summarize {
        match target {
            LsTarget::Buckets(_) => {
                formatter.println(&format!("\nTotal: {} buckets", items.len()));
            }
            LsTarget::Objects(_) => {
                let summary = Summary::of(&items);
                formatter.println(&format!(
                    "\nTotal: {} objects, {}",
                    summary.total_objects, summary.total_size_human
                ));
            }
        }
    }
}
