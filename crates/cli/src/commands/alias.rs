//! Alias management commands
//!
//! Aliases are named references to S3-compatible storage endpoints,
//! including connection details and credentials.

use clap::Subcommand;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use s3cli_core::{Alias, BucketLookup, TimeoutConfig};
use serde::Serialize;

use super::{Context, fail};
use crate::exit_code::ExitCode;

/// Alias subcommands for managing storage service connections
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add or update an alias
    #[command(visible_alias = "add")]
    Set(SetArgs),

    /// List all configured aliases
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Remove an alias
    #[command(visible_alias = "rm")]
    Remove(RemoveArgs),
}

/// Arguments for the `alias set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "local", "s3", "minio")
    pub name: String,

    /// S3 endpoint, with or without scheme (e.g., "localhost:9000", "https://s3.amazonaws.com")
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// AWS region
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: BucketLookup,

    /// Use https when the endpoint has no scheme
    #[arg(long, default_value = "false")]
    pub secure: bool,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub connect_timeout: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub read_timeout: Option<u64>,
}

impl SetArgs {
    fn into_alias(self) -> Alias {
        let timeout = match (self.connect_timeout, self.read_timeout) {
            (None, None) => None,
            (connect, read) => {
                let defaults = TimeoutConfig::default();
                Some(TimeoutConfig {
                    connect_ms: connect.unwrap_or(defaults.connect_ms),
                    read_ms: read.unwrap_or(defaults.read_ms),
                })
            }
        };

        let mut alias = Alias::new(self.name, self.endpoint, self.access_key, self.secret_key);
        alias.region = self.region;
        alias.bucket_lookup = self.bucket_lookup;
        alias.secure = self.secure;
        alias.timeout = timeout;
        alias
    }
}

/// Arguments for the `alias list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including region and lookup style
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `alias remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the alias to remove
    pub name: String,
}

/// JSON output for alias list
#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<AliasInfo>,
}

/// Alias information for JSON output (without sensitive data)
#[derive(Serialize)]
struct AliasInfo {
    name: String,
    endpoint: String,
    region: String,
    bucket_lookup: BucketLookup,
    secure: bool,
}

impl From<&Alias> for AliasInfo {
    fn from(alias: &Alias) -> Self {
        Self {
            name: alias.name.clone(),
            endpoint: alias.endpoint.clone(),
            region: alias.region.clone(),
            bucket_lookup: alias.bucket_lookup,
            secure: alias.secure,
        }
    }
}

/// JSON output for alias set/remove operations
#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

/// Execute an alias subcommand
pub async fn execute(cmd: AliasCommands, ctx: &Context) -> ExitCode {
    match cmd {
        AliasCommands::Set(args) => execute_set(args, ctx),
        AliasCommands::List(args) => execute_list(args, ctx),
        AliasCommands::Remove(args) => execute_remove(args, ctx),
    }
}

fn execute_set(args: SetArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();
    let alias = args.into_alias();
    let name = alias.name.clone();

    // Name and endpoint are validated before anything is written
    match ctx.aliases().set(alias) {
        Ok(()) => {
            let message = format!("Alias '{name}' configured successfully");
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}

fn execute_list(args: ListArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let aliases = match ctx.aliases().list() {
        Ok(aliases) => aliases,
        Err(e) => return fail(&formatter, &e),
    };

    if formatter.is_json() {
        formatter.json(&AliasListOutput {
            aliases: aliases.iter().map(AliasInfo::from).collect(),
        });
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else {
        formatter.println(&alias_table(&aliases, args.long).to_string());
    }
    ExitCode::Success
}

fn alias_table(aliases: &[Alias], long: bool) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    if long {
        table.set_header(["Name", "Endpoint", "Region", "Lookup", "Access Key"]);
        for alias in aliases {
            table.add_row([
                alias.name.clone(),
                alias.endpoint.clone(),
                alias.region.clone(),
                alias.bucket_lookup.to_string(),
                alias.access_key.clone(),
            ]);
        }
    } else {
        table.set_header(["Name", "Endpoint"]);
        for alias in aliases {
            table.add_row([alias.name.clone(), alias.endpoint.clone()]);
        }
    }
    table
}

fn execute_remove(args: RemoveArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    match ctx.aliases().remove(&args.name) {
        Ok(()) => {
            let message = format!("Alias '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&AliasOperationOutput {
                    success: true,
                    alias: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, &e),
    }
}
