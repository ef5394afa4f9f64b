//! cat command - Display object contents
//!
//! Outputs the entire content of an object to stdout.

use std::io::{self, Write};

use clap::Args;

use super::{Context, fail, parse_object_path};
use crate::exit_code::ExitCode;

/// Display object contents
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Object path (alias/bucket/key)
    pub path: String,
}

/// Execute the cat command
pub async fn execute(args: CatArgs, ctx: &Context) -> ExitCode {
    let formatter = ctx.formatter();

    let path = match parse_object_path(&args.path) {
        Ok(path) => path,
        Err(e) => return fail(&formatter, &e),
    };

    let client = match ctx.client(&path.alias).await {
        Ok(client) => client,
        Err(e) => return fail(&formatter, &e),
    };

    let data = match ctx.guard(client.get_object(&path)).await {
        Ok(data) => data,
        Err(e) => return fail(&formatter, &e),
    };

    // Bypass the formatter so binary content is written untouched
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(&data).and_then(|()| stdout.flush()) {
        formatter.error(&format!("Failed to write to stdout: {e}"));
        return ExitCode::GeneralError;
    }
    ExitCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_cat_takes_one_path() {
        let cli = Cli::try_parse_from(["s3cli", "cat", "minio/mybucket/path/to/file.txt"]).unwrap();
        let Commands::Cat(args) = cli.command else {
            panic!("expected cat");
        };
        assert_eq!(args.path, "minio/mybucket/path/to/file.txt");

        assert!(Cli::try_parse_from(["s3cli", "cat"]).is_err());
    }
}
