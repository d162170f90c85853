//! Main entry point for the `pkgpc` CLI.

use pkg_precommit::cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", cli::render_error(&e));
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        },
    }
}
