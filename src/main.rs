//! Castboard Bundler - builds eLinux bundles and packages update archives.
//!
//! Exit code 0 means the update archive exists in the output directory.
//! A failing external command's exit code is passed through.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match castboard_bundler::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
