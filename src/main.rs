//! Wheel Bundler - builds, bundles and stages binary wheels for native-extension projects.
//!
//! This binary drives pyenv, venv, pip and delocate/auditwheel in a fixed,
//! fail-fast sequence and stages the finished wheel into an output directory.

use std::process;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match wheel_bundler::cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
