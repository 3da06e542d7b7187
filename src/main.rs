//! stagegate - run CI pipelines stage by stage
//!
//! ## Commands
//!
//! - `stagegate run` - Execute a pipeline file
//! - `stagegate check` - Validate a pipeline file
//! - `stagegate completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate a pipeline
//! stagegate check demos/vprofile.yaml
//!
//! # Run it against the current directory as build 42
//! stagegate run demos/vprofile.yaml --config demos/stagegate.yaml --build-number 42
//!
//! # Generate shell completions
//! stagegate completions bash > /etc/bash_completion.d/stagegate
//! ```
//!
//! Exit code 0 means the pipeline finished SUCCESS or UNSTABLE; 1 means a
//! stage failed or the pipeline could not be started.

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("STAGEGATE_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
