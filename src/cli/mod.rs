//! Command line interface for stagegate
//!
//! - `run`: Execute a pipeline file
//! - `check`: Validate a pipeline file without running it
//! - `completions`: Generate shell completions

pub mod check;
pub mod completions;
pub mod run;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// CLI arguments for stagegate
#[derive(Parser, Debug)]
#[command(name = "stagegate")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a pipeline
    Run {
        /// Pipeline file (YAML)
        file: PathBuf,
        /// Configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Workspace directory, overrides configuration
        #[arg(short, long)]
        workspace: Option<PathBuf>,
        /// Build number, overrides configuration
        #[arg(short, long)]
        build_number: Option<u64>,
        /// Validate and list stages without running anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate a pipeline file
    Check {
        /// Pipeline file to validate
        file: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Parse and execute CLI arguments
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Command::Run {
            file,
            config,
            workspace,
            build_number,
            dry_run,
        } => run::run_pipeline(&run::RunOptions {
            file,
            config,
            workspace,
            build_number,
            dry_run,
        }),
        Command::Check { file } => {
            stagegate::infrastructure::init_logging("warn");
            let pipeline = check::check_pipeline(&file)?;
            println!("{}", check::describe(&pipeline));
            Ok(ExitCode::SUCCESS)
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;

            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
