//! Defines the command-line interface for the application.

use crate::config::ConfigLayer;
use crate::updater::OutputMode;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "usage-sync",
    version,
    about = "Keep the usage block of a README in sync with a command's output.",
    after_help = "Example:\n  usage-sync --build 'cargo build' -- ./target/debug/tool --help"
)]
#[command(group(ArgGroup::new("mode").args(["dry_run", "diff", "check"])))]
pub struct Cli {
    /// The document to update. [default: README.md]
    #[arg(short, long, value_name = "FILE_PATH")]
    pub file: Option<PathBuf>,

    /// The line that marks the start and end of the usage block. [default: "[comment]: <> (usage)"]
    #[arg(short, long, value_name = "MARKER", allow_hyphen_values = true)]
    pub delimiter: Option<String>,

    /// A build step to run first, split on whitespace (no shell, no quoting).
    /// Use `build = [...]` in the config file for arguments containing spaces.
    #[arg(short, long, value_name = "BUILD_COMMAND", allow_hyphen_values = true)]
    pub build: Option<String>,

    /// Directory the commands run in. [default: the document's directory]
    #[arg(short = 'C', long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Kill a command that runs longer than this many seconds. [default: 120]
    #[arg(short, long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Read settings from a TOML (or .yaml/.yml) file. Flags override it.
    #[arg(short, long, value_name = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Print the updated document instead of writing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print a unified diff of the pending change instead of writing it.
    #[arg(long)]
    pub diff: bool,

    /// Exit with an error if the document is out of date. Nothing is written.
    #[arg(long)]
    pub check: bool,

    /// The command whose standard output becomes the usage block.
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.dry_run {
            OutputMode::DryRun
        } else if self.diff {
            OutputMode::Diff
        } else if self.check {
            OutputMode::Check
        } else {
            OutputMode::Write
        }
    }

    /// The settings given on the command line, as the topmost config layer.
    pub fn config_layer(&self) -> ConfigLayer {
        ConfigLayer {
            file: self.file.clone(),
            delimiter: self.delimiter.clone(),
            build: self
                .build
                .as_deref()
                .map(|build| build.split_whitespace().map(str::to_string).collect()),
            command: Some(self.command.clone()).filter(|command| !command.is_empty()),
            working_dir: self.working_dir.clone(),
            timeout: self.timeout,
        }
    }
}
