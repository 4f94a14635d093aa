//! Core library for usage-sync: regenerates the usage block of a README from
//! the live output of a command.
//!
//! The document must contain a delimiter line exactly twice. Everything between
//! the two lines is replaced by the command's standard output wrapped in a
//! fenced code block; everything else is left as it was.
//!
//! # Example
//!
//! ```rust,no_run
//! use usage_sync::config::Config;
//! use usage_sync::updater::{OutputMode, ReadmeUpdater};
//!
//! # fn demo() -> Result<(), usage_sync::error::SyncError> {
//! let config = Config::new(vec!["./target/debug/tool".into(), "--help".into()]);
//! let update = ReadmeUpdater::new(config).update(OutputMode::Write)?;
//! println!("changed: {}", update.changed());
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod lock;
pub mod updater;

use crate::cli::Cli;
use crate::config::{Config, ConfigLayer};
use crate::updater::{OutputMode, ReadmeUpdater};
use anyhow::Context;
use clap::Parser;
use std::io::{self, Write};

/// The main entry point for the application logic.
pub fn run() -> anyhow::Result<()> {
    env_logger::init();

    // 1. Parse CLI args
    let cli = Cli::parse();
    let mode = cli.output_mode();

    // 2. Resolve configuration: defaults, then the config file, then flags
    let mut layers = Vec::with_capacity(2);
    if let Some(config_path) = &cli.config {
        layers.push(ConfigLayer::load(config_path)?);
    }
    layers.push(cli.config_layer());
    let config = Config::from_layers(layers)?;

    // 3. Regenerate the usage block
    let update = ReadmeUpdater::new(config).update(mode)?;

    // 4. Emit the result for the read-only modes
    let emitted = match mode {
        OutputMode::DryRun => update.rendered.clone(),
        OutputMode::Diff => update.unified_diff(),
        OutputMode::Write | OutputMode::Check => return Ok(()),
    };
    io::stdout()
        .write_all(emitted.as_bytes())
        .context("Failed to write to stdout")?;

    Ok(())
}
