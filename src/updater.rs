//! The README updater: load, split, capture, render, write.

use crate::capture::{capture_output, run_to_completion};
use crate::config::Config;
use crate::document::{load_document, render, split_on_delimiter, write_document};
use crate::error::SyncError;
use crate::lock::DocumentLock;
use similar::TextDiff;
use std::path::Path;

/// What to do with the regenerated document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Replace the document on disk.
    #[default]
    Write,
    /// Leave the document alone; the caller prints the rendered text.
    DryRun,
    /// Leave the document alone; the caller prints a diff.
    Diff,
    /// Leave the document alone and fail if it is stale.
    Check,
}

/// The result of one run: the document as it was and as it is now rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub original: String,
    pub rendered: String,
}

impl Update {
    pub fn changed(&self) -> bool {
        self.original != self.rendered
    }

    /// Unified diff from the document on disk to the rendered one.
    pub fn unified_diff(&self) -> String {
        TextDiff::from_lines(&self.original, &self.rendered)
            .unified_diff()
            .header("original", "updated")
            .to_string()
    }
}

pub struct ReadmeUpdater {
    config: Config,
}

impl ReadmeUpdater {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Regenerates the usage block and handles the result according to `mode`.
    ///
    /// Nothing is written unless every earlier step succeeded, and in
    /// [`OutputMode::Write`] the write itself is atomic.
    pub fn update(&self, mode: OutputMode) -> Result<Update, SyncError> {
        self.config.validate()?;
        let path = self.config.file.as_path();

        let _lock = DocumentLock::acquire(path)?;
        let update = self.regenerate(path)?;

        match mode {
            OutputMode::Write => {
                write_document(path, &update.rendered)?;
                if update.changed() {
                    log::info!("Updated usage block in {}", path.display());
                } else {
                    log::info!("{} is already up to date", path.display());
                }
            }
            OutputMode::Check if update.changed() => {
                return Err(SyncError::OutOfDate {
                    path: path.to_path_buf(),
                });
            }
            OutputMode::Check | OutputMode::DryRun | OutputMode::Diff => {}
        }

        Ok(update)
    }

    fn regenerate(&self, path: &Path) -> Result<Update, SyncError> {
        let original = load_document(path)?;
        let delimiter = self.config.delimiter.as_str();
        let sections = split_on_delimiter(&original, delimiter)?;

        let output = self.capture()?;
        let rendered = render(sections.preamble, delimiter, &output, sections.trailing);

        Ok(Update {
            original,
            rendered,
        })
    }

    /// Runs the build step, if any, then the command. The embedded text is
    /// their combined standard output.
    fn capture(&self) -> Result<String, SyncError> {
        let Config {
            build,
            command,
            timeout,
            ..
        } = &self.config;
        let working_dir = Some(self.config.resolved_working_dir());

        let Some(build) = build else {
            return capture_output(command, working_dir, *timeout);
        };

        let mut output = run_to_completion(build, working_dir, *timeout)?;
        output.push_str(&run_to_completion(command, working_dir, *timeout)?);
        Ok(output.trim().to_string())
    }
}
