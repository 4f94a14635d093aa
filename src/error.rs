//! Defines custom error types for the application.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Broad category of a [`SyncError`], used to tell failures apart without
/// matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Execution,
    Config,
    OutOfDate,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read document {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write document {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Document {} is locked by another run (lock file {})", document.display(), lock.display())]
    Locked { document: PathBuf, lock: PathBuf },

    #[error("Failed to create lock file {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Expected the delimiter '{delimiter}' to appear on its own line exactly twice, found {found} occurrence(s).")]
    DelimiterCount { delimiter: String, found: usize },

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}{}", stderr_suffix(stderr))]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` did not finish within {}s.", timeout.as_secs_f64())]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` wrote output that is not valid UTF-8.")]
    InvalidOutput { command: String },

    #[error("Failed while waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("No command configured. Pass it after `--` or set `command` in the config file.")]
    EmptyCommand,

    #[error("The delimiter must not be empty.")]
    EmptyDelimiter,

    #[error("The timeout must be at least one second.")]
    ZeroTimeout,

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}: {message}", path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("{} is out of date. Re-run without --check to update it.", path.display())]
    OutOfDate { path: PathBuf },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Read { .. }
            | SyncError::Write { .. }
            | SyncError::Locked { .. }
            | SyncError::Lock { .. } => ErrorKind::Io,
            SyncError::DelimiterCount { .. } => ErrorKind::Format,
            SyncError::Spawn { .. }
            | SyncError::CommandFailed { .. }
            | SyncError::TimedOut { .. }
            | SyncError::InvalidOutput { .. }
            | SyncError::Wait { .. } => ErrorKind::Execution,
            SyncError::EmptyCommand
            | SyncError::EmptyDelimiter
            | SyncError::ZeroTimeout
            | SyncError::ConfigRead { .. }
            | SyncError::ConfigParse { .. } => ErrorKind::Config,
            SyncError::OutOfDate { .. } => ErrorKind::OutOfDate,
        }
    }
}

// Keep the error line readable when a build dumps pages of diagnostics.
const STDERR_TAIL_LINES: usize = 20;

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
    format!(":\n{}", tail.join("\n"))
}
