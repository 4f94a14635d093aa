//! Runs external commands and captures their standard output.

use crate::error::SyncError;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs `command` and returns its standard output, trimmed.
///
/// `command` is a program followed by its arguments; it is never passed through
/// a shell. The child runs in `working_dir` when given, otherwise in the current
/// directory. Output is discarded unless the command exits successfully within
/// `timeout`; a child that overruns is killed.
pub fn capture_output(
    command: &[String],
    working_dir: Option<&Path>,
    timeout: Duration,
) -> Result<String, SyncError> {
    let stdout = run_to_completion(command, working_dir, timeout)?;
    Ok(stdout.trim().to_string())
}

/// Like [`capture_output`] but returns standard output as written.
pub(crate) fn run_to_completion(
    command: &[String],
    working_dir: Option<&Path>,
    timeout: Duration,
) -> Result<String, SyncError> {
    let (program, args) = command.split_first().ok_or(SyncError::EmptyCommand)?;
    let display = display_command(command);

    let mut process = Command::new(program);
    process
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        process.current_dir(dir);
    }

    log::debug!("Running `{display}` (timeout {}s)", timeout.as_secs_f64());
    let mut child = process.spawn().map_err(|source| SyncError::Spawn {
        command: display.clone(),
        source,
    })?;

    // Drain both pipes concurrently so a child filling one of them never blocks.
    let stdout_reader = drain(child.stdout.take());
    let stderr_reader = drain(child.stderr.take());

    // A timeout too large to represent is no deadline at all.
    let deadline = Instant::now().checked_add(timeout);

    let status = match wait_with_deadline(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => {
            reap(&mut child);
            return Err(SyncError::TimedOut {
                command: display,
                timeout,
            });
        }
        Err(source) => {
            reap(&mut child);
            return Err(SyncError::Wait {
                command: display,
                source,
            });
        }
    };

    // Grandchildren can keep the pipes open after the child exits, so reading
    // them is bounded by the same deadline. Readers still blocked are left
    // detached.
    let wait_error = |source| SyncError::Wait {
        command: display.clone(),
        source,
    };
    let timed_out = || SyncError::TimedOut {
        command: display.clone(),
        timeout,
    };
    let stdout = collect(stdout_reader, deadline)
        .map_err(wait_error)?
        .ok_or_else(timed_out)?;
    let stderr = collect(stderr_reader, deadline)
        .map_err(wait_error)?
        .ok_or_else(timed_out)?;
    let stderr = String::from_utf8_lossy(&stderr).into_owned();

    if !status.success() {
        return Err(SyncError::CommandFailed {
            command: display,
            status,
            stderr,
        });
    }

    if !stderr.trim().is_empty() {
        log::debug!("`{display}` wrote to stderr:\n{}", stderr.trim_end());
    }
    log::debug!("`{display}` produced {} bytes of output", stdout.len());

    String::from_utf8(stdout).map_err(|_| SyncError::InvalidOutput { command: display })
}

fn display_command(command: &[String]) -> String {
    command.join(" ")
}

type PipeContents = io::Result<Vec<u8>>;

fn drain<R>(pipe: Option<R>) -> Receiver<PipeContents>
where
    R: Read + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        let contents = match pipe {
            Some(mut pipe) => pipe.read_to_end(&mut buf).map(|_| buf),
            None => Ok(buf),
        };
        // Nobody is listening any more once the deadline has passed.
        let _ = sender.send(contents);
    });
    receiver
}

/// Waits for a reader to finish. `Ok(None)` means the deadline passed first.
fn collect(
    reader: Receiver<PipeContents>,
    deadline: Option<Instant>,
) -> io::Result<Option<Vec<u8>>> {
    let reader_died = || io::Error::other("output reader thread panicked");

    let contents = match deadline {
        Some(deadline) => {
            match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(contents) => contents,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(reader_died()),
            }
        }
        None => reader.recv().map_err(|_| reader_died())?,
    };

    contents.map(Some)
}

/// Polls `child` until it exits or `deadline` passes. `Ok(None)` means the
/// deadline passed with the child still running.
fn wait_with_deadline(
    child: &mut Child,
    deadline: Option<Instant>,
) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

fn reap(child: &mut Child) {
    if let Err(err) = child.kill() {
        log::debug!("Failed to kill child process {}: {err}", child.id());
    }
    let _ = child.wait();
}
