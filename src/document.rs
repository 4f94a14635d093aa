//! Reading, splitting, rendering and atomically writing the document that
//! carries the usage block.

use crate::error::SyncError;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// The fence wrapped around the captured output.
const FENCE: &str = "```";

/// The three parts of a document, split on the two delimiter lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections<'a> {
    /// Everything before the first delimiter line.
    pub preamble: &'a str,
    /// The generated block between the two delimiter lines. Discarded on render.
    pub marker: &'a str,
    /// Everything after the second delimiter line.
    pub trailing: &'a str,
}

/// Reads the whole document into memory.
pub fn load_document(path: &Path) -> Result<String, SyncError> {
    fs::read_to_string(path).map_err(|source| SyncError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Splits `text` on every occurrence of `delimiter` followed by a newline.
///
/// The delimiter must occur exactly twice. Fewer occurrences leave nothing to
/// replace and more are ambiguous, so both are reported as
/// [`SyncError::DelimiterCount`].
pub fn split_on_delimiter<'a>(
    text: &'a str,
    delimiter: &str,
) -> Result<Sections<'a>, SyncError> {
    let separator = format!("{delimiter}\n");
    let parts: Vec<&str> = text.split(separator.as_str()).collect();

    match *parts.as_slice() {
        [preamble, marker, trailing] => Ok(Sections {
            preamble,
            marker,
            trailing,
        }),
        _ => Err(SyncError::DelimiterCount {
            delimiter: delimiter.to_string(),
            found: parts.len() - 1,
        }),
    }
}

/// Reassembles a document with `output` embedded as a fenced block between the
/// two delimiter lines.
///
/// The preamble is trimmed and the output is trimmed; the trailing part is
/// copied verbatim.
pub fn render(preamble: &str, delimiter: &str, output: &str, trailing: &str) -> String {
    let preamble = preamble.trim();
    let output = output.trim();

    let mut rendered = String::with_capacity(
        preamble.len() + 2 * delimiter.len() + output.len() + trailing.len() + 16,
    );
    rendered.push_str(preamble);
    rendered.push('\n');
    rendered.push_str(delimiter);
    rendered.push('\n');
    rendered.push_str(FENCE);
    rendered.push('\n');
    rendered.push_str(output);
    rendered.push('\n');
    rendered.push_str(FENCE);
    rendered.push('\n');
    rendered.push_str(delimiter);
    rendered.push('\n');
    rendered.push_str(trailing);
    rendered
}

/// Replaces the document at `path` with `contents`.
///
/// The new contents go to a temporary file in the same directory which is then
/// renamed over the original, so readers only ever see the old or the new
/// document. On failure the temporary file is removed and the original is left
/// as it was.
pub fn write_document(path: &Path, contents: &str) -> Result<(), SyncError> {
    let write_error = |source: io::Error| SyncError::Write {
        path: path.to_path_buf(),
        source,
    };

    // `Path::parent` yields "" for a bare file name.
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix(".usage-sync-")
        .suffix(".tmp")
        .tempfile_in(parent_dir)
        .map_err(write_error)?;

    temp_file.write_all(contents.as_bytes()).map_err(write_error)?;
    temp_file.as_file().sync_all().map_err(write_error)?;

    // Carry the original permissions over so an executable or read-only bit
    // survives the rename.
    if let Ok(metadata) = fs::metadata(path) {
        temp_file
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(write_error)?;
    }

    temp_file
        .persist(path)
        .map_err(|err| write_error(err.error))?;

    log::debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
