//! Transcript inspection for provider errors that must end the session.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde_json::Value;
use tracing::debug;

/// Initial window read from the end of the transcript; doubled until the
/// final line fits.
const TAIL_BYTES: u64 = 64 * 1024;

/// Error fragments that make further continuations pointless.
const FATAL_MARKERS: &[&str] = &["Insufficient credit"];

/// Read the last non-empty line of the transcript at `path`.
fn last_line(path: &Path) -> Option<String> {
    let mut file = File::open(path).ok()?;
    let len = file.metadata().ok()?.len();
    let mut window = TAIL_BYTES;
    loop {
        let start = len.saturating_sub(window);
        file.seek(SeekFrom::Start(start)).ok()?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).ok()?;
        let content = buf.trim_ascii_end();
        // The last line is whole once a newline precedes it or the window
        // reaches the start of the file.
        if start == 0 || content.contains(&b'\n') {
            return String::from_utf8_lossy(content)
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .map(str::to_owned);
        }
        window = window.saturating_mul(2);
    }
}

/// Whether the final transcript entry is a fatal provider error.
///
/// Missing files and unparseable entries count as "no fatal error".
#[must_use]
pub fn has_fatal_provider_error(path: &Path) -> bool {
    let Some(line) = last_line(path) else {
        return false;
    };
    let entry: Value = match serde_json::from_str(&line) {
        Ok(entry) => entry,
        Err(err) => {
            debug!(path = %path.display(), %err, "could not parse last transcript entry");
            return false;
        }
    };

    if entry.get("isApiErrorMessage").and_then(Value::as_bool) != Some(true) {
        return false;
    }

    let content = entry
        .get("message")
        .and_then(|m| m.get("content"))
        .map(Value::to_string)
        .unwrap_or_default();
    FATAL_MARKERS.iter().any(|marker| content.contains(marker))
}
