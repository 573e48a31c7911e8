//! JSONL decision log writer with daily file rotation.

use std::{
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{NaiveDate, Utc};

use super::{DecisionEntry, DecisionLogger};
use crate::{AppError, Result};

struct WriterState {
    current_date: NaiveDate,
    writer: BufWriter<fs::File>,
}

/// Appends one JSON object per line to `<log_dir>/hook-YYYY-MM-DD.jsonl`.
///
/// Several hook processes may append to the same file; each entry is a
/// single `write` of one line followed by a flush.
pub struct JsonlDecisionWriter {
    log_dir: PathBuf,
    state: Mutex<Option<WriterState>>,
}

impl JsonlDecisionWriter {
    /// Construct a writer that stores logs in `log_dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the directory cannot be created.
    pub fn new(log_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            AppError::Io(format!(
                "failed to create log directory {}: {e}",
                log_dir.display()
            ))
        })?;
        Ok(Self {
            log_dir,
            state: Mutex::new(None),
        })
    }

    /// Path of the log file for `date`.
    #[must_use]
    pub fn path_for(log_dir: &Path, date: NaiveDate) -> PathBuf {
        log_dir.join(format!("hook-{date}.jsonl"))
    }

    fn open_for_date(log_dir: &Path, date: NaiveDate) -> Result<BufWriter<fs::File>> {
        let path = Self::path_for(log_dir, date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::Io(format!("failed to open {}: {e}", path.display())))?;
        Ok(BufWriter::new(file))
    }
}

impl DecisionLogger for JsonlDecisionWriter {
    fn log_entry(&self, entry: DecisionEntry) -> Result<()> {
        let today = Utc::now().date_naive();

        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::Io("decision writer mutex poisoned".into()))?;

        if guard.as_ref().is_none_or(|s| s.current_date != today) {
            *guard = Some(WriterState {
                current_date: today,
                writer: Self::open_for_date(&self.log_dir, today)?,
            });
        }

        if let Some(state) = guard.as_mut() {
            let mut line = serde_json::to_string(&entry)?;
            line.push('\n');
            state
                .writer
                .write_all(line.as_bytes())
                .and_then(|()| state.writer.flush())
                .map_err(|e| AppError::Io(format!("decision log write failed: {e}")))?;
        }

        Ok(())
    }
}
