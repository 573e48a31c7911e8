//! Worker slot status records.
//!
//! Each slot is a flat `key=value` file:
//!
//! ```text
//! state=BUSY
//! issue=42
//! pid=9999
//! ```

use std::fmt::{Display, Formatter, Write as _};
use std::str::FromStr;

use tracing::warn;

use crate::{AppError, Result};

/// Occupancy of a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Available for assignment.
    Free,
    /// Reserved for, or running, one unit of work.
    Busy,
}

impl SlotState {
    /// Token written after `state=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Busy => "BUSY",
        }
    }
}

impl Display for SlotState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "FREE" => Ok(Self::Free),
            "BUSY" => Ok(Self::Busy),
            other => Err(AppError::Store(format!("unknown worker state `{other}`"))),
        }
    }
}

/// One position in the bounded worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSlot {
    /// Occupancy.
    pub state: SlotState,
    /// Issue or PR number assigned while busy.
    pub issue: Option<u64>,
    /// OS process id of the dispatched agent, once known.
    pub pid: Option<u32>,
}

impl WorkerSlot {
    /// An empty, assignable slot.
    #[must_use]
    pub fn free() -> Self {
        Self {
            state: SlotState::Free,
            issue: None,
            pid: None,
        }
    }

    /// A slot reserved for `issue`, optionally with the agent's pid.
    #[must_use]
    pub fn busy(issue: u64, pid: Option<u32>) -> Self {
        Self {
            state: SlotState::Busy,
            issue: Some(issue),
            pid,
        }
    }

    /// Whether the slot is reserved.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state == SlotState::Busy
    }

    /// Parse a status file body.
    ///
    /// A missing or unknown `state=` line is a structural error. Malformed
    /// `issue=` / `pid=` values are dropped with a warning, leaving the rest
    /// of the record usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the record has no valid `state`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut state = None;
        let mut issue = None;
        let mut pid = None;

        for line in raw.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            match key {
                "state" => state = Some(value.parse::<SlotState>()?),
                "issue" => match value.parse::<u64>() {
                    Ok(n) => issue = Some(n),
                    Err(err) => warn!(value, %err, "ignoring malformed issue in worker status"),
                },
                "pid" => match value.parse::<u32>() {
                    Ok(n) => pid = Some(n),
                    Err(err) => warn!(value, %err, "ignoring malformed pid in worker status"),
                },
                _ => {}
            }
        }

        let state = state.ok_or_else(|| AppError::Store("worker status has no state".into()))?;
        Ok(Self { state, issue, pid })
    }

    /// Serialize to the status file body (trailing newline included).
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("state={}\n", self.state);
        if let Some(issue) = self.issue {
            let _ = writeln!(out, "issue={issue}");
        }
        if let Some(pid) = self.pid {
            let _ = writeln!(out, "pid={pid}");
        }
        out
    }
}
