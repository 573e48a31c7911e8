//! Bounded worker pool backed by per-slot status files.
//!
//! Slots are the only admission control: a unit of work is dispatched only
//! after a FREE slot has been rewritten as BUSY. A BUSY slot becomes FREE
//! again through [`WorkerPool::release`] or dead-process cleanup.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::FleetConfig;
use crate::models::session::Workflow;
use crate::models::worker::WorkerSlot;
use crate::notify::{completion_message, Notifier};
use crate::persistence::issue_index_repo::IssueIndexRepo;
use crate::persistence::session_repo::SessionRepo;
use crate::persistence::worker_repo::WorkerRepo;
use crate::source::WorkSource;
use crate::Result;

use super::task::TaskRunner;

/// Collaborators consulted when a dead worker is reclaimed.
pub struct CompletionContext<'a> {
    /// Configuration snapshot of the current cycle.
    pub config: &'a FleetConfig,
    /// Notification sink; only used when `config.telegram` is set.
    pub notifier: Option<&'a dyn Notifier>,
    /// PR lookup for attaching the delivered PR to the session.
    pub source: Option<&'a dyn WorkSource>,
}

/// Pool of `n` numbered worker slots.
pub struct WorkerPool {
    repo: WorkerRepo,
    sessions: SessionRepo,
    index: IssueIndexRepo,
    task: Arc<dyn TaskRunner>,
}

impl WorkerPool {
    /// Pool over the store in `config`, probing liveness through `task`.
    #[must_use]
    pub fn new(config: &FleetConfig, task: Arc<dyn TaskRunner>) -> Self {
        let paths = config.store_paths();
        Self {
            repo: WorkerRepo::new(paths.clone()),
            sessions: SessionRepo::new(paths.clone()),
            index: IssueIndexRepo::new(paths),
            task,
        }
    }

    /// Create status files for slots `0..n` that are missing or unreadable.
    ///
    /// Valid files are left untouched, so a restart keeps in-flight work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a status file cannot be written.
    pub fn init(&self, n: usize) -> Result<()> {
        for slot in 0..n {
            match self.repo.load(slot) {
                Ok(Some(_)) => continue,
                Ok(None) => debug!(slot, "initializing worker slot"),
                Err(err) => warn!(slot, %err, "resetting invalid worker slot"),
            }
            self.repo.save(slot, &WorkerSlot::free())?;
        }
        Ok(())
    }

    /// Read slot `slot`. Missing and malformed files read as FREE.
    #[must_use]
    pub fn read(&self, slot: usize) -> WorkerSlot {
        match self.repo.load(slot) {
            Ok(status) => status.unwrap_or_else(WorkerSlot::free),
            Err(err) => {
                warn!(slot, %err, "treating unreadable worker slot as free");
                WorkerSlot::free()
            }
        }
    }

    /// Overwrite slot `slot`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the write fails.
    pub fn write(&self, slot: usize, status: &WorkerSlot) -> Result<()> {
        self.repo.save(slot, status)
    }

    /// Mark `slot` FREE.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the write fails.
    pub fn release(&self, slot: usize) -> Result<()> {
        self.write(slot, &WorkerSlot::free())
    }

    /// Lowest-indexed FREE slot among `0..n`.
    #[must_use]
    pub fn get_free(&self, n: usize) -> Option<usize> {
        (0..n).find(|&slot| !self.read(slot).is_busy())
    }

    /// Slot among `0..n` that is BUSY with `number`.
    #[must_use]
    pub fn find_busy(&self, n: usize, number: u64) -> Option<usize> {
        (0..n).find(|&slot| {
            let status = self.read(slot);
            status.is_busy() && status.issue == Some(number)
        })
    }

    /// Whether `status` may not be reclaimed.
    ///
    /// Only a BUSY slot whose pid the probe reports gone is dead; a BUSY
    /// slot without a pid is never reclaimed.
    #[must_use]
    pub fn is_live(&self, status: &WorkerSlot) -> bool {
        if !status.is_busy() {
            return true;
        }
        match status.pid {
            Some(pid) => self.task.is_alive(pid),
            None => true,
        }
    }

    /// Reclaim every BUSY slot among `0..n` whose agent has exited.
    ///
    /// For a finished implementation session the delivered PR is attached,
    /// one completion notice is sent, and the issue index entry is removed
    /// once the notice went out. Returns the reclaimed slot numbers.
    pub async fn cleanup_dead(&self, n: usize, ctx: &CompletionContext<'_>) -> Vec<usize> {
        let mut reclaimed = Vec::new();
        for slot in 0..n {
            let status = self.read(slot);
            if self.is_live(&status) {
                continue;
            }

            let span = info_span!("reclaim", slot, issue = ?status.issue, pid = ?status.pid);
            async {
                if let Some(issue_no) = status.issue {
                    self.report_completion(slot, issue_no, ctx).await;
                }
                match self.release(slot) {
                    Ok(()) => {
                        info!("reclaimed dead worker");
                        reclaimed.push(slot);
                    }
                    Err(err) => warn!(%err, "failed to free dead worker slot"),
                }
            }
            .instrument(span)
            .await;
        }
        reclaimed
    }

    async fn report_completion(&self, slot: usize, issue_no: u64, ctx: &CompletionContext<'_>) {
        let Some((session_id, state)) = self.sessions.state_for_issue(&self.index, issue_no) else {
            debug!("no session recorded for issue");
            return;
        };
        if !state.is_done() {
            debug!(session_id, "session not done, no completion notice");
            return;
        }

        let mut pr_no = state.pr_no;
        if pr_no.is_none() && state.workflow == Some(Workflow::IssueToImpl) {
            pr_no = self.attach_pr(issue_no, ctx.source).await;
        }

        let Some(notifier) = ctx.notifier.filter(|_| ctx.config.telegram.is_some()) else {
            return;
        };
        let message = completion_message(ctx.config, slot, issue_no, pr_no);
        match notifier.send(&message).await {
            Ok(()) => {
                info!(session_id, "completion notice sent");
                // The index entry is the dedup marker; once gone, no second notice.
                if let Err(err) = self.index.remove(issue_no) {
                    warn!(%err, "failed to remove issue index entry");
                }
            }
            Err(err) => warn!(%err, "completion notice failed"),
        }
    }

    async fn attach_pr(&self, issue_no: u64, source: Option<&dyn WorkSource>) -> Option<u64> {
        let pr_no = match source?.find_pr_for_issue(issue_no).await {
            Ok(found) => found?,
            Err(err) => {
                warn!(%err, "PR lookup failed");
                return None;
            }
        };
        match self
            .sessions
            .set_pr_number_for_issue(&self.index, issue_no, pr_no)
        {
            Ok(true) => debug!(pr_no, "attached PR to session"),
            Ok(false) => debug!(pr_no, "session vanished before PR attach"),
            Err(err) => warn!(pr_no, %err, "failed to attach PR to session"),
        }
        Some(pr_no)
    }
}
