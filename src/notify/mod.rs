//! Operator notifications.
//!
//! The poller announces each assignment and each finished implementation
//! session. Delivery failures are logged by callers and never retried.

pub mod telegram;

use std::fmt::Write as _;

use crate::config::FleetConfig;
use crate::models::work_item::{Category, UnitOfWork};
use crate::{BoxFuture, Result};

pub use telegram::TelegramNotifier;

/// Message sink.
pub trait Notifier: Send + Sync {
    /// Deliver `message`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Notify` when delivery fails.
    fn send<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<()>>;

    /// Pick up a fresh configuration snapshot.
    fn reconfigure(&self, _config: &FleetConfig) {}
}

/// Completion notice for an implementation session that reached `done`.
#[must_use]
pub fn completion_message(
    config: &FleetConfig,
    worker: usize,
    issue_no: u64,
    pr_no: Option<u64>,
) -> String {
    let mut msg = format!("✅ Worker {worker} finished issue #{issue_no}");
    // Writing into a String cannot fail.
    if let Some(url) = config.issue_url(issue_no) {
        let _ = write!(msg, "\nIssue: {url}");
    }
    match (pr_no, pr_no.and_then(|pr| config.pr_url(pr))) {
        (Some(_), Some(url)) => {
            let _ = write!(msg, "\nPR: {url}");
        }
        (Some(pr), None) => {
            let _ = write!(msg, "\nPR: #{pr}");
        }
        (None, _) => {}
    }
    msg
}

/// Assignment notice sent after a successful dispatch.
#[must_use]
pub fn assignment_message(config: &FleetConfig, unit: UnitOfWork, worker: Option<usize>) -> String {
    let mut msg = match worker {
        Some(slot) => format!("🚀 Worker {slot} picked up {unit} ({})", unit.category.describe()),
        None => format!("🚀 Dispatched {unit} ({})", unit.category.describe()),
    };
    let url = match unit.category {
        Category::Rebase | Category::ResolveReview => config.pr_url(unit.number),
        _ => config.issue_url(unit.number),
    };
    if let Some(url) = url {
        msg.push('\n');
        msg.push_str(&url);
    }
    msg
}
