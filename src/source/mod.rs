//! Work-item discovery on the project board.

pub mod github;

use crate::config::FleetConfig;
use crate::models::work_item::WorkItem;
use crate::{BoxFuture, Result};

pub use github::GitHubSource;

/// Board and pull-request lookup used by the poller.
pub trait WorkSource: Send + Sync {
    /// Every issue and PR on the board, with the fields the category
    /// predicates read.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` when the board cannot be queried.
    fn fetch_items(&self) -> BoxFuture<'_, Result<Vec<WorkItem>>>;

    /// PR opened for `issue_no`, if any.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Source` when the lookup fails.
    fn find_pr_for_issue(&self, issue_no: u64) -> BoxFuture<'_, Result<Option<u64>>>;

    /// Pick up a fresh configuration snapshot.
    fn reconfigure(&self, _config: &FleetConfig) {}
}
