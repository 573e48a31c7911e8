//! Externally tracked work items and the dispatch categories derived from them.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Project status that marks an issue's plan as approved for implementation.
pub const STATUS_PLAN_ACCEPTED: &str = "Plan Accepted";
/// Project status for issues still under discussion.
pub const STATUS_PROPOSED: &str = "Proposed";
/// Label carried by every plan issue.
pub const LABEL_PLAN: &str = "agentize:plan";
/// Label requesting another planning pass on a plan issue.
pub const LABEL_REFINE: &str = "agentize:refine";
/// Label marking a raw feature request that still needs a plan.
pub const LABEL_DEV_REQ: &str = "agentize:dev-req";

/// Tracker item flavour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Tracker issue.
    Issue,
    /// Pull request.
    PullRequest,
}

/// One item returned by the work-source query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    /// Issue or PR flavour.
    pub kind: ItemKind,
    /// Issue or PR number.
    pub number: u64,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Project board status column, if set.
    #[serde(default)]
    pub status: Option<String>,
    /// PR state (`OPEN`, `CLOSED`, `MERGED`); `None` for issues.
    #[serde(default)]
    pub pr_state: Option<String>,
    /// PR mergeability (`MERGEABLE`, `CONFLICTING`, `UNKNOWN`).
    #[serde(default)]
    pub mergeable: Option<String>,
    /// Whether the PR is a draft.
    #[serde(default)]
    pub is_draft: bool,
    /// Count of unresolved review threads on the PR.
    #[serde(default)]
    pub unresolved_threads: u32,
}

impl WorkItem {
    /// Bare issue with the given labels and status.
    #[must_use]
    pub fn issue(number: u64, labels: &[&str], status: Option<&str>) -> Self {
        Self {
            kind: ItemKind::Issue,
            number,
            labels: labels.iter().map(|l| (*l).to_owned()).collect(),
            status: status.map(str::to_owned),
            pr_state: None,
            mergeable: None,
            is_draft: false,
            unresolved_threads: 0,
        }
    }

    /// Open, non-draft pull request.
    #[must_use]
    pub fn pull_request(number: u64, mergeable: &str, unresolved_threads: u32) -> Self {
        Self {
            kind: ItemKind::PullRequest,
            number,
            labels: Vec::new(),
            status: None,
            pr_state: Some("OPEN".into()),
            mergeable: Some(mergeable.into()),
            is_draft: false,
            unresolved_threads,
        }
    }

    /// Whether the item carries `label`.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    fn status_is(&self, status: &str) -> bool {
        self.status.as_deref() == Some(status)
    }

    fn is_open_pr(&self) -> bool {
        self.kind == ItemKind::PullRequest
            && self.pr_state.as_deref() == Some("OPEN")
            && !self.is_draft
    }

    fn is_conflicting(&self) -> bool {
        self.mergeable.as_deref() == Some("CONFLICTING")
    }
}

/// Ready-queue an item can land in. Declaration order is dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    /// Accepted plan issues awaiting implementation.
    Implement,
    /// Plan issues flagged for another planning pass.
    Refine,
    /// Feature requests awaiting a first plan.
    DevRequest,
    /// Open PRs that conflict with their base branch.
    Rebase,
    /// Open PRs with unresolved review threads.
    ResolveReview,
}

impl Category {
    /// All categories in dispatch order.
    pub const ALL: [Self; 5] = [
        Self::Implement,
        Self::Refine,
        Self::DevRequest,
        Self::Rebase,
        Self::ResolveReview,
    ];

    /// Whether `item` belongs in this ready-queue.
    #[must_use]
    pub fn accepts(self, item: &WorkItem) -> bool {
        match self {
            Self::Implement => {
                item.kind == ItemKind::Issue
                    && item.status_is(STATUS_PLAN_ACCEPTED)
                    && item.has_label(LABEL_PLAN)
            }
            Self::Refine => {
                item.kind == ItemKind::Issue
                    && item.status_is(STATUS_PROPOSED)
                    && item.has_label(LABEL_PLAN)
                    && item.has_label(LABEL_REFINE)
            }
            Self::DevRequest => {
                item.kind == ItemKind::Issue
                    && item.has_label(LABEL_DEV_REQ)
                    && !item.has_label(LABEL_PLAN)
                    && (item.status.is_none() || item.status_is(STATUS_PROPOSED))
            }
            Self::Rebase => item.is_open_pr() && item.is_conflicting(),
            Self::ResolveReview => {
                item.is_open_pr() && !item.is_conflicting() && item.unresolved_threads > 0
            }
        }
    }

    /// Numbers of the items in this queue, in discovery order.
    #[must_use]
    pub fn select(self, items: &[WorkItem]) -> Vec<u64> {
        items
            .iter()
            .filter(|item| self.accepts(item))
            .map(|item| item.number)
            .collect()
    }

    /// Config/log name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Implement => "impl",
            Self::Refine => "refine",
            Self::DevRequest => "dev_req",
            Self::Rebase => "rebase",
            Self::ResolveReview => "resolve_review",
        }
    }

    /// Human label used in notifications.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Implement => "implementation",
            Self::Refine => "plan refinement",
            Self::DevRequest => "feature-request planning",
            Self::Rebase => "conflict rebase",
            Self::ResolveReview => "review resolution",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dispatchable unit: a category applied to an issue or PR number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitOfWork {
    /// Which ready-queue produced it.
    pub category: Category,
    /// Issue or PR number.
    pub number: u64,
}

impl UnitOfWork {
    /// Construct a unit.
    #[must_use]
    pub fn new(category: Category, number: u64) -> Self {
        Self { category, number }
    }
}

impl Display for UnitOfWork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} #{}", self.category, self.number)
    }
}
