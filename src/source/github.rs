//! `gh` CLI backed [`WorkSource`].
//!
//! Board items come from one GraphQL query against a Projects v2 board;
//! PR attachment scans `gh pr list` for a head branch named `issue-<n>`
//! or `issue-<n>-<suffix>`.

use std::sync::RwLock;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info_span, warn, Instrument};

use crate::config::{FleetConfig, ProjectRef};
use crate::models::work_item::{ItemKind, WorkItem};
use crate::{AppError, BoxFuture, Result};

use super::WorkSource;

const PROJECT_QUERY: &str = r#"
query($org: String!, $number: Int!) {
  organization(login: $org) {
    projectV2(number: $number) {
      items(first: 100) {
        nodes {
          fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
          content {
            __typename
            ... on Issue {
              number
              labels(first: 20) { nodes { name } }
            }
            ... on PullRequest {
              number
              state
              isDraft
              mergeable
              labels(first: 20) { nodes { name } }
              reviewThreads(first: 50) { nodes { isResolved } }
            }
          }
        }
      }
    }
  }
}"#;

#[derive(Debug, Clone, Default)]
struct Target {
    project: Option<ProjectRef>,
    repo_slug: Option<String>,
}

/// Queries GitHub through the `gh` binary.
pub struct GitHubSource {
    gh_bin: String,
    target: RwLock<Target>,
}

impl GitHubSource {
    /// Source bound to the board and repo named in `config`.
    #[must_use]
    pub fn new(config: &FleetConfig) -> Self {
        let source = Self {
            gh_bin: "gh".to_owned(),
            target: RwLock::new(Target::default()),
        };
        source.reconfigure(config);
        source
    }

    /// Use a different `gh` executable.
    #[must_use]
    pub fn with_gh_bin(mut self, gh_bin: impl Into<String>) -> Self {
        self.gh_bin = gh_bin.into();
        self
    }

    fn target(&self) -> Target {
        self.target
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn run_gh(&self, args: &[String]) -> Result<Vec<u8>> {
        debug!(gh = self.gh_bin, ?args, "running gh");
        let output = Command::new(&self.gh_bin)
            .args(args)
            .output()
            .await
            .map_err(|err| AppError::Source(format!("failed to run {}: {err}", self.gh_bin)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Source(format!(
                "{} exited with {}: {}",
                self.gh_bin,
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl WorkSource for GitHubSource {
    fn fetch_items(&self) -> BoxFuture<'_, Result<Vec<WorkItem>>> {
        Box::pin(
            async move {
                let Some(project) = self.target().project else {
                    return Err(AppError::Source("no [project] configured".into()));
                };
                let args = vec![
                    "api".to_owned(),
                    "graphql".to_owned(),
                    "-f".to_owned(),
                    format!("query={PROJECT_QUERY}"),
                    "-f".to_owned(),
                    format!("org={}", project.org),
                    "-F".to_owned(),
                    format!("number={}", project.id),
                ];
                let raw = self.run_gh(&args).await?;
                parse_project_items(&raw)
            }
            .instrument(info_span!("fetch_items")),
        )
    }

    fn find_pr_for_issue(&self, issue_no: u64) -> BoxFuture<'_, Result<Option<u64>>> {
        Box::pin(
            async move {
                let mut args: Vec<String> = [
                    "pr", "list", "--state", "all", "--limit", "200", "--json",
                    "number,headRefName",
                ]
                .into_iter()
                .map(str::to_owned)
                .collect();
                if let Some(slug) = self.target().repo_slug {
                    args.push("--repo".to_owned());
                    args.push(slug);
                }
                let raw = self.run_gh(&args).await?;
                let prs: Vec<PrHead> = serde_json::from_slice(&raw)
                    .map_err(|err| AppError::Source(format!("invalid pr list: {err}")))?;
                Ok(match_pr_for_issue(&prs, issue_no))
            }
            .instrument(info_span!("find_pr_for_issue", issue_no)),
        )
    }

    fn reconfigure(&self, config: &FleetConfig) {
        match self.target.write() {
            Ok(mut guard) => {
                *guard = Target {
                    project: config.server.project.clone(),
                    repo_slug: config.server.repo_slug.clone(),
                };
            }
            Err(err) => warn!(%err, "source target lock poisoned"),
        }
    }
}

/// One row of `gh pr list --json number,headRefName`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PrHead {
    /// PR number.
    pub number: u64,
    /// Source branch.
    #[serde(rename = "headRefName")]
    pub head_ref_name: String,
}

/// First PR whose head branch is `issue-<n>` or `issue-<n>-<suffix>`.
#[must_use]
pub fn match_pr_for_issue(prs: &[PrHead], issue_no: u64) -> Option<u64> {
    let exact = format!("issue-{issue_no}");
    let prefix = format!("issue-{issue_no}-");
    prs.iter()
        .find(|pr| pr.head_ref_name == exact || pr.head_ref_name.starts_with(&prefix))
        .map(|pr| pr.number)
}

#[derive(Debug, Deserialize)]
struct GqlResponse {
    data: Option<GqlData>,
    #[serde(default)]
    errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
struct GqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GqlData {
    organization: Option<GqlOrg>,
}

#[derive(Debug, Deserialize)]
struct GqlOrg {
    #[serde(rename = "projectV2")]
    project: Option<GqlProject>,
}

#[derive(Debug, Deserialize)]
struct GqlProject {
    items: GqlNodes<GqlItem>,
}

#[derive(Debug, Deserialize)]
struct GqlNodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct GqlItem {
    #[serde(rename = "fieldValueByName")]
    status: Option<GqlStatus>,
    content: Option<GqlContent>,
}

#[derive(Debug, Deserialize)]
struct GqlStatus {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GqlLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GqlThread {
    #[serde(rename = "isResolved")]
    is_resolved: bool,
}

#[derive(Debug, Deserialize)]
struct GqlContent {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    number: Option<u64>,
    labels: Option<GqlNodes<GqlLabel>>,
    state: Option<String>,
    #[serde(rename = "isDraft", default)]
    is_draft: bool,
    mergeable: Option<String>,
    #[serde(rename = "reviewThreads")]
    review_threads: Option<GqlNodes<GqlThread>>,
}

/// Decode the board query response.
///
/// Draft board cards (no number) are skipped.
///
/// # Errors
///
/// Returns `AppError::Source` on malformed JSON, GraphQL errors, or a
/// missing project.
pub fn parse_project_items(raw: &[u8]) -> Result<Vec<WorkItem>> {
    let response: GqlResponse = serde_json::from_slice(raw)
        .map_err(|err| AppError::Source(format!("invalid board response: {err}")))?;
    if let Some(first) = response.errors.first() {
        return Err(AppError::Source(format!("board query failed: {}", first.message)));
    }
    let project = response
        .data
        .and_then(|d| d.organization)
        .and_then(|o| o.project)
        .ok_or_else(|| AppError::Source("project not found".into()))?;

    let items = project
        .items
        .nodes
        .into_iter()
        .filter_map(|item| {
            let content = item.content?;
            let number = content.number?;
            let kind = match content.typename.as_deref() {
                Some("PullRequest") => ItemKind::PullRequest,
                Some("Issue") => ItemKind::Issue,
                _ => return None,
            };
            let labels = content
                .labels
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default();
            let unresolved = content.review_threads.map_or(0, |threads| {
                let open = threads.nodes.iter().filter(|t| !t.is_resolved).count();
                u32::try_from(open).unwrap_or(u32::MAX)
            });
            Some(WorkItem {
                kind,
                number,
                labels,
                status: item.status.and_then(|s| s.name),
                pr_state: content.state,
                mergeable: content.mergeable,
                is_draft: content.is_draft,
                unresolved_threads: unresolved,
            })
        })
        .collect();
    Ok(items)
}
