//! Workflow trigger detection, argument extraction, and continuation prompts.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::session::Workflow;

static ISSUE_TO_IMPL_ARG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^/issue-to-impl\s+(\d+)").ok());
static REFINE_ARG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"--refine\s+(\d+)").ok());
static FROM_ISSUE_ARG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"--from-issue\s+(\d+)").ok());
static SYNC_MASTER_ARG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^/sync-master\s+(\d+)").ok());

/// Workflow started by `prompt`, matched by command prefix.
#[must_use]
pub fn detect_workflow(prompt: &str) -> Option<Workflow> {
    Workflow::TRIGGERABLE
        .into_iter()
        .find(|wf| wf.command().is_some_and(|cmd| prompt.starts_with(cmd)))
}

fn first_capture(re: &LazyLock<Option<Regex>>, prompt: &str) -> Option<u64> {
    re.as_ref()?
        .captures(prompt)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Issue number in `/issue-to-impl <n>`, `--refine <n>`, or `--from-issue <n>`.
#[must_use]
pub fn extract_issue_no(prompt: &str) -> Option<u64> {
    first_capture(&ISSUE_TO_IMPL_ARG, prompt)
        .or_else(|| first_capture(&REFINE_ARG, prompt))
        .or_else(|| first_capture(&FROM_ISSUE_ARG, prompt))
}

/// PR number in `/sync-master <n>`.
#[must_use]
pub fn extract_pr_no(prompt: &str) -> Option<u64> {
    first_capture(&SYNC_MASTER_ARG, prompt)
}

/// Values substituted into a continuation prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    /// Session being continued.
    pub session_id: &'a str,
    /// Session state file the agent edits to stop.
    pub state_file: &'a Path,
    /// Continuation number being granted (1-based).
    pub count: u32,
    /// Continuation budget.
    pub max_count: u32,
    /// PR the session works on, if known.
    pub pr_no: Option<u64>,
}

/// Render the continuation prompt for `workflow`; `None` when it has no template.
#[must_use]
pub fn continuation_prompt(workflow: Workflow, ctx: &PromptContext<'_>) -> Option<String> {
    let header = format!(
        "This is an auto-continuation prompt for handsoff mode, it is currently {}/{} continuations.",
        ctx.count, ctx.max_count
    );
    let fname = ctx.state_file.display();
    let stop_cmd = format!(
        "jq '.state = \"done\"' {fname} > {fname}.tmp && mv {fname}.tmp {fname}"
    );
    let sid = ctx.session_id;
    let handoff = format!(
        "The session ID: {sid} so that a human can `claude -r {sid}` for intervention."
    );

    let body = match workflow {
        Workflow::UltraPlanner => format!(
            "The ultimate goal of this workflow is to create a comprehensive plan and post it on GitHub Issue. Have you delivered this?
1. If not, please continue! Be as hands-off as possible: avoid asking design questions and choose the option you recommend most.
2. If you have already delivered the plan, manually stop further continuations.
3. If you do not know what to do next, or you reached the continuation limit without delivering the plan,
   look at the current branch name to find the issue you are working on, stop manually,
   and leave a comment on the GitHub Issue for human collaborators to take over, including:
    - What you have done so far
    - What is blocking you from moving forward
    - What kind of help you need
    - {handoff}
4. To stop further continuations, run:
   {stop_cmd}
5. When creating issues or PRs, use `--body-file` instead of `--body`; body text containing \"--something\" is misread as flags."
        ),
        Workflow::IssueToImpl => format!(
            "The ultimate goal of this workflow is to deliver a PR on GitHub that implements the corresponding issue. Has it been delivered?
1. If you completed a milestone but have more to do, continue with the next milestone.
2. When every coding task is done, prepare the PR:
   2.0 Rebase onto upstream or origin (priority: upstream/main > upstream/master > origin/main > origin/master).
   2.1 Run the full test suite following the project's test conventions.
   2.2 Review the code quality of the change.
   2.3 If the review raises concerns, fix them and return to 2.1.
   2.4 If the review is satisfactory, open the PR.
3. Create the PR without asking for confirmation.
4. Once the PR is created, manually stop further continuations.
5. If you do not know what to do next, or you reached the continuation limit without delivering the PR,
   stop manually, find the issue from the current branch name, and leave a comment for human collaborators, including:
    - What you have done so far
    - What is blocking you from moving forward
    - What kind of help you need
    - {handoff}
6. To stop further continuations, run:
   {stop_cmd}
7. When creating issues or PRs, use `--body-file` instead of `--body`; body text containing \"--something\" is misread as flags."
        ),
        Workflow::PlanToIssue => format!(
            "The ultimate goal of this workflow is to create a GitHub [plan] issue from the user-provided plan.
1. If the issue does not exist yet, keep working on it:
   - Parse and format the plan content
   - Create the issue with proper labels and formatting
   - Use `--body-file` instead of `--body`
2. Once the issue is created, manually stop further continuations.
3. If you are blocked or reached the continuation limit, stop manually and tell the user:
    - What you have done so far
    - What is blocking you
    - {handoff}
4. To stop further continuations, run:
   {stop_cmd}"
        ),
        Workflow::SetupViewboard => format!(
            "The ultimate goal of this workflow is to set up a GitHub Projects v2 board. Have you completed all steps?
1. If not, continue with the remaining setup steps.
2. Once setup is complete, manually stop further continuations.
3. To stop further continuations, run:
   {stop_cmd}"
        ),
        Workflow::SyncMaster => {
            let pr = ctx
                .pr_no
                .map_or_else(|| "unknown".to_owned(), |n| n.to_string());
            format!(
                "The ultimate goal of this workflow is to sync the local main/master branch with upstream and force-push the PR branch.
1. Check whether the rebase completed:
   - Run `git status` to verify the working tree
   - Resolve any conflicts and run `git rebase --continue`
   - If the rebase was aborted, restart the sync-master workflow
2. Confirm the PR number: {pr}
   - If it is 'unknown', derive it from the current branch
3. Force-push the rebased branch with `git push -f` and verify it succeeded.
4. After a successful push, manually stop further continuations.
5. On unresolvable conflicts or errors, stop manually and tell the user:
    - What you have done so far
    - What is blocking you
    - {handoff}
6. To stop further continuations, run:
   {stop_cmd}"
            )
        }
        Workflow::Unrecognized => return None,
    };

    Some(format!("{header}\n{body}"))
}
