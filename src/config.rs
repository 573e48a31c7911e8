//! Runtime configuration parsing, precedence resolution, and loader strategies.
//!
//! Settings come from `.agentize.local.toml` (found by walking up from the
//! working directory), environment variables, and CLI flags, with
//! precedence CLI > env > file > default. The resolved [`FleetConfig`] is
//! immutable; callers obtain snapshots from a [`ConfigLoader`]:
//!
//! - [`FreshConfigLoader`] re-reads on every call (the poller reloads once per cycle).
//! - [`MemoizedConfigLoader`] caches the first successful load for the life
//!   of the process (each hook invocation is short-lived).
//!
//! The hook loads with [`ConfigScope::Handsoff`] so poller settings never
//! reach it.

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::work_item::Category;
use crate::persistence::StorePaths;
use crate::{AppError, Result};

/// File name searched for from the working directory upwards.
pub const CONFIG_FILE_NAME: &str = ".agentize.local.toml";

/// Keychain service used for the Telegram bot token.
const KEYRING_SERVICE: &str = "agentize";

/// Environment variable names recognized as overrides.
pub mod env_keys {
    /// Base directory of the state store.
    pub const HOME: &str = "AGENTIZE_HOME";
    /// Hands-off automation switch.
    pub const HANDSOFF_MODE: &str = "HANDSOFF_MODE";
    /// Continuation budget per session.
    pub const MAX_CONTINUATIONS: &str = "HANDSOFF_MAX_CONTINUATIONS";
    /// Hook decision logging switch.
    pub const DEBUG: &str = "HANDSOFF_DEBUG";
    /// Worker pool size; `0` disables slot bookkeeping.
    pub const NUM_WORKERS: &str = "AGENTIZE_NUM_WORKERS";
    /// Poll period (`5m`, `300s`).
    pub const PERIOD: &str = "AGENTIZE_PERIOD";
    /// Telegram bot token.
    pub const TG_TOKEN: &str = "TG_API_TOKEN";
    /// Telegram chat id.
    pub const TG_CHAT_ID: &str = "TG_CHAT_ID";
}

fn default_max_continuations() -> u32 {
    10
}

fn default_period() -> String {
    "5m".into()
}

/// Poll period used when nothing overrides it.
pub const DEFAULT_PERIOD: Duration = Duration::from_mins(5);

fn default_shell() -> String {
    "bash".into()
}

fn default_impl_command() -> String {
    "wt spawn {number} --headless".into()
}

fn default_refine_command() -> String {
    "wt spawn {number} --headless --refine".into()
}

fn default_dev_req_command() -> String {
    "wt spawn {number} --headless --dev-req".into()
}

fn default_rebase_command() -> String {
    "wt rebase {number} --headless".into()
}

fn default_resolve_review_command() -> String {
    "wt spawn {number} --headless --resolve-review".into()
}

#[allow(clippy::unnecessary_wraps)] // serde default must match the field type.
fn default_impl_exists() -> Option<String> {
    Some("wt pathto {number}".into())
}

/// `[handsoff]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandsoffSection {
    /// Whether hands-off continuation is on.
    pub enabled: Option<bool>,
    /// Continuation budget per session.
    pub max_continuations: Option<u32>,
    /// Append hook decisions to the JSONL decision log.
    pub debug: Option<bool>,
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Poll period such as `5m` or `300s`.
    pub period: Option<String>,
    /// Worker pool size; `0` dispatches without slot bookkeeping.
    pub num_workers: Option<usize>,
    /// `owner/repo` used to build issue and PR links.
    pub repo_slug: Option<String>,
}

/// `[project]` section naming the GitHub Projects v2 board.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProjectRef {
    /// Organization login that owns the board.
    pub org: String,
    /// Board number.
    pub id: u32,
}

/// `[telegram]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TelegramSection {
    /// Bot API token.
    pub token: Option<String>,
    /// Destination chat id (string or integer in TOML).
    #[serde(default, deserialize_with = "string_or_int")]
    pub chat_id: Option<String>,
}

/// `[spawner]` section: shell command templates per dispatch category.
///
/// `{number}` is replaced with the issue or PR number.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpawnerConfig {
    /// Shell used to run templates with `-c`.
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Implementation dispatch.
    #[serde(rename = "impl", default = "default_impl_command")]
    pub implement: String,
    /// Plan refinement dispatch.
    #[serde(default = "default_refine_command")]
    pub refine: String,
    /// Feature-request planning dispatch.
    #[serde(default = "default_dev_req_command")]
    pub dev_req: String,
    /// Conflict rebase dispatch.
    #[serde(default = "default_rebase_command")]
    pub rebase: String,
    /// Review-thread resolution dispatch.
    #[serde(default = "default_resolve_review_command")]
    pub resolve_review: String,
    /// Succeeds when an implementation worktree already exists.
    #[serde(default = "default_impl_exists")]
    pub impl_exists: Option<String>,
    /// Existence check for refinement work.
    #[serde(default)]
    pub refine_exists: Option<String>,
    /// Existence check for feature-request planning.
    #[serde(default)]
    pub dev_req_exists: Option<String>,
    /// Existence check for rebases.
    #[serde(default)]
    pub rebase_exists: Option<String>,
    /// Existence check for review resolution.
    #[serde(default)]
    pub resolve_review_exists: Option<String>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            implement: default_impl_command(),
            refine: default_refine_command(),
            dev_req: default_dev_req_command(),
            rebase: default_rebase_command(),
            resolve_review: default_resolve_review_command(),
            impl_exists: default_impl_exists(),
            refine_exists: None,
            dev_req_exists: None,
            rebase_exists: None,
            resolve_review_exists: None,
        }
    }
}

impl SpawnerConfig {
    /// Dispatch template for `category`.
    #[must_use]
    pub fn command_for(&self, category: Category) -> &str {
        match category {
            Category::Implement => &self.implement,
            Category::Refine => &self.refine,
            Category::DevRequest => &self.dev_req,
            Category::Rebase => &self.rebase,
            Category::ResolveReview => &self.resolve_review,
        }
    }

    /// Duplicate-detection template for `category`, if it has one.
    #[must_use]
    pub fn exists_for(&self, category: Category) -> Option<&str> {
        match category {
            Category::Implement => self.impl_exists.as_deref(),
            Category::Refine => self.refine_exists.as_deref(),
            Category::DevRequest => self.dev_req_exists.as_deref(),
            Category::Rebase => self.rebase_exists.as_deref(),
            Category::ResolveReview => self.resolve_review_exists.as_deref(),
        }
    }
}

/// `[workflows.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WorkflowModelSection {
    /// Model name passed to the spawned agent.
    pub model: Option<String>,
}

/// Raw `.agentize.local.toml` document. Unknown top-level keys are rejected.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LocalConfigFile {
    /// Hands-off settings.
    #[serde(default)]
    pub handsoff: HandsoffSection,
    /// Poller settings.
    #[serde(default)]
    pub server: ServerSection,
    /// Project board.
    #[serde(default)]
    pub project: Option<ProjectRef>,
    /// Telegram credentials.
    #[serde(default)]
    pub telegram: TelegramSection,
    /// Spawn command templates.
    #[serde(default)]
    pub spawner: SpawnerConfig,
    /// Per-workflow model assignment.
    #[serde(default)]
    pub workflows: BTreeMap<String, WorkflowModelSection>,
}

impl LocalConfigFile {
    /// Parse a config document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on invalid TOML or unknown keys.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or parsed.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|err| {
            AppError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

/// The `[handsoff]` table of a config document; every other table is
/// ignored, so only hands-off keys can make it fail.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct HandsoffDocument {
    /// Hands-off settings.
    #[serde(default)]
    pub handsoff: HandsoffSection,
}

impl HandsoffDocument {
    /// Parse the hands-off part of a config document.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` on invalid TOML or unknown `[handsoff]` keys.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

/// Model names accepted in `[workflows.*]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentModel {
    /// Largest model.
    Opus,
    /// Balanced model.
    Sonnet,
    /// Fastest model.
    Haiku,
}

impl AgentModel {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "opus" => Some(Self::Opus),
            "sonnet" => Some(Self::Sonnet),
            "haiku" => Some(Self::Haiku),
            _ => None,
        }
    }

    /// Name passed as `--model`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opus => "opus",
            Self::Sonnet => "sonnet",
            Self::Haiku => "haiku",
        }
    }
}

/// Resolved hands-off settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandsoffConfig {
    /// Whether hands-off continuation is on.
    pub enabled: bool,
    /// Continuation budget per session.
    pub max_continuations: u32,
    /// Whether hook decisions are appended to the decision log.
    pub debug: bool,
}

/// Resolved poller settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Sleep between cycles.
    pub period: Duration,
    /// Worker pool size; `0` means unbounded dispatch.
    pub num_workers: usize,
    /// `owner/repo` for links.
    pub repo_slug: Option<String>,
    /// Project board to poll.
    pub project: Option<ProjectRef>,
}

/// Telegram credentials; present only when both token and chat id are known.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    /// Bot API token.
    pub token: String,
    /// Destination chat id.
    pub chat_id: String,
}

impl Debug for TelegramCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Immutable configuration snapshot shared by the hook and the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetConfig {
    /// State store root.
    pub base_dir: PathBuf,
    /// Hands-off settings.
    pub handsoff: HandsoffConfig,
    /// Poller settings.
    pub server: ServerConfig,
    /// Notification credentials.
    pub telegram: Option<TelegramCredentials>,
    /// Spawn command templates.
    pub spawner: SpawnerConfig,
    /// Model per dispatch category.
    pub models: BTreeMap<Category, AgentModel>,
}

/// Values supplied on the command line; these win over everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--period`.
    pub period: Option<String>,
    /// `--num-workers`.
    pub num_workers: Option<usize>,
}

/// Environment lookup used during resolution; swappable in tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the process environment.
#[must_use]
pub fn process_env() -> EnvLookup {
    Arc::new(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

/// Return the first value present, in CLI > env > config > default order.
#[must_use]
pub fn resolve_precedence<T>(cli: Option<T>, env: Option<T>, config: Option<T>, default: T) -> T {
    cli.or(env).or(config).unwrap_or(default)
}

/// Parse a poll period such as `5m` or `300s`.
///
/// # Errors
///
/// Returns `AppError::Config` for any other shape or a zero period.
pub fn parse_period(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || AppError::Config(format!("invalid period `{raw}`; use Nm or Ns"));

    let (digits, scale) = if let Some(d) = raw.strip_suffix('m') {
        (d, 60)
    } else if let Some(d) = raw.strip_suffix('s') {
        (d, 1)
    } else {
        return Err(invalid());
    };

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    if value == 0 {
        return Err(AppError::Config("period must be greater than zero".into()));
    }
    let secs = value.checked_mul(scale).ok_or_else(invalid)?;
    Ok(Duration::from_secs(secs))
}

/// Interpret `HANDSOFF_MODE`: `0`, `false`, `off`, `disable` turn automation
/// off; any other value turns it on.
#[must_use]
pub fn handsoff_mode_enabled(raw: &str) -> bool {
    !matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "off" | "disable"
    )
}

fn parse_bool(key: &str, raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" | "enable" => Some(true),
        "0" | "false" | "off" | "no" | "disable" => Some(false),
        _ => {
            warn!(key, value = raw, "ignoring unrecognized boolean");
            None
        }
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    if let Ok(value) = raw.trim().parse() {
        Some(value)
    } else {
        warn!(key, value = raw, "ignoring non-numeric environment override");
        None
    }
}

fn resolve_base_dir(env: &EnvLookup) -> PathBuf {
    env(env_keys::HOME).map_or_else(|| PathBuf::from("."), PathBuf::from)
}

fn resolve_handsoff(section: &HandsoffSection, env: &EnvLookup) -> HandsoffConfig {
    HandsoffConfig {
        enabled: resolve_precedence(
            None,
            env(env_keys::HANDSOFF_MODE).map(|v| handsoff_mode_enabled(&v)),
            section.enabled,
            false,
        ),
        max_continuations: resolve_precedence(
            None,
            parse_env_number(env_keys::MAX_CONTINUATIONS, env(env_keys::MAX_CONTINUATIONS)),
            section.max_continuations,
            default_max_continuations(),
        ),
        debug: resolve_precedence(
            None,
            env(env_keys::DEBUG).and_then(|v| parse_bool(env_keys::DEBUG, &v)),
            section.debug,
            false,
        ),
    }
}

impl FleetConfig {
    /// Resolve a parsed file plus environment and CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the period is invalid.
    pub fn resolve(file: LocalConfigFile, cli: &CliOverrides, env: &EnvLookup) -> Result<Self> {
        let base_dir = resolve_base_dir(env);
        let handsoff = resolve_handsoff(&file.handsoff, env);

        let period_raw = resolve_precedence(
            cli.period.clone(),
            env(env_keys::PERIOD),
            file.server.period.clone(),
            default_period(),
        );
        let num_workers = resolve_precedence(
            cli.num_workers,
            parse_env_number(env_keys::NUM_WORKERS, env(env_keys::NUM_WORKERS)),
            file.server.num_workers,
            0,
        );

        let token = env(env_keys::TG_TOKEN).or(file.telegram.token);
        let chat_id = env(env_keys::TG_CHAT_ID).or(file.telegram.chat_id);
        let telegram = match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(TelegramCredentials { token, chat_id })
            }
            _ => None,
        };

        Ok(Self {
            base_dir,
            handsoff,
            server: ServerConfig {
                period: parse_period(&period_raw)?,
                num_workers,
                repo_slug: file.server.repo_slug,
                project: file.project,
            },
            telegram,
            spawner: file.spawner,
            models: extract_workflow_models(&file.workflows),
        })
    }

    /// Defaults with environment overrides only (no config file).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if an environment override is invalid.
    pub fn from_env(env: &EnvLookup) -> Result<Self> {
        Self::resolve(LocalConfigFile::default(), &CliOverrides::default(), env)
    }

    /// Resolve only the `[handsoff]` settings and the store location.
    ///
    /// Poller, Telegram, and spawner settings keep their defaults, so a bad
    /// server value can never switch the continuation hook off.
    #[must_use]
    pub fn handsoff_only(section: &HandsoffSection, env: &EnvLookup) -> Self {
        Self {
            base_dir: resolve_base_dir(env),
            handsoff: resolve_handsoff(section, env),
            server: ServerConfig {
                period: DEFAULT_PERIOD,
                num_workers: 0,
                repo_slug: None,
                project: None,
            },
            telegram: None,
            spawner: SpawnerConfig::default(),
            models: BTreeMap::new(),
        }
    }

    /// State store layout for this configuration.
    #[must_use]
    pub fn store_paths(&self) -> StorePaths {
        StorePaths::new(self.base_dir.clone())
    }

    /// Web link for an issue, when a repo slug is configured.
    #[must_use]
    pub fn issue_url(&self, issue_no: u64) -> Option<String> {
        self.server
            .repo_slug
            .as_ref()
            .map(|slug| format!("https://github.com/{slug}/issues/{issue_no}"))
    }

    /// Web link for a pull request, when a repo slug is configured.
    #[must_use]
    pub fn pr_url(&self, pr_no: u64) -> Option<String> {
        self.server
            .repo_slug
            .as_ref()
            .map(|slug| format!("https://github.com/{slug}/pull/{pr_no}"))
    }
}

/// Map `[workflows.*]` entries onto dispatch categories, skipping unknown
/// workflow names and models with a warning.
#[must_use]
pub fn extract_workflow_models(
    workflows: &BTreeMap<String, WorkflowModelSection>,
) -> BTreeMap<Category, AgentModel> {
    let mut models = BTreeMap::new();
    for (name, section) in workflows {
        let category = match name.as_str() {
            "impl" => Category::Implement,
            "refine" => Category::Refine,
            "dev_req" => Category::DevRequest,
            "rebase" => Category::Rebase,
            other => {
                warn!(workflow = other, "ignoring unknown workflow in [workflows]");
                continue;
            }
        };
        let Some(raw) = section.model.as_deref() else {
            continue;
        };
        if let Some(model) = AgentModel::parse(raw) {
            models.insert(category, model);
        } else {
            warn!(workflow = name, model = raw, "ignoring unknown model");
        }
    }
    models
}

/// Find `.agentize.local.toml` in `start` or any ancestor.
#[must_use]
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Source of configuration snapshots.
pub trait ConfigLoader: Send + Sync {
    /// Produce the current configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the configuration cannot be loaded.
    fn load(&self) -> Result<Arc<FleetConfig>>;
}

/// Which settings a loader resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigScope {
    /// Every section; invalid values anywhere fail the load.
    #[default]
    Full,
    /// `[handsoff]` and the store location only; everything else keeps
    /// its default.
    Handsoff,
}

/// Re-reads file, environment, and keychain on every call.
pub struct FreshConfigLoader {
    start_dir: PathBuf,
    explicit_path: Option<PathBuf>,
    cli: CliOverrides,
    env: EnvLookup,
    use_keychain: bool,
    scope: ConfigScope,
}

impl FreshConfigLoader {
    /// Loader that searches upward from `start_dir` using the process environment.
    #[must_use]
    pub fn new(start_dir: impl Into<PathBuf>) -> Self {
        Self {
            start_dir: start_dir.into(),
            explicit_path: None,
            cli: CliOverrides::default(),
            env: process_env(),
            use_keychain: false,
            scope: ConfigScope::Full,
        }
    }

    /// Read this exact file instead of searching.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit_path = Some(path.into());
        self
    }

    /// Apply command-line overrides on every load.
    #[must_use]
    pub fn with_cli(mut self, cli: CliOverrides) -> Self {
        self.cli = cli;
        self
    }

    /// Replace the environment lookup.
    #[must_use]
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Fall back to the OS keychain for the Telegram token.
    #[must_use]
    pub fn with_keychain(mut self, enabled: bool) -> Self {
        self.use_keychain = enabled;
        self
    }

    /// Restrict which settings are resolved.
    #[must_use]
    pub fn with_scope(mut self, scope: ConfigScope) -> Self {
        self.scope = scope;
        self
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.explicit_path
            .clone()
            .or_else(|| find_config_file(&self.start_dir))
    }

    fn read_file(&self) -> Result<LocalConfigFile> {
        match self.config_path() {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                LocalConfigFile::load_from_path(&path)
            }
            None => Ok(LocalConfigFile::default()),
        }
    }

    fn load_handsoff(&self) -> Result<FleetConfig> {
        let section = match self.config_path() {
            Some(path) => {
                debug!(path = %path.display(), "loading hands-off settings");
                let raw = fs::read_to_string(&path).map_err(|err| {
                    AppError::Config(format!("failed to read {}: {err}", path.display()))
                })?;
                HandsoffDocument::from_toml_str(&raw)?.handsoff
            }
            None => HandsoffSection::default(),
        };
        Ok(FleetConfig::handsoff_only(&section, &self.env))
    }
}

impl ConfigLoader for FreshConfigLoader {
    fn load(&self) -> Result<Arc<FleetConfig>> {
        if self.scope == ConfigScope::Handsoff {
            return self.load_handsoff().map(Arc::new);
        }
        let mut file = self.read_file()?;
        if self.use_keychain
            && file.telegram.token.is_none()
            && (self.env)(env_keys::TG_TOKEN).is_none()
        {
            file.telegram.token = load_keychain_token("telegram_token");
        }
        FleetConfig::resolve(file, &self.cli, &self.env).map(Arc::new)
    }
}

/// Caches the first successful load for the remainder of the process.
pub struct MemoizedConfigLoader {
    inner: FreshConfigLoader,
    cached: OnceLock<Arc<FleetConfig>>,
}

impl MemoizedConfigLoader {
    /// Wrap `inner`.
    #[must_use]
    pub fn new(inner: FreshConfigLoader) -> Self {
        Self {
            inner,
            cached: OnceLock::new(),
        }
    }
}

impl ConfigLoader for MemoizedConfigLoader {
    fn load(&self) -> Result<Arc<FleetConfig>> {
        if let Some(config) = self.cached.get() {
            return Ok(Arc::clone(config));
        }
        let config = self.inner.load()?;
        Ok(Arc::clone(self.cached.get_or_init(|| config)))
    }
}

/// Always returns the same snapshot.
pub struct StaticConfigLoader(pub Arc<FleetConfig>);

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Arc<FleetConfig>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Look up a secret in the OS keychain; any failure yields `None`.
fn load_keychain_token(key: &str) -> Option<String> {
    match keyring::Entry::new(KEYRING_SERVICE, key).and_then(|entry| entry.get_password()) {
        Ok(value) if !value.is_empty() => Some(value),
        Ok(_) => {
            debug!(key, "keychain entry is empty");
            None
        }
        Err(err) => {
            debug!(key, ?err, "keychain lookup failed");
            None
        }
    }
}

fn string_or_int<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    }))
}
