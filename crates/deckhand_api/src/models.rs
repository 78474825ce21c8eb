//! Provider resource models.
//!
//! Every field the provider may omit is optional; rendering code substitutes
//! placeholders. Nothing here is cached: each value is a snapshot of a single
//! response.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// Fixed prefix of service identifiers.
pub const SERVICE_ID_PREFIX: &str = "srv-";

/// Fixed prefix of cron job identifiers.
pub const CRON_JOB_ID_PREFIX: &str = "crn-";

fn cron_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^crn-[a-z0-9]+$").expect("static regex"))
}

fn service_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\bsrv-[a-z0-9]+\b").expect("static regex"))
}

fn env_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("static regex"))
}

/// Identifier of a service (`srv-…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceId(String);

impl ServiceId {
    /// Validate a full identifier.
    pub fn parse(raw: &str) -> ApiResult<Self> {
        let trimmed = raw.trim();
        match service_id_pattern().find(trimmed) {
            Some(m) if m.start() == 0 && m.end() == trimmed.len() => {
                Ok(Self(trimmed.to_string()))
            }
            _ => Err(ApiError::InvalidServiceId(raw.to_string())),
        }
    }

    /// Find the first service identifier embedded in free text.
    pub fn find_in(text: &str) -> Option<Self> {
        service_id_pattern()
            .find(text)
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The provider has reported suspension both as a bool and as
/// `"suspended"` / `"not_suspended"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Suspension {
    Flag(bool),
    Text(String),
}

impl Suspension {
    pub fn is_suspended(&self) -> bool {
        match self {
            Self::Flag(flag) => *flag,
            Self::Text(text) => text == "suspended",
        }
    }
}

/// Environment specific build settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSpecificDetails {
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
}

/// Type specific details of a service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub num_instances: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub env: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub env_specific_details: Option<EnvSpecificDetails>,
}

impl ServiceDetails {
    pub fn build_command(&self) -> Option<&str> {
        self.env_specific_details
            .as_ref()
            .and_then(|d| d.build_command.as_deref())
            .or(self.build_command.as_deref())
    }

    pub fn start_command(&self) -> Option<&str> {
        self.env_specific_details
            .as_ref()
            .and_then(|d| d.start_command.as_deref())
            .or(self.start_command.as_deref())
    }
}

/// Build filter: paths that trigger auto-deploys and paths that never do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFilter {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub ignored_paths: Vec<String>,
}

impl BuildFilter {
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.ignored_paths.is_empty()
    }
}

/// A deployable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub service_type: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub suspended: Option<Suspension>,
    #[serde(default)]
    pub auto_deploy: Option<String>,
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub build_filter: Option<BuildFilter>,
    #[serde(default)]
    pub service_details: Option<ServiceDetails>,
}

impl Service {
    /// Name for buttons and headings, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.as_ref().is_some_and(Suspension::is_suspended)
    }
}

/// Deploy status as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeployStatus {
    Created,
    Live,
    BuildFailed,
    UpdateFailed,
    Building,
    Updating,
    Pending,
    Canceled,
    Deactivated,
    Other(String),
}

impl DeployStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Created => "created",
            Self::Live => "live",
            Self::BuildFailed => "build_failed",
            Self::UpdateFailed => "update_failed",
            Self::Building => "build_in_progress",
            Self::Updating => "update_in_progress",
            Self::Pending => "pending",
            Self::Canceled => "canceled",
            Self::Deactivated => "deactivated",
            Self::Other(s) => s,
        }
    }

    /// Terminal for cancellation purposes: nothing left to cancel.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Live | Self::BuildFailed | Self::Canceled)
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Live => "✅",
            Self::BuildFailed => "❌",
            Self::UpdateFailed => "⚠️",
            Self::Building => "🔨",
            Self::Updating => "⚡",
            Self::Pending | Self::Created => "⏳",
            Self::Canceled => "🚫",
            Self::Deactivated => "💤",
            Self::Other(_) => "❓",
        }
    }
}

impl From<String> for DeployStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => Self::Created,
            "live" => Self::Live,
            "build_failed" => Self::BuildFailed,
            "update_failed" => Self::UpdateFailed,
            "building" | "build_in_progress" => Self::Building,
            "updating" | "update_in_progress" => Self::Updating,
            "pending" => Self::Pending,
            "canceled" | "cancelled" => Self::Canceled,
            "deactivated" => Self::Deactivated,
            _ => Self::Other(value),
        }
    }
}

impl From<DeployStatus> for String {
    fn from(value: DeployStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commit a deploy was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A single build/release event of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deploy {
    pub id: String,
    #[serde(default = "unknown_status")]
    pub status: DeployStatus,
    #[serde(default)]
    pub commit: Option<Commit>,
    #[serde(default)]
    pub trigger: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
}

fn unknown_status() -> DeployStatus {
    DeployStatus::Other("unknown".to_string())
}

/// One environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Variable names start with a letter or `_` and contain only letters,
    /// digits, `_`, `.` and `-`.
    pub fn is_valid_key(key: &str) -> bool {
        env_key_pattern().is_match(key)
    }
}

/// Account owner (user or team) a service belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "type")]
    pub owner_type: Option<String>,
}

/// The user a key belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub last_run_at: Option<String>,
    #[serde(default)]
    pub next_run_at: Option<String>,
}

impl CronJob {
    /// Cron job ids look like `crn-` followed by lowercase letters and digits.
    pub fn is_valid_id(id: &str) -> bool {
        cron_id_pattern().is_match(id)
    }
}

/// Managed database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub database_type: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// One metered resource of the account. Amounts are numbers or strings
/// depending on the resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageItem {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub usage: Option<serde_json::Value>,
    #[serde(default)]
    pub limit: Option<serde_json::Value>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Page of logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPage {
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_service_id_parse() {
        assert_eq!(ServiceId::parse("srv-abc123").unwrap().as_str(), "srv-abc123");
        assert!(ServiceId::parse("crn-abc123").is_err());
        assert!(ServiceId::parse("srv-").is_err());
        assert!(ServiceId::parse("srv-abc 123").is_err());
    }

    #[test]
    fn test_env_key_names() {
        for key in ["FOO", "_x", "api.url", "NODE-ENV", "A1"] {
            assert!(EnvVar::is_valid_key(key), "{}", key);
        }
        for key in ["", ".", "..", "A/B", "FOO#x", "FOO?y", "1ABC", "has space", "%2e"] {
            assert!(!EnvVar::is_valid_key(key), "{}", key);
        }
    }

    #[test]
    fn test_cron_job_ids() {
        assert!(CronJob::is_valid_id("crn-abc123"));
        for id in ["", "crn-", "srv-abc123", "crn-abc/runs", "crn-ABC", "../crn-a"] {
            assert!(!CronJob::is_valid_id(id), "{}", id);
        }
    }

    #[test]
    fn test_usage_item_amounts() {
        let item: UsageItem = serde_json::from_value(json!({
            "type": "bandwidth",
            "usage": 1.5,
            "limit": "unlimited",
            "unit": "GB"
        }))
        .unwrap();
        assert_eq!(item.kind.as_deref(), Some("bandwidth"));
        assert_eq!(item.usage, Some(json!(1.5)));
        assert_eq!(item.limit, Some(json!("unlimited")));

        let sparse: Database = serde_json::from_value(json!({"id": "dpg-1"})).unwrap();
        assert!(sparse.database_type.is_none());
    }

    #[test]
    fn test_service_id_find_in_text() {
        let text = "✏️ Reply with the new name for srv-abc123.";
        assert_eq!(ServiceId::find_in(text).unwrap().as_str(), "srv-abc123");
        assert!(ServiceId::find_in("no id here").is_none());
    }

    #[test]
    fn test_service_deserialize_sparse() {
        let service: Service = serde_json::from_value(json!({
            "id": "srv-1",
            "name": "api",
            "suspended": "not_suspended",
            "serviceDetails": {
                "plan": "starter",
                "envSpecificDetails": {"buildCommand": "cargo build", "startCommand": "./api"}
            }
        }))
        .unwrap();

        assert!(!service.is_suspended());
        let details = service.service_details.unwrap();
        assert_eq!(details.build_command(), Some("cargo build"));
        assert_eq!(details.start_command(), Some("./api"));
        assert!(service.repo.is_none());
    }

    #[test]
    fn test_suspension_variants() {
        assert!(Suspension::Flag(true).is_suspended());
        assert!(Suspension::Text("suspended".into()).is_suspended());
        assert!(!Suspension::Text("not_suspended".into()).is_suspended());
    }

    #[test]
    fn test_deploy_status_terminal() {
        for status in ["live", "build_failed", "canceled"] {
            assert!(DeployStatus::from(status.to_string()).is_terminal(), "{status}");
        }
        for status in ["update_failed", "building", "updating", "pending", "build_in_progress"] {
            assert!(!DeployStatus::from(status.to_string()).is_terminal(), "{status}");
        }
        let odd = DeployStatus::from("pre_deploy_in_progress".to_string());
        assert_eq!(odd.as_str(), "pre_deploy_in_progress");
    }
}
