//! Bot configuration.
//!
//! Values come from an optional YAML file and from flags or environment
//! variables. Flags and environment win over the file.

use std::path::{Path, PathBuf};

use deckhand_api::{ApiConfig, DEFAULT_BASE_URL};
use deckhand_chat::{SessionSettings, UserId, DEFAULT_PENDING_TTL_SECS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default port of the liveness endpoint.
pub const DEFAULT_PORT: u16 = 8080;

/// Default long-poll timeout for `getUpdates`, in seconds.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Default timeout for provider calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Missing bot token: set BOT_TOKEN, --bot-token or bot_token in the config file")]
    MissingBotToken,

    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings as written in the YAML file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bot_token: Option<String>,
    pub api_base: Option<String>,
    pub port: Option<u16>,
    pub allowed_users: Vec<i64>,
    pub pending_ttl_secs: Option<u64>,
    pub token_ttl_secs: Option<u64>,
    pub http_timeout_secs: Option<u64>,
    pub poll_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay `other` on top of `self`: values set in `other` win.
    pub fn merge(self, other: FileConfig) -> Self {
        Self {
            bot_token: other.bot_token.or(self.bot_token),
            api_base: other.api_base.or(self.api_base),
            port: other.port.or(self.port),
            allowed_users: if other.allowed_users.is_empty() {
                self.allowed_users
            } else {
                other.allowed_users
            },
            pending_ttl_secs: other.pending_ttl_secs.or(self.pending_ttl_secs),
            token_ttl_secs: other.token_ttl_secs.or(self.token_ttl_secs),
            http_timeout_secs: other.http_timeout_secs.or(self.http_timeout_secs),
            poll_timeout_secs: other.poll_timeout_secs.or(self.poll_timeout_secs),
        }
    }
}

/// Fully resolved configuration of a running bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub api: ApiConfig,
    pub port: u16,
    pub allowed_users: Vec<UserId>,
    pub sessions: SessionSettings,
    pub poll_timeout_secs: u64,
}

impl BotConfig {
    /// Resolve the file (if any) with the command line overrides.
    pub fn resolve(file: Option<&Path>, overrides: FileConfig) -> Result<Self, ConfigError> {
        let base = match file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::from_file_config(base.merge(overrides))
    }

    pub fn from_file_config(config: FileConfig) -> Result<Self, ConfigError> {
        let bot_token = config
            .bot_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingBotToken)?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "api_base",
                reason: format!("'{}' is not an http(s) URL", api_base),
            });
        }

        let poll_timeout_secs = config
            .poll_timeout_secs
            .unwrap_or(DEFAULT_POLL_TIMEOUT_SECS);
        if poll_timeout_secs == 0 || poll_timeout_secs > 50 {
            return Err(ConfigError::Invalid {
                field: "poll_timeout_secs",
                reason: "must be between 1 and 50".to_string(),
            });
        }

        let api = ApiConfig::new(api_base).timeout_secs(
            config
                .http_timeout_secs
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        Ok(Self {
            bot_token,
            api,
            port: config.port.unwrap_or(DEFAULT_PORT),
            allowed_users: config.allowed_users.into_iter().map(UserId).collect(),
            sessions: SessionSettings {
                pending_ttl_secs: config.pending_ttl_secs.unwrap_or(DEFAULT_PENDING_TTL_SECS),
                token_ttl_secs: config.token_ttl_secs.filter(|secs| *secs > 0),
            },
            poll_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn token_only() -> FileConfig {
        FileConfig {
            bot_token: Some("123:abc".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::from_file_config(token_only()).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.sessions.pending_ttl_secs, DEFAULT_PENDING_TTL_SECS);
        assert_eq!(config.sessions.token_ttl_secs, None);
        assert!(config.allowed_users.is_empty());
    }

    #[test]
    fn test_missing_token() {
        let err = BotConfig::from_file_config(FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingBotToken));

        let blank = FileConfig {
            bot_token: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(BotConfig::from_file_config(blank).is_err());
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "bot_token: from-file\nport: 9000\nallowed_users: [1, 2]\npending_ttl_secs: 120"
        )
        .unwrap();

        let overrides = FileConfig {
            port: Some(9100),
            token_ttl_secs: Some(3600),
            ..Default::default()
        };
        let config = BotConfig::resolve(Some(file.path()), overrides).unwrap();
        assert_eq!(config.bot_token, "from-file");
        assert_eq!(config.port, 9100);
        assert_eq!(config.allowed_users, vec![UserId(1), UserId(2)]);
        assert_eq!(config.sessions.pending_ttl_secs, 120);
        assert_eq!(config.sessions.token_ttl_secs, Some(3600));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bot_tokn: typo").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_values() {
        let bad_url = FileConfig {
            api_base: Some("api.render.com".to_string()),
            ..token_only()
        };
        assert!(matches!(
            BotConfig::from_file_config(bad_url),
            Err(ConfigError::Invalid { field: "api_base", .. })
        ));

        let bad_poll = FileConfig {
            poll_timeout_secs: Some(0),
            ..token_only()
        };
        assert!(BotConfig::from_file_config(bad_poll).is_err());
    }
}
