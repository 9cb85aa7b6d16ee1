//! Configuration management for xenigo.
//!
//! The configuration is a TOML file holding the user agent, optional OAuth
//! credentials, global polling options and the list of targets. It is read
//! once at startup; the first file found in [`Config::search_paths`] wins.

pub mod developer;
pub mod targets;

pub use developer::DeveloperFlags;
pub use targets::{Options, TargetConfig, TargetOptions};

use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::Credentials;
use crate::cache::{DEFAULT_CACHE_FILE, DEFAULT_PERSIST_INTERVAL_SECS};
use crate::domain::{AccessContext, Target};

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_STALE_AFTER_SECS: u64 = 86400;

const MASK: &str = "********";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl OAuthConfig {
    fn is_complete(&self) -> bool {
        [
            &self.client_id,
            &self.client_secret,
            &self.username,
            &self.password,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub persist_interval: u64,
    pub stale_after: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
            persist_interval: DEFAULT_PERSIST_INTERVAL_SECS,
            stale_after: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user_agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthConfig>,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub developer_flags: DeveloperFlags,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

impl Config {
    /// Locate, read and validate the configuration.
    ///
    /// Returns the configuration together with the path it was read from.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let candidates = Self::search_paths(explicit);
        let path = candidates
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or(ConfigError::NotFound {
                searched: candidates,
            })?;

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.clone(),
            source: e,
        })?;

        let config = Self::from_toml(&content, &path)?;
        Ok((config, path))
    }

    /// Parse and validate configuration text. `path` is only used in errors.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Candidate files in lookup order. An explicit path is the only candidate.
    pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        if let Some(path) = explicit {
            return vec![path.to_path_buf()];
        }

        let mut paths = vec![
            PathBuf::from(CONFIG_FILE),
            Path::new("config").join(CONFIG_FILE),
            Path::new("data").join(CONFIG_FILE),
        ];
        if let Ok(path) = Self::default_config_path() {
            paths.push(path);
        }
        paths
    }

    /// Get the per-user config file path: `~/.config/xenigo/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("xenigo").join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("user_agent is required".to_string()));
        }
        if HeaderValue::from_str(&self.user_agent).is_err() {
            return Err(ConfigError::Invalid(
                "user_agent contains characters not allowed in an HTTP header".to_string(),
            ));
        }

        if let Some(oauth) = &self.oauth {
            if !oauth.is_complete() {
                return Err(ConfigError::Invalid(
                    "oauth requires client_id, client_secret, username and password".to_string(),
                ));
            }
        }

        if self.targets.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one target must be configured".to_string(),
            ));
        }

        for (index, target) in self.targets.iter().enumerate() {
            if target.monitor.subreddit.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "target #{}: monitor.subreddit is required",
                    index + 1
                )));
            }
            if target.output.webhook_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "target {}: output.webhook_url is required",
                    target.display_name()
                )));
            }
            if !target.output.format.any() {
                return Err(ConfigError::Invalid(format!(
                    "target {}: every output.format option is disabled",
                    target.display_name()
                )));
            }
        }

        Ok(())
    }

    /// Targets with global options folded in.
    pub fn targets(&self) -> Vec<Target> {
        self.targets
            .iter()
            .map(|t| t.resolve(&self.options))
            .collect()
    }

    pub fn access_context(&self) -> AccessContext {
        if self.oauth.is_some() {
            AccessContext::Elevated
        } else {
            AccessContext::Standard
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.oauth.as_ref().map(|o| Credentials {
            client_id: o.client_id.clone(),
            client_secret: o.client_secret.clone(),
            username: o.username.clone(),
            password: o.password.clone(),
        })
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_secs(self.cache.persist_interval.max(1))
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.cache.stale_after)
    }

    /// Pretty JSON of the configuration, with secrets masked when `obfuscate`.
    pub fn to_log_json(&self, obfuscate: bool) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if obfuscate {
            mask_secrets(&mut value);
        }
        serde_json::to_string_pretty(&value)
    }

    /// Startup logging driven by the developer flags.
    pub fn log_startup(&self) {
        self.developer_flags.log_explicit();

        if self.developer_flags.send_full_config_to_log() {
            match self.to_log_json(self.developer_flags.obfuscate_config_secrets()) {
                Ok(json) => info!("Full configuration:\n{}", json),
                Err(e) => warn!(error = %e, "Failed to render configuration"),
            }
        }
    }

    /// Write the commented default configuration to `path`.
    ///
    /// Returns `false` without touching anything if the file already exists.
    pub fn write_default(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(true)
    }

    /// Generate the default config file content with comments.
    pub fn default_config_content() -> &'static str {
        r##"# xenigo configuration

# Sent with every request. Reddit asks for "<platform>:<app id>:<version> (by /u/<user>)".
user_agent = "linux:xenigo:0.1.0 (by /u/your_username)"

# Uncomment to read listings through the OAuth API instead of the public JSON
# endpoints. All four fields are required.
# [oauth]
# client_id = ""
# client_secret = ""
# username = ""
# password = ""

[options]
# Seconds between polls of each target
interval = 60
# Posts requested per poll
limit = 3
# Attempts per poll before giving up
retry_count = 3
# Seconds to wait between attempts
retry_interval = 2

[cache]
path = "cache.json"
# Seconds between cache flushes
persist_interval = 60
# A cache older than this is not trusted to announce missed posts on startup
stale_after = 86400

# [developer_flags]
# send_full_config_to_log = false
# obfuscate_config_secrets = true
# ignore_cache = false
# notify_mute = false
# force_send_initial = false

[[targets]]
name = "rust"

[targets.monitor]
subreddit = "rust"
# new, hot, top, rising, controversial or best
sorting = "new"

[targets.output]
# discord or slack
type = "discord"
webhook_url = "https://discord.com/api/webhooks/..."

[targets.output.format]
url = true
author = true
subreddit = true
discussion_url = true

# Per-target options override the global ones when non-zero.
# [targets.options]
# interval = 300
"##
    }
}

fn mask_secrets(value: &mut Value) {
    if let Some(oauth) = value.get_mut("oauth").and_then(Value::as_object_mut) {
        for key in ["client_id", "client_secret", "password"] {
            if let Some(field) = oauth.get_mut(key) {
                *field = Value::String(MASK.to_string());
            }
        }
        if let Some(field) = oauth.get_mut("username") {
            *field = Value::String(String::new());
        }
    }

    if let Some(targets) = value.get_mut("targets").and_then(Value::as_array_mut) {
        for target in targets {
            if let Some(url) = target.pointer_mut("/output/webhook_url") {
                *url = Value::String(MASK.to_string());
            }
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No configuration file found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
