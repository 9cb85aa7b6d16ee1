use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETRY_COUNT: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 2;

/// Whether listings are read anonymously or through the OAuth API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessContext {
    Standard,
    Elevated,
}

impl fmt::Display for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessContext::Standard => write!(f, "standard"),
            AccessContext::Elevated => write!(f, "elevated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sorting {
    New,
    Hot,
    Top,
    Rising,
    Controversial,
    Best,
}

impl Sorting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sorting::New => "new",
            Sorting::Hot => "hot",
            Sorting::Top => "top",
            Sorting::Rising => "rising",
            Sorting::Controversial => "controversial",
            Sorting::Best => "best",
        }
    }
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Discord,
    Slack,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Discord => write!(f, "discord"),
            OutputType::Slack => write!(f, "slack"),
        }
    }
}

/// Which optional parts of a post end up in the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatFlags {
    pub url: bool,
    pub author: bool,
    pub subreddit: bool,
    pub discussion_url: bool,
}

impl Default for FormatFlags {
    fn default() -> Self {
        Self {
            url: true,
            author: true,
            subreddit: true,
            discussion_url: true,
        }
    }
}

impl FormatFlags {
    pub fn any(&self) -> bool {
        self.url || self.author || self.subreddit || self.discussion_url
    }
}

/// One fully resolved (subreddit, webhook) pairing. Immutable after load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    pub name: String,
    pub subreddit: String,
    pub sorting: Sorting,
    pub output: OutputType,
    pub webhook_url: String,
    pub format: FormatFlags,
    pub interval_secs: u64,
    pub limit: u32,
    pub retry_count: u32,
    pub retry_interval_secs: u64,
}

impl Target {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Attempts per fetch, falling back to the default when unset.
    pub fn attempts(&self) -> u32 {
        if self.retry_count == 0 {
            DEFAULT_RETRY_COUNT
        } else {
            self.retry_count
        }
    }

    pub fn retry_interval(&self) -> Duration {
        if self.retry_interval_secs == 0 {
            Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS)
        } else {
            Duration::from_secs(self.retry_interval_secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::target;

    #[test]
    fn test_retry_defaults_when_unset() {
        let mut t = target("rust");
        t.retry_count = 0;
        t.retry_interval_secs = 0;
        assert_eq!(t.attempts(), 3);
        assert_eq!(t.retry_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_settings_respected() {
        let mut t = target("rust");
        t.retry_count = 5;
        t.retry_interval_secs = 7;
        assert_eq!(t.attempts(), 5);
        assert_eq!(t.retry_interval(), Duration::from_secs(7));
    }

    #[test]
    fn test_format_flags_any() {
        assert!(FormatFlags::default().any());
        let none = FormatFlags {
            url: false,
            author: false,
            subreddit: false,
            discussion_url: false,
        };
        assert!(!none.any());
    }

    #[test]
    fn test_sorting_parses_lowercase() {
        let s: Sorting = serde_json::from_str("\"rising\"").unwrap();
        assert_eq!(s, Sorting::Rising);
        assert_eq!(s.to_string(), "rising");
        assert!(serde_json::from_str::<Sorting>("\"sideways\"").is_err());
    }
}
