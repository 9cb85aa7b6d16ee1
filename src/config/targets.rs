use serde::{Deserialize, Serialize};

use crate::domain::{FormatFlags, OutputType, Sorting, Target};

pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_LIMIT: u32 = 3;

/// Global polling options; every target inherits these unless it overrides them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub interval: u64,
    pub limit: u32,
    pub retry_count: u32,
    pub retry_interval: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SECS,
            limit: DEFAULT_LIMIT,
            retry_count: crate::domain::target::DEFAULT_RETRY_COUNT,
            retry_interval: crate::domain::target::DEFAULT_RETRY_INTERVAL_SECS,
        }
    }
}

/// Per-target overrides. Zero means "inherit".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetOptions {
    pub interval: u64,
    pub limit: u32,
    pub retry_count: u32,
    pub retry_interval: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub subreddit: String,
    pub sorting: Sorting,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "type")]
    pub kind: OutputType,
    #[serde(default)]
    pub webhook_url: String,
    #[serde(default)]
    pub format: FormatFlags,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub name: String,
    pub monitor: MonitorConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub options: TargetOptions,
}

fn pick<T: Copy + PartialEq + Default>(own: T, global: T) -> T {
    if own == T::default() {
        global
    } else {
        own
    }
}

impl TargetConfig {
    /// The name used in logs; falls back to the subreddit.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.monitor.subreddit
        } else {
            &self.name
        }
    }

    pub fn resolve(&self, global: &Options) -> Target {
        Target {
            name: self.display_name().to_string(),
            subreddit: self.monitor.subreddit.trim().to_string(),
            sorting: self.monitor.sorting,
            output: self.output.kind,
            webhook_url: self.output.webhook_url.trim().to_string(),
            format: self.output.format,
            interval_secs: pick(self.options.interval, global.interval),
            limit: pick(self.options.limit, global.limit),
            retry_count: pick(self.options.retry_count, global.retry_count),
            retry_interval_secs: pick(self.options.retry_interval, global.retry_interval),
        }
    }
}
