use serde::{Deserialize, Serialize};
use tracing::info;

/// Switches meant for debugging a deployment. Unset flags take their
/// defaults; flags that were written in the file are logged at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeveloperFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_full_config_to_log: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfuscate_config_secrets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_mute: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_send_initial: Option<bool>,
}

impl DeveloperFlags {
    pub fn send_full_config_to_log(&self) -> bool {
        self.send_full_config_to_log.unwrap_or(false)
    }

    pub fn obfuscate_config_secrets(&self) -> bool {
        self.obfuscate_config_secrets.unwrap_or(true)
    }

    pub fn ignore_cache(&self) -> bool {
        self.ignore_cache.unwrap_or(false)
    }

    pub fn notify_mute(&self) -> bool {
        self.notify_mute.unwrap_or(false)
    }

    pub fn force_send_initial(&self) -> bool {
        self.force_send_initial.unwrap_or(false)
    }

    /// Flags present in the configuration file, by key.
    pub fn explicitly_set(&self) -> Vec<(&'static str, bool)> {
        [
            ("send_full_config_to_log", self.send_full_config_to_log),
            ("obfuscate_config_secrets", self.obfuscate_config_secrets),
            ("ignore_cache", self.ignore_cache),
            ("notify_mute", self.notify_mute),
            ("force_send_initial", self.force_send_initial),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    pub fn log_explicit(&self) {
        for (flag, value) in self.explicitly_set() {
            info!(flag, value, "Developer flag set");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let flags = DeveloperFlags::default();
        assert!(!flags.send_full_config_to_log());
        assert!(flags.obfuscate_config_secrets());
        assert!(!flags.ignore_cache());
        assert!(!flags.notify_mute());
        assert!(!flags.force_send_initial());
        assert!(flags.explicitly_set().is_empty());
    }

    #[test]
    fn test_explicit_flags_are_reported() {
        let flags: DeveloperFlags =
            toml::from_str("notify_mute = true\nobfuscate_config_secrets = false").unwrap();
        assert!(flags.notify_mute());
        assert!(!flags.obfuscate_config_secrets());
        assert_eq!(
            flags.explicitly_set(),
            vec![("obfuscate_config_secrets", false), ("notify_mute", true)]
        );
    }
}
