use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use facesync_transfer::PollPolicy;
use serde::Deserialize;

pub const SOURCE_KEY_ENV: &str = "FACESYNC_SOURCE_KEY";
pub const TARGET_KEY_ENV: &str = "FACESYNC_TARGET_KEY";

#[derive(Debug, Clone, Deserialize)]
struct FileConfig {
    source: SiteSection,
    target: SiteSection,
    #[serde(default)]
    transfer: TransferSection,
}

#[derive(Debug, Clone, Deserialize)]
struct SiteSection {
    endpoint: String,
    key: Option<String>,
    subscription_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct TransferSection {
    person_group_id: Option<String>,
    poll_interval_secs: u64,
    max_poll_attempts: u32,
    extra_apply_scope: Vec<String>,
}

impl Default for TransferSection {
    fn default() -> Self {
        Self {
            person_group_id: None,
            poll_interval_secs: 10,
            max_poll_attempts: 90,
            extra_apply_scope: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub endpoint: String,
    pub key: String,
    pub subscription_id: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: SiteConfig,
    pub target: SiteConfig,
    pub person_group_id: Option<String>,
    pub poll_policy: PollPolicy,
    pub extra_apply_scope: Vec<String>,
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let parsed: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("invalid config TOML at {}", path.display()))?;
        Self::from_file(parsed)
    }

    fn from_file(file: FileConfig) -> Result<Self> {
        let source = resolve_site(file.source, SOURCE_KEY_ENV)?;
        let target = resolve_site(file.target, TARGET_KEY_ENV)?;
        Ok(Self {
            source,
            target,
            person_group_id: file.transfer.person_group_id,
            poll_policy: PollPolicy::new(
                Duration::from_secs(file.transfer.poll_interval_secs),
                file.transfer.max_poll_attempts,
            ),
            extra_apply_scope: file.transfer.extra_apply_scope,
        })
    }
}

fn resolve_site(section: SiteSection, key_env: &str) -> Result<SiteConfig> {
    let key = match section.key {
        Some(key) if !key.is_empty() => key,
        _ => std::env::var(key_env)
            .with_context(|| format!("no key in config and {key_env} is not set"))?,
    };
    Ok(SiteConfig {
        endpoint: section.endpoint,
        key,
        subscription_id: section.subscription_id,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{FileConfig, RuntimeConfig};

    const SAMPLE: &str = r#"
[source]
endpoint = "https://eastus.api.example.com"
key = "source-key"
subscription_id = "sub-source"

[target]
endpoint = "https://westus2.api.example.com"
key = "target-key"
subscription_id = "sub-target"

[transfer]
person_group_id = "crew"
poll_interval_secs = 5
max_poll_attempts = 12
extra_apply_scope = ["sub-extra"]
"#;

    #[test]
    fn parses_a_full_config() {
        let parsed: FileConfig = toml::from_str(SAMPLE).unwrap();
        let config = RuntimeConfig::from_file(parsed).unwrap();

        assert_eq!(config.source.endpoint, "https://eastus.api.example.com");
        assert_eq!(config.source.key, "source-key");
        assert_eq!(config.target.subscription_id, "sub-target");
        assert_eq!(config.person_group_id.as_deref(), Some("crew"));
        assert_eq!(config.poll_policy.interval, Duration::from_secs(5));
        assert_eq!(config.poll_policy.max_attempts, 12);
        assert_eq!(config.extra_apply_scope, vec!["sub-extra".to_string()]);
    }

    #[test]
    fn transfer_section_is_optional_with_defaults() {
        let minimal = r#"
[source]
endpoint = "https://eastus.api.example.com"
key = "source-key"
subscription_id = "sub-source"

[target]
endpoint = "https://westus2.api.example.com"
key = "target-key"
subscription_id = "sub-target"
"#;
        let parsed: FileConfig = toml::from_str(minimal).unwrap();
        let config = RuntimeConfig::from_file(parsed).unwrap();

        assert!(config.person_group_id.is_none());
        assert_eq!(config.poll_policy.interval, Duration::from_secs(10));
        assert_eq!(config.poll_policy.max_attempts, 90);
        assert!(config.extra_apply_scope.is_empty());
    }
}
