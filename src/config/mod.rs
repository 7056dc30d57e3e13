use serde::Deserialize;

use crate::storage::keys;

/// Complete mudstone configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MudConfig {
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Backing-store connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Coordination channel name; every process sharing the store must agree
    #[serde(default = "default_isc_channel")]
    pub isc_channel: String,
}

fn default_redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn default_isc_channel() -> String {
    keys::ISC_CHANNEL.to_string()
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            isc_channel: default_isc_channel(),
        }
    }
}

/// Object-cache reconciliation sweep configuration.
///
/// The sweep bounds staleness when an invalidation broadcast is missed:
/// entries older than `max_entry_age_seconds` are evicted and reloaded on
/// next use.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_sweep_enabled")]
    pub sweep_enabled: bool,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    #[serde(default = "default_max_entry_age")]
    pub max_entry_age_seconds: u64,
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_max_entry_age() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: default_sweep_enabled(),
            sweep_interval_seconds: default_sweep_interval(),
            max_entry_age_seconds: default_max_entry_age(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<MudConfig, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)?;
    let config: MudConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = MudConfig::default();
        assert_eq!(config.redis.isc_channel, "c:isc");
        assert!(config.cache.sweep_enabled);
        assert_eq!(config.cache.sweep_interval_seconds, 60);
        assert_eq!(config.cache.max_entry_age_seconds, 300);
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [redis]
            url = "redis://example.com:6379"
            isc_channel = "c:isc-test"

            [cache]
            sweep_enabled = false
            sweep_interval_seconds = 10
            max_entry_age_seconds = 120
        "#;

        let config: MudConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.redis.url, "redis://example.com:6379");
        assert_eq!(config.redis.isc_channel, "c:isc-test");
        assert!(!config.cache.sweep_enabled);
        assert_eq!(config.cache.sweep_interval_seconds, 10);
        assert_eq!(config.cache.max_entry_age_seconds, 120);
    }

    #[test]
    fn test_partial_config() {
        // Missing sections use defaults
        let toml = r#"
            [cache]
            sweep_interval_seconds = 15
        "#;

        let config: MudConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.sweep_interval_seconds, 15);
        assert_eq!(config.cache.max_entry_age_seconds, 300); // Default
        assert_eq!(config.redis.isc_channel, "c:isc"); // Default
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[redis]\nurl = \"redis://filetest:6379\"\n\n[cache]\nsweep_enabled = false"
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.redis.url, "redis://filetest:6379");
        assert!(!config.cache.sweep_enabled);
    }
}
