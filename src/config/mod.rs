//
//  aem-cli
//  config/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Configuration Module
//!
//! Loading, saving and querying the CLI configuration.
//!
//! ## Overview
//!
//! - **Core settings**: HTTPS enforcement and request timeout
//! - **Cache settings**: response cache toggle, TTL and capacity
//! - **Bulk settings**: worker pool size, batch size and pacing
//! - **Poll settings**: status poll interval and overall timeout
//! - **Environments**: named AEM instances with their address and credentials
//!
//! ## Example Configuration File
//!
//! ```toml
//! active_environment = "dev"
//!
//! [core]
//! enforce_https = false
//! request_timeout_ms = 30000
//!
//! [cache]
//! enabled = true
//! ttl_seconds = 300
//! max_entries = 500
//!
//! [environments.dev]
//! url = "http://localhost:4502"
//! basic_auth = "YWRtaW46YWRtaW4="
//!
//! [environments.prod]
//! url = "https://author-p1-e2.adobeaemcloud.com"
//! access_token = "eyJhbGciOi..."
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aem_cli::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set_active_environment("prod");
//! let connection = config.connection(None);
//! println!("Talking to {:?}", connection.base_url);
//! config.save()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod connection;
mod environments;
mod file;

pub use connection::*;
pub use environments::*;
pub use file::*;

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::ClientOptions;
use crate::auth::Credential;
use crate::operations::{ExecutorConfig, PollerConfig};

/// Environment variable overriding `core.request_timeout_ms`.
pub const TIMEOUT_ENV: &str = "AEM_TIMEOUT";

/// Complete configuration state, serialized to TOML.
///
/// All sections use `#[serde(default)]` so a partial file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the environment requests go to.
    #[serde(default = "default_active_environment")]
    pub active_environment: String,

    #[serde(default)]
    pub core: CoreSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub bulk: BulkSettings,

    #[serde(default)]
    pub poll: PollSettings,

    /// Named environments, keyed by environment name.
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// Settings that apply to every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreSettings {
    /// Reject plaintext `http://` environment addresses.
    #[serde(default)]
    pub enforce_https: bool,

    /// Per-request timeout handed to the HTTP layer.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,

    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

/// Bulk operation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkSettings {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches in `bulk --batches` mode.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Ceiling for a single operation.
    #[serde(default = "default_task_timeout_seconds")]
    pub task_timeout_seconds: u64,

    #[serde(default = "default_shutdown_grace_seconds")]
    pub shutdown_grace_seconds: u64,
}

/// Job polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_poll_timeout_ms")]
    pub timeout_ms: u64,
}

/// Settings for one AEM environment.
///
/// Credentials are stored as given; encrypting them at rest is left to the
/// platform (file permissions, secret managers).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EnvironmentConfig {
    /// Base address, e.g. `https://author-p1-e2.adobeaemcloud.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Base64 `user:password` blob. Wins over `access_token` when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<String>,

    /// User name shown in `env show`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Enforce HTTPS for this environment even if `core.enforce_https` is off.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub https_only: bool,
}

impl EnvironmentConfig {
    /// The credential for this environment after applying precedence.
    pub fn credential(&self) -> Option<Credential> {
        Credential::resolve(self.access_token.as_deref(), self.basic_auth.as_deref())
    }
}

fn default_active_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    500
}

fn default_max_concurrent() -> usize {
    5
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_task_timeout_seconds() -> u64 {
    60
}

fn default_shutdown_grace_seconds() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_timeout_ms() -> u64 {
    300_000
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            enforce_https: false,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: default_cache_ttl_seconds(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            task_timeout_seconds: default_task_timeout_seconds(),
            shutdown_grace_seconds: default_shutdown_grace_seconds(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            timeout_ms: default_poll_timeout_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            active_environment: default_active_environment(),
            core: CoreSettings::default(),
            cache: CacheSettings::default(),
            bulk: BulkSettings::default(),
            poll: PollSettings::default(),
            environments: BTreeMap::new(),
        };
        config.ensure_default_environments();
        config
    }
}

impl Config {
    /// Loads configuration from the default location.
    ///
    /// A missing file is not an error; defaults are returned. `AEM_TIMEOUT`
    /// overrides the request timeout when set.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&config_file_path()?)?;
        if let Ok(timeout) = std::env::var(TIMEOUT_ENV) {
            config.apply_timeout_override(&timeout);
        }
        Ok(config)
    }

    /// Loads configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = match read_config_file(path)? {
            Some(content) => toml::from_str::<Self>(&content)?,
            None => Self::default(),
        };
        config.ensure_default_environments();
        Ok(config)
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path()?)
    }

    /// Saves configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        write_config_file(path, &content)
    }

    /// Applies a request timeout given in milliseconds. Unparsable values are
    /// ignored with a warning.
    pub fn apply_timeout_override(&mut self, value: &str) {
        match value.trim().parse::<u64>() {
            Ok(ms) => self.core.request_timeout_ms = ms,
            Err(_) => tracing::warn!("Ignoring invalid {} value: {}", TIMEOUT_ENV, value),
        }
    }

    fn ensure_default_environments(&mut self) {
        if self.environments.is_empty() {
            for name in DEFAULT_ENVIRONMENTS {
                self.environments
                    .insert(name.to_string(), EnvironmentConfig::default());
            }
        }
    }

    /// Settings for a named environment.
    pub fn environment(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.environments.get(name)
    }

    /// Settings for a named environment, created empty when missing.
    pub fn environment_mut(&mut self, name: &str) -> &mut EnvironmentConfig {
        self.environments.entry(name.to_string()).or_default()
    }

    /// Makes `name` the active environment.
    ///
    /// # Returns
    ///
    /// `false` when the environment did not exist yet; an empty entry is
    /// created for it.
    pub fn set_active_environment(&mut self, name: &str) -> bool {
        let existed = self.environments.contains_key(name);
        if !existed {
            tracing::warn!("Environment '{}' not configured, creating it", name);
            self.environment_mut(name);
        }
        self.active_environment = name.to_string();
        existed
    }

    /// Builds the connection for `environment`, or the active one when `None`.
    pub fn connection(&self, environment: Option<&str>) -> Connection {
        let name = environment.unwrap_or(&self.active_environment);
        let Some(env) = self.environments.get(name) else {
            return Connection::unconfigured().with_environment(name);
        };

        Connection {
            environment: Some(name.to_string()),
            base_url: env.url.as_deref().map(normalize_base_url),
            credential: env.credential(),
            enforce_https: self.core.enforce_https || env.https_only,
        }
    }

    /// Transport options derived from the `[core]` and `[cache]` sections.
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            cache_enabled: self.cache.enabled,
            cache_ttl: Duration::from_secs(self.cache.ttl_seconds),
            max_cache_entries: self.cache.max_entries,
            request_timeout: Some(Duration::from_millis(self.core.request_timeout_ms)),
        }
    }

    /// Bulk executor configuration derived from the `[bulk]` section.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_concurrent: self.bulk.max_concurrent,
            batch_size: self.bulk.batch_size,
            batch_delay: Duration::from_millis(self.bulk.batch_delay_ms),
            task_timeout: Duration::from_secs(self.bulk.task_timeout_seconds),
            shutdown_grace: Duration::from_secs(self.bulk.shutdown_grace_seconds),
        }
    }

    /// Poller configuration derived from the `[poll]` section.
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(self.poll.interval_ms),
            timeout: Duration::from_millis(self.poll.timeout_ms),
            ..PollerConfig::default()
        }
    }

    /// Gets a setting by dotted key, e.g. `cache.ttl_seconds`.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "active_environment" => self.active_environment.clone(),
            "core.enforce_https" => self.core.enforce_https.to_string(),
            "core.request_timeout_ms" => self.core.request_timeout_ms.to_string(),
            "cache.enabled" => self.cache.enabled.to_string(),
            "cache.ttl_seconds" => self.cache.ttl_seconds.to_string(),
            "cache.max_entries" => self.cache.max_entries.to_string(),
            "bulk.max_concurrent" => self.bulk.max_concurrent.to_string(),
            "bulk.batch_size" => self.bulk.batch_size.to_string(),
            "bulk.batch_delay_ms" => self.bulk.batch_delay_ms.to_string(),
            "bulk.task_timeout_seconds" => self.bulk.task_timeout_seconds.to_string(),
            "bulk.shutdown_grace_seconds" => self.bulk.shutdown_grace_seconds.to_string(),
            "poll.interval_ms" => self.poll.interval_ms.to_string(),
            "poll.timeout_ms" => self.poll.timeout_ms.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Sets a setting by dotted key.
    ///
    /// # Errors
    ///
    /// Fails for unknown keys and for values that do not parse as the
    /// setting's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid value '{}' for {}", value, key))
        }

        match key {
            "active_environment" => {
                self.set_active_environment(value);
            }
            "core.enforce_https" => self.core.enforce_https = parse(key, value)?,
            "core.request_timeout_ms" => self.core.request_timeout_ms = parse(key, value)?,
            "cache.enabled" => self.cache.enabled = parse(key, value)?,
            "cache.ttl_seconds" => self.cache.ttl_seconds = parse(key, value)?,
            "cache.max_entries" => self.cache.max_entries = parse(key, value)?,
            "bulk.max_concurrent" => self.bulk.max_concurrent = parse(key, value)?,
            "bulk.batch_size" => self.bulk.batch_size = parse(key, value)?,
            "bulk.batch_delay_ms" => self.bulk.batch_delay_ms = parse(key, value)?,
            "bulk.task_timeout_seconds" => self.bulk.task_timeout_seconds = parse(key, value)?,
            "bulk.shutdown_grace_seconds" => {
                self.bulk.shutdown_grace_seconds = parse(key, value)?
            }
            "poll.interval_ms" => self.poll.interval_ms = parse(key, value)?,
            "poll.timeout_ms" => self.poll.timeout_ms = parse(key, value)?,
            _ => anyhow::bail!("Unknown configuration key: {}", key),
        }
        Ok(())
    }

    /// All keys understood by [`Config::get`] and [`Config::set`].
    pub fn keys() -> &'static [&'static str] {
        &[
            "active_environment",
            "core.enforce_https",
            "core.request_timeout_ms",
            "cache.enabled",
            "cache.ttl_seconds",
            "cache.max_entries",
            "bulk.max_concurrent",
            "bulk.batch_size",
            "bulk.batch_delay_ms",
            "bulk.task_timeout_seconds",
            "bulk.shutdown_grace_seconds",
            "poll.interval_ms",
            "poll.timeout_ms",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_environments() {
        let config = Config::default();
        assert_eq!(config.active_environment, "dev");
        for name in DEFAULT_ENVIRONMENTS {
            assert!(config.environment(name).is_some());
        }
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set_active_environment("local");
        let env = config.environment_mut("local");
        env.url = Some("http://localhost:4502/".to_string());
        env.basic_auth = Some("YWRtaW46YWRtaW4=".to_string());
        config.set("cache.ttl_seconds", "60").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.active_environment, "local");
        assert_eq!(loaded.cache.ttl_seconds, 60);
        assert_eq!(loaded.environment("local"), config.environment("local"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cache]\nenabled = false\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.bulk.max_concurrent, 5);
        assert_eq!(config.active_environment, "dev");
    }

    #[test]
    fn test_connection_applies_credential_precedence() {
        let mut config = Config::default();
        let env = config.environment_mut("dev");
        env.url = Some(" http://localhost:4502/ ".to_string());
        env.access_token = Some("token".to_string());
        env.basic_auth = Some("blob".to_string());

        let connection = config.connection(None);
        assert_eq!(connection.base_url.as_deref(), Some("http://localhost:4502"));
        assert_eq!(connection.credential, Some(Credential::Basic("blob".to_string())));
        assert!(!connection.enforce_https);
    }

    #[test]
    fn test_connection_https_flags() {
        let mut config = Config::default();
        config.environment_mut("prod").https_only = true;
        assert!(config.connection(Some("prod")).enforce_https);
        assert!(!config.connection(Some("dev")).enforce_https);

        config.core.enforce_https = true;
        assert!(config.connection(Some("dev")).enforce_https);
    }

    #[test]
    fn test_unknown_environment_is_unconfigured() {
        let config = Config::default();
        let connection = config.connection(Some("nowhere"));
        assert_eq!(connection.base_url, None);
        assert_eq!(connection.environment.as_deref(), Some("nowhere"));
    }

    #[test]
    fn test_timeout_override() {
        let mut config = Config::default();
        config.apply_timeout_override("1500");
        assert_eq!(config.core.request_timeout_ms, 1500);
        config.apply_timeout_override("soon");
        assert_eq!(config.core.request_timeout_ms, 1500);
        assert_eq!(
            config.client_options().request_timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_get_set_keys() {
        let mut config = Config::default();
        for key in Config::keys() {
            assert!(config.get(key).is_some(), "missing getter for {key}");
        }
        assert!(config.set("bulk.batch_size", "25").is_ok());
        assert_eq!(config.get("bulk.batch_size").as_deref(), Some("25"));
        assert!(config.set("bulk.batch_size", "many").is_err());
        assert!(config.set("nope", "1").is_err());
    }
}
