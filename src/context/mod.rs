//
//  aem-cli
//  context/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Command Context
//!
//! Turns the loaded configuration plus global CLI flags into the objects a
//! command needs: the target environment, a configured [`AemClient`], and
//! executor/poller settings.
//!
//! ## Resolution Priority
//!
//! 1. CLI flags (`--env`, `--https-only`, `--no-cache`)
//! 2. Environment variables (`AEM_ENV`, `AEM_TIMEOUT`)
//! 3. Configuration file
//!
//! ## Example
//!
//! ```rust,no_run
//! use aem_cli::cli::GlobalOptions;
//! use aem_cli::config::Config;
//! use aem_cli::context::ContextResolver;
//!
//! let resolver = ContextResolver::new(Config::load()?);
//! let ctx = resolver.resolve(&GlobalOptions::default())?;
//! println!("Talking to {}", ctx.environment);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::sync::Arc;

use anyhow::Result;

use crate::api::AemClient;
use crate::cli::GlobalOptions;
use crate::config::{Config, Connection};
use crate::operations::{AsyncPoller, BulkExecutor};

/// Everything a command needs to talk to one environment.
pub struct CommandContext {
    /// Name of the environment requests go to.
    pub environment: String,
    pub connection: Connection,
    pub client: Arc<AemClient>,
    pub config: Config,
}

impl CommandContext {
    /// Bulk executor configured from `[bulk]`.
    pub fn executor(&self) -> BulkExecutor {
        BulkExecutor::with_config(self.config.executor_config())
    }

    /// Job poller configured from `[poll]`.
    pub fn poller(&self) -> AsyncPoller<'_, AemClient> {
        AsyncPoller::with_config(self.client.as_ref(), self.config.poller_config())
    }
}

/// Resolves a [`CommandContext`] from configuration and global options.
pub struct ContextResolver {
    config: Config,
}

impl ContextResolver {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// The connection the given options select, without building a client.
    pub fn connection(&self, global: &GlobalOptions) -> Connection {
        let mut connection = self.config.connection(global.env.as_deref());
        if global.https_only {
            connection.enforce_https = true;
        }
        connection
    }

    /// Builds the client for the selected environment.
    ///
    /// An environment without an address still resolves; requests through
    /// the client then fail with a configuration error.
    pub fn resolve(self, global: &GlobalOptions) -> Result<CommandContext> {
        let connection = self.connection(global);
        let environment = connection
            .environment
            .clone()
            .unwrap_or_else(|| self.config.active_environment.clone());

        let mut options = self.config.client_options();
        if global.no_cache {
            options.cache_enabled = false;
        }

        tracing::debug!(
            "Using environment '{}' ({})",
            environment,
            connection.base_url.as_deref().unwrap_or("no url")
        );

        let client = AemClient::with_options(connection.clone(), options)?;

        Ok(CommandContext {
            environment,
            connection,
            client: Arc::new(client),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_dev() -> Config {
        let mut config = Config::default();
        config.environment_mut("dev").url = Some("http://localhost:4502".to_string());
        config.environment_mut("prod").url = Some("https://author.example.com".to_string());
        config
    }

    #[test]
    fn test_flags_override_config() {
        let global = GlobalOptions {
            env: Some("prod".to_string()),
            no_cache: true,
            https_only: true,
            ..Default::default()
        };

        let ctx = ContextResolver::new(config_with_dev()).resolve(&global).unwrap();
        assert_eq!(ctx.environment, "prod");
        assert!(ctx.connection.enforce_https);
        assert!(!ctx.client.is_cache_enabled());
        assert_eq!(ctx.client.base_url().as_deref(), Some("https://author.example.com"));
    }

    #[test]
    fn test_defaults_to_active_environment() {
        let ctx = ContextResolver::new(config_with_dev())
            .resolve(&GlobalOptions::default())
            .unwrap();
        assert_eq!(ctx.environment, "dev");
        assert!(ctx.client.is_cache_enabled());
        assert_eq!(ctx.executor().max_concurrent(), 5);
        assert_eq!(ctx.poller().config().status_location_field, "statusUrl");
    }
}
