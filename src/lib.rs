//
//  aem-cli
//  lib.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # AEM CLI Library
//!
//! Request execution and concurrency core for a command-line tool that
//! exercises Adobe Experience Manager REST APIs.
//!
//! ## Overview
//!
//! Everything the `aem` binary does goes through three pieces:
//!
//! - **Transport** ([`api::AemClient`]): authenticated requests against the
//!   active environment, a TTL + LRU response cache for GETs, and an
//!   in-memory audit trail of every request that reached the network.
//! - **Bulk executor** ([`operations::BulkExecutor`]): runs many fallible
//!   operations with bounded concurrency and per-item failure isolation.
//! - **Async poller** ([`operations::AsyncPoller`]): submits a long-running
//!   server job and polls its status location until it completes, fails or
//!   times out.
//!
//! ## Module Structure
//!
//! - [`cli`]: Command-line interface definitions using clap
//! - [`api`]: HTTP transport, response cache and audit log
//! - [`auth`]: Bearer and basic credentials
//! - [`config`]: Configuration file and environment management
//! - [`context`]: Turns configuration and flags into a ready client
//! - [`operations`]: Bulk executor and job poller
//! - [`output`]: Output formatting (Table, JSON)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use aem_cli::api::AemClient;
//! use aem_cli::operations::{BulkExecutor, BulkOperation};
//! use aem_cli::Config;
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let client = Arc::new(AemClient::with_options(config.connection(None), config.client_options())?);
//!
//! let operations = ["/content/a.json", "/content/b.json"]
//!     .into_iter()
//!     .map(|path| {
//!         let client = Arc::clone(&client);
//!         BulkOperation::new(async move { Ok(client.get(path).await?) })
//!     })
//!     .collect();
//!
//! let results = BulkExecutor::new().execute_bulk(operations).await?;
//! println!("{}", BulkExecutor::statistics(&results));
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions.
///
/// Contains all CLI commands, arguments, and subcommands defined using the clap derive API.
pub mod cli;

/// Caching, audited HTTP transport.
pub mod api;

/// Credentials for AEM environments.
pub mod auth;

/// Configuration file management.
///
/// Manages the CLI's configuration stored in platform-specific locations:
/// - Linux: `~/.config/aem/config.toml`
/// - macOS: `~/Library/Application Support/aem/config.toml`
/// - Windows: `%APPDATA%\aem\config.toml`
///
/// `AEM_CONFIG` overrides the location.
pub mod config;

/// Command context resolution.
pub mod context;

/// Bulk execution and job polling.
pub mod operations;

/// Output formatting for different modes.
///
/// Provides formatters for:
/// - Table format: Human-readable tables for interactive use
/// - JSON format: Structured output for scripting and automation
pub mod output;

/// Re-export of the main CLI struct for convenient access.
///
/// # Example
///
/// ```rust,no_run
/// use clap::Parser;
/// use aem_cli::Cli;
///
/// let cli = Cli::parse();
/// // Handle cli.command...
/// ```
pub use cli::Cli;

/// Re-export of the configuration struct.
///
/// # Example
///
/// ```rust,no_run
/// use aem_cli::Config;
///
/// let config = Config::load().expect("Failed to load config");
/// if let Some(ttl) = config.get("cache.ttl_seconds") {
///     println!("Cache TTL: {}s", ttl);
/// }
/// ```
pub use config::Config;

/// Application name constant.
///
/// The name of the CLI binary, used for display purposes and configuration paths.
///
/// # Value
///
/// `"aem"`
pub const APP_NAME: &str = "aem";

/// Application version constant, taken from Cargo.toml at compile time.
///
/// # Example
///
/// ```rust
/// use aem_cli::VERSION;
///
/// println!("aem version {}", VERSION);
/// ```
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for the CLI.
///
/// Standardized exit codes following Unix conventions, allowing scripts
/// to programmatically detect the outcome of CLI operations.
///
/// # Exit Code Ranges
///
/// - `0`: Success
/// - `1-3`: General errors, usage and configuration issues
/// - `4-7`: Authentication-related issues
/// - `8-15`: Resource-related issues
/// - `16-31`: Operation-related issues
/// - `32+`: External service issues
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;

    /// General error.
    ///
    /// An unspecified error occurred during execution.
    /// Check stderr for details.
    pub const ERROR: i32 = 1;

    /// Invalid usage or arguments.
    ///
    /// Use `--help` to see correct usage.
    pub const USAGE: i32 = 2;

    /// Local configuration problem.
    ///
    /// No address for the active environment, a plaintext address while
    /// HTTPS is enforced, or a job that gave no status location.
    pub const CONFIG: i32 = 3;

    /// Authentication required or failed.
    ///
    /// The server answered 401 or 403. Check the environment's credentials
    /// with `aem env show`.
    pub const AUTH_ERROR: i32 = 4;

    /// Resource not found.
    pub const NOT_FOUND: i32 = 8;

    /// Operation cancelled by user, typically with Ctrl+C.
    pub const CANCELLED: i32 = 16;

    /// A job did not finish within its time budget.
    pub const TIMEOUT: i32 = 24;

    /// The server's rate limit has been exceeded.
    pub const RATE_LIMIT: i32 = 32;
}

/// Picks the exit code for an error returned by a command.
///
/// Transport and poller errors are found anywhere in the error chain; every
/// other error maps to [`exit_codes::ERROR`].
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    use api::ApiError;
    use operations::PollError;

    for cause in error.chain() {
        if let Some(poll) = cause.downcast_ref::<PollError>() {
            return match poll {
                PollError::Api(api) => api_exit_code(api),
                PollError::MissingStatusLocation(_) => exit_codes::CONFIG,
                PollError::TimedOut(_) => exit_codes::TIMEOUT,
                PollError::Cancelled => exit_codes::CANCELLED,
                PollError::JobFailed { .. } => exit_codes::ERROR,
            };
        }
        if let Some(api) = cause.downcast_ref::<ApiError>() {
            return api_exit_code(api);
        }
    }
    exit_codes::ERROR
}

fn api_exit_code(error: &api::ApiError) -> i32 {
    use api::ApiError;

    if error.is_configuration() {
        return exit_codes::CONFIG;
    }
    if error.is_auth() {
        return exit_codes::AUTH_ERROR;
    }
    match error {
        ApiError::NotFound { .. } => exit_codes::NOT_FOUND,
        ApiError::RateLimited { .. } => exit_codes::RATE_LIMIT,
        _ => exit_codes::ERROR,
    }
}
