//
//  aem-cli
//  api/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # API Client Layer
//!
//! The HTTP transport used to talk to AEM author and publish instances.
//!
//! ## Architecture
//!
//! - [`client`]: [`AemClient`], the request executor every command goes through
//! - [`cache`]: bounded LRU cache with TTL for GET responses
//! - [`audit`]: append-only trail of every request that reached the network
//! - [`common`]: shared error type and error-body parsing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use aem_cli::api::{AemClient, ClientOptions};
//! use aem_cli::auth::Credential;
//! use aem_cli::config::Connection;
//!
//! # async fn example() -> Result<(), aem_cli::api::ApiError> {
//! let client = AemClient::with_options(
//!     Connection::new("https://author.example.com").with_credential(Credential::bearer("t")),
//!     ClientOptions::default(),
//! )?;
//!
//! let folder = client.get("/api/assets/site.json").await?;
//! client.move_to("/content/dam/site/a.png", "/content/dam/archive/a.png").await?;
//! # let _ = folder;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! API errors are returned as [`ApiError`] variants:
//!
//! - `NoActiveEnvironment`, `InsecureUrl`, `InvalidUrl`: configuration, no I/O attempted
//! - `Unauthorized`: 401
//! - `Forbidden`: 403
//! - `NotFound`: 404
//! - `Conflict`: 409
//! - `RateLimited`: 429
//! - `ServerError`: 5xx

/// Core HTTP client with caching, auditing and credential injection.
pub mod client;

/// Response cache for GET requests.
pub mod cache;

/// In-memory audit trail.
pub mod audit;

/// Shared types used across the API layer.
pub mod common;

pub use audit::AuditRecord;
pub use cache::CacheStats;
pub use client::{AemClient, ClientOptions};
pub use common::ApiError;
