//
//  aem-cli
//  config/connection.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Connection Settings
//!
//! The transport never reaches into global state. Instead it is handed a
//! [`ConnectionSource`], which it reads once per request to learn the active
//! base address, credential and HTTPS policy.
//!
//! Two implementations ship with the crate:
//!
//! - [`Connection`]: a fixed snapshot, handy for tests and one-shot commands
//! - [`SharedConnection`]: a lock-protected connection that connection-management
//!   code can switch while requests are in flight
//!
//! ```rust
//! use aem_cli::auth::Credential;
//! use aem_cli::config::{Connection, ConnectionSource, SharedConnection};
//!
//! let shared = SharedConnection::new(Connection::new("https://author.example.com"));
//! shared.switch(
//!     Connection::new("https://publish.example.com").with_credential(Credential::bearer("t")),
//! );
//! assert_eq!(
//!     shared.active_base_url().as_deref(),
//!     Some("https://publish.example.com")
//! );
//! ```

use std::sync::{Arc, RwLock};

use crate::auth::Credential;

/// Read-only view of the active environment, consulted on every request.
pub trait ConnectionSource: Send + Sync {
    /// Base address of the active environment, if one is configured.
    fn active_base_url(&self) -> Option<String>;

    /// Credential bound to the active environment.
    fn active_credential(&self) -> Option<Credential>;

    /// Whether plaintext `http://` addresses must be rejected.
    fn https_enforced(&self) -> bool;
}

/// Connection details for one environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection {
    /// Name of the environment these settings belong to.
    pub environment: Option<String>,
    /// Base address requests are resolved against.
    pub base_url: Option<String>,
    /// Credential to attach to each request.
    pub credential: Option<Credential>,
    /// Reject `http://` addresses when set.
    pub enforce_https: bool,
}

impl Connection {
    /// Creates a connection pointing at `base_url` with no credential.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    /// A connection with no active address. Every request fails fast.
    pub fn unconfigured() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_https_enforced(mut self, enforce: bool) -> Self {
        self.enforce_https = enforce;
        self
    }

    pub fn with_environment(mut self, name: impl Into<String>) -> Self {
        self.environment = Some(name.into());
        self
    }
}

impl ConnectionSource for Connection {
    fn active_base_url(&self) -> Option<String> {
        self.base_url.clone().filter(|url| !url.trim().is_empty())
    }

    fn active_credential(&self) -> Option<Credential> {
        self.credential.clone()
    }

    fn https_enforced(&self) -> bool {
        self.enforce_https
    }
}

/// A [`Connection`] shared between the transport and connection management.
///
/// Cloning is cheap; all clones observe the same connection.
#[derive(Debug, Clone, Default)]
pub struct SharedConnection {
    inner: Arc<RwLock<Connection>>,
}

impl SharedConnection {
    pub fn new(connection: Connection) -> Self {
        Self {
            inner: Arc::new(RwLock::new(connection)),
        }
    }

    /// Replaces the active connection. Requests already issued keep the
    /// settings they read.
    pub fn switch(&self, connection: Connection) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(
            environment = connection.environment.as_deref().unwrap_or("-"),
            "Switching active connection"
        );
        *guard = connection;
    }

    /// Returns a copy of the active connection.
    pub fn snapshot(&self) -> Connection {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ConnectionSource for SharedConnection {
    fn active_base_url(&self) -> Option<String> {
        self.snapshot().active_base_url()
    }

    fn active_credential(&self) -> Option<Credential> {
        self.snapshot().credential
    }

    fn https_enforced(&self) -> bool {
        self.snapshot().enforce_https
    }
}
