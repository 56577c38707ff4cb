//
//  aem-cli
//  auth/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Authentication Module
//!
//! Credentials attached to every request sent to an AEM environment.
//!
//! ## Supported Authentication Methods
//!
//! - **Bearer token**: IMS access tokens or local development tokens.
//! - **Basic authentication**: a pre-encoded `user:password` blob, typically used
//!   against a local AEM SDK instance.
//!
//! A credential is bound to exactly one environment. When an environment has both
//! a basic-auth blob and a bearer token, basic auth wins on the wire.
//!
//! ## Example
//!
//! ```rust
//! use aem_cli::auth::Credential;
//!
//! let credential = Credential::resolve(Some("ims-token"), Some("YWRtaW46YWRtaW4="));
//! assert!(matches!(credential, Some(Credential::Basic(_))));
//! ```

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use reqwest::RequestBuilder;

/// Credential used to authenticate against the active environment.
///
/// # Variants
///
/// - `Bearer`: sent as `Authorization: Bearer <token>`
/// - `Basic`: sent as `Authorization: Basic <blob>`, where the blob is the
///   already base64-encoded `user:password` pair
///
/// # Example
///
/// ```rust
/// use aem_cli::auth::Credential;
///
/// let basic = Credential::basic("admin", "admin");
/// assert_eq!(basic, Credential::Basic("YWRtaW46YWRtaW4=".to_string()));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Bearer token authentication.
    Bearer(String),
    /// HTTP Basic authentication with a pre-encoded blob.
    Basic(String),
}

impl Credential {
    /// Creates a bearer credential.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Encodes `username:password` into a basic-auth credential.
    pub fn basic(username: &str, password: &str) -> Self {
        Self::Basic(STANDARD.encode(format!("{username}:{password}")))
    }

    /// Picks the credential to use from the values stored for an environment.
    ///
    /// A non-empty basic-auth blob takes precedence over a bearer token. Empty
    /// strings are treated as absent.
    ///
    /// # Returns
    ///
    /// `None` when neither value is usable.
    pub fn resolve(bearer: Option<&str>, basic: Option<&str>) -> Option<Self> {
        fn usable(value: Option<&str>) -> Option<&str> {
            value.filter(|v| !v.trim().is_empty())
        }

        if let Some(blob) = usable(basic) {
            return Some(Self::Basic(blob.trim().to_string()));
        }
        usable(bearer).map(|token| Self::Bearer(token.trim().to_string()))
    }

    /// Returns the value of the `Authorization` header for this credential.
    pub fn header_value(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {token}"),
            Self::Basic(blob) => format!("Basic {blob}"),
        }
    }

    /// Applies the credential to an outgoing request.
    pub fn apply_to_request(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Basic(_) => request.header(AUTHORIZATION, self.header_value()),
        }
    }

    /// The raw token or blob, as stored in the configuration file.
    pub fn secret(&self) -> &str {
        match self {
            Self::Bearer(value) | Self::Basic(value) => value,
        }
    }

    /// Short label for display ("bearer" or "basic").
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "bearer",
            Self::Basic(_) => "basic",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(***)", self.kind())
    }
}
