//
//  aem-cli
//  api/common/mod.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Common API Types
//!
//! The error type returned by every transport call, plus helpers for turning
//! AEM error bodies into readable messages.
//!
//! # Error Taxonomy
//!
//! | Group | Variants | Network I/O attempted |
//! |-------|----------|-----------------------|
//! | Configuration | `NoActiveEnvironment`, `InsecureUrl`, `InvalidUrl`, `InvalidMethod` | No |
//! | Status | `Unauthorized`, `Forbidden`, `NotFound`, `Conflict`, `RateLimited`, `ServerError`, `RequestFailed` | Yes |
//! | Transport | `Network`, `Decode` | Yes |
//!
//! Status variants always carry the status code and the raw response body so
//! callers can branch without parsing messages.
//!
//! # Example
//!
//! ```rust
//! use aem_cli::api::ApiError;
//!
//! let err = ApiError::from_status(404, "/content/dam/missing.json", "{}");
//! assert!(matches!(err, ApiError::NotFound { .. }));
//! assert_eq!(err.status(), Some(404));
//! ```

use thiserror::Error;

/// Error type for every transport operation.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No base address is configured for the active environment.
    #[error("No active environment URL configured")]
    NoActiveEnvironment,

    /// HTTPS enforcement is on and the address is plaintext.
    #[error("HTTPS enforcement is enabled but URL uses HTTP: {0}")]
    InsecureUrl(String),

    /// The resolved address could not be parsed.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The method name is not a valid HTTP token.
    #[error("Unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// 401 Unauthorized.
    #[error("Unauthorized: {path}")]
    Unauthorized { path: String, body: String },

    /// 403 Forbidden.
    #[error("Permission denied: {path}")]
    Forbidden { path: String, body: String },

    /// 404 Not Found.
    #[error("Not found: {path}")]
    NotFound { path: String, body: String },

    /// 409 Conflict.
    #[error("Conflict: {path}")]
    Conflict { path: String, body: String },

    /// 429 Too Many Requests.
    #[error("Rate limit exceeded: {path}")]
    RateLimited { path: String, body: String },

    /// Any 5xx response.
    #[error("Server error ({status}): {}", summarize(.body))]
    ServerError {
        status: u16,
        path: String,
        body: String,
    },

    /// Any other status outside 2xx.
    #[error("HTTP {status}: {}", summarize(.body))]
    RequestFailed {
        status: u16,
        path: String,
        body: String,
    },

    /// Connection, TLS or timeout failure in the HTTP layer.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A 2xx body that is not valid JSON.
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Maps a non-2xx status to its tagged variant.
    pub fn from_status(status: u16, path: &str, body: &str) -> Self {
        let path = path.to_string();
        let body = body.to_string();
        match status {
            401 => Self::Unauthorized { path, body },
            403 => Self::Forbidden { path, body },
            404 => Self::NotFound { path, body },
            409 => Self::Conflict { path, body },
            429 => Self::RateLimited { path, body },
            500..=599 => Self::ServerError { status, path, body },
            _ => Self::RequestFailed { status, path, body },
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::RateLimited { .. } => Some(429),
            Self::ServerError { status, .. } | Self::RequestFailed { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The raw response body for status errors.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { body, .. }
            | Self::Forbidden { body, .. }
            | Self::NotFound { body, .. }
            | Self::Conflict { body, .. }
            | Self::RateLimited { body, .. }
            | Self::ServerError { body, .. }
            | Self::RequestFailed { body, .. } => Some(body),
            _ => None,
        }
    }

    /// `true` for local precondition failures that never reached the network.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::NoActiveEnvironment
                | Self::InsecureUrl(_)
                | Self::InvalidUrl { .. }
                | Self::InvalidMethod(_)
        )
    }

    /// `true` for 401 and 403 responses.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Forbidden { .. })
    }

    /// Best-effort human readable message extracted from the response body.
    pub fn server_message(&self) -> Option<String> {
        self.body().and_then(extract_error_message)
    }
}

/// Extracts a readable message from common AEM / Sling error bodies.
///
/// Recognised shapes:
///
/// - `{"message": "..."}`
/// - `{"errors": [{"message": "..."}]}`
/// - `{"error": "..."}` and `{"error": {"message": "..."}}`
/// - `{"status.message": "..."}` (Sling POST servlet)
pub fn extract_error_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;

    let candidates = [
        json.get("message"),
        json.get("errors")
            .and_then(|e| e.as_array())
            .and_then(|arr| arr.first())
            .and_then(|e| e.get("message")),
        json.get("error").filter(|e| e.is_string()),
        json.get("error").and_then(|e| e.get("message")),
        json.get("status.message"),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::to_string);
    found
}

fn summarize(body: &str) -> String {
    if let Some(message) = extract_error_message(body) {
        return message;
    }
    let body = body.trim();
    if body.chars().count() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_tags() {
        assert!(matches!(ApiError::from_status(401, "/p", ""), ApiError::Unauthorized { .. }));
        assert!(matches!(ApiError::from_status(403, "/p", ""), ApiError::Forbidden { .. }));
        assert!(matches!(ApiError::from_status(409, "/p", ""), ApiError::Conflict { .. }));
        assert!(matches!(ApiError::from_status(429, "/p", ""), ApiError::RateLimited { .. }));
        assert!(matches!(
            ApiError::from_status(503, "/p", ""),
            ApiError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(302, "/p", ""),
            ApiError::RequestFailed { status: 302, .. }
        ));
    }

    #[test]
    fn test_status_and_body_are_carried() {
        let err = ApiError::from_status(418, "/teapot", "short and stout");
        assert_eq!(err.status(), Some(418));
        assert_eq!(err.body(), Some("short and stout"));
        assert_eq!(err.to_string(), "HTTP 418: short and stout");
    }

    #[test]
    fn test_extract_error_message_shapes() {
        assert_eq!(
            extract_error_message(r#"{"message":"boom"}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(
            extract_error_message(r#"{"errors":[{"message":"first"}]}"#).as_deref(),
            Some("first")
        );
        assert_eq!(
            extract_error_message(r#"{"error":"job failed"}"#).as_deref(),
            Some("job failed")
        );
        assert_eq!(
            extract_error_message(r#"{"error":{"message":"nested"}}"#).as_deref(),
            Some("nested")
        );
        assert_eq!(
            extract_error_message(r#"{"status.message":"Forbidden","message":7}"#).as_deref(),
            Some("Forbidden")
        );
        assert_eq!(extract_error_message("<html>"), None);
    }

    #[test]
    fn test_configuration_errors() {
        assert!(ApiError::NoActiveEnvironment.is_configuration());
        assert!(ApiError::InsecureUrl("http://x".into()).is_configuration());
        assert!(!ApiError::from_status(500, "/", "").is_configuration());
    }
}
