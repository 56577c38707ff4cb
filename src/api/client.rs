//
//  aem-cli
//  api/client.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # HTTP Transport for AEM
//!
//! [`AemClient`] issues every request the CLI makes against an AEM environment.
//!
//! ## Features
//!
//! - Resolves paths against the active environment's base address
//! - Rejects plaintext addresses when HTTPS is enforced, before any I/O
//! - Injects the active credential (basic auth wins over bearer)
//! - Caches GET responses in a bounded LRU with a fixed TTL
//! - Appends one audit record per request that reaches the network
//! - Maps non-2xx responses to tagged [`ApiError`] variants
//!
//! The transport never retries. Retry and pacing policies belong to callers
//! such as [`BulkExecutor`](crate::operations::BulkExecutor) and
//! [`AsyncPoller`](crate::operations::AsyncPoller).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use super::audit::{AuditLog, AuditRecord};
use super::cache::{CacheKey, CacheStats, ResponseCache, DEFAULT_CACHE_TTL, DEFAULT_MAX_CACHE_ENTRIES};
use super::common::ApiError;
use crate::auth::Credential;
use crate::config::{is_absolute_url, is_plaintext_url, join_url, ConnectionSource};

/// Characters of a response body included in debug logs.
const LOG_BODY_LIMIT: usize = 500;

/// Tunables for an [`AemClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Serve and store GET responses through the cache.
    pub cache_enabled: bool,
    /// How long a cached response stays valid.
    pub cache_ttl: Duration,
    /// Maximum number of cached responses.
    pub max_cache_entries: usize,
    /// Timeout handed to the HTTP layer. `None` leaves reqwest's default.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_cache_entries: DEFAULT_MAX_CACHE_ENTRIES,
            request_timeout: None,
        }
    }
}

/// Parses a method name such as `get` or `MOVE`.
///
/// ```rust
/// use aem_cli::api::client::parse_method;
///
/// assert_eq!(parse_method("post").unwrap(), reqwest::Method::POST);
/// assert_eq!(parse_method("COPY").unwrap().as_str(), "COPY");
/// ```
pub fn parse_method(name: &str) -> Result<Method, ApiError> {
    Method::from_bytes(name.trim().to_uppercase().as_bytes())
        .map_err(|_| ApiError::InvalidMethod(name.to_string()))
}

/// Where a single call goes and how it authenticates, read once per call.
struct Target {
    url: Url,
    credential: Option<Credential>,
}

/// Caching, audited HTTP client bound to the active AEM environment.
///
/// All methods take `&self`; wrap the client in an [`Arc`] to share it between
/// concurrent bulk operations.
///
/// # Example
///
/// ```rust,no_run
/// use aem_cli::api::AemClient;
/// use aem_cli::auth::Credential;
/// use aem_cli::config::Connection;
///
/// # async fn example() -> Result<(), aem_cli::api::ApiError> {
/// let connection = Connection::new("http://localhost:4502")
///     .with_credential(Credential::basic("admin", "admin"));
/// let client = AemClient::new(connection)?;
///
/// let assets = client.get("/api/assets.json").await?;
/// println!("{}", assets);
/// for record in client.audit_log() {
///     println!("{}", record);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AemClient {
    http: Client,
    connection: Arc<dyn ConnectionSource>,
    cache: ResponseCache,
    cache_enabled: AtomicBool,
    audit: AuditLog,
}

impl AemClient {
    /// Creates a client with default options.
    pub fn new(connection: impl ConnectionSource + 'static) -> Result<Self, ApiError> {
        Self::with_options(connection, ClientOptions::default())
    }

    /// Creates a client with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying HTTP client cannot be built.
    pub fn with_options(
        connection: impl ConnectionSource + 'static,
        options: ClientOptions,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(format!("aem/{}", crate::VERSION));
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            connection: Arc::new(connection),
            cache: ResponseCache::new(options.max_cache_entries, options.cache_ttl),
            cache_enabled: AtomicBool::new(options.cache_enabled),
            audit: AuditLog::new(),
        })
    }

    /// Base address of the active environment, if configured.
    pub fn base_url(&self) -> Option<String> {
        self.connection.active_base_url()
    }

    /// Resolves `path` to a full URL without issuing a request.
    ///
    /// Relative paths are joined to the active base address. Absolute
    /// `http(s)://` paths are used as-is but still need an active environment;
    /// the environment credential is only attached when they share its origin.
    ///
    /// # Errors
    ///
    /// Configuration errors only: no active address, HTTPS violation, or an
    /// unparsable result.
    pub fn resolve_url(&self, path: &str) -> Result<Url, ApiError> {
        self.target(path).map(|t| t.url)
    }

    fn target(&self, path: &str) -> Result<Target, ApiError> {
        let enforce_https = self.connection.https_enforced();
        let base = self
            .connection
            .active_base_url()
            .ok_or(ApiError::NoActiveEnvironment)?;
        if enforce_https && is_plaintext_url(&base) {
            return Err(ApiError::InsecureUrl(base));
        }

        let absolute = is_absolute_url(path);
        let raw = if absolute {
            path.trim().to_string()
        } else {
            join_url(&base, path)
        };

        if enforce_https && is_plaintext_url(&raw) {
            return Err(ApiError::InsecureUrl(raw));
        }

        let url = Url::parse(&raw).map_err(|source| ApiError::InvalidUrl { url: raw, source })?;

        let same_origin = !absolute
            || Url::parse(&base).is_ok_and(|base| base.origin() == url.origin());
        let credential = if same_origin {
            self.connection.active_credential()
        } else {
            tracing::debug!(
                "Not sending credentials to foreign origin {}",
                url.origin().ascii_serialization()
            );
            None
        };

        Ok(Target { url, credential })
    }

    /// Sends a prepared request, audits it and returns the raw 2xx body.
    async fn execute(
        &self,
        label: &str,
        path: &str,
        target: Target,
        prepare: impl FnOnce(&Client, Url) -> RequestBuilder,
    ) -> Result<Vec<u8>, ApiError> {
        tracing::debug!("Request: {} {}", label, target.url);

        let mut request = prepare(&self.http, target.url).header(ACCEPT, "application/json");
        if let Some(credential) = &target.credential {
            request = credential.apply_to_request(request);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.audit
                    .record(label, path, e.status().map(|s| s.as_u16()));
                return Err(ApiError::Network(e));
            }
        };

        let status = response.status().as_u16();
        let body = response.bytes().await;
        self.audit.record(label, path, Some(status));
        let body = body?.to_vec();

        if tracing::enabled!(tracing::Level::DEBUG) {
            let text = String::from_utf8_lossy(&body);
            let shown: String = text.chars().take(LOG_BODY_LIMIT).collect();
            let ellipsis = if text.chars().count() > LOG_BODY_LIMIT { "..." } else { "" };
            tracing::debug!("Response: {} - {}{}", status, shown, ellipsis);
        }

        if !(200..300).contains(&status) {
            return Err(ApiError::from_status(
                status,
                path,
                &String::from_utf8_lossy(&body),
            ));
        }

        Ok(body)
    }

    /// Issues a request with an optional JSON body and returns the JSON payload.
    ///
    /// GET requests go through the response cache; every other method goes
    /// straight to the network.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        if method == Method::GET {
            return self.get(path).await;
        }

        let target = self.target(path)?;
        let label = method.as_str().to_string();
        let bytes = self
            .execute(&label, path, target, |http, url| {
                let request = http.request(method, url);
                match body {
                    Some(body) => request.json(body),
                    None => request,
                }
            })
            .await?;
        parse_payload(&bytes)
    }

    /// GET with caching.
    ///
    /// A fresh cached response is returned without touching the network.
    /// Otherwise the response is fetched and, on success, stored.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let target = self.target(path)?;

        if !self.is_cache_enabled() {
            return self.fetch(path, target).await.and_then(|b| parse_payload(&b));
        }

        let key = CacheKey::new("GET", target.url.as_str());
        if let Some(body) = self.cache.get(&key) {
            tracing::debug!("[CACHE HIT] GET {}", target.url);
            return parse_payload(body.as_bytes());
        }

        let url = target.url.to_string();
        let bytes = self.fetch(path, target).await?;
        let payload = parse_payload(&bytes)?;
        self.cache
            .insert(key, String::from_utf8_lossy(&bytes).into_owned());
        tracing::debug!("[CACHED] GET {}", url);
        Ok(payload)
    }

    /// GET that neither reads nor writes the cache.
    ///
    /// Used for status endpoints whose answer changes between calls.
    pub async fn get_uncached(&self, path: &str) -> Result<Value, ApiError> {
        let target = self.target(path)?;
        let bytes = self.fetch(path, target).await?;
        parse_payload(&bytes)
    }

    async fn fetch(&self, path: &str, target: Target) -> Result<Vec<u8>, ApiError> {
        self.execute("GET", path, target, |http, url| http.get(url))
            .await
    }

    /// POST with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let target = self.target(path)?;
        let bytes = self
            .execute("POST", path, target, |http, url| http.post(url).json(body))
            .await?;
        parse_payload(&bytes)
    }

    /// PUT with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        let target = self.target(path)?;
        let bytes = self
            .execute("PUT", path, target, |http, url| http.put(url).json(body))
            .await?;
        parse_payload(&bytes)
    }

    /// DELETE. Any non-2xx status is an error.
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let target = self.target(path)?;
        let bytes = self
            .execute("DELETE", path, target, |http, url| http.delete(url))
            .await?;
        parse_payload(&bytes)
    }

    /// POSTs an opaque byte payload. Not cached.
    pub async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Value, ApiError> {
        let target = self.target(path)?;
        let bytes = self
            .execute("UPLOAD", path, target, |http, url| {
                http.post(url).header(CONTENT_TYPE, content_type).body(data)
            })
            .await?;
        parse_payload(&bytes)
    }

    /// GETs an opaque byte payload. Not cached.
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let target = self.target(path)?;
        self.execute("DOWNLOAD", path, target, |http, url| http.get(url))
            .await
    }

    /// Moves a node to `destination` (WebDAV-style `MOVE`).
    pub async fn move_to(&self, source: &str, destination: &str) -> Result<Value, ApiError> {
        self.relocate("MOVE", source, destination).await
    }

    /// Copies a node to `destination` (WebDAV-style `COPY`).
    pub async fn copy_to(&self, source: &str, destination: &str) -> Result<Value, ApiError> {
        self.relocate("COPY", source, destination).await
    }

    async fn relocate(
        &self,
        verb: &str,
        source: &str,
        destination: &str,
    ) -> Result<Value, ApiError> {
        let method = parse_method(verb)?;
        let target = self.target(source)?;
        let bytes = self
            .execute(verb, source, target, |http, url| {
                http.request(method, url)
                    .header("X-Destination", destination)
                    .header("X-Overwrite", "T")
                    .header("X-Depth", "infinity")
            })
            .await?;
        parse_payload(&bytes)
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("API response cache cleared");
    }

    /// Turns caching on or off. Existing entries are kept either way.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Relaxed)
    }

    /// Changes the TTL applied to cached responses.
    pub fn set_cache_ttl(&self, ttl: Duration) {
        self.cache.set_ttl(ttl);
    }

    /// Cache occupancy report.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats(self.is_cache_enabled())
    }

    /// Read-only copy of the audit trail.
    pub fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.snapshot()
    }
}

/// Parses a 2xx body. Empty bodies become an empty JSON object.
fn parse_payload(bytes: &[u8]) -> Result<Value, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    Ok(serde_json::from_slice(bytes)?)
}
