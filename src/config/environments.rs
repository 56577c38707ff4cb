//
//  aem-cli
//  config/environments.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Environment Helpers
//!
//! Constants and URL helpers for AEM environments.
//!
//! | Environment | Typical address |
//! |-------------|-----------------|
//! | `local` | `http://localhost:4502` (AEM SDK author) |
//! | `dev` / `staging` / `prod` | `https://author-pXXXX-eYYYY.adobeaemcloud.com` |
//!
//! ```rust
//! use aem_cli::config::{join_url, normalize_base_url};
//!
//! let base = normalize_base_url(" https://author.example.com/ ");
//! assert_eq!(base, "https://author.example.com");
//! assert_eq!(join_url(&base, "api/assets.json"), "https://author.example.com/api/assets.json");
//! ```

/// Environments created when the configuration file defines none.
pub const DEFAULT_ENVIRONMENTS: [&str; 3] = ["dev", "staging", "prod"];

/// Environment selected when nothing else is configured.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Address of a local AEM SDK author instance.
pub const LOCAL_SDK_URL: &str = "http://localhost:4502";

/// Trims whitespace and trailing slashes from a user-supplied base address.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Returns `true` for plaintext `http://` addresses.
pub fn is_plaintext_url(url: &str) -> bool {
    url.trim().to_ascii_lowercase().starts_with("http://")
}

/// Returns `true` when `path` is already an absolute `http(s)://` address.
pub fn is_absolute_url(path: &str) -> bool {
    let lower = path.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Joins a base address and a path with exactly one `/` between them.
///
/// ```rust
/// use aem_cli::config::join_url;
///
/// assert_eq!(join_url("http://h", "/a"), "http://h/a");
/// assert_eq!(join_url("http://h/", "/a"), "http://h/a");
/// assert_eq!(join_url("http://h", "a"), "http://h/a");
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}
