//
//  aem-cli
//  tests/cli.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `aem` with its configuration file redirected into `dir`.
fn aem(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("aem").unwrap();
    cmd.env("AEM_CONFIG", dir.join("config.toml"))
        .env_remove("AEM_ENV")
        .env_remove("AEM_DEBUG")
        .env_remove("AEM_TIMEOUT")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_env_list_shows_defaults() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["env", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"dev\""))
        .stdout(predicate::str::contains("\"prod\""));
}

#[test]
fn test_env_use_persists() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["env", "set", "staging", "--url", "https://stage.example.com/"])
        .assert()
        .success();
    aem(dir.path()).args(["env", "use", "staging"]).assert().success();

    let saved = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(saved.contains("active_environment = \"staging\""));
    assert!(saved.contains("https://stage.example.com\""));

    aem(dir.path())
        .args(["config", "get", "active_environment"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"));
}

#[test]
fn test_api_without_url_fails_before_network() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["api", "/content.json"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No active environment URL configured"));
}

#[test]
fn test_https_only_rejects_plaintext() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["env", "set", "dev", "--url", "http://localhost:4502"])
        .assert()
        .success();
    aem(dir.path())
        .args(["api", "/content.json", "--https-only"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("HTTPS enforcement"));
}

#[test]
fn test_config_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["config", "set", "core.editor", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_bulk_requires_paths() {
    let dir = TempDir::new().unwrap();
    aem(dir.path())
        .args(["bulk", "get"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No paths given"));
}
