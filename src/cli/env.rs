//
//  aem-cli
//  cli/env.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Environment management commands
//!
//! An environment is a named AEM instance (address plus credential). Exactly
//! one environment is active; every request goes to it unless `--env`
//! selects another.
//!
//! ## Examples
//!
//! ```bash
//! aem env set dev --url http://localhost:4502 --user admin --password admin
//! aem env set prod --url https://author-p1-e2.adobeaemcloud.com --token "$TOKEN" --require-https true
//! aem env use prod
//! aem env list
//! ```

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;
use serde::Serialize;

use crate::auth::Credential;
use crate::config::{normalize_base_url, Config, EnvironmentConfig};
use crate::output::{format_bool, print_field, print_header, OutputWriter, TableBuilder, TableOutput};

use super::GlobalOptions;

/// Manage AEM environments
#[derive(Args, Debug)]
pub struct EnvCommand {
    #[command(subcommand)]
    pub command: EnvSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum EnvSubcommand {
    /// List configured environments
    #[command(visible_alias = "ls")]
    List,

    /// Show one environment (the active one by default)
    Show(ShowArgs),

    /// Make an environment active
    Use(UseArgs),

    /// Create or update an environment
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Environment name
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct UseArgs {
    /// Environment name
    pub name: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Environment name
    pub name: String,

    /// Base address, e.g. https://author-p1-e2.adobeaemcloud.com
    #[arg(long)]
    pub url: Option<String>,

    /// Bearer token
    #[arg(long, conflicts_with = "basic")]
    pub token: Option<String>,

    /// User name for basic authentication
    #[arg(long, requires = "password")]
    pub user: Option<String>,

    /// Password for basic authentication
    #[arg(long, requires = "user")]
    pub password: Option<String>,

    /// Pre-encoded basic-auth blob (base64 of user:password)
    #[arg(long, conflicts_with = "user")]
    pub basic: Option<String>,

    /// Always require HTTPS for this environment (true or false)
    #[arg(long, value_name = "BOOL")]
    pub require_https: Option<bool>,

    /// Remove stored credentials
    #[arg(long, conflicts_with_all = ["token", "user", "basic"])]
    pub clear_auth: bool,
}

/// One environment as shown by `env list` / `env show`.
#[derive(Debug, Serialize)]
struct EnvironmentView {
    name: String,
    active: bool,
    url: Option<String>,
    auth: Option<&'static str>,
    username: Option<String>,
    https_only: bool,
}

impl EnvironmentView {
    fn new(name: &str, env: &EnvironmentConfig, active: &str) -> Self {
        Self {
            name: name.to_string(),
            active: name == active,
            url: env.url.clone(),
            auth: env.credential().as_ref().map(Credential::kind),
            username: env.username.clone(),
            https_only: env.https_only,
        }
    }
}

impl TableOutput for EnvironmentView {
    fn print_table(&self, color: bool) {
        print_header(&format!("Environment: {}", self.name));
        print_field("Active", &format_bool(self.active, color), color);
        print_field("URL", self.url.as_deref().unwrap_or("-"), color);
        print_field("Auth", self.auth.unwrap_or("none"), color);
        print_field("User", self.username.as_deref().unwrap_or("-"), color);
        print_field("HTTPS only", &format_bool(self.https_only, color), color);
    }
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct EnvironmentList(Vec<EnvironmentView>);

impl TableOutput for EnvironmentList {
    fn print_table(&self, color: bool) {
        TableBuilder::new()
            .color(color)
            .headers(["", "Name", "URL", "Auth", "HTTPS only"])
            .rows(self.0.iter().map(|env| {
                [
                    if env.active { "*" } else { "" }.to_string(),
                    env.name.clone(),
                    env.url.clone().unwrap_or_else(|| "-".to_string()),
                    env.auth.unwrap_or("none").to_string(),
                    format_bool(env.https_only, color),
                ]
            }))
            .print();
    }
}

impl EnvCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        match &self.command {
            EnvSubcommand::List => self.list(global),
            EnvSubcommand::Show(args) => self.show(args, global),
            EnvSubcommand::Use(args) => self.use_env(args, global),
            EnvSubcommand::Set(args) => self.set(args, global),
        }
    }

    fn list(&self, global: &GlobalOptions) -> Result<()> {
        let config = Config::load()?;
        let active = global.env.as_deref().unwrap_or(&config.active_environment);
        let list = EnvironmentList(
            config
                .environments
                .iter()
                .map(|(name, env)| EnvironmentView::new(name, env, active))
                .collect(),
        );
        OutputWriter::for_json_flag(global.json).write(&list)
    }

    fn show(&self, args: &ShowArgs, global: &GlobalOptions) -> Result<()> {
        let config = Config::load()?;
        let active = global.env.as_deref().unwrap_or(&config.active_environment);
        let name = args.name.as_deref().unwrap_or(active);

        let Some(env) = config.environment(name) else {
            bail!("Environment '{}' is not configured", name);
        };
        OutputWriter::for_json_flag(global.json).write(&EnvironmentView::new(name, env, active))
    }

    fn use_env(&self, args: &UseArgs, global: &GlobalOptions) -> Result<()> {
        let mut config = Config::load()?;
        let existed = config.set_active_environment(&args.name);
        config.save()?;

        let writer = OutputWriter::for_json_flag(global.json);
        if writer.is_json() {
            println!(
                "{}",
                serde_json::json!({ "active_environment": args.name, "created": !existed })
            );
        } else {
            if !existed {
                writer.write_warning(&format!(
                    "Environment '{}' was not configured; created an empty entry",
                    args.name
                ));
            }
            writer.write_success(&format!("Switched to {}", style(&args.name).cyan()));
        }
        Ok(())
    }

    fn set(&self, args: &SetArgs, global: &GlobalOptions) -> Result<()> {
        let mut config = Config::load()?;
        apply_settings(config.environment_mut(&args.name), args)?;
        config.save()?;

        let writer = OutputWriter::for_json_flag(global.json);
        if writer.is_json() {
            let view = EnvironmentView::new(
                &args.name,
                &config.environments[&args.name],
                &config.active_environment,
            );
            writer.write(&view)?;
        } else {
            writer.write_success(&format!("Updated environment {}", style(&args.name).cyan()));
        }
        Ok(())
    }
}

fn apply_settings(env: &mut EnvironmentConfig, args: &SetArgs) -> Result<()> {
    if let Some(url) = &args.url {
        let url = normalize_base_url(url);
        if url::Url::parse(&url).is_err() {
            bail!("Invalid URL: {}", url);
        }
        env.url = Some(url);
    }

    if args.clear_auth {
        env.access_token = None;
        env.basic_auth = None;
        env.username = None;
    }

    if let Some(token) = &args.token {
        env.access_token = Some(token.clone());
        env.basic_auth = None;
    }

    if let (Some(user), Some(password)) = (&args.user, &args.password) {
        env.basic_auth = Some(Credential::basic(user, password).secret().to_string());
        env.username = Some(user.clone());
    }

    if let Some(blob) = &args.basic {
        env.basic_auth = Some(blob.clone());
    }

    if let Some(require_https) = args.require_https {
        env.https_only = require_https;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Commands};

    fn set_args(argv: &[&str]) -> SetArgs {
        let mut full = vec!["aem", "env", "set"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Env(EnvCommand {
                command: EnvSubcommand::Set(args),
            }) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_set_basic_credentials() {
        let mut env = EnvironmentConfig::default();
        let args = set_args(&["dev", "--url", "http://localhost:4502/", "--user", "admin", "--password", "admin"]);
        apply_settings(&mut env, &args).unwrap();

        assert_eq!(env.url.as_deref(), Some("http://localhost:4502"));
        assert_eq!(env.basic_auth.as_deref(), Some("YWRtaW46YWRtaW4="));
        assert_eq!(env.username.as_deref(), Some("admin"));
    }

    #[test]
    fn test_token_replaces_basic() {
        let mut env = EnvironmentConfig {
            basic_auth: Some("blob".to_string()),
            ..Default::default()
        };
        apply_settings(&mut env, &set_args(&["prod", "--token", "abc"])).unwrap();
        assert_eq!(env.credential(), Some(Credential::bearer("abc")));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let mut env = EnvironmentConfig::default();
        assert!(apply_settings(&mut env, &set_args(&["x", "--url", "not a url"])).is_err());
    }

    #[test]
    fn test_user_requires_password() {
        assert!(Cli::try_parse_from(["aem", "env", "set", "dev", "--user", "admin"]).is_err());
    }
}
