//
//  aem-cli
//  cli/config.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! CLI configuration commands
//!
//! This module provides commands for reading and changing the settings that
//! shape the transport, the bulk executor and the job poller. Keys are
//! dotted, e.g. `cache.ttl_seconds` or `bulk.max_concurrent`.
//! Environments are managed with `aem env` instead.

use std::process::Command;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;

use crate::config::{config_file_path, Config};

use super::GlobalOptions;

/// Manage CLI configuration
#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get a configuration value
    Get(GetArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// List all configuration values
    #[command(visible_alias = "ls")]
    List,

    /// Open configuration in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Configuration key
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Configuration key
    pub key: String,

    /// Configuration value
    pub value: String,
}

impl ConfigCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        match &self.command {
            ConfigSubcommand::Get(args) => self.get(args, global),
            ConfigSubcommand::Set(args) => self.set(args, global),
            ConfigSubcommand::List => self.list(global),
            ConfigSubcommand::Edit => self.edit(global),
            ConfigSubcommand::Path => self.path(global),
        }
    }

    /// Get a configuration value
    fn get(&self, args: &GetArgs, global: &GlobalOptions) -> Result<()> {
        let config = Config::load()?;

        let Some(value) = config.get(&args.key) else {
            bail!(
                "Unknown configuration key '{}'. Valid keys: {}",
                args.key,
                Config::keys().join(", ")
            );
        };

        if global.json {
            let result = serde_json::json!({
                "key": args.key,
                "value": value,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", value);
        }

        Ok(())
    }

    /// Set a configuration value
    fn set(&self, args: &SetArgs, global: &GlobalOptions) -> Result<()> {
        let mut config = Config::load()?;
        if !Config::keys().contains(&args.key.as_str()) {
            bail!(
                "Unknown configuration key '{}'. Valid keys: {}",
                args.key,
                Config::keys().join(", ")
            );
        }
        config.set(&args.key, &args.value)?;
        config.save()?;

        if global.json {
            let result = serde_json::json!({
                "success": true,
                "key": args.key,
                "value": args.value,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!(
                "{} Set {} = {}",
                style("✓").green(),
                style(&args.key).cyan(),
                args.value
            );
        }

        Ok(())
    }

    /// List all configuration values
    fn list(&self, global: &GlobalOptions) -> Result<()> {
        let config = Config::load()?;
        let pairs: Vec<(&str, String)> = Config::keys()
            .iter()
            .filter_map(|key| config.get(key).map(|value| (*key, value)))
            .collect();

        if global.json {
            let map: serde_json::Map<String, serde_json::Value> = pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), serde_json::Value::String(value)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
            return Ok(());
        }

        println!();
        println!("{}", style("Configuration").bold());
        println!("{}", "-".repeat(50));
        for (key, value) in &pairs {
            println!("  {}: {}", style(key).cyan(), value);
        }
        println!();
        Ok(())
    }

    /// Open configuration in editor
    fn edit(&self, global: &GlobalOptions) -> Result<()> {
        let config_path = config_file_path()?;

        // Ensure config file exists
        if !config_path.exists() {
            Config::load()?.save()?;
        }

        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| {
                if cfg!(target_os = "windows") {
                    "notepad".to_string()
                } else {
                    "vi".to_string()
                }
            });

        if global.json {
            let result = serde_json::json!({
                "action": "edit",
                "path": config_path.display().to_string(),
                "editor": editor,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }

        println!(
            "{} Opening {} in {}...",
            style("→").cyan(),
            config_path.display(),
            editor
        );

        // "code --wait" style editors carry their own arguments
        let parts: Vec<&str> = editor.split_whitespace().collect();
        let (cmd, cmd_args) = parts
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("Invalid editor command"))?;

        let status = Command::new(cmd)
            .args(cmd_args)
            .arg(&config_path)
            .status()?;

        if !status.success() {
            bail!("Editor exited with non-zero status");
        }

        // Surface syntax errors now rather than on the next request
        Config::load()?;
        println!("{} Configuration saved.", style("✓").green());
        Ok(())
    }

    /// Show configuration file path
    fn path(&self, global: &GlobalOptions) -> Result<()> {
        let config_path = config_file_path()?;

        if global.json {
            let result = serde_json::json!({
                "path": config_path.display().to_string(),
                "exists": config_path.exists(),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            println!("{}", config_path.display());
        }

        Ok(())
    }
}
