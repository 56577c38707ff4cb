//
//  aem-cli
//  cli/api.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Direct API access command
//!
//! This command issues a single request against the active AEM environment
//! through the cached, audited transport. It's useful for endpoints that no
//! other command covers and for debugging.
//!
//! ## Examples
//!
//! ```bash
//! # Read a page as JSON (served from cache on repeat calls)
//! aem api /content/site/en.infinity.json
//!
//! # Create a node with POST
//! aem api -X POST /content/site/en/news -F jcr:primaryType=nt:unstructured -F title="Hello"
//!
//! # Move a page
//! aem api -X MOVE /content/site/en/old --destination /content/site/en/new
//!
//! # Upload and download binaries
//! aem api /content/dam/logo.png --upload ./logo.png --content-type image/png
//! aem api /content/dam/logo.png --output ./logo.png
//!
//! # Show cache and audit statistics after the call
//! aem api /content/site/en.json --stats
//! ```

use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use reqwest::Method;
use serde_json::Value;

use crate::api::{client::parse_method, AemClient};
use crate::config::Config;
use crate::context::ContextResolver;
use crate::output::{AuditTrail, OutputWriter};

use super::GlobalOptions;

/// Make direct API requests
#[derive(Args, Debug)]
pub struct ApiCommand {
    /// API path (e.g., /content/site/en.json) or absolute URL
    pub endpoint: String,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE, MOVE, COPY)
    #[arg(long, short = 'X', default_value = "GET")]
    pub method: String,

    /// Request body fields as JSON (key=value, can be nested with dots)
    #[arg(long, short = 'F', action = clap::ArgAction::Append)]
    pub field: Vec<String>,

    /// Raw field values (not JSON-encoded, strings only)
    #[arg(long, action = clap::ArgAction::Append)]
    pub raw_field: Vec<String>,

    /// Read request body from file (- for stdin)
    #[arg(long, short = 'f', conflicts_with = "upload")]
    pub input: Option<String>,

    /// Destination path for MOVE and COPY
    #[arg(long)]
    pub destination: Option<String>,

    /// Upload this file as the request body
    #[arg(long)]
    pub upload: Option<String>,

    /// Content type of the uploaded file
    #[arg(long, default_value = "application/octet-stream")]
    pub content_type: String,

    /// Download the response body to this file
    #[arg(long, short = 'o', conflicts_with = "upload")]
    pub output: Option<String>,

    /// Suppress output (only fail on error)
    #[arg(long)]
    pub silent: bool,

    /// Print cache statistics and the audit trail after the request
    #[arg(long)]
    pub stats: bool,
}

impl ApiCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let config = Config::load()?;
        let ctx = ContextResolver::new(config).resolve(global)?;
        let client = Arc::clone(&ctx.client);

        let response = self.execute(&client).await?;

        let writer = OutputWriter::for_json_flag(global.json);
        if self.stats && writer.is_json() {
            let report = serde_json::json!({
                "response": response,
                "cache": client.cache_stats(),
                "audit": client.audit_log(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if !self.silent {
            if let Some(value) = &response {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
        }

        if self.stats {
            println!();
            writer.write(&client.cache_stats())?;
            println!();
            writer.write(&AuditTrail(client.audit_log()))?;
        }

        Ok(())
    }

    /// Sends the request. Returns `None` when the body went to a file.
    async fn execute(&self, client: &AemClient) -> Result<Option<Value>> {
        if let Some(output) = &self.output {
            let bytes = client.download(&self.endpoint).await?;
            fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output))?;
            if !self.silent {
                eprintln!(
                    "{} Saved {} bytes to {}",
                    style("✓").green(),
                    bytes.len(),
                    output
                );
            }
            return Ok(None);
        }

        if let Some(upload) = &self.upload {
            let data = fs::read(upload).with_context(|| format!("Failed to read {}", upload))?;
            let value = client
                .upload(&self.endpoint, data, &self.content_type)
                .await?;
            return Ok(Some(value));
        }

        let method = parse_method(&self.method)?;
        let verb = method.as_str();
        if verb == "MOVE" || verb == "COPY" {
            let Some(destination) = &self.destination else {
                bail!("{} requires --destination", verb);
            };
            let value = if verb == "MOVE" {
                client.move_to(&self.endpoint, destination).await?
            } else {
                client.copy_to(&self.endpoint, destination).await?
            };
            return Ok(Some(value));
        }

        let body = self.build_body()?;
        if body.is_some() && method == Method::GET {
            bail!("GET requests cannot carry a body; use -X POST");
        }
        Ok(Some(client.request(method, &self.endpoint, body.as_ref()).await?))
    }

    fn build_body(&self) -> Result<Option<Value>> {
        // If input file is specified, read from it
        if let Some(input) = &self.input {
            let content = if input == "-" {
                let mut buffer = String::new();
                std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
                buffer
            } else {
                fs::read_to_string(input)?
            };

            let value: Value = serde_json::from_str(&content)?;
            return Ok(Some(value));
        }

        if self.field.is_empty() && self.raw_field.is_empty() {
            return Ok(None);
        }

        let mut body = serde_json::Map::new();

        for field in &self.field {
            let (key, value) = parse_field(field)?;
            set_nested_value(&mut body, &key, value);
        }

        for field in &self.raw_field {
            let (key, value) = parse_raw_field(field)?;
            set_nested_value(&mut body, &key, Value::String(value));
        }

        Ok(Some(Value::Object(body)))
    }
}

fn parse_field(field: &str) -> Result<(String, Value)> {
    let (key, value_str) = parse_raw_field(field)?;

    // Try to parse as JSON
    let value = if value_str == "true" {
        Value::Bool(true)
    } else if value_str == "false" {
        Value::Bool(false)
    } else if value_str == "null" {
        Value::Null
    } else if let Ok(n) = value_str.parse::<i64>() {
        Value::Number(n.into())
    } else if let Ok(n) = value_str.parse::<f64>() {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::String(value_str.clone()))
    } else if value_str.starts_with('[') || value_str.starts_with('{') {
        serde_json::from_str(&value_str).unwrap_or(Value::String(value_str.clone()))
    } else {
        Value::String(value_str)
    };

    Ok((key, value))
}

fn parse_raw_field(field: &str) -> Result<(String, String)> {
    match field.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Invalid field format: {}. Expected key=value", field),
    }
}

/// Inserts `value` at a dotted key, creating intermediate objects.
fn set_nested_value(obj: &mut serde_json::Map<String, Value>, key: &str, value: Value) {
    match key.split_once('.') {
        None => {
            obj.insert(key.to_string(), value);
        }
        Some((first, rest)) => {
            let entry = obj
                .entry(first.to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            if let Value::Object(nested) = entry {
                set_nested_value(nested, rest, value);
            }
        }
    }
}
