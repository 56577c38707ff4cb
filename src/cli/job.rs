//
//  aem-cli
//  cli/job.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Long-running job command
//!
//! Starts a server-side job with a POST and follows its status location
//! until a completion value shows up, the job reports an error, or the
//! timeout runs out.
//!
//! ## Examples
//!
//! ```bash
//! aem job /bin/asynccommand --until status=COMPLETED,SUCCEEDED
//! aem job /etc/packages/site.zip/install --body '{"cmd":"install"}' \
//!     --until state=FINISHED --interval-ms 500 --timeout-ms 600000
//! ```

use anyhow::{bail, Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::context::ContextResolver;
use crate::operations::field_in;

use super::GlobalOptions;

/// Start a server-side job and poll it to completion
#[derive(Args, Debug)]
pub struct JobCommand {
    /// Endpoint that starts the job
    pub path: String,

    /// Completion condition as FIELD=VALUE[,VALUE...]
    #[arg(long, default_value = "status=COMPLETED")]
    pub until: String,

    /// JSON body for the submission (defaults to {})
    #[arg(long)]
    pub body: Option<String>,

    /// Delay between status checks in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Give up after this many milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

/// Splits `FIELD=VALUE[,VALUE...]`.
fn parse_until(until: &str) -> Result<(String, Vec<String>)> {
    let Some((field, values)) = until.split_once('=') else {
        bail!("Invalid --until '{}'. Expected FIELD=VALUE[,VALUE...]", until);
    };
    let field = field.trim();
    let values: Vec<String> = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if field.is_empty() || values.is_empty() {
        bail!("Invalid --until '{}'. Expected FIELD=VALUE[,VALUE...]", until);
    }
    Ok((field.to_string(), values))
}

impl JobCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let (field, values) = parse_until(&self.until)?;
        let accepted: Vec<&str> = values.iter().map(String::as_str).collect();
        let condition = field_in(&field, &accepted);

        let body: Value = match &self.body {
            Some(body) => serde_json::from_str(body).context("--body is not valid JSON")?,
            None => Value::Object(Default::default()),
        };

        let config = Config::load()?;
        let ctx = ContextResolver::new(config).resolve(global)?;
        let mut poller = ctx.poller();
        if let Some(interval) = self.interval_ms {
            poller.set_poll_interval_ms(interval);
        }
        if let Some(timeout) = self.timeout_ms {
            poller.set_timeout_ms(timeout);
        }

        let spinner = if global.json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.enable_steady_tick(std::time::Duration::from_millis(120));
        spinner.set_message(format!("Submitting {}", self.path));

        let progress = |label: &str| spinner.set_message(format!("Status: {label}"));

        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        let outcome = poller
            .submit_and_poll(&self.path, &body, &condition, Some(&progress), Some(&cancel))
            .await;
        watcher.abort();
        spinner.finish_and_clear();

        let payload = outcome?;
        if global.json {
            println!("{}", serde_json::to_string_pretty(&payload)?);
        } else {
            let label = payload
                .get(&field)
                .and_then(Value::as_str)
                .unwrap_or("done");
            println!(
                "{} Job finished: {}",
                style("✓").green(),
                style(label).cyan()
            );
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_until() {
        let (field, values) = parse_until("status=COMPLETED, SUCCEEDED").unwrap();
        assert_eq!(field, "status");
        assert_eq!(values, vec!["COMPLETED", "SUCCEEDED"]);
    }

    #[test]
    fn test_parse_until_rejects_malformed() {
        assert!(parse_until("status").is_err());
        assert!(parse_until("=DONE").is_err());
        assert!(parse_until("status=").is_err());
    }
}
