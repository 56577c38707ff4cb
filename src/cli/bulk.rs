//
//  aem-cli
//  cli/bulk.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Bulk request command
//!
//! Runs one request per path through the bounded-concurrency executor and
//! prints a per-path report followed by aggregate statistics.
//!
//! ## Examples
//!
//! ```bash
//! # Warm the cache for a list of pages, eight at a time
//! aem bulk get /content/site/en.json /content/site/de.json -c 8
//!
//! # Delete every path listed in a file, in paced batches of 20
//! aem bulk delete --file obsolete.txt --batches --batch-size 20
//!
//! # POST the same body to many paths
//! aem bulk post --file pages.txt --body '{"cmd":"activate"}'
//! ```
//!
//! Ctrl-C stops batched runs at the next pause and cancels in-flight work
//! after the configured grace period.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;

use crate::api::AemClient;
use crate::config::Config;
use crate::context::ContextResolver;
use crate::operations::{BulkExecutor, BulkOperation, BulkResultHandler, OperationError};
use crate::output::{AuditTrail, BulkReport, OutputWriter};

use super::GlobalOptions;

/// Request issued for every path
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulkAction {
    /// Cached GET
    Get,
    /// DELETE
    Delete,
    /// POST with --body
    Post,
}

/// Run a request against many paths concurrently
#[derive(Args, Debug)]
pub struct BulkCommand {
    /// Request to issue
    #[arg(value_enum)]
    pub action: BulkAction,

    /// Paths to operate on
    pub paths: Vec<String>,

    /// Read additional paths from a file, one per line (# starts a comment)
    #[arg(long, short = 'f')]
    pub file: Option<String>,

    /// JSON body for POST
    #[arg(long)]
    pub body: Option<String>,

    /// Maximum requests in flight
    #[arg(long, short = 'c')]
    pub concurrency: Option<usize>,

    /// Run in sequential batches with a pause between them
    #[arg(long)]
    pub batches: bool,

    /// Paths per batch (implies --batches)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print cache statistics and the audit trail after the run
    #[arg(long)]
    pub stats: bool,
}

/// Advances a progress bar as items settle.
struct ProgressHandler {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl ProgressHandler {
    fn new(total: usize, visible: bool) -> Result<Self> {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Ok(Self {
            bar,
            failures: AtomicUsize::new(0),
        })
    }
}

impl BulkResultHandler<Value> for ProgressHandler {
    fn on_success(&self, _result: &Value, _index: usize) {
        self.bar.inc(1);
    }

    fn on_error(&self, _error: &OperationError, _index: usize) {
        let failures = self.failures.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.set_message(format!("{failures} failed"));
        self.bar.inc(1);
    }
}

impl BulkCommand {
    pub async fn run(&self, global: &GlobalOptions) -> Result<()> {
        let targets = self.collect_paths()?;
        if targets.is_empty() {
            bail!("No paths given. Pass paths as arguments or with --file");
        }
        let body = self.parse_body()?;

        let config = Config::load()?;
        let ctx = ContextResolver::new(config).resolve(global)?;
        let executor = ctx.executor();
        self.configure(&executor);

        let operations = build_operations(self.action, &ctx.client, &targets, body);
        let writer = OutputWriter::for_json_flag(global.json);
        let handler = Arc::new(ProgressHandler::new(targets.len(), !writer.is_json())?);

        let watcher = spawn_interrupt_watcher(executor.clone());

        let run = if self.batches || self.batch_size.is_some() {
            executor
                .execute_in_batches_with_handler(operations, handler.clone())
                .await
        } else {
            executor
                .execute_bulk_with_handler(operations, handler.clone())
                .await
        };
        handler.bar.finish_and_clear();
        watcher.abort();
        executor.shutdown().await;

        let results = run?;
        let report = BulkReport::new(&targets, &results);

        if self.stats && writer.is_json() {
            let combined = serde_json::json!({
                "report": report,
                "cache": ctx.client.cache_stats(),
                "audit": ctx.client.audit_log(),
            });
            println!("{}", serde_json::to_string_pretty(&combined)?);
        } else {
            writer.write(&report)?;
            if self.stats {
                println!();
                writer.write(&ctx.client.cache_stats())?;
                println!();
                writer.write(&AuditTrail(ctx.client.audit_log()))?;
            }
        }

        if results.len() < targets.len() {
            bail!(
                "Interrupted after {} of {} operations",
                results.len(),
                targets.len()
            );
        }
        if report.has_failures() {
            bail!(
                "{} of {} operations failed",
                report.statistics.error_count,
                report.statistics.total
            );
        }
        Ok(())
    }

    fn configure(&self, executor: &BulkExecutor) {
        if let Some(concurrency) = self.concurrency {
            executor.set_max_concurrent(concurrency);
        }
        if let Some(batch_size) = self.batch_size {
            executor.set_batch_size(batch_size);
        }
        if let Some(timeout) = self.timeout {
            executor.set_task_timeout(std::time::Duration::from_secs(timeout));
        }
    }

    fn collect_paths(&self) -> Result<Vec<String>> {
        let mut paths = self.paths.clone();
        if let Some(file) = &self.file {
            let content =
                fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
            paths.extend(parse_path_list(&content));
        }
        Ok(paths)
    }

    fn parse_body(&self) -> Result<Option<Value>> {
        match (self.action, &self.body) {
            (BulkAction::Post, Some(body)) => Ok(Some(
                serde_json::from_str(body).context("--body is not valid JSON")?,
            )),
            (BulkAction::Post, None) => Ok(Some(Value::Object(Default::default()))),
            (_, Some(_)) => bail!("--body is only valid with post"),
            (_, None) => Ok(None),
        }
    }
}

/// Non-empty, non-comment lines of a path list.
fn parse_path_list(content: &str) -> impl Iterator<Item = String> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
}

fn build_operations(
    action: BulkAction,
    client: &Arc<AemClient>,
    targets: &[String],
    body: Option<Value>,
) -> Vec<BulkOperation<Value>> {
    let body = Arc::new(body.unwrap_or(Value::Null));
    targets
        .iter()
        .map(|path| {
            let client = Arc::clone(client);
            let body = Arc::clone(&body);
            let path = path.clone();
            BulkOperation::new(async move {
                let value = match action {
                    BulkAction::Get => client.get(&path).await?,
                    BulkAction::Delete => client.delete(&path).await?,
                    BulkAction::Post => client.post(&path, body.as_ref()).await?,
                };
                Ok(value)
            })
        })
        .collect()
}

/// Interrupts the executor on Ctrl-C.
fn spawn_interrupt_watcher(executor: BulkExecutor) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, finishing in-flight requests...");
            executor.interrupt_handle().cancel();
            executor.shutdown().await;
        }
    })
}
