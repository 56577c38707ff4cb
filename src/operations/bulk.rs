//
//  aem-cli
//  operations/bulk.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Bulk Execution
//!
//! Runs many independent, fallible operations with bounded concurrency and
//! returns exactly one [`BulkResult`] per input, in input order.
//!
//! ## Guarantees
//!
//! | Property | Behaviour |
//! |----------|-----------|
//! | Count | `results.len() == operations.len()` for every completed run |
//! | Identity | `results[i].index == i` (offset by batch position in batched runs) |
//! | Isolation | An error, timeout or panic in one operation never affects its siblings |
//! | Concurrency | At most `max_concurrent` operations run at once |
//!
//! Operations are tokio tasks gated by a shared [`Semaphore`]. Each operation
//! gets a ceiling (`task_timeout`, 60s by default) once it holds a permit;
//! exceeding it turns that item into [`OperationError::TimedOut`] with its
//! original index intact.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aem_cli::api::AemClient;
//! use aem_cli::config::Connection;
//! use aem_cli::operations::{BulkExecutor, BulkOperation};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = Arc::new(AemClient::new(Connection::new("http://localhost:4502"))?);
//! let executor = BulkExecutor::new();
//!
//! let operations = ["/content/a.json", "/content/b.json"]
//!     .into_iter()
//!     .map(|path| {
//!         let client = Arc::clone(&client);
//!         BulkOperation::new(async move { Ok(client.get(path).await?) })
//!     })
//!     .collect();
//!
//! let results = executor.execute_bulk(operations).await?;
//! println!("{}", BulkExecutor::statistics(&results));
//! # Ok(())
//! # }
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Default number of operations per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default number of operations running at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Executor settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_concurrent: usize,
    pub batch_size: usize,
    /// Pause between batches in [`BulkExecutor::execute_in_batches`].
    pub batch_delay: Duration,
    /// Ceiling for a single operation once it starts running.
    pub task_timeout: Duration,
    /// How long [`BulkExecutor::shutdown`] waits before cancelling stragglers.
    pub shutdown_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(100),
            task_timeout: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(30),
        }
    }
}

/// Why a single bulk item did not produce a value.
#[derive(Debug, Error)]
pub enum OperationError {
    /// The operation returned an error.
    #[error("{0:#}")]
    Failed(anyhow::Error),

    /// The operation exceeded the per-task ceiling.
    #[error("Operation timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    /// The operation panicked.
    #[error("Operation panicked: {0}")]
    Panicked(String),

    /// The executor was shut down before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,
}

impl OperationError {
    /// Short label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failed(_) => "failed",
            Self::TimedOut(_) => "timed out",
            Self::Panicked(_) => "panicked",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Errors that prevent a bulk run from starting at all.
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Bulk executor has been shut down")]
    ShutDown,
}

type OperationFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'static>>;

/// One unit of work for the executor.
///
/// Wraps any `Send` future resolving to `anyhow::Result<T>`. Nothing runs
/// until the executor polls it.
pub struct BulkOperation<T> {
    future: OperationFuture<T>,
}

impl<T> BulkOperation<T> {
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            future: Box::pin(future),
        }
    }
}

impl<T> fmt::Debug for BulkOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BulkOperation")
    }
}

/// Outcome of one operation, tagged with its position in the input.
#[derive(Debug)]
pub struct BulkResult<T> {
    pub index: usize,
    pub outcome: Result<T, OperationError>,
}

impl<T> BulkResult<T> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.outcome.as_ref().err()
    }
}

/// Per-item callbacks, invoked as each operation settles.
///
/// Both methods default to no-ops so implementors override only what they
/// need. Callbacks run on executor tasks and must not block.
pub trait BulkResultHandler<T>: Send + Sync {
    fn on_success(&self, _result: &T, _index: usize) {}

    fn on_error(&self, _error: &OperationError, _index: usize) {}
}

/// Aggregate counts over a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BulkStatistics {
    pub total: usize,
    pub success_count: usize,
    pub error_count: usize,
}

impl BulkStatistics {
    /// Percentage of successful items, `0.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total as f64 * 100.0
    }
}

impl fmt::Display for BulkStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BulkStatistics{{total={}, success={}, errors={}, successRate={:.2}%}}",
            self.total,
            self.success_count,
            self.error_count,
            self.success_rate()
        )
    }
}

struct Settings {
    max_concurrent: usize,
    batch_size: usize,
    task_timeout: Duration,
    semaphore: Arc<Semaphore>,
}

struct Inner {
    settings: RwLock<Settings>,
    batch_delay: Duration,
    shutdown_grace: Duration,
    tracker: TaskTracker,
    interrupt: Mutex<CancellationToken>,
    force_cancel: CancellationToken,
    shut_down: AtomicBool,
}

/// Bounded-concurrency runner for independent operations.
///
/// Cloning is cheap; clones share the worker pool, settings and shutdown
/// state.
#[derive(Clone)]
pub struct BulkExecutor {
    inner: Arc<Inner>,
}

impl Default for BulkExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkExecutor {
    /// Creates an executor with default settings.
    pub fn new() -> Self {
        Self::with_config(ExecutorConfig::default())
    }

    /// Creates an executor from explicit settings. Zero sizes are raised to 1.
    pub fn with_config(config: ExecutorConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            inner: Arc::new(Inner {
                settings: RwLock::new(Settings {
                    max_concurrent,
                    batch_size: config.batch_size.max(1),
                    task_timeout: config.task_timeout,
                    semaphore: Arc::new(Semaphore::new(max_concurrent)),
                }),
                batch_delay: config.batch_delay,
                shutdown_grace: config.shutdown_grace,
                tracker: TaskTracker::new(),
                interrupt: Mutex::new(CancellationToken::new()),
                force_cancel: CancellationToken::new(),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    /// Runs every operation concurrently and returns one result per input.
    ///
    /// # Errors
    ///
    /// Only [`BulkError::ShutDown`]. Item failures are reported in the results.
    pub async fn execute_bulk<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.run(operations, 0, None).await
    }

    /// Like [`execute_bulk`](Self::execute_bulk), notifying `handler` as each
    /// item settles.
    pub async fn execute_bulk_with_handler<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
        handler: Arc<dyn BulkResultHandler<T>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.run(operations, 0, Some(handler)).await
    }

    /// Runs the operations in sequential chunks of `batch_size`, pausing
    /// between chunks.
    ///
    /// Cancelling the [`interrupt_handle`](Self::interrupt_handle) during a
    /// pause abandons the remaining chunks and returns what has completed.
    /// Indices refer to positions in the full input.
    pub async fn execute_in_batches<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.run_batches(operations, None).await
    }

    /// Batched run with per-item callbacks.
    pub async fn execute_in_batches_with_handler<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
        handler: Arc<dyn BulkResultHandler<T>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.run_batches(operations, Some(handler)).await
    }

    /// Starts a bulk run in the background and hands the full result list to
    /// `callback` when it finishes. Returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn execute_bulk_async<T, F>(
        &self,
        operations: Vec<BulkOperation<T>>,
        callback: F,
    ) -> Result<JoinHandle<()>, BulkError>
    where
        T: Send + 'static,
        F: FnOnce(Vec<BulkResult<T>>) + Send + 'static,
    {
        self.ensure_running()?;
        let executor = self.clone();
        Ok(self.inner.tracker.spawn(async move {
            match executor.execute_bulk(operations).await {
                Ok(results) => callback(results),
                Err(e) => tracing::error!("Async bulk operation failed: {}", e),
            }
        }))
    }

    /// Aggregates a result list.
    pub fn statistics<T>(results: &[BulkResult<T>]) -> BulkStatistics {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        BulkStatistics {
            total: results.len(),
            success_count,
            error_count: results.len() - success_count,
        }
    }

    /// Changes the chunk size for later batched runs.
    pub fn set_batch_size(&self, batch_size: usize) {
        self.write_settings().batch_size = batch_size.max(1);
    }

    /// Resizes the worker pool. Runs already in progress keep their old limit.
    pub fn set_max_concurrent(&self, max_concurrent: usize) {
        let max_concurrent = max_concurrent.max(1);
        let mut settings = self.write_settings();
        settings.max_concurrent = max_concurrent;
        settings.semaphore = Arc::new(Semaphore::new(max_concurrent));
    }

    /// Changes the per-operation ceiling for later runs.
    pub fn set_task_timeout(&self, timeout: Duration) {
        self.write_settings().task_timeout = timeout;
    }

    pub fn batch_size(&self) -> usize {
        self.read_settings().batch_size
    }

    pub fn max_concurrent(&self) -> usize {
        self.read_settings().max_concurrent
    }

    /// Token that interrupts the current batched runs at their next pause.
    ///
    /// Each interrupt ends with the run it stopped; later runs get a fresh
    /// token.
    pub fn interrupt_handle(&self) -> CancellationToken {
        self.lock_interrupt().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    /// Stops accepting work, waits up to the grace period for in-flight
    /// operations, then cancels whatever is still running.
    ///
    /// Cancelled operations surface as [`OperationError::Cancelled`] in the
    /// results of the runs they belonged to.
    pub async fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        self.inner.tracker.close();

        let grace = self.inner.shutdown_grace;
        if tokio::time::timeout(grace, self.inner.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} bulk operation(s) still running after {:?}, cancelling",
                self.inner.tracker.len(),
                grace
            );
            self.inner.force_cancel.cancel();
            self.inner.tracker.wait().await;
        }
    }

    fn ensure_running(&self) -> Result<(), BulkError> {
        if self.is_shut_down() {
            return Err(BulkError::ShutDown);
        }
        Ok(())
    }

    fn lock_interrupt(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.inner.interrupt.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current interrupt token, replacing it first if an earlier run
    /// consumed it.
    fn begin_interruptible(&self) -> CancellationToken {
        let mut current = self.lock_interrupt();
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
        current.clone()
    }

    fn end_interruptible(&self, token: &CancellationToken) {
        if token.is_cancelled() {
            let mut current = self.lock_interrupt();
            if current.is_cancelled() {
                *current = CancellationToken::new();
            }
        }
    }

    fn read_settings(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.inner.settings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_settings(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.inner.settings.write().unwrap_or_else(|e| e.into_inner())
    }

    async fn run_batches<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
        handler: Option<Arc<dyn BulkResultHandler<T>>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.ensure_running()?;

        let total = operations.len();
        let batch_size = self.batch_size();
        let mut remaining = operations.into_iter();
        let mut results = Vec::with_capacity(total);
        let interrupt = self.begin_interruptible();

        while results.len() < total {
            let offset = results.len();
            let batch: Vec<_> = remaining.by_ref().take(batch_size).collect();
            let end = offset + batch.len();

            if self.is_shut_down() {
                tracing::warn!("Executor shut down, abandoning operations {}-{}", offset, total);
                break;
            }

            tracing::info!("Executing batch {}-{} of {}", offset, end, total);
            let batch_results = match self.run(batch, offset, handler.clone()).await {
                Ok(batch_results) => batch_results,
                Err(e) => {
                    self.end_interruptible(&interrupt);
                    return Err(e);
                }
            };
            results.extend(batch_results);

            if end < total {
                tokio::select! {
                    _ = tokio::time::sleep(self.inner.batch_delay) => {}
                    _ = interrupt.cancelled() => {
                        tracing::warn!(
                            "Batch execution interrupted after {} of {} operations",
                            end,
                            total
                        );
                        break;
                    }
                }
            }
        }

        self.end_interruptible(&interrupt);
        Ok(results)
    }

    async fn run<T: Send + 'static>(
        &self,
        operations: Vec<BulkOperation<T>>,
        offset: usize,
        handler: Option<Arc<dyn BulkResultHandler<T>>>,
    ) -> Result<Vec<BulkResult<T>>, BulkError> {
        self.ensure_running()?;

        let (semaphore, task_timeout) = {
            let settings = self.read_settings();
            (Arc::clone(&settings.semaphore), settings.task_timeout)
        };

        let handles: Vec<_> = operations
            .into_iter()
            .enumerate()
            .map(|(i, operation)| {
                let index = offset + i;
                let semaphore = Arc::clone(&semaphore);
                let cancel = self.inner.force_cancel.clone();
                let handler = handler.clone();

                self.inner.tracker.spawn(async move {
                    let outcome =
                        run_operation(operation, semaphore, cancel, task_timeout).await;
                    match (&outcome, &handler) {
                        (Ok(value), Some(handler)) => handler.on_success(value, index),
                        (Err(error), Some(handler)) => handler.on_error(error, index),
                        _ => {}
                    }
                    if let Err(error) = &outcome {
                        tracing::debug!("Bulk operation {} failed: {}", index, error);
                    }
                    outcome
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (i, handle) in handles.into_iter().enumerate() {
            let index = offset + i;
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => {
                    let error = OperationError::Panicked(panic_message(e.into_panic()));
                    tracing::error!("Bulk operation {} panicked: {}", index, error);
                    if let Some(handler) = &handler {
                        handler.on_error(&error, index);
                    }
                    Err(error)
                }
                Err(_) => Err(OperationError::Cancelled),
            };
            results.push(BulkResult { index, outcome });
        }

        Ok(results)
    }
}

async fn run_operation<T>(
    operation: BulkOperation<T>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    task_timeout: Duration,
) -> Result<T, OperationError> {
    let _permit = tokio::select! {
        permit = semaphore.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return Err(OperationError::Cancelled),
        },
        _ = cancel.cancelled() => return Err(OperationError::Cancelled),
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(OperationError::Cancelled),
        outcome = tokio::time::timeout(task_timeout, operation.future) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OperationError::Failed(e)),
            Err(_) => Err(OperationError::TimedOut(task_timeout)),
        },
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Instant;

    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn ok(value: usize) -> BulkOperation<usize> {
        BulkOperation::new(async move { Ok(value) })
    }

    fn failing(message: &'static str) -> BulkOperation<usize> {
        BulkOperation::new(async move { anyhow::bail!(message) })
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            batch_delay: Duration::from_millis(5),
            shutdown_grace: Duration::from_millis(50),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_results_match_inputs_in_order() {
        let executor = BulkExecutor::new();
        let operations = (0..20)
            .map(|i| {
                if i % 3 == 0 {
                    failing("boom")
                } else {
                    BulkOperation::new(async move {
                        // Later inputs finish first.
                        tokio::time::sleep(Duration::from_millis(40 - 2 * i as u64)).await;
                        Ok(i * 10)
                    })
                }
            })
            .collect();

        let results = assert_ok!(executor.execute_bulk(operations).await);
        assert_eq!(results.len(), 20);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
            if i % 3 == 0 {
                assert!(result.error().is_some());
            } else {
                assert_eq!(result.result(), Some(&(i * 10)));
            }
        }
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let executor = BulkExecutor::new();
        let results = executor
            .execute_bulk(vec![ok(1), failing("second failed"), ok(3)])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].result(), Some(&1));
        assert_eq!(results[2].result(), Some(&3));
        let error = results[1].error().unwrap();
        assert!(matches!(error, OperationError::Failed(_)));
        assert_eq!(error.to_string(), "second failed");
    }

    #[tokio::test]
    async fn test_panics_are_captured() {
        let executor = BulkExecutor::new();
        let results = executor
            .execute_bulk(vec![
                ok(1),
                BulkOperation::new(async { panic!("kaboom") }),
                ok(3),
            ])
            .await
            .unwrap();

        assert!(results[0].is_success());
        assert!(results[2].is_success());
        match results[1].error() {
            Some(OperationError::Panicked(message)) => assert_eq!(message, "kaboom"),
            other => panic!("expected panic error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_task_timeout_keeps_index() {
        let executor = BulkExecutor::with_config(ExecutorConfig {
            task_timeout: Duration::from_millis(30),
            ..fast_config()
        });
        let results = executor
            .execute_bulk(vec![
                ok(0),
                BulkOperation::new(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(1)
                }),
                ok(2),
            ])
            .await
            .unwrap();

        assert_eq!(results[1].index, 1);
        assert!(matches!(results[1].error(), Some(OperationError::TimedOut(_))));
        assert!(results[0].is_success() && results[2].is_success());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = BulkExecutor::with_config(ExecutorConfig {
            max_concurrent: 3,
            ..fast_config()
        });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let operations = (0..12)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                BulkOperation::new(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(15)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        let results = executor.execute_bulk(operations).await.unwrap();
        assert_eq!(results.len(), 12);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_set_max_concurrent_applies_to_next_run() {
        let executor = BulkExecutor::with_config(fast_config());
        executor.set_max_concurrent(1);
        assert_eq!(executor.max_concurrent(), 1);

        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let operations = (0..4)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                BulkOperation::new(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(i)
                })
            })
            .collect();

        executor.execute_bulk(operations).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    /// Records which operations were started together by tagging each with
    /// the batch-start counter value.
    async fn batch_count(batch_size: usize) -> (usize, usize) {
        let executor = BulkExecutor::with_config(fast_config());
        executor.set_batch_size(batch_size);

        let starts = Arc::new(Mutex::new(Vec::new()));
        let origin = Instant::now();
        let operations = (0..6)
            .map(|i| {
                let starts = Arc::clone(&starts);
                BulkOperation::new(async move {
                    starts.lock().unwrap().push(origin.elapsed());
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(i)
                })
            })
            .collect();

        let results = executor.execute_in_batches(operations).await.unwrap();
        let indices: Vec<_> = results.iter().map(|r| r.index).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());

        // Operations in the same batch start within a few ms of each other;
        // separate batches are at least the operation duration apart.
        let mut starts = starts.lock().unwrap().clone();
        starts.sort();
        let groups = 1 + starts
            .windows(2)
            .filter(|w| w[1] - w[0] >= Duration::from_millis(15))
            .count();
        (results.len(), groups)
    }

    #[tokio::test]
    async fn test_batches_of_two_and_three() {
        assert_eq!(batch_count(2).await, (6, 3));
        assert_eq!(batch_count(3).await, (6, 2));
    }

    #[tokio::test]
    async fn test_interrupt_during_pause_returns_partial_results() {
        let executor = BulkExecutor::with_config(ExecutorConfig {
            batch_size: 2,
            batch_delay: Duration::from_secs(5),
            ..fast_config()
        });
        let interrupt = executor.interrupt_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.cancel();
        });

        let started = Instant::now();
        let results = executor
            .execute_in_batches((0..6).map(ok).collect())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_interrupt_does_not_carry_into_next_run() {
        let executor = BulkExecutor::with_config(ExecutorConfig {
            batch_size: 2,
            batch_delay: Duration::from_millis(200),
            ..fast_config()
        });
        let interrupt = executor.interrupt_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.cancel();
        });
        let first = executor
            .execute_in_batches((0..6).map(ok).collect())
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert!(!executor.interrupt_handle().is_cancelled());

        let second = executor
            .execute_in_batches((0..6).map(ok).collect())
            .await
            .unwrap();
        assert_eq!(second.len(), 6);
        let indices: Vec<usize> = second.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_statistics() {
        let results = vec![
            BulkResult { index: 0, outcome: Ok(1) },
            BulkResult { index: 1, outcome: Err(OperationError::Cancelled) },
            BulkResult { index: 2, outcome: Ok(3) },
        ];
        let stats = BulkExecutor::statistics(&results);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.error_count, 1);
        assert!((stats.success_rate() - 66.666).abs() < 0.01);
        assert_eq!(
            stats.to_string(),
            "BulkStatistics{total=3, success=2, errors=1, successRate=66.67%}"
        );

        let empty: Vec<BulkResult<()>> = Vec::new();
        assert_eq!(BulkExecutor::statistics(&empty).success_rate(), 0.0);
    }

    #[derive(Default)]
    struct Recorder {
        successes: Mutex<Vec<usize>>,
        errors: Mutex<Vec<usize>>,
    }

    impl BulkResultHandler<usize> for Recorder {
        fn on_success(&self, _result: &usize, index: usize) {
            self.successes.lock().unwrap().push(index);
        }

        fn on_error(&self, _error: &OperationError, index: usize) {
            self.errors.lock().unwrap().push(index);
        }
    }

    #[tokio::test]
    async fn test_handler_sees_every_item() {
        let executor = BulkExecutor::new();
        let recorder = Arc::new(Recorder::default());

        executor
            .execute_bulk_with_handler(
                vec![ok(0), failing("x"), ok(2), BulkOperation::new(async { panic!("p") })],
                recorder.clone(),
            )
            .await
            .unwrap();

        let mut successes = recorder.successes.lock().unwrap().clone();
        let mut errors = recorder.errors.lock().unwrap().clone();
        successes.sort();
        errors.sort();
        assert_eq!(successes, [0, 2]);
        assert_eq!(errors, [1, 3]);
    }

    #[tokio::test]
    async fn test_async_callback_receives_all_results() {
        let executor = BulkExecutor::new();
        let (tx, rx) = tokio::sync::oneshot::channel();

        let handle = executor
            .execute_bulk_async(vec![ok(1), ok(2), failing("no")], move |results| {
                let _ = tx.send(BulkExecutor::statistics(&results));
            })
            .unwrap();

        let stats = rx.await.unwrap();
        handle.await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.error_count, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let executor = BulkExecutor::with_config(fast_config());
        executor.shutdown().await;

        assert!(executor.is_shut_down());
        assert_err!(executor.execute_bulk(vec![ok(1)]).await);
        assert_err!(executor.execute_in_batches(vec![ok(1)]).await);
        assert!(executor.execute_bulk_async(vec![ok(1)], |_| {}).is_err());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_stragglers_after_grace() {
        let executor = BulkExecutor::with_config(fast_config());
        let runner = executor.clone();
        let run = tokio::spawn(async move {
            runner
                .execute_bulk(vec![
                    ok(0),
                    BulkOperation::new(async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(1)
                    }),
                ])
                .await
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let started = Instant::now();
        executor.shutdown().await;
        assert!(started.elapsed() < Duration::from_secs(5));

        let results = run.await.unwrap().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert!(matches!(results[1].error(), Some(OperationError::Cancelled)));
    }
}
