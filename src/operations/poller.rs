//
//  aem-cli
//  operations/poller.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! # Job Polling
//!
//! Submit-then-poll for server-side jobs (package installs, workflow runs,
//! bulk imports) that do not finish within a single request.
//!
//! ## State Machine
//!
//! ```text
//! Submitted ──(condition met)──────────────────────────────> Done
//!     │
//!     └──(statusUrl present)──> Polling ──(condition met)──> Done
//!                                  │  ├──(error marker)────> Failed
//!                                  │  └──(budget spent)────> TimedOut
//!                                  └──(sleep, fetch) ──┘
//! ```
//!
//! The completion check runs before the failure check, so a payload that
//! satisfies the condition wins even if it also carries an `error` field.
//! Status requests bypass the response cache.
//!
//! ## Example
//!
//! ```rust,no_run
//! use aem_cli::api::AemClient;
//! use aem_cli::config::Connection;
//! use aem_cli::operations::{field_equals, AsyncPoller};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = AemClient::new(Connection::new("http://localhost:4502"))?;
//! let poller = AsyncPoller::new(&client);
//!
//! let done = poller
//!     .execute_and_poll(
//!         "/crx/packmgr/service/.json/etc/packages/site.zip?cmd=install",
//!         &field_equals("status", "COMPLETED"),
//!         Some(&|label: &str| println!("status: {label}")),
//!     )
//!     .await?;
//! println!("{done}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::{AemClient, ApiError};

/// Default pause between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2_000);

/// Default overall budget, measured from submission.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Requests the poller needs from the transport.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Starts the job.
    async fn submit(&self, path: &str, body: &Value) -> Result<Value, ApiError>;

    /// Fetches the current job status. Must not be served from a cache.
    async fn status(&self, location: &str) -> Result<Value, ApiError>;
}

#[async_trait]
impl JobApi for AemClient {
    async fn submit(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.post(path, body).await
    }

    async fn status(&self, location: &str) -> Result<Value, ApiError> {
        self.get_uncached(location).await
    }
}

/// Decides whether a job payload means "done".
pub trait PollCondition: Send + Sync {
    fn is_complete(&self, payload: &Value) -> bool;
}

impl<F> PollCondition for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn is_complete(&self, payload: &Value) -> bool {
        self(payload)
    }
}

/// Complete when `payload[field]` is the string `expected`.
pub fn field_equals(field: &str, expected: &str) -> impl PollCondition {
    let field = field.to_string();
    let expected = expected.to_string();
    move |payload: &Value| payload.get(&field).and_then(Value::as_str) == Some(expected.as_str())
}

/// Complete when `payload[field]` is any of `accepted` (string comparison).
pub fn field_in(field: &str, accepted: &[&str]) -> impl PollCondition {
    let field = field.to_string();
    let accepted: Vec<String> = accepted.iter().map(|s| s.to_string()).collect();
    move |payload: &Value| {
        payload
            .get(&field)
            .and_then(Value::as_str)
            .is_some_and(|value| accepted.iter().any(|a| a == value))
    }
}

/// Poller settings, including the payload fields it reads.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Field holding the status location in the submission response.
    pub status_location_field: String,
    /// Field whose presence in a status payload marks the job as failed.
    pub failure_field: String,
    /// Field shown to the progress callback.
    pub label_field: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            status_location_field: "statusUrl".to_string(),
            failure_field: "error".to_string(),
            label_field: "status".to_string(),
        }
    }
}

/// Terminal poller failures.
#[derive(Debug, Error)]
pub enum PollError {
    /// The submission or a status request failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The job did not finish on submission and gave no status location.
    #[error("No status URL found in response (expected field '{0}')")]
    MissingStatusLocation(String),

    /// A status payload carried the failure marker.
    #[error("Async operation failed: {message}")]
    JobFailed { message: String, payload: Value },

    /// The budget ran out before the job finished.
    #[error("Async operation timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    /// Polling was cancelled while waiting.
    #[error("Polling interrupted")]
    Cancelled,
}

/// Submit-then-poll driver over a [`JobApi`].
pub struct AsyncPoller<'a, A: JobApi + ?Sized> {
    api: &'a A,
    config: PollerConfig,
}

impl<'a, A: JobApi + ?Sized> AsyncPoller<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self::with_config(api, PollerConfig::default())
    }

    pub fn with_config(api: &'a A, config: PollerConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn set_poll_interval_ms(&mut self, interval_ms: u64) {
        self.config.poll_interval = Duration::from_millis(interval_ms);
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.config.timeout = Duration::from_millis(timeout_ms);
    }

    /// POSTs `{}` to `path` and polls until `condition` holds.
    ///
    /// # Parameters
    ///
    /// * `path` - Endpoint that starts the job
    /// * `condition` - Completion check, applied to the submission response and every poll
    /// * `progress` - Receives the status label after each poll
    ///
    /// # Returns
    ///
    /// The payload that satisfied `condition`.
    pub async fn execute_and_poll(
        &self,
        path: &str,
        condition: &dyn PollCondition,
        progress: Option<&(dyn Fn(&str) + Send + Sync)>,
    ) -> Result<Value, PollError> {
        self.submit_and_poll(path, &json!({}), condition, progress, None)
            .await
    }

    /// Like [`execute_and_poll`](Self::execute_and_poll), but stops with
    /// [`PollError::Cancelled`] when `cancel` fires during a wait.
    pub async fn execute_and_poll_until(
        &self,
        path: &str,
        condition: &dyn PollCondition,
        progress: Option<&(dyn Fn(&str) + Send + Sync)>,
        cancel: &CancellationToken,
    ) -> Result<Value, PollError> {
        self.submit_and_poll(path, &json!({}), condition, progress, Some(cancel))
            .await
    }

    /// Submits `body` to `path`, then polls the returned status location.
    pub async fn submit_and_poll(
        &self,
        path: &str,
        body: &Value,
        condition: &dyn PollCondition,
        progress: Option<&(dyn Fn(&str) + Send + Sync)>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, PollError> {
        let submitted = self.api.submit(path, body).await?;
        if condition.is_complete(&submitted) {
            tracing::debug!("Job at {} completed on submission", path);
            return Ok(submitted);
        }

        let location = submitted
            .get(&self.config.status_location_field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| PollError::MissingStatusLocation(self.config.status_location_field.clone()))?
            .to_string();

        tracing::info!("Polling job status at {}", location);

        let started = Instant::now();
        let mut polls = 0u32;
        loop {
            let remaining = self.config.timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            let wait = self.config.poll_interval.min(remaining);
            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = token.cancelled() => return Err(PollError::Cancelled),
                    }
                }
                None => tokio::time::sleep(wait).await,
            }

            // No poll once the budget is spent.
            if started.elapsed() >= self.config.timeout {
                break;
            }

            let payload = self.api.status(&location).await?;
            polls += 1;

            if let Some(progress) = progress {
                progress(&self.label(&payload));
            }

            if condition.is_complete(&payload) {
                tracing::debug!("Job at {} completed after {} poll(s)", location, polls);
                return Ok(payload);
            }

            if let Some(marker) = payload.get(&self.config.failure_field) {
                let message = match marker {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(PollError::JobFailed { message, payload });
            }
        }

        Err(PollError::TimedOut(self.config.timeout))
    }

    fn label(&self, payload: &Value) -> String {
        match payload.get(&self.config.label_field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted job API: one submission response, then status responses in order.
    /// The last status response repeats once the script is exhausted.
    struct ScriptedJob {
        submission: Value,
        statuses: Mutex<VecDeque<Value>>,
        status_calls: Mutex<Vec<String>>,
    }

    impl ScriptedJob {
        fn new(submission: Value, statuses: Vec<Value>) -> Self {
            Self {
                submission,
                statuses: Mutex::new(statuses.into()),
                status_calls: Mutex::new(Vec::new()),
            }
        }

        fn polls(&self) -> usize {
            self.status_calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobApi for ScriptedJob {
        async fn submit(&self, _path: &str, _body: &Value) -> Result<Value, ApiError> {
            Ok(self.submission.clone())
        }

        async fn status(&self, location: &str) -> Result<Value, ApiError> {
            self.status_calls.lock().unwrap().push(location.to_string());
            let mut statuses = self.statuses.lock().unwrap();
            let next = if statuses.len() > 1 {
                statuses.pop_front()
            } else {
                statuses.front().cloned()
            };
            Ok(next.unwrap_or_else(|| json!({})))
        }
    }

    fn fast(api: &ScriptedJob) -> AsyncPoller<'_, ScriptedJob> {
        let mut poller = AsyncPoller::new(api);
        poller.set_poll_interval_ms(5);
        poller.set_timeout_ms(1_000);
        poller
    }

    #[tokio::test]
    async fn test_immediate_completion_skips_polling() {
        let api = ScriptedJob::new(json!({"status": "COMPLETED"}), vec![]);
        let result = fast(&api)
            .execute_and_poll("/bin/job", &field_equals("status", "COMPLETED"), None)
            .await
            .unwrap();
        assert_eq!(result["status"], "COMPLETED");
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn test_polls_until_complete_and_reports_progress() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/7"}),
            vec![
                json!({"status": "QUEUED"}),
                json!({"progress": 50}),
                json!({"status": "DONE", "result": 1}),
            ],
        );
        let labels = Mutex::new(Vec::new());
        let record = |label: &str| labels.lock().unwrap().push(label.to_string());

        let result = fast(&api)
            .execute_and_poll("/bin/job", &field_in("status", &["DONE", "SUCCEEDED"]), Some(&record))
            .await
            .unwrap();

        assert_eq!(result["result"], 1);
        assert_eq!(api.polls(), 3);
        assert_eq!(*labels.lock().unwrap(), ["QUEUED", "unknown", "DONE"]);
        assert!(api.status_calls.lock().unwrap().iter().all(|l| l == "/jobs/7"));
    }

    #[tokio::test]
    async fn test_failure_marker_stops_immediately() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/8"}),
            vec![json!({"status": "RUNNING"}), json!({"error": "disk full"})],
        );
        let mut poller = fast(&api);
        poller.set_timeout_ms(60_000);

        let started = Instant::now();
        let err = poller
            .execute_and_poll("/bin/job", &field_equals("status", "DONE"), None)
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(api.polls(), 2);
        match err {
            PollError::JobFailed { message, .. } => assert_eq!(message, "disk full"),
            other => panic!("expected JobFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_completion_checked_before_failure() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/9"}),
            vec![json!({"status": "DONE", "error": null})],
        );
        let result = fast(&api)
            .execute_and_poll("/bin/job", &field_equals("status", "DONE"), None)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_times_out_after_budget_not_before() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/10"}),
            vec![json!({"status": "RUNNING"})],
        );
        let mut poller = fast(&api);
        poller.set_poll_interval_ms(10);
        poller.set_timeout_ms(80);

        let started = Instant::now();
        let err = poller
            .execute_and_poll("/bin/job", &field_equals("status", "DONE"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::TimedOut(d) if d == Duration::from_millis(80)));
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(api.polls() >= 2);
    }

    #[tokio::test]
    async fn test_no_poll_after_deadline() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/12"}),
            vec![json!({"status": "DONE"})],
        );
        let mut poller = fast(&api);
        poller.set_poll_interval_ms(500);
        poller.set_timeout_ms(50);

        let started = Instant::now();
        let err = poller
            .execute_and_poll("/bin/job", &field_equals("status", "DONE"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::TimedOut(d) if d == Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn test_missing_status_location() {
        let api = ScriptedJob::new(json!({"status": "ACCEPTED"}), vec![]);
        let err = fast(&api)
            .execute_and_poll("/bin/job", &field_equals("status", "DONE"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::MissingStatusLocation(ref f) if f == "statusUrl"));
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_wait() {
        let api = ScriptedJob::new(
            json!({"statusUrl": "/jobs/11"}),
            vec![json!({"status": "RUNNING"})],
        );
        let mut poller = fast(&api);
        poller.set_poll_interval_ms(10_000);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = poller
            .execute_and_poll_until("/bin/job", &field_equals("status", "DONE"), None, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Cancelled));
        assert_eq!(api.polls(), 0);
    }

    #[tokio::test]
    async fn test_against_http_server() {
        let mut server = mockito::Server::new_async().await;
        let submit = server
            .mock("POST", "/bin/wcm/command")
            .match_body(mockito::Matcher::Json(json!({})))
            .with_body(format!(r#"{{"statusUrl":"{}/jobs/1.json"}}"#, server.url()))
            .create_async()
            .await;
        let status = server
            .mock("GET", "/jobs/1.json")
            .with_body(r#"{"status":"SUCCEEDED"}"#)
            .expect(1)
            .create_async()
            .await;

        let client =
            AemClient::new(crate::config::Connection::new(server.url())).unwrap();
        let mut poller = AsyncPoller::new(&client);
        poller.set_poll_interval_ms(5);

        let result = poller
            .execute_and_poll("/bin/wcm/command", &field_equals("status", "SUCCEEDED"), None)
            .await
            .unwrap();
        assert_eq!(result["status"], "SUCCEEDED");
        submit.assert_async().await;
        status.assert_async().await;
        // Status checks are not cached.
        assert_eq!(client.cache_stats().total_entries, 0);
    }

    #[test]
    fn test_conditions() {
        let done = field_equals("state", "DONE");
        assert!(done.is_complete(&json!({"state": "DONE"})));
        assert!(!done.is_complete(&json!({"state": "done"})));
        assert!(!done.is_complete(&json!({})));

        let closure = |v: &Value| v["count"].as_u64() == Some(3);
        assert!(closure.is_complete(&json!({"count": 3})));
    }
}
