//
//  aem-cli
//  api/audit.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Append-only audit trail of transport calls.
//!
//! One [`AuditRecord`] is appended per request that reaches the HTTP layer,
//! whether it succeeded or not. Records carry a sequence number, so two
//! otherwise identical calls in the same instant stay distinct. The trail
//! lives in memory only.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single, immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    /// Monotonic position in the trail, starting at 1.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    /// Realized status code; `None` when the request failed below HTTP.
    pub status: Option<u16>,
}

impl fmt::Display for AuditRecord {
    /// Renders as `METHOD PATH -> STATUS` (`ERR` when no status was received).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} {} -> {}", self.method, self.path, status),
            None => write!(f, "{} {} -> ERR", self.method, self.path),
        }
    }
}

/// Concurrent, append-only audit log.
#[derive(Debug, Default)]
pub struct AuditLog {
    next_sequence: AtomicU64,
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record and mirrors it to the `audit` tracing target.
    pub fn record(&self, method: &str, path: &str, status: Option<u16>) -> AuditRecord {
        let record = AuditRecord {
            sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            method: method.to_string(),
            path: path.to_string(),
            status,
        };

        tracing::info!(target: "audit", "{}", record);

        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        record
    }

    /// Read-only copy of the trail, in append order.
    pub fn snapshot(&self) -> Vec<AuditRecord> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        // Sequence numbers are taken before the lock, so order by them.
        records.sort_by_key(|r| r.sequence);
        records
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
