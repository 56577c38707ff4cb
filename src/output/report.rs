//
//  aem-cli
//  output/report.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Renderers for the transport's administrative reports and bulk runs.

use serde::Serialize;
use serde_json::Value;

use super::table::{format_bool, format_status, truncate, TableBuilder};
use super::{print_field, print_header, TableOutput};
use crate::api::{ApiError, AuditRecord, CacheStats};
use crate::operations::{BulkExecutor, BulkResult, BulkStatistics, OperationError};

/// Width at which error details are cut in bulk tables.
const DETAIL_WIDTH: usize = 80;

impl TableOutput for CacheStats {
    fn print_table(&self, color: bool) {
        print_header("Response Cache");
        for (key, value) in self.as_pairs() {
            let value = if key == "enabled" {
                format_bool(self.enabled, color)
            } else {
                value
            };
            print_field(key, &value, color);
        }
    }
}

impl TableOutput for BulkStatistics {
    fn print_table(&self, _color: bool) {
        println!("{}", self);
    }
}

/// The audit trail as a printable list.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct AuditTrail(pub Vec<AuditRecord>);

impl TableOutput for AuditTrail {
    fn print_table(&self, color: bool) {
        if self.0.is_empty() {
            println!("No requests recorded.");
            return;
        }
        TableBuilder::new()
            .color(color)
            .headers(["#", "Time", "Request"])
            .rows(self.0.iter().map(|record| {
                [
                    record.sequence.to_string(),
                    record.timestamp.format("%H:%M:%S%.3f").to_string(),
                    record.to_string(),
                ]
            }))
            .print();
    }
}

/// One line of a bulk report.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRow {
    pub index: usize,
    pub target: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Per-item outcomes plus aggregate statistics for one bulk run.
#[derive(Debug, Clone, Serialize)]
pub struct BulkReport {
    pub results: Vec<BulkRow>,
    pub statistics: BulkStatistics,
}

impl BulkReport {
    /// Builds a report. `targets[i]` names the input at index `i`.
    pub fn new(targets: &[String], results: &[BulkResult<Value>]) -> Self {
        let rows = results
            .iter()
            .map(|result| {
                let target = targets.get(result.index).cloned().unwrap_or_default();
                match &result.outcome {
                    Ok(_) => BulkRow {
                        index: result.index,
                        target,
                        outcome: "ok".to_string(),
                        status: None,
                        detail: None,
                    },
                    Err(error) => BulkRow {
                        index: result.index,
                        target,
                        outcome: error.kind().to_string(),
                        status: api_status(error),
                        detail: Some(error.to_string()),
                    },
                }
            })
            .collect();

        Self {
            results: rows,
            statistics: BulkExecutor::statistics(results),
        }
    }

    /// `true` when any item failed.
    pub fn has_failures(&self) -> bool {
        self.statistics.error_count > 0
    }
}

impl TableOutput for BulkReport {
    fn print_table(&self, color: bool) {
        if !self.results.is_empty() {
            TableBuilder::new()
                .color(color)
                .headers(["#", "Path", "Outcome", "Detail"])
                .rows(self.results.iter().map(|row| {
                    [
                        row.index.to_string(),
                        row.target.clone(),
                        format_status(&row.outcome, color),
                        row.detail
                            .as_deref()
                            .map(|d| truncate(d, DETAIL_WIDTH))
                            .unwrap_or_default(),
                    ]
                }))
                .print();
        }
        self.statistics.print_table(color);
    }
}

/// Status code carried by a failed transport call inside a bulk item.
fn api_status(error: &OperationError) -> Option<u16> {
    match error {
        OperationError::Failed(e) => e.downcast_ref::<ApiError>().and_then(ApiError::status),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_bulk_report_rows() {
        let targets = vec!["/a".to_string(), "/b".to_string(), "/c".to_string()];
        let results = vec![
            BulkResult { index: 0, outcome: Ok(json!({})) },
            BulkResult {
                index: 1,
                outcome: Err(OperationError::Failed(
                    ApiError::from_status(404, "/b", "").into(),
                )),
            },
            BulkResult { index: 2, outcome: Err(OperationError::Cancelled) },
        ];

        let report = BulkReport::new(&targets, &results);
        assert!(report.has_failures());
        assert_eq!(report.statistics.success_count, 1);
        assert_eq!(report.results[1].target, "/b");
        assert_eq!(report.results[1].status, Some(404));
        assert_eq!(report.results[1].outcome, "failed");
        assert_eq!(report.results[2].outcome, "cancelled");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["statistics"]["total"], 3);
        assert!(value["results"][0].get("detail").is_none());
    }
}
