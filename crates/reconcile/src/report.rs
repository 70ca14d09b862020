//! Run report - execution-ordered per-node records plus aggregate counts.
//!
//! Records are created and owned by the engine; drivers never see them.
//! The caller persists or discards the report after the run completes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal status of one task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Guard evaluated false; the driver was never invoked
    Skipped,
    /// Resource already matched the target state
    Unchanged,
    /// Resource was driven to the target state
    Changed,
    /// Driver reported a failure
    Failed,
}

impl NodeStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Skipped => "skipped",
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One per-node outcome record, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identifier of the task node
    pub node_id: String,
    pub status: NodeStatus,
    /// Change details, skip reason, or failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl NodeRecord {
    pub fn new(node_id: impl Into<String>, status: NodeStatus, message: Option<String>) -> Self {
        Self {
            node_id: node_id.into(),
            status,
            message,
        }
    }
}

/// Aggregate counts over a run's records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn add(&mut self, status: NodeStatus) {
        match status {
            NodeStatus::Skipped => self.skipped += 1,
            NodeStatus::Unchanged => self.unchanged += 1,
            NodeStatus::Changed => self.changed += 1,
            NodeStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.changed + self.unchanged + self.skipped + self.failed
    }

    /// Success means no non-skipped node failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "changed={} unchanged={} skipped={} failed={}",
            self.changed, self.unchanged, self.skipped, self.failed
        )
    }
}

/// Overall run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

/// The complete result of one reconciliation run.
///
/// Partial application is expected: there is no rollback, and everything
/// that did or did not happen is inspectable from the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-node records in execution order
    pub records: Vec<NodeRecord>,
    /// Whether the run was cut short by a cancellation request
    pub cancelled: bool,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: NodeRecord) {
        self.records.push(record);
    }

    /// Aggregate counts over the records.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in &self.records {
            summary.add(record.status);
        }
        summary
    }

    /// `Failed` iff any non-skipped node reported a failure.
    pub fn status(&self) -> RunStatus {
        if self.summary().is_success() {
            RunStatus::Succeeded
        } else {
            RunStatus::Failed
        }
    }

    /// Process exit code: 0 on success, non-zero otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 1,
        }
    }

    /// Records with failed status, for quick inspection.
    pub fn failures(&self) -> impl Iterator<Item = &NodeRecord> {
        self.records.iter().filter(|r| r.status.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_status() {
        let mut report = RunReport::new();
        report.push(NodeRecord::new("a", NodeStatus::Changed, None));
        report.push(NodeRecord::new("b", NodeStatus::Skipped, None));
        report.push(NodeRecord::new("c", NodeStatus::Unchanged, None));

        assert_eq!(report.status(), RunStatus::Succeeded);
        assert_eq!(report.exit_code(), 0);
        let summary = report.summary();
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.changed, 1);

        report.push(NodeRecord::new(
            "d",
            NodeStatus::Failed,
            Some("client error".into()),
        ));
        assert_eq!(report.status(), RunStatus::Failed);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let mut report = RunReport::new();
        report.push(NodeRecord::new("a", NodeStatus::Skipped, None));
        assert_eq!(report.status(), RunStatus::Succeeded);
    }

    #[test]
    fn test_record_serialization_shape() {
        let record = NodeRecord::new("main[0]", NodeStatus::Failed, Some("boom".into()));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["node_id"], "main[0]");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "boom");
    }
}
