//! Reconciliation engine - walks the task graph, applies guards, invokes
//! drivers, and aggregates results.
//!
//! Execution is strictly sequential in declared order; ordering is a
//! correctness requirement for dependent package/group/repository
//! operations. A failed node stops the remainder of its sequence, but a
//! block's `always` nodes run no matter how the body ended - the same
//! guarantee scoped resource release gives. Cancellation is cooperative
//! and honored only at node boundaries, never mid-driver-call.

use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::condition::Condition;
use crate::driver::{ApplyContext, DriverRegistry, Outcome};
use crate::error::EngineError;
use crate::facts::FactStore;
use crate::graph::{Action, TaskGraph, TaskNode};
use crate::report::{NodeRecord, NodeStatus, RunReport};

/// Cooperative cancellation handle. Cheap to clone; all clones share the
/// same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The engine notices at the next node boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Receives progress updates as nodes execute.
pub trait Observer {
    /// Called just before a node's driver is invoked.
    fn on_node_start(&mut self, id: &str, summary: &str);

    /// Called when a node reaches a terminal status.
    fn on_node_complete(&mut self, record: &NodeRecord);
}

/// No-op observer.
pub struct NoObserver;

impl Observer for NoObserver {
    fn on_node_start(&mut self, _id: &str, _summary: &str) {}
    fn on_node_complete(&mut self, _record: &NodeRecord) {}
}

/// Engine options.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Detect state but make no changes
    pub dry_run: bool,
}

/// How a sequence of nodes ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// All nodes ran (or were skipped)
    Completed,
    /// A node failed; the rest of the sequence was not reached
    FailedFast,
    /// Cancellation was observed at a node boundary
    Cancelled,
}

/// Walks a resolved [`TaskGraph`] against a [`FactStore`] and a
/// [`DriverRegistry`], producing a [`RunReport`].
pub struct Engine<'a> {
    registry: &'a DriverRegistry,
    facts: &'a FactStore,
    options: EngineOptions,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a DriverRegistry, facts: &'a FactStore, options: EngineOptions) -> Self {
        Self {
            registry,
            facts,
            options,
        }
    }

    /// Run the graph to completion, failure, or cancellation.
    ///
    /// An empty fact store is a caller error: facts must be gathered
    /// before any guard can be evaluated.
    pub fn run(
        &self,
        graph: &TaskGraph,
        cancel: &CancelToken,
        observer: &mut dyn Observer,
    ) -> Result<RunReport, EngineError> {
        if self.facts.is_empty() {
            return Err(EngineError::EmptyFactStore);
        }

        let mut report = RunReport::new();
        // The top-level list behaves like a block body: fail-fast
        let flow = self.run_sequence(graph.nodes(), true, cancel, &mut report, observer);
        report.cancelled = flow == Flow::Cancelled;
        debug!("run finished: {} ({})", report.summary(), match flow {
            Flow::Completed => "completed",
            Flow::FailedFast => "stopped at first failure",
            Flow::Cancelled => "cancelled",
        });
        Ok(report)
    }

    fn run_sequence(
        &self,
        nodes: &[TaskNode],
        honor_cancel: bool,
        cancel: &CancelToken,
        report: &mut RunReport,
        observer: &mut dyn Observer,
    ) -> Flow {
        for node in nodes {
            if honor_cancel && cancel.is_cancelled() {
                return Flow::Cancelled;
            }
            let flow = match node {
                TaskNode::Action(action) => self.run_action(action, report, observer),
                TaskNode::Block {
                    id,
                    when,
                    body,
                    always,
                } => self.run_block(id, when.as_ref(), body, always, honor_cancel, cancel, report, observer),
                TaskNode::Include { list, .. } => {
                    // Resolved graphs contain no includes; refuse rather
                    // than guess
                    warn!("unresolved include '{list}' reached the engine");
                    report.push(NodeRecord::new(
                        format!("include:{list}"),
                        NodeStatus::Failed,
                        Some("include was not resolved at load time".to_string()),
                    ));
                    Flow::FailedFast
                }
            };
            if flow != Flow::Completed {
                return flow;
            }
        }
        Flow::Completed
    }

    fn run_action(
        &self,
        action: &Action,
        report: &mut RunReport,
        observer: &mut dyn Observer,
    ) -> Flow {
        if !self.guard_passes(action.when.as_ref(), &action.id) {
            let record = NodeRecord::new(
                &action.id,
                NodeStatus::Skipped,
                Some("guard evaluated to false".to_string()),
            );
            observer.on_node_complete(&record);
            report.push(record);
            return Flow::Completed;
        }

        observer.on_node_start(&action.id, &action.descriptor.summary());
        let ctx = ApplyContext {
            dry_run: self.options.dry_run,
        };
        let driver = self.registry.get(action.descriptor.kind());
        let record = match driver {
            None => NodeRecord::new(
                &action.id,
                NodeStatus::Failed,
                Some(format!(
                    "no driver registered for '{}'",
                    action.descriptor.kind()
                )),
            ),
            Some(driver) => match driver.reconcile(&action.descriptor, &ctx) {
                Ok(Outcome::Unchanged) => {
                    NodeRecord::new(&action.id, NodeStatus::Unchanged, None)
                }
                Ok(Outcome::Changed { details }) => {
                    NodeRecord::new(&action.id, NodeStatus::Changed, details)
                }
                Ok(Outcome::Skipped { reason }) => {
                    NodeRecord::new(&action.id, NodeStatus::Skipped, Some(reason))
                }
                // Driver failures are recorded, never raised past this point
                Err(err) => NodeRecord::new(&action.id, NodeStatus::Failed, Some(err.to_string())),
            },
        };

        observer.on_node_complete(&record);
        let failed = record.status.is_failure();
        report.push(record);
        if failed { Flow::FailedFast } else { Flow::Completed }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_block(
        &self,
        id: &str,
        when: Option<&Condition>,
        body: &[TaskNode],
        always: &[TaskNode],
        honor_cancel: bool,
        cancel: &CancelToken,
        report: &mut RunReport,
        observer: &mut dyn Observer,
    ) -> Flow {
        if !self.guard_passes(when, id) {
            // The guard gates the whole block, always sequence included
            let record = NodeRecord::new(
                id,
                NodeStatus::Skipped,
                Some("guard evaluated to false".to_string()),
            );
            observer.on_node_complete(&record);
            report.push(record);
            return Flow::Completed;
        }

        let body_flow = self.run_sequence(body, honor_cancel, cancel, report, observer);

        // Guaranteed cleanup: always runs whatever the body did, with
        // cancellation suppressed so a cancelled run still cleans up
        let always_flow = self.run_sequence(always, false, cancel, report, observer);

        // Append-only aggregation: an always failure marks the block
        // failed even when the body succeeded, but never erases records
        match (body_flow, always_flow) {
            (Flow::Cancelled, _) => Flow::Cancelled,
            (_, Flow::FailedFast) | (Flow::FailedFast, _) => Flow::FailedFast,
            _ => Flow::Completed,
        }
    }

    fn guard_passes(&self, when: Option<&Condition>, id: &str) -> bool {
        match when {
            None => true,
            Some(cond) => {
                let verdict = cond.eval(self.facts);
                debug!("guard for '{id}' evaluated {verdict}");
                verdict
            }
        }
    }
}
