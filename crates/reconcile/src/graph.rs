//! Task graph - the ordered, validated node list the engine walks.
//!
//! Documents compose task lists through includes. Resolution happens once,
//! at load time: includes are expanded depth-first into a single in-memory
//! graph, an include's guard is conjoined onto every node it pulls in,
//! cycles and schema violations abort construction. A graph that fails to
//! load produces zero execution records - load fails closed.

use crate::condition::Condition;
use crate::driver::{Descriptor, DriverRegistry};
use crate::error::LoadError;
use std::collections::BTreeMap;

/// An action node: one driver invocation against one resource descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Stable identifier used in the run report
    pub id: String,
    pub descriptor: Descriptor,
    /// Guard; `None` means always run
    pub when: Option<Condition>,
}

/// One node of a task list.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskNode {
    Action(Action),
    /// Grouping node with guaranteed-cleanup semantics: `body` runs
    /// fail-fast, `always` runs regardless of the body's outcome
    Block {
        id: String,
        when: Option<Condition>,
        body: Vec<TaskNode>,
        always: Vec<TaskNode>,
    },
    /// Reference to another task list, expanded away during resolution
    Include {
        list: String,
        when: Option<Condition>,
    },
}

impl TaskNode {
    /// Conjoin an outer guard (from an enclosing include) onto this node.
    fn guarded_by(mut self, outer: &Option<Condition>) -> Self {
        if outer.is_none() {
            return self;
        }
        match &mut self {
            Self::Action(action) => {
                action.when = Condition::conjoin(outer.clone(), action.when.take());
            }
            Self::Block { when, .. } | Self::Include { when, .. } => {
                *when = Condition::conjoin(outer.clone(), when.take());
            }
        }
        self
    }
}

/// Named task lists as loaded from a document, before resolution.
#[derive(Debug, Clone, Default)]
pub struct GraphSource {
    lists: BTreeMap<String, Vec<TaskNode>>,
}

impl GraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named task list, replacing any previous list with that name.
    pub fn add_list(&mut self, name: impl Into<String>, nodes: Vec<TaskNode>) {
        self.lists.insert(name.into(), nodes);
    }

    /// Builder-style add.
    pub fn with_list(mut self, name: impl Into<String>, nodes: Vec<TaskNode>) -> Self {
        self.add_list(name, nodes);
        self
    }

    fn get(&self, name: &str) -> Result<&[TaskNode], LoadError> {
        self.lists
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| LoadError::UnknownList(name.to_string()))
    }

    pub fn list_names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }
}

/// A fully resolved, validated task graph. Read-only for the run.
///
/// Construction through [`TaskGraph::resolve`] guarantees that no include
/// nodes remain and that every action passed its driver's schema check.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    /// Resolve the entry list of a source into a single validated graph.
    pub fn resolve(
        source: &GraphSource,
        entry: &str,
        registry: &DriverRegistry,
    ) -> Result<Self, LoadError> {
        let mut stack = Vec::new();
        let nodes = expand_list(source, entry, registry, &mut stack)?;
        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of action nodes, counting into blocks.
    pub fn action_count(&self) -> usize {
        fn count(nodes: &[TaskNode]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    TaskNode::Action(_) => 1,
                    TaskNode::Block { body, always, .. } => count(body) + count(always),
                    TaskNode::Include { .. } => 0,
                })
                .sum()
        }
        count(&self.nodes)
    }
}

/// Expand one named list, tracking the include chain for cycle detection.
fn expand_list(
    source: &GraphSource,
    name: &str,
    registry: &DriverRegistry,
    stack: &mut Vec<String>,
) -> Result<Vec<TaskNode>, LoadError> {
    if stack.iter().any(|seen| seen == name) {
        let mut chain = stack.clone();
        chain.push(name.to_string());
        return Err(LoadError::CyclicInclude { chain });
    }

    stack.push(name.to_string());
    let mut out = Vec::new();
    for node in source.get(name)? {
        expand_node(node.clone(), source, registry, stack, &mut out)?;
    }
    stack.pop();
    Ok(out)
}

fn expand_node(
    node: TaskNode,
    source: &GraphSource,
    registry: &DriverRegistry,
    stack: &mut Vec<String>,
    out: &mut Vec<TaskNode>,
) -> Result<(), LoadError> {
    match node {
        TaskNode::Action(action) => {
            registry.validate(&action.id, &action.descriptor)?;
            out.push(TaskNode::Action(action));
        }
        TaskNode::Block {
            id,
            when,
            body,
            always,
        } => {
            if body.is_empty() {
                return Err(LoadError::schema(&id, "block body is empty"));
            }
            let mut resolved_body = Vec::new();
            for child in body {
                expand_node(child, source, registry, stack, &mut resolved_body)?;
            }
            let mut resolved_always = Vec::new();
            for child in always {
                expand_node(child, source, registry, stack, &mut resolved_always)?;
            }
            out.push(TaskNode::Block {
                id,
                when,
                body: resolved_body,
                always: resolved_always,
            });
        }
        TaskNode::Include { list, when } => {
            // The include's guard gates every node it pulls in, conjoined
            // with each node's own guard
            for included in expand_list(source, &list, registry, stack)? {
                out.push(included.guarded_by(&when));
            }
        }
    }
    Ok(())
}
