//! Error types for graph loading and driver execution.
//!
//! The split matters: [`LoadError`] is fatal and aborts a run before any
//! reconciliation starts, while [`DriverError`] is recorded in the run
//! report and never propagates past the engine boundary.

use thiserror::Error;

use crate::driver::DriverKind;

/// Fatal errors raised while resolving and validating a task graph.
///
/// A graph that fails to load produces zero execution records - the engine
/// never partially loads a graph.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Include chain loops back on itself
    #[error("cyclic include: {}", chain.join(" -> "))]
    CyclicInclude {
        /// The include chain, ending with the list that closed the cycle
        chain: Vec<String>,
    },

    /// Include references a task list that does not exist
    #[error("unknown task list: {0}")]
    UnknownList(String),

    /// Action references a driver kind with no registered driver
    #[error("no driver registered for '{kind}' (action '{id}')")]
    UnknownDriver {
        /// Driver kind named by the action
        kind: DriverKind,
        /// Identifier of the offending action
        id: String,
    },

    /// Action or block failed its driver's schema validation
    #[error("invalid node '{id}': {message}")]
    Schema {
        /// Identifier of the offending node
        id: String,
        /// What the schema check rejected
        message: String,
    },
}

impl LoadError {
    /// Shorthand for a schema violation on a named node.
    pub fn schema(id: &str, message: impl Into<String>) -> Self {
        Self::Schema {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Recoverable failures reported by resource drivers.
///
/// Drivers return these; the engine converts them into `Failed` records.
/// They never abort sibling or `always` execution.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Operation refused because it is unsafe on the current platform
    /// (e.g., cascading group removal where leaf-only removal is required)
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// External client (package manager, service manager) failed
    #[error("client error: {0}")]
    Client(String),

    /// Shelled-out command exited non-zero
    #[error("command failed with status {status}: {stderr}")]
    CommandFailed {
        /// Process exit status
        status: i32,
        /// Trimmed stderr from the failed command
        stderr: String,
    },
}

impl DriverError {
    /// Whether this failure is the unsupported-operation subtype.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Fatal caller errors raised by the engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The fact store was never populated; guards cannot be evaluated
    #[error("fact store is empty - facts must be gathered before reconciliation")]
    EmptyFactStore,
}
