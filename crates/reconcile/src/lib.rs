//! # Reconcile
//!
//! A declarative, idempotent state reconciliation engine.
//!
//! This crate interprets an ordered task graph, evaluates guard conditions
//! against a snapshot of environment facts, and drives managed resources
//! (packages, groups, repositories, commands, services) toward their
//! declared target state.
//!
//! ## Core Concepts
//!
//! - **FactStore**: immutable-per-run key/value snapshot of environment
//!   predicates, gathered once before the run
//! - **Condition**: typed guard expression tree; evaluation is pure and
//!   total (unknown facts evaluate false, never raise)
//! - **Driver**: polymorphic capability reconciling one resource
//!   descriptor, reporting changed/unchanged or a recorded failure
//! - **TaskGraph**: ordered node list resolved from composable task lists,
//!   with include cycles and schema violations rejected at load time
//! - **Engine**: sequential walker enforcing fail-fast bodies,
//!   guaranteed `always` cleanup, and node-boundary cancellation
//!
//! ## Example
//!
//! ```
//! use reconcile::{
//!     CancelToken, DriverRegistry, Engine, EngineOptions, FactStore,
//!     GraphSource, NoObserver, TaskGraph,
//! };
//!
//! let facts = FactStore::new().with("distribution", "Fedora");
//! let registry = DriverRegistry::new(); // register drivers here
//!
//! let source = GraphSource::new().with_list("main", vec![]);
//! let graph = TaskGraph::resolve(&source, "main", &registry)?;
//!
//! let engine = Engine::new(&registry, &facts, EngineOptions::default());
//! let report = engine.run(&graph, &CancelToken::new(), &mut NoObserver)?;
//! assert_eq!(report.exit_code(), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Client Traits
//!
//! Built-in drivers reach the outside world through injected traits
//! ([`PackageClient`], [`GroupClient`], [`RepoClient`], [`CommandRunner`],
//! [`ServiceClient`]), so the engine carries no dependency on a specific
//! package manager or service manager.

pub mod condition;
pub mod driver;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod facts;
pub mod graph;
pub mod report;

// Re-export main types at crate root
pub use condition::{CmpOp, Condition};
pub use driver::{
    ApplyContext, Descriptor, Driver, DriverKind, DriverRegistry, Outcome, TargetState,
};
pub use drivers::{
    CommandOutput, CommandRunner, GroupClient, GroupDriver, PackageClient, PackageDriver,
    RepoClient, RepoDriver, ServiceClient, ServiceDriver, ShellDriver,
};
pub use engine::{CancelToken, Engine, EngineOptions, NoObserver, Observer};
pub use error::{DriverError, EngineError, LoadError};
pub use facts::{FactStore, FactValue};
pub use graph::{Action, GraphSource, TaskGraph, TaskNode};
pub use report::{NodeRecord, NodeStatus, RunReport, RunStatus, RunSummary};
