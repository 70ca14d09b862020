//! Resource driver abstraction.
//!
//! A driver reconciles one declared resource toward its target state and
//! reports whether anything changed. Drivers return errors, they never
//! panic or abort the run - the engine converts a [`DriverError`] into a
//! `Failed` record and keeps orchestrating.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{DriverError, LoadError};

/// Target state a resource is reconciled toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetState {
    /// Installed/configured
    Present,
    /// Removed/unconfigured
    Absent,
    /// Installed and up to date (packages)
    Latest,
    /// Running (services)
    Started,
    /// Not running (services)
    Stopped,
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Latest => "latest",
            Self::Started => "started",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}

/// Driver category an action is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    Package,
    Group,
    Repository,
    Command,
    Service,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Package => "package",
            Self::Group => "group",
            Self::Repository => "repository",
            Self::Command => "command",
            Self::Service => "service",
        };
        write!(f, "{s}")
    }
}

/// Driver-specific payload of an action node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Descriptor {
    /// A set of packages and their shared target state
    Package {
        names: Vec<String>,
        state: TargetState,
    },
    /// A package group
    Group { name: String, state: TargetState },
    /// A package repository
    Repository { id: String, state: TargetState },
    /// An opaque command line executed by the shell driver
    Command { command: String },
    /// A managed service
    Service { name: String, state: TargetState },
}

impl Descriptor {
    /// Which driver this descriptor is dispatched to.
    pub fn kind(&self) -> DriverKind {
        match self {
            Self::Package { .. } => DriverKind::Package,
            Self::Group { .. } => DriverKind::Group,
            Self::Repository { .. } => DriverKind::Repository,
            Self::Command { .. } => DriverKind::Command,
            Self::Service { .. } => DriverKind::Service,
        }
    }

    /// One-line human summary for progress output.
    pub fn summary(&self) -> String {
        match self {
            Self::Package { names, state } => {
                format!("package {} -> {state}", names.join(", "))
            }
            Self::Group { name, state } => format!("group {name} -> {state}"),
            Self::Repository { id, state } => format!("repository {id} -> {state}"),
            Self::Command { command } => format!("command: {command}"),
            Self::Service { name, state } => format!("service {name} -> {state}"),
        }
    }
}

/// Outcome of a successful driver invocation.
///
/// Failure is not a variant here; drivers report it through [`DriverError`]
/// and the engine owns the resulting record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Resource already matched the target state
    Unchanged,
    /// Resource was driven to the target state
    Changed {
        /// What changed, for the report message
        details: Option<String>,
    },
    /// Driver declined to act (dry run)
    Skipped { reason: String },
}

impl Outcome {
    pub fn changed(details: impl Into<String>) -> Self {
        Self::Changed {
            details: Some(details.into()),
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Context passed to driver reconcile calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// Detect state but make no changes; a would-be change reports
    /// `Skipped { reason: "dry run" }`
    pub dry_run: bool,
}

impl ApplyContext {
    /// Standard skip outcome for a mutation suppressed by dry run.
    pub fn dry_run_skip(&self) -> Outcome {
        Outcome::Skipped {
            reason: "dry run".to_string(),
        }
    }
}

/// Polymorphic reconcile capability.
///
/// Contract per implementation:
/// - Idempotence: reconciling twice with the same descriptor and unchanged
///   external state yields `Unchanged` the second time.
/// - `absent` on an already-absent resource is `Unchanged`, not an error.
/// - Failures come back as `Err(DriverError)`, never as a panic.
pub trait Driver: Send + Sync {
    /// The descriptor kind this driver handles.
    fn kind(&self) -> DriverKind;

    /// Load-time schema validation for an action's descriptor.
    ///
    /// Rejecting here aborts graph construction before any reconciliation
    /// starts. An empty package name set, for example, is a load-time error.
    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError>;

    /// Drive the resource toward its target state.
    fn reconcile(&self, descriptor: &Descriptor, ctx: &ApplyContext)
    -> Result<Outcome, DriverError>;
}

/// Registry dispatching descriptors to their drivers.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<DriverKind, Box<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver, replacing any previous driver of the same kind.
    pub fn register(&mut self, driver: Box<dyn Driver>) {
        self.drivers.insert(driver.kind(), driver);
    }

    /// Builder-style register.
    pub fn with(mut self, driver: Box<dyn Driver>) -> Self {
        self.register(driver);
        self
    }

    /// Look up the driver for a descriptor kind.
    pub fn get(&self, kind: DriverKind) -> Option<&dyn Driver> {
        self.drivers.get(&kind).map(Box::as_ref)
    }

    /// Validate an action descriptor against its driver's schema.
    ///
    /// An unregistered driver kind is itself a load error: the graph must
    /// fail closed rather than discover the gap mid-run.
    pub fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let kind = descriptor.kind();
        let driver = self.get(kind).ok_or_else(|| LoadError::UnknownDriver {
            kind,
            id: id.to_string(),
        })?;
        driver.validate(id, descriptor)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}
