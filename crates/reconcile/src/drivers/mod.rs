//! Built-in resource drivers.
//!
//! Each driver talks to the outside world through a client trait so the
//! reconciliation logic stays testable; real clients (package-manager CLIs,
//! service managers) live in the application layer.

pub mod group;
pub mod package;
pub mod repo;
pub mod service;
pub mod shell;

pub use group::{GroupClient, GroupDriver};
pub use package::{PackageClient, PackageDriver};
pub use repo::{RepoClient, RepoDriver};
pub use service::{ServiceClient, ServiceDriver};
pub use shell::{CommandOutput, CommandRunner, ShellDriver, NOOP_MARKER};
