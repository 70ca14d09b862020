//! Shell command driver - runs an opaque command line.
//!
//! Commands are assumed to change the system: the outcome is `Changed`
//! unless the command's final stdout line is the no-op marker. A non-zero
//! exit status is a driver failure with the command's stderr attached.

use log::debug;

use crate::driver::{ApplyContext, Descriptor, Driver, DriverKind, Outcome};
use crate::error::{DriverError, LoadError};

/// Final stdout line a command prints to signal it made no changes.
pub const NOOP_MARKER: &str = "unchanged";

/// Captured output of a completed command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Process exit status
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Whether the command reported itself as a no-op.
    pub fn is_noop(&self) -> bool {
        self.stdout.lines().last().map(str::trim) == Some(NOOP_MARKER)
    }
}

/// Executes command lines for [`ShellDriver`]. The real implementation
/// shells out; tests substitute a scripted runner.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> Result<CommandOutput, DriverError>;
}

/// Runs opaque commands, mapping their exit status and no-op marker onto
/// reconcile outcomes.
pub struct ShellDriver {
    runner: Box<dyn CommandRunner>,
}

impl ShellDriver {
    pub fn new(runner: Box<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Driver for ShellDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Command
    }

    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let Descriptor::Command { command } = descriptor else {
            return Err(LoadError::schema(id, "expected a command descriptor"));
        };
        if command.trim().is_empty() {
            return Err(LoadError::schema(id, "command is empty"));
        }
        Ok(())
    }

    fn reconcile(
        &self,
        descriptor: &Descriptor,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        let Descriptor::Command { command } = descriptor else {
            return Err(DriverError::Client(
                "shell driver invoked with a non-command descriptor".to_string(),
            ));
        };

        if ctx.dry_run {
            return Ok(ctx.dry_run_skip());
        }

        debug!("run command: {command}");
        let output = self.runner.run(command)?;
        if !output.success() {
            return Err(DriverError::CommandFailed {
                status: output.status,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if output.is_noop() {
            Ok(Outcome::Unchanged)
        } else {
            Ok(Outcome::Changed { details: None })
        }
    }
}
