//! Real system clients for the built-in drivers.
//!
//! These shell out to the platform's package manager (dnf-compatible
//! subcommands), `sh` for opaque commands, and `systemctl` for services.
//! Everything here sits behind the reconcile crate's client traits, so
//! none of it is exercised by unit tests - tests substitute mocks.

use log::{debug, trace};
use std::process::Command;

use reconcile::drivers::{CommandOutput, CommandRunner};
use reconcile::{DriverError, GroupClient, PackageClient, RepoClient, ServiceClient};

/// Run a program and capture its output, mapping spawn failures onto
/// client errors.
fn run(program: &str, args: &[&str]) -> Result<CommandOutput, DriverError> {
    trace!("exec: {program} {}", args.join(" "));
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| DriverError::Client(format!("failed to execute {program}: {e}")))?;
    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run and require a zero exit status.
fn run_checked(program: &str, args: &[&str]) -> Result<CommandOutput, DriverError> {
    let output = run(program, args)?;
    if !output.success() {
        return Err(DriverError::CommandFailed {
            status: output.status,
            stderr: output.stderr.trim().to_string(),
        });
    }
    Ok(output)
}

/// Package/group/repository client driving a dnf-compatible CLI.
pub struct PkgCli {
    program: String,
}

impl PkgCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PackageClient for PkgCli {
    fn installed(&self, name: &str) -> Result<bool, DriverError> {
        // Exit status is the answer; a missing package is not an error
        let output = run(&self.program, &["list", "--installed", name])?;
        Ok(output.success())
    }

    fn upgradable(&self, name: &str) -> Result<bool, DriverError> {
        // check-update exits 100 when updates are available
        let output = run(&self.program, &["check-update", name])?;
        Ok(output.status == 100)
    }

    fn install(&self, names: &[String]) -> Result<(), DriverError> {
        debug!("installing packages: {}", names.join(", "));
        let mut args = vec!["install", "-y"];
        args.extend(names.iter().map(String::as_str));
        run_checked(&self.program, &args).map(|_| ())
    }

    fn upgrade(&self, names: &[String]) -> Result<(), DriverError> {
        debug!("upgrading packages: {}", names.join(", "));
        let mut args = vec!["upgrade", "-y"];
        args.extend(names.iter().map(String::as_str));
        run_checked(&self.program, &args).map(|_| ())
    }

    fn remove(&self, names: &[String]) -> Result<(), DriverError> {
        debug!("removing packages: {}", names.join(", "));
        let mut args = vec!["remove", "-y"];
        args.extend(names.iter().map(String::as_str));
        run_checked(&self.program, &args).map(|_| ())
    }
}

impl GroupClient for PkgCli {
    fn installed(&self, group: &str) -> Result<bool, DriverError> {
        let output = run_checked(&self.program, &["group", "list", "--installed"])?;
        Ok(output.stdout.lines().any(|line| line.trim() == group))
    }

    fn install(&self, group: &str) -> Result<(), DriverError> {
        debug!("installing group: {group}");
        run_checked(&self.program, &["group", "install", "-y", group]).map(|_| ())
    }

    fn remove(&self, group: &str) -> Result<(), DriverError> {
        debug!("removing group: {group}");
        run_checked(&self.program, &["group", "remove", "-y", group]).map(|_| ())
    }
}

impl RepoClient for PkgCli {
    fn present(&self, id: &str) -> Result<bool, DriverError> {
        let output = run_checked(&self.program, &["repolist", "--enabled"])?;
        Ok(output
            .stdout
            .lines()
            .any(|line| line.split_whitespace().next() == Some(id)))
    }

    fn add(&self, id: &str) -> Result<(), DriverError> {
        debug!("enabling repository: {id}");
        run_checked(&self.program, &["config-manager", "--set-enabled", id]).map(|_| ())
    }

    fn remove(&self, id: &str) -> Result<(), DriverError> {
        debug!("disabling repository: {id}");
        run_checked(&self.program, &["config-manager", "--set-disabled", id]).map(|_| ())
    }
}

/// Executes opaque command lines through `sh -c`.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<CommandOutput, DriverError> {
        run("sh", &["-c", command])
    }
}

/// Service client driving `systemctl`.
pub struct SystemctlCli;

impl ServiceClient for SystemctlCli {
    fn registered(&self, name: &str) -> Result<bool, DriverError> {
        Ok(run("systemctl", &["is-enabled", "--quiet", name])?.success())
    }

    fn running(&self, name: &str) -> Result<bool, DriverError> {
        Ok(run("systemctl", &["is-active", "--quiet", name])?.success())
    }

    fn register(&self, name: &str) -> Result<(), DriverError> {
        run_checked("systemctl", &["enable", name]).map(|_| ())
    }

    fn unregister(&self, name: &str) -> Result<(), DriverError> {
        run_checked("systemctl", &["disable", name]).map(|_| ())
    }

    fn start(&self, name: &str) -> Result<(), DriverError> {
        run_checked("systemctl", &["start", name]).map(|_| ())
    }

    fn stop(&self, name: &str) -> Result<(), DriverError> {
        run_checked("systemctl", &["stop", name]).map(|_| ())
    }
}
