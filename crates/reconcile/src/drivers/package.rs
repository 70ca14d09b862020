//! Package driver - reconciles a set of packages to present/absent/latest.

use log::debug;

use crate::driver::{ApplyContext, Descriptor, Driver, DriverKind, Outcome, TargetState};
use crate::error::{DriverError, LoadError};

/// External package-manager access used by [`PackageDriver`].
///
/// The package manager's own protocol and quirks stay behind this seam.
pub trait PackageClient: Send + Sync {
    /// Whether the named package is currently installed.
    fn installed(&self, name: &str) -> Result<bool, DriverError>;

    /// Whether an installed package has a newer version available.
    fn upgradable(&self, name: &str) -> Result<bool, DriverError>;

    /// Install the named packages.
    fn install(&self, names: &[String]) -> Result<(), DriverError>;

    /// Upgrade the named packages to their latest versions.
    fn upgrade(&self, names: &[String]) -> Result<(), DriverError>;

    /// Remove the named packages.
    fn remove(&self, names: &[String]) -> Result<(), DriverError>;
}

/// Reconciles package sets through a [`PackageClient`].
pub struct PackageDriver {
    client: Box<dyn PackageClient>,
}

impl PackageDriver {
    pub fn new(client: Box<dyn PackageClient>) -> Self {
        Self { client }
    }

    fn reconcile_set(
        &self,
        names: &[String],
        state: TargetState,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        match state {
            TargetState::Present => {
                let missing = self.filter(names, |n| Ok(!self.client.installed(n)?))?;
                if missing.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.install(&missing)?;
                Ok(Outcome::changed(format!("installed {}", missing.join(", "))))
            }
            TargetState::Absent => {
                let present = self.filter(names, |n| self.client.installed(n))?;
                if present.is_empty() {
                    // Already absent is unchanged, never a failure
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.remove(&present)?;
                Ok(Outcome::changed(format!("removed {}", present.join(", "))))
            }
            TargetState::Latest => {
                let missing = self.filter(names, |n| Ok(!self.client.installed(n)?))?;
                let outdated = self.filter(names, |n| {
                    Ok(self.client.installed(n)? && self.client.upgradable(n)?)
                })?;
                if missing.is_empty() && outdated.is_empty() {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                if !missing.is_empty() {
                    self.client.install(&missing)?;
                }
                if !outdated.is_empty() {
                    self.client.upgrade(&outdated)?;
                }
                let mut touched = missing;
                touched.extend(outdated);
                Ok(Outcome::changed(format!("updated {}", touched.join(", "))))
            }
            TargetState::Started | TargetState::Stopped => Err(DriverError::Unsupported(format!(
                "packages cannot be reconciled to '{state}'"
            ))),
        }
    }

    fn filter<F>(&self, names: &[String], mut keep: F) -> Result<Vec<String>, DriverError>
    where
        F: FnMut(&str) -> Result<bool, DriverError>,
    {
        let mut out = Vec::new();
        for name in names {
            if keep(name)? {
                out.push(name.clone());
            }
        }
        Ok(out)
    }
}

impl Driver for PackageDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Package
    }

    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let Descriptor::Package { names, state } = descriptor else {
            return Err(LoadError::schema(id, "expected a package descriptor"));
        };
        if names.is_empty() {
            return Err(LoadError::schema(id, "package name set is empty"));
        }
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(LoadError::schema(id, "package name is blank"));
        }
        if matches!(state, TargetState::Started | TargetState::Stopped) {
            return Err(LoadError::schema(
                id,
                format!("state '{state}' does not apply to packages"),
            ));
        }
        Ok(())
    }

    fn reconcile(
        &self,
        descriptor: &Descriptor,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        let Descriptor::Package { names, state } = descriptor else {
            return Err(DriverError::Client(
                "package driver invoked with a non-package descriptor".to_string(),
            ));
        };
        debug!("reconcile package set {names:?} -> {state}");
        self.reconcile_set(names, *state, ctx)
    }
}
