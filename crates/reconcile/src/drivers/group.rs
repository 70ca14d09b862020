//! Group driver - reconciles a package group to present/absent.
//!
//! Group removal cascades into member packages on some platforms. Whether
//! that cascade is safe is a per-platform configuration decision, not
//! something this driver can probe; when the platform only supports
//! leaf-only removal the driver refuses with an unsupported-operation
//! failure rather than silently removing unrelated packages.

use log::debug;

use crate::driver::{ApplyContext, Descriptor, Driver, DriverKind, Outcome, TargetState};
use crate::error::{DriverError, LoadError};

/// External group access used by [`GroupDriver`].
pub trait GroupClient: Send + Sync {
    /// Whether the named group is currently installed.
    fn installed(&self, group: &str) -> Result<bool, DriverError>;

    /// Install the named group.
    fn install(&self, group: &str) -> Result<(), DriverError>;

    /// Remove the named group, cascading into its member packages.
    fn remove(&self, group: &str) -> Result<(), DriverError>;
}

/// Reconciles package groups through a [`GroupClient`].
pub struct GroupDriver {
    client: Box<dyn GroupClient>,
    /// Whether cascading removal is safe on the current platform
    cascade_removal_safe: bool,
}

impl GroupDriver {
    pub fn new(client: Box<dyn GroupClient>, cascade_removal_safe: bool) -> Self {
        Self {
            client,
            cascade_removal_safe,
        }
    }
}

impl Driver for GroupDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Group
    }

    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let Descriptor::Group { name, state } = descriptor else {
            return Err(LoadError::schema(id, "expected a group descriptor"));
        };
        if name.trim().is_empty() {
            return Err(LoadError::schema(id, "group name is blank"));
        }
        if !matches!(state, TargetState::Present | TargetState::Absent) {
            return Err(LoadError::schema(
                id,
                format!("state '{state}' does not apply to groups"),
            ));
        }
        Ok(())
    }

    fn reconcile(
        &self,
        descriptor: &Descriptor,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        let Descriptor::Group { name, state } = descriptor else {
            return Err(DriverError::Client(
                "group driver invoked with a non-group descriptor".to_string(),
            ));
        };
        debug!("reconcile group '{name}' -> {state}");

        let installed = self.client.installed(name)?;
        match state {
            TargetState::Present => {
                if installed {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.install(name)?;
                Ok(Outcome::changed(format!("installed group {name}")))
            }
            TargetState::Absent => {
                if !installed {
                    return Ok(Outcome::Unchanged);
                }
                if !self.cascade_removal_safe {
                    // Refuse before touching anything
                    return Err(DriverError::Unsupported(format!(
                        "removing group '{name}' would cascade into member packages; \
                         leaf-only removal is required on this platform"
                    )));
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.remove(name)?;
                Ok(Outcome::changed(format!("removed group {name}")))
            }
            _ => Err(DriverError::Unsupported(format!(
                "groups cannot be reconciled to '{state}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockGroups {
        installed: Arc<Mutex<BTreeSet<String>>>,
        removals: Arc<Mutex<usize>>,
    }

    impl GroupClient for MockGroups {
        fn installed(&self, group: &str) -> Result<bool, DriverError> {
            Ok(self.installed.lock().unwrap().contains(group))
        }

        fn install(&self, group: &str) -> Result<(), DriverError> {
            self.installed.lock().unwrap().insert(group.to_string());
            Ok(())
        }

        fn remove(&self, group: &str) -> Result<(), DriverError> {
            *self.removals.lock().unwrap() += 1;
            self.installed.lock().unwrap().remove(group);
            Ok(())
        }
    }

    fn desc(state: TargetState) -> Descriptor {
        Descriptor::Group {
            name: "Development Tools".into(),
            state,
        }
    }

    #[test]
    fn test_removal_refused_when_cascade_unsafe() {
        let mock = MockGroups::default();
        mock.installed
            .lock()
            .unwrap()
            .insert("Development Tools".into());
        let driver = GroupDriver::new(Box::new(mock.clone()), false);

        let err = driver
            .reconcile(&desc(TargetState::Absent), &ApplyContext::default())
            .unwrap_err();
        assert!(err.is_unsupported());
        // No cascading removal was attempted
        assert_eq!(*mock.removals.lock().unwrap(), 0);
        assert!(mock.installed.lock().unwrap().contains("Development Tools"));
    }

    #[test]
    fn test_removal_when_cascade_safe() {
        let mock = MockGroups::default();
        mock.installed
            .lock()
            .unwrap()
            .insert("Development Tools".into());
        let driver = GroupDriver::new(Box::new(mock.clone()), true);

        let out = driver
            .reconcile(&desc(TargetState::Absent), &ApplyContext::default())
            .unwrap();
        assert!(out.is_change());

        // Already absent: unchanged, and the unsafe-platform check is moot
        let again = driver
            .reconcile(&desc(TargetState::Absent), &ApplyContext::default())
            .unwrap();
        assert_eq!(again, Outcome::Unchanged);
    }

    #[test]
    fn test_absent_group_with_unsafe_cascade_is_unchanged() {
        // The refusal only applies when removal would actually happen
        let driver = GroupDriver::new(Box::new(MockGroups::default()), false);
        let out = driver
            .reconcile(&desc(TargetState::Absent), &ApplyContext::default())
            .unwrap();
        assert_eq!(out, Outcome::Unchanged);
    }

    #[test]
    fn test_install_is_idempotent() {
        let mock = MockGroups::default();
        let driver = GroupDriver::new(Box::new(mock.clone()), false);
        let ctx = ApplyContext::default();

        assert!(
            driver
                .reconcile(&desc(TargetState::Present), &ctx)
                .unwrap()
                .is_change()
        );
        assert_eq!(
            driver.reconcile(&desc(TargetState::Present), &ctx).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_validate_rejects_service_states() {
        let driver = GroupDriver::new(Box::new(MockGroups::default()), true);
        assert!(driver.validate("g", &desc(TargetState::Started)).is_err());
        assert!(driver.validate("g", &desc(TargetState::Present)).is_ok());
    }
}
