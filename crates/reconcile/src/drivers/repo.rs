//! Repository driver - reconciles a package repository to present/absent.

use log::debug;

use crate::driver::{ApplyContext, Descriptor, Driver, DriverKind, Outcome, TargetState};
use crate::error::{DriverError, LoadError};

/// External repository access used by [`RepoDriver`].
pub trait RepoClient: Send + Sync {
    /// Whether the repository is currently configured and enabled.
    fn present(&self, id: &str) -> Result<bool, DriverError>;

    /// Configure/enable the repository.
    fn add(&self, id: &str) -> Result<(), DriverError>;

    /// Remove/disable the repository.
    fn remove(&self, id: &str) -> Result<(), DriverError>;
}

/// Reconciles package repositories through a [`RepoClient`].
pub struct RepoDriver {
    client: Box<dyn RepoClient>,
}

impl RepoDriver {
    pub fn new(client: Box<dyn RepoClient>) -> Self {
        Self { client }
    }
}

impl Driver for RepoDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Repository
    }

    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let Descriptor::Repository { id: repo_id, state } = descriptor else {
            return Err(LoadError::schema(id, "expected a repository descriptor"));
        };
        if repo_id.trim().is_empty() {
            return Err(LoadError::schema(id, "repository id is blank"));
        }
        if !matches!(state, TargetState::Present | TargetState::Absent) {
            return Err(LoadError::schema(
                id,
                format!("state '{state}' does not apply to repositories"),
            ));
        }
        Ok(())
    }

    fn reconcile(
        &self,
        descriptor: &Descriptor,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        let Descriptor::Repository { id, state } = descriptor else {
            return Err(DriverError::Client(
                "repository driver invoked with a non-repository descriptor".to_string(),
            ));
        };
        debug!("reconcile repository '{id}' -> {state}");

        let present = self.client.present(id)?;
        match state {
            TargetState::Present => {
                if present {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.add(id)?;
                Ok(Outcome::changed(format!("enabled repository {id}")))
            }
            TargetState::Absent => {
                if !present {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.remove(id)?;
                Ok(Outcome::changed(format!("removed repository {id}")))
            }
            _ => Err(DriverError::Unsupported(format!(
                "repositories cannot be reconciled to '{state}'"
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
    struct MockRepos(Arc<Mutex<BTreeSet<String>>>);

    impl RepoClient for MockRepos {
        fn present(&self, id: &str) -> Result<bool, DriverError> {
            Ok(self.0.lock().unwrap().contains(id))
        }

        fn add(&self, id: &str) -> Result<(), DriverError> {
            self.0.lock().unwrap().insert(id.to_string());
            Ok(())
        }

        fn remove(&self, id: &str) -> Result<(), DriverError> {
            self.0.lock().unwrap().remove(id);
            Ok(())
        }
    }

    fn absent(id: &str) -> Descriptor {
        Descriptor::Repository {
            id: id.into(),
            state: TargetState::Absent,
        }
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mock = MockRepos::default();
        mock.0.lock().unwrap().insert("copr:stale".into());
        let driver = RepoDriver::new(Box::new(mock.clone()));
        let ctx = ApplyContext::default();

        assert!(driver.reconcile(&absent("copr:stale"), &ctx).unwrap().is_change());
        assert_eq!(
            driver.reconcile(&absent("copr:stale"), &ctx).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_client_failure_is_reported_not_thrown() {
        struct FailingRepos;
        impl RepoClient for FailingRepos {
            fn present(&self, _id: &str) -> Result<bool, DriverError> {
                Err(DriverError::Client("repo metadata unavailable".into()))
            }
            fn add(&self, _id: &str) -> Result<(), DriverError> {
                Ok(())
            }
            fn remove(&self, _id: &str) -> Result<(), DriverError> {
                Ok(())
            }
        }

        let driver = RepoDriver::new(Box::new(FailingRepos));
        let err = driver
            .reconcile(&absent("copr:stale"), &ApplyContext::default())
            .unwrap_err();
        assert!(matches!(err, DriverError::Client(_)));
    }
}
