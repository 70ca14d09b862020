//! Service driver - reconciles a managed service.
//!
//! `present`/`absent` control whether the service is registered with the
//! service manager; `started`/`stopped` control whether it is running.

use log::debug;

use crate::driver::{ApplyContext, Descriptor, Driver, DriverKind, Outcome, TargetState};
use crate::error::{DriverError, LoadError};

/// External service-manager access used by [`ServiceDriver`].
pub trait ServiceClient: Send + Sync {
    /// Whether the service is registered/enabled.
    fn registered(&self, name: &str) -> Result<bool, DriverError>;

    /// Whether the service is currently running.
    fn running(&self, name: &str) -> Result<bool, DriverError>;

    fn register(&self, name: &str) -> Result<(), DriverError>;
    fn unregister(&self, name: &str) -> Result<(), DriverError>;
    fn start(&self, name: &str) -> Result<(), DriverError>;
    fn stop(&self, name: &str) -> Result<(), DriverError>;
}

/// Reconciles services through a [`ServiceClient`].
pub struct ServiceDriver {
    client: Box<dyn ServiceClient>,
}

impl ServiceDriver {
    pub fn new(client: Box<dyn ServiceClient>) -> Self {
        Self { client }
    }
}

impl Driver for ServiceDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Service
    }

    fn validate(&self, id: &str, descriptor: &Descriptor) -> Result<(), LoadError> {
        let Descriptor::Service { name, state } = descriptor else {
            return Err(LoadError::schema(id, "expected a service descriptor"));
        };
        if name.trim().is_empty() {
            return Err(LoadError::schema(id, "service name is blank"));
        }
        if matches!(state, TargetState::Latest) {
            return Err(LoadError::schema(id, "state 'latest' does not apply to services"));
        }
        Ok(())
    }

    fn reconcile(
        &self,
        descriptor: &Descriptor,
        ctx: &ApplyContext,
    ) -> Result<Outcome, DriverError> {
        let Descriptor::Service { name, state } = descriptor else {
            return Err(DriverError::Client(
                "service driver invoked with a non-service descriptor".to_string(),
            ));
        };
        debug!("reconcile service '{name}' -> {state}");

        match state {
            TargetState::Present => {
                if self.client.registered(name)? {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.register(name)?;
                Ok(Outcome::changed(format!("registered service {name}")))
            }
            TargetState::Absent => {
                if !self.client.registered(name)? {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                // A running service is stopped before it is unregistered
                if self.client.running(name)? {
                    self.client.stop(name)?;
                }
                self.client.unregister(name)?;
                Ok(Outcome::changed(format!("unregistered service {name}")))
            }
            TargetState::Started => {
                if self.client.running(name)? {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.start(name)?;
                Ok(Outcome::changed(format!("started service {name}")))
            }
            TargetState::Stopped => {
                if !self.client.running(name)? {
                    return Ok(Outcome::Unchanged);
                }
                if ctx.dry_run {
                    return Ok(ctx.dry_run_skip());
                }
                self.client.stop(name)?;
                Ok(Outcome::changed(format!("stopped service {name}")))
            }
            TargetState::Latest => Err(DriverError::Unsupported(
                "services cannot be reconciled to 'latest'".to_string(),
            )),
        }
    }
}
