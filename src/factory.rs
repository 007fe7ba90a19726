//! Maps a connection scheme (`tcp`, `unix`, ...) to whatever constructs a
//! concrete [`Connection`] for it, so routers can materialize connections
//! on demand (e.g. when a MOVED reply names a host they have never seen).

use crate::connection::{Connection, ConnectionParameters};
use crate::error::{Result, RoutingError};
use std::collections::HashMap;
use std::sync::Arc;

/// A scheme's constructor: given parameters, produce a not-yet-connected
/// `Connection`. Kept synchronous — connecting is the caller's job via
/// `Connection::connect`, matching the lifecycle in the data model
/// (unopened -> open -> closed).
pub type Initializer = Arc<dyn Fn(&ConnectionParameters) -> Box<dyn Connection> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConnectionFactory {
    schemes: HashMap<String, Initializer>,
}

impl ConnectionFactory {
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
        }
    }

    /// Registers (or replaces) the initializer for `scheme`.
    pub fn define(&mut self, scheme: impl Into<String>, initializer: Initializer) {
        self.schemes.insert(scheme.into(), initializer);
    }

    /// Removes a previously registered scheme, if any.
    pub fn undefine(&mut self, scheme: &str) {
        self.schemes.remove(scheme);
    }

    /// Builds a connection for `params` using the initializer registered
    /// under `params.scheme`.
    pub fn create(&self, params: &ConnectionParameters) -> Result<Box<dyn Connection>> {
        let initializer = self.schemes.get(params.scheme.as_str()).ok_or_else(|| {
            RoutingError::client_exception(format!("no initializer registered for scheme '{}'", params.scheme))
        })?;
        Ok(initializer(params))
    }

    /// Builds a connection for each entry in `params`, in order, adding
    /// each one to `router` as it's built, and hands `router` back. A
    /// convenience for bootstrapping a router from a static seed list;
    /// bails on the first unregistered scheme, leaving `router` holding
    /// whichever connections were already added.
    pub fn create_aggregated<R: crate::router::ClusterRouter>(
        &self,
        router: R,
        params: &[ConnectionParameters],
    ) -> Result<R> {
        for p in params {
            let conn = self.create(p)?;
            router.add(conn);
        }
        Ok(router)
    }
}
