//! Dispatch facade shared by the two sharding regimes.
//!
//! Both [`server::ServerClusterRouter`] and [`client::ClientClusterRouter`]
//! expose the same `add`/`remove`/`get_connection`/`write_command`/
//! `read_response`/`execute_command` surface; only how they pick a
//! connection for a command differs.

pub mod client;
pub mod server;

pub use client::ClientClusterRouter;
pub use server::ServerClusterRouter;

use crate::command::Command;
use crate::connection::Reply;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A connection shared between a router's id-keyed pool and whatever
/// memoized lookup structure it layers on top (the server scheme's slot
/// cache). `tokio::sync::Mutex` is used rather than a plain `Mutex`
/// purely because the guard must be held across the `.await` points in
/// `write_command`/`read_response`/`execute_command` — the router
/// contract is still single-threaded cooperative (see the concurrency
/// section of the design notes), so there is no real contention to guard
/// against.
pub type SharedConnection = Arc<tokio::sync::Mutex<Box<dyn crate::connection::Connection>>>;

/// The common dispatch surface both routers implement.
#[async_trait]
pub trait ClusterRouter: Send + Sync {
    /// Adds `conn` to the pool under its router-specific id scheme,
    /// returning the assigned id.
    fn add(&self, conn: Box<dyn crate::connection::Connection>) -> String;

    /// Removes the connection identified by `id` from the pool, if present.
    fn remove_by_id(&self, id: &str) -> Option<SharedConnection>;

    /// Removes `conn` from the pool, identifying it by its canonical id
    /// (alias if set, else `host:port`) rather than by object identity.
    fn remove(&self, conn: &dyn crate::connection::Connection) -> Option<SharedConnection> {
        self.remove_by_id(&conn.parameters().id())
    }

    /// Number of connections currently in the pool.
    fn count(&self) -> usize;

    /// Every connection id currently in the pool, in router-defined order.
    fn connection_ids(&self) -> Vec<String>;

    /// Looks up a pooled connection by its canonical id.
    fn get_connection_by_id(&self, id: &str) -> Option<SharedConnection>;

    /// Picks the connection that should handle `cmd`, computing and
    /// memoizing its routing hash on first use.
    async fn get_connection(&self, cmd: &dyn Command) -> Result<SharedConnection>;

    /// Routes `cmd` and writes it to the target connection, without
    /// waiting for a reply.
    async fn write_command(&self, cmd: &dyn Command) -> Result<()> {
        let conn = self.get_connection(cmd).await?;
        let mut guard = conn.lock().await;
        guard
            .write_command(cmd)
            .await
            .map_err(crate::error::RoutingError::Connection)
    }

    /// Routes `cmd` and reads its reply off the target connection,
    /// without re-sending it — the counterpart to `write_command` for
    /// callers that issue the write and the read as separate steps.
    async fn read_response(&self, cmd: &dyn Command) -> Result<Reply> {
        let conn = self.get_connection(cmd).await?;
        let mut guard = conn.lock().await;
        guard.read_response().await.map_err(crate::error::RoutingError::Connection)
    }

    /// Routes `cmd`, sends it, and returns its reply, transparently
    /// following any MOVED/ASK redirection the target reports.
    async fn execute_command(&self, cmd: &dyn Command) -> Result<Reply>;

    /// Opens every pooled connection that is not already connected.
    async fn connect(&self) -> Result<()> {
        for id in self.connection_ids() {
            if let Some(conn) = self.get_connection_by_id(&id) {
                let mut guard = conn.lock().await;
                if !guard.is_connected() {
                    guard.connect().await.map_err(crate::error::RoutingError::Connection)?;
                }
            }
        }
        Ok(())
    }

    /// Closes every pooled connection.
    async fn disconnect(&self) {
        for id in self.connection_ids() {
            if let Some(conn) = self.get_connection_by_id(&id) {
                conn.lock().await.disconnect().await;
            }
        }
    }

    /// True if every pooled connection is currently open.
    async fn is_connected(&self) -> bool {
        for id in self.connection_ids() {
            if let Some(conn) = self.get_connection_by_id(&id) {
                if !conn.lock().await.is_connected() {
                    return false;
                }
            }
        }
        true
    }
}

/// Maximum depth of chained MOVED/ASK redirects before a command's
/// `execute_command` gives up and surfaces a `ClientException`. The
/// source this core is modeled on leaves the cap unbounded; §9 of the
/// design notes picks 16 to bound pathological redirect loops.
pub(crate) const MAX_REDIRECT_DEPTH: usize = 16;

/// An insertion-ordered id → connection map, shared by both routers.
///
/// A plain `Vec` rather than a hash map so `connection_ids`/iteration
/// order matches insertion order deterministically, per the "iteration"
/// design note — at cluster scale (tens of nodes) a linear scan per
/// lookup is not a concern.
#[derive(Default)]
pub(crate) struct Pool {
    entries: Vec<(String, SharedConnection)>,
}

impl Pool {
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn insert(&mut self, id: String, conn: SharedConnection) {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            slot.1 = conn;
        } else {
            self.entries.push((id, conn));
        }
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<SharedConnection> {
        let idx = self.entries.iter().position(|(existing, _)| existing == id)?;
        Some(self.entries.remove(idx).1)
    }

    pub(crate) fn get(&self, id: &str) -> Option<SharedConnection> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, conn)| conn.clone())
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &SharedConnection> {
        self.entries.iter().map(|(_, conn)| conn)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
