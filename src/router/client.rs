//! Client-side cluster router.
//!
//! Routing is entirely local: a consistent-hash ring decides which pooled
//! connection owns a key, and the server has no say — there is no
//! redirection protocol in this regime, a reply is surfaced as-is.

use crate::command::Command;
use crate::connection::{Connection, Reply};
use crate::error::{Result, RoutingError};
use crate::key_extractor;
use crate::ring::{self, Ring};
use crate::router::{ClusterRouter, Pool, SharedConnection};

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Routes commands over an independent pool of servers via consistent
/// hashing, and can broadcast a command to every pooled connection.
pub struct ClientClusterRouter {
    pool: RwLock<Pool>,
    ring: RwLock<Ring<String>>,
    next_index: AtomicUsize,
}

impl Default for ClientClusterRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientClusterRouter {
    pub fn new() -> Self {
        Self {
            pool: RwLock::new(Pool::new()),
            ring: RwLock::new(Ring::new()),
            next_index: AtomicUsize::new(0),
        }
    }

    fn node_for_hash(&self, hash: u32) -> Result<SharedConnection> {
        let ring = self.ring.read();
        let id = ring
            .get(hash)
            .ok_or_else(|| RoutingError::not_supported("no connections available to route to"))?
            .clone();
        drop(ring);
        self.pool
            .read()
            .get(&id)
            .ok_or_else(|| RoutingError::client_exception(format!("ring points at unknown connection '{id}'")))
    }

    /// Looks up the connection that owns `key` directly, bypassing the
    /// per-command routing descriptor — the raw path used by public
    /// "connection by key" queries.
    pub fn get_connection_by_key(&self, key: &[u8]) -> Result<SharedConnection> {
        self.node_for_hash(ring::hash_key(key))
    }

    /// Runs `cmd` against every pooled connection, preserving iteration
    /// order, and collects each reply. There is no routing decision here
    /// — every node sees the command.
    pub async fn execute_command_on_nodes(&self, cmd: &dyn Command) -> Result<Vec<Reply>> {
        let conns: Vec<SharedConnection> = self.pool.read().values().cloned().collect();
        let mut replies = Vec::with_capacity(conns.len());
        for conn in conns {
            let mut guard = conn.lock().await;
            let reply = guard.execute_command(cmd).await.map_err(RoutingError::Connection)?;
            replies.push(reply);
        }
        Ok(replies)
    }
}

#[async_trait]
impl ClusterRouter for ClientClusterRouter {
    /// Adds `conn` to the pool, keyed by its alias if set else a numeric
    /// index, and registers it with the ring under its declared weight
    /// (default 1). Returns the assigned id.
    fn add(&self, conn: Box<dyn Connection>) -> String {
        let params = conn.parameters().clone();
        let id = params
            .alias
            .clone()
            .unwrap_or_else(|| self.next_index.fetch_add(1, Ordering::Relaxed).to_string());
        let shared: SharedConnection = std::sync::Arc::new(tokio::sync::Mutex::new(conn));
        self.pool.write().insert(id.clone(), shared);
        self.ring.write().add(&id, id.clone(), params.weight);
        id
    }

    /// Removes a connection from both the pool and the ring.
    fn remove_by_id(&self, id: &str) -> Option<SharedConnection> {
        let removed = self.pool.write().remove(id);
        if removed.is_some() {
            self.ring.write().remove(&id.to_string());
        }
        removed
    }

    fn count(&self) -> usize {
        self.pool.read().len()
    }

    fn connection_ids(&self) -> Vec<String> {
        self.pool.read().ids()
    }

    fn get_connection_by_id(&self, id: &str) -> Option<SharedConnection> {
        self.pool.read().get(id)
    }

    async fn get_connection(&self, cmd: &dyn Command) -> Result<SharedConnection> {
        if let Some(hash) = cmd.hash() {
            return self.node_for_hash(hash);
        }

        let hashes = key_extractor::client_key_hashes(cmd)?;
        let first_node = {
            let ring = self.ring.read();
            hashes
                .iter()
                .map(|h| ring.get(*h).cloned())
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| RoutingError::not_supported("no connections available to route to"))?
        };
        let target_id = first_node.first().cloned().expect("client_key_hashes never returns empty");
        if !first_node.iter().all(|id| id == &target_id) {
            return Err(RoutingError::not_supported(format!(
                "{} keys do not share a single node",
                cmd.id()
            )));
        }

        cmd.set_hash(hashes[0]);
        self.pool
            .read()
            .get(&target_id)
            .ok_or_else(|| RoutingError::client_exception(format!("ring points at unknown connection '{target_id}'")))
    }

    /// There is no server-side redirection in this regime: the reply is
    /// surfaced to the caller exactly as received.
    async fn execute_command(&self, cmd: &dyn Command) -> Result<Reply> {
        let conn = self.get_connection(cmd).await?;
        let mut guard = conn.lock().await;
        guard.execute_command(cmd).await.map_err(RoutingError::Connection)
    }
}
