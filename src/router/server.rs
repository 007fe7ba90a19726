//! Server-authoritative cluster router.
//!
//! Holds a sparse slot → connection-id map learned from an optional
//! preconfigured range plus whatever MOVED replies teach it at runtime,
//! and a slot → connection handle cache that memoizes the resolved
//! lookup. No background refresh: the map only ever grows or is
//! rewritten by a redirect, per the Non-goals.

use crate::command::Command;
use crate::connection::{Connection, ConnectionParameters, Reply};
use crate::crc16;
use crate::error::{RedirectKind, Result, RoutingError};
use crate::factory::ConnectionFactory;
use crate::key_extractor;
use crate::router::{ClusterRouter, Pool, SharedConnection, MAX_REDIRECT_DEPTH};

use async_trait::async_trait;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Routes commands over a slot-sharded deployment and follows the
/// server's MOVED/ASK redirection protocol.
pub struct ServerClusterRouter {
    pool: RwLock<Pool>,
    /// slot → connection id; a partial function, undefined slots mean
    /// "unknown — guess".
    slots_map: RwLock<HashMap<u16, String>>,
    /// slot → connection handle, memoizing the map+pool lookup.
    slots: RwLock<HashMap<u16, SharedConnection>>,
    factory: ConnectionFactory,
}

impl ServerClusterRouter {
    pub fn new(factory: ConnectionFactory) -> Self {
        Self {
            pool: RwLock::new(Pool::new()),
            slots_map: RwLock::new(HashMap::new()),
            slots: RwLock::new(HashMap::new()),
            factory,
        }
    }

    /// Bulk-asserts that slots `first..=last` belong to `conn_id`,
    /// overwriting any prior mapping. Validated against the full
    /// 16384-slot range (the 0–4095 bound in the source this router is
    /// modeled on was a bug — see the design notes).
    pub fn set_slots(&self, first: u16, last: u16, conn_id: impl Into<String>) -> Result<()> {
        if first as usize >= crc16::SLOT_COUNT as usize || last as usize >= crc16::SLOT_COUNT as usize {
            return Err(RoutingError::client_exception(format!(
                "slot range [{first}, {last}] out of bounds [0, {})",
                crc16::SLOT_COUNT
            )));
        }
        if last < first {
            return Err(RoutingError::client_exception(format!(
                "slot range [{first}, {last}] has last < first"
            )));
        }
        let id = conn_id.into();
        let mut slots_map = self.slots_map.write();
        let mut slots = self.slots.write();
        for slot in first..=last {
            slots_map.insert(slot, id.clone());
            // The mapping changed: drop any stale cached handle so the
            // next lookup re-resolves through the pool.
            slots.remove(&slot);
        }
        Ok(())
    }

    /// Resolves `slot` to a connection handle: cache, then slot map,
    /// then a random pooled connection as a last resort (the server will
    /// redirect if the guess is wrong).
    fn resolve_slot(&self, slot: u16) -> Result<SharedConnection> {
        if let Some(conn) = self.slots.read().get(&slot).cloned() {
            return Ok(conn);
        }

        let pool = self.pool.read();
        let mapped_id = self.slots_map.read().get(&slot).cloned();
        let conn = match mapped_id {
            Some(id) => pool.get(&id).ok_or_else(|| {
                RoutingError::client_exception(format!(
                    "slot {slot} maps to unknown connection '{id}'"
                ))
            })?,
            None => {
                let ids = pool.ids();
                let id = ids.choose(&mut rand::thread_rng()).ok_or_else(|| {
                    RoutingError::client_exception("no connections available to route to")
                })?;
                pool.get(id).expect("id just came from this pool")
            }
        };
        drop(pool);
        self.slots.write().insert(slot, conn.clone());
        Ok(conn)
    }

    /// Materializes (or reuses) the connection a redirect points at,
    /// adding it to the pool if it wasn't already known.
    async fn connection_for_redirect(&self, addr: &str) -> Result<SharedConnection> {
        if let Some(conn) = self.pool.read().get(addr) {
            return Ok(conn);
        }
        let (host, port) = addr.rsplit_once(':').ok_or_else(|| {
            RoutingError::client_exception(format!("malformed redirect address '{addr}'"))
        })?;
        let port: u16 = port
            .parse()
            .map_err(|_| RoutingError::client_exception(format!("malformed redirect port in '{addr}'")))?;
        let params = ConnectionParameters::new(host, port);
        let mut new_conn = self.factory.create(&params)?;
        new_conn.connect().await.map_err(RoutingError::Connection)?;
        let id = new_conn.parameters().id();
        let shared: SharedConnection = std::sync::Arc::new(tokio::sync::Mutex::new(new_conn));
        self.pool.write().insert(id, shared.clone());
        Ok(shared)
    }

    async fn dispatch(&self, cmd: &dyn Command, depth: usize) -> Result<Reply> {
        if depth > MAX_REDIRECT_DEPTH {
            return Err(RoutingError::client_exception(format!(
                "exceeded {MAX_REDIRECT_DEPTH} chained MOVED/ASK redirects"
            )));
        }

        let conn = self.get_connection(cmd).await?;
        let reply = {
            let mut guard = conn.lock().await;
            guard.execute_command(cmd).await.map_err(RoutingError::Connection)?
        };

        let msg = match reply.as_error() {
            Some(msg) => msg.to_string(),
            None => return Ok(reply),
        };

        match RedirectKind::from_error_msg(&msg) {
            Some(RedirectKind::Moved { slot, addr }) => {
                tracing::info!(slot, %addr, "MOVED redirect, rewriting slot cache");
                let target = self.connection_for_redirect(&addr).await?;
                self.slots.write().insert(slot, target);
                Box::pin(self.dispatch(cmd, depth + 1)).await
            }
            Some(RedirectKind::Ask { slot, addr }) => {
                tracing::info!(slot, %addr, "ASK redirect, one-off dispatch");
                let target = self.connection_for_redirect(&addr).await?;
                let mut guard = target.lock().await;
                let asking = crate::command::BasicCommand::new("ASKING", vec![]);
                guard
                    .execute_command(&asking)
                    .await
                    .map_err(RoutingError::Connection)?;
                guard.execute_command(cmd).await.map_err(RoutingError::Connection)
            }
            None => {
                if msg.starts_with("MOVED") || msg.starts_with("ASK") {
                    Err(RoutingError::client_exception(format!(
                        "malformed redirection reply: {msg}"
                    )))
                } else {
                    Ok(reply)
                }
            }
        }
    }
}

#[async_trait]
impl ClusterRouter for ServerClusterRouter {
    /// Adds an already-constructed connection to the pool, keyed by
    /// `host:port` or its alias if set. Returns the assigned id.
    fn add(&self, conn: Box<dyn Connection>) -> String {
        let id = conn.parameters().id();
        let shared: SharedConnection = std::sync::Arc::new(tokio::sync::Mutex::new(conn));
        self.pool.write().insert(id.clone(), shared);
        id
    }

    fn remove_by_id(&self, id: &str) -> Option<SharedConnection> {
        self.pool.write().remove(id)
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
        let slot = match cmd.hash() {
            Some(h) => h as u16,
            None => {
                let slot = key_extractor::server_slot_hash(cmd)?;
                cmd.set_hash(slot as u32);
                slot
            }
        };
        self.resolve_slot(slot)
    }

    async fn execute_command(&self, cmd: &dyn Command) -> Result<Reply> {
        self.dispatch(cmd, 0).await
    }
}
