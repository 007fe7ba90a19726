//! Shared helpers for black-box integration tests.
//!
//! These drive [`shardkv_router`] through its public API only, against an
//! in-process mock [`Connection`] that replays scripted replies — there is
//! no real socket or server here, matching the routing core's contract
//! that the wire codec and transport are external collaborators.

#![allow(dead_code)]

use shardkv_router::{Connection, ConnectionParameters, Command, Reply};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A connection that replays a fixed queue of replies and records every
/// command it was asked to execute, in order.
pub struct MockConnection {
    params: ConnectionParameters,
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<String>>,
    connected: Mutex<bool>,
}

impl MockConnection {
    pub fn new(params: ConnectionParameters, replies: Vec<Reply>) -> Self {
        Self {
            params,
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
            connected: Mutex::new(false),
        }
    }

    pub fn boxed(params: ConnectionParameters, replies: Vec<Reply>) -> Box<dyn Connection> {
        Box::new(Self::new(params, replies))
    }

    pub fn commands_seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        *self.connected.lock().unwrap() = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        *self.connected.lock().unwrap() = false;
    }

    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    async fn write_command(
        &mut self,
        cmd: &dyn Command,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.seen.lock().unwrap().push(cmd.id().to_string());
        Ok(())
    }

    async fn read_response(&mut self) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Value(vec![])))
    }

    async fn execute_command(
        &mut self,
        cmd: &dyn Command,
    ) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>> {
        self.seen.lock().unwrap().push(cmd.id().to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Value(vec![])))
    }

    fn parameters(&self) -> &ConnectionParameters {
        &self.params
    }
}

/// A connection factory whose only registered scheme (`tcp`) hands back a
/// `MockConnection` seeded with `replies`, for routers that need to
/// materialize a connection to an address they have never seen (e.g. a
/// MOVED target).
pub fn mock_factory(replies: Vec<Reply>) -> shardkv_router::ConnectionFactory {
    let mut factory = shardkv_router::ConnectionFactory::new();
    let replies = std::sync::Arc::new(Mutex::new(replies));
    factory.define(
        "tcp",
        std::sync::Arc::new(move |p: &ConnectionParameters| {
            let seeded = replies.lock().unwrap().drain(..).collect();
            MockConnection::boxed(p.clone(), seeded)
        }),
    );
    factory
}
