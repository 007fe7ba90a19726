//! Cluster routing core for a sharded key-value client.
//!
//! Given a stream of commands, decides which backend connection each one
//! must be sent to under one of two sharding regimes — a server-owned
//! slot map with MOVED/ASK redirection ([`router::server`]), or a
//! client-owned consistent-hash ring over independent servers
//! ([`router::client`]) — and keeps that decision consistent as the
//! topology changes at runtime.
//!
//! The wire codec, transport, and command catalog are external
//! collaborators the core only reaches through the [`connection`] and
//! [`command`] traits.

pub mod command;
pub mod connection;
pub mod crc16;
pub mod error;
pub mod factory;
pub mod key_extractor;
pub mod ring;
pub mod router;

pub use command::{BasicCommand, Command, RoutingDescriptor};
pub use connection::{Connection, ConnectionParameters, Reply};
pub use error::{RoutingError, Result};
pub use factory::ConnectionFactory;
pub use router::{ClientClusterRouter, ClusterRouter, ServerClusterRouter};
