//! The abstract `Connection` collaborator the routing core dispatches
//! through. The core never opens a socket itself — it only drives
//! whatever implementation a caller registers with the [`crate::factory::ConnectionFactory`].

use async_trait::async_trait;
use std::fmt;

/// Connection parameters a router needs to address and identify a backend.
///
/// Parsing these out of a URL or config file is explicitly out of scope
/// for the routing core — callers construct this directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    /// User-chosen identity for this connection. When set, it is used as
    /// the pool/ring key instead of `host:port`.
    pub alias: Option<String>,
    /// Ring weight for the client-side scheme; ignored by the
    /// server-authoritative scheme. Defaults to 1.
    pub weight: u32,
    /// Selects which registered initializer the factory uses to build a
    /// connection from these parameters.
    pub scheme: String,
}

impl ConnectionParameters {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            alias: None,
            weight: 1,
            scheme: "tcp".to_string(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// The canonical id a router uses to key its pool: the alias if set,
    /// else `host:port`.
    pub fn id(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => format!("{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A reply from a backend: either an opaque successful value or a
/// server-reported error string. The routing core inspects only the
/// error case, looking for `MOVED `/`ASK ` prefixes.
#[derive(Debug, Clone)]
pub enum Reply {
    Value(Vec<u8>),
    Error(String),
}

impl Reply {
    pub fn as_error(&self) -> Option<&str> {
        match self {
            Reply::Error(msg) => Some(msg),
            Reply::Value(_) => None,
        }
    }
}

/// A single backend connection. Implementations own the wire codec and
/// transport; the routing core only calls through this trait.
#[async_trait]
pub trait Connection: Send + Sync {
    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    async fn disconnect(&mut self);
    fn is_connected(&self) -> bool;

    async fn write_command(
        &mut self,
        cmd: &dyn crate::command::Command,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn read_response(&mut self) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>>;

    /// Convenience combining `write_command` + `read_response`, which most
    /// transports can implement more efficiently than the two calls in
    /// sequence (e.g. a single syscall for request-response protocols).
    async fn execute_command(
        &mut self,
        cmd: &dyn crate::command::Command,
    ) -> Result<Reply, Box<dyn std::error::Error + Send + Sync>> {
        self.write_command(cmd).await?;
        self.read_response().await
    }

    fn parameters(&self) -> &ConnectionParameters;
}
