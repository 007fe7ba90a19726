//! Error types for the cluster routing core.

use std::fmt;

/// Structured redirection/error kinds a server reply can carry.
///
/// Mirrors the handful of prefixes the routing core actually interprets;
/// everything else passes through as an opaque server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectKind {
    /// `MOVED <slot> <host>:<port>` — slot permanently reassigned.
    Moved { slot: u16, addr: String },
    /// `ASK <slot> <host>:<port>` — one-off redirect, routing state unchanged.
    Ask { slot: u16, addr: String },
}

impl RedirectKind {
    /// Parse a server error message, returning the redirect it describes if any.
    ///
    /// Splits on the first space into a prefix and the rest, then splits the
    /// rest on the first space into `slot` and `host:port`, per the wire
    /// contract in the routing core's error handling design.
    pub fn from_error_msg(msg: &str) -> Option<Self> {
        if let Some(rest) = msg.strip_prefix("MOVED ") {
            let (slot_str, addr) = rest.split_once(' ')?;
            let slot = slot_str.parse::<u16>().ok()?;
            return Some(Self::Moved {
                slot,
                addr: addr.to_string(),
            });
        }
        if let Some(rest) = msg.strip_prefix("ASK ") {
            let (slot_str, addr) = rest.split_once(' ')?;
            let slot = slot_str.parse::<u16>().ok()?;
            return Some(Self::Ask {
                slot,
                addr: addr.to_string(),
            });
        }
        None
    }
}

/// All error variants the routing core can raise.
#[derive(Debug)]
pub enum RoutingError {
    /// The command cannot be routed: no key, an unknown shapeless command,
    /// or a multi-key command whose keys do not share a slot/node.
    NotSupported(String),
    /// A protocol-level anomaly: an unrecognized redirection prefix, a
    /// malformed `host:port`, or a redirect chain past the configured cap.
    ClientException(String),
    /// The underlying `Connection` collaborator raised while connecting,
    /// writing, or reading. The core does not interpret transport errors,
    /// only propagates them.
    Connection(Box<dyn std::error::Error + Send + Sync>),
}

impl RoutingError {
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn client_exception(msg: impl Into<String>) -> Self {
        Self::ClientException(msg.into())
    }

    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Box::new(err))
    }
}

impl fmt::Display for RoutingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSupported(msg) => write!(f, "not supported: {msg}"),
            Self::ClientException(msg) => write!(f, "client exception: {msg}"),
            Self::Connection(e) => write!(f, "connection error: {e}"),
        }
    }
}

impl std::error::Error for RoutingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RoutingError>;
