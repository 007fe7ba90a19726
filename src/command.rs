//! The abstract `Command` collaborator and per-command routing descriptors.
//!
//! The routing core does not own a command catalog — it consumes commands
//! through this trait so that callers can plug in whatever command
//! representation their wire layer already uses.

use std::sync::atomic::{AtomicU32, Ordering};

/// A single routable unit of work: an identifier plus its argument list,
/// with a slot for the routing hash to be memoized on once computed.
pub trait Command: Send + Sync {
    /// The command name, e.g. `"GET"`, `"MSET"`, case-insensitive by convention.
    fn id(&self) -> &str;

    /// The command's arguments, in wire order, not including the id itself.
    fn arguments(&self) -> &[Vec<u8>];

    /// The memoized routing hash, if one has already been computed for
    /// this command instance.
    fn hash(&self) -> Option<u32>;

    /// Store the computed routing hash on this command instance.
    fn set_hash(&self, hash: u32);
}

/// How a command's routing key(s) are positioned among its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDescriptor {
    /// The first argument is the routing key.
    FirstKey,
    /// The argument at a fixed, non-zero position is the routing key
    /// (e.g. `SORT key ...options`).
    KeyAt(usize),
    /// Every argument is a key; routable only if all keys agree on slot/node.
    AllKeys,
    /// Keys appear at `offset, offset + step, offset + 2*step, ...`
    /// (e.g. `MSET k1 v1 k2 v2` has step 2, offset 0).
    InterleavedKeys { step: usize, offset: usize },
    /// Argument 0 declares the key count `numkeys`; the following
    /// `numkeys` arguments are keys (e.g. `EVAL script numkeys k1 k2 ...`).
    EvalLike,
    /// Never routable on a sharded deployment (admin/transaction commands).
    Unroutable,
}

/// Looks up the routing descriptor for a known command id, falling back to
/// `FirstKey` for unrecognized commands that carry at least one argument
/// (so the table stays forward-compatible with commands it hasn't been
/// taught about yet) and `Unroutable` for unrecognized, argument-less ones.
pub fn descriptor_for(id: &str, arg_count: usize) -> RoutingDescriptor {
    match id.to_ascii_uppercase().as_str() {
        "GET" | "SET" | "SETEX" | "SETNX" | "APPEND" | "INCR" | "DECR" | "INCRBY" | "DECRBY"
        | "GETSET" | "STRLEN" | "TYPE" | "TTL" | "PTTL" | "EXPIRE" | "PERSIST" | "HGET"
        | "HSET" | "HDEL" | "HGETALL" | "LPUSH" | "RPUSH" | "LPOP" | "RPOP" | "LRANGE" | "SADD"
        | "SREM" | "SMEMBERS" | "ZADD" | "ZSCORE" | "ZRANGE" => RoutingDescriptor::FirstKey,

        "DEL" | "UNLINK" | "EXISTS" | "TOUCH" | "MGET" | "SUNION" | "SINTER" | "SDIFF"
        | "PFCOUNT" | "PFMERGE" => RoutingDescriptor::AllKeys,

        "MSET" | "MSETNX" => RoutingDescriptor::InterleavedKeys { step: 2, offset: 0 },

        "SORT" => RoutingDescriptor::KeyAt(1),

        "EVAL" | "EVALSHA" | "FCALL" | "FCALL_RO" => RoutingDescriptor::EvalLike,

        "PING" | "INFO" | "CLUSTER" | "CONFIG" | "CLIENT" | "COMMAND" | "DBSIZE" | "FLUSHALL"
        | "FLUSHDB" | "SCRIPT" | "SHUTDOWN" | "SLAVEOF" | "REPLICAOF" | "SUBSCRIBE"
        | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" | "MULTI" | "EXEC" | "DISCARD"
        | "WATCH" | "RANDOMKEY" => RoutingDescriptor::Unroutable,

        _ if arg_count > 0 => RoutingDescriptor::FirstKey,
        _ => RoutingDescriptor::Unroutable,
    }
}

/// A plain in-memory `Command` implementation, useful for callers that do
/// not already have their own command representation, and for tests.
pub struct BasicCommand {
    id: String,
    arguments: Vec<Vec<u8>>,
    hash: AtomicU32,
}

/// Sentinel stored in `hash` while no routing hash has been computed yet.
/// Slots/ring positions are `u32`s narrower than `u32::MAX` in practice
/// (slots top out at 16383, ring positions are full 32-bit but collisions
/// against the exact sentinel value are not a realistic concern here).
const NO_HASH: u32 = u32::MAX;

impl BasicCommand {
    pub fn new(id: impl Into<String>, arguments: Vec<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            arguments,
            hash: AtomicU32::new(NO_HASH),
        }
    }
}

impl Command for BasicCommand {
    fn id(&self) -> &str {
        &self.id
    }

    fn arguments(&self) -> &[Vec<u8>] {
        &self.arguments
    }

    fn hash(&self) -> Option<u32> {
        match self.hash.load(Ordering::Relaxed) {
            NO_HASH => None,
            h => Some(h),
        }
    }

    fn set_hash(&self, hash: u32) {
        self.hash.store(hash, Ordering::Relaxed);
    }
}
