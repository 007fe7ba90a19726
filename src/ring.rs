//! Consistent-hash ring used by the client-side sharding scheme.
//!
//! Each node contributes `160 * weight` virtual replicas to the ring so
//! that load spreads evenly and rebalancing on add/remove only moves a
//! small fraction of keys. Replica positions are derived from an MD5
//! digest of the node's identity string, matching the placement strategy
//! this corpus's consistent-hashing references use.

const REPLICAS_PER_WEIGHT: u32 = 160;

/// 32-bit hash used both for ring placement and for key lookup.
///
/// Uses the first four bytes of the MD5 digest, big-endian. MD5 is not
/// used here for any cryptographic property — only as a cheap, stable,
/// well-distributed hash.
pub fn hash32(data: &[u8]) -> u32 {
    let digest = md5::compute(data);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Computes the routing hash for a raw key, applying the hash-tag rule:
/// if `key` contains `{X}` with non-empty `X`, only `X` is hashed.
pub fn hash_key(key: &[u8]) -> u32 {
    hash32(crate::crc16::extract_hash_tag(key))
}

/// A consistent-hash ring over nodes identified by a stable string id.
///
/// Kept as a sorted vector rather than a tree so lookups are a plain
/// binary search — the ring is rebuilt wholesale on add/remove, which is
/// infrequent compared to lookups.
#[derive(Default)]
pub struct Ring<N> {
    entries: Vec<(u32, N)>,
}

impl<N: Clone + PartialEq> Ring<N> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `160 * weight` replicas of `node`, keyed by `identity`
    /// (the stable string used to derive replica positions — typically
    /// the node's `alias` or `host:port`).
    pub fn add(&mut self, identity: &str, node: N, weight: u32) {
        let weight = weight.max(1);
        let replicas = REPLICAS_PER_WEIGHT * weight;
        for i in 0..replicas {
            let label = format!("{identity}|{i}");
            let pos = hash32(label.as_bytes());
            self.entries.push((pos, node.clone()));
        }
        self.entries.sort_by_key(|(pos, _)| *pos);
    }

    /// Removes every replica belonging to `node`.
    pub fn remove(&mut self, node: &N) {
        self.entries.retain(|(_, n)| n != node);
    }

    /// Returns true if the ring has no nodes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finds the node owning `hash`: the first ring entry whose position
    /// is greater than or equal to `hash`, wrapping to the first entry if
    /// `hash` is past every position.
    pub fn get(&self, hash: u32) -> Option<&N> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = self
            .entries
            .partition_point(|(pos, _)| *pos < hash);
        let idx = if idx == self.entries.len() { 0 } else { idx };
        Some(&self.entries[idx].1)
    }
}
