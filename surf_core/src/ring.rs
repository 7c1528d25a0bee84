//! Consistent-hash ring mapping block hashes to the shard responsible for
//! storing them.
//!
//! Ring keys are `sha256("blockstore" + address)`, hex encoded. Salting the
//! address keeps ring keys from colliding with block identifiers drawn from
//! the same hash family. A block hash is served by the shard with the least
//! ring key strictly greater than it, wrapping to the smallest ring key.

use std::collections::BTreeMap;
use std::ops::Bound;

use anyhow::{Result, bail};

use crate::hash::BlockHash;

const RING_KEY_SALT: &str = "blockstore";

#[derive(Clone, Debug)]
pub struct HashRing {
    /// ring key (hex) -> shard address
    nodes: BTreeMap<String, String>,
}

impl HashRing {
    pub fn new(addrs: &[String]) -> Result<Self> {
        if addrs.is_empty() {
            bail!("hash ring requires at least one block store address");
        }
        let nodes = addrs
            .iter()
            .map(|addr| (Self::ring_key(addr), addr.clone()))
            .collect();
        Ok(HashRing { nodes })
    }

    /// Ring key for a shard address.
    pub fn ring_key(addr: &str) -> String {
        BlockHash::of(format!("{RING_KEY_SALT}{addr}")).into()
    }

    /// The shard address responsible for `hash`.
    pub fn responsible_server(&self, hash: &BlockHash) -> &str {
        self.nodes
            .range::<str, _>((Bound::Excluded(hash.as_str()), Bound::Unbounded))
            .next()
            .or_else(|| self.nodes.iter().next())
            .map(|(_, addr)| addr.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
