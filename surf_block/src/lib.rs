//! The content-addressed block store.
//!
//! Blocks are opaque byte chunks keyed by the hex SHA-256 of their content.
//! They are immutable once stored and never removed; a duplicate put is a
//! no-op. The map allows arbitrarily many concurrent readers with atomic
//! per-key insertion, so a reader can never observe a half-written block.

use bytes::Bytes;
use dashmap::DashMap;

use surf_core::BlockHash;

pub mod client;
pub mod server;

pub use client::BlockClient;

#[derive(Debug, Default)]
pub struct BlockStore {
    blocks: DashMap<BlockHash, Bytes>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under its own hash and return that hash.
    ///
    /// Idempotent: storing bytes already present leaves the map unchanged.
    pub fn put(&self, data: Bytes) -> BlockHash {
        let hash = BlockHash::of(&data);
        self.blocks.entry(hash.clone()).or_insert(data);
        hash
    }

    /// Bytes stored under `hash`, if any.
    ///
    /// A miss is not fatal at this level; callers consult the metadata
    /// service for authoritative membership.
    pub fn get(&self, hash: &BlockHash) -> Option<Bytes> {
        self.blocks.get(hash).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.blocks.contains_key(hash)
    }

    /// The subset of `hashes` not currently stored, in input order.
    pub fn missing(&self, hashes: &[BlockHash]) -> Vec<BlockHash> {
        hashes
            .iter()
            .filter(|h| !self.blocks.contains_key(h.as_str()))
            .cloned()
            .collect()
    }

    /// Every stored hash. Diagnostic; no stable snapshot under concurrent
    /// mutation.
    pub fn hashes(&self) -> Vec<BlockHash> {
        self.blocks.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = BlockStore::new();
        let data = Bytes::from_static(b"some block content");
        let hash = store.put(data.clone());

        assert_eq!(hash, BlockHash::of(&data));
        assert_eq!(store.get(&hash), Some(data));
    }

    #[test]
    fn get_miss_is_none() {
        let store = BlockStore::new();
        assert_eq!(store.get(&BlockHash::of(b"never stored")), None);
    }

    #[test]
    fn put_is_idempotent() {
        let store = BlockStore::new();
        let data = Bytes::from_static(b"dup");
        let h1 = store.put(data.clone());
        let h2 = store.put(data.clone());

        assert_eq!(h1, h2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&h1), Some(data));
    }

    #[test]
    fn missing_preserves_input_order() {
        let store = BlockStore::new();
        let stored = store.put(Bytes::from_static(b"here"));
        let absent_a = BlockHash::of(b"gone a");
        let absent_b = BlockHash::of(b"gone b");

        let missing = store.missing(&[absent_a.clone(), stored, absent_b.clone()]);
        assert_eq!(missing, vec![absent_a, absent_b]);
    }

    #[test]
    fn concurrent_puts_and_reads_settle() {
        use std::sync::Arc;

        let store = Arc::new(BlockStore::new());
        let mut handles = Vec::new();
        for t in 0..4u8 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..64u32 {
                    let data = Bytes::from(format!("block {} {}", t % 2, i));
                    let hash = store.put(data.clone());
                    assert_eq!(store.get(&hash), Some(data));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Threads 0/2 and 1/3 wrote identical payloads; dedup leaves one
        // copy of each distinct block.
        assert_eq!(store.len(), 128);
    }

    #[test]
    fn hashes_enumerates_everything_stored() {
        let store = BlockStore::new();
        let h1 = store.put(Bytes::from_static(b"one"));
        let h2 = store.put(Bytes::from_static(b"two"));

        let mut got = store.hashes();
        got.sort();
        let mut want = vec![h1, h2];
        want.sort();
        assert_eq!(got, want);
    }
}
