//! The authoritative file-metadata service.
//!
//! `MetaStore` owns the directory of `(filename, version, blockHashList)`
//! records plus the block-shard topology: the configured shard address list
//! and a private consistent-hash ring built from it. Versions per filename
//! only ever move forward; a stale update is rejected with
//! [`surf_core::REJECTED_VERSION`] and never merged.

use std::collections::BTreeMap;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::debug;

use surf_core::{BlockHash, FileInfoMap, FileMetaData, HashRing, REJECTED_VERSION};

pub mod client;
pub mod server;

pub use client::MetaClient;

#[derive(Debug)]
pub struct MetaStore {
    files: RwLock<FileInfoMap>,
    block_addrs: Vec<String>,
    ring: HashRing,
}

impl MetaStore {
    pub fn new(block_addrs: Vec<String>) -> Result<Self> {
        let ring = HashRing::new(&block_addrs)?;
        Ok(MetaStore {
            files: RwLock::new(FileInfoMap::new()),
            block_addrs,
            ring,
        })
    }

    /// Snapshot of the directory.
    pub async fn file_info_map(&self) -> FileInfoMap {
        self.files.read().await.clone()
    }

    /// Versioned compare-and-swap on one file's entry.
    ///
    /// The whole check-and-replace holds the write lock, so two concurrent
    /// updates carrying the same version resolve to exactly one acceptance.
    /// Returns the accepted version, or [`REJECTED_VERSION`] without
    /// mutating anything.
    pub async fn update_file(&self, fmd: FileMetaData) -> i32 {
        if fmd.version < 1 {
            return REJECTED_VERSION;
        }
        let mut files = self.files.write().await;
        if let Some(current) = files.get(&fmd.filename)
            && fmd.version <= current.version
        {
            debug!(
                file = %fmd.filename,
                offered = fmd.version,
                current = current.version,
                "rejecting stale update"
            );
            return REJECTED_VERSION;
        }

        debug!(file = %fmd.filename, version = fmd.version, "accepting update");
        let version = fmd.version;
        files.insert(fmd.filename.clone(), fmd);
        version
    }

    /// Route each hash through the ring and group by responsible shard,
    /// preserving input order within each shard's bucket.
    pub fn block_store_map(&self, hashes: Vec<BlockHash>) -> BTreeMap<String, Vec<BlockHash>> {
        let mut map: BTreeMap<String, Vec<BlockHash>> = BTreeMap::new();
        for hash in hashes {
            let addr = self.ring.responsible_server(&hash).to_owned();
            map.entry(addr).or_default().push(hash);
        }
        map
    }

    /// The configured shard address list, verbatim.
    pub fn block_store_addrs(&self) -> &[String] {
        &self.block_addrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn addrs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("localhost:{}", 9000 + i)).collect()
    }

    #[tokio::test]
    async fn versions_only_move_forward() {
        let store = MetaStore::new(addrs(1)).unwrap();

        let v1 = FileMetaData::new("a.txt", 1, vec![BlockHash::of(b"x")]);
        assert_eq!(store.update_file(v1.clone()).await, 1);

        // Same version again: rejected, entry untouched.
        let v1_other = FileMetaData::new("a.txt", 1, vec![BlockHash::of(b"y")]);
        assert_eq!(store.update_file(v1_other).await, REJECTED_VERSION);
        assert_eq!(store.file_info_map().await["a.txt"], v1);

        let v2 = FileMetaData::new("a.txt", 2, vec![BlockHash::of(b"y")]);
        assert_eq!(store.update_file(v2).await, 2);

        // Going backwards is rejected too.
        let stale = FileMetaData::new("a.txt", 1, vec![BlockHash::of(b"z")]);
        assert_eq!(store.update_file(stale).await, REJECTED_VERSION);
    }

    #[tokio::test]
    async fn nonpositive_versions_are_rejected() {
        let store = MetaStore::new(addrs(1)).unwrap();
        let bad = FileMetaData::new("a.txt", 0, vec![BlockHash::of(b"x")]);
        assert_eq!(store.update_file(bad).await, REJECTED_VERSION);
        assert!(store.file_info_map().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_equal_versions_resolve_to_one_winner() {
        let store = Arc::new(MetaStore::new(addrs(1)).unwrap());
        store
            .update_file(FileMetaData::new("c.txt", 1, vec![BlockHash::of(b"seed")]))
            .await;

        let a = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_file(FileMetaData::new("c.txt", 2, vec![BlockHash::of(b"a")]))
                    .await
            })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .update_file(FileMetaData::new("c.txt", 2, vec![BlockHash::of(b"b")]))
                    .await
            })
        };

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        // Exactly one contender wins the compare-and-swap.
        assert_eq!(ra.max(rb), 2);
        assert_eq!(ra.min(rb), REJECTED_VERSION);
    }

    #[tokio::test]
    async fn block_store_map_groups_by_ring_and_keeps_order() {
        let store = MetaStore::new(addrs(2)).unwrap();
        let ring = HashRing::new(&addrs(2)).unwrap();

        let hashes: Vec<BlockHash> = (0..16u8).map(|i| BlockHash::of([i])).collect();
        let map = store.block_store_map(hashes.clone());

        let total: usize = map.values().map(Vec::len).sum();
        assert_eq!(total, hashes.len());

        for (addr, bucket) in &map {
            // Every hash landed on the shard the ring names for it.
            for h in bucket {
                assert_eq!(ring.responsible_server(h), addr);
            }
            // Bucket order follows input order.
            let positions: Vec<usize> = bucket
                .iter()
                .map(|h| hashes.iter().position(|x| x == h).unwrap())
                .collect();
            assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
