//! One sync pass: scan the base directory, fold into the local index,
//! reconcile against the remote directory, persist the index.
//!
//! Conflicts are settled entirely by the metadata service's version
//! contest: a rejected update means someone else published first, and the
//! loser downloads the winner's state instead of retrying. Blocks are
//! always durably stored on their shards before the metadata commit, so
//! any observer of published metadata can fetch its content.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{Context, Result, bail, ensure};
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use surf_block::BlockClient;
use surf_core::{BlockHash, FileInfoMap, FileMetaData, REJECTED_VERSION};
use surf_meta::MetaClient;

use crate::{index, scan};

pub struct SyncClient {
    meta: MetaClient,
    blocks: BlockClient,
    base_dir: PathBuf,
    block_size: usize,
}

impl SyncClient {
    pub fn new(
        meta_addr: impl Into<String>,
        base_dir: impl Into<PathBuf>,
        block_size: usize,
    ) -> Result<Self> {
        ensure!(block_size > 0, "block size must be positive");
        Ok(SyncClient {
            meta: MetaClient::new(meta_addr),
            blocks: BlockClient::new(),
            base_dir: base_dir.into(),
            block_size,
        })
    }

    /// Run one complete reconciliation pass.
    pub async fn sync(&self) -> Result<()> {
        let mut local = self.load_index().await?;

        let scanned = scan::scan_base_dir(&self.base_dir, self.block_size).await?;
        scan::apply_scan(&mut local, &scanned);
        debug!(files = local.len(), "local index updated from scan");

        let remote = self
            .meta
            .get_file_info_map()
            .await
            .context("failed to fetch the remote file map")?;

        // Remote-driven pass: everything the server knows about.
        for (name, remote_fmd) in &remote {
            match local.get(name).cloned() {
                None => {
                    if remote_fmd.is_tombstone() {
                        debug!(file = %name, "recording remote tombstone");
                        local.insert(name.clone(), remote_fmd.clone());
                    } else {
                        self.download(remote_fmd, &mut local).await?;
                    }
                }
                Some(local_fmd) if local_fmd.version > remote_fmd.version => {
                    self.publish(&local_fmd, &mut local).await?;
                }
                Some(local_fmd) if local_fmd.version < remote_fmd.version => {
                    self.sync_with_remote(remote_fmd, &mut local).await?;
                }
                Some(local_fmd) => {
                    // Equal versions: identical content is a no-op; a
                    // diverged hash list is a conflict the remote wins.
                    if !local_fmd.same_content(remote_fmd) {
                        info!(file = %name, version = local_fmd.version, "version tie, remote wins");
                        self.sync_with_remote(remote_fmd, &mut local).await?;
                    }
                }
            }
        }

        // Local-only pass: files the server has never heard of.
        let local_only: Vec<FileMetaData> = local
            .values()
            .filter(|fmd| !remote.contains_key(&fmd.filename))
            .cloned()
            .collect();
        for fmd in local_only {
            if fmd.is_tombstone() {
                // Deleted before the server ever saw it; nothing to publish.
                continue;
            }
            self.publish(&fmd, &mut local).await?;
        }

        self.write_index(&local).await?;
        info!(files = local.len(), "sync pass complete");
        Ok(())
    }

    async fn load_index(&self) -> Result<FileInfoMap> {
        let base_dir = self.base_dir.clone();
        tokio::task::spawn_blocking(move || index::load(&base_dir))
            .await
            .context("index load task failed")?
    }

    async fn write_index(&self, map: &FileInfoMap) -> Result<()> {
        let base_dir = self.base_dir.clone();
        let map = map.clone();
        tokio::task::spawn_blocking(move || index::write(&base_dir, &map))
            .await
            .context("index write task failed")?
    }

    /// Bring the local file and index entry up to `remote_fmd`: delete on a
    /// tombstone, download otherwise.
    async fn sync_with_remote(
        &self,
        remote_fmd: &FileMetaData,
        local: &mut FileInfoMap,
    ) -> Result<()> {
        if remote_fmd.is_tombstone() {
            info!(file = %remote_fmd.filename, "deleting local file (remote tombstone)");
            match fs::remove_file(self.base_dir.join(&remote_fmd.filename)).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("failed to delete {:?}", remote_fmd.filename)
                    });
                }
            }
            local.insert(remote_fmd.filename.clone(), remote_fmd.clone());
            Ok(())
        } else {
            self.download(remote_fmd, local).await
        }
    }

    /// Fetch `remote_fmd`'s content block by block and install it locally.
    async fn download(&self, remote_fmd: &FileMetaData, local: &mut FileInfoMap) -> Result<()> {
        let path = self.base_dir.join(&remote_fmd.filename);
        info!(file = %remote_fmd.filename, version = remote_fmd.version, "downloading");

        if remote_fmd.is_empty_file() {
            fs::File::create(&path)
                .await
                .with_context(|| format!("cannot create {path:?}"))?;
            local.insert(remote_fmd.filename.clone(), remote_fmd.clone());
            return Ok(());
        }

        let shard_for = self.resolve_shards(&remote_fmd.block_hash_list).await?;

        let mut file = fs::File::create(&path)
            .await
            .with_context(|| format!("cannot create {path:?}"))?;
        for hash in &remote_fmd.block_hash_list {
            let addr = shard_for
                .get(hash)
                .ok_or_else(|| anyhow::anyhow!("no shard responsible for block {hash}"))?;
            let block = self
                .blocks
                .get_block(hash, addr)
                .await
                .with_context(|| format!("failed to fetch block {} from {addr}", hash.fmt_short()))?;
            ensure!(
                block.hash() == *hash,
                "block {} from {addr} failed its integrity check",
                hash.fmt_short()
            );
            file.write_all(&block.data).await?;
        }
        file.flush().await?;

        local.insert(remote_fmd.filename.clone(), remote_fmd.clone());
        Ok(())
    }

    /// Publish a locally newer entry: store its blocks on their shards,
    /// then offer the metadata update. Losing the version race means the
    /// remote moved first; adopt its state instead.
    async fn publish(&self, fmd: &FileMetaData, local: &mut FileInfoMap) -> Result<()> {
        info!(file = %fmd.filename, version = fmd.version, "publishing");

        if !fmd.is_tombstone() && !fmd.is_empty_file() {
            self.upload_blocks(fmd).await?;
        }

        let version = self
            .meta
            .update_file(fmd.clone())
            .await
            .with_context(|| format!("failed to publish {:?}", fmd.filename))?;
        if version == REJECTED_VERSION {
            info!(file = %fmd.filename, "lost the version race, adopting remote state");
            let remote = self
                .meta
                .get_file_info_map()
                .await
                .context("failed to re-fetch the remote file map after a conflict")?;
            match remote.get(&fmd.filename) {
                Some(remote_fmd) => self.sync_with_remote(remote_fmd, local).await?,
                None => bail!(
                    "update of {:?} was rejected but the remote has no entry for it",
                    fmd.filename
                ),
            }
        }
        Ok(())
    }

    /// Store every block of `fmd` on its responsible shard, skipping blocks
    /// the shard already holds. The file is re-read from disk; any
    /// divergence from the scanned hash list fails the pass rather than
    /// publishing metadata that does not describe the stored blocks.
    async fn upload_blocks(&self, fmd: &FileMetaData) -> Result<()> {
        let routing = self
            .meta
            .get_block_store_map(fmd.block_hash_list.clone())
            .await
            .context("failed to resolve block routing")?;

        let mut wanted: HashSet<BlockHash> = HashSet::new();
        for (addr, bucket) in &routing {
            let missing = self
                .blocks
                .missing_blocks(bucket.clone(), addr)
                .await
                .with_context(|| format!("failed to query missing blocks on {addr}"))?;
            wanted.extend(missing);
        }

        let shard_for: HashMap<&BlockHash, &str> = routing
            .iter()
            .flat_map(|(addr, bucket)| bucket.iter().map(move |h| (h, addr.as_str())))
            .collect();

        let path = self.base_dir.join(&fmd.filename);
        let mut file = fs::File::open(&path)
            .await
            .with_context(|| format!("cannot open {path:?} for upload"))?;
        let mut buf = vec![0u8; self.block_size];

        for expected in &fmd.block_hash_list {
            let filled = read_block(&mut file, &mut buf).await?;
            let chunk = &buf[..filled];
            let hash = BlockHash::of(chunk);
            ensure!(
                hash == *expected && filled > 0,
                "{:?} changed while syncing; aborting this pass",
                fmd.filename
            );

            if wanted.contains(&hash) {
                let addr = *shard_for
                    .get(expected)
                    .ok_or_else(|| anyhow::anyhow!("no shard responsible for block {hash}"))?;
                let ok = self
                    .blocks
                    .put_block(Bytes::copy_from_slice(chunk), addr)
                    .await
                    .with_context(|| format!("failed to store block {} on {addr}", hash.fmt_short()))?;
                ensure!(ok, "shard {addr} refused block {}", hash.fmt_short());
            }
        }

        // The hash list must cover the whole file; trailing bytes mean it
        // grew after the scan.
        ensure!(
            read_block(&mut file, &mut buf).await? == 0,
            "{:?} changed while syncing; aborting this pass",
            fmd.filename
        );
        Ok(())
    }

    async fn resolve_shards(
        &self,
        hashes: &[BlockHash],
    ) -> Result<HashMap<BlockHash, String>> {
        let routing = self
            .meta
            .get_block_store_map(hashes.to_vec())
            .await
            .context("failed to resolve block routing")?;
        Ok(routing
            .into_iter()
            .flat_map(|(addr, bucket)| {
                bucket.into_iter().map(move |h| (h, addr.clone()))
            })
            .collect())
    }
}

/// Fill `buf` from `file`, tolerating short reads; returns the bytes read
/// (less than `buf.len()` only at EOF).
async fn read_block(file: &mut fs::File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_block_fills_then_reports_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, [1u8; 10]).unwrap();

        let mut file = fs::File::open(&path).await.unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 4);
        assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 4);
        assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 2);
        assert_eq!(read_block(&mut file, &mut buf).await.unwrap(), 0);
    }

    #[test]
    fn zero_block_size_is_refused() {
        assert!(SyncClient::new("localhost:8080", "/tmp", 0).is_err());
    }
}
