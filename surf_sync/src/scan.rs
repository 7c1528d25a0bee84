//! Base-directory scan: split each top-level file into fixed-size blocks,
//! hash them, and fold the result into the local index.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use surf_core::{BlockHash, FileInfoMap, FileMetaData};

use crate::index::INDEX_FILENAME;

/// Platform litter that never takes part in a sync.
const IGNORED_NAMES: &[&str] = &[".DS_Store"];

/// Hash every block of the file at `path`.
///
/// Blocks are exactly `block_size` bytes except the last; a zero-byte file
/// maps to the empty-file sentinel list `["-1"]`.
pub async fn hash_file_blocks(path: &Path, block_size: usize) -> Result<Vec<BlockHash>> {
    let mut file = fs::File::open(path)
        .await
        .with_context(|| format!("cannot open {path:?}"))?;

    let mut hashes = Vec::new();
    let mut buf = vec![0u8; block_size];
    loop {
        let mut filled = 0;
        while filled < block_size {
            let n = file
                .read(&mut buf[filled..])
                .await
                .with_context(|| format!("cannot read {path:?}"))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        hashes.push(BlockHash::of(&buf[..filled]));
        if filled < block_size {
            break;
        }
    }

    if hashes.is_empty() {
        hashes.push(BlockHash::empty_file());
    }
    Ok(hashes)
}

/// Walk the base directory (direct children only) and hash every regular
/// file, skipping the index file and platform artifacts.
pub async fn scan_base_dir(
    base_dir: &Path,
    block_size: usize,
) -> Result<BTreeMap<String, Vec<BlockHash>>> {
    let mut entries = fs::read_dir(base_dir)
        .await
        .with_context(|| format!("cannot read base directory {base_dir:?}"))?;

    let mut scanned = BTreeMap::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| anyhow!("file name {name:?} is not valid UTF-8"))?;
        if name == INDEX_FILENAME || IGNORED_NAMES.contains(&name.as_str()) {
            continue;
        }

        let hashes = hash_file_blocks(&entry.path(), block_size).await?;
        debug!(file = %name, blocks = hashes.len(), "scanned");
        scanned.insert(name, hashes);
    }
    Ok(scanned)
}

/// Fold a scan into the local index.
///
/// New files enter at version 1; changed hash lists bump the version by
/// one; unchanged files are untouched. Files the index knows but the scan
/// did not see are marked deleted (version bump plus tombstone list),
/// unless already tombstoned.
pub fn apply_scan(index: &mut FileInfoMap, scanned: &BTreeMap<String, Vec<BlockHash>>) {
    for (name, hashes) in scanned {
        match index.get_mut(name) {
            None => {
                index.insert(
                    name.clone(),
                    FileMetaData::new(name.clone(), 1, hashes.clone()),
                );
            }
            Some(entry) if &entry.block_hash_list != hashes => {
                entry.version += 1;
                entry.block_hash_list = hashes.clone();
            }
            Some(_) => {}
        }
    }

    for entry in index.values_mut() {
        if !scanned.contains_key(&entry.filename) && !entry.is_tombstone() {
            entry.version += 1;
            entry.block_hash_list = vec![BlockHash::tombstone()];
        }
    }
}
