//! The persistent local index: the client's last-known metadata snapshot,
//! kept as a small SQLite database inside the base directory.
//!
//! Schema: one row per hash-list entry, `indexes(fileName, version,
//! hashIndex, hashValue)`, with `hashIndex` counting from 0 per file. The
//! writer drops and recreates the whole file; the index only needs to
//! reflect the post-reconciliation view after a completed sync.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::warn;

use surf_core::{BlockHash, FileInfoMap, FileMetaData};

/// Name of the index file inside the base directory. The scanner skips it.
pub const INDEX_FILENAME: &str = "index.db";

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS indexes (
    fileName TEXT,
    version INT,
    hashIndex INT,
    hashValue TEXT
)";

pub fn index_path(base_dir: &Path) -> PathBuf {
    base_dir.join(INDEX_FILENAME)
}

/// Load the index, reconstructing one [`FileMetaData`] per file.
///
/// A missing file or a file without the expected schema loads as an empty
/// map; the next successful sync rewrites it from scratch.
pub fn load(base_dir: &Path) -> Result<FileInfoMap> {
    let path = index_path(base_dir);
    if !path.exists() {
        return Ok(FileInfoMap::new());
    }

    let conn = match Connection::open(&path) {
        Ok(conn) => conn,
        Err(err) => {
            warn!("index at {path:?} cannot be opened ({err}); starting from an empty view");
            return Ok(FileInfoMap::new());
        }
    };

    let mut stmt = match conn
        .prepare("SELECT fileName, version, hashIndex, hashValue FROM indexes ORDER BY fileName, hashIndex")
    {
        Ok(stmt) => stmt,
        Err(err) => {
            warn!("index at {path:?} is unreadable ({err}); starting from an empty view");
            return Ok(FileInfoMap::new());
        }
    };

    let mut map = FileInfoMap::new();
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, i32>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    for row in rows {
        let (filename, version, _hash_index, hash_value) = row?;
        let entry = map
            .entry(filename.clone())
            .or_insert_with(|| FileMetaData::new(filename, version, Vec::new()));
        entry.version = version;
        entry.block_hash_list.push(BlockHash::from_hex(hash_value));
    }
    Ok(map)
}

/// Rewrite the index file from `index`: drop, recreate, insert every row in
/// one transaction.
pub fn write(base_dir: &Path, index: &FileInfoMap) -> Result<()> {
    let path = index_path(base_dir);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to replace index at {path:?}"))?;
    }

    let mut conn =
        Connection::open(&path).with_context(|| format!("failed to create index at {path:?}"))?;
    conn.execute(CREATE_TABLE, [])?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO indexes (fileName, version, hashIndex, hashValue) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for fmd in index.values() {
            for (hash_index, hash) in fmd.block_hash_list.iter().enumerate() {
                stmt.execute(rusqlite::params![
                    fmd.filename,
                    fmd.version,
                    hash_index as i64,
                    hash.as_str()
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_index_loads_empty() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = tempdir().unwrap();

        let mut map = FileInfoMap::new();
        map.insert(
            "a.txt".into(),
            FileMetaData::new("a.txt", 3, vec![BlockHash::of(b"one"), BlockHash::of(b"two")]),
        );
        map.insert("gone.txt".into(), FileMetaData::tombstone("gone.txt", 2));
        map.insert("empty".into(), FileMetaData::empty_file("empty", 1));

        write(dir.path(), &map).unwrap();
        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let dir = tempdir().unwrap();

        let mut first = FileInfoMap::new();
        first.insert(
            "old.txt".into(),
            FileMetaData::new("old.txt", 1, vec![BlockHash::of(b"old")]),
        );
        write(dir.path(), &first).unwrap();

        let mut second = FileInfoMap::new();
        second.insert(
            "new.txt".into(),
            FileMetaData::new("new.txt", 1, vec![BlockHash::of(b"new")]),
        );
        write(dir.path(), &second).unwrap();

        assert_eq!(load(dir.path()).unwrap(), second);
    }

    #[test]
    fn garbage_index_recovers_as_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(index_path(dir.path()), b"not a sqlite database").unwrap();
        assert!(load(dir.path()).unwrap().is_empty());
    }
}
