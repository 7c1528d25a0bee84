//! Per-file metadata records and the directory map exchanged with the
//! metadata service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::hash::BlockHash;

/// Version value returned by the metadata service when an update loses the
/// version contest.
pub const REJECTED_VERSION: i32 = -1;

/// One file's entry in the directory: name, monotonic version, and the
/// ordered block-hash list whose concatenation is the file's content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetaData {
    pub filename: String,
    pub version: i32,
    pub block_hash_list: Vec<BlockHash>,
}

impl FileMetaData {
    pub fn new(filename: impl Into<String>, version: i32, block_hash_list: Vec<BlockHash>) -> Self {
        FileMetaData {
            filename: filename.into(),
            version,
            block_hash_list,
        }
    }

    /// Entry for a deleted file: hash list `["0"]`.
    pub fn tombstone(filename: impl Into<String>, version: i32) -> Self {
        Self::new(filename, version, vec![BlockHash::tombstone()])
    }

    /// Entry for a zero-byte file: hash list `["-1"]`.
    pub fn empty_file(filename: impl Into<String>, version: i32) -> Self {
        Self::new(filename, version, vec![BlockHash::empty_file()])
    }

    pub fn is_tombstone(&self) -> bool {
        self.block_hash_list
            .first()
            .is_some_and(BlockHash::is_tombstone)
    }

    pub fn is_empty_file(&self) -> bool {
        self.block_hash_list
            .first()
            .is_some_and(BlockHash::is_empty_file)
    }

    /// Whether two entries describe identical content (hash lists equal,
    /// element for element).
    pub fn same_content(&self, other: &FileMetaData) -> bool {
        self.block_hash_list == other.block_hash_list
    }
}

/// Directory snapshot: filename to its latest metadata.
pub type FileInfoMap = HashMap<String, FileMetaData>;
