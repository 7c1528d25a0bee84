//! Wire messages for the two service surfaces.
//!
//! Every frame on a connection is one postcard-encoded [`Request`] (client
//! to server) or the response enum matching the request's surface (server to
//! client). A node serving only one role answers requests for the other role
//! with the `Error` variant of the matching response enum.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::hash::BlockHash;
use crate::meta::{FileInfoMap, FileMetaData};

/// One immutable chunk of file content, at most the client's block size.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub data: Bytes,
}

impl Block {
    pub fn new(data: Bytes) -> Self {
        Block { data }
    }

    pub fn hash(&self) -> BlockHash {
        BlockHash::of(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Top-level frame accepted by every server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Request {
    Meta(MetaRequest),
    Block(BlockRequest),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MetaRequest {
    /// Snapshot of the authoritative directory.
    GetFileInfoMap,
    /// Versioned compare-and-swap on one file's entry.
    UpdateFile(FileMetaData),
    /// Route each hash through the ring and group by responsible shard.
    GetBlockStoreMap(Vec<BlockHash>),
    /// The configured shard address list, verbatim.
    GetBlockStoreAddrs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MetaResponse {
    FileInfoMap(FileInfoMap),
    Version(i32),
    BlockStoreMap(BTreeMap<String, Vec<BlockHash>>),
    BlockStoreAddrs(Vec<String>),
    Error(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BlockRequest {
    GetBlock(BlockHash),
    PutBlock(Block),
    /// Subset of the input hashes this shard does not hold.
    MissingBlocks(Vec<BlockHash>),
    /// Diagnostic enumeration of every stored hash.
    GetBlockHashes,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BlockResponse {
    Block(Block),
    Success(bool),
    Hashes(Vec<BlockHash>),
    Error(String),
}
