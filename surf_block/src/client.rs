//! RPC client for block-store shards.
//!
//! Unlike the metadata client, the shard address varies per call: the sync
//! engine routes every block through the consistent-hash ring first. Each
//! call opens its own connection and runs under the per-call deadline.

use std::time::Duration;

use bytes::Bytes;

use surf_core::BlockHash;
use surf_core::rpc::{Block, BlockRequest, BlockResponse, Request};
use surf_core::wire::{self, DEFAULT_DEADLINE, RpcError};

#[derive(Clone, Debug)]
pub struct BlockClient {
    deadline: Duration,
}

impl Default for BlockClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockClient {
    pub fn new() -> Self {
        BlockClient {
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(deadline: Duration) -> Self {
        BlockClient { deadline }
    }

    async fn call(&self, addr: &str, req: BlockRequest) -> Result<BlockResponse, RpcError> {
        match wire::call(addr, self.deadline, &Request::Block(req)).await? {
            BlockResponse::Error(msg) => Err(RpcError::Remote(msg)),
            resp => Ok(resp),
        }
    }

    pub async fn get_block(&self, hash: &BlockHash, addr: &str) -> Result<Block, RpcError> {
        match self.call(addr, BlockRequest::GetBlock(hash.clone())).await? {
            BlockResponse::Block(block) => Ok(block),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    pub async fn put_block(&self, data: Bytes, addr: &str) -> Result<bool, RpcError> {
        match self
            .call(addr, BlockRequest::PutBlock(Block::new(data)))
            .await?
        {
            BlockResponse::Success(ok) => Ok(ok),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    pub async fn missing_blocks(
        &self,
        hashes: Vec<BlockHash>,
        addr: &str,
    ) -> Result<Vec<BlockHash>, RpcError> {
        match self.call(addr, BlockRequest::MissingBlocks(hashes)).await? {
            BlockResponse::Hashes(missing) => Ok(missing),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    pub async fn block_hashes(&self, addr: &str) -> Result<Vec<BlockHash>, RpcError> {
        match self.call(addr, BlockRequest::GetBlockHashes).await? {
            BlockResponse::Hashes(hashes) => Ok(hashes),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }
}
