//! Request handler mapping the block-store RPC surface onto [`BlockStore`].

use bytes::Bytes;
use tracing::debug;

use surf_core::rpc::{Block, BlockRequest, BlockResponse};

use crate::BlockStore;

pub fn handle(store: &BlockStore, req: BlockRequest) -> BlockResponse {
    match req {
        BlockRequest::GetBlock(hash) => {
            // A miss answers with an empty block rather than an error; the
            // metadata service is the authority on membership.
            let data = store.get(&hash).unwrap_or_else(Bytes::new);
            debug!(hash = %hash.fmt_short(), len = data.len(), "get block");
            BlockResponse::Block(Block::new(data))
        }
        BlockRequest::PutBlock(block) => {
            let hash = store.put(block.data);
            debug!(hash = %hash.fmt_short(), "put block");
            BlockResponse::Success(true)
        }
        BlockRequest::MissingBlocks(hashes) => {
            let missing = store.missing(&hashes);
            debug!(asked = hashes.len(), missing = missing.len(), "missing blocks");
            BlockResponse::Hashes(missing)
        }
        BlockRequest::GetBlockHashes => BlockResponse::Hashes(store.hashes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use surf_core::BlockHash;

    #[test]
    fn get_miss_answers_empty_block() {
        let store = BlockStore::new();
        let resp = handle(&store, BlockRequest::GetBlock(BlockHash::of(b"nope")));
        match resp {
            BlockResponse::Block(b) => assert!(b.is_empty()),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn put_then_get_through_handler() {
        let store = BlockStore::new();
        let data = Bytes::from_static(b"payload");
        let hash = BlockHash::of(&data);

        let resp = handle(&store, BlockRequest::PutBlock(Block::new(data.clone())));
        assert!(matches!(resp, BlockResponse::Success(true)));

        let resp = handle(&store, BlockRequest::GetBlock(hash));
        match resp {
            BlockResponse::Block(b) => assert_eq!(b.data, data),
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
