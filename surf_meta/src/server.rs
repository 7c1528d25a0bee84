//! Request handler mapping the metadata RPC surface onto [`MetaStore`].

use surf_core::rpc::{MetaRequest, MetaResponse};

use crate::MetaStore;

pub async fn handle(store: &MetaStore, req: MetaRequest) -> MetaResponse {
    match req {
        MetaRequest::GetFileInfoMap => MetaResponse::FileInfoMap(store.file_info_map().await),
        MetaRequest::UpdateFile(fmd) => MetaResponse::Version(store.update_file(fmd).await),
        MetaRequest::GetBlockStoreMap(hashes) => {
            MetaResponse::BlockStoreMap(store.block_store_map(hashes))
        }
        MetaRequest::GetBlockStoreAddrs => {
            MetaResponse::BlockStoreAddrs(store.block_store_addrs().to_vec())
        }
    }
}
