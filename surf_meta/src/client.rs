//! RPC client for the metadata service.

use std::collections::BTreeMap;
use std::time::Duration;

use surf_core::{BlockHash, FileInfoMap, FileMetaData};
use surf_core::rpc::{MetaRequest, MetaResponse, Request};
use surf_core::wire::{self, DEFAULT_DEADLINE, RpcError};

#[derive(Clone, Debug)]
pub struct MetaClient {
    addr: String,
    deadline: Duration,
}

impl MetaClient {
    pub fn new(addr: impl Into<String>) -> Self {
        MetaClient {
            addr: addr.into(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_deadline(addr: impl Into<String>, deadline: Duration) -> Self {
        MetaClient {
            addr: addr.into(),
            deadline,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn call(&self, req: MetaRequest) -> Result<MetaResponse, RpcError> {
        match wire::call(&self.addr, self.deadline, &Request::Meta(req)).await? {
            MetaResponse::Error(msg) => Err(RpcError::Remote(msg)),
            resp => Ok(resp),
        }
    }

    pub async fn get_file_info_map(&self) -> Result<FileInfoMap, RpcError> {
        match self.call(MetaRequest::GetFileInfoMap).await? {
            MetaResponse::FileInfoMap(map) => Ok(map),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    /// Offer an updated entry; the returned version is the accepted one, or
    /// [`surf_core::REJECTED_VERSION`] when the offer lost the contest.
    pub async fn update_file(&self, fmd: FileMetaData) -> Result<i32, RpcError> {
        match self.call(MetaRequest::UpdateFile(fmd)).await? {
            MetaResponse::Version(v) => Ok(v),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    pub async fn get_block_store_map(
        &self,
        hashes: Vec<BlockHash>,
    ) -> Result<BTreeMap<String, Vec<BlockHash>>, RpcError> {
        match self.call(MetaRequest::GetBlockStoreMap(hashes)).await? {
            MetaResponse::BlockStoreMap(map) => Ok(map),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }

    pub async fn get_block_store_addrs(&self) -> Result<Vec<String>, RpcError> {
        match self.call(MetaRequest::GetBlockStoreAddrs).await? {
            MetaResponse::BlockStoreAddrs(addrs) => Ok(addrs),
            _ => Err(RpcError::UnexpectedResponse),
        }
    }
}
