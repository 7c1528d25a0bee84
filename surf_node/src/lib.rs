//! The surfstore server process.
//!
//! One listener serves either or both RPC surfaces depending on the
//! configured [`ServiceRole`]. Each accepted connection runs on its own
//! task and answers a sequence of length-delimited requests until the peer
//! hangs up; requests for a surface the node does not serve get a typed
//! error response. A request dropped mid-flight leaves no observable
//! partial state: every handler either fully applies an operation or not
//! at all.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use surf_block::BlockStore;
use surf_core::rpc::{BlockResponse, MetaResponse, Request};
use surf_core::wire::{self, RpcError};
use surf_meta::MetaStore;

/// Which RPC surfaces this process serves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceRole {
    Meta,
    Block,
    Both,
}

impl ServiceRole {
    pub fn serves_meta(self) -> bool {
        matches!(self, ServiceRole::Meta | ServiceRole::Both)
    }

    pub fn serves_block(self) -> bool {
        matches!(self, ServiceRole::Block | ServiceRole::Both)
    }
}

impl FromStr for ServiceRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "meta" => Ok(ServiceRole::Meta),
            "block" => Ok(ServiceRole::Block),
            "both" => Ok(ServiceRole::Both),
            other => bail!("invalid service type {other:?} (expected meta, block or both)"),
        }
    }
}

#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    meta: Option<Arc<MetaStore>>,
    block: Option<Arc<BlockStore>>,
}

impl Server {
    /// Bind the listener and construct the stores for `role`.
    ///
    /// `block_addrs` is the shard topology handed to the metadata service;
    /// a node whose role includes `meta` refuses to start without one (the
    /// ring would be empty). A `both` node normally lists itself among the
    /// shards.
    pub async fn bind(addr: &str, role: ServiceRole, block_addrs: Vec<String>) -> Result<Server> {
        let meta = if role.serves_meta() {
            Some(Arc::new(
                MetaStore::new(block_addrs).context("cannot serve the meta role")?,
            ))
        } else {
            None
        };
        let block = role.serves_block().then(|| Arc::new(BlockStore::new()));

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {addr}"))?;
        Ok(Server {
            listener,
            meta,
            block,
        })
    }

    /// The address the listener actually bound (port 0 resolves here).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(%peer, "accepted connection");
            let meta = self.meta.clone();
            let block = self.block.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_conn(stream, meta, block).await {
                    warn!(%peer, "connection error: {err}");
                }
            });
        }
    }
}

async fn handle_conn(
    stream: TcpStream,
    meta: Option<Arc<MetaStore>>,
    block: Option<Arc<BlockStore>>,
) -> Result<(), RpcError> {
    let mut framed = wire::frame(stream);
    while let Some(request) = wire::recv_next::<Request>(&mut framed).await? {
        match request {
            Request::Meta(req) => {
                let resp = match &meta {
                    Some(store) => surf_meta::server::handle(store, req).await,
                    None => MetaResponse::Error("metadata service not served by this node".into()),
                };
                wire::send(&mut framed, &resp).await?;
            }
            Request::Block(req) => {
                let resp = match &block {
                    Some(store) => surf_block::server::handle(store, req),
                    None => BlockResponse::Error("block service not served by this node".into()),
                };
                wire::send(&mut framed, &resp).await?;
            }
        }
    }
    Ok(())
}

/// Bind, serve, and keep going until ctrl-c. Entry point for the server
/// binary.
pub async fn serve_until_shutdown(
    addr: &str,
    role: ServiceRole,
    block_addrs: Vec<String>,
) -> Result<()> {
    let server = Server::bind(addr, role, block_addrs).await?;
    let local_addr = server.local_addr()?;
    info!(role = ?role, addr = %local_addr, "surfstore server listening");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}
