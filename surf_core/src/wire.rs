//! Length-delimited TCP framing with postcard-encoded bodies, and the
//! client-side call helper that enforces per-call deadlines.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// Upper bound on a single frame. Leaves ample headroom over any sane block
/// size; a frame above this is a protocol violation, not a big block.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Default per-call deadline applied by the RPC clients.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(1);

/// Typed failure of a single RPC.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed frame: {0}")]
    Decode(#[from] postcard::Error),
    #[error("call deadline exceeded")]
    DeadlineExceeded,
    #[error("connection closed before response")]
    Disconnected,
    #[error("remote error: {0}")]
    Remote(String),
    #[error("unexpected response type")]
    UnexpectedResponse,
}

pub type RpcFramed = Framed<TcpStream, LengthDelimitedCodec>;

/// Wrap a fresh TCP stream with the length-delimited codec.
pub fn frame(stream: TcpStream) -> RpcFramed {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_framed(stream)
}

/// Encode one message and write it as a single frame.
pub async fn send<T: Serialize>(framed: &mut RpcFramed, msg: &T) -> Result<(), RpcError> {
    let body = postcard::to_allocvec(msg)?;
    framed.send(Bytes::from(body)).await?;
    Ok(())
}

/// Read the next frame and decode it, or `None` on a clean EOF.
///
/// Servers loop on this until the peer hangs up.
pub async fn recv_next<T: DeserializeOwned>(framed: &mut RpcFramed) -> Result<Option<T>, RpcError> {
    match framed.next().await {
        Some(frame) => Ok(Some(postcard::from_bytes(&frame?)?)),
        None => Ok(None),
    }
}

/// Read the next frame, treating EOF as an error. Used by clients that have
/// a request in flight.
pub async fn recv<T: DeserializeOwned>(framed: &mut RpcFramed) -> Result<T, RpcError> {
    recv_next(framed).await?.ok_or(RpcError::Disconnected)
}

/// One complete call: connect, send the request, await the response.
///
/// Each call uses its own connection and runs under `deadline`; a timeout is
/// surfaced as [`RpcError::DeadlineExceeded`] rather than hanging the sync
/// pass.
pub async fn call<Req, Resp>(addr: &str, deadline: Duration, req: &Req) -> Result<Resp, RpcError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    tokio::time::timeout(deadline, async {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| RpcError::Connect {
                addr: addr.to_owned(),
                source,
            })?;
        let mut framed = frame(stream);
        send(&mut framed, req).await?;
        recv(&mut framed).await
    })
    .await
    .map_err(|_| RpcError::DeadlineExceeded)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{BlockRequest, Request};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn call_round_trips_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = frame(stream);
            let req: Request = recv(&mut framed).await.unwrap();
            match req {
                Request::Block(BlockRequest::GetBlockHashes) => {
                    send(&mut framed, &crate::rpc::BlockResponse::Hashes(vec![]))
                        .await
                        .unwrap();
                }
                other => panic!("unexpected request: {other:?}"),
            }
        });

        let resp: crate::rpc::BlockResponse = call(
            &addr,
            DEFAULT_DEADLINE,
            &Request::Block(BlockRequest::GetBlockHashes),
        )
        .await
        .unwrap();
        assert!(matches!(resp, crate::rpc::BlockResponse::Hashes(h) if h.is_empty()));
    }

    #[tokio::test]
    async fn call_enforces_deadline() {
        // A listener that accepts but never answers.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let err = call::<_, crate::rpc::BlockResponse>(
            &addr,
            Duration::from_millis(50),
            &Request::Block(BlockRequest::GetBlockHashes),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, RpcError::DeadlineExceeded));
    }
}
