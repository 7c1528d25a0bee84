//! Core surfstore protocol types.
//!
//! This crate defines everything the other surfstore crates share:
//!
//! - Block identity and the reserved hash-list sentinels (`hash`)
//! - Per-file metadata records and the directory map (`meta`)
//! - The consistent-hash ring routing blocks to shards (`ring`)
//! - The RPC message enums for both service surfaces (`rpc`)
//! - Length-delimited TCP framing and the typed RPC error (`wire`)
//!
//! The message enums and their postcard encoding are the on-the-wire
//! contract between clients and servers; changes to them are protocol
//! changes. The framing helpers in `wire` are convenience plumbing on top.

pub mod hash;
pub mod meta;
pub mod ring;
pub mod rpc;
pub mod wire;

pub use hash::BlockHash;
pub use meta::{FileInfoMap, FileMetaData, REJECTED_VERSION};
pub use ring::HashRing;
pub use rpc::{Block, BlockRequest, BlockResponse, MetaRequest, MetaResponse, Request};
pub use wire::{DEFAULT_DEADLINE, RpcError};
