//! The surfstore client.
//!
//! A sync pass reconciles one local base directory against the remote
//! directory service:
//!
//! - `scan` splits top-level files into fixed-size blocks and hashes them
//! - `index` persists the client's last-known metadata in
//!   `<baseDir>/index.db`
//! - `engine` runs the reconciliation: per-file decisions, block
//!   transfers via the shard routing the metadata service hands out, and
//!   remote-wins conflict handling

pub mod engine;
pub mod index;
pub mod scan;

pub use engine::SyncClient;
