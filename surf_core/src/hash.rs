//! Block identity: lowercase-hex SHA-256 digests, plus the two sentinel
//! values the metadata layer reserves for deleted and empty files.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hash-list entry marking a deleted file.
pub const TOMBSTONE: &str = "0";

/// Hash-list entry marking a zero-byte file (present, but with no blocks).
pub const EMPTY_FILE: &str = "-1";

/// Identity of a block: the lowercase-hex SHA-256 of its bytes.
///
/// A `BlockHash` is also the unit stored in a file's block-hash list, so it
/// may additionally carry one of the two sentinel values ([`TOMBSTONE`],
/// [`EMPTY_FILE`]) that never name real blocks.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(String);

impl BlockHash {
    /// Calculate the hash of the provided bytes.
    pub fn of(buf: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(buf.as_ref());
        BlockHash(data_encoding::HEXLOWER.encode(digest.as_slice()))
    }

    /// Wrap an already-encoded hash (or sentinel) string.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        BlockHash(hex.into())
    }

    /// The tombstone sentinel (`"0"`).
    pub fn tombstone() -> Self {
        BlockHash(TOMBSTONE.to_owned())
    }

    /// The empty-file sentinel (`"-1"`).
    pub fn empty_file() -> Self {
        BlockHash(EMPTY_FILE.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_tombstone(&self) -> bool {
        self.0 == TOMBSTONE
    }

    pub fn is_empty_file(&self) -> bool {
        self.0 == EMPTY_FILE
    }

    /// True for either reserved value.
    pub fn is_sentinel(&self) -> bool {
        self.is_tombstone() || self.is_empty_file()
    }

    /// First 10 hex chars, for friendly log lines.
    pub fn fmt_short(&self) -> &str {
        let end = self.0.len().min(10);
        &self.0[..end]
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BlockHash").field(&self.fmt_short()).finish()
    }
}

impl AsRef<str> for BlockHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BlockHash {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<BlockHash> for String {
    fn from(value: BlockHash) -> Self {
        value.0
    }
}
