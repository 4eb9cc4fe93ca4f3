// Codec settings

use serde::{Deserialize, Serialize};

/// Configuration for encoding and decoding
///
/// Every encoder configuration produces bytes that every decoder
/// configuration accepts; the block options only change how arrays and maps
/// are framed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum items per array/map block. `None` (or 0) writes one block.
    pub block_items: Option<usize>,
    /// Write each block as a negative count followed by its byte size
    pub sized_blocks: bool,
    /// Accept bytes left over after the decoded value
    pub allow_trailing_bytes: bool,
    /// Upper bound on the array and map items in one decoded value, counted
    /// across every nested collection
    pub max_collection_items: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            block_items: None,
            sized_blocks: false,
            allow_trailing_bytes: false,
            max_collection_items: 1 << 20,
        }
    }
}

impl CodecConfig {
    /// Items per block for a collection of `len` items
    pub(crate) fn block_len(&self, len: usize) -> usize {
        self.block_items
            .filter(|n| *n > 0)
            .unwrap_or(len)
            .max(1)
    }
}
