//! Node, header and page types of the page tree.

use boxdb::point::{Point, Region};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{INITIAL_ROOT, META_MAGIC, META_VERSION};
use crate::errors::{EngineError, EngineResult};

/// Node id, also the key of the node's storage file
pub type NodeId = u64;

/// Bytes before the payload of every page: payload length, then CRC32.
pub const PAGE_FRAME_LEN: u64 = 8;

// ============================================================================
// Statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTreeStats {
    pub entries: u64,
    pub height: u32,
    pub nodes: u64,
    pub cached_pages: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub storage_reads: u64,
    pub storage_writes: u64,
}

// ============================================================================
// Node Types
// ============================================================================

/// A record stored in a leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafEntry {
    pub point: Point,
    pub value: Vec<u8>,
    pub id: Vec<u8>,
    pub seq: u64,
}

impl LeafEntry {
    pub fn bounds(&self) -> Region {
        self.point.bounds()
    }
}

/// A child reference in an internal node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildRef {
    pub bbox: Region,
    pub node_id: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf { entries: Vec<LeafEntry> },
    Internal {
        children: Vec<ChildRef>,
        level: u32, // leaves are level 0
    },
}

impl Node {
    pub fn empty_leaf() -> Node {
        Node::Leaf { entries: vec![] }
    }

    /// The box enclosing every entry or child; inverted when the node is empty.
    pub fn compute_bbox(&self, dimensions: usize) -> Region {
        let mut bbox = Region::empty(dimensions);
        match self {
            Node::Leaf { entries } => {
                for e in entries {
                    bbox.expand(&e.bounds());
                }
            }
            Node::Internal { children, .. } => {
                for c in children {
                    bbox.expand(&c.bbox);
                }
            }
        }
        bbox
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { entries } => entries.len(),
            Node::Internal { children, .. } => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Meta Header
// ============================================================================

/// Contents of the `meta` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaHeader {
    pub magic: u32,
    pub version: u32,
    pub dimensions: u32,
    pub root: NodeId,
    pub next_node_id: NodeId,
    pub next_seq: u64,
    pub entry_count: u64,
    pub height: u32,
    pub node_count: u64,
}

impl MetaHeader {
    /// Header of a tree holding one empty root leaf.
    pub fn new(dimensions: usize) -> Self {
        Self {
            magic: META_MAGIC,
            version: META_VERSION,
            dimensions: dimensions as u32,
            root: INITIAL_ROOT,
            next_node_id: INITIAL_ROOT + 1,
            next_seq: 0,
            entry_count: 0,
            height: 1,
            node_count: 1,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.magic != META_MAGIC {
            return Err(EngineError::Corrupted("invalid meta file (bad magic)".into()));
        }
        if self.version != META_VERSION {
            return Err(EngineError::Corrupted(format!(
                "unsupported meta version {}",
                self.version
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Page Framing
// ============================================================================

/// Serializes `value` into a page: `[len: u32 LE][crc32: u32 LE][payload]`.
pub fn encode_page<T: Serialize>(value: &T) -> EngineResult<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::legacy())?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        EngineError::Serialization(format!("page too large: {} bytes", payload.len()))
    })?;
    let mut page = Vec::with_capacity(PAGE_FRAME_LEN as usize + payload.len());
    page.extend_from_slice(&len.to_le_bytes());
    page.extend_from_slice(&checksum(&payload).to_le_bytes());
    page.extend_from_slice(&payload);
    Ok(page)
}

/// Splits a page frame into payload length and checksum.
pub fn decode_frame(frame: &[u8]) -> EngineResult<(u32, u32)> {
    if frame.len() < PAGE_FRAME_LEN as usize {
        return Err(EngineError::Corrupted(format!(
            "page frame of {} bytes",
            frame.len()
        )));
    }
    let len = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    let crc = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
    Ok((len, crc))
}

/// Verifies the checksum and deserializes a page payload.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8], expected: u32) -> EngineResult<T> {
    let actual = checksum(payload);
    if actual != expected {
        return Err(EngineError::Corrupted(format!(
            "page checksum mismatch (expected: {:x}, got: {:x})",
            expected, actual
        )));
    }
    let (value, _) = bincode::serde::decode_from_slice(payload, bincode::config::legacy())?;
    Ok(value)
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
