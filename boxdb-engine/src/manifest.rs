//! The engine artifact.
//!
//! An artifact is an [`EngineManifest`] encoded with bincode behind a magic
//! number and a format version. It fixes the dimensionality and tuning of
//! every instance created from it.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BRANCH_FACTOR, DEFAULT_CACHE_PAGES, DEFAULT_MAX_RECORDS, MANIFEST_MAGIC,
    MANIFEST_VERSION, MAX_DIMENSIONS, MIN_NODE_CAPACITY,
};
use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineManifest {
    pub dimensions: usize,
    /// Maximum children of an internal node
    pub branch_factor: usize,
    /// Maximum records of a leaf
    pub max_records: usize,
    /// Nodes kept in the read cache
    pub cache_pages: usize,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: u32,
    version: u32,
    manifest: EngineManifest,
}

impl EngineManifest {
    pub fn new(dimensions: usize) -> EngineManifest {
        EngineManifest {
            dimensions,
            branch_factor: DEFAULT_BRANCH_FACTOR,
            max_records: DEFAULT_MAX_RECORDS,
            cache_pages: DEFAULT_CACHE_PAGES,
        }
    }

    pub fn branch_factor(mut self, branch_factor: usize) -> EngineManifest {
        self.branch_factor = branch_factor;
        self
    }

    pub fn max_records(mut self, max_records: usize) -> EngineManifest {
        self.max_records = max_records;
        self
    }

    pub fn cache_pages(mut self, cache_pages: usize) -> EngineManifest {
        self.cache_pages = cache_pages;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.dimensions == 0 {
            return Err(EngineError::InvalidOperation(
                "manifest must declare at least one dimension".into(),
            ));
        }
        if self.dimensions > MAX_DIMENSIONS {
            return Err(EngineError::InvalidOperation(format!(
                "manifest declares {} dimensions, at most {} are supported",
                self.dimensions, MAX_DIMENSIONS
            )));
        }
        if self.branch_factor < MIN_NODE_CAPACITY || self.max_records < MIN_NODE_CAPACITY {
            return Err(EngineError::InvalidOperation(format!(
                "node capacities must be at least {} (branch_factor {}, max_records {})",
                MIN_NODE_CAPACITY, self.branch_factor, self.max_records
            )));
        }
        if self.cache_pages == 0 {
            return Err(EngineError::InvalidOperation(
                "cache_pages must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Encodes the manifest as an engine artifact.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        self.validate()?;
        let envelope = Envelope {
            magic: MANIFEST_MAGIC,
            version: MANIFEST_VERSION,
            manifest: *self,
        };
        Ok(bincode::serde::encode_to_vec(
            &envelope,
            bincode::config::legacy(),
        )?)
    }

    /// Decodes and validates an engine artifact.
    pub fn decode(bytes: &[u8]) -> EngineResult<EngineManifest> {
        let (envelope, _): (Envelope, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::legacy())?;
        if envelope.magic != MANIFEST_MAGIC {
            return Err(EngineError::Serialization(format!(
                "not an engine artifact (bad magic {:#x})",
                envelope.magic
            )));
        }
        if envelope.version != MANIFEST_VERSION {
            return Err(EngineError::Serialization(format!(
                "unsupported artifact version {}",
                envelope.version
            )));
        }
        envelope.manifest.validate()?;
        Ok(envelope.manifest)
    }
}
