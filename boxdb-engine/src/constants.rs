//! Constants for the page tree engine.

/// Default internal node fan-out
pub const DEFAULT_BRANCH_FACTOR: usize = 16;

/// Default leaf capacity
pub const DEFAULT_MAX_RECORDS: usize = 64;

/// Default node cache size in pages
pub const DEFAULT_CACHE_PAGES: usize = 1024;

/// Largest dimensionality a manifest may declare
pub const MAX_DIMENSIONS: usize = 64;

/// Smallest fan-out or leaf capacity that still allows a two-way split
pub const MIN_NODE_CAPACITY: usize = 2;

/// Magic number of an encoded engine manifest
pub const MANIFEST_MAGIC: u32 = 0x4258_4D46; // "BXMF"

/// Manifest format version
pub const MANIFEST_VERSION: u32 = 1;

/// Magic number of the tree meta file
pub const META_MAGIC: u32 = 0x4258_5452; // "BXTR"

/// Meta and page format version
pub const META_VERSION: u32 = 1;

/// Storage name of the tree meta file
pub const META_FILE: &str = "meta";

/// Node id of the root leaf of a fresh tree
pub const INITIAL_ROOT: u64 = 0;
