//! # boxdb engine - a paged N-dimensional R-tree
//!
//! The reference engine behind the `boxdb` protocol. Records live in a
//! paged R-tree whose nodes are stored one per file through the host's
//! storage adapter and loaded on demand.
//!
//! ## Features
//!
//! - **Any dimensionality**: fixed per artifact by its [`EngineManifest`]
//! - **Lazy Loading**: nodes are read only when a batch or query reaches them
//! - **LRU Cache**: recently used nodes kept in memory
//! - **Atomic Batches**: a batch is staged in memory and committed as a unit
//! - **Checksummed Pages**: every node page carries a CRC32
//! - **Query Tracing**: one trace event per node visited
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use boxdb::point;
//! use boxdb::batch::{BatchOperation, BatchOptions};
//! use boxdb::point::Region;
//! use boxdb::query::QueryOptions;
//! use boxdb::storage::MemoryStorageFactory;
//! use boxdb::BoxDb;
//! use boxdb_engine::{EngineManifest, PageTreeCompiler};
//! use std::sync::Arc;
//!
//! let db = BoxDb::builder()
//!     .storage(Arc::new(MemoryStorageFactory::new()))
//!     .source_bytes(EngineManifest::new(2).encode()?)
//!     .compiler(Arc::new(PageTreeCompiler::new()))
//!     .open()
//!     .await?;
//!
//! db.batch(&[BatchOperation::insert(point![1.0, 2.0], vec![97])], BatchOptions::default())
//!     .await?;
//! let rows = db
//!     .query(Region::from_flat(&[-10.0, -10.0, 10.0, 10.0])?, QueryOptions::default())
//!     .await?
//!     .collect_rows()
//!     .await?;
//! ```
//!
//! ## Storage Layout
//!
//! - `meta` holds the tree header: dimensions, root, counters and height.
//! - Node `n` lives at [`layout::tree_file`]`(n)`, e.g. the initial root
//!   is `t/00/00/00/00/00/00/00/00`.

mod cache;
mod constants;
mod cursor;
mod engine;
mod errors;
pub mod layout;
mod manifest;
mod store;
mod tree;
mod types;

pub use engine::{PageTreeCompiler, PageTreeEngine, PageTreeModule};
pub use errors::{EngineError, EngineResult};
pub use manifest::EngineManifest;
pub use tree::BatchSummary;
pub use types::{NodeId, PageTreeStats};
