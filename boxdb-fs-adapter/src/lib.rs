//! File-system storage backend for boxdb.
//!
//! Every storage name an engine requests becomes a file below a root
//! directory, so the tree of node files the reference engine writes
//! (`meta`, `t/00/00/...`) appears on disk as-is.
//!
//! ```rust,ignore
//! use boxdb::BoxDb;
//! use boxdb_fs_adapter::FsStorage;
//! use std::sync::Arc;
//!
//! let db = BoxDb::builder()
//!     .storage(Arc::new(FsStorage::new("/var/lib/boxdb/places")))
//!     // engine source and compiler as usual
//!     .open()
//!     .await?;
//! ```

mod config;
mod storage;

pub use config::*;
pub use storage::*;
