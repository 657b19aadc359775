//! # BoxDb - host layer for embeddable spatial index engines
//!
//! BoxDb connects arbitrary byte-addressable storage backends to an
//! N-dimensional spatial index engine and defines the protocol both sides
//! speak: ordered batches of inserts and deletes, and bounding-box queries
//! answered as a lazy stream of records.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use boxdb::batch::{BatchOperation, BatchOptions};
//! use boxdb::point::Region;
//! use boxdb::query::QueryOptions;
//! use boxdb::storage::MemoryStorageFactory;
//! use boxdb::{point, BoxDb};
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
//! db.batch(
//!     &[
//!         BatchOperation::insert(point![1.0, 2.0], b"hello".to_vec()),
//!         BatchOperation::insert(point![(5.0, 12.0), (-15.0, -3.0)], b"box".to_vec()),
//!     ],
//!     BatchOptions::default(),
//! )
//! .await?;
//!
//! let mut results = db
//!     .query(Region::from_flat(&[-10.0, -10.0, 10.0, 10.0])?, QueryOptions::new())
//!     .await?;
//! while let Some(row) = results.next().await? {
//!     println!("{} {:?} {}", row.point, row.value, row.location);
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`storage`] - raw backends, capability probing and the storage adapter
//! - [`engine`] - the traits an index engine implements
//! - [`bootstrap`] - artifact sources and the instantiation state machine
//! - [`batch`] - mutation operations and batch options
//! - [`query`] - query options, trace sinks and the result stream
//! - [`point`] - coordinates, points and regions
//! - [`record`] - values, identities, locations and query rows
//! - [`errors`] - error types and result definitions

pub mod batch;
pub mod bootstrap;
pub mod builder;
pub mod config;
pub mod database;
pub mod engine;
pub mod errors;
pub mod point;
pub mod query;
pub mod record;
pub mod storage;

pub use builder::BoxDbBuilder;
pub use config::BoxDbConfig;
pub use database::BoxDb;
pub use errors::{BoxDbError, BoxDbResult, ErrorKind};
