//! Storage backends and the adapter that normalizes them.
//!
//! A backend only has to provide positional `write` and `read`. Everything
//! else is optional and declared through [`Capabilities`]; the
//! [`StorageAdapter`] probes those once per opened file and binds a fixed set
//! of operations that either delegate, degrade to a no-op (`sync`) or fail
//! with `StorageCapabilityMissing` (`len`, `truncate`, `del`).

mod adapter;
pub mod memory;

pub use adapter::*;
pub use memory::{MemoryStorage, MemoryStorageFactory};

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::{BoxDbError, BoxDbResult};

/// How a backend exposes the length of its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LenCapability {
    /// A plain value available through [`RawStorage::length`]
    Field,
    /// An asynchronous [`RawStorage::len`] call
    Method,
    /// No length support
    #[default]
    Absent,
}

/// Optional operations a backend supports beyond `write` and `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub len: LenCapability,
    pub truncate: bool,
    pub delete: bool,
    pub sync: bool,
}

impl Capabilities {
    /// Every optional operation, with `len` as a method.
    pub fn all() -> Capabilities {
        Capabilities {
            len: LenCapability::Method,
            truncate: true,
            delete: true,
            sync: true,
        }
    }

    /// Only the mandatory `write` and `read`.
    pub fn minimal() -> Capabilities {
        Capabilities::default()
    }
}

/// A raw, backend-provided random access file.
///
/// Optional operations have default bodies that report the capability as
/// absent; a backend overrides the ones it implements and declares them in
/// [`RawStorage::capabilities`].
#[async_trait]
pub trait RawStorage: Send + Sync {
    /// Writes `data` at `offset`, growing the file as needed.
    async fn write(&self, offset: u64, data: Vec<u8>) -> BoxDbResult<()>;

    /// Reads exactly `length` bytes at `offset`.
    async fn read(&self, offset: u64, length: u64) -> BoxDbResult<Vec<u8>>;

    fn capabilities(&self) -> Capabilities {
        Capabilities::minimal()
    }

    /// Current length, for backends that keep it as a plain field.
    fn length(&self) -> Option<u64> {
        None
    }

    async fn len(&self) -> BoxDbResult<u64> {
        Err(BoxDbError::capability_missing("len"))
    }

    async fn truncate(&self, _length: u64) -> BoxDbResult<()> {
        Err(BoxDbError::capability_missing("truncate"))
    }

    async fn del(&self) -> BoxDbResult<()> {
        Err(BoxDbError::capability_missing("del"))
    }

    async fn sync(&self) -> BoxDbResult<()> {
        Ok(())
    }
}

/// Produces one raw backend per storage name requested by the engine.
pub trait StorageFactory: Send + Sync {
    fn open(&self, name: &str) -> BoxDbResult<Box<dyn RawStorage>>;
}

impl<F> StorageFactory for F
where
    F: Fn(&str) -> BoxDbResult<Box<dyn RawStorage>> + Send + Sync,
{
    fn open(&self, name: &str) -> BoxDbResult<Box<dyn RawStorage>> {
        self(name)
    }
}

/// Cleanup hook invoked with the storage name after a file is deleted.
pub type RemoveHook = Arc<dyn Fn(&str) -> BoxDbResult<()> + Send + Sync>;

/// The default remove hook.
pub fn noop_remove_hook() -> RemoveHook {
    Arc::new(|_| Ok(()))
}
