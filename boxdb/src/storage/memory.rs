//! In-memory storage backend.
//!
//! Every file is a growable byte buffer. Files created through one
//! [`MemoryStorageFactory`] outlive the handles that opened them, so an engine
//! re-opened over the same factory sees previously written data.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use super::{Capabilities, RawStorage, StorageFactory};
use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};

type Buffer = Arc<RwLock<Vec<u8>>>;
type FileTable = Arc<DashMap<String, Buffer>>;

/// A single in-memory file.
#[derive(Clone)]
pub struct MemoryStorage {
    name: String,
    data: Buffer,
    files: Option<FileTable>,
}

impl MemoryStorage {
    /// Creates a detached file that belongs to no factory.
    pub fn new() -> MemoryStorage {
        MemoryStorage {
            name: String::new(),
            data: Buffer::default(),
            files: None,
        }
    }

    pub fn size(&self) -> usize {
        self.data.read().len()
    }

    /// The buffer range `offset..offset + length`, if it is addressable.
    fn span(&self, offset: u64, length: u64) -> BoxDbResult<(usize, usize)> {
        let start = usize::try_from(offset).map_err(|_| self.out_of_range(offset, length))?;
        let end = usize::try_from(length)
            .ok()
            .and_then(|length| start.checked_add(length))
            .ok_or_else(|| self.out_of_range(offset, length))?;
        Ok((start, end))
    }

    fn out_of_range(&self, offset: u64, length: u64) -> BoxDbError {
        BoxDbError::new(
            &format!(
                "range of {} bytes at offset {} is out of bounds for '{}'",
                length, offset, self.name
            ),
            ErrorKind::IOError,
        )
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        MemoryStorage::new()
    }
}

#[async_trait]
impl RawStorage for MemoryStorage {
    async fn write(&self, offset: u64, data: Vec<u8>) -> BoxDbResult<()> {
        let (start, end) = self.span(offset, data.len() as u64)?;
        let mut buf = self.data.write();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[start..end].copy_from_slice(&data);
        Ok(())
    }

    async fn read(&self, offset: u64, length: u64) -> BoxDbResult<Vec<u8>> {
        let (start, end) = self.span(offset, length)?;
        let buf = self.data.read();
        if end > buf.len() {
            return Err(BoxDbError::new(
                &format!(
                    "could not satisfy length: read {}..{} of '{}' with {} bytes",
                    start,
                    end,
                    self.name,
                    buf.len()
                ),
                ErrorKind::IOError,
            ));
        }
        Ok(buf[start..end].to_vec())
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn len(&self) -> BoxDbResult<u64> {
        Ok(self.size() as u64)
    }

    async fn truncate(&self, length: u64) -> BoxDbResult<()> {
        let length = usize::try_from(length).map_err(|_| self.out_of_range(length, 0))?;
        self.data.write().resize(length, 0);
        Ok(())
    }

    async fn del(&self) -> BoxDbResult<()> {
        self.data.write().clear();
        if let Some(files) = &self.files {
            files.remove(&self.name);
        }
        Ok(())
    }
}

/// Creates [`MemoryStorage`] files by name and remembers them.
#[derive(Clone, Default)]
pub struct MemoryStorageFactory {
    files: FileTable,
}

impl MemoryStorageFactory {
    pub fn new() -> MemoryStorageFactory {
        MemoryStorageFactory {
            files: Arc::new(DashMap::new()),
        }
    }

    /// Names of the files that currently exist, sorted.
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.files.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

impl StorageFactory for MemoryStorageFactory {
    fn open(&self, name: &str) -> BoxDbResult<Box<dyn RawStorage>> {
        let data = self
            .files
            .entry(name.to_string())
            .or_default()
            .value()
            .clone();
        Ok(Box::new(MemoryStorage {
            name: name.to_string(),
            data,
            files: Some(self.files.clone()),
        }))
    }
}
