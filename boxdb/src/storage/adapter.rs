use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{noop_remove_hook, LenCapability, RawStorage, RemoveHook, StorageFactory};
use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};

/// Operations bound once from a backend's declared capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundOps {
    pub len: LenCapability,
    pub truncate: bool,
    pub delete: bool,
    pub sync: bool,
}

impl BoundOps {
    fn probe(raw: &dyn RawStorage) -> BoundOps {
        let caps = raw.capabilities();
        BoundOps {
            len: caps.len,
            truncate: caps.truncate,
            delete: caps.delete,
            sync: caps.sync,
        }
    }
}

/// One open storage file with a uniform operation surface.
///
/// Handles are created by [`StorageAdapter::open`] and destroyed by
/// [`StorageAdapter::delete`]; a deleted handle rejects further operations.
pub struct StorageHandle {
    name: String,
    raw: Box<dyn RawStorage>,
    ops: BoundOps,
    deleted: AtomicBool,
    sync_warned: AtomicBool,
}

impl StorageHandle {
    fn new(name: &str, raw: Box<dyn RawStorage>) -> StorageHandle {
        let ops = BoundOps::probe(raw.as_ref());
        log::debug!("Opened storage '{}' with {:?}", name, ops);
        StorageHandle {
            name: name.to_string(),
            raw,
            ops,
            deleted: AtomicBool::new(false),
            sync_warned: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bound_ops(&self) -> BoundOps {
        self.ops
    }

    fn check_live(&self) -> BoxDbResult<()> {
        if self.deleted.load(Ordering::Acquire) {
            return Err(BoxDbError::new(
                &format!("storage '{}' has been deleted", self.name),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }

    /// Copies `data` into an owned buffer for the backend.
    pub async fn write(&self, offset: u64, data: &[u8]) -> BoxDbResult<()> {
        self.check_live()?;
        self.raw.write(offset, data.to_vec()).await
    }

    pub async fn read(&self, offset: u64, length: u64) -> BoxDbResult<Vec<u8>> {
        self.check_live()?;
        self.raw.read(offset, length).await
    }

    pub async fn len(&self) -> BoxDbResult<u64> {
        self.check_live()?;
        match self.ops.len {
            LenCapability::Field => {
                // let writes issued before this call settle before the field is read
                tokio::task::yield_now().await;
                self.raw
                    .length()
                    .ok_or_else(|| BoxDbError::capability_missing("len"))
            }
            LenCapability::Method => self.raw.len().await,
            LenCapability::Absent => Err(BoxDbError::capability_missing("len")),
        }
    }

    pub async fn is_empty(&self) -> BoxDbResult<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn truncate(&self, length: u64) -> BoxDbResult<()> {
        self.check_live()?;
        if !self.ops.truncate {
            return Err(BoxDbError::capability_missing("truncate"));
        }
        self.raw.truncate(length).await
    }

    pub(crate) async fn del(&self) -> BoxDbResult<()> {
        self.check_live()?;
        if !self.ops.delete {
            return Err(BoxDbError::capability_missing("del"));
        }
        self.raw.del().await?;
        self.deleted.store(true, Ordering::Release);
        Ok(())
    }

    pub async fn sync(&self) -> BoxDbResult<()> {
        self.check_live()?;
        if !self.ops.sync {
            if !self.sync_warned.swap(true, Ordering::Relaxed) {
                log::warn!("Storage '{}' has no sync(); treating sync as a no-op", self.name);
            }
            return Ok(());
        }
        self.raw.sync().await
    }
}

/// Owns every storage handle an engine instance has requested.
///
/// Names are passed to the [`StorageFactory`] verbatim. Handles are created on
/// first request and shared afterwards; deleting one forgets it and invokes
/// the remove hook.
#[derive(Clone)]
pub struct StorageAdapter {
    inner: Arc<StorageAdapterInner>,
}

struct StorageAdapterInner {
    factory: Arc<dyn StorageFactory>,
    remove_hook: RemoveHook,
    handles: DashMap<String, Arc<StorageHandle>>,
}

impl StorageAdapter {
    pub fn new(factory: Arc<dyn StorageFactory>) -> StorageAdapter {
        StorageAdapter::with_remove_hook(factory, noop_remove_hook())
    }

    pub fn with_remove_hook(factory: Arc<dyn StorageFactory>, remove_hook: RemoveHook) -> StorageAdapter {
        StorageAdapter {
            inner: Arc::new(StorageAdapterInner {
                factory,
                remove_hook,
                handles: DashMap::new(),
            }),
        }
    }

    /// Returns the handle for `name`, opening it through the factory on first use.
    pub fn open(&self, name: &str) -> BoxDbResult<Arc<StorageHandle>> {
        if let Some(handle) = self.inner.handles.get(name) {
            return Ok(handle.value().clone());
        }
        let entry = self
            .inner
            .handles
            .entry(name.to_string())
            .or_try_insert_with(|| {
                let raw = self.inner.factory.open(name)?;
                Ok::<_, BoxDbError>(Arc::new(StorageHandle::new(name, raw)))
            })?;
        Ok(entry.value().clone())
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.inner.handles.contains_key(name)
    }

    /// Names of the currently open handles, sorted.
    pub fn open_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .handles
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Deletes the file behind `name` and destroys its handle.
    pub async fn delete(&self, name: &str) -> BoxDbResult<()> {
        let handle = self.open(name)?;
        handle.del().await?;
        self.inner.handles.remove(name);
        log::debug!("Deleted storage '{}'", name);
        (self.inner.remove_hook)(name)
    }

    /// Syncs every open handle in name order.
    pub async fn sync_all(&self) -> BoxDbResult<()> {
        let mut handles: Vec<Arc<StorageHandle>> = self
            .inner
            .handles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        handles.sort_by(|a, b| a.name().cmp(b.name()));
        for handle in handles {
            handle.sync().await?;
        }
        Ok(())
    }
}
