use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::storage::FsStorage;

/// Settings of a file-system storage backend.
///
/// Cheap to clone; every [`crate::FsFile`] opened by one [`FsStorage`]
/// shares the same configuration.
#[derive(Clone, Debug)]
pub struct FsStorageConfig {
    inner: Arc<FsStorageConfigInner>,
}

#[derive(Debug)]
struct FsStorageConfigInner {
    root: PathBuf,
    create_dirs: bool,
    read_only: bool,
}

impl FsStorageConfig {
    pub fn new(root: impl AsRef<Path>) -> FsStorageConfig {
        FsStorageConfig {
            inner: Arc::new(FsStorageConfigInner {
                root: root.as_ref().to_path_buf(),
                create_dirs: true,
                read_only: false,
            }),
        }
    }

    /// Directory every storage name is resolved against.
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Whether missing parent directories are created on first write.
    pub fn create_dirs(&self) -> bool {
        self.inner.create_dirs
    }

    pub fn read_only(&self) -> bool {
        self.inner.read_only
    }
}

/// Builder for [`FsStorage`].
///
/// # Examples
///
/// ```rust,no_run
/// use boxdb_fs_adapter::FsStorage;
///
/// let storage = FsStorage::with_config()
///     .root("/var/lib/boxdb/places")
///     .read_only(true)
///     .build();
/// assert!(storage.config().read_only());
/// ```
#[derive(Debug, Default)]
pub struct FsStorageBuilder {
    root: PathBuf,
    create_dirs: Option<bool>,
    read_only: bool,
}

impl FsStorageBuilder {
    pub fn new() -> FsStorageBuilder {
        FsStorageBuilder::default()
    }

    pub fn root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    pub fn create_dirs(mut self, create_dirs: bool) -> Self {
        self.create_dirs = Some(create_dirs);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn build(self) -> FsStorage {
        let config = FsStorageConfig {
            inner: Arc::new(FsStorageConfigInner {
                root: self.root,
                // a read-only backend never writes, so it never needs directories
                create_dirs: self.create_dirs.unwrap_or(!self.read_only),
                read_only: self.read_only,
            }),
        };
        FsStorage::from_config(config)
    }
}
