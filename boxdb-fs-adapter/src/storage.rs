use async_trait::async_trait;
use boxdb::errors::{BoxDbError, BoxDbResult, ErrorKind};
use boxdb::storage::{Capabilities, RawStorage, StorageFactory};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::config::{FsStorageBuilder, FsStorageConfig};

/// Maps storage names to files below a root directory.
///
/// A name such as `t/00/00/00/00/00/00/00/01` becomes the relative path of
/// the file; names that would escape the root are rejected.
#[derive(Clone, Debug)]
pub struct FsStorage {
    config: FsStorageConfig,
}

impl FsStorage {
    pub fn new(root: impl AsRef<Path>) -> FsStorage {
        FsStorage::from_config(FsStorageConfig::new(root))
    }

    pub fn with_config() -> FsStorageBuilder {
        FsStorageBuilder::new()
    }

    pub(crate) fn from_config(config: FsStorageConfig) -> FsStorage {
        FsStorage { config }
    }

    pub fn config(&self) -> &FsStorageConfig {
        &self.config
    }

    /// The file a storage name resolves to.
    pub fn path_of(&self, name: &str) -> BoxDbResult<PathBuf> {
        let relative = Path::new(name);
        let well_formed = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !well_formed {
            return Err(BoxDbError::new(
                &format!("invalid storage name '{}'", name),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(self.config.root().join(relative))
    }
}

impl StorageFactory for FsStorage {
    fn open(&self, name: &str) -> BoxDbResult<Box<dyn RawStorage>> {
        let path = self.path_of(name)?;
        log::trace!("Mapped storage '{}' to {}", name, path.display());
        Ok(Box::new(FsFile::new(path, self.config.clone())))
    }
}

/// One file of an [`FsStorage`].
///
/// The file is created by the first write. Until then it reads as empty.
/// Blocking I/O runs on tokio's blocking pool, one operation at a time per
/// file.
pub struct FsFile {
    path: PathBuf,
    config: FsStorageConfig,
    lock: Arc<Mutex<()>>,
}

impl FsFile {
    pub fn new(path: PathBuf, config: FsStorageConfig) -> FsFile {
        FsFile {
            path,
            config,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_writable(&self, op: &str) -> BoxDbResult<()> {
        if self.config.read_only() {
            return Err(BoxDbError::new(
                &format!("{} rejected: storage at {} is read-only", op, self.path.display()),
                ErrorKind::IOError,
            ));
        }
        Ok(())
    }

    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> BoxDbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> io::Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        let lock = self.lock.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            f(&path)
        })
        .await?;

        result.map_err(|e| {
            BoxDbError::new(
                &format!("{} of {} failed: {}", op, self.path.display(), e),
                ErrorKind::IOError,
            )
        })
    }
}

#[async_trait]
impl RawStorage for FsFile {
    async fn write(&self, offset: u64, data: Vec<u8>) -> BoxDbResult<()> {
        self.check_writable("write")?;
        let create_dirs = self.config.create_dirs();
        self.run_blocking("write", move |path| {
            if create_dirs {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
            }
            let mut file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(&data)
        })
        .await
    }

    async fn read(&self, offset: u64, length: u64) -> BoxDbResult<Vec<u8>> {
        self.run_blocking("read", move |path| {
            let mut file = File::open(path)?;
            file.seek(SeekFrom::Start(offset))?;
            let mut buf = vec![0u8; length as usize];
            file.read_exact(&mut buf)?;
            Ok(buf)
        })
        .await
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn len(&self) -> BoxDbResult<u64> {
        self.run_blocking("len", |path| match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        })
        .await
    }

    async fn truncate(&self, length: u64) -> BoxDbResult<()> {
        self.check_writable("truncate")?;
        self.run_blocking("truncate", move |path| {
            match OpenOptions::new().write(true).open(path) {
                Ok(file) => file.set_len(length),
                Err(e) if e.kind() == io::ErrorKind::NotFound && length == 0 => Ok(()),
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn del(&self) -> BoxDbResult<()> {
        self.check_writable("delete")?;
        let root = self.config.root().to_path_buf();
        self.run_blocking("delete", move |path| {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e),
            }
            // prune directories the file leaves empty, stopping at the root
            let mut dir = path.parent();
            while let Some(current) = dir {
                if current == root || !current.starts_with(&root) {
                    break;
                }
                if fs::remove_dir(current).is_err() {
                    break;
                }
                dir = current.parent();
            }
            Ok(())
        })
        .await
    }

    async fn sync(&self) -> BoxDbResult<()> {
        if self.config.read_only() {
            return Ok(());
        }
        self.run_blocking("sync", |path| match File::open(path) {
            Ok(file) => file.sync_all(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .await
    }
}
