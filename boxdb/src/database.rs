use std::sync::Arc;

use crate::batch::{validate_batch, BatchOperation, BatchOptions};
use crate::bootstrap::{Bootstrap, BootstrapState};
use crate::builder::BoxDbBuilder;
use crate::config::BoxDbConfig;
use crate::engine::Imports;
use crate::errors::BoxDbResult;
use crate::point::Region;
use crate::query::{QueryOptions, QueryStream, SharedEngine};
use crate::storage::StorageAdapter;

/// An opened spatial database.
///
/// `BoxDb` owns one engine instance and the storage adapter it was linked
/// against. Clones share both, along with a FIFO operation queue: every
/// batch, every query step and every sync waits for the previous one to
/// finish, so calls from concurrent tasks never interleave inside the engine.
///
/// # Examples
///
/// ```rust,ignore
/// use boxdb::batch::{BatchOperation, BatchOptions};
/// use boxdb::point::Region;
/// use boxdb::query::QueryOptions;
/// use boxdb::point;
///
/// db.batch(
///     &[BatchOperation::insert(point![1.0, 2.0], b"hi".to_vec())],
///     BatchOptions::default(),
/// )
/// .await?;
///
/// let region = Region::from_flat(&[-10.0, -10.0, 10.0, 10.0])?;
/// let rows = db.query(region, QueryOptions::new()).await?.collect_rows().await?;
/// ```
#[derive(Clone)]
pub struct BoxDb {
    inner: Arc<BoxDbInner>,
}

struct BoxDbInner {
    engine: SharedEngine,
    dimensions: usize,
    storage: StorageAdapter,
    bootstrap: Bootstrap,
}

impl BoxDb {
    pub fn builder() -> BoxDbBuilder {
        BoxDbBuilder::new()
    }

    pub(crate) async fn open(config: BoxDbConfig) -> BoxDbResult<BoxDb> {
        let parts = config.into_parts()?;
        let storage = StorageAdapter::with_remove_hook(parts.storage, parts.remove_hook);
        let bootstrap = Bootstrap::new();
        let instance = bootstrap
            .run(
                parts.source,
                Imports::new(storage.clone()),
                parts.compiler,
                parts.id_extractor,
            )
            .await?;
        let dimensions = instance.dimensions();
        log::debug!("Opened {}-dimensional database", dimensions);

        Ok(BoxDb {
            inner: Arc::new(BoxDbInner {
                engine: Arc::new(tokio::sync::Mutex::new(instance)),
                dimensions,
                storage,
                bootstrap,
            }),
        })
    }

    /// Applies `operations` in order as one unit.
    ///
    /// Every point is validated first; a malformed operation rejects the batch
    /// before the engine sees any of it.
    ///
    /// # Errors
    ///
    /// - `MalformedInput` for a point of the wrong dimensionality or with an
    ///   inverted range
    /// - `DeleteTargetNotFound` when a delete target does not exist and
    ///   `options.error_if_missing` is set
    /// - storage errors raised while applying the batch
    pub async fn batch(&self, operations: &[BatchOperation], options: BatchOptions) -> BoxDbResult<()> {
        validate_batch(operations, self.inner.dimensions)?;
        let mut engine = self.inner.engine.lock().await;
        engine.batch(operations, &options).await?;
        log::debug!("Applied batch of {} operations", operations.len());
        Ok(())
    }

    /// Starts a query for every live record intersecting `region`.
    ///
    /// # Errors
    ///
    /// `MalformedInput` when the region's dimensionality differs from the
    /// database's.
    pub async fn query(&self, region: Region, options: QueryOptions) -> BoxDbResult<QueryStream> {
        region.validate(self.inner.dimensions)?;
        let cursor = {
            let mut engine = self.inner.engine.lock().await;
            engine.query(region, options.trace).await?
        };
        Ok(QueryStream::new(cursor, self.inner.engine.clone()))
    }

    /// Flushes engine state and syncs every storage file. Best effort with
    /// respect to backends that cannot sync.
    pub async fn sync(&self) -> BoxDbResult<()> {
        let mut engine = self.inner.engine.lock().await;
        engine.sync().await
    }

    pub fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    pub fn state(&self) -> BootstrapState {
        self.inner.bootstrap.state()
    }

    /// The storage adapter the engine was linked against.
    pub fn storage(&self) -> StorageAdapter {
        self.inner.storage.clone()
    }
}
