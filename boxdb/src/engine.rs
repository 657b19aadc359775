//! The contract between the host and an index engine.
//!
//! An engine is reached only through these traits. A compiled
//! [`EngineModule`] is linked against an [`Imports`] table to produce an
//! [`EngineInstance`]; an [`EngineCompiler`] turns raw or streamed artifact
//! bytes into a module.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use std::sync::Arc;

use crate::batch::{BatchOperation, BatchOptions};
use crate::errors::BoxDbResult;
use crate::point::Region;
use crate::query::TraceSink;
use crate::record::QueryRow;
use crate::storage::StorageAdapter;

/// Derives a record identity from its value. Must be deterministic.
pub type IdExtractor = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// A chunked byte source for streaming compilation.
pub type ByteStream = BoxStream<'static, BoxDbResult<Vec<u8>>>;

/// Host capabilities handed to a module at instantiation.
#[derive(Clone)]
pub struct Imports {
    pub storage: StorageAdapter,
}

impl Imports {
    pub fn new(storage: StorageAdapter) -> Imports {
        Imports { storage }
    }
}

/// Lazy, single-pass sequence of query results.
#[async_trait]
pub trait QueryCursor: Send {
    /// The next matching record, or `None` once the results are exhausted.
    async fn next(&mut self) -> BoxDbResult<Option<QueryRow>>;
}

/// A ready engine.
///
/// Callers validate points and regions against [`EngineInstance::dimensions`]
/// before calling `batch` or `query`, and never issue two calls at once.
#[async_trait]
pub trait EngineInstance: Send {
    /// The fixed dimensionality N of this instance.
    fn dimensions(&self) -> usize;

    /// Installs the identity extractor used for inserts and delete matching.
    fn register_id_extractor(&mut self, extractor: IdExtractor);

    /// Applies `operations` in order as one unit.
    async fn batch(&mut self, operations: &[BatchOperation], options: &BatchOptions) -> BoxDbResult<()>;

    /// Starts a query over `region`; `trace` receives one event per node visited.
    async fn query(&mut self, region: Region, trace: Option<TraceSink>) -> BoxDbResult<Box<dyn QueryCursor>>;

    /// Flushes engine state and syncs storage.
    async fn sync(&mut self) -> BoxDbResult<()>;
}

/// A compiled engine artifact that can be instantiated any number of times.
pub trait EngineModule: Send + Sync {
    fn instantiate(&self, imports: Imports) -> BoxDbResult<Box<dyn EngineInstance>>;
}

/// Compiles artifact bytes into an [`EngineModule`].
#[async_trait]
pub trait EngineCompiler: Send + Sync {
    async fn compile(&self, bytes: &[u8]) -> BoxDbResult<Arc<dyn EngineModule>>;

    /// Compiles from a chunked source. The default gathers every chunk first.
    async fn compile_streaming(&self, stream: ByteStream) -> BoxDbResult<Arc<dyn EngineModule>> {
        let bytes = stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await?;
        self.compile(&bytes).await
    }
}
