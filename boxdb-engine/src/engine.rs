//! Compiler, module and instance of the page tree engine.

use async_trait::async_trait;
use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::engine::{
    EngineCompiler, EngineInstance, EngineModule, IdExtractor, Imports, QueryCursor,
};
use boxdb::errors::{BoxDbError, BoxDbResult, ErrorKind};
use boxdb::point::Region;
use boxdb::query::TraceSink;
use boxdb::storage::StorageAdapter;
use std::sync::Arc;

use crate::cursor::PageTreeCursor;
use crate::manifest::EngineManifest;
use crate::store::NodeStore;
use crate::tree::PageTree;
use crate::types::PageTreeStats;

/// Compiles [`EngineManifest`] artifacts into [`PageTreeModule`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PageTreeCompiler;

impl PageTreeCompiler {
    pub fn new() -> PageTreeCompiler {
        PageTreeCompiler
    }
}

#[async_trait]
impl EngineCompiler for PageTreeCompiler {
    async fn compile(&self, bytes: &[u8]) -> BoxDbResult<Arc<dyn EngineModule>> {
        let manifest = EngineManifest::decode(bytes).map_err(|e| {
            BoxDbError::new(
                &format!("invalid engine artifact: {}", e),
                ErrorKind::InstantiationError,
            )
        })?;
        log::debug!(
            "Compiled {}-dimensional page tree module ({} bytes)",
            manifest.dimensions,
            bytes.len()
        );
        Ok(Arc::new(PageTreeModule::new(manifest)))
    }
}

/// A compiled page tree artifact.
#[derive(Debug, Clone, Copy)]
pub struct PageTreeModule {
    manifest: EngineManifest,
}

impl PageTreeModule {
    pub fn new(manifest: EngineManifest) -> PageTreeModule {
        PageTreeModule { manifest }
    }

    pub fn manifest(&self) -> &EngineManifest {
        &self.manifest
    }
}

impl EngineModule for PageTreeModule {
    fn instantiate(&self, imports: Imports) -> BoxDbResult<Box<dyn EngineInstance>> {
        self.manifest.validate().map_err(|e| {
            BoxDbError::new(
                &format!("cannot link page tree module: {}", e),
                ErrorKind::InstantiationError,
            )
        })?;
        Ok(Box::new(PageTreeEngine::new(self.manifest, imports.storage)))
    }
}

/// A page tree over the host's storage.
///
/// Persisted state is opened lazily by the first batch or query.
pub struct PageTreeEngine {
    tree: PageTree,
    id_extractor: Option<IdExtractor>,
}

impl PageTreeEngine {
    pub fn new(manifest: EngineManifest, storage: StorageAdapter) -> PageTreeEngine {
        let store = NodeStore::new(storage, manifest.dimensions, manifest.cache_pages);
        PageTreeEngine {
            tree: PageTree::new(store, manifest),
            id_extractor: None,
        }
    }

    pub fn manifest(&self) -> &EngineManifest {
        self.tree.manifest()
    }

    pub fn stats(&self) -> PageTreeStats {
        self.tree.store().stats()
    }
}

#[async_trait]
impl EngineInstance for PageTreeEngine {
    fn dimensions(&self) -> usize {
        self.tree.manifest().dimensions
    }

    fn register_id_extractor(&mut self, extractor: IdExtractor) {
        self.id_extractor = Some(extractor);
    }

    async fn batch(
        &mut self,
        operations: &[BatchOperation],
        options: &BatchOptions,
    ) -> BoxDbResult<()> {
        let summary = self
            .tree
            .apply(operations, options, self.id_extractor.as_ref())
            .await?;
        log::debug!(
            "Applied batch: {} inserted, {} deleted, {} skipped",
            summary.inserted,
            summary.deleted,
            summary.skipped
        );
        Ok(())
    }

    async fn query(
        &mut self,
        region: Region,
        trace: Option<TraceSink>,
    ) -> BoxDbResult<Box<dyn QueryCursor>> {
        self.tree.store().open().await?;
        Ok(Box::new(PageTreeCursor::new(
            self.tree.store().clone(),
            region,
            trace,
        )))
    }

    async fn sync(&mut self) -> BoxDbResult<()> {
        self.tree.store().open().await?;
        self.tree.store().sync().await?;
        Ok(())
    }
}
