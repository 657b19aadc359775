use futures::future::BoxFuture;
use std::sync::Arc;

use crate::bootstrap::{ArtifactSource, FetchedSource};
use crate::config::BoxDbConfig;
use crate::database::BoxDb;
use crate::engine::{ByteStream, EngineCompiler, EngineInstance, EngineModule};
use crate::errors::{BoxDbError, BoxDbResult};
use crate::storage::StorageFactory;

/// Fluent builder for opening a [`BoxDb`].
///
/// The first configuration error is captured and reported from
/// [`BoxDbBuilder::open`]; later setters are ignored once an error is held.
///
/// # Examples
///
/// ```rust,ignore
/// use boxdb::BoxDb;
/// use boxdb::storage::MemoryStorageFactory;
/// use std::sync::Arc;
///
/// let db = BoxDb::builder()
///     .storage(Arc::new(MemoryStorageFactory::new()))
///     .source_bytes(artifact)
///     .compiler(Arc::new(PageTreeCompiler::new()))
///     .open()
///     .await?;
/// ```
#[derive(Default)]
pub struct BoxDbBuilder {
    error: Option<BoxDbError>,
    config: BoxDbConfig,
}

impl BoxDbBuilder {
    pub fn new() -> Self {
        BoxDbBuilder {
            error: None,
            config: BoxDbConfig::new(),
        }
    }

    /// Factory producing one raw backend per storage name. Required.
    pub fn storage(mut self, factory: Arc<dyn StorageFactory>) -> Self {
        self.config.set_storage(factory);
        self
    }

    /// Uses an already linked instance.
    pub fn instance(self, instance: Box<dyn EngineInstance>) -> Self {
        self.source(ArtifactSource::Instance(instance))
    }

    /// Instantiates a compiled module against the storage adapter.
    pub fn module(self, module: Arc<dyn EngineModule>) -> Self {
        self.source(ArtifactSource::Module(module))
    }

    pub fn source_bytes(self, bytes: Vec<u8>) -> Self {
        self.source(ArtifactSource::Bytes(bytes))
    }

    /// A fetch of the artifact, awaited during `open`.
    pub fn source_future(self, future: BoxFuture<'static, BoxDbResult<FetchedSource>>) -> Self {
        self.source(ArtifactSource::Pending(future))
    }

    pub fn source_stream(self, stream: ByteStream) -> Self {
        self.source(ArtifactSource::Stream(stream))
    }

    pub fn source(mut self, source: ArtifactSource) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_source(source) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Compiles byte, fetched and streamed sources.
    pub fn compiler(mut self, compiler: Arc<dyn EngineCompiler>) -> Self {
        self.config.set_compiler(compiler);
        self
    }

    /// Derives record identities from values. Must be deterministic.
    pub fn id_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
    {
        self.config.set_id_extractor(Arc::new(extractor));
        self
    }

    /// Invoked with the storage name after a storage file is deleted.
    pub fn remove_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) -> BoxDbResult<()> + Send + Sync + 'static,
    {
        self.config.set_remove_hook(Arc::new(hook));
        self
    }

    /// Validates the configuration, bootstraps the engine and opens the database.
    pub async fn open(self) -> BoxDbResult<BoxDb> {
        if let Some(error) = self.error {
            return Err(error);
        }
        BoxDb::open(self.config).await
    }
}
