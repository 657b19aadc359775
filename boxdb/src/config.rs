//! Options accepted when opening a database.

use std::sync::Arc;

use crate::bootstrap::ArtifactSource;
use crate::engine::{EngineCompiler, IdExtractor};
use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};
use crate::storage::{noop_remove_hook, RemoveHook, StorageFactory};

/// Everything needed to open a [`crate::BoxDb`].
///
/// Filled through [`crate::BoxDbBuilder`]. Exactly one artifact source and a
/// storage factory are required; a source that has to be compiled also needs a
/// compiler.
#[derive(Default)]
pub struct BoxDbConfig {
    storage: Option<Arc<dyn StorageFactory>>,
    source: Option<ArtifactSource>,
    compiler: Option<Arc<dyn EngineCompiler>>,
    id_extractor: Option<IdExtractor>,
    remove_hook: Option<RemoveHook>,
}

impl BoxDbConfig {
    pub fn new() -> BoxDbConfig {
        BoxDbConfig::default()
    }

    pub fn set_storage(&mut self, factory: Arc<dyn StorageFactory>) {
        self.storage = Some(factory);
    }

    /// Sets the artifact source; a second source is rejected.
    pub fn set_source(&mut self, source: ArtifactSource) -> BoxDbResult<()> {
        if let Some(existing) = &self.source {
            return Err(BoxDbError::new(
                &format!(
                    "multiple module sources: {} already set, got {}",
                    existing.kind(),
                    source.kind()
                ),
                ErrorKind::ConfigurationError,
            ));
        }
        self.source = Some(source);
        Ok(())
    }

    pub fn set_compiler(&mut self, compiler: Arc<dyn EngineCompiler>) {
        self.compiler = Some(compiler);
    }

    pub fn set_id_extractor(&mut self, extractor: IdExtractor) {
        self.id_extractor = Some(extractor);
    }

    pub fn set_remove_hook(&mut self, hook: RemoveHook) {
        self.remove_hook = Some(hook);
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Checks required options without consuming anything.
    pub fn validate(&self) -> BoxDbResult<()> {
        let Some(source) = &self.source else {
            return Err(BoxDbError::new(
                "missing module source",
                ErrorKind::ConfigurationError,
            ));
        };
        if self.storage.is_none() {
            return Err(BoxDbError::new("missing storage", ErrorKind::ConfigurationError));
        }
        if source.needs_compiler() && self.compiler.is_none() {
            return Err(BoxDbError::new(
                &format!("missing engine compiler for {} source", source.kind()),
                ErrorKind::ConfigurationError,
            ));
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> BoxDbResult<OpenParts> {
        self.validate()?;
        match (self.storage, self.source) {
            (Some(storage), Some(source)) => Ok(OpenParts {
                storage,
                source,
                compiler: self.compiler,
                id_extractor: self.id_extractor,
                remove_hook: self.remove_hook.unwrap_or_else(noop_remove_hook),
            }),
            _ => Err(BoxDbError::new(
                "configuration changed during validation",
                ErrorKind::InternalError,
            )),
        }
    }
}

pub(crate) struct OpenParts {
    pub storage: Arc<dyn StorageFactory>,
    pub source: ArtifactSource,
    pub compiler: Option<Arc<dyn EngineCompiler>>,
    pub id_extractor: Option<IdExtractor>,
    pub remove_hook: RemoveHook,
}
