//! Turns an engine artifact into a ready instance.
//!
//! The artifact arrives as one of several [`ArtifactSource`] variants. All of
//! them are resolved here, once, into a `Box<dyn EngineInstance>`; nothing past
//! bootstrap knows which variant was supplied.

use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::engine::{ByteStream, EngineCompiler, EngineInstance, EngineModule, IdExtractor, Imports};
use crate::errors::{BoxDbError, BoxDbResult, ErrorKind};

/// What a pending fetch resolves to.
pub enum FetchedSource {
    Bytes(Vec<u8>),
    /// A streamable response, compiled with streaming compilation
    Stream(ByteStream),
}

pub type PendingSource = BoxFuture<'static, BoxDbResult<FetchedSource>>;

/// The engine artifact handed to [`Bootstrap::run`].
pub enum ArtifactSource {
    /// An already linked instance, used as is
    Instance(Box<dyn EngineInstance>),
    /// A compiled module, instantiated synchronously
    Module(Arc<dyn EngineModule>),
    /// Raw artifact bytes
    Bytes(Vec<u8>),
    /// An asynchronous fetch of the artifact
    Pending(PendingSource),
    /// A chunked artifact stream
    Stream(ByteStream),
}

impl ArtifactSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ArtifactSource::Instance(_) => "instance",
            ArtifactSource::Module(_) => "module",
            ArtifactSource::Bytes(_) => "bytes",
            ArtifactSource::Pending(_) => "pending",
            ArtifactSource::Stream(_) => "stream",
        }
    }

    /// True for sources that must go through an [`EngineCompiler`].
    pub fn needs_compiler(&self) -> bool {
        matches!(
            self,
            ArtifactSource::Bytes(_) | ArtifactSource::Pending(_) | ArtifactSource::Stream(_)
        )
    }
}

impl Debug for ArtifactSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArtifactSource::{}", self.kind())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Uninitialized,
    Instantiating,
    Ready,
    /// Compilation or linking failed; holds the failure message
    Failed(String),
}

impl Display for BootstrapState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BootstrapState::Uninitialized => write!(f, "uninitialized"),
            BootstrapState::Instantiating => write!(f, "instantiating"),
            BootstrapState::Ready => write!(f, "ready"),
            BootstrapState::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

/// One bootstrap attempt.
///
/// `Uninitialized -> Instantiating -> Ready`, or `Instantiating -> Failed`.
/// Both end states are final; a failed attempt is retried by running a new
/// `Bootstrap` with a corrected artifact.
#[derive(Clone)]
pub struct Bootstrap {
    state: Arc<RwLock<BootstrapState>>,
}

impl Bootstrap {
    pub fn new() -> Bootstrap {
        Bootstrap {
            state: Arc::new(RwLock::new(BootstrapState::Uninitialized)),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state.read().clone()
    }

    fn transition(&self, next: BootstrapState) {
        let mut state = self.state.write();
        log::debug!("Bootstrap {} -> {}", *state, next);
        *state = next;
    }

    /// Resolves `source` into a ready instance linked against `imports`.
    ///
    /// The id extractor, when given, is registered before the instance is
    /// returned.
    pub async fn run(
        &self,
        source: ArtifactSource,
        imports: Imports,
        compiler: Option<Arc<dyn EngineCompiler>>,
        id_extractor: Option<IdExtractor>,
    ) -> BoxDbResult<Box<dyn EngineInstance>> {
        let current = self.state();
        if current != BootstrapState::Uninitialized {
            return Err(BoxDbError::new(
                &format!("bootstrap already ran, state is {}", current),
                ErrorKind::InvalidOperation,
            ));
        }
        if source.needs_compiler() && compiler.is_none() {
            return Err(BoxDbError::new(
                "missing engine compiler",
                ErrorKind::ConfigurationError,
            ));
        }

        self.transition(BootstrapState::Instantiating);
        log::debug!("Instantiating engine from {:?}", source);
        match self.instantiate(source, imports, compiler).await {
            Ok(mut instance) => {
                if let Some(extractor) = id_extractor {
                    instance.register_id_extractor(extractor);
                }
                self.transition(BootstrapState::Ready);
                Ok(instance)
            }
            Err(e) => {
                log::error!("Engine instantiation failed: {}", e);
                self.transition(BootstrapState::Failed(e.message().to_string()));
                if e.kind() == &ErrorKind::InstantiationError {
                    Err(e)
                } else {
                    Err(BoxDbError::new_with_cause(
                        &format!("failed to instantiate engine: {}", e.message()),
                        ErrorKind::InstantiationError,
                        e,
                    ))
                }
            }
        }
    }

    async fn instantiate(
        &self,
        source: ArtifactSource,
        imports: Imports,
        compiler: Option<Arc<dyn EngineCompiler>>,
    ) -> BoxDbResult<Box<dyn EngineInstance>> {
        let module = match source {
            ArtifactSource::Instance(instance) => return Ok(instance),
            ArtifactSource::Module(module) => module,
            ArtifactSource::Bytes(bytes) => require(compiler)?.compile(&bytes).await?,
            ArtifactSource::Stream(stream) => require(compiler)?.compile_streaming(stream).await?,
            ArtifactSource::Pending(pending) => {
                let compiler = require(compiler)?;
                match pending.await? {
                    FetchedSource::Bytes(bytes) => compiler.compile(&bytes).await?,
                    FetchedSource::Stream(stream) => compiler.compile_streaming(stream).await?,
                }
            }
        };
        module.instantiate(imports)
    }
}

impl Default for Bootstrap {
    fn default() -> Self {
        Bootstrap::new()
    }
}

fn require(compiler: Option<Arc<dyn EngineCompiler>>) -> BoxDbResult<Arc<dyn EngineCompiler>> {
    compiler.ok_or_else(|| BoxDbError::new("missing engine compiler", ErrorKind::ConfigurationError))
}
