use boxdb::errors::ErrorKind;
use boxdb::storage::MemoryStorageFactory;
use boxdb::{BoxDb, BoxDbConfig};
use boxdb_engine::{EngineManifest, PageTreeCompiler, PageTreeModule};
use std::sync::Arc;

fn artifact() -> Vec<u8> {
    EngineManifest::new(2).encode().unwrap()
}

#[tokio::test]
async fn test_missing_storage() {
    let err = BoxDb::builder()
        .source_bytes(artifact())
        .compiler(Arc::new(PageTreeCompiler::new()))
        .open()
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    assert_eq!(err.message(), "missing storage");
}

#[tokio::test]
async fn test_missing_source() {
    let err = BoxDb::builder()
        .storage(Arc::new(MemoryStorageFactory::new()))
        .compiler(Arc::new(PageTreeCompiler::new()))
        .open()
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    assert_eq!(err.message(), "missing module source");
}

#[tokio::test]
async fn test_missing_compiler() {
    let err = BoxDb::builder()
        .storage(Arc::new(MemoryStorageFactory::new()))
        .source_bytes(artifact())
        .open()
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    assert!(err.message().contains("missing engine compiler"));
}

#[tokio::test]
async fn test_module_needs_no_compiler() {
    let db = BoxDb::builder()
        .storage(Arc::new(MemoryStorageFactory::new()))
        .module(Arc::new(PageTreeModule::new(EngineManifest::new(4))))
        .open()
        .await
        .unwrap();
    assert_eq!(db.dimensions(), 4);
}

#[tokio::test]
async fn test_multiple_sources() {
    let err = BoxDb::builder()
        .storage(Arc::new(MemoryStorageFactory::new()))
        .module(Arc::new(PageTreeModule::new(EngineManifest::new(2))))
        .source_bytes(artifact())
        .compiler(Arc::new(PageTreeCompiler::new()))
        .open()
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::ConfigurationError);
    assert!(err.message().contains("multiple module sources"));
}

#[test]
fn test_config_validate() {
    let mut config = BoxDbConfig::new();
    assert!(!config.has_source());
    assert!(config.validate().is_err());

    config
        .set_source(boxdb::bootstrap::ArtifactSource::Bytes(artifact()))
        .unwrap();
    config.set_storage(Arc::new(MemoryStorageFactory::new()));
    let err = config.validate().err().unwrap();
    assert!(err.message().contains("bytes"));

    config.set_compiler(Arc::new(PageTreeCompiler::new()));
    assert!(config.validate().is_ok());

    let second = config.set_source(boxdb::bootstrap::ArtifactSource::Bytes(artifact()));
    assert_eq!(second.err().unwrap().kind(), &ErrorKind::ConfigurationError);
}
