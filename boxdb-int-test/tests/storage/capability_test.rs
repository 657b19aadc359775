use async_trait::async_trait;
use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::errors::{BoxDbError, BoxDbResult, ErrorKind};
use boxdb::storage::{Capabilities, LenCapability, RawStorage, StorageFactory};
use boxdb::BoxDb;
use boxdb_engine::{EngineManifest, PageTreeCompiler};
use boxdb_int_test::test_util::{cube, query_rows, random_point, sorted_values};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// In-memory backend that only exposes the capabilities it is told to.
#[derive(Clone)]
struct RestrictedFactory {
    files: Files,
    caps: Capabilities,
    syncs: Arc<AtomicUsize>,
}

impl RestrictedFactory {
    fn new(caps: Capabilities) -> RestrictedFactory {
        RestrictedFactory {
            files: Arc::new(Mutex::new(HashMap::new())),
            caps,
            syncs: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn file_sizes(&self) -> HashMap<String, usize> {
        self.files
            .lock()
            .iter()
            .map(|(name, data)| (name.clone(), data.len()))
            .collect()
    }
}

impl StorageFactory for RestrictedFactory {
    fn open(&self, name: &str) -> BoxDbResult<Box<dyn RawStorage>> {
        Ok(Box::new(RestrictedFile {
            name: name.to_string(),
            files: self.files.clone(),
            caps: self.caps,
            syncs: self.syncs.clone(),
        }))
    }
}

struct RestrictedFile {
    name: String,
    files: Files,
    caps: Capabilities,
    syncs: Arc<AtomicUsize>,
}

impl RestrictedFile {
    fn size(&self) -> u64 {
        self.files.lock().get(&self.name).map_or(0, |data| data.len() as u64)
    }
}

#[async_trait]
impl RawStorage for RestrictedFile {
    async fn write(&self, offset: u64, data: Vec<u8>) -> BoxDbResult<()> {
        let mut files = self.files.lock();
        let buf = files.entry(self.name.clone()).or_default();
        let end = offset as usize + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[offset as usize..end].copy_from_slice(&data);
        Ok(())
    }

    async fn read(&self, offset: u64, length: u64) -> BoxDbResult<Vec<u8>> {
        let files = self.files.lock();
        let buf = files.get(&self.name).map(|b| b.as_slice()).unwrap_or(&[]);
        let end = (offset + length) as usize;
        if end > buf.len() {
            return Err(BoxDbError::new("short read", ErrorKind::IOError));
        }
        Ok(buf[offset as usize..end].to_vec())
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn length(&self) -> Option<u64> {
        Some(self.size())
    }

    async fn len(&self) -> BoxDbResult<u64> {
        Ok(self.size())
    }

    async fn truncate(&self, length: u64) -> BoxDbResult<()> {
        if let Some(buf) = self.files.lock().get_mut(&self.name) {
            buf.truncate(length as usize);
        }
        Ok(())
    }

    async fn del(&self) -> BoxDbResult<()> {
        self.files.lock().remove(&self.name);
        Ok(())
    }

    async fn sync(&self) -> BoxDbResult<()> {
        self.syncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

async fn open(factory: &RestrictedFactory) -> BoxDbResult<BoxDb> {
    let manifest = EngineManifest::new(2).branch_factor(4).max_records(4);
    BoxDb::builder()
        .storage(Arc::new(factory.clone()))
        .source_bytes(manifest.encode()?)
        .compiler(Arc::new(PageTreeCompiler::new()))
        .open()
        .await
}

fn inserts(count: usize) -> Vec<BatchOperation> {
    let mut rng = StdRng::seed_from_u64(count as u64);
    (0..count)
        .map(|i| BatchOperation::insert(random_point(&mut rng, 2, 8.0), vec![i as u8]))
        .collect()
}

/// Inserts, then deletes half of the records by location.
async fn churn(db: &BoxDb) -> Vec<Vec<u8>> {
    db.batch(&inserts(60), BatchOptions::default()).await.unwrap();
    let rows = query_rows(db, cube(2, 10.0)).await.unwrap();
    assert_eq!(rows.len(), 60);
    let deletes: Vec<BatchOperation> = rows
        .iter()
        .step_by(2)
        .map(|row| BatchOperation::delete_at(row.location))
        .collect();
    db.batch(&deletes, BatchOptions::default()).await.unwrap();
    sorted_values(&query_rows(db, cube(2, 10.0)).await.unwrap())
}

#[tokio::test]
async fn test_missing_len_fails_first_operation() {
    let factory = RestrictedFactory::new(Capabilities::minimal());
    // opening is lazy and succeeds
    let db = open(&factory).await.unwrap();

    let err = db
        .batch(&inserts(1), BatchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::StorageCapabilityMissing("len".to_string())
    );

    let err = db
        .query(cube(2, 1.0), Default::default())
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.kind(),
        &ErrorKind::StorageCapabilityMissing("len".to_string())
    );
}

#[tokio::test]
async fn test_field_len_without_optional_ops() {
    let factory = RestrictedFactory::new(Capabilities {
        len: LenCapability::Field,
        ..Capabilities::minimal()
    });
    let db = open(&factory).await.unwrap();
    let expected = churn(&db).await;
    assert_eq!(expected.len(), 30);

    // sync degrades to a no-op
    db.sync().await.unwrap();
    assert_eq!(factory.syncs.load(Ordering::SeqCst), 0);

    // stale node files stay behind without del or truncate
    assert!(factory.file_sizes().values().all(|size| *size > 0));

    let reopened = open(&factory).await.unwrap();
    let rows = query_rows(&reopened, cube(2, 10.0)).await.unwrap();
    assert_eq!(sorted_values(&rows), expected);
}

#[tokio::test]
async fn test_truncate_without_delete() {
    let factory = RestrictedFactory::new(Capabilities {
        len: LenCapability::Method,
        truncate: true,
        ..Capabilities::minimal()
    });
    let db = open(&factory).await.unwrap();
    db.batch(&inserts(40), BatchOptions::default()).await.unwrap();
    let rows = query_rows(&db, cube(2, 10.0)).await.unwrap();
    let deletes: Vec<BatchOperation> = rows
        .iter()
        .map(|row| BatchOperation::delete_at(row.location))
        .collect();
    db.batch(&deletes, BatchOptions::default()).await.unwrap();
    assert!(query_rows(&db, cube(2, 10.0)).await.unwrap().is_empty());

    // freed nodes are truncated in place
    let sizes = factory.file_sizes();
    assert!(sizes.values().any(|size| *size == 0));
    assert!(sizes["meta"] > 0);

    let reopened = open(&factory).await.unwrap();
    assert!(query_rows(&reopened, cube(2, 10.0)).await.unwrap().is_empty());
    reopened
        .batch(&inserts(5), BatchOptions::default())
        .await
        .unwrap();
    assert_eq!(query_rows(&reopened, cube(2, 10.0)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_full_capabilities_delete_and_sync() {
    let factory = RestrictedFactory::new(Capabilities::all());
    let db = open(&factory).await.unwrap();
    churn(&db).await;

    db.sync().await.unwrap();
    assert!(factory.syncs.load(Ordering::SeqCst) > 0);
    // every file left is a live page
    assert!(factory.file_sizes().values().all(|size| *size > 0));
}
