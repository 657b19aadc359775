use boxdb::batch::BatchOperation;
use boxdb::builder::BoxDbBuilder;
use boxdb::errors::BoxDbResult;
use boxdb::point::{Coord, Point, Region};
use boxdb::query::{QueryOptions, TraceSink};
use boxdb::record::{QueryRow, TraceEvent};
use boxdb::storage::StorageFactory;
use boxdb::{point, BoxDb};
use boxdb_engine::{EngineManifest, PageTreeCompiler};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::{env, fs, io};

#[derive(Clone)]
pub struct TestContext {
    path: Option<String>,
    storage: Arc<dyn StorageFactory>,
    manifest: EngineManifest,
    db: BoxDb,
}

impl TestContext {
    /// Root directory of the storage, when it lives on disk.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn db(&self) -> BoxDb {
        self.db.clone()
    }

    pub fn storage(&self) -> Arc<dyn StorageFactory> {
        self.storage.clone()
    }

    pub fn manifest(&self) -> EngineManifest {
        self.manifest
    }

    /// Opens a second database over the same storage.
    pub async fn reopen(&self) -> BoxDbResult<BoxDb> {
        open_db(self.storage.clone(), self.manifest).await
    }
}

pub fn random_path() -> String {
    let id = uuid::Uuid::new_v4();
    let temp_dir = env::temp_dir();
    temp_dir.join(id.to_string()).to_string_lossy().to_string()
}

/// Storage the suite runs against, selected by crate feature.
#[cfg(feature = "fs")]
pub fn test_storage() -> (Option<String>, Arc<dyn StorageFactory>) {
    let path = random_path();
    let storage = boxdb_fs_adapter::FsStorage::new(&path);
    (Some(path), Arc::new(storage))
}

#[cfg(not(feature = "fs"))]
pub fn test_storage() -> (Option<String>, Arc<dyn StorageFactory>) {
    (None, Arc::new(boxdb::storage::MemoryStorageFactory::new()))
}

/// Opens a page tree database compiled from `manifest`.
pub async fn open_db(storage: Arc<dyn StorageFactory>, manifest: EngineManifest) -> BoxDbResult<BoxDb> {
    engine_builder(storage, manifest)?.open().await
}

/// A builder with storage, artifact and compiler already set.
pub fn engine_builder(
    storage: Arc<dyn StorageFactory>,
    manifest: EngineManifest,
) -> BoxDbResult<BoxDbBuilder> {
    Ok(BoxDb::builder()
        .storage(storage)
        .source_bytes(manifest.encode()?)
        .compiler(Arc::new(PageTreeCompiler::new())))
}

pub async fn create_test_context(manifest: EngineManifest) -> BoxDbResult<TestContext> {
    create_test_context_with(manifest, |builder| builder).await
}

/// Like [`create_test_context`], letting the caller add builder options.
pub async fn create_test_context_with<F>(
    manifest: EngineManifest,
    configure: F,
) -> BoxDbResult<TestContext>
where
    F: FnOnce(BoxDbBuilder) -> BoxDbBuilder,
{
    let (path, storage) = test_storage();
    let db = configure(engine_builder(storage.clone(), manifest)?)
        .open()
        .await?;
    Ok(TestContext {
        path,
        storage,
        manifest,
        db,
    })
}

pub fn cleanup(ctx: TestContext) -> BoxDbResult<()> {
    if let Some(path) = ctx.path() {
        match fs::remove_dir_all(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Six two-dimensional records mixing scalar and range coordinates.
pub fn sample_records() -> Vec<BatchOperation> {
    vec![
        BatchOperation::insert(point![1.0, 2.0], vec![97, 98, 99]),
        BatchOperation::insert(point![-5.0, 4.0], vec![100, 101]),
        BatchOperation::insert(point![9.0, -3.0], vec![102, 103, 104]),
        BatchOperation::insert(point![5.0, -15.0], vec![105, 106]),
        BatchOperation::insert(point![(5.0, 12.0), (-15.0, -3.0)], vec![107, 108, 109]),
        BatchOperation::insert(point![(-20.0, -11.0), (-8.0, 2.0)], vec![110]),
    ]
}

/// The cube `[-half, half]` in every dimension.
pub fn cube(dimensions: usize, half: f64) -> Region {
    Region::new(vec![-half; dimensions], vec![half; dimensions])
}

pub async fn query_rows(db: &BoxDb, region: Region) -> BoxDbResult<Vec<QueryRow>> {
    db.query(region, QueryOptions::new()).await?.collect_rows().await
}

/// A trace sink recording every event it receives.
pub fn trace_collector() -> (TraceSink, Arc<Mutex<Vec<TraceEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let trace = TraceSink::new(move |event| sink.lock().push(event));
    (trace, events)
}

/// A point with scalar coordinates uniform in `[-spread, spread)`.
pub fn random_point<R: Rng>(rng: &mut R, dimensions: usize, spread: f64) -> Point {
    let coords: Vec<f64> = (0..dimensions)
        .map(|_| rng.gen_range(-spread..spread))
        .collect();
    Point::from_scalars(&coords)
}

pub fn random_value<R: Rng>(rng: &mut R, max_len: usize) -> Vec<u8> {
    let len = rng.gen_range(1..=max_len);
    (0..len).map(|_| rng.gen()).collect()
}

/// Whether `point` falls inside `region`, evaluated coordinate by coordinate.
pub fn expect_intersect(point: &Point, region: &Region) -> bool {
    point.coords().iter().enumerate().all(|(i, coord)| {
        let (lo, hi) = (region.lo()[i], region.hi()[i]);
        match coord {
            Coord::Scalar(x) => *x >= lo && *x <= hi,
            Coord::Range(a, b) => !(*a > hi || *b < lo),
        }
    })
}

/// Values of `rows`, sorted, for order-insensitive comparison.
pub fn sorted_values(rows: &[QueryRow]) -> Vec<Vec<u8>> {
    let mut values: Vec<Vec<u8>> = rows.iter().map(|row| row.value.clone()).collect();
    values.sort();
    values
}
