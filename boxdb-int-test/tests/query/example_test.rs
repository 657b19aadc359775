use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::errors::ErrorKind;
use boxdb::point::Region;
use boxdb::query::QueryOptions;
use boxdb::point;
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{
    cleanup, create_test_context, cube, query_rows, sample_records, sorted_values,
};
use futures::TryStreamExt;

#[tokio::test]
async fn test_2d_mixed_points() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();
    db.batch(&sample_records(), BatchOptions::default())
        .await
        .unwrap();

    let rows = query_rows(&db, cube(2, 10.0)).await.unwrap();
    assert_eq!(
        sorted_values(&rows),
        vec![
            vec![97, 98, 99],
            vec![100, 101],
            vec![102, 103, 104],
            vec![107, 108, 109],
        ]
    );
    let boxed = rows.iter().find(|r| r.value == vec![107, 108, 109]).unwrap();
    assert_eq!(boxed.point, point![(5.0, 12.0), (-15.0, -3.0)]);

    cleanup(ctx).unwrap();
}

fn overlapping_sample_values() -> Vec<Vec<u8>> {
    vec![
        vec![97, 98, 99],
        vec![100, 101],
        vec![102, 103, 104],
        vec![107, 108, 109],
    ]
}

#[tokio::test]
async fn test_2d_result_independent_of_insert_order() {
    let records = sample_records();
    let orders: Vec<Vec<usize>> = vec![
        (0..6).collect(),
        (0..6).rev().collect(),
        vec![3, 0, 5, 1, 4, 2],
        vec![5, 2, 4, 0, 3, 1],
    ];
    let manifests = vec![
        EngineManifest::new(2),
        EngineManifest::new(2).branch_factor(2).max_records(2),
        EngineManifest::new(2).branch_factor(3).max_records(2),
    ];

    for manifest in manifests {
        for order in &orders {
            let ops: Vec<BatchOperation> = order.iter().map(|&i| records[i].clone()).collect();

            // all at once
            let ctx = create_test_context(manifest).await.unwrap();
            ctx.db().batch(&ops, BatchOptions::default()).await.unwrap();
            let rows = query_rows(&ctx.db(), cube(2, 10.0)).await.unwrap();
            assert_eq!(sorted_values(&rows), overlapping_sample_values(), "order {:?}", order);
            cleanup(ctx).unwrap();

            // one batch per record
            let ctx = create_test_context(manifest).await.unwrap();
            for op in &ops {
                ctx.db()
                    .batch(std::slice::from_ref(op), BatchOptions::default())
                    .await
                    .unwrap();
            }
            let rows = query_rows(&ctx.db(), cube(2, 10.0)).await.unwrap();
            assert_eq!(sorted_values(&rows), overlapping_sample_values(), "order {:?}", order);
            cleanup(ctx).unwrap();
        }
    }
}

#[tokio::test]
async fn test_query_as_stream() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();
    db.batch(&sample_records(), BatchOptions::default())
        .await
        .unwrap();

    let region = Region::from_flat(&[0.0, -20.0, 20.0, 0.0]).unwrap();
    let rows: Vec<_> = db
        .query(region, QueryOptions::new())
        .await
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(
        sorted_values(&rows),
        vec![vec![102, 103, 104], vec![105, 106], vec![107, 108, 109]]
    );

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_empty_database_query() {
    let ctx = create_test_context(EngineManifest::new(3)).await.unwrap();
    let mut stream = ctx
        .db()
        .query(cube(3, 100.0), QueryOptions::new())
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_none());
    assert!(stream.is_finished());
    // exhausted streams stay exhausted
    assert!(stream.next().await.unwrap().is_none());

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_wrong_region_dimensions() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let err = ctx
        .db()
        .query(cube(3, 10.0), QueryOptions::new())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::MalformedInput);

    let inverted = Region::new(vec![5.0, 0.0], vec![-5.0, 1.0]);
    let err = ctx
        .db()
        .query(inverted, QueryOptions::new())
        .await
        .err()
        .unwrap();
    assert_eq!(err.kind(), &ErrorKind::MalformedInput);

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_malformed_batch_has_no_effect() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();
    let ops = vec![
        BatchOperation::insert(point![1.0, 1.0], vec![1]),
        BatchOperation::insert(point![1.0, 1.0, 1.0], vec![2]),
    ];
    let err = db.batch(&ops, BatchOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MalformedInput);
    assert!(query_rows(&db, cube(2, 10.0)).await.unwrap().is_empty());

    cleanup(ctx).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_from_clones() {
    let ctx = create_test_context(EngineManifest::new(2).max_records(8))
        .await
        .unwrap();

    let mut handles = vec![];
    for task in 0..8u8 {
        let db = ctx.db();
        handles.push(tokio::spawn(async move {
            for i in 0..10u8 {
                let op = BatchOperation::insert(point![task as f64, i as f64], vec![task, i]);
                db.batch(&[op], BatchOptions::default()).await?;
            }
            Ok::<_, boxdb::errors::BoxDbError>(())
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let rows = query_rows(&ctx.db(), cube(2, 100.0)).await.unwrap();
    assert_eq!(rows.len(), 80);

    cleanup(ctx).unwrap();
}
