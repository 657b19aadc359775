use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::errors::ErrorKind;
use boxdb::point;
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{
    cleanup, create_test_context, cube, query_rows, sample_records, sorted_values,
};

#[tokio::test]
async fn test_failed_batch_leaves_committed_state() {
    let manifest = EngineManifest::new(2).branch_factor(4).max_records(4);
    let ctx = create_test_context(manifest).await.unwrap();
    let db = ctx.db();
    db.batch(&sample_records(), BatchOptions::default())
        .await
        .unwrap();
    let before = sorted_values(&query_rows(&db, cube(2, 100.0)).await.unwrap());

    // enough inserts to split nodes before the missing delete aborts the batch
    let mut ops: Vec<BatchOperation> = (0..20)
        .map(|i| BatchOperation::insert(point![i as f64, i as f64], vec![200, i as u8]))
        .collect();
    ops.push(BatchOperation::delete_by_id(point![1.0, 2.0], vec![0xffu8]));
    let err = db.batch(&ops, BatchOptions::default()).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DeleteTargetNotFound);

    let after = sorted_values(&query_rows(&db, cube(2, 100.0)).await.unwrap());
    assert_eq!(after, before);

    // a re-opened database sees the same committed state
    let reopened = ctx.reopen().await.unwrap();
    let persisted = sorted_values(&query_rows(&reopened, cube(2, 100.0)).await.unwrap());
    assert_eq!(persisted, before);

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_operations_apply_in_order() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();

    // default identities are the big-endian record sequence numbers
    let ops = vec![
        BatchOperation::insert(point![1.0, 1.0], vec![1]),
        BatchOperation::delete_by_id(point![1.0, 1.0], 0u64.to_be_bytes().to_vec()),
        BatchOperation::insert(point![1.0, 1.0], vec![2]),
    ];
    db.batch(&ops, BatchOptions::default()).await.unwrap();

    let rows = query_rows(&db, cube(2, 10.0)).await.unwrap();
    assert_eq!(sorted_values(&rows), vec![vec![2]]);

    // deleting before inserting fails the whole batch
    let reversed = vec![
        BatchOperation::delete_by_id(point![5.0, 5.0], 2u64.to_be_bytes().to_vec()),
        BatchOperation::insert(point![5.0, 5.0], vec![3]),
    ];
    assert!(db.batch(&reversed, BatchOptions::default()).await.is_err());
    assert_eq!(query_rows(&db, cube(2, 10.0)).await.unwrap().len(), 1);

    cleanup(ctx).unwrap();
}
