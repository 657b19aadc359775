use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::errors::ErrorKind;
use boxdb::point;
use boxdb::record::Location;
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{cleanup, create_test_context};

fn missing_delete() -> BatchOperation {
    BatchOperation::delete_by_id(point![1.0, 2.0], vec![1u8, 2, 3, 4])
}

#[tokio::test]
async fn test_error_if_missing_default() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let err = ctx
        .db()
        .batch(&[missing_delete()], BatchOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DeleteTargetNotFound);

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_error_if_missing_true() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let options = BatchOptions::new().error_if_missing(true);
    let err = ctx
        .db()
        .batch(&[missing_delete()], options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DeleteTargetNotFound);

    let by_location = BatchOperation::delete_at(Location::new(0, 99));
    let err = ctx.db().batch(&[by_location], options).await.unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::DeleteTargetNotFound);

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_error_if_missing_false() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let options = BatchOptions::new().error_if_missing(false);
    ctx.db().batch(&[missing_delete()], options).await.unwrap();
    ctx.db()
        .batch(&[BatchOperation::delete_at(Location::new(3, 3))], options)
        .await
        .unwrap();

    cleanup(ctx).unwrap();
}
