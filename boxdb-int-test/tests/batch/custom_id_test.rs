use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{
    cleanup, create_test_context_with, cube, expect_intersect, query_rows, random_point,
    sorted_values,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn get_id(value: &[u8]) -> Vec<u8> {
    value[4..6].to_vec()
}

#[tokio::test]
async fn test_delete_with_custom_ids() {
    let ctx = create_test_context_with(EngineManifest::new(2), |builder| {
        builder.id_extractor(get_id)
    })
    .await
    .unwrap();
    let db = ctx.db();

    let mut rng = StdRng::seed_from_u64(1000);
    let insert_batch: Vec<BatchOperation> = (0..1000usize)
        .map(|i| {
            let mut value: Vec<u8> = (0..10).map(|_| rng.gen()).collect();
            value[4] = (i % 256) as u8;
            value[5] = (i / 256) as u8;
            BatchOperation::insert(random_point(&mut rng, 2, 15.0), value)
        })
        .collect();
    db.batch(&insert_batch, BatchOptions::default()).await.unwrap();

    let region = cube(2, 10.0);
    let before = query_rows(&db, region.clone()).await.unwrap();
    let mut expected: Vec<Vec<u8>> = insert_batch
        .iter()
        .filter_map(|op| match op {
            BatchOperation::Insert { point, value } if expect_intersect(point, &region) => {
                Some(value.clone())
            }
            _ => None,
        })
        .collect();
    expected.sort();
    assert_eq!(sorted_values(&before), expected);

    let delete_batch: Vec<BatchOperation> = before
        .iter()
        .step_by(5)
        .map(|row| BatchOperation::delete_by_id(row.point.clone(), get_id(&row.value)))
        .collect();
    db.batch(&delete_batch, BatchOptions::default()).await.unwrap();

    let after = query_rows(&db, region).await.unwrap();
    let survivors: Vec<_> = before
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 5 != 0)
        .map(|(_, row)| row.clone())
        .collect();
    assert_eq!(after.len(), survivors.len());
    // survivors keep every byte, identity bytes included
    assert_eq!(sorted_values(&after), sorted_values(&survivors));

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_identity_must_match_point() {
    let ctx = create_test_context_with(EngineManifest::new(2), |builder| {
        builder.id_extractor(|value: &[u8]| value[..1].to_vec())
    })
    .await
    .unwrap();
    let db = ctx.db();
    db.batch(
        &[BatchOperation::insert(boxdb::point![3.0, 4.0], vec![42, 1])],
        BatchOptions::default(),
    )
    .await
    .unwrap();

    // right id, wrong point
    let miss = BatchOperation::delete_by_id(boxdb::point![4.0, 3.0], vec![42u8]);
    assert!(db.batch(&[miss], BatchOptions::default()).await.is_err());

    let hit = BatchOperation::delete_by_id(boxdb::point![3.0, 4.0], vec![42u8]);
    db.batch(&[hit], BatchOptions::default()).await.unwrap();
    assert!(query_rows(&db, cube(2, 10.0)).await.unwrap().is_empty());

    cleanup(ctx).unwrap();
}
