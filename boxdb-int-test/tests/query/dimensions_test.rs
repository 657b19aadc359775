use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::point::{Coord, Point};
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{
    cleanup, create_test_context, cube, expect_intersect, query_rows, random_point,
    random_value, sorted_values,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[tokio::test]
async fn test_dimension_sweep() {
    let mut rng = StdRng::seed_from_u64(0xb0c5);
    for dims in 2..=8 {
        let ctx = create_test_context(EngineManifest::new(dims)).await.unwrap();
        let db = ctx.db();
        assert_eq!(db.dimensions(), dims);

        let batch: Vec<BatchOperation> = (0..1000)
            .map(|_| {
                BatchOperation::insert(random_point(&mut rng, dims, 15.0), random_value(&mut rng, 10))
            })
            .collect();
        db.batch(&batch, BatchOptions::default()).await.unwrap();

        let region = cube(dims, 10.0);
        let rows = query_rows(&db, region.clone()).await.unwrap();

        let mut expected: Vec<Vec<u8>> = batch
            .iter()
            .filter_map(|op| match op {
                BatchOperation::Insert { point, value } if expect_intersect(point, &region) => {
                    Some(value.clone())
                }
                _ => None,
            })
            .collect();
        expected.sort();
        assert_eq!(sorted_values(&rows), expected, "{} dimensions", dims);
        assert!(rows.iter().all(|row| row.point.dimensions() == dims));

        cleanup(ctx).unwrap();
    }
}

#[tokio::test]
async fn test_ranges_in_high_dimensions() {
    let mut rng = StdRng::seed_from_u64(7);
    let dims = 5;
    let ctx = create_test_context(EngineManifest::new(dims).max_records(16))
        .await
        .unwrap();
    let db = ctx.db();

    let batch: Vec<BatchOperation> = (0..300u32)
        .map(|i| {
            let coords: Vec<Coord> = (0..dims)
                .map(|d| {
                    let lo: f64 = rng.gen_range(-20.0..20.0);
                    if (i as usize + d) % 3 == 0 {
                        Coord::range(lo, lo + rng.gen_range(0.0..8.0))
                    } else {
                        Coord::Scalar(lo)
                    }
                })
                .collect();
            BatchOperation::insert(Point::new(coords), i.to_be_bytes().to_vec())
        })
        .collect();
    db.batch(&batch, BatchOptions::default()).await.unwrap();

    let region = cube(dims, 12.0);
    let rows = query_rows(&db, region.clone()).await.unwrap();
    let expected = batch
        .iter()
        .filter(|op| matches!(op, BatchOperation::Insert { point, .. } if expect_intersect(point, &region)))
        .count();
    assert_eq!(rows.len(), expected);

    cleanup(ctx).unwrap();
}
