use boxdb::batch::{BatchOperation, BatchOptions};
use boxdb::point;
use boxdb::query::{QueryOptions, TraceSink};
use boxdb::record::TraceEvent;
use boxdb_engine::layout::tree_file;
use boxdb_engine::EngineManifest;
use boxdb_int_test::test_util::{
    cleanup, create_test_context, cube, sample_records, trace_collector,
};

#[tokio::test]
async fn test_trace_single_root() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();
    db.batch(&sample_records(), BatchOptions::default())
        .await
        .unwrap();

    let (trace, events) = trace_collector();
    let rows = db
        .query(cube(2, 10.0), QueryOptions::new().trace_sink(trace))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(rows.len(), 4);

    let events = events.lock();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].node_id, 0);
    assert_eq!(events[0].file_path, "t/00/00/00/00/00/00/00/00");
    assert_eq!(events[0].bbox.to_flat(), vec![-20.0, -15.0, 12.0, 4.0]);

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_trace_is_reproducible() {
    let manifest = EngineManifest::new(2).branch_factor(4).max_records(4);
    let ctx = create_test_context(manifest).await.unwrap();
    let db = ctx.db();
    let ops: Vec<BatchOperation> = (0..200)
        .map(|i| {
            let x = ((i * 37) % 101) as f64 - 50.0;
            let y = ((i * 53) % 97) as f64 - 48.0;
            BatchOperation::insert(point![x, y], vec![(i % 256) as u8])
        })
        .collect();
    db.batch(&ops, BatchOptions::default()).await.unwrap();

    let mut runs: Vec<Vec<TraceEvent>> = vec![];
    for _ in 0..2 {
        let (trace, events) = trace_collector();
        db.query(cube(2, 12.0), QueryOptions::new().trace_sink(trace))
            .await
            .unwrap()
            .collect_rows()
            .await
            .unwrap();
        let events = events.lock().clone();
        runs.push(events);
    }
    assert!(runs[0].len() > 1);
    assert_eq!(runs[0], runs[1]);

    // the same state opened again traces identically
    let reopened = ctx.reopen().await.unwrap();
    let (trace, events) = trace_collector();
    reopened
        .query(cube(2, 12.0), QueryOptions::new().trace_sink(trace))
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();
    assert_eq!(*events.lock(), runs[0]);

    for event in &runs[0] {
        assert_eq!(event.file_path, tree_file(event.node_id));
    }

    cleanup(ctx).unwrap();
}

#[tokio::test]
async fn test_trace_over_channel() {
    let ctx = create_test_context(EngineManifest::new(2)).await.unwrap();
    let db = ctx.db();
    db.batch(&sample_records(), BatchOptions::default())
        .await
        .unwrap();

    let (sender, receiver) = crossbeam_channel::unbounded::<TraceEvent>();
    let options = QueryOptions::new().trace_sink(TraceSink::from_sender(sender));
    db.query(cube(2, 1.0), options)
        .await
        .unwrap()
        .collect_rows()
        .await
        .unwrap();

    let events: Vec<TraceEvent> = receiver.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].node_id, 0);

    cleanup(ctx).unwrap();
}
