//! Bounding-box queries and their result stream.

use crossbeam_channel::Sender;
use futures::Stream;
use std::sync::Arc;

use crate::engine::{EngineInstance, QueryCursor};
use crate::errors::BoxDbResult;
use crate::record::{QueryRow, TraceEvent};

pub(crate) type SharedEngine = Arc<tokio::sync::Mutex<Box<dyn EngineInstance>>>;

/// Receives one [`TraceEvent`] per engine node visited during a query.
#[derive(Clone)]
pub struct TraceSink {
    inner: Arc<dyn Fn(TraceEvent) + Send + Sync>,
}

impl TraceSink {
    pub fn new<F>(f: F) -> TraceSink
    where
        F: Fn(TraceEvent) + Send + Sync + 'static,
    {
        TraceSink { inner: Arc::new(f) }
    }

    /// Forwards events into a channel; events are dropped once the receiver is gone.
    pub fn from_sender(sender: Sender<TraceEvent>) -> TraceSink {
        TraceSink::new(move |event| {
            if let Err(e) = sender.try_send(event) {
                log::warn!("Dropping trace event: {}", e);
            }
        })
    }

    pub fn emit(&self, event: TraceEvent) {
        (self.inner)(event)
    }
}

impl From<Sender<TraceEvent>> for TraceSink {
    fn from(sender: Sender<TraceEvent>) -> Self {
        TraceSink::from_sender(sender)
    }
}

/// Options for a query.
#[derive(Clone, Default)]
pub struct QueryOptions {
    pub trace: Option<TraceSink>,
}

impl QueryOptions {
    pub fn new() -> QueryOptions {
        QueryOptions::default()
    }

    pub fn trace<F>(mut self, f: F) -> QueryOptions
    where
        F: Fn(TraceEvent) + Send + Sync + 'static,
    {
        self.trace = Some(TraceSink::new(f));
        self
    }

    pub fn trace_sink(mut self, sink: impl Into<TraceSink>) -> QueryOptions {
        self.trace = Some(sink.into());
        self
    }
}

/// Lazy, finite, single-pass sequence of query results.
///
/// Each step waits its turn on the instance's operation queue. Once the
/// results are exhausted, or a step fails, the stream is finished and keeps
/// returning `None`; a new query must be issued to iterate again.
pub struct QueryStream {
    cursor: Option<Box<dyn QueryCursor>>,
    engine: SharedEngine,
}

impl QueryStream {
    pub(crate) fn new(cursor: Box<dyn QueryCursor>, engine: SharedEngine) -> QueryStream {
        QueryStream {
            cursor: Some(cursor),
            engine,
        }
    }

    /// Produces the next matching record.
    pub async fn next(&mut self) -> BoxDbResult<Option<QueryRow>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        let result = {
            let _turn = self.engine.lock().await;
            cursor.next().await
        };
        match result {
            Ok(Some(row)) => Ok(Some(row)),
            Ok(None) => {
                self.cursor = None;
                Ok(None)
            }
            Err(e) => {
                self.cursor = None;
                Err(e)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.cursor.is_none()
    }

    /// Drains the remaining results.
    pub async fn collect_rows(mut self) -> BoxDbResult<Vec<QueryRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn into_stream(self) -> impl Stream<Item = BoxDbResult<QueryRow>> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next().await {
                Ok(Some(row)) => Some((Ok(row), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        })
    }
}
