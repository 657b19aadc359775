use async_trait::async_trait;
use boxdb::engine::QueryCursor;
use boxdb::errors::BoxDbResult;
use boxdb::point::Region;
use boxdb::query::TraceSink;
use boxdb::record::{Location, QueryRow, TraceEvent};
use std::collections::VecDeque;

use crate::errors::EngineError;
use crate::layout::tree_file;
use crate::store::NodeStore;
use crate::types::{Node, NodeId};

/// Lazy depth-first walk over the nodes intersecting a query region.
///
/// Nodes are loaded one at a time as results are pulled. Each loaded node is
/// reported to the trace sink before any of its records are yielded.
pub struct PageTreeCursor {
    store: NodeStore,
    region: Region,
    trace: Option<TraceSink>,
    generation: u64,
    stack: Vec<NodeId>,
    pending: VecDeque<QueryRow>,
}

impl PageTreeCursor {
    /// Starts at the committed root. The store must already be open.
    pub fn new(store: NodeStore, region: Region, trace: Option<TraceSink>) -> PageTreeCursor {
        let root = store.header().root;
        let generation = store.generation();
        PageTreeCursor {
            store,
            region,
            trace,
            generation,
            stack: vec![root],
            pending: VecDeque::new(),
        }
    }

    async fn visit(&mut self, node_id: NodeId) -> BoxDbResult<()> {
        if self.store.generation() != self.generation {
            return Err(EngineError::InvalidOperation(
                "stale query: the tree changed since the query started".into(),
            )
            .into());
        }

        let node = self.store.load(node_id).await?;
        if let Some(trace) = &self.trace {
            trace.emit(TraceEvent {
                node_id,
                file_path: tree_file(node_id),
                bbox: node.compute_bbox(self.store.dimensions()),
            });
        }

        match node {
            Node::Leaf { entries } => {
                for entry in entries {
                    if entry.point.intersects(&self.region) {
                        self.pending.push_back(QueryRow {
                            point: entry.point,
                            value: entry.value,
                            location: Location::new(node_id, entry.seq),
                        });
                    }
                }
            }
            Node::Internal { children, .. } => {
                // reversed so the first child is popped first
                for child in children.iter().rev() {
                    if child.bbox.intersects(&self.region) {
                        self.stack.push(child.node_id);
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueryCursor for PageTreeCursor {
    async fn next(&mut self) -> BoxDbResult<Option<QueryRow>> {
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            match self.stack.pop() {
                Some(node_id) => self.visit(node_id).await?,
                None => return Ok(None),
            }
        }
    }
}
