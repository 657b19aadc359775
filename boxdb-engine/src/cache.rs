//! LRU cache of committed nodes.
//!
//! Only committed nodes enter the cache; staged nodes of an in-flight batch
//! live in the store's overlay until the batch commits.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::types::{Node, NodeId};

pub struct NodeCache {
    pages: LruCache<NodeId, Node>,
    hits: u64,
    misses: u64,
}

impl NodeCache {
    pub fn new(max_pages: usize) -> Self {
        let capacity = NonZeroUsize::new(max_pages).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Looks up a node, updating recency and hit counters.
    pub fn get(&mut self, node_id: NodeId) -> Option<Node> {
        match self.pages.get(&node_id) {
            Some(node) => {
                self.hits += 1;
                Some(node.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, node_id: NodeId, node: Node) {
        self.pages.put(node_id, node);
    }

    pub fn remove(&mut self, node_id: NodeId) {
        self.pages.pop(&node_id);
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.pages.contains(&node_id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}
