//! Node storage with batch staging.
//!
//! Nodes are read lazily, one storage file per node, through the host's
//! storage adapter and kept in an LRU cache once committed. While a batch is
//! in flight every node write, node release and header change goes to a
//! staging overlay; reads see the overlay first. `discard` drops the overlay,
//! leaving committed state untouched.
//!
//! `commit` never overwrites a page the committed `meta` file can reach. A
//! changed node that is already durable is written under a fresh id and its
//! parent (or the root pointer) is relinked to the copy, so the single write
//! of `meta` is the commit point. Until the first commit a tree has no `meta`
//! and its root is an implicit empty leaf.

use boxdb::storage::StorageAdapter;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::NodeCache;
use crate::constants::{INITIAL_ROOT, META_FILE};
use crate::errors::{EngineError, EngineResult};
use crate::layout::tree_file;
use crate::types::{
    decode_frame, decode_payload, encode_page, MetaHeader, Node, NodeId, PageTreeStats,
    PAGE_FRAME_LEN,
};

#[derive(Default)]
struct Staging {
    active: bool,
    header: Option<MetaHeader>,
    /// `None` marks a node released by the batch
    nodes: BTreeMap<NodeId, Option<Node>>,
}

#[derive(Clone)]
pub struct NodeStore {
    inner: Arc<NodeStoreInner>,
}

struct NodeStoreInner {
    storage: StorageAdapter,
    dimensions: usize,
    cache: Mutex<NodeCache>,
    header: RwLock<MetaHeader>,
    staging: Mutex<Staging>,
    opened: AtomicBool,
    /// Whether a `meta` file has been written for this tree
    persisted: AtomicBool,
    /// Bumped by every commit that changed the tree
    generation: AtomicU64,
    storage_reads: AtomicU64,
    storage_writes: AtomicU64,
}

impl NodeStore {
    pub fn new(storage: StorageAdapter, dimensions: usize, cache_pages: usize) -> Self {
        NodeStore {
            inner: Arc::new(NodeStoreInner {
                storage,
                dimensions,
                cache: Mutex::new(NodeCache::new(cache_pages)),
                header: RwLock::new(MetaHeader::new(dimensions)),
                staging: Mutex::new(Staging::default()),
                opened: AtomicBool::new(false),
                persisted: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                storage_reads: AtomicU64::new(0),
                storage_writes: AtomicU64::new(0),
            }),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.inner.dimensions
    }

    /// Loads the `meta` file, or starts an empty tree when it has no content.
    ///
    /// Runs once; later calls return immediately. An empty tree writes
    /// nothing until its first commit.
    pub async fn open(&self) -> EngineResult<()> {
        if self.inner.opened.load(Ordering::Acquire) {
            return Ok(());
        }
        let meta = self.inner.storage.open(META_FILE)?;
        if meta.len().await? == 0 {
            log::debug!(
                "Starting empty {}-dimensional tree",
                self.inner.dimensions
            );
            *self.inner.header.write() = MetaHeader::new(self.inner.dimensions);
            self.inner.persisted.store(false, Ordering::Release);
        } else {
            let header: MetaHeader = self.read_page(META_FILE).await?;
            header.validate()?;
            if header.dimensions as usize != self.inner.dimensions {
                return Err(EngineError::DimensionMismatch {
                    expected: self.inner.dimensions,
                    found: header.dimensions as usize,
                });
            }
            log::debug!(
                "Opened tree with {} entries, height {}",
                header.entry_count,
                header.height
            );
            *self.inner.header.write() = header;
            self.inner.persisted.store(true, Ordering::Release);
        }
        self.inner.opened.store(true, Ordering::Release);
        Ok(())
    }

    /// The staged header during a batch, the committed header otherwise.
    pub fn header(&self) -> MetaHeader {
        let staged = self.inner.staging.lock().header.clone();
        match staged {
            Some(header) => header,
            None => self.inner.header.read().clone(),
        }
    }

    pub fn set_header(&self, header: MetaHeader) -> EngineResult<()> {
        let mut staging = self.inner.staging.lock();
        if !staging.active {
            return Err(EngineError::InvalidOperation(
                "header change outside of a batch".into(),
            ));
        }
        staging.header = Some(header);
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// Starts staging a batch.
    pub fn begin(&self) {
        let committed = self.inner.header.read().clone();
        let mut staging = self.inner.staging.lock();
        staging.active = true;
        staging.header = Some(committed);
        staging.nodes.clear();
    }

    /// Drops everything staged since `begin`.
    pub fn discard(&self) {
        let mut staging = self.inner.staging.lock();
        let dropped = staging.nodes.len();
        *staging = Staging::default();
        log::debug!("Discarded {} staged nodes", dropped);
    }

    /// Reserves a fresh node id.
    pub fn allocate(&self) -> EngineResult<NodeId> {
        let mut header = self.header();
        let node_id = header.next_node_id;
        header.next_node_id += 1;
        header.node_count += 1;
        self.set_header(header)?;
        Ok(node_id)
    }

    /// Stages a node write.
    pub fn put(&self, node_id: NodeId, node: Node) -> EngineResult<()> {
        let mut staging = self.inner.staging.lock();
        if !staging.active {
            return Err(EngineError::InvalidOperation(
                "node write outside of a batch".into(),
            ));
        }
        staging.nodes.insert(node_id, Some(node));
        Ok(())
    }

    /// Stages the release of a node and its storage file.
    pub fn release(&self, node_id: NodeId) -> EngineResult<()> {
        {
            let mut staging = self.inner.staging.lock();
            if !staging.active {
                return Err(EngineError::InvalidOperation(
                    "node release outside of a batch".into(),
                ));
            }
            staging.nodes.insert(node_id, None);
        }
        let mut header = self.header();
        header.node_count = header.node_count.saturating_sub(1);
        self.set_header(header)
    }

    /// Reads a node: staged overlay first, then the cache, then storage.
    pub async fn load(&self, node_id: NodeId) -> EngineResult<Node> {
        match self.try_load(node_id).await? {
            Some(node) => Ok(node),
            None => Err(EngineError::Corrupted(format!(
                "node {} is missing from {}",
                node_id,
                tree_file(node_id)
            ))),
        }
    }

    /// Like [`NodeStore::load`], but `None` when the node was released or its
    /// file holds no page.
    pub async fn try_load(&self, node_id: NodeId) -> EngineResult<Option<Node>> {
        let staged = self.inner.staging.lock().nodes.get(&node_id).cloned();
        if let Some(node) = staged {
            return Ok(node);
        }
        if node_id >= self.header().next_node_id {
            return Ok(None);
        }
        if node_id == INITIAL_ROOT && !self.inner.persisted.load(Ordering::Acquire) {
            // whatever a failed first commit left in this file is not part of the tree
            return Ok(Some(Node::empty_leaf()));
        }
        let cached = self.inner.cache.lock().get(node_id);
        if let Some(node) = cached {
            return Ok(Some(node));
        }

        let name = tree_file(node_id);
        let handle = self.inner.storage.open(&name)?;
        if handle.len().await? < PAGE_FRAME_LEN {
            return Ok(None);
        }
        let node: Node = self.read_page(&name).await?;
        self.inner.cache.lock().put(node_id, node.clone());
        Ok(Some(node))
    }

    /// Writes the staged batch out and makes it the committed state.
    ///
    /// On error nothing the committed `meta` reaches has been touched, and the
    /// in-memory state still describes the committed tree.
    pub async fn commit(&self) -> EngineResult<()> {
        let staging = std::mem::take(&mut *self.inner.staging.lock());
        let Some(mut header) = staging.header else {
            return Ok(());
        };
        let committed = self.inner.header.read().clone();
        if staging.nodes.is_empty() && header == committed {
            return Ok(());
        }
        let persisted = self.inner.persisted.load(Ordering::Acquire);
        // pages below this id are reachable from the committed meta
        let durable_limit = if persisted { committed.next_node_id } else { 0 };

        let mut nodes = staging.nodes;
        if !persisted {
            nodes
                .entry(INITIAL_ROOT)
                .or_insert_with(|| Some(Node::empty_leaf()));
        }

        let mut copies: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (node_id, node) in &nodes {
            if node.is_some() && *node_id < durable_limit {
                copies.insert(*node_id, header.next_node_id);
                header.next_node_id += 1;
            }
        }

        let mut relinked = BTreeSet::new();
        let mut pages = Vec::with_capacity(nodes.len());
        let mut obsolete = Vec::new();
        for (node_id, node) in nodes {
            match node {
                Some(mut node) => {
                    if let Node::Internal { children, .. } = &mut node {
                        for child in children.iter_mut() {
                            if let Some(&copy) = copies.get(&child.node_id) {
                                relinked.insert(child.node_id);
                                child.node_id = copy;
                            }
                        }
                    }
                    match copies.get(&node_id) {
                        Some(&copy) => {
                            obsolete.push(node_id);
                            pages.push((copy, node));
                        }
                        None => pages.push((node_id, node)),
                    }
                }
                None if node_id < durable_limit => obsolete.push(node_id),
                // allocated and released within the batch, never written
                None => {}
            }
        }
        if let Some(&copy) = copies.get(&header.root) {
            relinked.insert(header.root);
            header.root = copy;
        }
        if let Some(orphan) = copies.keys().find(|id| !relinked.contains(*id)) {
            return Err(EngineError::Corrupted(format!(
                "node {} changed without its parent",
                orphan
            )));
        }

        for (node_id, node) in &pages {
            self.write_page(&tree_file(*node_id), &encode_page(node)?).await?;
        }
        self.write_page(META_FILE, &encode_page(&header)?).await?;
        log::trace!(
            "Committed {} pages ({} copied), root {}",
            pages.len(),
            copies.len(),
            header.root
        );

        {
            let mut cache = self.inner.cache.lock();
            for node_id in &obsolete {
                cache.remove(*node_id);
            }
            for (node_id, node) in pages {
                cache.put(node_id, node);
            }
        }
        *self.inner.header.write() = header;
        self.inner.persisted.store(true, Ordering::Release);
        self.inner.generation.fetch_add(1, Ordering::AcqRel);

        // the batch is committed; a page left behind here is unreachable
        for node_id in obsolete {
            if let Err(err) = self.remove_file(node_id).await {
                log::warn!("Could not remove freed page {}: {}", tree_file(node_id), err);
            }
        }
        Ok(())
    }

    pub async fn sync(&self) -> EngineResult<()> {
        self.inner.storage.sync_all().await?;
        Ok(())
    }

    pub fn stats(&self) -> PageTreeStats {
        let header = self.inner.header.read().clone();
        let cache = self.inner.cache.lock();
        PageTreeStats {
            entries: header.entry_count,
            height: header.height,
            nodes: header.node_count,
            cached_pages: cache.len() as u64,
            cache_hits: cache.hits(),
            cache_misses: cache.misses(),
            storage_reads: self.inner.storage_reads.load(Ordering::Relaxed),
            storage_writes: self.inner.storage_writes.load(Ordering::Relaxed),
        }
    }

    async fn remove_file(&self, node_id: NodeId) -> EngineResult<()> {
        let name = tree_file(node_id);
        let handle = self.inner.storage.open(&name)?;
        let ops = handle.bound_ops();
        if ops.delete {
            self.inner.storage.delete(&name).await?;
        } else if ops.truncate {
            handle.truncate(0).await?;
        } else {
            // node ids are never reused and nothing links to the stale page
            log::debug!("Storage cannot delete or truncate; leaving {} in place", name);
        }
        Ok(())
    }

    async fn read_page<T: serde::de::DeserializeOwned>(&self, name: &str) -> EngineResult<T> {
        let handle = self.inner.storage.open(name)?;
        let frame = handle.read(0, PAGE_FRAME_LEN).await?;
        let (len, crc) = decode_frame(&frame)?;
        let payload = handle.read(PAGE_FRAME_LEN, len as u64).await?;
        self.inner.storage_reads.fetch_add(1, Ordering::Relaxed);
        decode_payload(&payload, crc)
    }

    async fn write_page(&self, name: &str, page: &[u8]) -> EngineResult<()> {
        let handle = self.inner.storage.open(name)?;
        handle.write(0, page).await?;
        self.inner.storage_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
