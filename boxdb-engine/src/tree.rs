//! Page tree mutations.
//!
//! Every mutation runs inside a staged batch of the [`NodeStore`]: nodes are
//! loaded one at a time along the path they touch and written back to the
//! staging overlay, so nothing reaches storage until the batch commits.

use boxdb::batch::{BatchOperation, BatchOptions, DeleteTarget};
use boxdb::engine::IdExtractor;
use boxdb::point::{Point, Region};
use boxdb::record::Location;
use std::cmp::Ordering;

use crate::errors::{EngineError, EngineResult};
use crate::manifest::EngineManifest;
use crate::store::NodeStore;
use crate::types::{ChildRef, LeafEntry, Node, NodeId};

/// `(parent, child index)` pairs from the root down to a leaf
type Path = Vec<(NodeId, usize)>;

/// Outcome of an applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub inserted: usize,
    pub deleted: usize,
    /// Deletes whose target did not exist, skipped under `error_if_missing = false`
    pub skipped: usize,
}

/// A leaf entry located by a search, with the path that reaches it.
struct Found {
    path: Path,
    leaf: NodeId,
    index: usize,
}

#[derive(Clone)]
pub struct PageTree {
    store: NodeStore,
    manifest: EngineManifest,
}

impl PageTree {
    pub fn new(store: NodeStore, manifest: EngineManifest) -> PageTree {
        PageTree { store, manifest }
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn manifest(&self) -> &EngineManifest {
        &self.manifest
    }

    /// Applies `operations` in order as one unit.
    ///
    /// The staged state is committed only when every operation succeeded;
    /// any failure discards it and leaves the committed tree untouched.
    pub async fn apply(
        &self,
        operations: &[BatchOperation],
        options: &BatchOptions,
        id_extractor: Option<&IdExtractor>,
    ) -> EngineResult<BatchSummary> {
        self.store.open().await?;
        self.store.begin();
        let summary = match self.apply_staged(operations, options, id_extractor).await {
            Ok(summary) => summary,
            Err(err) => {
                self.store.discard();
                return Err(err);
            }
        };
        if let Err(err) = self.store.commit().await {
            self.store.discard();
            return Err(err);
        }
        Ok(summary)
    }

    async fn apply_staged(
        &self,
        operations: &[BatchOperation],
        options: &BatchOptions,
        id_extractor: Option<&IdExtractor>,
    ) -> EngineResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        for (index, op) in operations.iter().enumerate() {
            match op {
                BatchOperation::Insert { point, value } => {
                    let id = id_extractor.map(|extract| extract(value));
                    self.insert(point.clone(), value.clone(), id).await?;
                    summary.inserted += 1;
                }
                BatchOperation::Delete { target } => {
                    let removed = match target {
                        DeleteTarget::Identity { point, id } => {
                            self.delete_by_identity(point, id.as_bytes()).await?
                        }
                        DeleteTarget::Location(location) => self.delete_at(*location).await?,
                    };
                    if removed {
                        summary.deleted += 1;
                    } else if options.error_if_missing {
                        return Err(EngineError::DeleteTargetNotFound(format!(
                            "operation {} of batch: {}",
                            index,
                            describe_target(target)
                        )));
                    } else {
                        log::debug!("Skipping missing delete target {}", describe_target(target));
                        summary.skipped += 1;
                    }
                }
            }
        }
        Ok(summary)
    }

    /// Inserts one record, returning its sequence number.
    ///
    /// Without an explicit identity the record is identified by the
    /// big-endian bytes of its sequence number.
    pub async fn insert(
        &self,
        point: Point,
        value: Vec<u8>,
        id: Option<Vec<u8>>,
    ) -> EngineResult<u64> {
        let mut header = self.store.header();
        let seq = header.next_seq;
        header.next_seq += 1;
        header.entry_count += 1;
        self.store.set_header(header)?;

        let entry = LeafEntry {
            point,
            value,
            id: id.unwrap_or_else(|| seq.to_be_bytes().to_vec()),
            seq,
        };
        let bounds = entry.bounds();

        let mut path = Path::new();
        let leaf_id = self.choose_leaf(&bounds, &mut path).await?;
        match self.insert_into_leaf(leaf_id, entry).await? {
            Some((sibling, sibling_bbox)) => self.propagate_split(&path, sibling, sibling_bbox).await?,
            None => self.update_path_bboxes(&path).await?,
        }
        Ok(seq)
    }

    /// Removes the first record in depth-first order whose bounds equal
    /// those of `point` and whose identity is `id`.
    pub async fn delete_by_identity(&self, point: &Point, id: &[u8]) -> EngineResult<bool> {
        let bounds = point.bounds();
        let found = self
            .find_entry(Some(&bounds), |e| e.id == id && e.bounds() == bounds)
            .await?;
        match found {
            Some(found) => {
                self.remove_found(found).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the record a query reported at `location`.
    ///
    /// The node hint narrows the search to the record's bounds; when the
    /// record has moved since, the whole tree is scanned for its sequence
    /// number.
    pub async fn delete_at(&self, location: Location) -> EngineResult<bool> {
        let hinted = match self.store.try_load(location.node).await? {
            Some(Node::Leaf { entries }) => entries
                .iter()
                .find(|e| e.seq == location.seq)
                .map(LeafEntry::bounds),
            _ => None,
        };

        let mut found = None;
        if let Some(bounds) = &hinted {
            found = self
                .find_entry(Some(bounds), |e| e.seq == location.seq)
                .await?;
        }
        if found.is_none() {
            found = self.find_entry(None, |e| e.seq == location.seq).await?;
        }

        match found {
            Some(found) => {
                self.remove_found(found).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Descends from the root to the leaf best suited for `bounds`.
    async fn choose_leaf(&self, bounds: &Region, path: &mut Path) -> EngineResult<NodeId> {
        let mut node_id = self.store.header().root;
        loop {
            match self.store.load(node_id).await? {
                Node::Leaf { .. } => return Ok(node_id),
                Node::Internal { children, .. } => {
                    if children.is_empty() {
                        return Err(EngineError::Corrupted(format!(
                            "internal node {} has no children",
                            node_id
                        )));
                    }
                    let index = choose_subtree(&children, bounds);
                    path.push((node_id, index));
                    node_id = children[index].node_id;
                }
            }
        }
    }

    /// Adds `entry` to a leaf, splitting it when it overflows.
    async fn insert_into_leaf(
        &self,
        leaf_id: NodeId,
        entry: LeafEntry,
    ) -> EngineResult<Option<(NodeId, Region)>> {
        let dims = self.manifest.dimensions;
        let mut node = self.store.load(leaf_id).await?;
        let Node::Leaf { entries } = &mut node else {
            return Err(EngineError::InvalidOperation(
                "expected leaf node for insertion".into(),
            ));
        };

        entries.push(entry);
        if entries.len() <= self.manifest.max_records {
            self.store.put(leaf_id, node)?;
            return Ok(None);
        }

        let (keep, moved) = split_by_centre(std::mem::take(entries), LeafEntry::bounds, dims);
        *entries = keep;
        let sibling_id = self.store.allocate()?;
        let sibling = Node::Leaf { entries: moved };
        let sibling_bbox = sibling.compute_bbox(dims);
        log::trace!("Split leaf {} into {}", leaf_id, sibling_id);

        self.store.put(leaf_id, node)?;
        self.store.put(sibling_id, sibling)?;
        Ok(Some((sibling_id, sibling_bbox)))
    }

    /// Hooks a split-off sibling into its parent, splitting upwards as
    /// needed and growing a new root when the old root splits.
    async fn propagate_split(
        &self,
        path: &[(NodeId, usize)],
        mut sibling_id: NodeId,
        mut sibling_bbox: Region,
    ) -> EngineResult<()> {
        let dims = self.manifest.dimensions;
        for (depth, &(parent_id, child_idx)) in path.iter().enumerate().rev() {
            let mut parent = self.store.load(parent_id).await?;
            let Node::Internal { children, level } = &mut parent else {
                return Err(EngineError::Corrupted(format!(
                    "node {} on an insertion path is not internal",
                    parent_id
                )));
            };

            let child_id = children[child_idx].node_id;
            children[child_idx].bbox = self.store.load(child_id).await?.compute_bbox(dims);
            children.push(ChildRef {
                bbox: sibling_bbox.clone(),
                node_id: sibling_id,
            });

            if children.len() <= self.manifest.branch_factor {
                self.store.put(parent_id, parent)?;
                return self.update_path_bboxes(&path[..depth]).await;
            }

            let level = *level;
            let (keep, moved) =
                split_by_centre(std::mem::take(children), |c: &ChildRef| c.bbox.clone(), dims);
            *children = keep;
            sibling_id = self.store.allocate()?;
            let sibling = Node::Internal {
                children: moved,
                level,
            };
            sibling_bbox = sibling.compute_bbox(dims);
            log::trace!("Split internal node {} into {}", parent_id, sibling_id);

            self.store.put(parent_id, parent)?;
            self.store.put(sibling_id, sibling)?;
        }

        // the root itself split
        let old_root = self.store.header().root;
        let old_root_bbox = self.store.load(old_root).await?.compute_bbox(dims);
        let root_id = self.store.allocate()?;

        let mut header = self.store.header();
        let root = Node::Internal {
            children: vec![
                ChildRef {
                    bbox: old_root_bbox,
                    node_id: old_root,
                },
                ChildRef {
                    bbox: sibling_bbox,
                    node_id: sibling_id,
                },
            ],
            level: header.height,
        };
        self.store.put(root_id, root)?;
        header.root = root_id;
        header.height += 1;
        log::debug!("Tree grew to height {} with root {}", header.height, root_id);
        self.store.set_header(header)
    }

    /// Recomputes the child boxes along `path`, bottom-up.
    async fn update_path_bboxes(&self, path: &[(NodeId, usize)]) -> EngineResult<()> {
        let dims = self.manifest.dimensions;
        for &(parent_id, child_idx) in path.iter().rev() {
            let mut parent = self.store.load(parent_id).await?;
            if let Node::Internal { children, .. } = &mut parent {
                let child_id = children[child_idx].node_id;
                children[child_idx].bbox = self.store.load(child_id).await?.compute_bbox(dims);
            }
            self.store.put(parent_id, parent)?;
        }
        Ok(())
    }

    /// Depth-first search for the first entry accepted by `matches`.
    ///
    /// Children are visited in stored order; with `bounds` set, only
    /// subtrees whose box intersects it are entered.
    async fn find_entry<F>(&self, bounds: Option<&Region>, matches: F) -> EngineResult<Option<Found>>
    where
        F: Fn(&LeafEntry) -> bool,
    {
        let mut stack: Vec<(NodeId, Path)> = vec![(self.store.header().root, Path::new())];
        while let Some((node_id, path)) = stack.pop() {
            match self.store.load(node_id).await? {
                Node::Leaf { entries } => {
                    if let Some(index) = entries.iter().position(&matches) {
                        return Ok(Some(Found {
                            path,
                            leaf: node_id,
                            index,
                        }));
                    }
                }
                Node::Internal { children, .. } => {
                    for (i, child) in children.iter().enumerate().rev() {
                        if bounds.map_or(true, |b| child.bbox.intersects(b)) {
                            let mut child_path = path.clone();
                            child_path.push((node_id, i));
                            stack.push((child.node_id, child_path));
                        }
                    }
                }
            }
        }
        Ok(None)
    }

    /// Removes a located entry, then fixes the boxes above it, drops
    /// emptied nodes and shortens the tree when the root is left with a
    /// single child.
    async fn remove_found(&self, found: Found) -> EngineResult<()> {
        let dims = self.manifest.dimensions;
        let mut leaf = self.store.load(found.leaf).await?;
        if let Node::Leaf { entries } = &mut leaf {
            entries.remove(found.index);
        }
        self.store.put(found.leaf, leaf)?;

        let mut header = self.store.header();
        header.entry_count = header.entry_count.saturating_sub(1);
        self.store.set_header(header)?;

        for &(parent_id, child_idx) in found.path.iter().rev() {
            let mut parent = self.store.load(parent_id).await?;
            let Node::Internal { children, .. } = &mut parent else {
                return Err(EngineError::Corrupted(format!(
                    "node {} on a deletion path is not internal",
                    parent_id
                )));
            };
            let child_id = children[child_idx].node_id;
            let child = self.store.load(child_id).await?;
            if child.is_empty() {
                children.remove(child_idx);
                self.store.release(child_id)?;
            } else {
                children[child_idx].bbox = child.compute_bbox(dims);
            }
            self.store.put(parent_id, parent)?;
        }

        self.collapse_root().await
    }

    async fn collapse_root(&self) -> EngineResult<()> {
        loop {
            let mut header = self.store.header();
            let Node::Internal { children, .. } = self.store.load(header.root).await? else {
                return Ok(());
            };
            match children.len() {
                0 => {
                    self.store.put(header.root, Node::empty_leaf())?;
                    header.height = 1;
                    return self.store.set_header(header);
                }
                1 => {
                    let old_root = header.root;
                    header.root = children[0].node_id;
                    header.height = header.height.saturating_sub(1).max(1);
                    self.store.set_header(header)?;
                    self.store.release(old_root)?;
                    log::debug!("Collapsed root {} into {}", old_root, children[0].node_id);
                }
                _ => return Ok(()),
            }
        }
    }
}

fn describe_target(target: &DeleteTarget) -> String {
    match target {
        DeleteTarget::Identity { point, id } => {
            format!("no record at {} with id {:02x?}", point, id.as_bytes())
        }
        DeleteTarget::Location(location) => format!("no record at location {}", location),
    }
}

/// Picks the child needing the least volume enlargement, then the least
/// margin enlargement, then the smallest volume; ties keep the first.
fn choose_subtree(children: &[ChildRef], bounds: &Region) -> usize {
    let mut best = 0;
    let mut best_key: Option<(f64, f64, f64)> = None;
    for (i, child) in children.iter().enumerate() {
        let merged = child.bbox.merge(bounds);
        let key = (
            merged.volume() - child.bbox.volume(),
            merged.margin() - child.bbox.margin(),
            child.bbox.volume(),
        );
        if best_key.map_or(true, |b| key < b) {
            best = i;
            best_key = Some(key);
        }
    }
    best
}

/// Splits `items` in half along the axis where their centres spread widest.
///
/// The sort is stable, so equal centres keep their stored order.
fn split_by_centre<T, F>(items: Vec<T>, bbox: F, dimensions: usize) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> Region,
{
    let boxes: Vec<Region> = items.iter().map(&bbox).collect();
    let axis = widest_axis(&boxes, dimensions);

    let mut keyed: Vec<(f64, T)> = boxes
        .iter()
        .map(|b| b.center(axis))
        .zip(items)
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let mut keep: Vec<T> = keyed.into_iter().map(|(_, item)| item).collect();
    let moved = keep.split_off(keep.len() / 2);
    (keep, moved)
}

fn widest_axis(boxes: &[Region], dimensions: usize) -> usize {
    let mut axis = 0;
    let mut widest = f64::NEG_INFINITY;
    for d in 0..dimensions {
        let (lo, hi) = boxes.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
            let c = b.center(d);
            (lo.min(c), hi.max(c))
        });
        if hi - lo > widest {
            widest = hi - lo;
            axis = d;
        }
    }
    axis
}
