//! The static R-tree: construction entry points and the two query families.
//!
//! A built tree is an in-memory branch array (root at index 0), a borrowed
//! coordinate table, and a memory-mapped leaf file. Everything is immutable
//! after construction, so any number of concurrent queries may share one
//! tree; each query owns its own traversal state.
//!
//! ## Nearest-neighbor traversal
//!
//! `nearest_with` runs best-first branch-and-bound over a single min-priority
//! queue that mixes tree nodes and individual segments. A node enters the
//! queue with its MBR's minimum squared distance to the query, a lower bound
//! for everything beneath it; a segment enters with its exact squared
//! distance. When a segment pops, every other queue entry bounds its subtree
//! (or itself) from below by at least that distance, so no unseen segment can
//! be nearer; results therefore stream out in non-decreasing distance order,
//! and the terminator can stop the search the moment the caller has enough.

use std::collections::{BinaryHeap, VecDeque};
use std::path::Path;

use eyre::Result;
use tracing::info;

use crate::geometry::{
    mercator, project_point_on_segment, squared_euclidean_distance, Coordinate, Rectangle,
};
use crate::packer::{self, PackingMethod};
use crate::storage::{self, LeafStorage};
use crate::tree::{SegmentData, TreeIndex, TreeNode};

/// A segment the nearest query is considering, as handed to the filter and
/// terminator predicates.
#[derive(Debug, Clone, Copy)]
pub struct CandidateSegment<T> {
    /// Nearest point on the segment to the query, fixed-point Mercator.
    pub fixed_projected_coordinate: Coordinate,
    pub data: T,
}

/// Entry of the nearest-query priority queue: either a whole subtree bounded
/// below by its MBR distance, or a single segment at its exact distance.
enum QueueEntry {
    Node(TreeIndex),
    Segment {
        leaf: TreeIndex,
        slot: u32,
        projected_nearest: Coordinate,
    },
}

/// Queue entries order by `squared_min_dist` ascending; equal distances pop
/// in push order via the sequence counter, so traversal order (and with it
/// every tie in query output) is deterministic.
struct QueryCandidate {
    squared_min_dist: u64,
    sequence: u64,
    entry: QueueEntry,
}

impl PartialEq for QueryCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.squared_min_dist == other.squared_min_dist && self.sequence == other.sequence
    }
}

impl Eq for QueryCandidate {}

impl PartialOrd for QueryCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueryCandidate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reversed: BinaryHeap is a max-heap and we pop the smallest.
        (other.squared_min_dist, other.sequence).cmp(&(self.squared_min_dist, self.sequence))
    }
}

/// Static, packed, disk-resident R-tree over 2D segments.
///
/// `coordinates` is the caller-owned endpoint table the stored payloads
/// index into; it must outlive the tree and is never mutated.
#[derive(Debug)]
pub struct StaticRTree<'a, T: SegmentData> {
    search_tree: Vec<TreeNode>,
    coordinates: &'a [Coordinate],
    leaves: LeafStorage,
    _payload: std::marker::PhantomData<T>,
}

impl<'a, T: SegmentData> StaticRTree<'a, T> {
    /// Builds a tree from `edges`, writing the branch array to `tree_path`
    /// and the leaf pages to `leaf_path`, then maps the leaf file for
    /// querying.
    ///
    /// The input must be non-empty and every endpoint id must index
    /// `coordinates`.
    pub fn build<P: AsRef<Path>, Q: AsRef<Path>>(
        edges: &[T],
        coordinates: &'a [Coordinate],
        tree_path: P,
        leaf_path: Q,
        method: PackingMethod,
    ) -> Result<Self> {
        packer::validate_input(edges, coordinates)?;
        info!(segments = edges.len(), ?method, "building static r-tree");

        let leaf_path = leaf_path.as_ref();
        let search_tree = match method {
            PackingMethod::Hilbert => packer::hilbert::pack(edges, coordinates, leaf_path),
            PackingMethod::Str => packer::str::pack(edges, coordinates, leaf_path),
            PackingMethod::Omt => packer::omt::pack(edges, coordinates, leaf_path),
        }?;
        storage::write_tree(tree_path, &search_tree)?;

        Ok(Self {
            search_tree,
            coordinates,
            leaves: LeafStorage::open(leaf_path)?,
            _payload: std::marker::PhantomData,
        })
    }

    /// Reloads a previously written tree: reads the branch array into memory
    /// and maps the leaf file read-only.
    pub fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        tree_path: P,
        leaf_path: Q,
        coordinates: &'a [Coordinate],
    ) -> Result<Self> {
        Ok(Self {
            search_tree: storage::read_tree(tree_path)?,
            coordinates,
            leaves: LeafStorage::open(leaf_path)?,
            _payload: std::marker::PhantomData,
        })
    }

    /// Returns every stored segment whose unprojected endpoint bounding box
    /// intersects `search_rectangle` (WGS84 fixed-point). Result order is
    /// unspecified.
    ///
    /// Node MBRs are Mercator, so pruning tests a latitude-projected copy of
    /// the input rectangle while the final per-segment test uses the
    /// unprojected original. The two spaces disagree slightly about
    /// rectangle overlap near the poles; for road-network latitudes the
    /// discrepancy is vacuous.
    pub fn search_in_box(&self, search_rectangle: Rectangle) -> Vec<T> {
        let projected_rectangle = Rectangle::new(
            search_rectangle.min_lon,
            search_rectangle.max_lon,
            mercator::from_wgs84(Coordinate::new(0, search_rectangle.min_lat)).lat,
            mercator::from_wgs84(Coordinate::new(0, search_rectangle.max_lat)).lat,
        );

        let mut results = Vec::new();
        let mut traversal_queue = VecDeque::from([TreeIndex::ROOT]);

        while let Some(tree_index) = traversal_queue.pop_front() {
            if tree_index.is_leaf() {
                let leaf = self.leaves.page(tree_index.index());
                for (_, edge) in leaf.objects::<T>() {
                    let u = self.coordinates[edge.source() as usize];
                    let v = self.coordinates[edge.target() as usize];
                    let mut bbox = Rectangle::INVALID;
                    bbox.extend(u.lon, u.lat);
                    bbox.extend(v.lon, v.lat);

                    // Unprojected box against the unprojected input.
                    if bbox.intersects(&search_rectangle) {
                        results.push(edge);
                    }
                }
            } else {
                let node = &self.search_tree[tree_index.index() as usize];
                for &child in node.children() {
                    if self.child_mbr(child).intersects(&projected_rectangle) {
                        traversal_queue.push_back(child);
                    }
                }
            }
        }
        results
    }

    /// Returns up to `max_results` segments, closest first. Equivalent to
    /// [`nearest_with`](Self::nearest_with) with a pass-everything filter
    /// and a terminator that stops at `max_results`.
    pub fn nearest(&self, input_coordinate: Coordinate, max_results: usize) -> Vec<T> {
        self.nearest_with(
            input_coordinate,
            |_| (true, true),
            |num_results, _| num_results >= max_results,
        )
    }

    /// Best-first nearest-segment search from `input_coordinate` (WGS84).
    ///
    /// Results are ordered by non-decreasing squared Euclidean distance in
    /// the Mercator plane. For each candidate, in distance order:
    ///
    /// 1. `terminate(results.len(), &candidate)` is consulted first; `true`
    ///    ends the search *without* the candidate.
    /// 2. `filter(&candidate)` then decides per travel direction; `(false,
    ///    false)` discards the candidate, anything else ANDs the two flags
    ///    into the payload's direction-enabled flags and appends it.
    pub fn nearest_with(
        &self,
        input_coordinate: Coordinate,
        mut filter: impl FnMut(&CandidateSegment<T>) -> (bool, bool),
        mut terminate: impl FnMut(usize, &CandidateSegment<T>) -> bool,
    ) -> Vec<T> {
        let projected_coordinate = mercator::from_wgs84(input_coordinate);

        let mut results = Vec::new();
        let mut sequence = 0u64;
        let mut traversal_queue = BinaryHeap::new();
        traversal_queue.push(QueryCandidate {
            squared_min_dist: 0,
            sequence,
            entry: QueueEntry::Node(TreeIndex::ROOT),
        });

        while let Some(candidate) = traversal_queue.pop() {
            match candidate.entry {
                QueueEntry::Node(tree_index) if tree_index.is_leaf() => {
                    self.explore_leaf_node(
                        tree_index,
                        projected_coordinate,
                        &mut traversal_queue,
                        &mut sequence,
                    );
                }
                QueueEntry::Node(tree_index) => {
                    self.explore_tree_node(
                        tree_index,
                        projected_coordinate,
                        &mut traversal_queue,
                        &mut sequence,
                    );
                }
                QueueEntry::Segment {
                    leaf,
                    slot,
                    projected_nearest,
                } => {
                    let mut data: T = self.leaves.page(leaf.index()).object(slot);
                    let candidate = CandidateSegment {
                        fixed_projected_coordinate: projected_nearest,
                        data,
                    };

                    // Checked before the filter so an over-restrictive
                    // filter can still drain to an empty result instead of
                    // stopping at the first match.
                    if terminate(results.len(), &candidate) {
                        break;
                    }

                    let (keep_forward, keep_reverse) = filter(&candidate);
                    if !keep_forward && !keep_reverse {
                        continue;
                    }
                    data.restrict_directions(keep_forward, keep_reverse);
                    results.push(data);
                }
            }
        }

        results
    }

    /// Enqueues every segment of a leaf at its exact projected distance.
    fn explore_leaf_node(
        &self,
        leaf_id: TreeIndex,
        projected_coordinate: Coordinate,
        traversal_queue: &mut BinaryHeap<QueryCandidate>,
        sequence: &mut u64,
    ) {
        let projected_input = projected_coordinate.to_float();
        let leaf = self.leaves.page(leaf_id.index());

        for (slot, edge) in leaf.objects::<T>() {
            let projected_u =
                mercator::from_wgs84(self.coordinates[edge.source() as usize]).to_float();
            let projected_v =
                mercator::from_wgs84(self.coordinates[edge.target() as usize]).to_float();

            let (_, projected_nearest) =
                project_point_on_segment(projected_u, projected_v, projected_input);
            let projected_nearest = projected_nearest.to_fixed();
            let squared_distance =
                squared_euclidean_distance(projected_coordinate, projected_nearest);

            *sequence += 1;
            traversal_queue.push(QueryCandidate {
                squared_min_dist: squared_distance,
                sequence: *sequence,
                entry: QueueEntry::Segment {
                    leaf: leaf_id,
                    slot,
                    projected_nearest,
                },
            });
        }
    }

    /// Enqueues every child of a branch at its MBR lower bound.
    fn explore_tree_node(
        &self,
        parent_id: TreeIndex,
        projected_coordinate: Coordinate,
        traversal_queue: &mut BinaryHeap<QueryCandidate>,
        sequence: &mut u64,
    ) {
        let parent = &self.search_tree[parent_id.index() as usize];
        for &child in parent.children() {
            let squared_lower_bound = self.child_mbr(child).min_squared_dist(projected_coordinate);
            *sequence += 1;
            traversal_queue.push(QueryCandidate {
                squared_min_dist: squared_lower_bound,
                sequence: *sequence,
                entry: QueueEntry::Node(child),
            });
        }
    }

    /// MBR of a child handle, from the branch array or the mapped leaves.
    fn child_mbr(&self, child: TreeIndex) -> Rectangle {
        if child.is_leaf() {
            self.leaves.page(child.index()).mbr()
        } else {
            self.search_tree[child.index() as usize].mbr
        }
    }

    pub fn leaf_count(&self) -> u32 {
        self.leaves.leaf_count()
    }

    pub fn node_count(&self) -> usize {
        self.search_tree.len()
    }

    #[cfg(test)]
    pub(crate) fn search_tree(&self) -> &[TreeNode] {
        &self.search_tree
    }

    #[cfg(test)]
    pub(crate) fn leaves(&self) -> &LeafStorage {
        &self.leaves
    }
}
