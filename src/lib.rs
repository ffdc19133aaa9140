//! # edgetree - Static Packed R-tree for Road Segments
//!
//! A disk-resident spatial index over 2D line segments drawn from a road
//! network. The tree is bulk-packed once from an immutable input and then
//! served read-only, typically through a memory-mapped leaf file; there are
//! no insertions, deletions, or rebalancing.
//!
//! ## Queries
//!
//! - **k-nearest segment**: best-first branch-and-bound over one priority
//!   queue mixing tree nodes (MBR lower bounds) and individual segments
//!   (exact projected distances), with caller-supplied filter and
//!   termination predicates.
//! - **Rectangle intersection**: FIFO traversal returning every segment
//!   whose endpoint bounding box meets an axis-aligned query box.
//!
//! All coordinates are fixed-point (1e-6 degrees); bounding boxes and
//! distances live in the Web-Mercator plane, so the metric is squared
//! Euclidean in projected units, **not** meters.
//!
//! ## Quick Start
//!
//! ```ignore
//! use edgetree::{Coordinate, PackingMethod, RoadEdge, StaticRTree};
//!
//! let tree = StaticRTree::build(
//!     &edges,
//!     &coordinates,
//!     "road.tree",
//!     "road.leaves",
//!     PackingMethod::default(),
//! )?;
//!
//! let nearest = tree.nearest(Coordinate::from_degrees(13.39, 52.52), 10);
//!
//! // Later, without rebuilding:
//! let tree = StaticRTree::<RoadEdge>::open("road.tree", "road.leaves", &coordinates)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │        StaticRTree (build/open/query)     │
//! ├─────────────────────┬─────────────────────┤
//! │  Packers            │  Query engine       │
//! │  Hilbert / STR / OMT│  box + best-first NN│
//! ├─────────────────────┴─────────────────────┤
//! │  Node layout (branch array, leaf pages)   │
//! ├───────────────────────────────────────────┤
//! │  Storage (tree file, mmap'd leaf file)    │
//! ├───────────────────────────────────────────┤
//! │  Geometry (fixed-point, Mercator, Hilbert)│
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! A built index is two files:
//!
//! ```text
//! <name>.tree     u64 node count + raw branch records, root first
//! <name>.leaves   page stream, one leaf per LEAF_PAGE_SIZE bytes
//! ```
//!
//! The branch array is small and read into memory whole; the leaf file is
//! mapped read-only and pages are touched only as traversals reach them.
//!
//! ## Module Overview
//!
//! - [`geometry`]: fixed-point coordinates, rectangles, Mercator, Hilbert
//! - [`tree`]: node records, the payload contract, the query engine
//! - [`packer`]: the three bulk-loading algorithms
//! - [`storage`]: leaf-file writer/mapping and branch-array serialization

pub mod geometry;
pub mod packer;
pub mod storage;
pub mod tree;

pub use geometry::{Coordinate, FloatCoordinate, Rectangle, COORDINATE_PRECISION};
pub use packer::PackingMethod;
pub use tree::{
    leaf_capacity, CandidateSegment, RoadEdge, SegmentData, StaticRTree, BRANCHING_FACTOR,
    LEAF_PAGE_SIZE,
};
