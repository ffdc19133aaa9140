//! Tree structure: node records, the payload contract and the query engine.
//!
//! The constants here pin the on-disk format. A branch node holds up to
//! [`BRANCHING_FACTOR`] children; a leaf occupies exactly [`LEAF_PAGE_SIZE`]
//! bytes on disk so the leaf file can be memory-mapped and indexed by page
//! number with no per-read deserialization.

pub mod edge;
pub mod node;
pub mod rtree;

pub use edge::{RoadEdge, SegmentData};
pub use node::{LeafHeader, TreeIndex, TreeNode};
pub use rtree::{CandidateSegment, StaticRTree};

/// Maximum children per branch node.
pub const BRANCHING_FACTOR: usize = 128;

/// On-disk byte size of one leaf node. Must be a power of two and must fit
/// the leaf header plus at least one payload.
pub const LEAF_PAGE_SIZE: usize = 4096;

const _: () = assert!(LEAF_PAGE_SIZE.is_power_of_two());

/// Number of payloads a leaf page can hold.
pub const fn leaf_capacity<T>() -> usize {
    let capacity = (LEAF_PAGE_SIZE - std::mem::size_of::<LeafHeader>()) / std::mem::size_of::<T>();
    assert!(capacity > 0, "leaf page is too small for the payload");
    capacity
}

// The on-disk records are raw native-endian memory, as the serialized branch
// array and leaf pages are read back by `zerocopy` without per-field
// conversion. The format is defined as little-endian.
#[cfg(target_endian = "big")]
compile_error!("edgetree's on-disk format requires a little-endian host");
