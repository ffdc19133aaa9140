//! The segment payload contract.
//!
//! The tree is generic over the record stored in its leaves. It only requires
//! what the packers and the nearest-query filter actually touch: the two
//! endpoint ids into the caller's coordinate table, bitwise copyability for
//! the page layout, and the per-direction enabled flags the filter may clear
//! on returned copies.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Contract between the tree and its leaf payload.
///
/// Implementors must be padding-free `#[repr(C)]` PODs; the zerocopy bounds
/// enforce that, and the leaf page stores the record verbatim.
pub trait SegmentData:
    Copy + FromBytes + IntoBytes + Immutable + KnownLayout + Send + Sync + 'static
{
    /// Coordinate-table id of the first endpoint.
    fn source(&self) -> u32;

    /// Coordinate-table id of the second endpoint.
    fn target(&self) -> u32;

    /// ANDs the given booleans into the payload's forward/reverse enabled
    /// flags. Called on the copy a nearest query is about to return, never on
    /// stored data.
    fn restrict_directions(&mut self, forward: bool, reverse: bool);
}

/// Direction flag bits in [`RoadEdge::flags`].
pub const FORWARD_ENABLED: u32 = 1;
pub const REVERSE_ENABLED: u32 = 1 << 1;

/// The crate's stock road-segment payload: endpoint ids, the id of the edge
/// in the caller's graph, and direction flags. 16 bytes, no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RoadEdge {
    pub source: u32,
    pub target: u32,
    pub edge_id: u32,
    pub flags: u32,
}

const _: () = assert!(std::mem::size_of::<RoadEdge>() == 16);

impl RoadEdge {
    /// A bidirectional edge with both directions enabled.
    pub const fn new(source: u32, target: u32, edge_id: u32) -> Self {
        Self {
            source,
            target,
            edge_id,
            flags: FORWARD_ENABLED | REVERSE_ENABLED,
        }
    }

    pub const fn forward_enabled(&self) -> bool {
        self.flags & FORWARD_ENABLED != 0
    }

    pub const fn reverse_enabled(&self) -> bool {
        self.flags & REVERSE_ENABLED != 0
    }
}

impl SegmentData for RoadEdge {
    fn source(&self) -> u32 {
        self.source
    }

    fn target(&self) -> u32 {
        self.target
    }

    fn restrict_directions(&mut self, forward: bool, reverse: bool) {
        if !forward {
            self.flags &= !FORWARD_ENABLED;
        }
        if !reverse {
            self.flags &= !REVERSE_ENABLED;
        }
    }
}
