//! Bulk-packing algorithms that build the tree in one pass.
//!
//! All three packers share the same output contract: leaves are written to
//! the leaf file in packing order, branch nodes end up in one contiguous
//! array with the root at index 0, and every branch MBR covers the union of
//! its children's MBRs. They differ only in how they order segments before
//! filling leaves:
//!
//! - `hilbert`: sort once by the Hilbert code of the projected centroid
//!   (Kamel-Faloutsos packing).
//! - `str`: recursive longitude-slab / latitude-tile sorting
//!   (Sort-Tile-Recursive, Leutenegger-Edgington-Lopez).
//! - `omt`: breadth-first top-down partitioning with root fan-out
//!   tailoring (Overlap-Minimizing Tree, Lee-Lee). The default; it keeps
//!   leaf overlap low on skewed distributions like road networks.
//!
//! Hilbert and STR build bottom-up, so their branch arrays are reversed and
//! renumbered at the end to put the root at index 0. OMT creates nodes in BFS
//! order and gets the root at index 0 for free.

pub mod hilbert;
pub mod omt;
pub mod str;

use eyre::{ensure, Result};
use rayon::prelude::*;

use crate::geometry::{centroid, Coordinate};
use crate::storage::LeafWriter;
use crate::tree::{leaf_capacity, SegmentData, TreeIndex, TreeNode, BRANCHING_FACTOR};

/// Which bulk-packing algorithm builds the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackingMethod {
    Hilbert,
    Str,
    #[default]
    Omt,
}

/// Build-time preconditions: a non-empty input whose endpoint ids all index
/// the coordinate table.
pub(crate) fn validate_input<T: SegmentData>(
    edges: &[T],
    coordinates: &[Coordinate],
) -> Result<()> {
    ensure!(!edges.is_empty(), "cannot build an r-tree from an empty segment set");

    let coordinate_count = coordinates.len() as u32;
    let in_range = edges
        .par_iter()
        .all(|edge| edge.source() < coordinate_count && edge.target() < coordinate_count);
    ensure!(
        in_range,
        "segment endpoint id out of range (coordinate table holds {} entries)",
        coordinate_count
    );
    Ok(())
}

/// Centroid of a segment's endpoints; the per-segment sort key.
pub(crate) fn edge_centroid<T: SegmentData>(edge: &T, coordinates: &[Coordinate]) -> Coordinate {
    centroid(
        coordinates[edge.source() as usize],
        coordinates[edge.target() as usize],
    )
}

/// Packs an ordered run of segments into full leaves and groups every
/// `BRANCHING_FACTOR` consecutive leaves under a bottom-level branch node.
/// Returns that level.
pub(crate) fn pack_bottom_level<T: SegmentData>(
    mut edges_in_order: impl Iterator<Item = T>,
    writer: &mut LeafWriter<'_, T>,
) -> Result<Vec<TreeNode>> {
    let capacity = leaf_capacity::<T>();
    let mut level = Vec::new();
    let mut current = TreeNode::empty();
    let mut scratch: Vec<T> = Vec::with_capacity(capacity);

    loop {
        scratch.clear();
        scratch.extend(edges_in_order.by_ref().take(capacity));
        if scratch.is_empty() {
            break;
        }

        let (leaf_index, mbr) = writer.write_leaf(&scratch)?;
        current.push_child(TreeIndex::leaf(leaf_index), &mbr);

        if current.child_count as usize == BRANCHING_FACTOR {
            level.push(current);
            current = TreeNode::empty();
        }
    }
    if current.child_count > 0 {
        level.push(current);
    }

    debug_assert!(!level.is_empty());
    Ok(level)
}

/// Moves one finished level into the branch array and returns its parents.
/// Child handles point at the array positions the children just took;
/// they are renumbered when the array is finally reversed.
pub(crate) fn group_into_parents(
    level: Vec<TreeNode>,
    search_tree: &mut Vec<TreeNode>,
) -> Vec<TreeNode> {
    let mut parents = Vec::with_capacity(level.len().div_ceil(BRANCHING_FACTOR));
    for chunk in level.chunks(BRANCHING_FACTOR) {
        let mut parent = TreeNode::empty();
        for child in chunk {
            parent.push_child(TreeIndex::branch(search_tree.len() as u32), &child.mbr);
            search_tree.push(*child);
        }
        parents.push(parent);
    }
    parents
}

/// Reverses a bottom-up branch array so the root lands at index 0 and
/// renumbers every non-leaf child handle accordingly
/// (`old_id -> total - old_id - 1`). Leaf handles index the leaf file and
/// are untouched.
pub(crate) fn reverse_and_renumber(search_tree: &mut [TreeNode]) {
    search_tree.reverse();

    let total = search_tree.len() as u32;
    search_tree.par_iter_mut().for_each(|node| {
        for child in &mut node.children[..node.child_count as usize] {
            if !child.is_leaf() {
                *child = TreeIndex::branch(total - child.index() - 1);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rectangle;

    fn node_with_mbr(min_lon: i32) -> TreeNode {
        let mut node = TreeNode::empty();
        node.mbr = Rectangle::new(min_lon, min_lon + 1, 0, 1);
        node
    }

    #[test]
    fn grouping_packs_consecutive_children() {
        let level: Vec<TreeNode> = (0..(BRANCHING_FACTOR as i32 + 2)).map(node_with_mbr).collect();
        let mut search_tree = Vec::new();

        let parents = group_into_parents(level, &mut search_tree);

        assert_eq!(parents.len(), 2);
        assert_eq!(parents[0].child_count as usize, BRANCHING_FACTOR);
        assert_eq!(parents[1].child_count, 2);
        assert_eq!(search_tree.len(), BRANCHING_FACTOR + 2);
        assert_eq!(parents[0].children()[0], TreeIndex::branch(0));
        assert_eq!(parents[1].children()[1], TreeIndex::branch(BRANCHING_FACTOR as u32 + 1));

        // Parent MBRs cover their children.
        assert_eq!(parents[1].mbr, Rectangle::new(BRANCHING_FACTOR as i32, BRANCHING_FACTOR as i32 + 2, 0, 1));
    }

    #[test]
    fn renumbering_mirrors_indices_and_skips_leaves() {
        // Two-node array built bottom-up: child at 0, root at 1.
        let mut child = node_with_mbr(0);
        child.push_child(TreeIndex::leaf(7), &Rectangle::new(0, 1, 0, 1));
        let mut root = node_with_mbr(10);
        root.push_child(TreeIndex::branch(0), &child.mbr);

        let mut search_tree = vec![child, root];
        reverse_and_renumber(&mut search_tree);

        // Root first now, pointing at the child's new position.
        assert_eq!(search_tree[0].children()[0], TreeIndex::branch(1));
        // The leaf handle survived untouched.
        assert_eq!(search_tree[1].children()[0], TreeIndex::leaf(7));
    }
}
