//! Overlap-Minimizing Tree construction (Lee-Lee), the default packer.
//!
//! Top-down breadth-first partitioning. The root level's fan-out is tailored
//! to the actual population (`M' = ceil(N / B^(h-1))` for target height
//! `h = ceil(log_B N)`), so a tree that is "almost" one level shorter does
//! not pay for a full extra level of near-empty nodes. On skewed inputs like
//! road networks this keeps leaf overlap noticeably lower than bottom-up
//! packing.
//!
//! Frames of at most `BRANCHING_FACTOR` segments become leaves before any
//! branch node is allocated for them, so the branch array contains no empty
//! shells. Because the frame queue is breadth-first, children always sit
//! after their parents in the array; a single reverse pass then propagates
//! interior MBRs bottom-up, and the root is at index 0 without renumbering.

use std::collections::VecDeque;
use std::path::Path;

use eyre::Result;
use rayon::prelude::*;
use tracing::info;

use crate::geometry::{Coordinate, Rectangle};
use crate::storage::LeafWriter;
use crate::tree::{leaf_capacity, SegmentData, TreeIndex, TreeNode, BRANCHING_FACTOR};

use super::edge_centroid;

/// A pending partitioning task over `segments[left..right)`. `height == 0`
/// means "compute the target height from the range size"; that is always the
/// case for the root frame and can recur under heavy skew, where re-tailoring
/// the fan-out is exactly what we want.
struct Frame {
    parent: Option<usize>,
    left: usize,
    right: usize,
    height: usize,
}

/// `ceil(log_base(count))` for `count > base`, by repeated multiplication.
fn ceil_log(count: usize, base: usize) -> u32 {
    let mut height = 1u32;
    let mut capacity = base;
    while capacity < count {
        capacity *= base;
        height += 1;
    }
    height
}

pub(crate) fn pack<T: SegmentData>(
    edges: &[T],
    coordinates: &[Coordinate],
    leaf_path: &Path,
) -> Result<Vec<TreeNode>> {
    debug_assert!(BRANCHING_FACTOR <= leaf_capacity::<T>());

    let mut segments = edges.to_vec();
    let mut writer = LeafWriter::create(leaf_path, coordinates)?;

    // The root exists up front so even an input that fits one leaf produces
    // a root branch at index 0.
    let mut search_tree = vec![TreeNode::empty()];

    let mut queue = VecDeque::new();
    queue.push_back(Frame {
        parent: None,
        left: 0,
        right: segments.len(),
        height: 0,
    });

    while let Some(frame) = queue.pop_front() {
        let count = frame.right - frame.left;

        // Small enough to be a leaf; no branch node is allocated for it.
        if count <= BRANCHING_FACTOR {
            let (leaf_index, mbr) = writer.write_leaf(&segments[frame.left..frame.right])?;
            let parent = frame.parent.unwrap_or(0);
            search_tree[parent].push_child(TreeIndex::leaf(leaf_index), &mbr);
            continue;
        }

        let node = match frame.parent {
            // The root frame reuses the pre-allocated root node.
            None => 0,
            Some(parent) => {
                let node = search_tree.len();
                search_tree.push(TreeNode::empty());
                // The child's final MBR is unknown until its subtree is
                // packed; the reverse pass below fills it in. Merging the
                // invalid sentinel leaves the parent MBR untouched.
                search_tree[parent].push_child(TreeIndex::branch(node as u32), &Rectangle::INVALID);
                node
            }
        };

        let (fanout, child_height) = if frame.height == 0 {
            let height = ceil_log(count, BRANCHING_FACTOR) as usize;
            let fanout = count.div_ceil(BRANCHING_FACTOR.pow(height as u32 - 1));
            (fanout, height - 1)
        } else {
            (BRANCHING_FACTOR, frame.height - 1)
        };

        // Tile sizes per Lee-Lee. The ceilings must genuinely round up:
        // rounding any of these down re-enqueues a frame of the same size
        // and the partitioning never terminates.
        let tile = count.div_ceil(fanout);
        let strip = tile * ((fanout as f64).sqrt().ceil() as usize);

        let range = &mut segments[frame.left..frame.right];
        range.par_sort_unstable_by_key(|edge| edge_centroid(edge, coordinates).lon);
        range
            .par_chunks_mut(strip)
            .for_each(|slab| slab.sort_unstable_by_key(|edge| edge_centroid(edge, coordinates).lat));

        // Strips are whole multiples of the tile size, so walking the range
        // tile by tile never straddles a strip boundary.
        let mut tile_start = 0;
        while tile_start < count {
            let tile_end = (tile_start + tile).min(count);
            queue.push_back(Frame {
                parent: Some(node),
                left: frame.left + tile_start,
                right: frame.left + tile_end,
                height: child_height,
            });
            tile_start = tile_end;
        }
    }

    let leaf_count = writer.finish()?;

    // BFS order puts children after parents, so one reverse pass finishes
    // every interior MBR before its parent reads it. Leaf MBRs were merged
    // into their parents when the leaves were written.
    for index in (0..search_tree.len()).rev() {
        let (head, tail) = search_tree.split_at_mut(index + 1);
        let node = &mut head[index];
        let mut mbr = node.mbr;
        for child in node.children() {
            if !child.is_leaf() {
                mbr.merge(&tail[child.index() as usize - index - 1].mbr);
            }
        }
        node.mbr = mbr;
    }

    info!(
        leaves = leaf_count,
        nodes = search_tree.len(),
        "packed r-tree with overlap-minimizing partitioning"
    );
    Ok(search_tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_log_matches_small_cases() {
        assert_eq!(ceil_log(129, 128), 2);
        assert_eq!(ceil_log(128 * 128, 128), 2);
        assert_eq!(ceil_log(128 * 128 + 1, 128), 3);
    }
}
