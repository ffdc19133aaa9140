//! Sort-Tile-Recursive construction (Leutenegger-Edgington-Lopez).
//!
//! Each level is sorted by centroid longitude, cut into ~sqrt(count /
//! fan-out) vertical slabs, and each slab sorted by latitude before packing
//! consecutive runs into nodes. The same tiling is applied recursively to the
//! freshly built node level until a single root remains.
//!
//! Sort keys use unprojected centroids: projection leaves longitude unchanged
//! and is monotonic in latitude, so the ordering is identical and the
//! projection can wait until leaf MBRs are computed.

use std::path::Path;

use eyre::Result;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::geometry::Coordinate;
use crate::storage::LeafWriter;
use crate::tree::{leaf_capacity, SegmentData, TreeNode, BRANCHING_FACTOR};

use super::{edge_centroid, group_into_parents, pack_bottom_level, reverse_and_renumber};

/// Number of vertical slabs for `count` items packed `per_node` at a time.
fn slab_count(count: usize, per_node: usize) -> usize {
    let slabs = ((count as f64 / per_node as f64).sqrt().ceil()) as usize;
    slabs.max(1)
}

/// Longitude sort, slab split, latitude sort within each slab.
fn sort_tiles<E: Send>(
    items: &mut [E],
    per_node: usize,
    lon_key: impl Fn(&E) -> i32 + Sync,
    lat_key: impl Fn(&E) -> i32 + Sync,
) {
    items.par_sort_unstable_by_key(&lon_key);

    let slabs = slab_count(items.len(), per_node);
    let slab_len = items.len().div_ceil(slabs);
    debug!(items = items.len(), slabs, slab_len, "sorting vertical slabs");

    items
        .par_chunks_mut(slab_len)
        .for_each(|slab| slab.sort_unstable_by_key(&lat_key));
}

pub(crate) fn pack<T: SegmentData>(
    edges: &[T],
    coordinates: &[Coordinate],
    leaf_path: &Path,
) -> Result<Vec<TreeNode>> {
    let mut ordered = edges.to_vec();
    sort_tiles(
        &mut ordered,
        leaf_capacity::<T>(),
        |edge| edge_centroid(edge, coordinates).lon,
        |edge| edge_centroid(edge, coordinates).lat,
    );

    let mut writer = LeafWriter::create(leaf_path, coordinates)?;
    let mut level = pack_bottom_level(ordered.iter().copied(), &mut writer)?;
    let leaf_count = writer.finish()?;

    // Recurse the tiling over node levels until one root remains.
    let mut search_tree = Vec::new();
    let mut depth = 0u32;
    while level.len() > 1 {
        sort_tiles(
            &mut level,
            BRANCHING_FACTOR,
            |node| node.mbr.centroid().lon,
            |node| node.mbr.centroid().lat,
        );
        level = group_into_parents(level, &mut search_tree);
        depth += 1;
    }
    search_tree.push(level.pop().expect("a packed tree always has a root"));

    reverse_and_renumber(&mut search_tree);

    info!(
        leaves = leaf_count,
        nodes = search_tree.len(),
        depth,
        "packed r-tree with sort-tile-recursive"
    );
    Ok(search_tree)
}
