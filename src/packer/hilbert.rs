//! Packed Hilbert R-tree construction (Kamel-Faloutsos).
//!
//! One global sort by the Hilbert code of each segment's projected centroid,
//! then leaves are filled in sorted order and branch levels grown bottom-up.
//! Ties on the code break by input index, which makes the parallel unstable
//! sort deterministic.

use std::path::Path;

use eyre::Result;
use rayon::prelude::*;
use tracing::info;

use crate::geometry::{hilbert::hilbert_code, mercator, Coordinate};
use crate::storage::LeafWriter;
use crate::tree::{SegmentData, TreeNode};

use super::{edge_centroid, group_into_parents, pack_bottom_level, reverse_and_renumber};

pub(crate) fn pack<T: SegmentData>(
    edges: &[T],
    coordinates: &[Coordinate],
    leaf_path: &Path,
) -> Result<Vec<TreeNode>> {
    // Hilbert code of the Mercator-projected centroid, tagged with the input
    // index as tiebreak.
    let mut keys: Vec<(u64, u32)> = edges
        .par_iter()
        .enumerate()
        .map(|(index, edge)| {
            let projected = mercator::from_wgs84(edge_centroid(edge, coordinates));
            (hilbert_code(projected), index as u32)
        })
        .collect();
    keys.par_sort_unstable();

    let mut writer = LeafWriter::create(leaf_path, coordinates)?;
    let mut level = pack_bottom_level(
        keys.iter().map(|&(_, index)| edges[index as usize]),
        &mut writer,
    )?;
    let leaf_count = writer.finish()?;

    let mut search_tree = Vec::new();
    let mut depth = 0u32;
    while level.len() > 1 {
        level = group_into_parents(level, &mut search_tree);
        depth += 1;
    }
    search_tree.push(level.pop().expect("a packed tree always has a root"));

    reverse_and_renumber(&mut search_tree);

    info!(
        leaves = leaf_count,
        nodes = search_tree.len(),
        depth,
        "packed r-tree along the Hilbert curve"
    );
    Ok(search_tree)
}
