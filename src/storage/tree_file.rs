//! Serialization of the branch-node array.
//!
//! Format: a little-endian `u64` node count (at least 1), followed by the
//! raw [`TreeNode`] records in array order. The root is the first record.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use zerocopy::{FromBytes, IntoBytes};

use crate::tree::node::{TreeNode, TREE_NODE_SIZE};

pub fn write_tree<P: AsRef<Path>>(path: P, nodes: &[TreeNode]) -> Result<()> {
    let path = path.as_ref();
    ensure!(!nodes.is_empty(), "refusing to write an empty tree");

    let file = File::create(path)
        .wrap_err_with(|| format!("failed to create tree file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    writer
        .write_all(&(nodes.len() as u64).to_le_bytes())
        .and_then(|_| writer.write_all(nodes.as_bytes()))
        .and_then(|_| writer.flush())
        .wrap_err_with(|| format!("failed to write tree file '{}'", path.display()))?;

    Ok(())
}

pub fn read_tree<P: AsRef<Path>>(path: P) -> Result<Vec<TreeNode>> {
    let path = path.as_ref();

    let mut file = File::open(path)
        .wrap_err_with(|| format!("failed to open tree file '{}'", path.display()))?;

    let mut count_bytes = [0u8; 8];
    file.read_exact(&mut count_bytes)
        .wrap_err_with(|| format!("failed to read node count from '{}'", path.display()))?;
    let node_count = u64::from_le_bytes(count_bytes);
    ensure!(node_count > 0, "tree file '{}' holds an empty tree", path.display());

    let mut bytes = Vec::with_capacity(node_count as usize * TREE_NODE_SIZE);
    file.read_to_end(&mut bytes)
        .wrap_err_with(|| format!("failed to read tree file '{}'", path.display()))?;
    ensure!(
        bytes.len() == node_count as usize * TREE_NODE_SIZE,
        "tree file '{}' is truncated: {} nodes declared, {} bytes of records",
        path.display(),
        node_count,
        bytes.len()
    );

    // Copy record by record; the byte buffer carries no alignment guarantee.
    let nodes = bytes
        .chunks_exact(TREE_NODE_SIZE)
        .map(|chunk| TreeNode::read_from_bytes(chunk).expect("chunk is exactly one node"))
        .collect();

    Ok(nodes)
}
