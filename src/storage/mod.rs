//! On-disk storage: the sequentially written leaf file and its read-only
//! memory mapping, plus the serialized branch array.
//!
//! Both files are raw record dumps. The leaf file is a concatenation of
//! fixed-size pages so it can be mapped and indexed by page number; the
//! branch file is small enough to be read into memory whole.

pub mod leaf_file;
pub mod tree_file;

pub use leaf_file::{LeafPage, LeafStorage, LeafWriter};
pub use tree_file::{read_tree, write_tree};
