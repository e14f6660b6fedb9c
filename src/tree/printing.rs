use std::fmt::{self, Display, Write};

use crate::util::Stats;

use super::{Node, NodeIdx, SahTree};

/// Shape summary of a built tree.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeStatistics {
    pub node_count: usize,
    pub leaf_count: usize,
    pub empty_leaf_count: usize,
    /// Total number of object references in leaves, objects straddling
    /// split planes are counted once per leaf.
    pub object_references: usize,
    pub depth: Stats,
    /// Objects per non-empty leaf.
    pub leaf_size: Stats,
}

impl Display for TreeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes, {} leaves ({} empty), {} object references",
            self.node_count, self.leaf_count, self.empty_leaf_count, self.object_references
        )?;
        writeln!(f, "Leaf depth: {}", self.depth)?;
        write!(f, "Leaf size: {}", self.leaf_size)
    }
}

impl SahTree {
    pub fn statistics(&self) -> TreeStatistics {
        let mut depth = Stats::default();
        let mut leaf_size = Stats::default();
        let mut leaf_count = 0;
        let mut empty_leaf_count = 0;

        for (leaf, leaf_depth) in self.leaves() {
            leaf_count += 1;
            depth.add_sample(leaf_depth);

            let size = self.leaf_objects(leaf).len();
            if size == 0 {
                empty_leaf_count += 1;
            } else {
                leaf_size.add_sample(size);
            }
        }

        TreeStatistics {
            node_count: self.node_count(),
            leaf_count,
            empty_leaf_count,
            object_references: self.objects.len(),
            depth,
            leaf_size,
        }
    }

    /// Writes an indented listing of the tree nodes.
    pub fn write_tree(&self, out: &mut impl Write) -> fmt::Result {
        self.write_recursive(out, 0, self.root())
    }

    fn write_recursive(&self, out: &mut impl Write, indent: usize, node: NodeIdx) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self.nodes[node] {
            Node::Leaf { .. } => {
                writeln!(out, "{prefix}- L{}: {:?}", node.index(), self.leaf_objects(node))
            }
            Node::Inner { axis, split, left } => {
                writeln!(
                    out,
                    "{prefix}- I{}: {} = {split}",
                    node.index(),
                    ["x", "y", "z"][axis as usize]
                )?;
                self.write_recursive(out, indent + 1, left)?;
                self.write_recursive(out, indent + 1, left + 1)
            }
        }
    }
}
