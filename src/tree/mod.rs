mod building;
mod printing;
mod traversal;

use bon::Builder;
use index_vec::IndexVec;

use crate::{
    error::{Error, Result},
    geometry::{FloatType, WorldBox},
};

pub use printing::TreeStatistics;

/// Hard limit of the tree depth, sizes the traversal stack.
pub const MAX_TREE_DEPTH: usize = 64;

/// Provides bounding boxes of the objects a tree is built over.
pub trait Clipper {
    /// Bounding box of the whole object.
    fn bounding_box(&self, object: u32) -> WorldBox;

    /// Bounding box of the part of the object that lies inside `bounding_box`.
    /// The result must be contained in `bounding_box`, or be empty.
    fn clip(&self, object: u32, bounding_box: &WorldBox) -> WorldBox;
}

/// Parameters of the surface area heuristic.
#[derive(Clone, Debug, Builder)]
pub struct TreeSettings {
    /// Nodes at this depth are always leaves.
    #[builder(default = MAX_TREE_DEPTH)]
    pub max_depth: usize,
    #[builder(default = 15.0)]
    pub traversal_cost: FloatType,
    #[builder(default = 20.0)]
    pub intersection_cost: FloatType,
    /// Cost multiplier for splits that cut off empty space.
    #[builder(default = 0.8)]
    pub empty_space_bonus: FloatType,
    /// Extents below this are treated as zero.
    #[builder(default = 1e-6)]
    pub same_position_eps: FloatType,
}

impl Default for TreeSettings {
    fn default() -> Self {
        TreeSettings::builder().build()
    }
}

impl TreeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_depth > MAX_TREE_DEPTH {
            return Err(Error::TreeTooDeep(self.max_depth));
        }
        Ok(())
    }
}

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
}

/// A node of the tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Objects with indices `objects[first..first + count]` in the tree's object list.
    Leaf { first: u32, count: u32 },
    /// Children are always an adjacent pair, right child is `left + 1`.
    Inner {
        axis: u8,
        split: FloatType,
        left: NodeIdx,
    },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    const EMPTY_LEAF: Node = Node::Leaf { first: 0, count: 0 };
}

/// Binary space partitioning tree with axis aligned split planes, built using
/// the surface area heuristic.
///
/// The tree only exists in compiled form, it can't be modified after construction.
#[derive(Clone, Debug)]
pub struct SahTree {
    bounding_box: WorldBox,
    nodes: IndexVec<NodeIdx, Node>,
    objects: Vec<u32>,
}

impl SahTree {
    pub fn root(&self) -> NodeIdx {
        NodeIdx::from_raw(0)
    }

    pub fn node(&self, index: NodeIdx) -> &Node {
        &self.nodes[index]
    }

    /// Bounding box of everything the tree was built over.
    pub fn bounding_box(&self) -> &WorldBox {
        &self.bounding_box
    }

    /// Object indices stored in a leaf, empty slice for inner nodes.
    pub fn leaf_objects(&self, index: NodeIdx) -> &[u32] {
        match self.nodes[index] {
            Node::Leaf { first, count } => {
                &self.objects[first as usize..(first + count) as usize]
            }
            Node::Inner { .. } => &[],
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over all leaves of the tree and their depths.
    pub fn leaves(&self) -> impl Iterator<Item = (NodeIdx, usize)> + '_ {
        let mut stack = vec![(self.root(), 0usize)];
        std::iter::from_fn(move || {
            while let Some((index, depth)) = stack.pop() {
                match self.nodes[index] {
                    Node::Leaf { .. } => return Some((index, depth)),
                    Node::Inner { left, .. } => {
                        stack.push((left + 1, depth + 1));
                        stack.push((left, depth + 1));
                    }
                }
            }
            None
        })
    }
}
