//! The induced tree structure: interior nodes that dispatch on one
//! feature, and terminal leaves carrying a predicted class.
use crate::utils::argmax_counts;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A node of a fitted decision tree.
///
/// Exactly two variants exist: interior `Feature` nodes and terminal
/// `Leaf` nodes. Ownership is a strict tree rooted at the
/// `DecisionTree`, immutable once fitting completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// An interior node that dispatches on one feature.
    Feature(FeatureNode),
    /// A terminal node.
    Leaf(LeafNode),
}

/// Interior node: one splitting feature with a child per branch value
/// observed during training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureNode {
    /// Index of the splitting feature.
    pub feature: usize,
    /// The threshold the split was computed with, set for continuous
    /// features only. Branch 0 is at or below it, branch 1 above.
    pub threshold: Option<f64>,
    /// Child per branch value. Branches that matched no training rows
    /// are absent.
    pub branches: HashMap<usize, Node>,
    /// Per-class training-row counts at this node, the fallback
    /// distribution for query values with no branch.
    pub counts: Vec<usize>,
    /// The (feature, branch value) pairs walked from the root to reach
    /// this node.
    pub path: Vec<(usize, usize)>,
}

/// Terminal node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafNode {
    /// Predicted class index.
    pub class: usize,
    /// Per-class training-row counts of the rows partitioned here.
    pub counts: Vec<usize>,
}

impl FeatureNode {
    /// Class predicted when a query value has no branch here: the class
    /// with the most training rows at this node.
    pub fn fallback_class(&self) -> usize {
        argmax_counts(&self.counts)
    }
}

impl Node {
    /// Whether this node is terminal.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Number of nodes in this subtree, itself included.
    pub fn n_nodes(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Feature(node) => 1 + node.branches.values().map(Node::n_nodes).sum::<usize>(),
        }
    }

    /// Number of leaves in this subtree.
    pub fn n_leaves(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Feature(node) => node.branches.values().map(Node::n_leaves).sum(),
        }
    }

    /// Largest count of feature nodes on any path from this node down
    /// to a leaf.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Feature(node) => 1 + node.branches.values().map(Node::depth).max().unwrap_or(0),
        }
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Leaf(leaf) => {
                write!(f, "leaf={},n={}", leaf.class, leaf.counts.iter().sum::<usize>())
            }
            Node::Feature(node) => match node.threshold {
                Some(threshold) => write!(
                    f,
                    "[{} <= {}] branches={}",
                    node.feature,
                    threshold,
                    node.branches.len()
                ),
                None => write!(f, "[{}] branches={}", node.feature, node.branches.len()),
            },
        }
    }
}
