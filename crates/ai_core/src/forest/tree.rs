//! Decision tree structures for forest inference
//!
//! Split thresholds are fixed-point integers; features are scaled by the same
//! factor before traversal so comparisons are exact integer comparisons.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` holds one non-negative weight per class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Split threshold (fixed-point)
    #[serde(default)]
    pub threshold: i64,

    /// Per-class weights for leaf nodes
    #[serde(default)]
    pub leaf: Option<Vec<i64>>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: i64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, weights: Vec<i64>) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(weights),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single decision tree (node 0 is the root)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk the tree and return the class weights of the reached leaf.
    ///
    /// Goes left when `feature <= threshold`. Returns `None` on a malformed
    /// path; validated trees always reach a leaf.
    pub fn evaluate(&self, features: &[i64]) -> Option<&[i64]> {
        let mut idx = 0usize;

        // A path can never be longer than the node count in a valid tree.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(idx)?;

            if node.is_leaf() {
                return node.leaf.as_deref();
            }

            let value = *features.get(usize::try_from(node.feature_idx).ok()?)?;
            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(next).ok()?;
        }

        None
    }

    /// Validate tree structure against the model's class and feature counts
    pub fn validate(&self, n_classes: usize, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len() as i64;

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                let Some(weights) = &node.leaf else {
                    return Err(format!("Leaf node {i} has no leaf weights"));
                };
                if weights.len() != n_classes {
                    return Err(format!(
                        "Leaf node {i} has {} weights, expected {n_classes}",
                        weights.len()
                    ));
                }
                if weights.iter().any(|w| *w < 0) {
                    return Err(format!("Leaf node {i} has a negative weight"));
                }
                if weights.iter().all(|w| *w == 0) {
                    return Err(format!("Leaf node {i} has all-zero weights"));
                }
                if checked_weight_sum(weights).is_none() {
                    return Err(format!("Leaf node {i} weights overflow when summed"));
                }
                continue;
            }

            // Children must point forward to keep traversal acyclic.
            for (side, child) in [("left", node.left), ("right", node.right)] {
                let child = i64::from(child);
                if child <= i as i64 || child >= len {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= n_features {
                return Err(format!(
                    "Internal node {i} has invalid feature index: {}",
                    node.feature_idx
                ));
            }
        }

        Ok(())
    }
}

/// Sum of leaf weights, `None` on overflow
pub(crate) fn checked_weight_sum(weights: &[i64]) -> Option<i64> {
    weights.iter().try_fold(0i64, |acc, w| acc.checked_add(*w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        // feature[0] <= 50 -> class 0, else class 1
        Tree::new(vec![
            Node::internal(0, 0, 50, 1, 2),
            Node::leaf(1, vec![10, 0]),
            Node::leaf(2, vec![1, 9]),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12345, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert_eq!(internal.threshold, 12345);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, vec![1, 2]);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30]), Some(&[10, 0][..]));
        assert_eq!(tree.evaluate(&[50]), Some(&[10, 0][..])); // Equal goes left
        assert_eq!(tree.evaluate(&[60]), Some(&[1, 9][..]));
    }

    #[test]
    fn test_missing_feature_yields_none() {
        assert_eq!(stump().evaluate(&[]), None);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(2, 1).is_ok());

        // Left child out of bounds
        let invalid = Tree::new(vec![
            Node::internal(0, 0, 50, 5, 2),
            Node::leaf(1, vec![1, 0]),
            Node::leaf(2, vec![0, 1]),
        ]);
        assert!(invalid.validate(2, 1).is_err());

        // Wrong class count and unknown feature
        assert!(stump().validate(3, 1).is_err());
        assert!(stump().validate(2, 0).is_err());
    }

    #[test]
    fn test_overflowing_leaf_rejected() {
        let tree = Tree::new(vec![Node::leaf(0, vec![i64::MAX, 1])]);
        let err = tree.validate(2, 1).unwrap_err();
        assert!(err.contains("overflow"), "{err}");
        assert_eq!(checked_weight_sum(&[i64::MAX, 1]), None);
        assert_eq!(checked_weight_sum(&[i64::MAX - 1, 1]), Some(i64::MAX));
    }

    #[test]
    fn test_backward_edge_rejected() {
        let cyclic = Tree::new(vec![
            Node::internal(0, 0, 50, 1, 2),
            Node::internal(1, 0, 10, 0, 2),
            Node::leaf(2, vec![1]),
        ]);
        assert!(cyclic.validate(1, 1).is_err());
    }
}
