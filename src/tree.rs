//! The decision tree itself: configuration, the recursive induction
//! pass, and classification.
use crate::constants::{DEFAULT_VALUE_COUNT, FALLBACK_CONFIDENCE};
use crate::data::Matrix;
use crate::dataset::TrainingSet;
use crate::errors::QuinlanError;
use crate::node::{FeatureNode, LeafNode, Node};
use crate::splitter::{best_split, branch_rows};
use crate::utils::{argmax_counts, class_probabilities, entropy};
use hashbrown::HashMap;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;

/// Result of classifying a single feature vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class index.
    pub class: usize,
    /// Always [`FALLBACK_CONFIDENCE`]: the traversal never computes a
    /// posterior along the path, so leaves and the unseen-value fallback
    /// both report the sentinel.
    pub confidence: f64,
}

/// C4.5-style decision tree classifier.
///
/// Discrete features branch once per observed value, continuous
/// features split two ways around a threshold learned against the row
/// subset at each node. Fitting is a single top-down pass; the fitted
/// tree is immutable and may be shared across threads for prediction.
#[derive(Deserialize, Serialize, Clone)]
pub struct DecisionTree {
    /// Number of classes. Labels are indices in `0..n_classes`.
    pub n_classes: usize,
    /// Per-feature flag marking continuous features. Leaving this empty
    /// treats every feature as discrete.
    pub is_continuous: Vec<bool>,
    /// Distinct-value count per feature. Unset defaults every feature
    /// to 2; continuous features are always carried as 2, the two-way
    /// threshold split.
    pub value_counts: Option<Vec<usize>>,
    /// Depth bound on the tree: `0` defaults to the feature count,
    /// `-1` disables the bound, positive values bound depth directly.
    pub max_depth: i64,
    /// Root of the fitted tree.
    pub root: Option<Node>,
    /// Entropy of the full training label distribution, fixed at fit
    /// time and reused as the minuend of every gain computation.
    pub prior_entropy: f64,
}

impl DecisionTree {
    /// Initialize a tree for `n_classes` classes. All features are
    /// treated as discrete binary until configured otherwise.
    pub fn new(n_classes: usize) -> Self {
        DecisionTree {
            n_classes,
            is_continuous: Vec::new(),
            value_counts: None,
            max_depth: 0,
            root: None,
            prior_entropy: 0.0,
        }
    }

    /// Mark which features are continuous.
    pub fn set_continuous(mut self, flags: Vec<bool>) -> Self {
        self.is_continuous = flags;
        self
    }

    /// Set the distinct-value count per feature.
    pub fn set_value_counts(mut self, counts: Vec<usize>) -> Self {
        self.value_counts = Some(counts);
        self
    }

    /// Set the depth bound: `0` defaults to the feature count, `-1`
    /// disables the bound, positive values bound depth directly.
    pub fn set_max_depth(mut self, depth: i64) -> Self {
        self.max_depth = depth;
        self
    }

    /// Fit the tree on a feature matrix and its class labels.
    ///
    /// Fails fast on malformed input: row/label mismatch, a label at or
    /// above `n_classes`, a zero-column or empty matrix, metadata of the
    /// wrong width, or `max_depth < -1`.
    pub fn fit(&mut self, data: &Matrix<f64>, labels: &[usize]) -> Result<(), QuinlanError> {
        if self.max_depth < -1 {
            return Err(QuinlanError::InvalidMaxDepth(self.max_depth));
        }
        let n_features = data.cols;
        if n_features == 0 {
            return Err(QuinlanError::NoFeatures);
        }
        let is_continuous = if self.is_continuous.is_empty() {
            vec![false; n_features]
        } else {
            if self.is_continuous.len() != n_features {
                return Err(QuinlanError::InvalidContinuousFlags(self.is_continuous.len(), n_features));
            }
            self.is_continuous.clone()
        };
        let mut value_counts = match &self.value_counts {
            None => vec![DEFAULT_VALUE_COUNT; n_features],
            Some(counts) => {
                if counts.len() != n_features {
                    return Err(QuinlanError::InvalidValueCounts(counts.len(), n_features));
                }
                counts.clone()
            }
        };
        // A continuous feature always splits two ways.
        for (feature, &continuous) in is_continuous.iter().enumerate() {
            if continuous {
                value_counts[feature] = DEFAULT_VALUE_COUNT;
            }
        }

        let set = TrainingSet::new(data, labels, self.n_classes, &is_continuous, &value_counts)?;

        info!(
            "Fitting a decision tree on {} rows, {} features, {} classes.",
            data.rows, n_features, self.n_classes
        );

        let prior_entropy = entropy(&class_probabilities(&set.class_counts(&set_rows(data.rows))));
        let limit = match self.max_depth {
            -1 => None,
            0 => Some(n_features),
            depth => Some(depth as usize),
        };

        let root = build(&set, set_rows(data.rows), Vec::new(), 0, limit, prior_entropy);

        info!(
            "Fitted a tree with {} nodes ({} leaves), depth {}.",
            root.n_nodes(),
            root.n_leaves(),
            root.depth()
        );

        self.is_continuous = is_continuous;
        self.value_counts = Some(value_counts);
        self.prior_entropy = prior_entropy;
        self.root = Some(root);
        Ok(())
    }

    /// Classify a single feature vector.
    ///
    /// The traversal dispatches through at most `n` branch nodes, `n`
    /// being the feature count. A query value with no branch at a node
    /// resolves to that node's majority training class with the
    /// confidence sentinel; a walk that runs past `n` dispatches fails
    /// with [`QuinlanError::TraversalExhausted`] without corrupting the
    /// tree.
    pub fn predict_row(&self, row: &[f64]) -> Result<Prediction, QuinlanError> {
        let root = self.root.as_ref().ok_or(QuinlanError::NotFitted)?;
        let n_features = self.is_continuous.len();
        if row.len() != n_features {
            return Err(QuinlanError::FeatureWidthMismatch(row.len(), n_features));
        }

        let mut node = root;
        let mut steps = 0;
        loop {
            match node {
                Node::Leaf(leaf) => {
                    return Ok(Prediction {
                        class: leaf.class,
                        confidence: FALLBACK_CONFIDENCE,
                    })
                }
                Node::Feature(feature_node) => {
                    if steps == n_features {
                        return Err(QuinlanError::TraversalExhausted(steps));
                    }
                    steps += 1;
                    let value = row[feature_node.feature];
                    let branch = match feature_node.threshold {
                        Some(threshold) => {
                            if value <= threshold {
                                0
                            } else {
                                1
                            }
                        }
                        None => {
                            let key = value.floor();
                            if key < 0.0 {
                                return Ok(fallback(feature_node));
                            }
                            key as usize
                        }
                    };
                    match feature_node.branches.get(&branch) {
                        Some(child) => node = child,
                        None => return Ok(fallback(feature_node)),
                    }
                }
            }
        }
    }

    /// Classify every row of the matrix.
    ///
    /// * `data` - The feature matrix.
    /// * `parallel` - If `true`, rows are classified in parallel using
    ///   Rayon. The fitted tree is read-only during prediction.
    pub fn predict(&self, data: &Matrix<f64>, parallel: bool) -> Result<Vec<Prediction>, QuinlanError> {
        if parallel {
            (0..data.rows)
                .into_par_iter()
                .map(|row| self.predict_row(&data.get_row(row)))
                .collect()
        } else {
            (0..data.rows).map(|row| self.predict_row(&data.get_row(row))).collect()
        }
    }

    /// Number of nodes in the fitted tree, zero before fitting.
    pub fn n_nodes(&self) -> usize {
        self.root.as_ref().map_or(0, Node::n_nodes)
    }

    /// Number of leaves in the fitted tree, zero before fitting.
    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, Node::n_leaves)
    }

    /// Largest count of branch nodes on any root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, Node::depth)
    }

    /// Save the tree to `path` as JSON.
    pub fn save_tree(&self, path: &str) -> Result<(), QuinlanError> {
        let model = self.json_dump()?;
        match fs::write(path, model) {
            Err(e) => Err(QuinlanError::UnableToWrite(e.to_string())),
            Ok(_) => Ok(()),
        }
    }

    /// Dump the tree as a JSON string.
    pub fn json_dump(&self) -> Result<String, QuinlanError> {
        match serde_json::to_string(self) {
            Ok(s) => Ok(s),
            Err(e) => Err(QuinlanError::UnableToWrite(e.to_string())),
        }
    }

    /// Rebuild a tree from a JSON string produced by [`Self::json_dump`].
    pub fn from_json(json_str: &str) -> Result<Self, QuinlanError> {
        match serde_json::from_str(json_str) {
            Ok(tree) => Ok(tree),
            Err(e) => Err(QuinlanError::UnableToRead(e.to_string())),
        }
    }

    /// Load a tree from a JSON file written by [`Self::save_tree`].
    pub fn load_tree(path: &str) -> Result<Self, QuinlanError> {
        match fs::read_to_string(path) {
            Ok(json_str) => Self::from_json(&json_str),
            Err(e) => Err(QuinlanError::UnableToRead(e.to_string())),
        }
    }
}

#[inline]
fn fallback(node: &FeatureNode) -> Prediction {
    Prediction {
        class: node.fallback_class(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

#[inline]
fn set_rows(rows: usize) -> Vec<usize> {
    (0..rows).collect()
}

/// Grow the subtree for one row subset.
///
/// A pure subset terminates immediately as a leaf, whatever features
/// remain. Otherwise the best feature is chosen, and each of its branch
/// values becomes an absent branch (no rows), a leaf (pure rows, or the
/// last permitted level), or a recursive subtree.
fn build(
    set: &TrainingSet,
    rows: Vec<usize>,
    path: Vec<(usize, usize)>,
    depth: usize,
    limit: Option<usize>,
    prior_entropy: f64,
) -> Node {
    if set.is_pure(&rows) {
        let counts = set.class_counts(&rows);
        return Node::Leaf(LeafNode {
            class: set.labels[rows[0]],
            counts,
        });
    }

    let split = best_split(set, &rows, prior_entropy);
    debug!(
        "Depth {depth}: split on feature {} with gain {:.4} over {} rows.",
        split.feature,
        split.gain,
        rows.len()
    );

    // At the last permitted level every branch becomes a leaf, pure or not.
    let stop_here = limit == Some(depth + 1);

    let mut branches = HashMap::new();
    for value in 0..set.value_counts[split.feature] {
        let selected = branch_rows(set, &rows, split.feature, value, split.threshold);
        if selected.is_empty() {
            continue;
        }
        let child = if stop_here {
            let counts = set.class_counts(&selected);
            Node::Leaf(LeafNode {
                class: argmax_counts(&counts),
                counts,
            })
        } else if set.is_pure(&selected) {
            let counts = set.class_counts(&selected);
            Node::Leaf(LeafNode {
                class: set.labels[selected[0]],
                counts,
            })
        } else {
            let mut child_path = path.clone();
            child_path.push((split.feature, value));
            build(set, selected, child_path, depth + 1, limit, prior_entropy)
        };
        branches.insert(value, child);
    }

    Node::Feature(FeatureNode {
        feature: split.feature,
        threshold: split.threshold,
        branches,
        counts: split.counts,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The classic 14-row weather dataset: Outlook {sunny=0, overcast=1,
    /// rain=2}, Temperature {hot=0, mild=1, cool=2}, Humidity {high=0,
    /// normal=1}, Wind {weak=0, strong=1}; label play {no=0, yes=1}.
    fn weather() -> (Vec<f64>, Vec<usize>) {
        let outlook = [0., 0., 1., 2., 2., 2., 1., 0., 0., 2., 0., 1., 1., 2.];
        let temperature = [0., 0., 0., 1., 2., 2., 2., 1., 2., 1., 1., 1., 0., 1.];
        let humidity = [0., 0., 0., 0., 1., 1., 1., 0., 1., 1., 1., 0., 1., 0.];
        let wind = [0., 1., 0., 0., 0., 1., 1., 0., 0., 0., 1., 1., 0., 1.];
        let labels = vec![0, 0, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0];

        let mut data = Vec::with_capacity(4 * 14);
        data.extend_from_slice(&outlook);
        data.extend_from_slice(&temperature);
        data.extend_from_slice(&humidity);
        data.extend_from_slice(&wind);
        (data, labels)
    }

    fn weather_tree() -> DecisionTree {
        DecisionTree::new(2).set_value_counts(vec![3, 3, 2, 2])
    }

    #[test]
    fn test_weather_root_splits_on_outlook() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree();
        tree.fit(&m, &labels).unwrap();

        assert!((tree.prior_entropy - 0.940).abs() < 1e-3);
        match tree.root.as_ref().unwrap() {
            Node::Feature(root) => {
                assert_eq!(root.feature, 0);
                assert_eq!(root.counts, vec![5, 9]);
                assert_eq!(root.threshold, None);
                assert!(root.path.is_empty());
            }
            Node::Leaf(_) => panic!("expected a branch node at the root"),
        }
    }

    #[test]
    fn test_weather_full_tree_classifies_training_rows() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree();
        tree.fit(&m, &labels).unwrap();

        let predictions = tree.predict(&m, false).unwrap();
        let predicted: Vec<usize> = predictions.iter().map(|p| p.class).collect();
        assert_eq!(predicted, labels);
        for p in &predictions {
            assert_eq!(p.confidence, FALLBACK_CONFIDENCE);
        }
        // Outlook at the root, humidity and wind below it, five leaves.
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 5);
        assert_eq!(tree.n_nodes(), 8);
    }

    #[test]
    fn test_weather_parallel_predict_matches_serial() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree();
        tree.fit(&m, &labels).unwrap();

        let serial = tree.predict(&m, false).unwrap();
        let parallel = tree.predict(&m, true).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_pure_training_set_yields_single_leaf() {
        let data = vec![0.0, 1.0, 0.0, 1.0, 0.0];
        let labels = vec![0, 0, 0, 0, 0];
        let m = Matrix::new(&data, 5, 1);
        let mut tree = DecisionTree::new(2);
        tree.fit(&m, &labels).unwrap();

        match tree.root.as_ref().unwrap() {
            Node::Leaf(leaf) => {
                assert_eq!(leaf.class, 0);
                assert_eq!(leaf.counts, vec![5, 0]);
            }
            Node::Feature(_) => panic!("expected a leaf at the root of a pure training set"),
        }
        assert_eq!(tree.predict_row(&[1.0]).unwrap().class, 0);
    }

    #[test]
    fn test_depth_one_forces_leaves_on_impure_branches() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree().set_max_depth(1);
        tree.fit(&m, &labels).unwrap();

        assert_eq!(tree.depth(), 1);
        match tree.root.as_ref().unwrap() {
            Node::Feature(root) => {
                assert_eq!(root.feature, 0);
                assert_eq!(root.branches.len(), 3);
                for (value, child) in &root.branches {
                    assert!(child.is_leaf(), "branch {value} should be a leaf");
                }
                // Sunny is majority no, overcast pure yes, rain majority yes.
                match (&root.branches[&0], &root.branches[&1], &root.branches[&2]) {
                    (Node::Leaf(sunny), Node::Leaf(overcast), Node::Leaf(rain)) => {
                        assert_eq!(sunny.class, 0);
                        assert_eq!(sunny.counts, vec![3, 2]);
                        assert_eq!(overcast.class, 1);
                        assert_eq!(overcast.counts, vec![0, 4]);
                        assert_eq!(rain.class, 1);
                        assert_eq!(rain.counts, vec![2, 3]);
                    }
                    _ => unreachable!(),
                }
            }
            Node::Leaf(_) => panic!("expected a branch node at the root"),
        }
    }

    #[test]
    fn test_depth_bound_holds() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        for max_depth in [1_i64, 2, 3] {
            let mut tree = weather_tree().set_max_depth(max_depth);
            tree.fit(&m, &labels).unwrap();
            assert!(
                tree.depth() <= max_depth as usize,
                "depth {} exceeds bound {max_depth}",
                tree.depth()
            );
        }
    }

    #[test]
    fn test_unconstrained_depth_grows_until_pure() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree().set_max_depth(-1);
        tree.fit(&m, &labels).unwrap();

        let predicted: Vec<usize> = tree.predict(&m, false).unwrap().iter().map(|p| p.class).collect();
        assert_eq!(predicted, labels);
    }

    #[test]
    fn test_unseen_branch_value_falls_back_to_node_majority() {
        let (data, labels) = weather();
        let m = Matrix::new(&data, 14, 4);
        let mut tree = weather_tree();
        tree.fit(&m, &labels).unwrap();

        // Outlook 5 was never observed; the root holds 5 no / 9 yes.
        let p = tree.predict_row(&[5.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.class, 1);
        assert_eq!(p.confidence, FALLBACK_CONFIDENCE);

        // Negative values have no branch key either.
        let p = tree.predict_row(&[-2.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.class, 1);
        assert_eq!(p.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_continuous_threshold_split() {
        let data = vec![65.0, 70.0, 75.0, 80.0, 85.0];
        let labels = vec![0, 0, 1, 1, 1];
        let m = Matrix::new(&data, 5, 1);
        let mut tree = DecisionTree::new(2).set_continuous(vec![true]);
        tree.fit(&m, &labels).unwrap();

        match tree.root.as_ref().unwrap() {
            Node::Feature(root) => {
                assert_eq!(root.feature, 0);
                assert_eq!(root.threshold, Some(72.5));
                assert_eq!(root.branches.len(), 2);
            }
            Node::Leaf(_) => panic!("expected a branch node at the root"),
        }
        assert_eq!(tree.predict_row(&[68.0]).unwrap().class, 0);
        assert_eq!(tree.predict_row(&[72.5]).unwrap().class, 0);
        assert_eq!(tree.predict_row(&[90.0]).unwrap().class, 1);
    }

    #[test]
    fn test_fit_rejects_malformed_input() {
        let data = vec![0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&data, 4, 1);

        let mut tree = DecisionTree::new(2);
        let res = tree.fit(&m, &[0, 1]);
        assert!(matches!(res, Err(QuinlanError::DimensionMismatch(4, 2))));

        let mut tree = DecisionTree::new(2);
        let res = tree.fit(&m, &[0, 1, 2, 0]);
        assert!(matches!(res, Err(QuinlanError::LabelOutOfRange(2, 2, 2))));

        let mut tree = DecisionTree::new(2).set_max_depth(-2);
        let res = tree.fit(&m, &[0, 1, 0, 1]);
        assert!(matches!(res, Err(QuinlanError::InvalidMaxDepth(-2))));

        let mut tree = DecisionTree::new(2).set_value_counts(vec![2, 2]);
        let res = tree.fit(&m, &[0, 1, 0, 1]);
        assert!(matches!(res, Err(QuinlanError::InvalidValueCounts(2, 1))));

        let mut tree = DecisionTree::new(2).set_continuous(vec![true, false]);
        let res = tree.fit(&m, &[0, 1, 0, 1]);
        assert!(matches!(res, Err(QuinlanError::InvalidContinuousFlags(2, 1))));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let tree = DecisionTree::new(2);
        assert!(matches!(tree.predict_row(&[0.0]), Err(QuinlanError::NotFitted)));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let data = vec![0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&data, 4, 1);
        let mut tree = DecisionTree::new(2);
        tree.fit(&m, &[0, 1, 0, 1]).unwrap();

        let res = tree.predict_row(&[0.0, 1.0]);
        assert!(matches!(res, Err(QuinlanError::FeatureWidthMismatch(2, 1))));
    }

    #[test]
    fn test_traversal_exhausted_on_malformed_tree() {
        // A hand-built chain of two branch nodes over a single feature
        // can never resolve within one dispatch.
        let inner = Node::Feature(FeatureNode {
            feature: 0,
            threshold: None,
            branches: {
                let mut b = HashMap::new();
                b.insert(
                    0,
                    Node::Leaf(LeafNode {
                        class: 0,
                        counts: vec![1, 0],
                    }),
                );
                b
            },
            counts: vec![1, 0],
            path: vec![(0, 0)],
        });
        let mut branches = HashMap::new();
        branches.insert(0, inner);
        let tree = DecisionTree {
            n_classes: 2,
            is_continuous: vec![false],
            value_counts: Some(vec![2]),
            max_depth: 0,
            root: Some(Node::Feature(FeatureNode {
                feature: 0,
                threshold: None,
                branches,
                counts: vec![1, 0],
                path: Vec::new(),
            })),
            prior_entropy: 0.0,
        };

        let res = tree.predict_row(&[0.0]);
        assert!(matches!(res, Err(QuinlanError::TraversalExhausted(1))));
    }

    #[test]
    fn test_json_round_trip() {
        let data = vec![65.0, 70.0, 75.0, 80.0, 85.0];
        let labels = vec![0, 0, 1, 1, 1];
        let m = Matrix::new(&data, 5, 1);
        let mut tree = DecisionTree::new(2).set_continuous(vec![true]);
        tree.fit(&m, &labels).unwrap();

        let restored = DecisionTree::from_json(&tree.json_dump().unwrap()).unwrap();
        assert_eq!(restored.n_nodes(), tree.n_nodes());
        assert_eq!(restored.prior_entropy, tree.prior_entropy);
        assert_eq!(restored.predict(&m, false).unwrap(), tree.predict(&m, false).unwrap());
    }
}
