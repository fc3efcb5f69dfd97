//! CART decision trees and a bagged random forest for binary classification

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all of them
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Settings for a bagged ensemble
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeParams::default(),
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Share of positive training samples that reached this leaf
        positive_fraction: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary classification tree; samples with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct Grower<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
    params: &'a TreeParams,
    n_features: usize,
    max_features: usize,
}

impl DecisionTree {
    /// Fit a tree on every row of the dataset
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &TreeParams, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::fit_on(rows, labels, (0..rows.len()).collect(), params, &mut rng)
    }

    /// Fit a tree on the given sample indices (repeats allowed)
    fn fit_on(
        rows: &[Vec<f64>],
        labels: &[u8],
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        let max_features = params
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        let grower = Grower {
            rows,
            labels,
            params,
            n_features,
            max_features,
        };

        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
        };
        tree.grow(&grower, indices, 0, rng);
        tree
    }

    fn grow(&mut self, g: &Grower<'_>, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> usize {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| g.labels[i] == 1).count();
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive_fraction: positives as f64 / n.max(1) as f64,
            samples: n,
        });

        if depth >= g.params.max_depth
            || n < g.params.min_samples_split
            || positives == 0
            || positives == n
            || g.n_features == 0
        {
            return id;
        }

        let candidates = sample(rng, g.n_features, g.n_features).into_vec();
        let Some((feature, threshold)) = best_split(g, &indices, positives, &candidates) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| g.rows[i][feature] <= threshold);

        let left = self.grow(g, left_idx, depth + 1, rng);
        let right = self.grow(g, right_idx, depth + 1, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Positive-class probability for one sample
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes.get(id) {
                Some(Node::Leaf {
                    positive_fraction, ..
                }) => return *positive_fraction,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    id = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                None => return 0.5,
            }
        }
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Check the node graph of a decoded tree.
    ///
    /// Children always sit after their parent, so this also rules out cycles.
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (id, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf {
                    positive_fraction, ..
                } => {
                    if !(0.0..=1.0).contains(&positive_fraction) {
                        return Err(format!(
                            "node {id}: leaf probability {positive_fraction} outside [0, 1]"
                        ));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= self.n_features {
                        return Err(format!(
                            "node {id}: split feature {feature} out of range for {} features",
                            self.n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {id}: threshold {threshold} is not finite"));
                    }
                    for child in [left, right] {
                        if child <= id || child >= self.nodes.len() {
                            return Err(format!("node {id}: child index {child} out of order"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, counted in edges
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes.get(id) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

/// Lowest weighted Gini split, if any improves on the parent.
///
/// Features are visited in `candidates` order until `max_features` non-constant
/// ones have been evaluated; constant features do not count towards the limit.
fn best_split(
    g: &Grower<'_>,
    indices: &[usize],
    positives: usize,
    candidates: &[usize],
) -> Option<(usize, f64)> {
    let n = indices.len();
    let min_leaf = g.params.min_samples_leaf.max(1);
    let mut best_impurity = gini(positives, n) - 1e-12;
    let mut best = None;
    let mut sorted = indices.to_vec();
    let mut evaluated = 0;

    for &feature in candidates {
        if evaluated >= g.max_features {
            break;
        }
        sorted.sort_by(|&a, &b| g.rows[a][feature].total_cmp(&g.rows[b][feature]));
        if g.rows[sorted[0]][feature] == g.rows[sorted[n - 1]][feature] {
            continue;
        }
        evaluated += 1;

        let mut left_pos = 0;
        for i in 0..n - 1 {
            left_pos += usize::from(g.labels[sorted[i]] == 1);
            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < min_leaf || right_n < min_leaf {
                continue;
            }

            let value = g.rows[sorted[i]][feature];
            let next = g.rows[sorted[i + 1]][feature];
            if value == next {
                continue;
            }

            let impurity = (left_n as f64 * gini(left_pos, left_n)
                + right_n as f64 * gini(positives - left_pos, right_n))
                / n as f64;

            if impurity < best_impurity {
                best_impurity = impurity;
                let mid = value + (next - value) / 2.0;
                let threshold = if mid < next { mid } else { value };
                best = Some((feature, threshold));
            }
        }
    }

    best
}

/// Bagged ensemble of CART trees; the probability is the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit `n_estimators` trees on bootstrap samples.
    ///
    /// Unless set, each split considers `round(sqrt(n_features))` features.
    /// Tree `t` draws from its own generator seeded with `seed + t`.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], params: &ForestParams) -> Self {
        let n = rows.len();
        let n_features = rows.first().map(Vec::len).unwrap_or(0);

        let mut tree_params = params.tree;
        if tree_params.max_features.is_none() {
            tree_params.max_features = Some(((n_features as f64).sqrt().round() as usize).max(1));
        }

        let trees = (0..params.n_estimators)
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::fit_on(rows, labels, bootstrap, &tree_params, &mut rng)
            })
            .collect();

        Self { trees, n_features }
    }

    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.5;
        }
        let sum: f64 = self.trees.iter().map(|t| t.predict_proba(features)).sum();
        sum / self.trees.len() as f64
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Check every tree of a decoded forest
    pub fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.n_features() != self.n_features {
                return Err(format!(
                    "tree {t} expects {} features, forest expects {}",
                    tree.n_features(),
                    self.n_features
                ));
            }
            tree.validate().map_err(|e| format!("tree {t}: {e}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label is 1 when the first feature exceeds 5; the second is noise.
    fn threshold_data() -> (Vec<Vec<f64>>, Vec<u8>) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 10) as f64, ((i * 7) % 3) as f64])
            .collect();
        let labels = rows.iter().map(|r| u8::from(r[0] > 5.0)).collect();
        (rows, labels)
    }

    #[test]
    fn test_tree_learns_threshold() {
        let (rows, labels) = threshold_data();
        let tree = DecisionTree::fit(&rows, &labels, &TreeParams::default(), 7);

        assert_eq!(tree.n_features(), 2);
        assert_eq!(tree.predict_proba(&[9.0, 0.0]), 1.0);
        assert_eq!(tree.predict_proba(&[1.0, 2.0]), 0.0);
        assert_eq!(tree.predict_proba(&[5.0, 1.0]), 0.0);
        assert_eq!(tree.predict_proba(&[6.0, 1.0]), 1.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_tree_respects_max_depth() {
        let rows: Vec<Vec<f64>> = (0..64).map(|i| vec![i as f64]).collect();
        // alternating labels force deep trees
        let labels: Vec<u8> = (0..64).map(|i| (i % 2) as u8).collect();
        let params = TreeParams {
            max_depth: 3,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&rows, &labels, &params, 1);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_pure_node_is_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let labels = vec![1, 1, 1];
        let tree = DecisionTree::fit(&rows, &labels, &TreeParams::default(), 0);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_proba(&[100.0]), 1.0);
    }

    #[test]
    fn test_forest_separates_classes() {
        let (rows, labels) = threshold_data();
        let params = ForestParams {
            n_estimators: 25,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &params);

        assert_eq!(forest.n_estimators(), 25);
        assert!(forest.predict_proba(&[9.0, 1.0]) > 0.7);
        assert!(forest.predict_proba(&[0.0, 1.0]) < 0.3);
    }

    #[test]
    fn test_forest_is_deterministic_per_seed() {
        let (rows, labels) = threshold_data();
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&rows, &labels, &params);
        let b = RandomForest::fit(&rows, &labels, &params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_probability_in_unit_interval() {
        let (rows, labels) = threshold_data();
        let forest = RandomForest::fit(&rows, &labels, &ForestParams::default());
        for x in 0..10 {
            let p = forest.predict_proba(&[x as f64, 0.0]);
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_fitted_models_validate() {
        let (rows, labels) = threshold_data();
        let tree = DecisionTree::fit(&rows, &labels, &TreeParams::default(), 7);
        assert!(tree.validate().is_ok());

        let params = ForestParams {
            n_estimators: 5,
            ..ForestParams::default()
        };
        assert!(RandomForest::fit(&rows, &labels, &params).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_split_rejected() {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 40,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    positive_fraction: 0.0,
                    samples: 1,
                },
                Node::Leaf {
                    positive_fraction: 1.0,
                    samples: 1,
                },
            ],
            n_features: 13,
        };
        let err = tree.validate().unwrap_err();
        assert!(err.contains("feature 40"), "{err}");
    }

    #[test]
    fn test_cyclic_children_rejected() {
        let tree = DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 0,
                    right: 1,
                },
                Node::Leaf {
                    positive_fraction: 1.0,
                    samples: 1,
                },
            ],
            n_features: 1,
        };
        assert!(tree.validate().is_err());

        let dangling = DecisionTree {
            nodes: vec![Node::Split {
                feature: 0,
                threshold: 0.5,
                left: 1,
                right: 2,
            }],
            n_features: 1,
        };
        assert!(dangling.validate().is_err());
    }

    #[test]
    fn test_empty_forest_rejected() {
        let forest = RandomForest {
            trees: Vec::new(),
            n_features: 13,
        };
        assert!(forest.validate().is_err());
    }
}
