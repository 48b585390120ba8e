//! Seeded isolation forest for unsupervised outlier scoring.
//!
//! Follows the standard formulation: random trees isolate points by
//! recursive random axis-aligned splits, anomalies have short average path
//! lengths. The decision function matches the common library convention of
//! negated anomaly score minus a contamination-percentile offset, so it is
//! positive for inliers and negative for outliers.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Forest hyperparameters. Fixed seed keeps training reproducible.
#[derive(Debug, Clone, Deserialize)]
pub struct ForestParams {
    /// Expected fraction of outliers in the training data
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_trees")]
    pub trees: usize,

    /// Subsample size per tree, capped at the training-set size
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

fn default_contamination() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    42
}

fn default_trees() -> usize {
    100
}

fn default_max_samples() -> usize {
    256
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            contamination: default_contamination(),
            seed: default_seed(),
            trees: default_trees(),
            max_samples: default_max_samples(),
        }
    }
}

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

impl Tree {
    fn grow(data: &[Vec<f64>], indices: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut nodes = Vec::new();
        let root = build_node(&mut nodes, data, indices, 0, height_limit, rng);
        Self { nodes, root }
    }

    fn path_length(&self, sample: &[f64]) -> f64 {
        let mut node = self.root;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    data: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> usize {
    if depth >= height_limit || indices.len() <= 1 {
        nodes.push(Node::Leaf {
            size: indices.len(),
        });
        return nodes.len() - 1;
    }

    let dims = data[indices[0]].len();

    // Pick a random feature with spread; all-constant partitions terminate.
    let mut split = None;
    for _ in 0..dims {
        let feature = rng.gen_range(0..dims);
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &i in &indices {
            let v = data[i][feature];
            min = min.min(v);
            max = max.max(v);
        }
        if max > min {
            split = Some((feature, rng.gen_range(min..max)));
            break;
        }
    }

    let Some((feature, threshold)) = split else {
        nodes.push(Node::Leaf {
            size: indices.len(),
        });
        return nodes.len() - 1;
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| data[i][feature] < threshold);

    let left = build_node(nodes, data, left_idx, depth + 1, height_limit, rng);
    let right = build_node(nodes, data, right_idx, depth + 1, height_limit, rng);
    nodes.push(Node::Split {
        feature,
        threshold,
        left,
        right,
    });
    nodes.len() - 1
}

/// Average unsuccessful-search path length in a binary search tree of `n`
/// nodes; the normalization constant of the isolation-forest score.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
}

/// Linear-interpolation percentile over a sorted copy of `values`.
fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
    }
}

/// A fitted forest. Immutable once trained.
pub struct IsolationForest {
    trees: Vec<Tree>,
    subsample: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on a non-empty feature matrix. Trees draw subsamples without
    /// replacement; the decision offset is the contamination percentile of
    /// the training scores.
    pub fn fit(data: &[Vec<f64>], params: &ForestParams) -> Self {
        debug_assert!(!data.is_empty(), "fit requires at least one sample");

        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = data.len();
        let subsample = params.max_samples.min(n).max(1);
        let height_limit = (subsample as f64).log2().ceil().max(0.0) as usize;

        let trees = (0..params.trees.max(1))
            .map(|_| {
                let indices = if subsample < n {
                    sample(&mut rng, n, subsample).into_vec()
                } else {
                    (0..n).collect()
                };
                Tree::grow(data, indices, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample,
            offset: 0.0,
        };
        let train_scores: Vec<f64> = data.iter().map(|x| forest.score_sample(x)).collect();
        forest.offset = percentile(&train_scores, params.contamination * 100.0);
        forest
    }

    /// Negated anomaly score in [-1, 0]; lower means more anomalous.
    pub fn score_sample(&self, sample: &[f64]) -> f64 {
        let normalizer = average_path_length(self.subsample);
        if normalizer <= 0.0 {
            // degenerate single-sample subsample: every point isolates at once
            return -1.0;
        }
        let mean_depth: f64 = self
            .trees
            .iter()
            .map(|t| t.path_length(sample))
            .sum::<f64>()
            / self.trees.len() as f64;
        -(2f64.powf(-mean_depth / normalizer))
    }

    /// Signed decision value: positive for inliers, negative for outliers.
    pub fn decision_function(&self, sample: &[f64]) -> f64 {
        self.score_sample(sample) - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A tight cluster around the origin plus deterministic jitter.
    fn cluster(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let j = (i % 17) as f64 / 17.0 - 0.5;
                let k = (i % 11) as f64 / 11.0 - 0.5;
                vec![j, k]
            })
            .collect()
    }

    #[test]
    fn test_outlier_scores_below_inlier_scores() {
        let data = cluster(300);
        let forest = IsolationForest::fit(&data, &ForestParams::default());

        let inlier = forest.score_sample(&[0.0, 0.0]);
        let outlier = forest.score_sample(&[25.0, -25.0]);
        assert!(
            outlier < inlier,
            "outlier {outlier} should score below inlier {inlier}"
        );
        assert!(forest.decision_function(&[25.0, -25.0]) < 0.0);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let data = cluster(200);
        let params = ForestParams::default();
        let a = IsolationForest::fit(&data, &params);
        let b = IsolationForest::fit(&data, &params);

        for sample in [[0.1, 0.2], [5.0, 5.0], [-3.0, 0.4]] {
            assert_eq!(a.decision_function(&sample), b.decision_function(&sample));
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let data = cluster(200);
        let a = IsolationForest::fit(&data, &ForestParams::default());
        let b = IsolationForest::fit(
            &data,
            &ForestParams {
                seed: 7,
                ..ForestParams::default()
            },
        );
        // same data, different trees: scores almost surely differ
        assert_ne!(
            a.decision_function(&[0.3, 0.3]),
            b.decision_function(&[0.3, 0.3])
        );
    }

    #[test]
    fn test_decision_is_bounded() {
        let data = cluster(100);
        let forest = IsolationForest::fit(&data, &ForestParams::default());
        for sample in [[0.0, 0.0], [100.0, 100.0]] {
            let d = forest.decision_function(&sample);
            assert!(d.is_finite());
            assert!((-1.0..=1.0).contains(&d));
        }
    }

    #[test]
    fn test_single_sample_training_set() {
        let data = vec![vec![1.0, 2.0]];
        let forest = IsolationForest::fit(&data, &ForestParams::default());
        assert!(forest.decision_function(&[1.0, 2.0]).is_finite());
    }

    #[test]
    fn test_percentile_interpolation() {
        let values = vec![0.0, 1.0, 2.0, 3.0];
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 3.0);
        assert_eq!(percentile(&values, 50.0), 1.5);
    }
}
