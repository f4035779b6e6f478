//! Least-squares regression tree used as the boosting weak learner.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Stopping rules for tree growth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// Maximum depth (a root-only tree has depth 0).
    pub max_depth: usize,
    /// Minimum rows required to split a node.
    pub min_samples_split: usize,
    /// Minimum rows required in each child.
    pub min_samples_leaf: usize,
}

/// Tree node stored in a flat arena; children are indices into `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Best split found for a node.
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Binary regression tree minimizing the sum of squared errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Grow a tree on the given rows, considering only `columns` for splits.
    ///
    /// `rows` and `columns` index into `features`; the caller guarantees they
    /// are in bounds and that `rows` is non-empty.
    pub fn fit(
        features: &[Vec<f64>],
        targets: &[f64],
        rows: &[usize],
        columns: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(features, targets, rows.to_vec(), columns, params, 0);
        tree
    }

    /// Predict a single row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Check the node arena of a decoded tree against the model width.
    ///
    /// Trees are grown pre-order, so every child index lies after its parent
    /// and inside the arena. This rules out dangling and cyclic links.
    pub fn validate(&self, width: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ForecastError::Serialization(
                "regression tree has no nodes".to_string(),
            ));
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= width {
                    return Err(ForecastError::Serialization(format!(
                        "node {idx} splits on feature {feature}, model has {width}"
                    )));
                }
                for child in [*left, *right] {
                    if child <= idx || child >= len {
                        return Err(ForecastError::Serialization(format!(
                            "node {idx} links to child {child} outside {}..{len}",
                            idx + 1
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        self.depth_from(0)
    }

    /// Number of leaves.
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    fn depth_from(&self, idx: usize) -> usize {
        match &self.nodes[idx] {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => {
                1 + self.depth_from(*left).max(self.depth_from(*right))
            }
        }
    }

    fn grow(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        rows: Vec<usize>,
        columns: &[usize],
        params: &TreeParams,
        depth: usize,
    ) -> usize {
        let idx = self.nodes.len();
        let n = rows.len();
        let mean = rows.iter().map(|&r| targets[r]).sum::<f64>() / n as f64;
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= params.max_depth
            || n < params.min_samples_split
            || n < 2 * params.min_samples_leaf
        {
            return idx;
        }

        let Some(split) = best_split(features, targets, &rows, columns, params) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| features[r][split.feature] <= split.threshold);

        let left = self.grow(features, targets, left_rows, columns, params, depth + 1);
        let right = self.grow(features, targets, right_rows, columns, params, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }
}

/// Exhaustive search over midpoints between distinct sorted values.
///
/// Gain is the reduction in squared error; ties keep the first candidate in
/// column order so growth is deterministic.
fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    rows: &[usize],
    columns: &[usize],
    params: &TreeParams,
) -> Option<SplitCandidate> {
    let n = rows.len();
    let total: f64 = rows.iter().map(|&r| targets[r]).sum();
    let parent_score = total * total / n as f64;
    let min_leaf = params.min_samples_leaf.max(1);

    let mut best: Option<SplitCandidate> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for &feature in columns {
        pairs.clear();
        pairs.extend(rows.iter().map(|&r| (features[r][feature], targets[r])));
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let (x, next_x) = (pairs[i].0, pairs[i + 1].0);
            if x >= next_x {
                continue;
            }
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf || n_right < min_leaf {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64
                + right_sum * right_sum / n_right as f64
                - parent_score;

            if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                let mut threshold = 0.5 * (x + next_x);
                if threshold >= next_x {
                    threshold = x;
                }
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    gain,
                });
            }
        }
    }

    best
}
