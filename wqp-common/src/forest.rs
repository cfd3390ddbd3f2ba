//! Quality Predictor: tree-ensemble inference
//!
//! A random forest is stored as flat per-tree node arrays, the layout the
//! training pipeline exports:
//! - `children_left[i]` / `children_right[i]`: child node indices, `-1` at leaves
//! - `feature[i]` / `threshold[i]`: split rule `x[feature] <= threshold` goes left
//! - `value[i]`: class counts (classifier) or `[mean]` (regressor) at leaves
//!
//! The arrays are validated once at construction and converted to an
//! internal node form, so traversal at request time cannot index out of
//! bounds or loop.

use serde::{Deserialize, Serialize};

use crate::scaling::ScaledVector;
use crate::tier::QualityScore;
use crate::{Error, Result};

/// Leaf marker in `children_left` / `children_right`
pub const TREE_LEAF: i64 = -1;

/// A fitted model mapping a scaled vector to a quality score
///
/// Implementations are immutable after construction and safe to share across
/// threads without locking.
pub trait QualityPredictor: Send + Sync {
    /// Width of the vectors the model was fitted on
    fn n_features(&self) -> usize;

    /// Score one vector
    ///
    /// Total over vectors of the fitted width; fails only with
    /// `Error::SchemaMismatch` on a width mismatch.
    fn predict(&self, vector: &ScaledVector) -> Result<QualityScore>;
}

/// How leaf values are combined across trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForestTask {
    /// Average per-tree class distributions, emit the most probable label
    Classifier,
    /// Average per-tree leaf means
    Regressor,
}

/// One tree as exported by the training pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        output: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Validate exported arrays and build the node form
    ///
    /// `width` is the expected length of each leaf value. Classifier leaves
    /// are normalized to probabilities here.
    fn from_arrays(
        tree: &DecisionTree,
        n_features: usize,
        width: usize,
        task: ForestTask,
    ) -> std::result::Result<Self, String> {
        let n = tree.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        let lengths = [
            tree.children_right.len(),
            tree.feature.len(),
            tree.threshold.len(),
            tree.value.len(),
        ];
        if lengths.iter().any(|len| *len != n) {
            return Err(format!(
                "node arrays disagree in length: children_left={}, children_right={}, feature={}, threshold={}, value={}",
                n, lengths[0], lengths[1], lengths[2], lengths[3]
            ));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let (left, right) = (tree.children_left[i], tree.children_right[i]);

            if left == TREE_LEAF || right == TREE_LEAF {
                if left != right {
                    return Err(format!("node {} has exactly one child", i));
                }
                nodes.push(Node::Leaf {
                    output: leaf_output(&tree.value[i], width, task).map_err(|e| format!("node {}: {}", i, e))?,
                });
                continue;
            }

            let child_in_range = |c: i64| c > i as i64 && (c as usize) < n;
            if !child_in_range(left) || !child_in_range(right) {
                return Err(format!(
                    "node {} children ({}, {}) must follow it and lie within {} nodes",
                    i, left, right, n
                ));
            }

            let feature = tree.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!(
                    "node {} splits on feature {} outside 0..{}",
                    i, feature, n_features
                ));
            }

            let threshold = tree.threshold[i];
            if threshold.is_nan() {
                return Err(format!("node {} has a NaN threshold", i));
            }

            nodes.push(Node::Split {
                feature: feature as usize,
                threshold,
                left: left as usize,
                right: right as usize,
            });
        }

        Ok(Tree { nodes })
    }

    fn leaf(&self, x: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { output } => return output,
            }
        }
    }
}

fn leaf_output(value: &[f64], width: usize, task: ForestTask) -> std::result::Result<Vec<f64>, String> {
    if value.len() != width {
        return Err(format!("leaf value has {} entries, expected {}", value.len(), width));
    }
    if value.iter().any(|v| !v.is_finite()) {
        return Err("leaf value is not finite".to_string());
    }

    match task {
        ForestTask::Regressor => Ok(value.to_vec()),
        ForestTask::Classifier => {
            if value.iter().any(|v| *v < 0.0) {
                return Err("classifier leaf has a negative class weight".to_string());
            }
            let total: f64 = value.iter().sum();
            if total > 0.0 {
                Ok(value.iter().map(|v| v / total).collect())
            } else {
                Ok(vec![0.0; width])
            }
        }
    }
}

/// Random-forest ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct ForestModel {
    task: ForestTask,
    n_features: usize,
    classes: Vec<f64>,
    trees: Vec<Tree>,
}

impl ForestModel {
    /// Validate and assemble a forest
    ///
    /// # Errors
    /// `Error::InvalidParameters` describing the first structural defect found
    pub fn new(
        task: ForestTask,
        n_features: usize,
        classes: Vec<f64>,
        trees: &[DecisionTree],
    ) -> Result<Self> {
        if n_features == 0 {
            return Err(Error::InvalidParameters("forest declares zero features".to_string()));
        }
        if trees.is_empty() {
            return Err(Error::InvalidParameters("forest has no trees".to_string()));
        }

        let width = match task {
            ForestTask::Classifier => {
                if classes.is_empty() {
                    return Err(Error::InvalidParameters("classifier has no class labels".to_string()));
                }
                if classes.iter().any(|c| !c.is_finite()) {
                    return Err(Error::InvalidParameters("class labels must be finite".to_string()));
                }
                classes.len()
            }
            ForestTask::Regressor => {
                if !classes.is_empty() {
                    return Err(Error::InvalidParameters("regressor must not declare class labels".to_string()));
                }
                1
            }
        };

        let trees = trees
            .iter()
            .enumerate()
            .map(|(i, tree)| {
                Tree::from_arrays(tree, n_features, width, task)
                    .map_err(|reason| Error::InvalidParameters(format!("tree {}: {}", i, reason)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            task,
            n_features,
            classes,
            trees,
        })
    }

    pub fn task(&self) -> ForestTask {
        self.task
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Mean class probabilities across trees (classifier only)
    pub fn predict_proba(&self, x: &[f64]) -> Option<Vec<f64>> {
        if self.task != ForestTask::Classifier || x.len() != self.n_features {
            return None;
        }

        let mut acc = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (sum, p) in acc.iter_mut().zip(tree.leaf(x)) {
                *sum += p;
            }
        }
        let n = self.trees.len() as f64;
        Some(acc.into_iter().map(|sum| sum / n).collect())
    }

    /// Raw ensemble output before integer conversion
    ///
    /// Classifier: label of the first class with the highest mean probability.
    /// Regressor: mean of the leaf values.
    pub fn predict_raw(&self, x: &[f64]) -> Result<f64> {
        if x.len() != self.n_features {
            return Err(Error::width_mismatch("quality predictor", self.n_features, x.len()));
        }

        match self.task {
            ForestTask::Classifier => {
                let proba = self.predict_proba(x).unwrap_or_default();
                let mut best = 0;
                for (i, p) in proba.iter().enumerate() {
                    if *p > proba[best] {
                        best = i;
                    }
                }
                Ok(self.classes[best])
            }
            ForestTask::Regressor => {
                // Scale before summing so large finite leaves cannot overflow
                let n = self.trees.len() as f64;
                let mean: f64 = self.trees.iter().map(|tree| tree.leaf(x)[0] / n).sum();
                if !mean.is_finite() {
                    return Err(Error::InvalidParameters(format!(
                        "regressor output is not finite: {}",
                        mean
                    )));
                }
                Ok(mean)
            }
        }
    }
}

impl QualityPredictor for ForestModel {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, vector: &ScaledVector) -> Result<QualityScore> {
        self.predict_raw(vector.as_slice()).map(QualityScore::from_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// x[0] <= 0.0 → leaf 1, else leaf 2
    fn stump(left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![0.0, -2.0, -2.0],
            value: vec![vec![0.0; left.len()], left, right],
        }
    }

    fn leaf_only(value: Vec<f64>) -> DecisionTree {
        DecisionTree {
            children_left: vec![-1],
            children_right: vec![-1],
            feature: vec![-2],
            threshold: vec![-2.0],
            value: vec![value],
        }
    }

    #[test]
    fn test_classifier_votes_by_mean_probability() {
        let trees = vec![
            stump(vec![8.0, 2.0, 0.0], vec![0.0, 1.0, 9.0]),
            stump(vec![6.0, 4.0, 0.0], vec![0.0, 6.0, 4.0]),
        ];
        let model = ForestModel::new(ForestTask::Classifier, 2, vec![4.0, 5.0, 7.0], &trees).unwrap();

        assert_eq!(model.predict_raw(&[-1.0, 0.0]).unwrap(), 4.0);
        assert_eq!(model.predict_raw(&[1.0, 0.0]).unwrap(), 7.0);

        let proba = model.predict_proba(&[1.0, 0.0]).unwrap();
        assert!((proba[1] - 0.35).abs() < 1e-12);
        assert!((proba[2] - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_split_goes_left_on_equal_threshold() {
        let trees = vec![stump(vec![1.0, 0.0], vec![0.0, 1.0])];
        let model = ForestModel::new(ForestTask::Classifier, 1, vec![3.0, 8.0], &trees).unwrap();
        assert_eq!(model.predict_raw(&[0.0]).unwrap(), 3.0);
        assert_eq!(model.predict_raw(&[1e-9]).unwrap(), 8.0);
    }

    #[test]
    fn test_classifier_tie_takes_first_class() {
        let trees = vec![leaf_only(vec![5.0, 5.0])];
        let model = ForestModel::new(ForestTask::Classifier, 1, vec![6.0, 7.0], &trees).unwrap();
        assert_eq!(model.predict_raw(&[0.0]).unwrap(), 6.0);
    }

    #[test]
    fn test_regressor_output_truncates() {
        let trees = vec![leaf_only(vec![6.5]), leaf_only(vec![7.3])];
        let model = ForestModel::new(ForestTask::Regressor, 1, vec![], &trees).unwrap();

        assert!((model.predict_raw(&[0.0]).unwrap() - 6.9).abs() < 1e-12);
        let score = model.predict(&ScaledVector::from(vec![0.0])).unwrap();
        assert_eq!(score, QualityScore(6));
    }

    #[test]
    fn test_regressor_mean_of_huge_leaves_stays_finite() {
        let trees = vec![leaf_only(vec![f64::MAX]), leaf_only(vec![f64::MAX])];
        let model = ForestModel::new(ForestTask::Regressor, 1, vec![], &trees).unwrap();

        let raw = model.predict_raw(&[0.0]).unwrap();
        assert!(raw.is_finite());
        assert_eq!(raw, f64::MAX);

        let trees = vec![leaf_only(vec![f64::MAX]), leaf_only(vec![-f64::MAX])];
        let model = ForestModel::new(ForestTask::Regressor, 1, vec![], &trees).unwrap();
        assert_eq!(model.predict_raw(&[0.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_negative_regression_truncates_toward_zero() {
        let trees = vec![leaf_only(vec![-0.5])];
        let model = ForestModel::new(ForestTask::Regressor, 1, vec![], &trees).unwrap();
        assert_eq!(model.predict(&ScaledVector::from(vec![3.0])).unwrap(), QualityScore(0));
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let trees = vec![stump(vec![1.0], vec![1.0])];
        let model = ForestModel::new(ForestTask::Classifier, 3, vec![5.0], &trees).unwrap();

        let err = model.predict(&ScaledVector::from(vec![0.0, 0.0])).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert!(model.predict_proba(&[0.0]).is_none());
    }

    #[test]
    fn test_rejects_cycle_and_out_of_range_children() {
        let mut cyclic = stump(vec![1.0], vec![1.0]);
        cyclic.children_left[0] = 0;
        let err = ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[cyclic]).unwrap_err();
        assert!(err.to_string().contains("tree 0"));

        let mut dangling = stump(vec![1.0], vec![1.0]);
        dangling.children_right[0] = 9;
        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[dangling]).is_err());
    }

    #[test]
    fn test_rejects_bad_feature_and_leaf_width() {
        let mut bad_feature = stump(vec![1.0], vec![1.0]);
        bad_feature.feature[0] = 4;
        assert!(ForestModel::new(ForestTask::Classifier, 2, vec![5.0], &[bad_feature]).is_err());

        let wide_leaf = stump(vec![1.0, 2.0], vec![1.0, 2.0]);
        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[wide_leaf]).is_err());
    }

    #[test]
    fn test_rejects_mismatched_arrays_and_empty_forest() {
        let mut short = stump(vec![1.0], vec![1.0]);
        short.threshold.pop();
        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[short]).is_err());

        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[]).is_err());
        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![], &[leaf_only(vec![])]).is_err());
        assert!(ForestModel::new(ForestTask::Regressor, 1, vec![5.0], &[leaf_only(vec![5.0])]).is_err());
    }

    #[test]
    fn test_half_leaf_is_rejected() {
        let mut tree = stump(vec![1.0], vec![1.0]);
        tree.children_right[0] = -1;
        assert!(ForestModel::new(ForestTask::Classifier, 1, vec![5.0], &[tree]).is_err());
    }
}
