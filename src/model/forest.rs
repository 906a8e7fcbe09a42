//! Random forest classifier evaluated from a scikit-learn JSON export.
//!
//! Each tree is the flat array form of `tree_`: `children_left`,
//! `children_right`, `feature`, `threshold` and per-node class weights in
//! `value`. A node is a leaf when both children are `-1`.

use super::Classifier;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const LEAF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        let n = self.children_left.len();
        if n == 0 {
            return Err("tree has no nodes".into());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err("node arrays differ in length".into());
        }
        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {} has exactly one child", node));
                }
                let weights = &self.value[node];
                if weights.len() != n_classes {
                    return Err(format!(
                        "leaf {} has {} class weights, forest has {} classes",
                        node,
                        weights.len(),
                        n_classes
                    ));
                }
                let total: f64 = weights.iter().sum();
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) || total <= 0.0 {
                    return Err(format!("leaf {} has invalid class weights", node));
                }
                continue;
            }
            // Pre-order layout: children always follow their parent, so traversal terminates
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(format!("node {} has out-of-order child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {} splits on feature {} of {}", node, feature, n_features));
            }
            if self.threshold[node].is_nan() {
                return Err(format!("node {} has NaN threshold", node));
            }
        }
        Ok(())
    }

    fn leaf_for(&self, features: &[f64]) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            // scikit-learn evaluates trees on float32 inputs
            let x = features[self.feature[node] as usize] as f32 as f64;
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Normalized class distribution at the leaf reached by `features`.
    /// `features` must cover every index the tree splits on.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let weights = &self.value[self.leaf_for(features)];
        let total: f64 = weights.iter().sum();
        weights.iter().map(|w| w / total).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ForestDocument {
    n_features: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_names: Option<Vec<String>>,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ForestDocument", into = "ForestDocument")]
pub struct RandomForest {
    n_features: usize,
    feature_names: Option<Vec<String>>,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(
        n_features: usize,
        feature_names: Option<Vec<String>>,
        classes: Vec<i64>,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, ArtifactError> {
        if n_features == 0 {
            return Err(ArtifactError::invalid("classifier", "n_features is zero"));
        }
        if let Some(names) = &feature_names {
            if names.len() != n_features {
                return Err(ArtifactError::invalid(
                    "classifier",
                    format!("{} feature names for {} features", names.len(), n_features),
                ));
            }
        }
        if classes.is_empty() {
            return Err(ArtifactError::invalid("classifier", "no classes"));
        }
        let unique: HashSet<_> = classes.iter().collect();
        if unique.len() != classes.len() {
            return Err(ArtifactError::invalid("classifier", "duplicate class ids"));
        }
        if trees.is_empty() {
            return Err(ArtifactError::invalid("classifier", "forest has no trees"));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(n_features, classes.len())
                .map_err(|e| ArtifactError::invalid("classifier", format!("tree {}: {}", i, e)))?;
        }
        Ok(Self {
            n_features,
            feature_names,
            classes,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Mean of per-tree leaf distributions.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        if features.len() != self.n_features {
            return Vec::new();
        }
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    fn n_estimators(&self) -> Option<usize> {
        Some(self.trees.len())
    }
}

impl TryFrom<ForestDocument> for RandomForest {
    type Error = ArtifactError;

    fn try_from(doc: ForestDocument) -> Result<Self, Self::Error> {
        RandomForest::new(doc.n_features, doc.feature_names, doc.classes, doc.trees)
    }
}

impl From<RandomForest> for ForestDocument {
    fn from(forest: RandomForest) -> Self {
        ForestDocument {
            n_features: forest.n_features,
            feature_names: forest.feature_names,
            classes: forest.classes,
            trees: forest.trees,
        }
    }
}
