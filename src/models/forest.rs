//! Random-forest classifier: bagged CART trees with per-split feature sampling.

use crate::error::{PipelineError, Result};
use crate::models::aggregator::VoteAggregator;
use crate::models::Classifier;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Gini,
    Entropy,
}

impl Criterion {
    fn impurity(&self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => 1.0 - counts.iter().map(|c| (c / total).powi(2)).sum::<f64>(),
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|c| {
                    let p = c / total;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeaturesRule {
    Sqrt,
    Log2,
}

/// Number of features considered at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxFeatures {
    Count(usize),
    Fraction(f64),
    Rule(MaxFeaturesRule),
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Count(k) => *k,
            MaxFeatures::Fraction(f) => (f * n) as usize,
            MaxFeatures::Rule(MaxFeaturesRule::Sqrt) => n.sqrt() as usize,
            MaxFeatures::Rule(MaxFeaturesRule::Log2) => n.log2() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// Hyper-parameters accepted under `training.params`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomForestParams {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default)]
    pub criterion: Criterion,
    /// Unlimited when absent
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// `null` means every feature
    #[serde(default = "default_max_features")]
    pub max_features: Option<MaxFeatures>,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,
    /// Seed; drawn from entropy when absent
    #[serde(default)]
    pub random_state: Option<u64>,
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_max_features() -> Option<MaxFeatures> {
    Some(MaxFeatures::Rule(MaxFeaturesRule::Sqrt))
}

fn default_bootstrap() -> bool {
    true
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            criterion: Criterion::default(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: default_max_features(),
            bootstrap: default_bootstrap(),
            random_state: None,
        }
    }
}

impl RandomForestParams {
    /// Parse a free-form parameter map; `null` yields the defaults.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        let params: Self = if value.is_null() {
            Self::default()
        } else {
            serde_json::from_value(value.clone())
                .map_err(|e| PipelineError::InvalidParams(e.to_string()))?
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::InvalidParams(
                "n_estimators must be at least 1".into(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::InvalidParams(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::InvalidParams(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if let Some(MaxFeatures::Fraction(f)) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(PipelineError::InvalidParams(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted CART tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_proba(&self, row: &[f64]) -> Result<&[f64]> {
        let mut idx = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return Ok(proba),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).ok_or_else(|| {
                        PipelineError::InvalidData(format!(
                            "tree splits on feature {} but row has {} values",
                            feature,
                            row.len()
                        ))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(PipelineError::InvalidData(
            "malformed decision tree: node reference out of range".into(),
        ))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, limit: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) if limit > 0 => {
                    1 + walk(nodes, *left, limit - 1).max(walk(nodes, *right, limit - 1))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0, self.nodes.len())
    }
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    params: &'a RandomForestParams,
    max_features: usize,
    rng: &'a mut StdRng,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += 1.0;
        }
        counts
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let node_id = self.nodes.len();
        let counts = self.class_counts(&indices);
        let total = indices.len() as f64;
        let proba: Vec<f64> = counts.iter().map(|c| c / total).collect();
        self.nodes.push(Node::Leaf { proba });

        let is_pure = counts.iter().filter(|&&c| c > 0.0).count() <= 1;
        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if is_pure || depth_reached || indices.len() < self.params.min_samples_split {
            return node_id;
        }

        let parent_impurity = self.params.criterion.impurity(&counts, total);
        let Some(split) = self.best_split(&indices) else {
            return node_id;
        };
        if split.impurity >= parent_impurity - 1e-12 {
            return node_id;
        }

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    fn best_split(&mut self, indices: &[usize]) -> Option<BestSplit> {
        let n_features = self.x.first().map(Vec::len).unwrap_or(0);
        let candidates = rand::seq::index::sample(&mut *self.rng, n_features, self.max_features);
        let min_leaf = self.params.min_samples_leaf;
        let total = indices.len() as f64;

        let mut best: Option<BestSplit> = None;
        for feature in candidates.iter() {
            let mut sorted: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.x[i][feature], self.y[i]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0.0; self.n_classes];
            let mut right = self.class_counts(indices);

            for pos in 0..sorted.len().saturating_sub(1) {
                let (value, class) = sorted[pos];
                left[class] += 1.0;
                right[class] -= 1.0;

                let next_value = sorted[pos + 1].0;
                if value >= next_value {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = sorted.len() - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let impurity = (n_left as f64 * self.params.criterion.impurity(&left, n_left as f64)
                    + n_right as f64 * self.params.criterion.impurity(&right, n_right as f64))
                    / total;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = value + (next_value - value) / 2.0;
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

/// Fitted random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: RandomForestParams,
    feature_names: Vec<String>,
    classes: Vec<i64>,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    /// Fit on a row-major feature matrix and integer labels.
    pub fn fit(
        params: RandomForestParams,
        feature_names: Vec<String>,
        x: &[Vec<f64>],
        y: &[i64],
    ) -> Result<Self> {
        if x.is_empty() {
            return Err(PipelineError::InvalidData("training set is empty".into()));
        }
        if x.len() != y.len() {
            return Err(PipelineError::InvalidData(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if feature_names.is_empty() {
            return Err(PipelineError::InvalidData("no feature columns".into()));
        }
        if x.iter().any(|row| row.len() != feature_names.len()) {
            return Err(PipelineError::InvalidData(
                "feature rows do not match the feature names".into(),
            ));
        }
        if x.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PipelineError::InvalidData(
                "training features contain non-finite values".into(),
            ));
        }

        let classes: Vec<i64> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let y_idx: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let seed = params.random_state.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let max_features = params
            .max_features
            .map(|m| m.resolve(feature_names.len()))
            .unwrap_or(feature_names.len());

        info!(
            n_samples = x.len(),
            n_features = feature_names.len(),
            n_classes = classes.len(),
            n_estimators = params.n_estimators,
            max_features,
            "Fitting random forest"
        );

        let n = x.len();
        let mut trees = Vec::with_capacity(params.n_estimators);
        for t in 0..params.n_estimators {
            let indices: Vec<usize> = if params.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                x,
                y: &y_idx,
                n_classes: classes.len(),
                params: &params,
                max_features,
                rng: &mut rng,
                nodes: Vec::new(),
            };
            builder.build(indices, 0);
            let tree = DecisionTree {
                nodes: builder.nodes,
            };
            debug!(tree = t, nodes = tree.node_count(), depth = tree.depth(), "Tree fitted");
            trees.push(tree);
        }

        Ok(Self {
            params,
            feature_names,
            classes,
            trees,
        })
    }

    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForestClassifier {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if self.trees.is_empty() {
            return Err(PipelineError::InvalidData("model has no fitted trees".into()));
        }
        let aggregator = VoteAggregator::equal_weights();

        x.iter()
            .map(|row| {
                let votes = self
                    .trees
                    .iter()
                    .map(|tree| tree.leaf_proba(row))
                    .collect::<Result<Vec<_>>>()?;
                aggregator
                    .aggregate(&votes)
                    .filter(|p| p.len() == self.classes.len())
                    .ok_or_else(|| {
                        PipelineError::InvalidData(
                            "tree probabilities do not match the model classes".into(),
                        )
                    })
            })
            .collect()
    }
}
