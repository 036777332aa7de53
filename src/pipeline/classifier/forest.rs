//! Decision-forest model artifact.
//!
//! Each split sends values `<= threshold` left. A missing value follows both
//! branches, weighted by the share of training rows that went left
//! (`left_fraction`). Tree outputs are averaged class distributions.

use serde::Deserialize;

use super::ClassifierError;
use crate::pipeline::features::Feature;

pub const FOREST_FORMAT: &str = "riskwatch-forest/1";

#[derive(Debug, Clone, Deserialize)]
pub struct ForestModel {
    pub format: String,
    /// Name of the class attribute in the schema. Defaults to the last attribute.
    #[serde(default)]
    pub class_attribute: Option<String>,
    /// Feature attribute names, in the slot order the trees index into.
    pub features: Vec<String>,
    /// Whether the trees were trained to route missing values.
    pub handles_missing: bool,
    pub trees: Vec<TreeNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left_fraction: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

impl ForestModel {
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Structural checks against the class count. Run once at load time so
    /// prediction can index without bounds failures.
    pub fn validate(&self, class_count: usize) -> Result<(), ClassifierError> {
        if self.format != FOREST_FORMAT {
            return Err(ClassifierError::InvalidModel(format!(
                "unsupported model format {:?}, expected {FOREST_FORMAT:?}",
                self.format
            )));
        }
        if self.trees.is_empty() {
            return Err(ClassifierError::InvalidModel("model has no trees".into()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.features.len(), class_count)
                .map_err(|reason| ClassifierError::InvalidModel(format!("tree {i}: {reason}")))?;
        }
        Ok(())
    }

    /// Averaged class distribution for one feature vector.
    pub fn distribution(&self, features: &[Feature], class_count: usize) -> Vec<f64> {
        let mut total = vec![0.0; class_count];
        for tree in &self.trees {
            for (acc, p) in total.iter_mut().zip(tree.distribution(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        total.iter_mut().for_each(|p| *p /= n);
        total
    }
}

impl TreeNode {
    fn validate(&self, feature_count: usize, class_count: usize) -> Result<(), String> {
        match self {
            TreeNode::Split {
                feature,
                threshold,
                left_fraction,
                left,
                right,
            } => {
                if *feature >= feature_count {
                    return Err(format!("split on feature {feature}, model has {feature_count}"));
                }
                if !threshold.is_finite() {
                    return Err(format!("non-finite threshold on feature {feature}"));
                }
                if !(0.0..=1.0).contains(left_fraction) {
                    return Err(format!("left_fraction {left_fraction} outside [0, 1]"));
                }
                left.validate(feature_count, class_count)?;
                right.validate(feature_count, class_count)
            }
            TreeNode::Leaf { distribution } => {
                if distribution.len() != class_count {
                    return Err(format!(
                        "leaf has {} class weights, schema has {class_count} classes",
                        distribution.len()
                    ));
                }
                if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err("leaf has negative or non-finite weight".into());
                }
                if distribution.iter().sum::<f64>() <= 0.0 {
                    return Err("leaf weights sum to zero".into());
                }
                Ok(())
            }
        }
    }

    /// Normalized class distribution reached by `features`.
    fn distribution(&self, features: &[Feature]) -> Vec<f64> {
        match self {
            TreeNode::Leaf { distribution } => {
                let sum: f64 = distribution.iter().sum();
                distribution.iter().map(|p| p / sum).collect()
            }
            TreeNode::Split {
                feature,
                threshold,
                left_fraction,
                left,
                right,
            } => match features.get(*feature).copied().unwrap_or(Feature::Missing) {
                Feature::Value(v) if v <= *threshold => left.distribution(features),
                Feature::Value(_) => right.distribution(features),
                Feature::Missing => {
                    let l = left.distribution(features);
                    let r = right.distribution(features);
                    l.iter()
                        .zip(r)
                        .map(|(lp, rp)| left_fraction * lp + (1.0 - left_fraction) * rp)
                        .collect()
                }
            },
        }
    }
}
