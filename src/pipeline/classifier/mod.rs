//! Health-risk classifier.
//!
//! Loads a pre-trained decision forest plus the ARFF header it was trained
//! against, checks that the two agree, and then serves predictions from an
//! immutable value that is shared across threads without locking.

mod forest;
mod schema;

pub use forest::{ForestModel, TreeNode, FOREST_FORMAT};
pub use schema::{Attribute, AttributeKind, ModelSchema};

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::RiskLevel;
use crate::pipeline::features::FeatureVector;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema parse error at line {line}: {reason}")]
    SchemaParse { line: usize, reason: String },

    #[error("Class attribute not found in schema: {0}")]
    MissingClassAttribute(String),

    #[error("Class attribute {0} is not nominal")]
    ClassAttributeNotNominal(String),

    #[error("Model parse error: {0}")]
    ModelParse(#[from] serde_json::Error),

    #[error("Model does not match schema: {0}")]
    ModelSchemaMismatch(String),

    #[error("Class label {0} is not a risk level")]
    UnknownClassLabel(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

/// Full model output for one vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub level: RiskLevel,
    /// Probability per class, in schema class order.
    pub distribution: Vec<(RiskLevel, f64)>,
}

#[derive(Debug)]
pub struct RiskClassifier {
    model: ForestModel,
    class_attribute: String,
    classes: Vec<RiskLevel>,
}

impl RiskClassifier {
    /// Load model and schema from disk. Any failure is fatal for the caller.
    pub fn load(model_path: &Path, schema_path: &Path) -> Result<Self, ClassifierError> {
        let model_json = read(model_path)?;
        let arff = read(schema_path)?;
        let classifier = Self::from_sources(&model_json, &arff)?;
        tracing::info!(
            model = %model_path.display(),
            trees = classifier.model.trees.len(),
            class_attribute = classifier.class_attribute(),
            classes = classifier.classes.len(),
            "Risk classifier loaded"
        );
        Ok(classifier)
    }

    pub fn from_sources(model_json: &str, arff: &str) -> Result<Self, ClassifierError> {
        let model = ForestModel::from_json(model_json)?;
        let schema = ModelSchema::parse(arff)?;

        // Class attribute: named by the model, else the last schema attribute.
        let class_attr = match &model.class_attribute {
            Some(name) => schema
                .attribute(name)
                .ok_or_else(|| ClassifierError::MissingClassAttribute(name.clone()))?,
            None => schema
                .attributes
                .last()
                .ok_or_else(|| ClassifierError::MissingClassAttribute("<last>".into()))?,
        };
        let labels = match &class_attr.kind {
            AttributeKind::Nominal(values) => values,
            AttributeKind::Numeric => {
                return Err(ClassifierError::ClassAttributeNotNominal(
                    class_attr.name.clone(),
                ))
            }
        };
        let classes = labels
            .iter()
            .map(|label| {
                label
                    .parse::<RiskLevel>()
                    .map_err(|_| ClassifierError::UnknownClassLabel(label.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let feature_attrs: Vec<&Attribute> = schema
            .attributes
            .iter()
            .filter(|a| a.name != class_attr.name)
            .collect();
        if let Some(a) = feature_attrs
            .iter()
            .find(|a| a.kind != AttributeKind::Numeric)
        {
            return Err(ClassifierError::ModelSchemaMismatch(format!(
                "feature attribute {} is not numeric",
                a.name
            )));
        }
        let schema_features: Vec<&str> = feature_attrs.iter().map(|a| a.name.as_str()).collect();
        if schema_features != model.features {
            return Err(ClassifierError::ModelSchemaMismatch(format!(
                "model features {:?} differ from schema attributes {:?}",
                model.features, schema_features
            )));
        }

        model.validate(classes.len())?;

        Ok(Self {
            class_attribute: class_attr.name.clone(),
            model,
            classes,
        })
    }

    /// Feature attribute names in the slot order the model reads them.
    pub fn feature_names(&self) -> &[String] {
        &self.model.features
    }

    pub fn handles_missing(&self) -> bool {
        self.model.handles_missing
    }

    pub fn class_attribute(&self) -> &str {
        &self.class_attribute
    }

    pub fn predict(&self, vector: &FeatureVector) -> Prediction {
        let probs = self.model.distribution(vector.slots(), self.classes.len());
        // argmax, first maximum wins on ties
        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        Prediction {
            level: self.classes[best],
            distribution: self.classes.iter().copied().zip(probs).collect(),
        }
    }

    pub fn classify(&self, vector: &FeatureVector) -> RiskLevel {
        self.predict(vector).level
    }
}

fn read(path: &Path) -> Result<String, ClassifierError> {
    std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
        path: path.to_path_buf(),
        source,
    })
}
