//! Artifact directory loader: schema, classifier and label encoder, validated together.

use super::encoder::EncoderDocument;
use super::forest::ForestDocument;
use super::{LabelEncoder, RandomForest, RiskModel};
use crate::error::ArtifactError;
use crate::features::{FeatureSchema, SchemaDocument};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const SCHEMA_FILE: &str = "feature_schema.json";
pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const LABEL_ENCODER_FILE: &str = "label_encoder.json";

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ArtifactError> {
    let path = dir.join(file);
    let data = std::fs::read_to_string(&path).map_err(|source| ArtifactError::Io {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ArtifactError::Parse { path, source })
}

/// Load the artifact in `dir` and pair its parts into a [`RiskModel`].
///
/// Syntax errors surface as `Parse`; documents that parse but fail validation
/// surface as `Invalid`, or `Integrity` for a schema fingerprint mismatch.
pub fn load_risk_model(dir: &Path) -> Result<RiskModel, ArtifactError> {
    let schema = FeatureSchema::try_from(read_json::<SchemaDocument>(dir, SCHEMA_FILE)?)?;
    let forest = RandomForest::try_from(read_json::<ForestDocument>(dir, CLASSIFIER_FILE)?)?;
    let encoder = LabelEncoder::try_from(read_json::<EncoderDocument>(dir, LABEL_ENCODER_FILE)?)?;

    let n_trees = forest.n_trees();
    let model = RiskModel::new(Arc::new(schema), Box::new(forest), encoder)?;
    info!(
        dir = %dir.display(),
        schema_version = model.schema().version(),
        fingerprint = %model.schema().fingerprint(),
        n_trees,
        labels = ?model.labels(),
        "risk model loaded"
    );
    Ok(model)
}
