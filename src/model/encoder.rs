//! Label encoder: class id ↔ risk level string. Id is the position in `classes`.

use crate::error::{ArtifactError, ScoringError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// On-disk form (`label_encoder.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EncoderDocument {
    classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EncoderDocument", into = "EncoderDocument")]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::invalid("label encoder", "no classes"));
        }
        let mut seen = HashSet::new();
        for label in &classes {
            if label.is_empty() {
                return Err(ArtifactError::invalid("label encoder", "empty label"));
            }
            if !seen.insert(label.as_str()) {
                return Err(ArtifactError::invalid("label encoder", format!("duplicate label {}", label)));
            }
        }
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn contains(&self, class_id: i64) -> bool {
        usize::try_from(class_id).map_or(false, |i| i < self.classes.len())
    }

    pub fn decode(&self, class_id: i64) -> Result<&str, ScoringError> {
        usize::try_from(class_id)
            .ok()
            .and_then(|i| self.classes.get(i))
            .map(String::as_str)
            .ok_or_else(|| ScoringError::UnknownClass {
                class_id,
                reason: format!("label encoder knows ids 0..{}", self.classes.len()),
            })
    }

    pub fn encode(&self, label: &str) -> Option<i64> {
        self.classes
            .iter()
            .position(|c| c == label)
            .and_then(|i| i64::try_from(i).ok())
    }
}

impl TryFrom<EncoderDocument> for LabelEncoder {
    type Error = ArtifactError;

    fn try_from(doc: EncoderDocument) -> Result<Self, Self::Error> {
        LabelEncoder::new(doc.classes)
    }
}

impl From<LabelEncoder> for EncoderDocument {
    fn from(encoder: LabelEncoder) -> Self {
        EncoderDocument {
            classes: encoder.classes,
        }
    }
}
