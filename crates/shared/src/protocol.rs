use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Verdict returned by the classification service for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub fraudulent: bool,
    /// Percentage in `0..=100`.
    pub confidence: f64,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(default)]
    pub processed_features: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_visualization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

impl HealthStatus {
    pub fn is_ready(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") && self.model_loaded
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixRow {
    #[serde(default)]
    pub elements: Vec<DistanceMatrixElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixElement {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub distance: Option<DistanceValue>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DistanceValue {
    /// Metres.
    pub value: f64,
}

impl DistanceMatrixResponse {
    pub fn first_element(&self) -> Option<&DistanceMatrixElement> {
        self.rows.first().and_then(|row| row.elements.first())
    }
}
