use std::sync::Arc;

use anyhow::Result;
use shared::{domain::SubmissionPayload, error::ValidationError, protocol::HealthStatus};

pub mod classifier;
pub mod config;
pub mod distance;
pub mod form;
pub mod render;
pub mod viewer;

pub use classifier::{Classifier, ClassifierError, HttpClassifier};
pub use config::{build_http_client, load_settings, Settings};
pub use distance::{
    DistanceError, DistanceMatrixClient, DistanceProvider, DistanceResolver,
    FallbackDistancePolicy,
};
pub use form::{FormController, FormFields, ValidatedForm};
pub use render::{ResultSummary, TreeImage, TreeVisualization, Verdict};
pub use viewer::{ClassifyTicket, ResultViewer, ViewerState};

/// Both outbound services wired from one [`Settings`], sharing an HTTP client.
pub struct FraudCheckClient {
    distances: DistanceResolver<DistanceMatrixClient>,
    classifier: HttpClassifier,
}

impl FraudCheckClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = build_http_client(settings)?;
        if settings.maps_api_key.is_none() {
            tracing::warn!("no maps API key configured; distances will use fallback estimates");
        }
        Ok(Self {
            distances: DistanceResolver::new(
                DistanceMatrixClient::new(
                    http.clone(),
                    settings.distance_matrix_url.clone(),
                    settings.maps_api_key.clone(),
                ),
                settings.fallback,
            ),
            classifier: HttpClassifier::new(
                http,
                settings.classify_endpoint(),
                settings.health_endpoint(),
            ),
        })
    }

    pub fn distances(&self) -> &DistanceResolver<DistanceMatrixClient> {
        &self.distances
    }

    pub fn classifier(&self) -> &HttpClassifier {
        &self.classifier
    }

    /// Validate, resolve distances and return the payload.
    pub async fn prepare(
        &self,
        form: &FormController,
    ) -> std::result::Result<Arc<SubmissionPayload>, ValidationError> {
        let validated = form.validate()?;
        Ok(Arc::new(validated.into_payload(&self.distances).await))
    }

    pub async fn health(&self) -> std::result::Result<HealthStatus, ClassifierError> {
        self.classifier.health().await
    }
}
