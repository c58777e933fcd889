use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use shared::{
    domain::SubmissionPayload,
    error::ApiErrorBody,
    protocol::{HealthStatus, PredictionResult},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("classification service unreachable: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("classification service returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("malformed classification response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl ClassifierError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err)
        } else {
            Self::Transport(err)
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, payload: &SubmissionPayload)
        -> Result<PredictionResult, ClassifierError>;
}

pub struct HttpClassifier {
    http: Client,
    classify_url: String,
    health_url: String,
}

impl HttpClassifier {
    pub fn new(http: Client, classify_url: impl Into<String>, health_url: impl Into<String>) -> Self {
        Self {
            http,
            classify_url: classify_url.into(),
            health_url: health_url.into(),
        }
    }

    pub async fn health(&self) -> Result<HealthStatus, ClassifierError> {
        let response = self
            .http
            .get(&self.health_url)
            .send()
            .await
            .map_err(ClassifierError::Transport)?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(ClassifierError::Decode)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<PredictionResult, ClassifierError> {
        info!(submission_id = %payload.submission_id, "posting submission for classification");
        let response = self
            .http
            .post(&self.classify_url)
            .json(payload)
            .send()
            .await
            .map_err(ClassifierError::from_send)?;
        let response = ensure_success(response).await?;
        response.json().await.map_err(ClassifierError::Decode)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClassifierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    Err(ClassifierError::Status { status, message })
}

#[cfg(test)]
#[path = "tests/classifier_tests.rs"]
mod tests;
