//! Result viewer state machine: `Idle -> Loading -> Success | Error`.

use std::{fmt, sync::Arc};

use shared::{
    domain::{SubmissionId, SubmissionPayload},
    protocol::PredictionResult,
};
use tracing::{error, info};

use crate::{classifier::Classifier, render::ResultSummary};

#[derive(Debug)]
pub enum ViewerState {
    Idle,
    Loading {
        payload: Arc<SubmissionPayload>,
    },
    Success {
        payload: Arc<SubmissionPayload>,
        result: PredictionResult,
    },
    Error {
        submission_id: SubmissionId,
        message: String,
    },
}

impl ViewerState {
    pub fn is_loading(&self) -> bool {
        matches!(self, ViewerState::Loading { .. })
    }
}

/// Request to classify a payload, issued once per new submission.
#[derive(Debug, Clone)]
pub struct ClassifyTicket {
    pub payload: Arc<SubmissionPayload>,
}

#[derive(Debug)]
pub struct ResultViewer {
    state: ViewerState,
    last_observed: Option<SubmissionId>,
}

impl Default for ResultViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultViewer {
    pub fn new() -> Self {
        Self {
            state: ViewerState::Idle,
            last_observed: None,
        }
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    /// Edge-triggered: fires only when a submitted payload with a new
    /// `submission_id` shows up. Entering `Loading` drops any previous result.
    pub fn observe(
        &mut self,
        payload: Option<&Arc<SubmissionPayload>>,
        submitted: bool,
    ) -> Option<ClassifyTicket> {
        let payload = payload.filter(|_| submitted)?;
        if self.last_observed == Some(payload.submission_id) {
            return None;
        }

        self.last_observed = Some(payload.submission_id);
        self.state = ViewerState::Loading {
            payload: payload.clone(),
        };
        Some(ClassifyTicket {
            payload: payload.clone(),
        })
    }

    /// Applies a classification outcome. Outcomes for anything other than the
    /// in-flight submission are dropped and `false` is returned.
    pub fn complete<E: fmt::Display>(
        &mut self,
        submission_id: SubmissionId,
        outcome: Result<PredictionResult, E>,
    ) -> bool {
        let payload = match &self.state {
            ViewerState::Loading { payload } if payload.submission_id == submission_id => {
                payload.clone()
            }
            _ => return false,
        };

        self.state = match outcome {
            Ok(result) => {
                info!(
                    %submission_id,
                    fraudulent = result.fraudulent,
                    confidence = result.confidence,
                    "classification received"
                );
                ViewerState::Success { payload, result }
            }
            Err(err) => {
                error!(%submission_id, error = %err, "classification failed");
                ViewerState::Error {
                    submission_id,
                    message: err.to_string(),
                }
            }
        };
        true
    }

    /// Observe, classify and complete in one go. No retry on failure.
    pub async fn run<C>(&mut self, classifier: &C, payload: &Arc<SubmissionPayload>, submitted: bool)
    where
        C: Classifier + ?Sized,
    {
        let Some(ticket) = self.observe(Some(payload), submitted) else {
            return;
        };
        let outcome = classifier.classify(&ticket.payload).await;
        self.complete(ticket.payload.submission_id, outcome);
    }

    pub fn summary(&self) -> Option<ResultSummary> {
        match &self.state {
            ViewerState::Success { payload, result } => Some(ResultSummary::new(payload, result)),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ViewerState::Error { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/viewer_tests.rs"]
mod tests;
