//! Backend-to-UI events and error modeling for the desktop controller.

use std::sync::Arc;

use shared::{
    domain::{SubmissionId, SubmissionPayload},
    protocol::{HealthStatus, PredictionResult},
};

pub enum UiEvent {
    Info(String),
    ServiceHealth(HealthStatus),
    SubmissionAccepted(Arc<SubmissionPayload>),
    ClassificationFinished {
        submission_id: SubmissionId,
        outcome: Result<PredictionResult, String>,
    },
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Service,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    HealthProbe,
    General,
}

pub fn classify_classification_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("unreachable")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Classification service unreachable; check the service URL and network.".to_string()
    } else if lower.contains("malformed") {
        "Classification service sent an unexpected response.".to_string()
    } else {
        format!("Classification failed: {message}")
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("missing required") {
            UiErrorCategory::Validation
        } else if message_lower.contains("returned 4")
            || message_lower.contains("returned 5")
            || message_lower.contains("model not loaded")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Service
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnect")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_categorized() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "missing required fields: Home Address",
        );
        assert_eq!(err.category(), UiErrorCategory::Validation);
        assert_eq!(err.context(), UiErrorContext::General);
    }

    #[test]
    fn invalid_settings_are_not_a_form_problem() {
        let err = UiError::from_message(
            UiErrorContext::BackendStartup,
            "invalid settings, using defaults: classifier_url must use http or https",
        );
        assert_ne!(err.category(), UiErrorCategory::Validation);
    }

    #[test]
    fn service_status_is_not_a_transport_error() {
        let err = UiError::from_message(
            UiErrorContext::HealthProbe,
            "classification service returned 500 Internal Server Error: Model not loaded",
        );
        assert_eq!(err.category(), UiErrorCategory::Service);
    }

    #[test]
    fn disconnected_worker_is_transport() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
    }

    #[test]
    fn unreachable_service_gets_friendly_text() {
        let text = classify_classification_failure(
            "classification service unreachable: error sending request",
        );
        assert!(text.starts_with("Classification service unreachable"));
    }
}
