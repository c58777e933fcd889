//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{Classifier, FraudCheckClient, Settings};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_classification_failure, UiError, UiErrorContext, UiEvent};

/// Spawns the backend worker thread. It owns a tokio runtime and the HTTP
/// clients, and runs every command as its own task.
pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        post_event(&ui_tx, UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                post_event(&ui_tx, UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let client = match FraudCheckClient::from_settings(&settings) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                post_event(&ui_tx, UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: {err:#}"),
                )));
                tracing::error!("failed to build service clients: {err:#}");
                return;
            }
        };

        runtime.block_on(async move {
            post_event(&ui_tx, UiEvent::Info("Backend worker ready".to_string()));
            while let Ok(cmd) = cmd_rx.recv() {
                tokio::spawn(handle_command(client.clone(), cmd, ui_tx.clone()));
            }
            tracing::info!("ui command channel closed; backend worker exiting");
        });
    });
}

async fn handle_command(client: Arc<FraudCheckClient>, cmd: BackendCommand, ui_tx: Sender<UiEvent>) {
    match cmd {
        BackendCommand::Submit { form } => {
            let payload = form.into_payload(client.distances()).await;
            post_event(&ui_tx, UiEvent::SubmissionAccepted(Arc::new(payload)));
        }
        BackendCommand::Classify { ticket } => {
            let submission_id = ticket.payload.submission_id;
            let outcome = client
                .classifier()
                .classify(&ticket.payload)
                .await
                .map_err(|err| classify_classification_failure(&err.to_string()));
            post_event(
                &ui_tx,
                UiEvent::ClassificationFinished {
                    submission_id,
                    outcome,
                },
            );
        }
        BackendCommand::ProbeHealth => match client.health().await {
            Ok(health) => {
                post_event(&ui_tx, UiEvent::ServiceHealth(health));
            }
            Err(err) => {
                tracing::warn!(error = %err, "classification service health probe failed");
                post_event(
                    &ui_tx,
                    UiEvent::Error(UiError::from_message(
                        UiErrorContext::HealthProbe,
                        err.to_string(),
                    )),
                );
            }
        },
    }
}

/// Hands an event to the UI without blocking the worker. Returns `false` when
/// the event was dropped.
fn post_event(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!("ui event queue is full; dropping backend event");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::debug!("ui event queue closed; dropping backend event");
            false
        }
    }
}
