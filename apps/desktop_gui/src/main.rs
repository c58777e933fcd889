use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use client_core::{config::DEFAULT_SETTINGS_FILE, load_settings, Settings};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::{commands::BackendCommand, runtime};
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::ui::FraudCheckApp;

#[derive(Debug, Parser)]
#[command(name = "fraud-check-gui", about = "Desktop front end for the fraud check service")]
struct Args {
    /// Settings file. Defaults to ./fraud_check.toml, then the user config directory.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// An explicit path wins. Otherwise the working-directory file is picked up by
/// `load_settings`, and the per-user file is only used when that one is absent.
fn resolve_settings_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    if PathBuf::from(DEFAULT_SETTINGS_FILE).exists() {
        return None;
    }
    dirs::config_dir()
        .map(|dir| dir.join("fraud_check").join(DEFAULT_SETTINGS_FILE))
        .filter(|path| path.exists())
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);

    let settings_path = resolve_settings_path(args.config);
    let settings = match load_settings(settings_path.as_deref()) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("failed to load settings, using defaults: {err:#}");
            let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                UiErrorContext::BackendStartup,
                format!("invalid settings, using defaults: {err:#}"),
            )));
            Settings::default()
        }
    };
    tracing::info!(classifier = %settings.classifier_url, "starting desktop gui");
    runtime::launch(settings, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Fraud Check")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([820.0, 560.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Fraud Check",
        options,
        Box::new(|_cc| Ok(Box::new(FraudCheckApp::new(cmd_tx, ui_rx)))),
    )
}
