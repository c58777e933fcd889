//! Main desktop window: transaction form on the left, verdict on the right.

use client_core::{
    form::suggest_places, FormController, ResultSummary, ResultViewer, TreeVisualization,
    ViewerState,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use egui::TextureHandle;
use shared::{error::ValidationError, protocol::HealthStatus};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

const FORM_PANEL_WIDTH: f32 = 360.0;
const TREE_TEXTURE_NAME: &str = "decision_tree";

pub struct FraudCheckApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    form: FormController,
    validation: Option<ValidationError>,
    numeric_hint: Option<&'static str>,
    submitting: bool,
    viewer: ResultViewer,
    summary: Option<ResultSummary>,
    tree_texture: Option<TextureHandle>,
    tree_texture_error: Option<String>,
    health: Option<HealthStatus>,
    status: String,
    save_status: Option<String>,
}

impl FraudCheckApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            form: FormController::new(),
            validation: None,
            numeric_hint: None,
            submitting: false,
            viewer: ResultViewer::new(),
            summary: None,
            tree_texture: None,
            tree_texture_error: None,
            health: None,
            status: "Starting".to_string(),
            save_status: None,
        };
        dispatch_backend_command(&app.cmd_tx, BackendCommand::ProbeHealth, &mut app.status);
        app
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => {
                self.status = message;
            }
            UiEvent::ServiceHealth(health) => {
                self.status = if health.is_ready() {
                    "Classification service ready".to_string()
                } else {
                    format!("Classification service reports '{}'", health.status)
                };
                self.health = Some(health);
            }
            UiEvent::SubmissionAccepted(payload) => {
                self.submitting = false;
                let Some(ticket) = self.viewer.observe(Some(&payload), true) else {
                    return;
                };
                self.clear_result();
                self.status = "Classifying transaction".to_string();
                let submission_id = ticket.payload.submission_id;
                if !dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::Classify { ticket },
                    &mut self.status,
                ) {
                    let reason = self.status.clone();
                    self.viewer.complete(submission_id, Err(reason));
                }
            }
            UiEvent::ClassificationFinished {
                submission_id,
                outcome,
            } => {
                if self.viewer.complete(submission_id, outcome) {
                    self.clear_result();
                    self.summary = self.viewer.summary();
                    self.status = match &self.summary {
                        Some(summary) => format!("Result: {}", summary.verdict.banner_label()),
                        None => "Classification failed".to_string(),
                    };
                } else {
                    tracing::debug!(%submission_id, "dropping stale classification result");
                }
            }
            UiEvent::Error(err) => {
                if err.context() == UiErrorContext::BackendStartup {
                    self.submitting = false;
                }
                tracing::warn!(category = ?err.category(), context = ?err.context(), "{}", err.message());
                self.status = err.message().to_string();
            }
        }
    }

    fn clear_result(&mut self) {
        self.summary = None;
        self.tree_texture = None;
        self.tree_texture_error = None;
        self.save_status = None;
    }

    fn submit(&mut self) {
        if self.submitting {
            return;
        }
        match self.form.validate() {
            Err(err) => {
                self.status = err.to_string();
                self.validation = Some(err);
            }
            Ok(form) => {
                self.validation = None;
                self.submitting = dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::Submit { form },
                    &mut self.status,
                );
                if self.submitting {
                    self.status = "Resolving distances".to_string();
                }
            }
        }
    }

    fn reset_form(&mut self) {
        self.form.reset();
        self.validation = None;
        self.numeric_hint = None;
    }

    fn show_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("app_top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Fraud Check");
                ui.separator();
                let (color, label) = match &self.health {
                    Some(health) if health.is_ready() => {
                        (egui::Color32::from_rgb(67, 160, 71), "service ready")
                    }
                    Some(_) => (egui::Color32::from_rgb(251, 140, 0), "model not loaded"),
                    None => (egui::Color32::GRAY, "service unknown"),
                };
                ui.colored_label(color, format!("● {label}"));
                if ui.small_button("Recheck").clicked() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ProbeHealth,
                        &mut self.status,
                    );
                }
                ui.separator();
                ui.label(egui::RichText::new(&self.status).weak());
            });
        });
    }

    fn show_form_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("transaction_form")
            .resizable(false)
            .exact_width(FORM_PANEL_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add_space(6.0);
                    ui.label(egui::RichText::new("Payee").strong());
                    if let Some(value) =
                        place_field(ui, "home_address", "Home Address", &self.form.fields().home_address)
                    {
                        self.form.set_home_address(value);
                    }
                    let spending = self.form.fields().average_spending.clone();
                    if let Some(candidate) = amount_field(ui, "average_spending", "Average Spending", &spending)
                    {
                        self.numeric_hint = (!self.form.set_average_spending(&candidate))
                            .then_some("Amounts accept digits and one decimal point");
                    }

                    ui.add_space(10.0);
                    ui.label(egui::RichText::new("Transaction").strong());
                    let amount = self.form.fields().order_amount.clone();
                    if let Some(candidate) = amount_field(ui, "order_amount", "Order Amount", &amount) {
                        self.numeric_hint = (!self.form.set_order_amount(&candidate))
                            .then_some("Amounts accept digits and one decimal point");
                    }
                    if let Some(hint) = self.numeric_hint {
                        ui.colored_label(ui.visuals().warn_fg_color, hint);
                    }

                    ui.label("Payment Mode");
                    ui.horizontal(|ui| {
                        let selected = self.form.fields().payment_mode;
                        for mode in shared::domain::PaymentMode::ALL {
                            if ui.radio(selected == Some(mode), mode.label()).clicked() {
                                self.form.set_payment_mode(mode);
                            }
                        }
                    });

                    if let Some(value) = place_field(
                        ui,
                        "order_address",
                        "Order Address",
                        &self.form.fields().order_address,
                    ) {
                        self.form.set_order_address(value);
                    }
                    if let Some(value) = place_field(
                        ui,
                        "person_location",
                        "Location During Transaction",
                        &self.form.fields().person_location,
                    ) {
                        self.form.set_person_location(value);
                    }

                    let mut first_time = self.form.fields().is_first_time;
                    if ui
                        .checkbox(&mut first_time, "First-time transaction with this payee")
                        .changed()
                    {
                        self.form.set_first_time(first_time);
                    }

                    if let Some(err) = &self.validation {
                        ui.add_space(6.0);
                        egui::Frame::NONE
                            .fill(ui.visuals().extreme_bg_color)
                            .stroke(egui::Stroke::new(1.0, ui.visuals().error_fg_color))
                            .corner_radius(8.0)
                            .inner_margin(egui::Margin::symmetric(10, 8))
                            .show(ui, |ui| {
                                ui.colored_label(ui.visuals().error_fg_color, "Please fill in:");
                                for field in &err.missing {
                                    ui.label(format!("• {}", field.label()));
                                }
                            });
                    }

                    ui.add_space(10.0);
                    ui.horizontal(|ui| {
                        let submit = ui.add_enabled(!self.submitting, egui::Button::new("Submit"));
                        if submit.clicked() {
                            self.submit();
                        }
                        if ui.button("Reset").clicked() {
                            self.reset_form();
                        }
                        if self.submitting {
                            ui.spinner();
                        }
                    });
                });
            });
    }

    fn show_result_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                if matches!(self.viewer.state(), ViewerState::Success { .. }) {
                    self.show_summary(ui);
                    return;
                }
                match self.viewer.state() {
                    ViewerState::Idle | ViewerState::Success { .. } => {
                        ui.add_space(24.0);
                        ui.label("Fill in the transaction and press Submit to classify it.");
                    }
                    ViewerState::Loading { .. } => {
                        ui.add_space(24.0);
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Waiting for the classification service...");
                        });
                    }
                    ViewerState::Error { message, .. } => {
                        ui.add_space(12.0);
                        egui::Frame::NONE
                            .fill(ui.visuals().extreme_bg_color)
                            .stroke(egui::Stroke::new(1.0, ui.visuals().error_fg_color))
                            .corner_radius(8.0)
                            .inner_margin(egui::Margin::symmetric(10, 8))
                            .show(ui, |ui| {
                                ui.colored_label(ui.visuals().error_fg_color, message.as_str());
                            });
                    }
                }
            });
        });
    }

    fn show_summary(&mut self, ui: &mut egui::Ui) {
        let Some(summary) = &self.summary else {
            return;
        };

        let banner_color = if summary.verdict.is_fraud() {
            egui::Color32::from_rgb(198, 40, 40)
        } else {
            egui::Color32::from_rgb(46, 125, 50)
        };
        ui.add_space(8.0);
        egui::Frame::NONE
            .fill(banner_color)
            .corner_radius(8.0)
            .inner_margin(egui::Margin::symmetric(10, 8))
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(
                    egui::RichText::new(summary.verdict.banner_label())
                        .strong()
                        .size(22.0)
                        .color(egui::Color32::WHITE),
                );
            });

        ui.add_space(8.0);
        ui.label("Confidence");
        ui.add(
            egui::ProgressBar::new(summary.confidence_fraction())
                .text(format!("{:.2}%", summary.confidence_pct)),
        );

        ui.add_space(10.0);
        let echo = &summary.echo;
        egui::Grid::new("transaction_echo")
            .num_columns(2)
            .spacing([16.0, 4.0])
            .show(ui, |ui| {
                ui.label("Order amount");
                ui.label(format!("{:.2}", echo.order_amount));
                ui.end_row();
                ui.label("Average spending");
                ui.label(format!("{:.2}", echo.average_spending));
                ui.end_row();
                ui.label("Payment mode");
                ui.label(echo.payment_mode.label());
                ui.end_row();
                ui.label("Order address");
                ui.label(&echo.order_address);
                ui.end_row();
                ui.label("Distance from home");
                ui.label(format!("{:.1} km", echo.distance_from_home));
                ui.end_row();
                ui.label("Distance from location");
                ui.label(format!("{:.1} km", echo.distance_from_location));
                ui.end_row();
                ui.label("First time");
                ui.label(if echo.is_first_time { "yes" } else { "no" });
                ui.end_row();
                ui.label("Submitted");
                ui.label(echo.submitted_local());
                ui.end_row();
            });
        if echo.estimated_distance {
            ui.label(
                egui::RichText::new("Some distances are estimates; the maps service was unavailable.")
                    .italics()
                    .weak(),
            );
        }

        if !summary.importances.is_empty() {
            ui.add_space(10.0);
            ui.label(egui::RichText::new("Feature importance").strong());
            egui::Grid::new("feature_importance")
                .num_columns(3)
                .striped(true)
                .show(ui, |ui| {
                    for feature in &summary.importances {
                        ui.label(&feature.name);
                        ui.add(
                            egui::ProgressBar::new(feature.weight.clamp(0.0, 1.0) as f32)
                                .desired_width(160.0),
                        );
                        ui.label(format!("{:.2}%", feature.weight * 100.0));
                        ui.end_row();
                    }
                });
        }

        self.show_tree(ui);
    }

    fn show_tree(&mut self, ui: &mut egui::Ui) {
        let Some(summary) = &self.summary else {
            return;
        };
        let image = match &summary.tree {
            TreeVisualization::Absent => return,
            TreeVisualization::Invalid(err) => {
                ui.add_space(10.0);
                ui.label(egui::RichText::new(format!("Decision tree unavailable: {err}")).weak());
                return;
            }
            TreeVisualization::Image(image) => image,
        };

        if self.tree_texture.is_none() && self.tree_texture_error.is_none() {
            match decode_tree_pixels(&image.bytes) {
                Ok(pixels) => {
                    self.tree_texture = Some(ui.ctx().load_texture(
                        TREE_TEXTURE_NAME,
                        pixels,
                        egui::TextureOptions::LINEAR,
                    ));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "tree visualization is not a displayable image");
                    self.tree_texture_error = Some(err);
                }
            }
        }

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Decision tree").strong());
            if ui.small_button("Save image...").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .set_file_name(image.suggested_file_name())
                    .save_file()
                {
                    self.save_status = Some(match image.save_to(&path) {
                        Ok(()) => format!("Saved to {}", path.display()),
                        Err(err) => format!("Failed to save image: {err}"),
                    });
                }
            }
        });
        if let Some(status) = &self.save_status {
            ui.label(egui::RichText::new(status).weak());
        }

        if let Some(texture) = &self.tree_texture {
            let size = texture.size_vec2();
            let scale = (ui.available_width() / size.x).min(1.0);
            ui.add(egui::Image::new(texture).fit_to_exact_size(size * scale));
        } else if let Some(err) = &self.tree_texture_error {
            ui.label(egui::RichText::new(format!("Could not display image: {err}")).weak());
        }
    }
}

impl eframe::App for FraudCheckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        self.show_top_bar(ctx);
        self.show_form_panel(ctx);
        self.show_result_panel(ctx);

        if self.submitting || self.viewer.state().is_loading() {
            ctx.request_repaint_after(std::time::Duration::from_millis(50));
        } else {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}

/// Text field with place suggestions. Returns the new value when edited or
/// when a suggestion was picked.
fn place_field(ui: &mut egui::Ui, id: &str, label: &str, current: &str) -> Option<String> {
    let mut value = current.to_string();
    ui.label(label);
    let response = ui.add(
        egui::TextEdit::singleline(&mut value)
            .id_salt(id)
            .hint_text("Start typing a city")
            .desired_width(f32::INFINITY),
    );
    let mut changed = response.changed().then(|| value.clone());

    let suggestions: Vec<&str> = suggest_places(&value)
        .into_iter()
        .filter(|place| !place.eq_ignore_ascii_case(value.trim()))
        .collect();
    if !suggestions.is_empty() {
        ui.indent((id, "suggestions"), |ui| {
            for place in suggestions {
                if ui.small_button(place).clicked() {
                    changed = Some(place.to_string());
                }
            }
        });
    }
    changed
}

fn amount_field(ui: &mut egui::Ui, id: &str, label: &str, current: &str) -> Option<String> {
    let mut value = current.to_string();
    ui.label(label);
    let response = ui.add(
        egui::TextEdit::singleline(&mut value)
            .id_salt(id)
            .hint_text("0.00")
            .desired_width(f32::INFINITY),
    );
    response.changed().then_some(value)
}

pub fn decode_tree_pixels(bytes: &[u8]) -> Result<egui::ColorImage, String> {
    let image = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(egui::ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        rgba.as_raw(),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossbeam_channel::bounded;
    use shared::{
        domain::{
            PayeeInformation, PaymentMode, ResolvedDistance, SubmissionId, SubmissionPayload,
            TransactionInformation,
        },
        error::RequiredField,
        protocol::PredictionResult,
    };

    use super::*;

    const ONE_PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn app() -> (FraudCheckApp, Receiver<BackendCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ui_tx, ui_rx) = bounded(16);
        let app = FraudCheckApp::new(cmd_tx, ui_rx);
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::ProbeHealth)));
        (app, cmd_rx, ui_tx)
    }

    fn payload() -> Arc<SubmissionPayload> {
        Arc::new(SubmissionPayload::new(
            PayeeInformation {
                home_address: "Cebu City, Philippines".to_string(),
                average_spending: 2500.0,
            },
            TransactionInformation {
                order_amount: 12000.0,
                order_address: "Davao City, Philippines".to_string(),
                payment_mode: PaymentMode::Online,
                person_location: "Cebu City, Philippines".to_string(),
                is_first_time: true,
            },
            ResolvedDistance::fallback(100.0),
            ResolvedDistance::fallback(100.0),
        ))
    }

    fn prediction() -> PredictionResult {
        PredictionResult {
            fraudulent: true,
            confidence: 93.5,
            feature_importance: Default::default(),
            processed_features: Default::default(),
            tree_visualization: None,
        }
    }

    #[test]
    fn empty_form_is_not_queued() {
        let (mut app, cmd_rx, _ui_tx) = app();

        app.submit();

        assert!(cmd_rx.try_recv().is_err());
        assert!(!app.submitting);
        let validation = app.validation.as_ref().expect("validation error");
        assert_eq!(validation.missing.len(), RequiredField::ALL.len());
    }

    #[test]
    fn complete_form_queues_submit_once() {
        let (mut app, cmd_rx, _ui_tx) = app();
        app.form.set_home_address("Manila, Philippines");
        app.form.set_average_spending("1500");
        app.form.set_order_amount("300.50");
        app.form.set_payment_mode(PaymentMode::Chip);
        app.form.set_order_address("Makati, Philippines");
        app.form.set_person_location("Manila, Philippines");

        app.submit();
        app.submit();

        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::Submit { .. })));
        assert!(cmd_rx.try_recv().is_err());
        assert!(app.submitting);
    }

    #[test]
    fn accepted_submission_requests_classification_once() {
        let (mut app, cmd_rx, ui_tx) = app();
        let payload = payload();

        ui_tx
            .send(UiEvent::SubmissionAccepted(payload.clone()))
            .expect("send");
        ui_tx
            .send(UiEvent::SubmissionAccepted(payload.clone()))
            .expect("send");
        app.process_ui_events();

        match cmd_rx.try_recv() {
            Ok(BackendCommand::Classify { ticket }) => {
                assert_eq!(ticket.payload.submission_id, payload.submission_id);
            }
            _ => panic!("expected a classify command"),
        }
        assert!(cmd_rx.try_recv().is_err());
        assert!(app.viewer.state().is_loading());
    }

    #[test]
    fn stale_classification_does_not_replace_current() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        let payload = payload();
        app.apply_event(UiEvent::SubmissionAccepted(payload.clone()));

        app.apply_event(UiEvent::ClassificationFinished {
            submission_id: SubmissionId::new(),
            outcome: Ok(prediction()),
        });
        assert!(app.summary.is_none());
        assert!(app.viewer.state().is_loading());

        app.apply_event(UiEvent::ClassificationFinished {
            submission_id: payload.submission_id,
            outcome: Ok(prediction()),
        });
        let summary = app.summary.as_ref().expect("summary");
        assert!(summary.verdict.is_fraud());
        assert!(summary.echo.estimated_distance);
    }

    #[test]
    fn classification_error_clears_previous_result() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        let first = payload();
        app.apply_event(UiEvent::SubmissionAccepted(first.clone()));
        app.apply_event(UiEvent::ClassificationFinished {
            submission_id: first.submission_id,
            outcome: Ok(prediction()),
        });
        assert!(app.summary.is_some());

        let second = payload();
        app.apply_event(UiEvent::SubmissionAccepted(second.clone()));
        app.apply_event(UiEvent::ClassificationFinished {
            submission_id: second.submission_id,
            outcome: Err("Classification service unreachable".to_string()),
        });

        assert!(app.summary.is_none());
        assert!(matches!(app.viewer.state(), ViewerState::Error { .. }));
    }

    #[test]
    fn reset_clears_fields_and_validation() {
        let (mut app, _cmd_rx, _ui_tx) = app();
        app.form.set_home_address("Baguio, Philippines");
        app.submit();
        assert!(app.validation.is_some());

        app.reset_form();

        assert!(app.validation.is_none());
        assert!(app.form.fields().home_address.is_empty());
    }

    #[test]
    fn decodes_png_tree_pixels() {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let bytes = STANDARD.decode(ONE_PIXEL_PNG).expect("base64");
        let pixels = decode_tree_pixels(&bytes).expect("png");
        assert_eq!(pixels.size, [1, 1]);
        assert!(decode_tree_pixels(b"not an image").is_err());
    }
}
