use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    form::suggest_places, load_settings, FormController, FraudCheckClient, ResultViewer,
    ViewerState,
};
use shared::domain::{DistanceSource, PaymentMode, SubmissionPayload};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fraud-check", about = "Classify a card transaction as fraudulent or not")]
struct Cli {
    /// Settings file (defaults to ./fraud_check.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the form, resolve distances and classify.
    Submit(SubmitArgs),
    /// Ask the classification service whether its model is loaded.
    Health,
    /// List autocomplete suggestions for a partial place name.
    Places { query: String },
}

#[derive(Args, Debug, Default)]
struct SubmitArgs {
    #[arg(long)]
    home_address: Option<String>,
    #[arg(long)]
    average_spending: Option<String>,
    #[arg(long)]
    order_amount: Option<String>,
    /// chip, pin or online
    #[arg(long)]
    payment_mode: Option<PaymentMode>,
    #[arg(long)]
    order_address: Option<String>,
    /// Where the card holder was during the transaction.
    #[arg(long)]
    person_location: Option<String>,
    #[arg(long)]
    first_time: bool,
    /// Write the decision tree image here when the service returns one.
    #[arg(long)]
    save_tree: Option<PathBuf>,
    /// Print the raw classification response as JSON.
    #[arg(long)]
    json: bool,
}

impl SubmitArgs {
    /// Feeds the flags through the same setters the desktop form uses.
    /// Missing values are left for validation to report.
    fn to_form(&self) -> Result<FormController> {
        let mut form = FormController::new();
        if let Some(value) = &self.home_address {
            form.set_home_address(value.as_str());
        }
        if let Some(value) = &self.average_spending {
            if !form.set_average_spending(value.trim()) {
                bail!("average spending must be a plain number, got '{value}'");
            }
        }
        if let Some(value) = &self.order_amount {
            if !form.set_order_amount(value.trim()) {
                bail!("order amount must be a plain number, got '{value}'");
            }
        }
        if let Some(mode) = self.payment_mode {
            form.set_payment_mode(mode);
        }
        if let Some(value) = &self.order_address {
            form.set_order_address(value.as_str());
        }
        if let Some(value) = &self.person_location {
            form.set_person_location(value.as_str());
        }
        form.set_first_time(self.first_time);
        Ok(form)
    }
}

/// Which of the two distances came from the fallback estimate.
fn estimated_distances(payload: &SubmissionPayload) -> Vec<&'static str> {
    [
        ("home", payload.distance_sources.from_home),
        ("location", payload.distance_sources.from_location),
    ]
    .into_iter()
    .filter(|(_, source)| *source == DistanceSource::Fallback)
    .map(|(label, _)| label)
    .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Places { query } => {
            let places = suggest_places(&query);
            if places.is_empty() {
                println!("no matching places for '{query}'");
            }
            for place in places {
                println!("{place}");
            }
        }
        Command::Health => {
            let settings = load_settings(cli.config.as_deref())?;
            let client = FraudCheckClient::from_settings(&settings)?;
            let health = client
                .health()
                .await
                .with_context(|| format!("checking {}", settings.health_endpoint()))?;
            println!(
                "status={} model_loaded={}",
                health.status, health.model_loaded
            );
            if !health.is_ready() {
                bail!("classification service is not ready");
            }
        }
        Command::Submit(args) => {
            let settings = load_settings(cli.config.as_deref())?;
            let client = FraudCheckClient::from_settings(&settings)?;
            let form = args.to_form()?;
            let payload = client.prepare(&form).await?;

            tracing::info!(submission_id = %payload.submission_id, "submitting transaction");
            for label in estimated_distances(&payload) {
                tracing::warn!(submission_id = %payload.submission_id, "distance from {label} is an estimate");
            }

            let mut viewer = ResultViewer::new();
            viewer.run(client.classifier(), &payload, true).await;

            if let ViewerState::Success { result, .. } = viewer.state() {
                tracing::info!(
                    submission_id = %payload.submission_id,
                    fraudulent = result.fraudulent,
                    confidence = result.confidence,
                    "verdict received"
                );
            }
            match viewer.state() {
                ViewerState::Success { result, .. } if args.json => {
                    println!("{}", serde_json::to_string_pretty(result)?);
                }
                ViewerState::Success { .. } => {
                    if let Some(summary) = viewer.summary() {
                        print!("{summary}");
                    }
                }
                ViewerState::Error { message, .. } => bail!("{message}"),
                ViewerState::Idle | ViewerState::Loading { .. } => {
                    bail!("classification did not complete")
                }
            }

            if let Some(path) = &args.save_tree {
                let summary = viewer.summary().context("no classification result")?;
                match summary.tree_image() {
                    Some(image) => {
                        image
                            .save_to(path)
                            .with_context(|| format!("writing {}", path.display()))?;
                        eprintln!("saved decision tree to {}", path.display());
                    }
                    None => eprintln!("service returned no decision tree image"),
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::RequiredField;

    #[test]
    fn parses_submit_flags() {
        let cli = Cli::try_parse_from([
            "fraud-check",
            "--config",
            "alt.toml",
            "submit",
            "--home-address",
            "Manila, Philippines",
            "--payment-mode",
            "PIN",
            "--first-time",
        ])
        .expect("parse");

        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.payment_mode, Some(PaymentMode::Pin));
        assert!(args.first_time);
    }

    #[test]
    fn unknown_payment_mode_is_rejected() {
        let parsed = Cli::try_parse_from(["fraud-check", "submit", "--payment-mode", "cash"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn partial_flags_leave_missing_fields_for_validation() {
        let args = SubmitArgs {
            home_address: Some("Cebu City, Philippines".to_string()),
            order_amount: Some("250".to_string()),
            ..Default::default()
        };

        let err = args.to_form().expect("form").validate().expect_err("incomplete");
        assert_eq!(
            err.missing,
            vec![
                RequiredField::AverageSpending,
                RequiredField::PaymentMode,
                RequiredField::OrderAddress,
                RequiredField::PersonLocation,
            ]
        );
    }

    #[test]
    fn reports_only_estimated_distances() {
        use shared::domain::{PayeeInformation, ResolvedDistance, TransactionInformation};

        let payload = SubmissionPayload::new(
            PayeeInformation {
                home_address: "Manila, Philippines".to_string(),
                average_spending: 900.0,
            },
            TransactionInformation {
                order_amount: 120.0,
                order_address: "Pasig, Philippines".to_string(),
                payment_mode: PaymentMode::Chip,
                person_location: "Manila, Philippines".to_string(),
                is_first_time: false,
            },
            ResolvedDistance::provider(14.2),
            ResolvedDistance::fallback(100.0),
        );

        assert_eq!(estimated_distances(&payload), vec!["location"]);
    }

    #[test]
    fn non_numeric_amount_is_an_error() {
        let args = SubmitArgs {
            average_spending: Some("1,000".to_string()),
            ..Default::default()
        };
        assert!(args.to_form().is_err());
    }
}
