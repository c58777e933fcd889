//! Display model for a classification verdict, shared by the desktop and CLI
//! front ends.

use std::{cmp::Ordering, fmt, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local, Utc};
use shared::{
    domain::{PaymentMode, SubmissionPayload},
    protocol::PredictionResult,
};
use thiserror::Error;

const CONFIDENCE_BAR_CELLS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Fraudulent,
    Legitimate,
}

impl Verdict {
    pub fn banner_label(self) -> &'static str {
        match self {
            Verdict::Fraudulent => "Fraudulent",
            Verdict::Legitimate => "Not Fraudulent",
        }
    }

    pub fn is_fraud(self) -> bool {
        self == Verdict::Fraudulent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWeight {
    pub name: String,
    pub weight: f64,
}

/// Key submitted values echoed next to the verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEcho {
    pub order_amount: f64,
    pub average_spending: f64,
    pub payment_mode: PaymentMode,
    pub order_address: String,
    pub distance_from_home: f64,
    pub distance_from_location: f64,
    pub is_first_time: bool,
    pub estimated_distance: bool,
    pub submitted_at: DateTime<Utc>,
}

impl TransactionEcho {
    pub fn submitted_local(&self) -> String {
        self.submitted_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

#[derive(Debug, Error)]
pub enum TreeImageError {
    #[error("tree visualization is not base64 encoded")]
    NotBase64,
    #[error("tree visualization could not be decoded: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("tree visualization is empty")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl TreeImage {
    /// Accepts a `data:<mime>;base64,<payload>` URL or a bare base64 PNG.
    pub fn from_encoded(encoded: &str) -> Result<Self, TreeImageError> {
        let encoded = encoded.trim();
        let (mime_type, data) = match encoded.strip_prefix("data:") {
            Some(rest) => {
                let (header, data) = rest.split_once(',').ok_or(TreeImageError::NotBase64)?;
                let mime = header
                    .strip_suffix(";base64")
                    .ok_or(TreeImageError::NotBase64)?;
                let mime = if mime.is_empty() { "image/png" } else { mime };
                (mime.to_string(), data)
            }
            None => ("image/png".to_string(), encoded),
        };

        let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact)?;
        if bytes.is_empty() {
            return Err(TreeImageError::Empty);
        }
        Ok(Self { mime_type, bytes })
    }

    pub fn file_extension(&self) -> &str {
        self.mime_type
            .strip_prefix("image/")
            .map(|ext| if ext == "jpeg" { "jpg" } else { ext })
            .unwrap_or("bin")
    }

    pub fn suggested_file_name(&self) -> String {
        format!("decision_tree.{}", self.file_extension())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

#[derive(Debug)]
pub enum TreeVisualization {
    Absent,
    Image(TreeImage),
    Invalid(TreeImageError),
}

#[derive(Debug)]
pub struct ResultSummary {
    pub verdict: Verdict,
    /// Clamped to `0..=100`.
    pub confidence_pct: f64,
    pub echo: TransactionEcho,
    /// Descending by weight, ties by name.
    pub importances: Vec<FeatureWeight>,
    pub tree: TreeVisualization,
}

impl ResultSummary {
    pub fn new(payload: &SubmissionPayload, result: &PredictionResult) -> Self {
        let verdict = if result.fraudulent {
            Verdict::Fraudulent
        } else {
            Verdict::Legitimate
        };
        let confidence_pct = if result.confidence.is_finite() {
            result.confidence.clamp(0.0, 100.0)
        } else {
            0.0
        };

        let tree = match result.tree_visualization.as_deref() {
            None => TreeVisualization::Absent,
            Some(raw) if raw.trim().is_empty() => TreeVisualization::Absent,
            Some(raw) => match TreeImage::from_encoded(raw) {
                Ok(image) => TreeVisualization::Image(image),
                Err(err) => {
                    tracing::warn!(error = %err, "ignoring undecodable tree visualization");
                    TreeVisualization::Invalid(err)
                }
            },
        };

        Self {
            verdict,
            confidence_pct,
            echo: TransactionEcho {
                order_amount: payload.transaction.order_amount,
                average_spending: payload.payee.average_spending,
                payment_mode: payload.transaction.payment_mode,
                order_address: payload.transaction.order_address.clone(),
                distance_from_home: payload.distance_from_home,
                distance_from_location: payload.distance_from_location,
                is_first_time: payload.transaction.is_first_time,
                estimated_distance: payload.used_fallback(),
                submitted_at: payload.submitted_at,
            },
            importances: rank_importances(result),
            tree,
        }
    }

    /// Fill fraction of the confidence meter.
    pub fn confidence_fraction(&self) -> f32 {
        (self.confidence_pct / 100.0) as f32
    }

    pub fn tree_image(&self) -> Option<&TreeImage> {
        match &self.tree {
            TreeVisualization::Image(image) => Some(image),
            _ => None,
        }
    }
}

pub fn rank_importances(result: &PredictionResult) -> Vec<FeatureWeight> {
    let mut ranked: Vec<FeatureWeight> = result
        .feature_importance
        .iter()
        .map(|(name, weight)| FeatureWeight {
            name: name.clone(),
            weight: *weight,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked
}

fn confidence_bar(pct: f64) -> String {
    let filled = ((pct / 100.0) * CONFIDENCE_BAR_CELLS as f64).round() as usize;
    let filled = filled.min(CONFIDENCE_BAR_CELLS);
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(CONFIDENCE_BAR_CELLS - filled)
    )
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.verdict.is_fraud() { "!!" } else { "ok" };
        writeln!(f, "Classification: [{marker}] {}", self.verdict.banner_label())?;
        writeln!(
            f,
            "Confidence:     {} {:.2}%",
            confidence_bar(self.confidence_pct),
            self.confidence_pct
        )?;
        writeln!(f)?;

        let echo = &self.echo;
        writeln!(f, "Order amount:   {:.2}", echo.order_amount)?;
        writeln!(f, "Avg spending:   {:.2}", echo.average_spending)?;
        writeln!(f, "Payment mode:   {}", echo.payment_mode.label())?;
        writeln!(f, "Order address:  {}", echo.order_address)?;
        let note = if echo.estimated_distance { " (estimated)" } else { "" };
        writeln!(
            f,
            "Distances:      {:.1} km from home, {:.1} km from location{note}",
            echo.distance_from_home, echo.distance_from_location
        )?;
        writeln!(
            f,
            "First time:     {}",
            if echo.is_first_time { "yes" } else { "no" }
        )?;
        writeln!(f, "Submitted:      {}", echo.submitted_local())?;

        if !self.importances.is_empty() {
            writeln!(f)?;
            writeln!(f, "Feature importance:")?;
            for (rank, feature) in self.importances.iter().enumerate() {
                writeln!(
                    f,
                    "  {:>2}. {:<32} {:>6.2}%",
                    rank + 1,
                    feature.name,
                    feature.weight * 100.0
                )?;
            }
        }

        match &self.tree {
            TreeVisualization::Absent => {}
            TreeVisualization::Image(image) => {
                writeln!(f)?;
                writeln!(f, "Decision tree:  {} image, {} bytes", image.mime_type, image.bytes.len())?;
            }
            TreeVisualization::Invalid(err) => {
                writeln!(f)?;
                writeln!(f, "Decision tree:  unavailable ({err})")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
