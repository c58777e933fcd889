use super::*;

use std::collections::BTreeMap;

use shared::domain::{PayeeInformation, ResolvedDistance, TransactionInformation};

// 1x1 transparent PNG.
const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

fn payload() -> SubmissionPayload {
    SubmissionPayload::new(
        PayeeInformation {
            home_address: "Manila".to_string(),
            average_spending: 800.0,
        },
        TransactionInformation {
            order_amount: 15000.0,
            order_address: "Davao City".to_string(),
            payment_mode: PaymentMode::Online,
            person_location: "Cebu City".to_string(),
            is_first_time: true,
        },
        ResolvedDistance::provider(960.0),
        ResolvedDistance::fallback(100.0),
    )
}

fn result(fraudulent: bool, confidence: f64, weights: &[(&str, f64)]) -> PredictionResult {
    PredictionResult {
        fraudulent,
        confidence,
        feature_importance: weights
            .iter()
            .map(|(name, weight)| (name.to_string(), *weight))
            .collect::<BTreeMap<_, _>>(),
        processed_features: serde_json::Map::new(),
        tree_visualization: None,
    }
}

#[test]
fn fraudulent_result_renders_fraud_banner_and_matching_bar() {
    let summary = ResultSummary::new(&payload(), &result(true, 87.25, &[]));
    assert_eq!(summary.verdict, Verdict::Fraudulent);
    assert_eq!(summary.verdict.banner_label(), "Fraudulent");
    assert_eq!(summary.confidence_pct, 87.25);
    assert!((summary.confidence_fraction() - 0.8725).abs() < 1e-6);
}

#[test]
fn legitimate_result_uses_pass_banner() {
    let summary = ResultSummary::new(&payload(), &result(false, 64.0, &[]));
    assert_eq!(summary.verdict.banner_label(), "Not Fraudulent");
    assert!(!summary.verdict.is_fraud());
}

#[test]
fn confidence_is_clamped_to_percentage_range() {
    assert_eq!(
        ResultSummary::new(&payload(), &result(true, 140.0, &[])).confidence_pct,
        100.0
    );
    assert_eq!(
        ResultSummary::new(&payload(), &result(true, -3.0, &[])).confidence_pct,
        0.0
    );
}

#[test]
fn importances_rank_descending_by_weight() {
    let summary = ResultSummary::new(&payload(), &result(true, 90.0, &[("b", 0.3), ("a", 0.7)]));
    let names: Vec<&str> = summary.importances.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn equal_weights_fall_back_to_name_order() {
    let summary = ResultSummary::new(
        &payload(),
        &result(true, 90.0, &[("Used PIN", 0.2), ("Online order", 0.2), ("Ratio", 0.6)]),
    );
    let names: Vec<&str> = summary.importances.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["Ratio", "Online order", "Used PIN"]);
}

#[test]
fn echo_carries_submitted_fields() {
    let summary = ResultSummary::new(&payload(), &result(false, 70.0, &[]));
    assert_eq!(summary.echo.order_amount, 15000.0);
    assert_eq!(summary.echo.payment_mode, PaymentMode::Online);
    assert!(summary.echo.estimated_distance);
}

#[test]
fn decodes_data_url_tree_visualization() {
    let mut prediction = result(true, 99.0, &[]);
    prediction.tree_visualization = Some(format!("data:image/png;base64,{TINY_PNG_B64}"));

    let summary = ResultSummary::new(&payload(), &prediction);
    let image = summary.tree_image().expect("tree image");
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(&image.bytes[1..4], b"PNG");
    assert_eq!(image.suggested_file_name(), "decision_tree.png");
}

#[test]
fn bare_base64_tree_is_accepted() {
    let image = TreeImage::from_encoded(TINY_PNG_B64).expect("decode");
    assert_eq!(image.file_extension(), "png");
}

#[test]
fn garbage_tree_visualization_is_reported_not_fatal() {
    let mut prediction = result(false, 55.0, &[]);
    prediction.tree_visualization = Some("data:image/png;base64,@@not-base64@@".to_string());

    let summary = ResultSummary::new(&payload(), &prediction);
    assert!(summary.tree_image().is_none());
    assert!(matches!(summary.tree, TreeVisualization::Invalid(_)));
}

#[test]
fn missing_tree_is_absent() {
    let summary = ResultSummary::new(&payload(), &result(false, 55.0, &[]));
    assert!(matches!(summary.tree, TreeVisualization::Absent));
}

#[test]
fn text_rendering_lists_ranked_features() {
    let summary = ResultSummary::new(&payload(), &result(true, 50.0, &[("b", 0.3), ("a", 0.7)]));
    let text = summary.to_string();
    assert!(text.contains("Classification: [!!] Fraudulent"));
    assert!(text.contains("[##########----------] 50.00%"));
    let a = text.find(" a ").expect("a listed");
    let b = text.find(" b ").expect("b listed");
    assert!(a < b);
    assert!(text.contains("(estimated)"));
}
