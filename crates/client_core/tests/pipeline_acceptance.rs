use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use client_core::{FormController, FraudCheckClient, ResultViewer, Settings, ViewerState};
use serde_json::{json, Value};
use shared::domain::{DistanceSource, PaymentMode};
use tokio::{net::TcpListener, sync::Mutex};

// 1x1 transparent PNG.
const TINY_PNG_B64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

#[derive(Clone, Default)]
struct MockServices {
    maps_hits: Arc<AtomicUsize>,
    classify_bodies: Arc<Mutex<Vec<Value>>>,
    model_loaded: bool,
}

async fn distance_matrix(
    State(services): State<MockServices>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    services.maps_hits.fetch_add(1, Ordering::SeqCst);
    let origin = params.get("origins").cloned().unwrap_or_default();
    if origin.starts_with("Quezon City") {
        Json(json!({
            "status": "OK",
            "rows": [{"elements": [{"status": "OK", "distance": {"value": 12400.0}}]}]
        }))
    } else {
        Json(json!({
            "status": "OK",
            "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]
        }))
    }
}

async fn classify(
    State(services): State<MockServices>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !services.model_loaded {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "Model not loaded"})),
        );
    }
    services.classify_bodies.lock().await.push(body);
    (
        StatusCode::OK,
        Json(json!({
            "fraudulent": true,
            "confidence": 87.25,
            "feature_importance": {
                "distance_from_home": 0.52,
                "ratio_to_median_purchase_price": 0.31,
                "online_order": 0.17
            },
            "processed_features": {"online_order": 1},
            "tree_visualization": format!("data:image/png;base64,{TINY_PNG_B64}")
        })),
    )
}

async fn health(State(services): State<MockServices>) -> Json<Value> {
    let status = if services.model_loaded { "ok" } else { "degraded" };
    Json(json!({"status": status, "model_loaded": services.model_loaded}))
}

async fn spawn_services(services: MockServices) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let router = Router::new()
        .route("/maps/distancematrix/json", get(distance_matrix))
        .route("/api/classify", post(classify))
        .route("/api/health", get(health))
        .with_state(services);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn settings_for(base: &str, maps_api_key: Option<&str>) -> Settings {
    Settings {
        classifier_url: base.to_string(),
        distance_matrix_url: format!("{base}/maps/distancematrix/json"),
        maps_api_key: maps_api_key.map(str::to_string),
        request_timeout_secs: 5,
        ..Settings::default()
    }
}

fn filled_form() -> FormController {
    let mut form = FormController::new();
    form.set_home_address("Quezon City, Philippines");
    assert!(form.set_average_spending("1800"));
    assert!(form.set_order_amount("24999.99"));
    form.set_payment_mode(PaymentMode::Online);
    form.set_order_address("Makati, Philippines");
    form.set_person_location("Davao City, Philippines");
    form.set_first_time(true);
    form
}

#[tokio::test]
async fn submission_with_partial_provider_failure_is_classified() {
    let services = MockServices {
        model_loaded: true,
        ..MockServices::default()
    };
    let base = spawn_services(services.clone()).await;
    let client =
        FraudCheckClient::from_settings(&settings_for(&base, Some("test-key"))).expect("client");

    let payload = client.prepare(&filled_form()).await.expect("valid form");

    assert_eq!(services.maps_hits.load(Ordering::SeqCst), 2);
    assert!((payload.distance_from_home - 12.4).abs() < 1e-9);
    assert_eq!(payload.distance_sources.from_home, DistanceSource::Provider);
    // Davao and Makati are different cities.
    assert_eq!(payload.distance_from_location, 100.0);
    assert_eq!(payload.distance_sources.from_location, DistanceSource::Fallback);

    let mut viewer = ResultViewer::new();
    viewer.run(client.classifier(), &payload, true).await;

    let summary = viewer.summary().expect("classification succeeded");
    assert!(summary.verdict.is_fraud());
    assert!((summary.confidence_pct - 87.25).abs() < 1e-9);
    assert_eq!(summary.importances[0].name, "distance_from_home");
    assert!(summary.echo.estimated_distance);
    let tree = summary.tree_image().expect("tree image");
    assert_eq!(tree.suggested_file_name(), "decision_tree.png");

    let bodies = services.classify_bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["payeeInformation"]["homeAddress"], "Quezon City, Philippines");
    assert_eq!(body["transactionInformation"]["paymentMode"], "online");
    assert_eq!(body["transactionInformation"]["isFirstTime"], true);
    assert_eq!(body["distance_from_location"], 100.0);
    // The service reads the home distance from `distance`.
    assert_eq!(body["distance"], body["distance_from_home"]);
    assert!((body["distance"].as_f64().expect("number") - 12.4).abs() < 1e-9);
}

#[tokio::test]
async fn missing_maps_key_skips_provider_entirely() {
    let services = MockServices {
        model_loaded: true,
        ..MockServices::default()
    };
    let base = spawn_services(services.clone()).await;
    let client = FraudCheckClient::from_settings(&settings_for(&base, None)).expect("client");

    let payload = client.prepare(&filled_form()).await.expect("valid form");

    assert_eq!(services.maps_hits.load(Ordering::SeqCst), 0);
    assert!(payload.distance_sources.from_home == DistanceSource::Fallback);
    assert_eq!(payload.distance_from_home, 100.0);
}

#[tokio::test]
async fn incomplete_form_never_reaches_the_network() {
    let services = MockServices::default();
    let base = spawn_services(services.clone()).await;
    let client =
        FraudCheckClient::from_settings(&settings_for(&base, Some("test-key"))).expect("client");

    let mut form = filled_form();
    form.set_person_location("   ");
    let err = client.prepare(&form).await.expect_err("location is blank");

    assert_eq!(err.missing.len(), 1);
    assert_eq!(services.maps_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unloaded_model_surfaces_service_error() {
    let services = MockServices::default();
    let base = spawn_services(services.clone()).await;
    let client = FraudCheckClient::from_settings(&settings_for(&base, None)).expect("client");

    let health = client.health().await.expect("health");
    assert!(!health.is_ready());

    let payload = client.prepare(&filled_form()).await.expect("valid form");
    let mut viewer = ResultViewer::new();
    viewer.run(client.classifier(), &payload, true).await;

    match viewer.state() {
        ViewerState::Error { message, .. } => assert!(message.contains("Model not loaded")),
        other => panic!("expected error state, got {other:?}"),
    }
    assert!(viewer.summary().is_none());
}
