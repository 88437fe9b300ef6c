//! Integration tests for the prediction server

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use ndarray::Array1;
use scorecast::config::ArtifactConfig;
use scorecast::inference::{PredictPipeline, Predictor};
use scorecast::logging::PipelineLogger;
use scorecast::preprocessing::FeatureTransformer;
use scorecast::schema::StudentFeatures;
use scorecast::server::{create_router, AppState, GENERIC_MESSAGE};
use scorecast::training::{Algorithm, LinearRegression, ModelArtifact, ParamSet, TrainedModel};
use serde_json::{json, Value};
use tower::ServiceExt;

const STUB_INTERCEPT: f64 = 55.5;

/// Linear stub over the transformed features: `55.5 + Σ (i + 1)·xᵢ`
fn stub_predictor() -> Predictor {
    let transformer = FeatureTransformer::fit(&[common::sample_features(), other_features()]).unwrap();
    let n_features = transformer.n_features();
    let model = ModelArtifact {
        name: "stub".to_string(),
        algorithm: Algorithm::LinearRegression,
        params: ParamSet::new(),
        model: TrainedModel::LinearRegression(LinearRegression::from_coefficients(
            Array1::from_shape_fn(n_features, |i| (i + 1) as f64),
            STUB_INTERCEPT,
        )),
        test_r2: 1.0,
        n_features,
        trained_at: "2024-01-01T00:00:00Z".to_string(),
    };
    Predictor::new(transformer, model).unwrap()
}

fn other_features() -> StudentFeatures {
    StudentFeatures::new("male", "group C", "some college", "free/reduced", "completed", 60.0, 58.0)
}

/// What the stub answers for `features`, computed from the transformed row
fn expected_prediction(features: &StudentFeatures) -> f64 {
    let row = stub_predictor().transformer().transform(std::slice::from_ref(features));
    let weighted: f64 = row.row(0).iter().enumerate().map(|(i, v)| (i + 1) as f64 * v).sum();
    STUB_INTERCEPT + weighted
}

/// Router backed by the linear stub
fn stub_app() -> axum::Router {
    let pipeline = PredictPipeline::from_predictor(ArtifactConfig::default(), stub_predictor());
    create_router(AppState::with_pipeline(pipeline, PipelineLogger::disabled()))
}

fn assert_prediction(body: &Value, expected: f64) {
    let prediction = body["prediction"].as_f64().unwrap();
    assert!((prediction - expected).abs() < 1e-9, "{} != {}", prediction, expected);
}

fn sample_json() -> Value {
    json!({
        "gender": "female",
        "race_ethnicity": "group B",
        "parental_level_of_education": "bachelor's degree",
        "lunch": "standard",
        "test_preparation_course": "none",
        "reading_score": 72,
        "writing_score": "74"
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn assert_generic_error(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"error": true, "message": GENERIC_MESSAGE})
    );
}

#[tokio::test]
async fn test_health_check() {
    let response = stub_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_json_prediction() {
    let response = stub_app()
        .oneshot(post_json("/api/predict", &sample_json()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = expected_prediction(&common::sample_features());
    assert_ne!(expected, STUB_INTERCEPT);
    assert_prediction(&body_json(response).await, expected);
}

#[tokio::test]
async fn test_prediction_follows_the_record() {
    let other = json!({
        "gender": "male",
        "race_ethnicity": "group C",
        "parental_level_of_education": "some college",
        "lunch": "free/reduced",
        "test_preparation_course": "completed",
        "reading_score": 60,
        "writing_score": 58
    });
    let response = stub_app().oneshot(post_json("/api/predict", &other)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let expected = expected_prediction(&other_features());
    assert_ne!(expected, expected_prediction(&common::sample_features()));
    assert_prediction(&body_json(response).await, expected);
}

#[tokio::test]
async fn test_form_prediction_accepts_ethnicity_alias() {
    let form = "gender=female&ethnicity=group+B&parental_level_of_education=bachelor%27s+degree\
                &lunch=standard&test_preparation_course=none&reading_score=72&writing_score=74";
    let request = Request::builder()
        .method("POST")
        .uri("/predictdata")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let response = stub_app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_prediction(&body_json(response).await, expected_prediction(&common::sample_features()));
}

#[tokio::test]
async fn test_missing_field_returns_generic_error() {
    let mut body = sample_json();
    body.as_object_mut().unwrap().remove("lunch");

    let response = stub_app().oneshot(post_json("/api/predict", &body)).await.unwrap();
    assert_generic_error(response).await;
}

#[tokio::test]
async fn test_non_numeric_score_returns_generic_error() {
    let mut body = sample_json();
    body["reading_score"] = json!("seventy");

    let response = stub_app().oneshot(post_json("/api/predict", &body)).await.unwrap();
    assert_generic_error(response).await;
}

#[tokio::test]
async fn test_malformed_body_returns_generic_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = stub_app().oneshot(request).await.unwrap();
    assert_generic_error(response).await;
}

#[tokio::test]
async fn test_missing_artifacts_return_generic_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(ArtifactConfig::at(dir.path()), PipelineLogger::disabled());
    let app = create_router(state);

    let response = app.oneshot(post_json("/api/predict", &sample_json())).await.unwrap();
    assert_generic_error(response).await;
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = stub_app()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
