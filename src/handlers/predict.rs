//! Prediction handler
//!
//! received -> normalizing -> predicting -> responding. A failure in any
//! stage skips the rest and goes straight to the error response.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use tracing::Span;
use uuid::Uuid;

use crate::inference;
use crate::models::{PredictQuery, PredictResponse, RawPredictionRequest};
use crate::normalize::normalize;
use crate::{AppError, AppResult, AppState};

/// Score a patient record
pub async fn predict(
    State(state): State<AppState>,
    query: Result<Query<PredictQuery>, QueryRejection>,
    payload: Result<Json<RawPredictionRequest>, JsonRejection>,
) -> AppResult<Json<PredictResponse>> {
    let Query(query) = query.map_err(|e| {
        tracing::warn!("Rejected prediction query: {}", e.body_text());
        AppError::BadRequest(e.body_text())
    })?;
    let Json(raw) = payload.map_err(|e| {
        tracing::warn!("Rejected prediction body: {}", e.body_text());
        AppError::BadRequest(e.body_text())
    })?;

    let diagnostics = query.diagnostics_enabled();
    let bundle = state.bundle.clone();
    let span = request_span(&Span::current(), Uuid::new_v4(), diagnostics);

    // Inference is CPU-bound; keep it off the async workers
    let response = tokio::task::spawn_blocking(move || {
        span.in_scope(|| -> AppResult<PredictResponse> {
            let features = normalize(&raw).map_err(|e| {
                tracing::warn!("Rejected input: {}", e);
                AppError::from(e)
            })?;

            let prediction = inference::predict(&bundle, &features)?;

            tracing::info!(
                "risk_pct={} action={} version={}",
                prediction.risk_pct,
                prediction.action,
                bundle.version().id
            );

            Ok(PredictResponse {
                risk_pct: prediction.risk_pct,
                action: prediction.action,
                recommendation: prediction.action.recommendation(),
                model_version: bundle.version().id.clone(),
                normalized_input: diagnostics.then_some(features),
            })
        })
    })
    .await??;

    Ok(Json(response))
}

/// Per-request span, nested under the HTTP span so the request id shows up
/// next to the access log even though the work runs on a blocking thread.
fn request_span(parent: &Span, request_id: Uuid, diagnostics: bool) -> Span {
    tracing::info_span!(parent: parent, "predict", %request_id, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{example_request, test_app};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use tracing::span::{Attributes, Id};
    use tracing::Subscriber;
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::{LookupSpan, Registry};

    /// Records `(span, parent)` names as spans are created
    #[derive(Clone, Default)]
    struct ParentRecorder(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl<S> Layer<S> for ParentRecorder
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, _attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
            if let Some(span) = ctx.span(id) {
                let parent = span.parent().map(|p| p.name().to_string());
                self.0.lock().push((span.name().to_string(), parent));
            }
        }
    }

    async fn post(uri: &str, body: String) -> (StatusCode, Value) {
        let (_dir, app) = test_app();
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_predict_example_is_deterministic() {
        let (status, first) = post("/predict", example_request().to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["risk_pct"], json!(50.0));
        assert_eq!(first["action"], "follow_up");
        assert_eq!(first["model_version"], "model_v20240101_120000");
        assert!(first.get("normalized_input").is_none());

        for _ in 0..3 {
            let (_, again) = post("/api/v1/predict", example_request().to_string()).await;
            assert_eq!(again["risk_pct"], first["risk_pct"]);
            assert_eq!(again["action"], first["action"]);
        }
    }

    #[tokio::test]
    async fn test_predict_high_risk() {
        let mut body = example_request();
        body["hepatitis_b"] = json!(1);

        let (status, value) = post("/predict", body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["risk_pct"], json!(88.08));
        assert_eq!(value["action"], "immediate_appointment");
        assert!(value["recommendation"].as_str().unwrap().starts_with("Alert"));
    }

    #[tokio::test]
    async fn test_unknown_gender_rejected() {
        let mut body = example_request();
        body["gender"] = json!("Unknown");

        let (status, value) = post("/predict", body.to_string()).await;
        assert!(status.is_client_error());
        assert_eq!(value["field"], "gender");
        assert!(value["error"].as_str().unwrap().contains("gender"));
        assert_eq!(value["status"], 400);
    }

    #[tokio::test]
    async fn test_invalid_flag_rejected() {
        let mut body = example_request();
        body["diabetes"] = json!(3);

        let (status, value) = post("/predict", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["field"], "diabetes");
    }

    #[tokio::test]
    async fn test_missing_required_field() {
        let mut body = example_request();
        body.as_object_mut().unwrap().remove("weight_kg");

        let (status, value) = post("/predict", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["field"], "weight_kg");
    }

    #[tokio::test]
    async fn test_bad_query_gets_json_error() {
        let (status, value) = post(
            "/predict?diagnostics=1&diagnostics=0",
            example_request().to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["status"], 400);
        assert!(value["error"].as_str().unwrap().contains("diagnostics"));
        assert!(value.get("field").is_none());
    }

    #[test]
    fn test_request_span_keeps_http_parent() {
        let recorder = ParentRecorder::default();
        let subscriber = Registry::default().with(recorder.clone());

        tracing::subscriber::with_default(subscriber, || {
            let http = tracing::info_span!("request");
            // Not entered: the parent must be explicit, as on a blocking thread
            let _span = request_span(&http, Uuid::nil(), false);
        });

        let seen = recorder.0.lock();
        assert!(seen.contains(&("predict".to_string(), Some("request".to_string()))));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let (status, value) = post("/predict", "{\"age\": ".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].is_string());
        assert!(value.get("field").is_none());
    }

    #[tokio::test]
    async fn test_diagnostics_echo_canonical_tokens() {
        let mut body = example_request();
        body["gender"] = json!("masculino");
        body["physical_activity_level"] = json!(" moderada ");
        body["alpha_fetoprotein_level"] = json!("");
        body["hepatitis_c"] = json!("no");

        let (status, value) = post("/predict?diagnostics=true", body.to_string()).await;
        assert_eq!(status, StatusCode::OK);

        let echo = &value["normalized_input"];
        assert_eq!(echo["gender"], "Male");
        assert_eq!(echo["alcohol_consumption"], "Never");
        assert_eq!(echo["smoking_status"], "Never");
        assert_eq!(echo["physical_activity_level"], "Moderate");
        assert_eq!(echo["alpha_fetoprotein_level"], json!(0.0));
        assert_eq!(echo["hepatitis_c"], json!(0));
        assert_eq!(echo["age"], json!(55.0));
        assert!(echo.get("height_cm").is_none());
        assert!((echo["bmi"].as_f64().unwrap() - 80.0 / (1.7 * 1.7)).abs() < 1e-9);
    }
}
