//! HTTP surface: health, single, batch and GeoJSON prediction routes.
//!
//! Bodies are read as raw bytes and parsed as JSON regardless of the
//! `Content-Type` header. Every failure is answered with an `ErrorResponse`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::common::error::{CropError, CropResult, InferenceError};
use crate::features::InputRecord;
use crate::inference::{geojson, service, AppContext, Recommendation};

pub const MODEL_NAME: &str = "crop-recommender";

/// Body of `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub model: String,
    pub features: Vec<String>,
}

/// Error payload shared by every route.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &CropError) -> StatusCode {
    match err {
        CropError::MissingFeatures { .. } | CropError::MalformedRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        CropError::Inference(InferenceError::Backend(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        CropError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CropError::Batch { source, .. } => status_for(source),
        CropError::Decode(_) | CropError::Artifact { .. } | CropError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn api_error(err: CropError) -> ApiError {
    let status = status_for(&err);
    let code = err.code() as u32;
    if err.is_client_error() {
        warn!(code, error = %err, "request rejected");
    } else {
        error!(code, error = %err, "request failed");
    }

    let index = match &err {
        CropError::Batch { index, .. } => Some(*index),
        _ => None,
    };
    let body = ErrorResponse {
        error: err.to_string(),
        code,
        missing: err.missing().map(<[String]>::to_vec),
        index,
    };
    (status, Json(body))
}

fn parse_body(body: &[u8]) -> CropResult<Value> {
    serde_json::from_slice(body)
        .map_err(|err| CropError::malformed(format!("invalid JSON body: {err}")))
}

/// Run CPU-bound work off the async executor.
async fn run_blocking<T, F>(ctx: Arc<AppContext>, job: F) -> CropResult<T>
where
    F: FnOnce(&AppContext) -> CropResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&ctx))
        .await
        .map_err(|err| CropError::Internal(err.to_string()))?
}

pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .route("/predict-batch", post(predict_batch))
        .route("/predict-geojson", post(predict_geojson))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(ctx)
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        model: MODEL_NAME.to_string(),
        features: ctx.spec.names(),
    })
}

async fn predict(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<Recommendation>, ApiError> {
    let record = parse_body(&body)
        .and_then(InputRecord::from_value)
        .map_err(api_error)?;

    run_blocking(ctx, move |ctx| service::predict_one(ctx, &record))
        .await
        .map(Json)
        .map_err(api_error)
}

async fn predict_batch(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let items = match parse_body(&body).map_err(api_error)? {
        Value::Array(items) => items,
        _ => {
            return Err(api_error(CropError::malformed(
                "expected a JSON array of records",
            )))
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| InputRecord::from_value(item).map_err(|err| err.in_batch(index)))
        .collect::<CropResult<Vec<_>>>()
        .map_err(api_error)?;

    run_blocking(ctx, move |ctx| service::predict_batch(ctx, &records))
        .await
        .map(Json)
        .map_err(api_error)
}

async fn predict_geojson(
    State(ctx): State<Arc<AppContext>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let collection = parse_body(&body).map_err(api_error)?;

    run_blocking(ctx, move |ctx| geojson::predict_collection(ctx, collection))
        .await
        .map(Json)
        .map_err(api_error)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request},
    };
    use serde_json::json;
    use tower::util::ServiceExt;

    use super::*;
    use crate::inference::service::tests::{crop_context, sample_payload};

    fn create_test_app() -> Router {
        create_router(Arc::new(crop_context()))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(uri: &str, payload: Value) -> (StatusCode, Value) {
        send(
            create_test_app(),
            Method::POST,
            uri,
            Body::from(serde_json::to_vec(&payload).unwrap()),
        )
        .await
    }

    #[tokio::test]
    async fn test_health_lists_features_in_order() {
        let app = create_test_app();
        for _ in 0..2 {
            let (status, body) = send(app.clone(), Method::GET, "/", Body::empty()).await;
            assert_eq!(status, StatusCode::OK);
            let health: HealthResponse = serde_json::from_value(body).unwrap();
            assert!(health.ok);
            assert_eq!(health.model, "crop-recommender");
            assert_eq!(
                health.features,
                vec!["N", "P", "K", "temperature", "humidity", "ph", "rainfall"]
            );
        }
    }

    #[tokio::test]
    async fn test_predict_sample_payload() {
        let (status, body) = post_json("/predict", sample_payload()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"recommended_crop": "rice"}));
    }

    #[tokio::test]
    async fn test_predict_without_k_names_it() {
        let mut payload = sample_payload();
        payload.as_object_mut().unwrap().remove("K");

        let (status, body) = post_json("/predict", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let err: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(err.missing, Some(vec!["K".to_string()]));
        assert_eq!(err.error, "missing features: K");
    }

    #[tokio::test]
    async fn test_predict_ignores_content_type() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/predict")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(sample_payload().to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_invalid_json_is_bad_request() {
        let (status, body) =
            send(create_test_app(), Method::POST, "/predict", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));
        assert_eq!(body["code"], json!(2));
    }

    #[tokio::test]
    async fn test_predict_non_numeric_is_unprocessable() {
        let mut payload = sample_payload();
        payload["humidity"] = json!("wet");
        let (status, body) = post_json("/predict", payload).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("not numeric"));
    }

    #[tokio::test]
    async fn test_predict_batch_in_order() {
        let mut dry = sample_payload();
        dry["rainfall"] = json!(20.0);
        dry["N"] = json!(10);

        let (status, body) = post_json("/predict-batch", json!([sample_payload(), dry])).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"recommended_crop": "rice"}, {"recommended_crop": "lentil"}])
        );
    }

    #[tokio::test]
    async fn test_predict_batch_fails_whole() {
        let (status, body) =
            post_json("/predict-batch", json!([sample_payload(), {"N": 3}])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["index"], json!(1));
        assert!(body.get("recommended_crop").is_none());

        let (status, _) = post_json("/predict-batch", json!([sample_payload(), 5])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = post_json("/predict-batch", sample_payload()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_geojson_partial_failure() {
        let mut incomplete = sample_payload();
        incomplete.as_object_mut().unwrap().remove("N");
        let point = json!({"type": "Point", "coordinates": [0.0, 0.0]});

        let input = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "geometry": point, "properties": sample_payload()},
                {"type": "Feature", "geometry": point, "properties": incomplete},
                {"type": "Feature", "geometry": point, "properties": sample_payload()}
            ]
        });
        let (status, body) = post_json("/predict-geojson", input).await;
        assert_eq!(status, StatusCode::OK);

        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["properties"]["recommended_crop"], json!("rice"));
        assert_eq!(
            features[1]["properties"]["recommended_crop_error"],
            json!("missing features: N")
        );
        assert_eq!(features[2]["properties"]["recommended_crop"], json!("rice"));
        assert_eq!(features[1]["geometry"], point);
    }

    #[tokio::test]
    async fn test_predict_geojson_rejects_other_types() {
        let (status, body) = post_json("/predict-geojson", json!({"type": "Feature"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("Expecting FeatureCollection"));
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let response = create_test_app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "https://fields.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
