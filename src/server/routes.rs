use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::endpoints::EndpointName;
use crate::server::AppState;
use crate::Error;

/// Query-string arguments that are numbers on the wire
const NUMERIC_ARGS: &[&str] = &["minYear"];

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// Endpoint failure mapped onto an HTTP status
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self.0 {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::UnknownEndpoint(name) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("endpoint '{}' not found", name),
            ),
            other => {
                // Log the actual error, return generic message
                tracing::error!("Endpoint error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "an internal error occurred".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_endpoints() -> Json<Value> {
    let endpoints: Vec<Value> = EndpointName::all()
        .iter()
        .map(|name| json!({ "name": name.as_str(), "cacheable": name.is_cacheable() }))
        .collect();
    Json(Value::Array(endpoints))
}

/// `GET /api/{name}?venue=..&minYear=..`
pub async fn get_endpoint(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let value = invoke_blocking(&state, name, query_args(params)).await?;
    Ok(Json(value))
}

/// `POST /api/{name}` with the arguments as the JSON body
pub async fn post_endpoint(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let args = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::Validation(format!("invalid JSON body: {}", e)))?
    };
    let value = invoke_blocking(&state, name, args).await?;
    Ok(Json(value))
}

/// Run an endpoint on the blocking pool so SQLite work stays off the async workers
async fn invoke_blocking(state: &AppState, name: String, args: Value) -> Result<Value, ApiError> {
    let endpoints = Arc::clone(&state.endpoints);
    let value = tokio::task::spawn_blocking(move || endpoints.invoke(&name, &args))
        .await
        .map_err(|e| Error::Io(e.into()))??;
    Ok(value)
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.endpoints.clear_cache();
    Json(json!({ "status": "cleared" }))
}

fn query_args(params: HashMap<String, String>) -> Value {
    if params.is_empty() {
        return Value::Null;
    }
    let args: Map<String, Value> = params
        .into_iter()
        .map(|(key, raw)| {
            let value = if NUMERIC_ARGS.contains(&key.as_str()) {
                numeric_arg(raw)
            } else {
                Value::String(raw)
            };
            (key, value)
        })
        .collect();
    Value::Object(args)
}

/// Integer when exact, else a finite float; anything else stays a string
fn numeric_arg(raw: String) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::Endpoints;
    use crate::model::PaperCount;
    use crate::server::create_router;
    use crate::storage::SqliteStore;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_papers(&[
                PaperCount::new("Nature", 2021, 7),
                PaperCount::new("Nature", 2020, 5),
            ])
            .unwrap();
        let state = Arc::new(AppState { endpoints: Arc::new(Endpoints::new(Arc::new(store))) });
        create_router(state, std::env::temp_dir())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_all_papers() {
        let response = app()
            .oneshot(Request::builder().uri("/api/getAllPapers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(
            body,
            json!([
                {"venue": "Nature", "year": 2020, "count": 5},
                {"venue": "Nature", "year": 2021, "count": 7},
            ])
        );
    }

    #[tokio::test]
    async fn test_filtered_papers_query_string() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/getFilteredPapers?venue=Nature&minYear=2021")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([{"year": 2021, "count": 7}]));
    }

    #[tokio::test]
    async fn test_filtered_papers_post_body() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/getFilteredPapers")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"venue": "Nature", "minYear": 2000}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn test_validation_is_bad_request() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/getFilteredPapers?venue=Nature&minYear=recent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/api/getAuthors").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fractional_min_year_query_string() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/getFilteredPapers?venue=Nature&minYear=2020.5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([{"year": 2021, "count": 7}]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_share_store() {
        let router = app();
        let requests = (0..8).map(|i| {
            let uri = if i % 2 == 0 {
                "/api/getAllPapers"
            } else {
                "/api/getFilteredPapers?venue=Nature&minYear=2021"
            };
            router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        });

        let handles: Vec<_> = requests.map(tokio::spawn).collect();
        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[test]
    fn test_query_args_only_converts_numeric_keys() {
        let mut params = HashMap::new();
        params.insert("venue".to_string(), "1999".to_string());
        params.insert("minYear".to_string(), "1999".to_string());
        let args = query_args(params);
        assert_eq!(args["venue"], json!("1999"));
        assert_eq!(args["minYear"], json!(1999));
    }

    #[test]
    fn test_numeric_arg_forms() {
        assert_eq!(numeric_arg("2000.5".into()), json!(2000.5));
        assert_eq!(numeric_arg("1e19".into()), json!(1e19));
        assert_eq!(numeric_arg("inf".into()), json!("inf"));
        assert_eq!(numeric_arg("recent".into()), json!("recent"));
    }
}
