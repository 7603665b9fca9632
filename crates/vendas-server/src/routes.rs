use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, AllowOrigin, CorsLayer};

use vendas_core::{
    build_context, compose, drive, ApiError, AnalyzeRequest, AnalyzeResponse, ContextPolicy,
    DriveError, GatewayError, LlmClient, ReloadResponse, SheetStore,
};

/// Shared per-process state, passed into every handler.
///
/// `llm` is `None` when no API key is configured; analyze calls then fail
/// with a service-unavailable error while the rest of the API keeps working.
#[derive(Clone)]
pub struct AppState<L: LlmClient> {
    pub store: Arc<SheetStore>,
    pub llm: Option<L>,
    pub policy: ContextPolicy,
    pub max_context_bytes: usize,
}

pub fn router<L: LlmClient>(state: AppState<L>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze::<L>))
        .route("/api/analyze/stream", post(analyze_stream::<L>))
        .route("/api/drive/files", get(drive_files::<L>))
        .route("/api/drive/reload", post(drive_reload::<L>))
        .route("/health", get(health))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// An empty origin list allows any origin; otherwise only the configured
/// ones. Pre-flight OPTIONS requests are answered by this layer directly.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring invalid allowed origin {origin:?}");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /api/analyze`: validate, assemble context, compose, generate.
///
/// Validation happens before anything else; an empty prompt never reaches
/// the gateway.
async fn analyze<L: LlmClient>(
    State(state): State<AppState<L>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt is required", None);
    }

    let Some(llm) = state.llm.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM API key is not configured",
            None,
        );
    };

    let sheets = state.store.get().await;
    let context = build_context(&sheets, state.policy, state.max_context_bytes);
    let full_prompt = compose(&context, prompt);
    log::info!("analyze: {} sheets in context, prompt {} chars", sheets.len(), prompt.len());

    match llm.generate(&full_prompt).await {
        Ok(text) => Json(AnalyzeResponse {
            success: true,
            response: text,
            data_source: format!("{} spreadsheets analyzed", sheets.len()),
        })
        .into_response(),
        Err(err) => gateway_error_response(err),
    }
}

/// `POST /api/analyze/stream`: same validation and composition, but the
/// provider's event-stream bytes are forwarded verbatim as they arrive.
async fn analyze_stream<L: LlmClient>(
    State(state): State<AppState<L>>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "prompt is required", None);
    }

    let Some(llm) = state.llm.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "LLM API key is not configured",
            None,
        );
    };

    let sheets = state.store.get().await;
    let context = build_context(&sheets, state.policy, state.max_context_bytes);
    let full_prompt = compose(&context, prompt);

    match llm.generate_stream(&full_prompt).await {
        Ok(stream) => (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(stream),
        )
            .into_response(),
        Err(err) => gateway_error_response(err),
    }
}

async fn drive_files<L: LlmClient>(State(state): State<AppState<L>>) -> Response {
    match state.store.drive().list_files().await {
        Ok(files) => Json(drive::file_listing(&files)).into_response(),
        Err(err) => {
            log::error!("drive listing failed: {err}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to load files from the drive",
                None,
            )
        }
    }
}

async fn drive_reload<L: LlmClient>(State(state): State<AppState<L>>) -> Response {
    match state.store.reload().await {
        Ok(count) => Json(ReloadResponse {
            success: true,
            message: format!("Reloaded {count} spreadsheets"),
        })
        .into_response(),
        Err(DriveError::NotConfigured) => Json(ReloadResponse {
            success: true,
            message: "Drive is not configured; nothing to reload".to_string(),
        })
        .into_response(),
        Err(err) => {
            log::error!("drive reload failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to reload drive data", None)
        }
    }
}

fn gateway_error_response(err: GatewayError) -> Response {
    match err {
        GatewayError::RateLimited => error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Try again in a few moments.",
            None,
        ),
        GatewayError::Api { status, details } => error_response(
            StatusCode::BAD_GATEWAY,
            &format!("model provider returned status {status}"),
            Some(details),
        ),
        GatewayError::Timeout => {
            error_response(StatusCode::GATEWAY_TIMEOUT, "model provider timed out", None)
        }
        GatewayError::Network(err) => error_response(
            StatusCode::BAD_GATEWAY,
            "could not reach model provider",
            Some(err.to_string()),
        ),
        GatewayError::Empty => {
            error_response(StatusCode::BAD_GATEWAY, "model provider returned no content", None)
        }
    }
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> Response {
    (status, Json(ApiError { error: error.to_string(), details })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::Request;
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    use vendas_core::ai::ByteStream;
    use vendas_core::{DriveClient, Sheet, SheetSet};

    #[derive(Clone, Copy)]
    enum StubBehavior {
        Echo,
        RateLimited,
        ApiFailure,
    }

    /// Gateway stub that records how often it was invoked.
    #[derive(Clone)]
    struct StubLlm {
        behavior: StubBehavior,
        calls: Arc<AtomicUsize>,
    }

    impl StubLlm {
        fn new(behavior: StubBehavior) -> Self {
            Self { behavior, calls: Arc::new(AtomicUsize::new(0)) }
        }
    }

    impl LlmClient for StubLlm {
        async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                StubBehavior::Echo => Ok(format!("echo: {prompt}")),
                StubBehavior::RateLimited => Err(GatewayError::RateLimited),
                StubBehavior::ApiFailure => {
                    Err(GatewayError::Api { status: 500, details: "boom".to_string() })
                }
            }
        }

        async fn generate_stream(&self, prompt: &str) -> Result<ByteStream, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                StubBehavior::Echo => {
                    let chunk = Bytes::from(format!("data: {prompt}\n\n"));
                    Ok(Box::pin(futures_util::stream::iter(vec![Ok(chunk)])))
                }
                StubBehavior::RateLimited => Err(GatewayError::RateLimited),
                StubBehavior::ApiFailure => {
                    Err(GatewayError::Api { status: 500, details: "boom".to_string() })
                }
            }
        }
    }

    fn sheet(name: &str, rows: Vec<Vec<&str>>) -> Sheet {
        Sheet {
            name: name.to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap(),
            headers: vec!["product".to_string(), "amount".to_string()],
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(str::to_string).collect())
                .collect(),
            parse_warnings: 0,
        }
    }

    fn app_with(stub: StubLlm, sheets: SheetSet) -> Router {
        let state = AppState {
            store: Arc::new(SheetStore::with_sheets(DriveClient::new(None, None), sheets)),
            llm: Some(stub),
            policy: ContextPolicy::Exhaustive,
            max_context_bytes: 131_072,
        };
        router(state, &[])
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, value)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn analyze_without_prompt_is_rejected_before_the_gateway() {
        let stub = StubLlm::new(StubBehavior::Echo);
        let calls = stub.calls.clone();
        let app = app_with(stub, vec![sheet("q1.csv", vec![vec!["Widget", "10"]])]);

        let (status, body) = send(app, post_json("/api/analyze", serde_json::json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_with_blank_prompt_is_rejected() {
        let stub = StubLlm::new(StubBehavior::Echo);
        let calls = stub.calls.clone();
        let app = app_with(stub, vec![]);

        let (status, _) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "   "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn analyze_wires_prompt_and_context_through_the_gateway() {
        let app = app_with(
            StubLlm::new(StubBehavior::Echo),
            vec![
                sheet("q1.csv", vec![vec!["Widget", "120"]]),
                sheet("q2.csv", vec![vec!["Gadget", "80"]]),
            ],
        );

        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "hello"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let response = body["response"].as_str().unwrap();
        assert!(response.contains("hello"));
        assert!(response.contains("=== q1.csv ==="));
        assert!(response.contains("Widget, 120"));
        assert_eq!(body["dataSource"], "2 spreadsheets analyzed");
    }

    #[tokio::test]
    async fn analyze_with_empty_store_tells_the_model_there_is_no_data() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "anything?"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["response"]
            .as_str()
            .unwrap()
            .contains(vendas_core::context::NO_DATA_MARKER));
        assert_eq!(body["dataSource"], "0 spreadsheets analyzed");
    }

    #[tokio::test]
    async fn rate_limit_is_a_distinct_error() {
        let app = app_with(StubLlm::new(StubBehavior::RateLimited), vec![]);

        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "hello"}))).await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["error"].as_str().unwrap().contains("Rate limit"));
    }

    #[tokio::test]
    async fn provider_failure_maps_to_bad_gateway_with_details() {
        let app = app_with(StubLlm::new(StubBehavior::ApiFailure), vec![]);

        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "hello"}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["details"], "boom");
    }

    #[tokio::test]
    async fn missing_api_key_fails_every_analyze_call() {
        let state: AppState<StubLlm> = AppState {
            store: Arc::new(SheetStore::with_sheets(DriveClient::new(None, None), vec![])),
            llm: None,
            policy: ContextPolicy::Exhaustive,
            max_context_bytes: 131_072,
        };
        let app = router(state, &[]);

        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "hello"}))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn analyze_rejects_non_post_methods() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let request =
            Request::builder().method("GET").uri("/api/analyze").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn preflight_short_circuits_with_cors_headers() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/analyze")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn files_on_unconfigured_drive_is_a_500_not_a_crash() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let request =
            Request::builder().method("GET").uri("/api/drive/files").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn reload_on_unconfigured_drive_reports_success() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let (status, body) =
            send(app, post_json("/api/drive/reload", serde_json::json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["message"].as_str().unwrap().contains("not configured"));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn stream_endpoint_forwards_event_stream_bytes() {
        let app = app_with(StubLlm::new(StubBehavior::Echo), vec![]);

        let response = app
            .oneshot(post_json("/api/analyze/stream", serde_json::json!({"prompt": "totals"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/event-stream"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.contains("totals"));
    }

    #[tokio::test]
    async fn one_bad_file_does_not_abort_the_analyze_flow() {
        let modified = Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap();
        let mut bad = vec![0xff, 0xfe];
        bad.extend_from_slice(b"product,amount\n");

        let payloads: Vec<(&str, Vec<u8>)> = vec![
            ("q1.csv", b"product,amount\nWidget,120\n".to_vec()),
            ("broken.csv", bad),
            ("q2.csv", b"product,amount\nGadget,80\n".to_vec()),
        ];

        // Same skip-and-continue policy the loader applies per file
        let sheets: SheetSet = payloads
            .into_iter()
            .filter_map(|(name, content)| Sheet::parse_csv(name, modified, &content).ok())
            .collect();
        assert_eq!(sheets.len(), 2);

        let app = app_with(StubLlm::new(StubBehavior::Echo), sheets);
        let (status, body) =
            send(app, post_json("/api/analyze", serde_json::json!({"prompt": "totals"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dataSource"], "2 spreadsheets analyzed");
        let response = body["response"].as_str().unwrap();
        assert!(response.contains("=== q1.csv ==="));
        assert!(response.contains("=== q2.csv ==="));
        assert!(!response.contains("broken.csv"));
    }
}
