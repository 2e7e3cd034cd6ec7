use crate::auth::Authenticator;
use crate::metrics::Metrics;
use crate::monitor::{Monitor, DEFAULT_HISTORY_LIMIT};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpAppState {
    pub monitor: Arc<Monitor>,
    pub auth: Arc<Authenticator>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, serde::Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, serde::Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

pub fn build_router(
    monitor: Arc<Monitor>,
    auth: Arc<Authenticator>,
    metrics: Arc<Metrics>,
) -> Router {
    Router::new()
        .route("/api/login", post(login_handler))
        .route("/api/system-status", get(system_status_handler))
        .route("/api/system-history", get(system_history_handler))
        .route("/api/system-info", get(system_info_handler))
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(HttpAppState {
            monitor,
            auth,
            metrics,
        })
}

fn ok_json<T: serde::Serialize>(data: T) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn error_json(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

/// Resolves the `Authorization: Bearer <token>` header to a
/// username, or builds the 401 response to return as-is.
async fn authorize(auth: &Authenticator, headers: &HeaderMap) -> Result<String, Response> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| error_json(StatusCode::UNAUTHORIZED, "missing bearer token"))?;

    auth.verify(token)
        .await
        .ok_or_else(|| error_json(StatusCode::UNAUTHORIZED, "invalid or expired token"))
}

async fn login_handler(
    State(state): State<HttpAppState>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state.auth.login(&request.username, &request.password).await {
        Some(token) => ok_json(json!({ "token": token, "username": request.username })),
        None => error_json(StatusCode::UNAUTHORIZED, "invalid credentials"),
    }
}

async fn system_status_handler(State(state): State<HttpAppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state.auth, &headers).await {
        return response;
    }
    ok_json(state.monitor.current_status().await)
}

async fn system_history_handler(
    State(state): State<HttpAppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Response {
    if let Err(response) = authorize(&state.auth, &headers).await {
        return response;
    }
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    ok_json(state.monitor.history_data(limit).await)
}

async fn system_info_handler(State(state): State<HttpAppState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state.auth, &headers).await {
        return response;
    }
    ok_json(state.monitor.detection_info())
}

async fn health_handler(State(state): State<HttpAppState>) -> Response {
    Json(json!({
        "status": "ok",
        "monitoring": state.monitor.is_running(),
        "timestamp": chrono::Local::now().to_rfc3339(),
    }))
    .into_response()
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::MetricCollector;
    use crate::snapshot::{
        CpuInfo, DetectionFacts, DiskInfo, LoadInfo, MemoryInfo, NetworkInfo, ProcessInfo,
    };
    use axum::body::to_bytes;
    use axum::http::Request;
    use std::collections::HashMap;
    use std::time::Duration;
    use tower::ServiceExt;

    struct StubCollector;

    impl MetricCollector for StubCollector {
        fn name(&self) -> &'static str {
            "StubCollector"
        }

        fn cpu(&mut self) -> CpuInfo {
            CpuInfo {
                percent: 13.5,
                ..CpuInfo::default()
            }
        }

        fn memory(&mut self) -> MemoryInfo {
            MemoryInfo::default()
        }

        fn disk(&mut self) -> DiskInfo {
            DiskInfo::default()
        }

        fn network(&mut self) -> NetworkInfo {
            NetworkInfo::default()
        }

        fn processes(&mut self) -> ProcessInfo {
            ProcessInfo::default()
        }

        fn load(&mut self) -> LoadInfo {
            LoadInfo::default()
        }
    }

    fn test_app() -> (Router, Arc<Authenticator>) {
        let metrics = Metrics::new().expect("metrics init");
        let monitor = Monitor::new(
            Box::new(StubCollector),
            DetectionFacts::default(),
            Duration::from_secs(5),
            10,
            Arc::clone(&metrics),
        );
        let mut users = HashMap::new();
        users.insert("admin".to_string(), "secret".to_string());
        let auth = Arc::new(Authenticator::new(users, 3600));
        let app = build_router(monitor, Arc::clone(&auth), metrics);
        (app, auth)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_open_and_reports_monitoring_state() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"status\":\"ok\""));
        assert!(text.contains("\"monitoring\":false"));
    }

    #[tokio::test]
    async fn login_returns_a_token_for_valid_credentials() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"username":"admin","password":"secret"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"success\":true"));
        assert!(text.contains("\"token\""));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/login")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"username":"admin","password":"wrong"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let text = body_text(response).await;
        assert!(text.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn protected_endpoints_require_a_token() {
        let (app, _) = test_app();

        for uri in ["/api/system-status", "/api/system-history", "/api/system-info"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn valid_token_opens_the_status_endpoint() {
        let (app, auth) = test_app();
        let token = auth.login("admin", "secret").await.expect("token");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/system-status")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"success\":true"));
        assert!(text.contains("\"cpu\""));
    }

    #[tokio::test]
    async fn system_info_names_the_bound_variant() {
        let (app, auth) = test_app();
        let token = auth.login("admin", "secret").await.expect("token");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/system-info")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"monitor_variant\":\"StubCollector\""));
        assert!(text.contains("\"supported_systems\""));
    }

    #[tokio::test]
    async fn empty_history_is_an_empty_array() {
        let (app, auth) = test_app();
        let token = auth.login("admin", "secret").await.expect("token");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/system-history?limit=5")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("\"data\":[]"));
    }

    #[tokio::test]
    async fn metrics_exposes_poll_counters() {
        let (app, _) = test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("monitor_scrape_count_total"));
    }
}
