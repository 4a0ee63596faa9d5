use crate::core::session::{SessionManager, MAX_REPEAT_COUNT};
use crate::core::transport::HexTransport;
use crate::domain::config::HttpConfig;
use crate::domain::error::{HexLinkError, HexLinkResult};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Shared state passed to the route handlers.
pub struct HttpState<T: HexTransport> {
    pub manager: Arc<SessionManager<T>>,
    pub operation_timeout: Duration,
}

impl<T: HexTransport> Clone for HttpState<T> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            operation_timeout: self.operation_timeout,
        }
    }
}

/// Accepts `5000` as well as `"5000"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

impl NumberOrText {
    fn as_i64(&self) -> Option<i64> {
        match self {
            NumberOrText::Number(n) => Some(*n),
            NumberOrText::Text(text) => text.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectRequest {
    ip_address: Option<String>,
    port: Option<NumberOrText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    hex_code: Option<String>,
    repeat_count: Option<NumberOrText>,
}

/// Failure body shared by every route
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<HexLinkError> for ApiError {
    fn from(err: HexLinkError) -> Self {
        let status = if err.is_input_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

/// Unparseable bodies get the same JSON failure shape as validation errors
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!("Rejected request body: {}", rejection.body_text());
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "message": self.message })),
        )
            .into_response()
    }
}

/// Build the router with all `/api/tcp` routes.
pub fn build_router<T: HexTransport + 'static>(
    manager: Arc<SessionManager<T>>,
    config: &HttpConfig,
) -> Router {
    let state = HttpState {
        manager,
        operation_timeout: config.operation_timeout(),
    };

    Router::new()
        .route("/api/tcp/connect", post(connect_handler::<T>))
        .route("/api/tcp/disconnect", post(disconnect_handler::<T>))
        .route("/api/tcp/send", post(send_handler::<T>))
        .route("/api/tcp/status", get(status_handler::<T>))
        .route("/api/tcp/presets", get(presets_handler::<T>))
        .route("/api/tcp/history", get(history_handler::<T>))
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve<T: HexTransport + 'static>(
    manager: Arc<SessionManager<T>>,
    config: &HttpConfig,
) -> HexLinkResult<()> {
    let router = build_router(manager, config);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(%local_addr, "HTTP server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Race a spawned operation against `limit`.
///
/// The operation keeps running when the timer wins; its outcome then only
/// shows up in the session log.
async fn run_bounded<F, R>(limit: Duration, operation: F) -> Result<R, ApiError>
where
    F: Future<Output = HexLinkResult<R>> + Send + 'static,
    R: Send + 'static,
{
    let handle = tokio::spawn(operation);

    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(result)) => result.map_err(ApiError::from),
        Ok(Err(join_error)) => Err(ApiError::from(HexLinkError::Session {
            message: format!("Operation aborted: {}", join_error),
        })),
        Err(_) => {
            warn!("Operation exceeded {}ms", limit.as_millis());
            Err(ApiError::from(HexLinkError::Session {
                message: format!("Operation timed out after {}ms", limit.as_millis()),
            }))
        }
    }
}

async fn connect_handler<T: HexTransport + 'static>(
    State(state): State<HttpState<T>>,
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = payload?;
    let host = request.ip_address.filter(|host| !host.trim().is_empty());
    let (host, port) = match (host, request.port) {
        (Some(host), Some(port)) => (host, port),
        _ => return Err(ApiError::bad_request("IP address and port are required")),
    };

    let port = port
        .as_i64()
        .and_then(|port| u32::try_from(port).ok())
        .ok_or_else(|| ApiError::bad_request("Port must be a number between 1 and 65535"))?;

    let manager = Arc::clone(&state.manager);
    let success = run_bounded(state.operation_timeout, async move {
        manager.connect(&host, port).await
    })
    .await?;

    Ok(Json(json!({ "success": success })))
}

async fn disconnect_handler<T: HexTransport + 'static>(
    State(state): State<HttpState<T>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let manager = Arc::clone(&state.manager);
    let success = run_bounded(state.operation_timeout, async move {
        Ok(manager.disconnect().await)
    })
    .await?;

    Ok(Json(json!({ "success": success })))
}

async fn send_handler<T: HexTransport + 'static>(
    State(state): State<HttpState<T>>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let hex = request
        .hex_code
        .filter(|hex| !hex.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Hex code is required"))?;

    let repeat_count = match request.repeat_count {
        None => 1,
        Some(value) => value
            .as_i64()
            .filter(|count| (1..=i64::from(MAX_REPEAT_COUNT)).contains(count))
            .map(|count| count as u32)
            .ok_or_else(|| {
                ApiError::bad_request(format!(
                    "Repeat count must be between 1 and {}",
                    MAX_REPEAT_COUNT
                ))
            })?,
    };

    // Socket slack on top of the time the reply windows and pauses take
    let limit = state.operation_timeout + state.manager.send_budget(repeat_count);
    let manager = Arc::clone(&state.manager);
    let result = run_bounded(limit, async move { manager.send_hex(&hex, repeat_count).await }).await?;

    Ok(Json(result).into_response())
}

async fn status_handler<T: HexTransport + 'static>(State(state): State<HttpState<T>>) -> Response {
    Json(state.manager.status()).into_response()
}

async fn presets_handler<T: HexTransport + 'static>(State(state): State<HttpState<T>>) -> Response {
    Json(state.manager.presets().to_vec()).into_response()
}

async fn history_handler<T: HexTransport + 'static>(State(state): State<HttpState<T>>) -> Response {
    Json(state.manager.history().await).into_response()
}
