use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::Config;
use crate::error::{DatadogMcpError, Result};
use crate::model::SearchLogsParams;
use crate::search::SearchAdapter;

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<SearchAdapter>,
    pub sessions: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Event>>>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// REST front for the same search the MCP tool runs. Caller mistakes come
/// back as 400, upstream failures as 502.
async fn search_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SearchLogsParams>, JsonRejection>,
) -> impl IntoResponse {
    let params = match payload {
        Ok(Json(p)) => p,
        Err(e) => {
            return ErrorResponse {
                error: format!("invalid request body: {e}"),
            }
            .into_response()
        }
    };

    let request = match params.validate() {
        Ok(r) => r,
        Err(e) => {
            return ErrorResponse {
                error: e.to_string(),
            }
            .into_response()
        }
    };

    match state.adapter.execute(&request).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let session_id = format!("{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));

    // First event tells the client where to POST its requests. Relative
    // URI per the MCP SSE handshake.
    let endpoint_url = format!("/message?session_id={}", session_id);
    let _ = tx.send(Event::default().event("endpoint").data(endpoint_url));

    state.sessions.write().unwrap().insert(session_id, tx);

    let stream = UnboundedReceiverStream::new(rx).map(Ok::<_, axum::Error>);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
struct MessageQuery {
    session_id: String,
}

async fn message_handler(
    State(state): State<AppState>,
    Query(q): Query<MessageQuery>,
    Json(req): Json<crate::mcp::RpcRequest>,
) -> impl IntoResponse {
    let sender = {
        let sessions = state.sessions.read().unwrap();
        sessions.get(&q.session_id).cloned()
    };

    if let Some(sender) = sender {
        let adapter = state.adapter.clone();
        let sessions = state.sessions.clone();
        let session_id = q.session_id;
        tokio::spawn(async move {
            let resp = crate::mcp::process_request(&adapter, req).await;
            if let Ok(json_str) = serde_json::to_string(&resp) {
                if sender
                    .send(Event::default().event("message").data(json_str))
                    .is_err()
                {
                    // receiver is gone; the session is dead
                    sessions.write().unwrap().remove(&session_id);
                }
            }
        });
        StatusCode::ACCEPTED
    } else {
        StatusCode::NOT_FOUND
    }
}

pub fn build_router(adapter: Arc<SearchAdapter>) -> Router {
    let state = AppState {
        adapter,
        sessions: Arc::new(RwLock::new(HashMap::new())),
    };
    Router::new()
        .route("/search", post(search_handler))
        .route("/sse", get(sse_handler))
        .route("/message", post(message_handler))
        .with_state(state)
}

pub async fn serve_http(adapter: Arc<SearchAdapter>, config: Config) -> Result<()> {
    let router = build_router(adapter);

    let addr = format!(
        "{}:{}",
        config
            .server
            .http_addr
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        config.server.http_port.unwrap_or(3000)
    );
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| DatadogMcpError::Config(format!("bind {addr} failed: {e}")))?;
    // stdout may be carrying the stdio transport, so announce on the log side.
    tracing::info!(%addr, "http server listening");
    axum::serve(listener, router).await.map_err(|e| e.into())
}
