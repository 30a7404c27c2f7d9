//! SSE+HTTP POST transport (spec §4.8, §6): a `GET /sse` stream per client
//! session and a companion `POST /sse/:session_id` that feeds requests in
//! and gets their JSON-RPC responses delivered back over the stream.
//!
//! Session fan-out is grounded in `modkit`'s `SseBroadcaster` — same
//! bounded-channel, drop-on-lag shape, but per-session unicast (`mpsc`)
//! rather than one topic broadcast to every subscriber, since each
//! session only ever needs its own responses.

use crate::dispatcher::Dispatcher;
use crate::jsonrpc::{parse_request, JsonRpcError, JsonRpcResponse, INTERNAL_ERROR, METHOD_NOT_FOUND};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

/// Per-session sender for frames destined for that session's `GET /sse`
/// stream. Unbounded because frame volume is request-response bound, not
/// a firehose — one response per POST.
type SessionSender = mpsc::UnboundedSender<Value>;

pub struct SseState {
    dispatcher: Arc<Dispatcher>,
    sessions: DashMap<String, SessionSender>,
}

impl SseState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self {
            dispatcher,
            sessions: DashMap::new(),
        })
    }
}

/// Builds the transport's router: `GET /sse` opens a session stream,
/// `POST /sse/:session_id` submits a JSON-RPC request against it. CORS is
/// wide open — the gateway has no browser-facing origin policy of its own
/// (spec §6).
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    let state = SseState::new(dispatcher);
    Router::new()
        .route("/sse", get(open_session))
        .route("/sse/{session_id}", post(submit_request))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn open_session(
    State(state): State<Arc<SseState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    state.sessions.insert(session_id.clone(), tx);

    let endpoint_event = Event::default()
        .event("endpoint")
        .data(format!("/sse/{session_id}"));
    let frames = UnboundedReceiverStream::new(rx).map(|value| {
        Ok(Event::default()
            .event("message")
            .json_data(&value)
            .unwrap_or_else(|_| Event::default().event("message").data("serialization_error")))
    });

    let stream = tokio_stream::once(Ok(endpoint_event)).chain(frames);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

async fn submit_request(
    State(state): State<Arc<SseState>>,
    Path(session_id): Path<String>,
    body: String,
) -> impl IntoResponse {
    let Some(sender) = state.sessions.get(&session_id).map(|s| s.clone()) else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };

    let request = match parse_request(&body) {
        Ok(req) => req,
        Err(e) => {
            let _ = sender.send(serde_json::to_value(JsonRpcResponse::failure(None, e)).unwrap());
            return StatusCode::ACCEPTED.into_response();
        }
    };

    let id = request.id.clone();
    let response = match state.dispatcher.dispatch(&request.method, &request.params).await {
        Some(envelope) => {
            JsonRpcResponse::success(id, serde_json::to_value(envelope).unwrap_or(Value::Null))
        }
        None => JsonRpcResponse::failure(
            id,
            JsonRpcError::new(METHOD_NOT_FOUND, format!("unknown tool '{}'", request.method)),
        ),
    };

    match sender.send(serde_json::to_value(&response).unwrap_or(Value::Null)) {
        Ok(()) => Json(serde_json::json!({"accepted": true})).into_response(),
        Err(_) => {
            state.sessions.remove(&session_id);
            let _ = sender;
            (
                StatusCode::GONE,
                Json(serde_json::json!({
                    "error": JsonRpcError::new(INTERNAL_ERROR, "session stream closed")
                })),
            )
                .into_response()
        }
    }
}
