//! HTTP chat server.
//!
//! `POST /api/chat` streams a chat as server-sent events; `GET /api/models`
//! lists the catalog.

use crate::agent::ChatEvent;
use crate::chat::{ChatRejection, ChatRequest};
use crate::cli::Output;
use crate::config::Settings;
use crate::models::{is_reasoning_model, ModelDescriptor};
use crate::service::ChatService;
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let service = Arc::new(ChatService::from_settings(&settings)?);
    let app = router(service);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Server listening");

    Output::header("Parley Chat Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /api/chat (text/event-stream)");
    Output::kv("Models", "GET  /api/models");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes with permissive CORS.
pub fn router(service: Arc<ChatService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/models", get(models))
        .layer(cors)
        .with_state(service)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelEntry {
    #[serde(flatten)]
    descriptor: ModelDescriptor,
    identifier: String,
    reasoning: bool,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelEntry>,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn models(State(service): State<Arc<ChatService>>) -> impl IntoResponse {
    let models = service
        .registry()
        .available_models()
        .into_iter()
        .map(|mut descriptor| {
            let identifier = descriptor.identifier();
            descriptor.multimodal = Some(descriptor.is_multimodal());
            ModelEntry {
                reasoning: is_reasoning_model(&identifier),
                identifier,
                descriptor,
            }
        })
        .collect();
    Json(ModelsResponse { models })
}

async fn chat(
    State(service): State<Arc<ChatService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed chat body");
            return ChatRejection::MalformedBody(e.to_string()).into_response();
        }
    };

    let prepared = match service.prepare(&headers, request) {
        Ok(prepared) => prepared,
        Err(rejection) => return rejection.into_response(),
    };
    info!(
        chat_id = %prepared.input.chat_id,
        model = %prepared.model.descriptor.identifier(),
        search_mode = prepared.input.search_mode,
        "Chat accepted"
    );

    let events = service.start(prepared);
    Sse::new(event_stream(events))
        .keep_alive(KeepAlive::default())
        .into_response()
}

fn event_stream(events: mpsc::Receiver<ChatEvent>) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        let sse = Event::default()
            .event(event.name())
            .json_data(&event)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(sse), events))
    })
}
