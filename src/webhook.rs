//! Inbound Messenger webhook: verification handshake, event intake, and
//! routing of message events through the dialogue interpreter.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dialogue::Interpreter;
use crate::messenger::{MessageSink, MessengerClient};
use crate::wanikani::{ReviewQuery, WaniKaniClient};

pub struct AppState<Q = WaniKaniClient, S = MessengerClient> {
    pub verify_token: String,
    pub interpreter: Interpreter<Q>,
    pub sink: Arc<S>,
}

pub fn router<Q, S>(state: Arc<AppState<Q, S>>) -> Router
where
    Q: ReviewQuery + Send + Sync + 'static,
    S: MessageSink + Send + Sync + 'static,
{
    Router::new()
        .route("/ping", get(ping))
        .route("/webhook", get(verify_webhook::<Q, S>).post(receive_event::<Q, S>))
        .with_state(state)
}

async fn ping() -> &'static str {
    "pong"
}

#[derive(Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

/// Messenger verification handshake: echo the challenge back when the mode
/// and token match, refuse otherwise.
fn verification_reply(params: &VerifyParams, expected_token: &str) -> Option<String> {
    let mode = params.mode.as_deref()?;
    let token = params.verify_token.as_deref()?;
    if mode == "subscribe" && token == expected_token {
        params.challenge.clone()
    } else {
        None
    }
}

async fn verify_webhook<Q, S>(
    State(state): State<Arc<AppState<Q, S>>>,
    Query(params): Query<VerifyParams>,
) -> Response
where
    Q: ReviewQuery + Send + Sync + 'static,
    S: MessageSink + Send + Sync + 'static,
{
    match verification_reply(&params, &state.verify_token) {
        Some(challenge) => {
            info!("Webhook verified");
            (StatusCode::OK, challenge).into_response()
        }
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

#[derive(Deserialize)]
pub struct EventPayload {
    object: String,
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

#[derive(Deserialize)]
pub struct MessagingEvent {
    sender: Sender,
    message: Option<EventMessage>,
    postback: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Sender {
    id: String,
}

#[derive(Deserialize)]
struct EventMessage {
    text: Option<String>,
}

async fn receive_event<Q, S>(
    State(state): State<Arc<AppState<Q, S>>>,
    Json(payload): Json<EventPayload>,
) -> Response
where
    Q: ReviewQuery + Send + Sync + 'static,
    S: MessageSink + Send + Sync + 'static,
{
    if payload.object != "page" {
        return StatusCode::NOT_FOUND.into_response();
    }

    for entry in payload.entry {
        // entry.messaging is an array but only ever holds one event.
        if let Some(event) = entry.messaging.into_iter().next() {
            route_event(&state, event).await;
        }
    }

    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}

/// Feed one messaging event through the interpreter and forward the reply.
/// Postbacks and other non-message events are ignored.
async fn route_event<Q, S>(state: &AppState<Q, S>, event: MessagingEvent)
where
    Q: ReviewQuery,
    S: MessageSink,
{
    if event.postback.is_some() {
        debug!("Ignoring postback from {}", event.sender.id);
        return;
    }

    let Some(message) = event.message else {
        debug!("Ignoring non-message event from {}", event.sender.id);
        return;
    };

    let reply = state
        .interpreter
        .interpret(&event.sender.id, message.text.as_deref())
        .await;
    let _ = state.sink.send_text(&event.sender.id, &reply).await;
}
