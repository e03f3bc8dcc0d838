//! Interactions webhook.
//!
//! `POST /interactions` verifies the signature, parses the payload and
//! hands it to the router under a deadline. If the deadline passes, the
//! reply is abandoned and the caller gets a bare 500. No partial report
//! is ever rendered.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{SignatureVerifier, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::discord::Interaction;
use crate::error::BotError;
use crate::router::{InteractionRouter, Reply};

#[derive(Clone)]
pub struct AppState {
    pub router: Arc<InteractionRouter>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub client_id: Arc<str>,
    pub deadline: Duration,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/interactions", post(interactions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Interactions endpoint listening on http://{}/interactions", addr);
    axum::serve(listener, app(state)).await.context("Server stopped")?;
    Ok(())
}

async fn index(State(state): State<AppState>) -> String {
    format!("Hello! Client ID: {}", state.client_id)
}

async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, BotError> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let (signature, timestamp) = match (header(SIGNATURE_HEADER), header(TIMESTAMP_HEADER)) {
        (Some(s), Some(t)) => (s, t),
        _ => return Err(BotError::AuthenticationFailure("missing signature headers".into())),
    };
    state
        .verifier
        .verify(timestamp, &body, signature)
        .map_err(|e| BotError::AuthenticationFailure(e.to_string()))?;

    let interaction = Interaction::parse(&body)?;

    let reply = tokio::time::timeout(state.deadline, state.router.route(interaction))
        .await
        .map_err(|_| {
            warn!("Interaction abandoned at deadline");
            BotError::Timeout(state.deadline.as_secs())
        })?;

    Ok(match reply {
        Reply::Interaction(response) => Json(response).into_response(),
        Reply::Unrecognized => {
            Json(serde_json::json!({ "error": "Unknown Interaction type" })).into_response()
        }
    })
}
