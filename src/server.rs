//! Webhook transport: receives inbound chat events and returns the reply.
//!
//! Thin plumbing only. Each event is handled as an independent task by axum;
//! requests share nothing mutable, so one failure never affects another.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::agent::Agent;
use crate::error::{PaperbotError, Result};

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct OutboundReply {
    pub reply: String,
}

#[derive(Clone)]
pub struct BotServer {
    agent: Arc<Agent>,
}

impl BotServer {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/webhook", post(handle_message))
            .with_state(self.clone())
    }

    pub async fn serve(self, addr: SocketAddr) -> Result<()> {
        let app = self.router();
        info!(%addr, "paperbot listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app.into_make_service())
            .await
            .map_err(|err| PaperbotError::Protocol(format!("server error: {err}")))?;
        Ok(())
    }
}

async fn handle_message(
    State(state): State<BotServer>,
    Json(inbound): Json<InboundMessage>,
) -> Json<OutboundReply> {
    info!(sender = %inbound.sender, "inbound message");
    let reply = match state.agent.respond(inbound.text).await {
        Ok(reply) => reply,
        Err(err) => {
            error!(error = %err, "request failed");
            "Something went wrong handling that request. Please try again.".to_string()
        }
    };
    Json(OutboundReply { reply })
}
