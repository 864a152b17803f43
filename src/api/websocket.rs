//! WebSocket handler for real-time updates.
//!
//! Browsers cannot set headers on a WebSocket handshake, so the session
//! token and team are passed as query parameters instead.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use super::extract::{authenticate, team_scope};
use super::notifier::TeamUpdate;
use super::state::AppState;
use crate::db::Database;
use crate::storage::ScreenshotStore;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
    pub team_id: String,
}

/// WebSocket upgrade handler.
///
/// The caller must hold a valid session and belong to `team_id`; once
/// upgraded, only that team's updates are pushed.
pub async fn ws_handler<D: Database + 'static, S: ScreenshotStore + Send + Sync + 'static>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<D, S>>,
    Query(params): Query<WsParams>,
) -> Response {
    let auth = match authenticate(state.db(), &params.token).await {
        Ok(auth) => auth,
        Err(reply) => return reply.into_response(),
    };
    let scope = match team_scope(state.db(), auth.user, &params.team_id).await {
        Ok(scope) => scope,
        Err(reply) => return reply.into_response(),
    };

    let user_id = scope.user.id;
    let team_id = scope.team_id;
    ws.on_upgrade(move |socket| handle_socket(socket, state, team_id, user_id))
}

/// Serialize an update if it belongs to `team_id`.
pub(crate) fn frame_for(team_id: &str, update: &TeamUpdate) -> Option<String> {
    if update.team_id != team_id {
        return None;
    }
    match serde_json::to_string(&update.message) {
        Ok(json) => Some(json),
        Err(e) => {
            error!("Failed to serialize update: {}", e);
            None
        }
    }
}

/// Handle an active WebSocket connection.
async fn handle_socket<D: Database, S: ScreenshotStore + Send + Sync>(
    mut socket: WebSocket,
    state: AppState<D, S>,
    team_id: String,
    user_id: String,
) {
    info!(%team_id, %user_id, "WebSocket client connected");

    let mut rx = state.notifier().subscribe();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from client: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }

            update = rx.recv() => {
                let update = match update {
                    Ok(update) => update,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "WebSocket client lagging, updates dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(json) = frame_for(&team_id, &update) else {
                    continue;
                };
                if let Err(e) = socket.send(Message::Text(json.into())).await {
                    error!("Failed to send update: {}", e);
                    break;
                }
            }
        }
    }

    info!(%team_id, %user_id, "WebSocket client disconnected");
}
