//! Board operation handlers.
//!
//! Board operations respond with the plain-text board rendering; the
//! format is the wire contract shared with every client.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use scramble_core::FlipError;
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;

/// Render the board for a player.
pub async fn look(State(state): State<Arc<AppState>>, Path(player): Path<String>) -> String {
    state.board.look(&player)
}

/// Drive a player's turn forward by one flip. May block while the target
/// card is held by another player.
pub async fn flip(
    State(state): State<Arc<AppState>>,
    Path((player, row, column)): Path<(String, usize, usize)>,
) -> Result<String, (StatusCode, String)> {
    state
        .board
        .flip(&player, row, column)
        .await
        .map_err(flip_status)
}

/// Block until the next observable board change, then render.
pub async fn watch(State(state): State<Arc<AppState>>, Path(player): Path<String>) -> String {
    state.board.watch(&player).await
}

/// Query parameters for label rewriting.
#[derive(Deserialize)]
pub struct MapQuery {
    pub from: String,
    pub to: String,
}

/// Rewrite every card label equal to `from` into `to`, preserving pair
/// identity across the board.
pub async fn map_labels(
    State(state): State<Arc<AppState>>,
    Path(player): Path<String>,
    Query(query): Query<MapQuery>,
) -> Result<String, (StatusCode, String)> {
    let MapQuery { from, to } = query;
    state
        .board
        .map(&player, |label| {
            let from = from.clone();
            let to = to.clone();
            async move { Ok(if label == from { to } else { label }) }
        })
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("map failed: {e}")))
}

fn flip_status(err: FlipError) -> (StatusCode, String) {
    let status = match err {
        FlipError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
        FlipError::NoCard { .. } | FlipError::StillHeld { .. } | FlipError::Held { .. } => {
            StatusCode::CONFLICT
        }
    };
    (status, err.to_string())
}
