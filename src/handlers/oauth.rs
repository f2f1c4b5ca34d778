use crate::error::BeamError;
use crate::middleware::auth::Caller;
use crate::pinterest::types::Board;
use crate::router::BeamState;
use crate::service::connections::{ConnectionStatus, InitiatedOauth};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// POST /projects/{project_id}/oauth -> authorization URL for the consent
/// redirect.
pub async fn init_oauth(
    State(state): State<BeamState>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Result<Json<InitiatedOauth>, BeamError> {
    state
        .connections
        .init_oauth(&caller, &project_id)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
struct CallbackOutcome {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// GET /oauth/callback -> finish the authorization round-trip. The state
/// token is the only credential this route needs; the web UI turns the
/// JSON outcome into its redirect parameters.
pub async fn oauth_callback(
    State(state): State<BeamState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let result = async {
        if let Some(denied) = query.error {
            return Err(BeamError::OauthFlow(format!(
                "authorization denied: {denied}"
            )));
        }
        let code = query
            .code
            .ok_or_else(|| BeamError::OauthFlow("missing `code` in callback".to_string()))?;
        let oauth_state = query
            .state
            .ok_or_else(|| BeamError::OauthFlow("missing `state` in callback".to_string()))?;
        state.connections.complete_oauth(&code, &oauth_state).await
    }
    .await;

    match result {
        Ok(done) => {
            info!(project_id = %done.project_id, "oauth callback completed");
            Json(CallbackOutcome {
                success: true,
                project_id: Some(done.project_id),
                username: Some(done.username),
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            let status = match e {
                BeamError::Database(_) | BeamError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            (
                status,
                Json(CallbackOutcome {
                    success: false,
                    project_id: None,
                    username: None,
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /projects/{project_id}/connection
pub async fn disconnect(
    State(state): State<BeamState>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Result<Json<serde_json::Value>, BeamError> {
    state.connections.disconnect(&caller, &project_id).await?;
    Ok(Json(json!({ "ok": true })))
}

/// GET /projects/{project_id}/connection
pub async fn connection_status(
    State(state): State<BeamState>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Result<Json<ConnectionStatus>, BeamError> {
    state
        .connections
        .connection_status(&caller, &project_id)
        .await
        .map(Json)
}

/// GET /projects/{project_id}/boards
pub async fn boards(
    State(state): State<BeamState>,
    caller: Caller,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<Board>>, BeamError> {
    state.connections.boards(&caller, &project_id).await.map(Json)
}
