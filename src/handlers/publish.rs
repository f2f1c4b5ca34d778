use crate::db::models::Pin;
use crate::error::BeamError;
use crate::middleware::auth::{Caller, ServiceAuth};
use crate::router::BeamState;
use crate::service::connections::SweepReport;
use crate::service::publisher::PublishReport;
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

/// POST /pins/{pin_id}/publish -> publish one pin now.
pub async fn publish_one(
    State(state): State<BeamState>,
    caller: Caller,
    Path(pin_id): Path<String>,
) -> Result<Json<PublishReport>, BeamError> {
    state.publisher.publish_one(&caller, &pin_id).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct PublishManyRequest {
    pub pin_ids: Vec<String>,
}

/// POST /pins/publish -> publish an explicit list of pins.
pub async fn publish_many(
    State(state): State<BeamState>,
    caller: Caller,
    Json(body): Json<PublishManyRequest>,
) -> Result<Json<PublishReport>, BeamError> {
    state
        .publisher
        .publish_many(&caller, &body.pin_ids)
        .await
        .map(Json)
}

/// POST /pins/{pin_id}/reset -> error back to its previous status.
pub async fn reset_pin(
    State(state): State<BeamState>,
    caller: Caller,
    Path(pin_id): Path<String>,
) -> Result<Json<Pin>, BeamError> {
    let reset = state.store.reset_pin(&pin_id, &caller.tenant_id).await?;
    if !reset {
        // Either the pin doesn't exist for this tenant or it isn't in error.
        return Err(BeamError::NotFound("resettable pin"));
    }
    let pin = state
        .store
        .pin_by_id(&pin_id, &caller.tenant_id)
        .await?
        .ok_or(BeamError::NotFound("pin"))?;
    Ok(Json(pin))
}

/// POST /jobs/publish-due -> scheduler-triggered dispatch of due pins.
pub async fn publish_due(
    State(state): State<BeamState>,
    _auth: ServiceAuth,
) -> Result<Json<PublishReport>, BeamError> {
    state.publisher.publish_due().await.map(Json)
}

/// POST /jobs/refresh-sweep -> scheduler-triggered token refresh.
pub async fn refresh_sweep(
    State(state): State<BeamState>,
    _auth: ServiceAuth,
) -> Result<Json<SweepReport>, BeamError> {
    state.connections.refresh_sweep().await.map(Json)
}
