use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use isubata_types::api::{CreateChannelRequest, CreateChannelResponse};

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// GET /channels
pub async fn list_channels(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let channels = run_blocking(&state.db, |db| db.list_channels()).await?;
    Ok(Json(channels))
}

/// POST /channels
pub async fn add_channel(
    State(state): State<AppState>,
    req: Result<Json<CreateChannelRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    if req.name.is_empty() || req.description.is_empty() {
        return Err(ApiError::Validation("name and description are required".into()));
    }

    let id = run_blocking(&state.db, move |db| db.create_channel(&req.name, &req.description)).await?;

    Ok((StatusCode::CREATED, Json(CreateChannelResponse { id })))
}
