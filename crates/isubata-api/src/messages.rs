use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};

use isubata_types::api::{Claims, FeedQuery, PostMessageRequest};

use crate::error::ApiError;
use crate::feed;
use crate::state::AppState;

/// POST /message
pub async fn post_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    req: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    feed::post_message(&state.db, &state.cache, claims.sub, req.channel_id, req.message).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /message?channel_id=&last_message_id=
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let messages = feed::read_feed(
        &state.db,
        &state.cache,
        &state.feed,
        claims.sub,
        query.channel_id,
        query.last_message_id,
    )
    .await?;

    Ok(Json(messages))
}
