use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use isubata_types::api::{Claims, ProfileResponse};

use crate::error::ApiError;
use crate::icons::{self, AVATAR_EXTENSIONS, AVATAR_MAX_SIZE};
use crate::state::{AppState, run_blocking};

/// GET /profile/{user_name}
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = user_name.clone();
    let user = run_blocking(&state.db, move |db| db.get_user_by_name(&name))
        .await?
        .ok_or(ApiError::NotFound(user_name))?;

    Ok(Json(ProfileResponse {
        self_profile: user.id == claims.sub,
        id: user.id,
        name: user.name,
        display_name: user.display_name,
        avatar_icon: user.avatar_icon,
    }))
}

/// POST /profile (multipart: `display_name`, `avatar_icon`)
///
/// Both parts are optional. The whole upload is validated before anything
/// is written.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut display_name: Option<String> = None;
    let mut avatar: Option<(Vec<u8>, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed upload: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "display_name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("malformed display_name: {}", e)))?;
                display_name = Some(text);
            }
            "avatar_icon" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    continue;
                }
                let ext = icons::extension(&file_name).to_string();
                if !AVATAR_EXTENSIONS.contains(&ext.as_str()) {
                    return Err(ApiError::Validation(format!("unsupported avatar type: {}", ext)));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("malformed avatar_icon: {}", e)))?;
                if data.len() > AVATAR_MAX_SIZE {
                    return Err(ApiError::Validation("avatar exceeds 1 MiB".into()));
                }
                avatar = Some((data.to_vec(), ext));
            }
            _ => {}
        }
    }

    let user_id = claims.sub;

    if let Some((data, ext)) = avatar {
        let avatar_name = icons::put_image(&state, data, &ext).await?;
        run_blocking(&state.db, move |db| db.update_avatar(user_id, &avatar_name)).await?;
    }

    if let Some(display_name) = display_name.filter(|n| !n.is_empty()) {
        run_blocking(&state.db, move |db| db.update_display_name(user_id, &display_name)).await?;
    }

    Ok(StatusCode::NO_CONTENT)
}
