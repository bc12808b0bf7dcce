use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;

use isubata_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use isubata_types::models::DEFAULT_AVATAR;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    req: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    if req.name.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("name and password are required".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let name = req.name.clone();
    let user_id = run_blocking(&state.db, move |db| {
        db.create_user(&name, &password_hash, &name, DEFAULT_AVATAR)
    })
    .await?
    .ok_or_else(|| ApiError::Conflict(format!("name already registered: {}", req.name)))?;

    info!("Registered user {} ({})", req.name, user_id);

    let token = create_token(&state.jwt_secret, user_id, &req.name)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    req: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = req?;
    let name = req.name.clone();
    let user = run_blocking(&state.db, move |db| db.get_user_by_name(&name))
        .await?
        .ok_or_else(|| ApiError::Forbidden("bad credentials".into()))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Forbidden("bad credentials".into()))?;

    let token = create_token(&state.jwt_secret, user.id, &user.name)?;

    Ok(Json(LoginResponse {
        user_id: user.id,
        name: user.name,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: i64, name: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
