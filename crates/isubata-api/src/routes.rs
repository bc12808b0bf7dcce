use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};

use crate::icons::AVATAR_MAX_SIZE;
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{admin, auth, channels, history, icons, messages, profile, unread};

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/initialize", get(admin::initialize))
        .route("/icons/{file_name}", get(icons::get_icon));

    let protected_routes = Router::new()
        .route("/channels", get(channels::list_channels).post(channels::add_channel))
        .route("/message", get(messages::get_messages).post(messages::post_message))
        .route("/fetch", get(unread::fetch_unread))
        .route("/history/{channel_id}", get(history::get_history))
        .route("/profile/{user_name}", get(profile::get_profile))
        .route(
            "/profile",
            post(profile::update_profile).layer(DefaultBodyLimit::max(2 * AVATAR_MAX_SIZE)),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
