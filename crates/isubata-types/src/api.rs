use serde::{Deserialize, Serialize};

use crate::models::UserSummary;

// -- JWT Claims --

/// Claims carried by the bearer token. Shared by the login handlers that
/// mint tokens and the middleware that checks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub avatar_icon: String,
    pub self_profile: bool,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateChannelResponse {
    pub id: i64,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub channel_id: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub channel_id: i64,
    #[serde(default)]
    pub last_message_id: i64,
}

/// A message as rendered for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMessage {
    pub id: i64,
    pub user: UserSummary,
    pub date: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCount {
    pub channel_id: i64,
    pub unread: i64,
}

// -- History --

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
}

/// A history entry. `user` is null when the author's row no longer exists,
/// so a page always carries every message it counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: i64,
    pub user: Option<UserSummary>,
    pub date: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryPage {
    pub channel_id: i64,
    pub page: i64,
    pub max_page: i64,
    pub messages: Vec<HistoryMessage>,
}
