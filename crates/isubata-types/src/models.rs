use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout shown to clients. Display code matches on it literally.
pub const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Avatar assigned to freshly registered users.
pub const DEFAULT_AVATAR: &str = "default.png";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// The public face of a user attached to every rendered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub display_name: String,
    pub avatar_icon: String,
}

/// One entry of the per-channel recent-message cache.
///
/// A denormalized mirror of a stored message row. Anything held here can be
/// rebuilt from the database, so it is never the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedMessage {
    pub id: i64,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub content: String,
}

impl CachedMessage {
    pub fn date(&self) -> String {
        self.created_at.format(DATE_FORMAT).to_string()
    }
}
