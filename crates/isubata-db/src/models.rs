//! Database row types. These map directly to SQLite rows and stay distinct
//! from the isubata-types API models to keep the DB layer independent.

use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub password: String,
    pub display_name: String,
    pub avatar_icon: String,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: i64,
    pub channel_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// Rows with ids above these survive nothing but the seed data. Used by the
/// administrative reset.
#[derive(Debug, Clone, Copy)]
pub struct ResetBaseline {
    pub max_user_id: i64,
    pub max_image_id: i64,
    pub max_channel_id: i64,
    pub max_message_id: i64,
}

impl Default for ResetBaseline {
    fn default() -> Self {
        Self {
            max_user_id: 1000,
            max_image_id: 1001,
            max_channel_id: 10,
            max_message_id: 10000,
        }
    }
}
