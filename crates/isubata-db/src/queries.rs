use std::collections::HashMap;

use anyhow::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use rusqlite::{Connection, ErrorCode, Row};

use isubata_types::models::{Channel, UserSummary};

use crate::Database;
use crate::models::{MessageRow, ResetBaseline, UserRow};

impl Database {
    // -- Users --

    /// Insert a new user. Returns `None` when the name is already taken.
    pub fn create_user(
        &self,
        name: &str,
        password_hash: &str,
        display_name: &str,
        avatar_icon: &str,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (name, password, display_name, avatar_icon) VALUES (?1, ?2, ?3, ?4)",
                (name, password_hash, display_name, avatar_icon),
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, password, display_name, avatar_icon FROM users WHERE name = ?1",
                [name],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, password, display_name, avatar_icon FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()
        })
    }

    /// Batch-resolve user ids to their public summary in one query.
    /// Ids with no matching row are simply absent from the map.
    pub fn get_user_summaries(&self, user_ids: &[i64]) -> Result<HashMap<i64, UserSummary>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, name, display_name, avatar_icon FROM users WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(user_ids), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        UserSummary {
                            name: row.get(1)?,
                            display_name: row.get(2)?,
                            avatar_icon: row.get(3)?,
                        },
                    ))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;

            Ok(rows)
        })
    }

    pub fn update_display_name(&self, user_id: i64, display_name: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET display_name = ?1 WHERE id = ?2",
                (display_name, user_id),
            )?;
            Ok(())
        })
    }

    pub fn update_avatar(&self, user_id: i64, avatar_icon: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET avatar_icon = ?1 WHERE id = ?2",
                (avatar_icon, user_id),
            )?;
            Ok(())
        })
    }

    // -- Channels --

    pub fn list_channels(&self) -> Result<Vec<Channel>> {
        self.with_conn(query_channels)
    }

    pub fn create_channel(&self, name: &str, description: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO channels (name, description) VALUES (?1, ?2)",
                (name, description),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    // -- Messages --

    /// Append a message. The id comes from the single AUTOINCREMENT sequence
    /// shared by all channels and the timestamp is taken here, at insert time.
    pub fn insert_message(
        &self,
        channel_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<(i64, NaiveDateTime)> {
        let created_at = now_seconds();
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (channel_id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![channel_id, user_id, content, created_at],
            )?;
            Ok((conn.last_insert_rowid(), created_at))
        })
    }

    pub fn count_messages(&self, channel_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel_id = ?1",
                [channel_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn count_messages_after(&self, channel_id: i64, after_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel_id = ?1 AND id > ?2",
                [channel_id, after_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// One page of a channel's history, newest first.
    pub fn fetch_page(&self, channel_id: i64, limit: i64, offset: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages_page(conn, channel_id, limit, offset))
    }

    /// Up to `limit` messages newer than `after_id`, newest first.
    pub fn fetch_after(&self, channel_id: i64, after_id: i64, limit: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, user_id, content, created_at
                 FROM messages
                 WHERE channel_id = ?1 AND id > ?2
                 ORDER BY id DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map([channel_id, after_id, limit], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Read watermarks --

    /// Insert or overwrite the watermark for (user, channel). Last writer wins;
    /// nothing here stops the stored id from going backwards.
    pub fn upsert_watermark(&self, user_id: i64, channel_id: i64, message_id: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO haveread (user_id, channel_id, message_id) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id, channel_id) DO UPDATE SET
                     message_id = excluded.message_id,
                     updated_at = datetime('now', 'localtime')",
                [user_id, channel_id, message_id],
            )?;
            Ok(())
        })
    }

    pub fn get_watermark(&self, user_id: i64, channel_id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT message_id FROM haveread WHERE user_id = ?1 AND channel_id = ?2",
                [user_id, channel_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Images --

    /// Store an image blob under its content name. Returns false if a blob
    /// with that name already existed.
    pub fn insert_image(&self, name: &str, data: &[u8]) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO images (name, data) VALUES (?1, ?2)",
                rusqlite::params![name, data],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_image(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            conn.query_row("SELECT data FROM images WHERE name = ?1", [name], |row| row.get(0))
                .optional()
        })
    }

    // -- Administration --

    /// Drop everything created after the seed data and forget every
    /// watermark, in one transaction.
    pub fn reset(&self, baseline: &ResetBaseline) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute("DELETE FROM users WHERE id > ?1", [baseline.max_user_id])?;
            tx.execute("DELETE FROM images WHERE id > ?1", [baseline.max_image_id])?;
            tx.execute("DELETE FROM channels WHERE id > ?1", [baseline.max_channel_id])?;
            tx.execute("DELETE FROM messages WHERE id > ?1", [baseline.max_message_id])?;
            tx.execute("DELETE FROM haveread", [])?;
            tx.commit()?;
            Ok(())
        })
    }
}

fn now_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        avatar_icon: row.get(4)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_channels(conn: &Connection) -> Result<Vec<Channel>> {
    let mut stmt = conn.prepare("SELECT id, name, description FROM channels ORDER BY id")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Channel {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_messages_page(
    conn: &Connection,
    channel_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, channel_id, user_id, content, created_at
         FROM messages
         WHERE channel_id = ?1
         ORDER BY id DESC
         LIMIT ?2 OFFSET ?3",
    )?;

    let rows = stmt
        .query_map([channel_id, limit, offset], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
