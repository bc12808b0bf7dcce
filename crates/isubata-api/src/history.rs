use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::IntoResponse,
};
use tracing::debug;

use isubata_types::api::{HistoryMessage, HistoryPage, HistoryQuery};
use isubata_types::models::DATE_FORMAT;

use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const HISTORY_PAGE_SIZE: i64 = 20;

/// A missing or empty page means page 1. Anything but plain digits is
/// rejected.
pub fn parse_page(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = match raw {
        None | Some("") => return Ok(1),
        Some(raw) => raw,
    };
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::Validation(format!("page is not a number: {}", raw)));
    }
    raw.parse()
        .map_err(|_| ApiError::Validation(format!("page out of range: {}", raw)))
}

/// Number of pages needed for `total` messages. An empty channel still has
/// one (empty) page.
pub fn max_page(total: i64) -> i64 {
    ((total + HISTORY_PAGE_SIZE - 1) / HISTORY_PAGE_SIZE).max(1)
}

/// GET /history/{channel_id}?page=N
///
/// Pages count back from the newest message; messages within a page are in
/// chronological order.
pub async fn get_history(
    State(state): State<AppState>,
    channel_id: Result<Path<i64>, PathRejection>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(channel_id) = channel_id?;
    let Query(query) = query?;
    let page = parse_page(query.page.as_deref())?;

    let total = run_blocking(&state.db, move |db| db.count_messages(channel_id)).await?;
    let max_page = max_page(total);
    if !(1..=max_page).contains(&page) {
        return Err(ApiError::Validation(format!(
            "page {} outside 1..={}",
            page, max_page
        )));
    }

    let (rows, users) = run_blocking(&state.db, move |db| {
        let rows = db.fetch_page(channel_id, HISTORY_PAGE_SIZE, (page - 1) * HISTORY_PAGE_SIZE)?;
        let author_ids: Vec<i64> = rows
            .iter()
            .map(|r| r.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let users = db.get_user_summaries(&author_ids)?;
        Ok((rows, users))
    })
    .await?;

    let mut messages: Vec<HistoryMessage> = rows
        .into_iter()
        .map(|row| {
            let user = users.get(&row.user_id).cloned();
            if user.is_none() {
                debug!("Message {} has no author row (user {})", row.id, row.user_id);
            }
            HistoryMessage {
                id: row.id,
                user,
                date: row.created_at.format(DATE_FORMAT).to_string(),
                content: row.content,
            }
        })
        .collect();
    messages.reverse();

    Ok(Json(HistoryPage {
        channel_id,
        page,
        max_page,
        messages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_has_floor_of_one() {
        assert_eq!(max_page(0), 1);
        assert_eq!(max_page(20), 1);
        assert_eq!(max_page(21), 2);
        assert_eq!(max_page(45), 3);
    }

    #[test]
    fn page_parsing() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("")).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(parse_page(Some("-1")).is_err());
        assert!(parse_page(Some("two")).is_err());
        assert!(parse_page(Some("99999999999999999999999")).is_err());
    }
}
